use crate::extract::ExtractError;
use crate::gemini::GenerationError;
use axum::{
    Json,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failure of a single request, rendered as `{"error": "..."}` with a matching status code.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete request.
    #[error("{0}")]
    BadRequest(String),
    /// Action requires an uploaded document.
    #[error("No document uploaded. Please upload a document first.")]
    NoDocument,
    /// Export requested before any summary was generated.
    #[error("No summary has been generated yet.")]
    NoSummary,
    /// Request body was rejected by its extractor or could not be read.
    #[error("{message}")]
    Rejected {
        /// Status reported by the extractor (413 when the size limit is hit).
        status: StatusCode,
        /// Extractor diagnostic.
        message: String,
    },
    /// Session ended while the request was being processed.
    #[error("Your session ended before the result could be saved. Please upload the document again.")]
    SessionExpired,
    /// Uploaded file was rejected or could not be parsed.
    #[error(transparent)]
    Extraction(#[from] ExtractError),
    /// Model provider failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// Unexpected server-side failure.
    #[error("An unexpected error occurred during processing.")]
    Internal(String),
}

impl ApiError {
    /// HTTP status used for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::NoDocument => StatusCode::BAD_REQUEST,
            Self::NoSummary => StatusCode::NOT_FOUND,
            Self::Rejected { status, .. } => *status,
            Self::SessionExpired => StatusCode::GONE,
            Self::Extraction(ExtractError::Unsupported { .. }) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Generation(GenerationError::MissingApiKey) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Generation(GenerationError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
            Self::Generation(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        let status = error.status();
        let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "The uploaded file is too large.".to_string()
        } else {
            format!("Could not read the upload: {}", error.body_text())
        };
        Self::Rejected { status, message }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: format!("Could not read the upload: {}", rejection.body_text()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::Internal(detail) = &self {
            tracing::error!(detail = %detail, "Request failed");
        } else {
            tracing::info!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
