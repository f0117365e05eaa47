//! Client for the hosted Gemini `generateContent` API.
//!
//! The web layer talks to a [`GenerativeClient`] trait object so handlers can be exercised
//! against stubs. [`GeminiClient`] is the production implementation: one HTTP request per call,
//! bounded by the configured timeout, with no retries.

mod types;

pub use types::{GenerationRequest, GenerationSettings, Role, Turn};

use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use types::{GenerateContentBody, GenerateContentResponse};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Errors surfaced when the upstream model cannot produce a response.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No API key was configured.
    #[error("GEMINI_API_KEY is not set in the environment.")]
    MissingApiKey,
    /// Request could not be delivered or timed out.
    #[error("Could not reach the Gemini API: {0}")]
    Unavailable(String),
    /// Upstream rejected the request because of quota or load.
    #[error("The Gemini API is rate limiting or overloaded (HTTP {status}). Please try again shortly.")]
    RateLimited {
        /// HTTP status returned upstream.
        status: u16,
    },
    /// Upstream returned a non-success status.
    #[error("Gemini API error: HTTP {status}. Check server logs.")]
    Upstream {
        /// HTTP status returned upstream.
        status: u16,
        /// Response body, kept for logs.
        body: String,
    },
    /// Response parsed but contained no usable text.
    #[error("Invalid response from the Gemini API: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by text generation backends.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Generate the model's reply to the final turn of `request`.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}

/// Gemini REST client.
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Build a client from configuration.
    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .user_agent(concat!("docsum/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.gemini_timeout_secs))
            .build()
            .map_err(|error| GenerationError::Unavailable(format!("failed to build HTTP client: {error}")))?;
        Ok(Self {
            http,
            endpoint: config.generate_content_url(),
            api_key: config.gemini_api_key.clone(),
        })
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or(GenerationError::MissingApiKey)?;

        let body = GenerateContentBody::from(&request);
        tracing::debug!(
            endpoint = %self.endpoint,
            turns = request.turns.len(),
            max_output_tokens = request.settings.max_output_tokens,
            "Sending generateContent request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                let error = error.without_url();
                tracing::warn!(error = %error, "Gemini request failed");
                GenerationError::Unavailable(error.to_string())
            })?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
        ) {
            tracing::warn!(status = status.as_u16(), "Gemini rate limited or overloaded");
            return Err(GenerationError::RateLimited {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "Gemini returned an error");
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let decoded: GenerateContentResponse = response.json().await.map_err(|error| {
            GenerationError::InvalidResponse(format!("failed to decode response: {}", error.without_url()))
        })?;
        decoded.first_text().map_err(GenerationError::InvalidResponse)
    }
}
