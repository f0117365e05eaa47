//! HTTP surface for docsum.
//!
//! - `GET /` – Render the single-page interface for the caller's session.
//! - `POST /upload` – Accept a multipart `file` (or `pdf_file`) field, extract it, and make it the
//!   session's active document. Returns a preview.
//! - `GET /preview` – Preview of the active document.
//! - `POST /summarize` – Summarize the active document with the model and store the result.
//! - `POST /chat` – Answer `{ "question": ... }` about the active document; appends to history.
//! - `GET /history` – The session's chat history.
//! - `GET /export` – The latest summary as a `text/plain` download.
//! - `POST /reset` – Discard the session.
//! - `GET /health`, `GET /metrics` – Liveness and usage counters.
//!
//! Sessions are identified by a signed cookie; all state stays in process memory.

mod error;
mod page;
mod views;

pub use error::ApiError;

use crate::config::Config;
use crate::extract::{self, DocumentFormat, ExtractError};
use crate::gemini::GenerativeClient;
use crate::metrics::{MetricsSnapshot, UsageMetrics};
use crate::prompt;
use crate::session::{ChatExchange, Document, SessionStore, Summary};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, FromRef, Multipart, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse},
    routing::{get, post},
};
use axum_extra::extract::{
    WithRejection,
    cookie::{Cookie, Key, SameSite, SignedCookieJar},
};
use page::Pages;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tower_http::trace::TraceLayer;
use uuid::Uuid;
use views::{DocumentPreview, ExchangeView, PageView, SummaryView};

/// Name of the cookie carrying the session identifier.
pub const SESSION_COOKIE: &str = "docsum_session";

const UPLOAD_FIELDS: [&str; 2] = ["file", "pdf_file"];

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppInner>,
}

struct AppInner {
    sessions: SessionStore,
    client: Arc<dyn GenerativeClient>,
    metrics: UsageMetrics,
    cookie_key: Key,
    pages: Pages,
    max_upload_bytes: usize,
    max_prompt_chars: usize,
    chat_history_turns: usize,
}

impl AppState {
    /// Build application state from configuration and a model client.
    pub fn new(config: &Config, client: Arc<dyn GenerativeClient>) -> Result<Self, minijinja::Error> {
        let cookie_key = match config.session_secret.as_deref() {
            Some(secret) => Key::from(Sha512::digest(secret.as_bytes()).as_slice()),
            None => {
                tracing::warn!("SESSION_SECRET is not set; sessions will not survive a restart");
                Key::generate()
            }
        };
        Ok(Self {
            inner: Arc::new(AppInner {
                sessions: SessionStore::new(Duration::from_secs(config.session_ttl_secs)),
                client,
                metrics: UsageMetrics::new(),
                cookie_key,
                pages: Pages::new(config.max_upload_bytes)?,
                max_upload_bytes: config.max_upload_bytes,
                max_prompt_chars: config.max_prompt_chars,
                chat_history_turns: config.chat_history_turns,
            }),
        })
    }

    /// Usage counters accumulated since startup.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    async fn active_document(&self, jar: &SignedCookieJar) -> Result<Arc<Document>, ApiError> {
        let id = session_id(jar).ok_or(ApiError::NoDocument)?;
        self.sessions()
            .with_session(id, |session| session.document())
            .await
            .flatten()
            .ok_or(ApiError::NoDocument)
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.inner.cookie_key.clone()
    }
}

/// Build the HTTP router.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.inner.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/preview", get(preview))
        .route("/summarize", post(summarize))
        .route("/chat", post(chat))
        .route("/history", get(history))
        .route("/export", get(export_summary))
        .route("/reset", post(reset))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn session_id(jar: &SignedCookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

fn session_cookie(id: Uuid) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Render the page for the caller's session, or the empty page when there is none.
async fn index(State(state): State<AppState>, jar: SignedCookieJar) -> Result<Html<String>, ApiError> {
    let view = match session_id(&jar) {
        Some(id) => state
            .sessions()
            .with_session(id, |session| PageView::from(&*session))
            .await
            .unwrap_or_default(),
        None => PageView::default(),
    };
    state
        .inner
        .pages
        .render_index(&view)
        .map(Html)
        .map_err(|error| ApiError::Internal(format!("template rendering failed: {error:#}")))
}

/// Success response for `POST /upload`.
#[derive(Serialize)]
struct UploadResponse {
    document: DocumentPreview,
    #[serde(skip_serializing_if = "Option::is_none")]
    replaced: Option<String>,
}

/// Validate, extract, and store an uploaded file as the session's active document.
async fn upload(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    WithRejection(multipart, _): WithRejection<Multipart, ApiError>,
) -> Result<(SignedCookieJar, Json<UploadResponse>), ApiError> {
    let result = receive_document(multipart).await;
    let (filename, format, bytes) = match result {
        Ok(upload) => upload,
        Err(error) => {
            state.inner.metrics.record_extraction_failure();
            return Err(error);
        }
    };

    let size_bytes = bytes.len();
    let extracted = tokio::task::spawn_blocking(move || extract::extract(format, &bytes))
        .await
        .unwrap_or_else(|join_error| {
            tracing::error!(error = %join_error, "Extractor panicked");
            Err(ExtractError::corrupted(format, "the parser failed on this file"))
        });
    let content = match extracted {
        Ok(content) => content,
        Err(error) => {
            state.inner.metrics.record_extraction_failure();
            tracing::warn!(filename = %filename, %format, error = %error, "Extraction failed");
            return Err(error.into());
        }
    };
    state.inner.metrics.record_extraction();

    let document = Document::new(filename, format, size_bytes, content);
    let preview = DocumentPreview::from(&document);
    let id = state.sessions().get_or_create(session_id(&jar)).await;
    let replaced = state
        .sessions()
        .with_session(id, |session| session.replace_document(document))
        .await
        .ok_or(ApiError::SessionExpired)?
        .map(|previous| previous.filename.clone());

    tracing::info!(
        session = %id,
        filename = %preview.filename,
        %format,
        size_bytes,
        chars = preview.char_count,
        replaced = ?replaced,
        "Document uploaded"
    );
    Ok((
        jar.add(session_cookie(id)),
        Json(UploadResponse {
            document: preview,
            replaced,
        }),
    ))
}

/// Pull the upload field out of the multipart body and check its name and extension.
async fn receive_document(mut multipart: Multipart) -> Result<(String, DocumentFormat, Bytes), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if !field.name().is_some_and(|name| UPLOAD_FIELDS.contains(&name)) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().trim().to_string();
        if filename.is_empty() {
            return Err(ApiError::BadRequest(
                "No file selected. Please choose a document to upload.".into(),
            ));
        }
        let format = DocumentFormat::from_filename(&filename)?;
        let bytes = field.bytes().await?;
        return Ok((filename, format, bytes));
    }
    Err(ApiError::BadRequest(
        "No file part in the request. Please select a file.".into(),
    ))
}

/// Preview of the active document.
async fn preview(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Json<DocumentPreview>, ApiError> {
    let document = state.active_document(&jar).await?;
    Ok(Json(DocumentPreview::from(&*document)))
}

/// Summarize the active document and store the result as the session's latest summary.
async fn summarize(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Json<SummaryView>, ApiError> {
    let document = state.active_document(&jar).await?;
    let request = prompt::summary_request(
        &document.content.to_prompt_text(),
        state.inner.max_prompt_chars,
    );

    let text = state.inner.client.generate(request).await.map_err(|error| {
        state.inner.metrics.record_upstream_failure();
        ApiError::from(error)
    })?;
    state.inner.metrics.record_summary();

    let summary = Summary {
        document_id: document.id,
        filename: document.filename.clone(),
        text,
        generated_at: OffsetDateTime::now_utc(),
    };
    let view = SummaryView::from(&summary);
    let id = session_id(&jar).ok_or(ApiError::SessionExpired)?;
    state
        .sessions()
        .with_session(id, |session| session.record_summary(summary))
        .await
        .ok_or_else(|| {
            tracing::warn!(session = %id, "Session ended before the summary could be stored");
            ApiError::SessionExpired
        })?;
    tracing::info!(filename = %document.filename, chars = view.summary.len(), "Summary generated");
    Ok(Json(view))
}

/// Request body for `POST /chat`.
#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    question: String,
}

/// Success response for `POST /chat`.
#[derive(Serialize)]
struct ChatResponse {
    answer: String,
    history_len: usize,
}

/// Answer a question about the active document and append the exchange to the history.
async fn chat(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    WithRejection(Json(request), _): WithRejection<Json<ChatRequest>, ApiError>,
) -> Result<Json<ChatResponse>, ApiError> {
    let id = session_id(&jar).ok_or(ApiError::NoDocument)?;
    let turns = state.inner.chat_history_turns;
    let (document, history) = state
        .sessions()
        .with_session(id, |session| {
            session
                .document()
                .map(|document| {
                    let history = session.recent_exchanges(document.id, turns);
                    (document, history)
                })
        })
        .await
        .flatten()
        .ok_or(ApiError::NoDocument)?;

    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Please provide a question.".into()));
    }

    let request = prompt::chat_request(
        question,
        &document.content.to_prompt_text(),
        &history,
        state.inner.max_prompt_chars,
    );
    let answer = state.inner.client.generate(request).await.map_err(|error| {
        state.inner.metrics.record_upstream_failure();
        ApiError::from(error)
    })?;
    state.inner.metrics.record_chat_answer();

    let exchange = ChatExchange {
        document_id: document.id,
        question: question.to_string(),
        answer: answer.clone(),
        asked_at: OffsetDateTime::now_utc(),
    };
    let history_len = state
        .sessions()
        .with_session(id, |session| session.append_exchange(exchange))
        .await
        .ok_or_else(|| {
            tracing::warn!(session = %id, "Session ended before the answer could be stored");
            ApiError::SessionExpired
        })?;

    tracing::info!(session = %id, history_len, "Chat question answered");
    Ok(Json(ChatResponse { answer, history_len }))
}

/// Response body for `GET /history`.
#[derive(Serialize)]
struct HistoryResponse {
    exchanges: Vec<ExchangeView>,
}

/// Return the session's chat history in order.
async fn history(State(state): State<AppState>, jar: SignedCookieJar) -> Json<HistoryResponse> {
    let exchanges = match session_id(&jar) {
        Some(id) => state
            .sessions()
            .with_session(id, |session| {
                session
                    .history()
                    .iter()
                    .map(ExchangeView::from)
                    .collect::<Vec<_>>()
            })
            .await
            .unwrap_or_default(),
        None => Vec::new(),
    };
    Json(HistoryResponse { exchanges })
}

/// Download the latest summary as a plain-text file.
async fn export_summary(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let id = session_id(&jar).ok_or(ApiError::NoSummary)?;
    let summary = state
        .sessions()
        .with_session(id, |session| session.summary().cloned())
        .await
        .flatten()
        .ok_or(ApiError::NoSummary)?;

    let disposition = format!(
        "attachment; filename=\"{}_summary.txt\"",
        export_stem(&summary.filename)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        summary.text,
    ))
}

/// Filename stem reduced to characters that are safe inside a quoted header value.
fn export_stem(filename: &str) -> String {
    let stem = std::path::Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "document".into()
    } else {
        cleaned
    }
}

/// Discard the caller's session and clear the cookie.
async fn reset(State(state): State<AppState>, jar: SignedCookieJar) -> (SignedCookieJar, StatusCode) {
    if let Some(id) = session_id(&jar) {
        if state.sessions().remove(id).await {
            tracing::info!(session = %id, "Session reset");
        }
    }
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    )
}

async fn health() -> &'static str {
    "OK"
}

/// Response body for `GET /metrics`.
#[derive(Serialize)]
struct MetricsResponse {
    #[serde(flatten)]
    usage: MetricsSnapshot,
    active_sessions: usize,
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        usage: state.metrics_snapshot(),
        active_sessions: state.sessions().len().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::{GenerationError, GenerationRequest};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, Response},
    };
    use serde_json::{Value, json};
    use tokio::sync::{Mutex, Notify};
    use tower::ServiceExt;

    const BOUNDARY: &str = "docsum-test-boundary";

    struct StubClient {
        replies: Mutex<Vec<Result<String, GenerationError>>>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl StubClient {
        fn replying(replies: Vec<Result<String, GenerationError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                requests: Mutex::new(Vec::new()),
            })
        }

        async fn requests(&self) -> Vec<GenerationRequest> {
            self.requests.lock().await.clone()
        }
    }

    #[async_trait]
    impl GenerativeClient for StubClient {
        async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
            self.requests.lock().await.push(request);
            self.replies
                .lock()
                .await
                .pop()
                .unwrap_or_else(|| Err(GenerationError::InvalidResponse("no stub reply".into())))
        }
    }

    /// Holds every call until released, signalling when one arrives.
    #[derive(Default)]
    struct GatedClient {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl GenerativeClient for GatedClient {
        async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok("Late reply.".into())
        }
    }

    fn app(client: Arc<dyn GenerativeClient>) -> Router {
        let config = Config::for_tests("http://unused.invalid");
        create_router(AppState::new(&config, client).expect("state"))
    }

    fn multipart_body(field: &str, filename: &str, contents: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(field: &str, filename: &str, contents: &[u8]) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(field, filename, contents)))
            .expect("request")
    }

    fn cookie_from(response: &Response<Body>) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie")
            .to_str()
            .expect("ascii cookie");
        set_cookie.split(';').next().expect("cookie pair").to_string()
    }

    fn with_cookie(method: Method, uri: &str, cookie: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .expect("request")
    }

    async fn json_body(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn upload_csv_returns_preview_and_cookie() {
        let app = app(StubClient::replying(vec![]));
        let response = app
            .oneshot(upload_request("file", "people.csv", b"name,team\nada,core\n"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(cookie_from(&response).starts_with("docsum_session="));
        let body = json_body(response).await;
        assert_eq!(body["document"]["format"], "csv");
        assert_eq!(body["document"]["sheets"][0]["rows"][1], json!(["ada", "core"]));
        assert!(body["document"]["char_count"].as_u64().expect("count") > 0);
    }

    #[tokio::test]
    async fn legacy_field_name_is_accepted() {
        let app = app(StubClient::replying(vec![]));
        let response = app
            .oneshot(upload_request("pdf_file", "page.html", b"<p>Hello</p>"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unsupported_upload_is_rejected() {
        let app = app(StubClient::replying(vec![]));
        let response = app
            .oneshot(upload_request("file", "notes.docx", b"PK"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body = json_body(response).await;
        assert!(body["error"].as_str().expect("error").contains("Allowed types"));
    }

    #[tokio::test]
    async fn empty_filename_and_missing_field_are_bad_requests() {
        let app = app(StubClient::replying(vec![]));
        let response = app
            .clone()
            .oneshot(upload_request("file", "", b""))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"]
            .as_str()
            .expect("error")
            .contains("No file selected"));

        let response = app
            .oneshot(upload_request("other", "a.csv", b"a"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"]
            .as_str()
            .expect("error")
            .contains("No file part"));
    }

    #[tokio::test]
    async fn blank_document_is_unprocessable() {
        let app = app(StubClient::replying(vec![]));
        let response = app
            .oneshot(upload_request("file", "empty.html", b"<html><body>  </body></html>"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn summarize_without_document_is_an_error() {
        let client = StubClient::replying(vec![Ok("unused".into())]);
        let app = app(client.clone());
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/summarize")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().expect("error").contains("No document uploaded"));
        assert!(client.requests().await.is_empty());
    }

    #[tokio::test]
    async fn export_returns_latest_summary() {
        let client = StubClient::replying(vec![Ok("First summary.".into()), Ok("Second summary.".into())]);
        let app = app(client.clone());

        let response = app
            .clone()
            .oneshot(upload_request("file", "Q3 report.html", b"<h1>Revenue up</h1>"))
            .await
            .expect("upload");
        let cookie = cookie_from(&response);

        let response = app
            .clone()
            .oneshot(with_cookie(Method::GET, "/export", &cookie, Body::empty()))
            .await
            .expect("export before summary");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        for expected in ["First summary.", "Second summary."] {
            let response = app
                .clone()
                .oneshot(with_cookie(Method::POST, "/summarize", &cookie, Body::empty()))
                .await
                .expect("summarize");
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json_body(response).await["summary"], expected);
        }

        let response = app
            .oneshot(with_cookie(Method::GET, "/export", &cookie, Body::empty()))
            .await
            .expect("export");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Q3_report_summary.txt\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert_eq!(&bytes[..], b"Second summary.");

        let requests = client.requests().await;
        assert_eq!(requests.len(), 2);
        assert!(requests[0].turns[0].text.contains("Revenue up"));
    }

    #[tokio::test]
    async fn chat_history_accumulates_and_is_replayed() {
        let client = StubClient::replying(vec![Ok("It is about revenue.".into()), Ok("Up 10%.".into())]);
        let app = app(client.clone());

        let response = app
            .clone()
            .oneshot(upload_request("file", "q3.html", b"<p>Revenue rose 10%</p>"))
            .await
            .expect("upload");
        let cookie = cookie_from(&response);

        for (question, history_len) in [("What is this?", 1), ("By how much?", 2)] {
            let response = app
                .clone()
                .oneshot(with_cookie(
                    Method::POST,
                    "/chat",
                    &cookie,
                    Body::from(json!({ "question": question }).to_string()),
                ))
                .await
                .expect("chat");
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json_body(response).await["history_len"], history_len);
        }

        let response = app
            .oneshot(with_cookie(Method::GET, "/history", &cookie, Body::empty()))
            .await
            .expect("history");
        let body = json_body(response).await;
        let exchanges = body["exchanges"].as_array().expect("exchanges");
        assert_eq!(exchanges.len(), 2);
        assert_eq!(exchanges[0]["question"], "What is this?");
        assert_eq!(exchanges[1]["answer"], "Up 10%.");

        let requests = client.requests().await;
        assert_eq!(requests[0].turns.len(), 1);
        assert_eq!(requests[1].turns.len(), 3);
        assert_eq!(requests[1].turns[0].text, "What is this?");
    }

    #[tokio::test]
    async fn failed_answers_leave_history_intact() {
        let client = StubClient::replying(vec![
            Ok("First answer.".into()),
            Err(GenerationError::RateLimited { status: 429 }),
        ]);
        let app = app(client);

        let response = app
            .clone()
            .oneshot(upload_request("file", "doc.html", b"<p>Body</p>"))
            .await
            .expect("upload");
        let cookie = cookie_from(&response);

        let ask = |question: &str| {
            with_cookie(
                Method::POST,
                "/chat",
                &cookie,
                Body::from(json!({ "question": question }).to_string()),
            )
        };
        let response = app.clone().oneshot(ask("one")).await.expect("chat");
        assert_eq!(response.status(), StatusCode::OK);
        let response = app.clone().oneshot(ask("two")).await.expect("chat");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = app
            .oneshot(with_cookie(Method::GET, "/history", &cookie, Body::empty()))
            .await
            .expect("history");
        let body = json_body(response).await;
        assert_eq!(body["exchanges"].as_array().expect("exchanges").len(), 1);
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let client = StubClient::replying(vec![]);
        let app = app(client.clone());
        let response = app
            .clone()
            .oneshot(upload_request("file", "doc.html", b"<p>Body</p>"))
            .await
            .expect("upload");
        let cookie = cookie_from(&response);

        let response = app
            .oneshot(with_cookie(
                Method::POST,
                "/chat",
                &cookie,
                Body::from(json!({ "question": "   " }).to_string()),
            ))
            .await
            .expect("chat");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(client.requests().await.is_empty());
    }

    #[tokio::test]
    async fn tampered_cookie_is_ignored() {
        let app = app(StubClient::replying(vec![]));
        let response = app
            .clone()
            .oneshot(upload_request("file", "doc.html", b"<p>Body</p>"))
            .await
            .expect("upload");
        let cookie = cookie_from(&response);
        let forged = format!("docsum_session={}", Uuid::new_v4());
        assert_ne!(cookie, forged);

        let response = app
            .oneshot(with_cookie(Method::GET, "/preview", &forged, Body::empty()))
            .await
            .expect("preview");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reset_discards_the_document() {
        let app = app(StubClient::replying(vec![]));
        let response = app
            .clone()
            .oneshot(upload_request("file", "doc.html", b"<p>Body</p>"))
            .await
            .expect("upload");
        let cookie = cookie_from(&response);

        let response = app
            .clone()
            .oneshot(with_cookie(Method::POST, "/reset", &cookie, Body::empty()))
            .await
            .expect("reset");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(with_cookie(Method::GET, "/preview", &cookie, Body::empty()))
            .await
            .expect("preview");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn index_renders_session_state() {
        let client = StubClient::replying(vec![Ok("A <b>bold</b> summary.".into())]);
        let app = app(client);
        let response = app
            .clone()
            .oneshot(upload_request("file", "doc.html", b"<p>Body text</p>"))
            .await
            .expect("upload");
        let cookie = cookie_from(&response);
        app.clone()
            .oneshot(with_cookie(Method::POST, "/summarize", &cookie, Body::empty()))
            .await
            .expect("summarize");

        let response = app
            .oneshot(with_cookie(Method::GET, "/", &cookie, Body::empty()))
            .await
            .expect("index");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let html = String::from_utf8(bytes.to_vec()).expect("utf8");
        assert!(html.contains("doc.html"));
        assert!(html.contains("Body text"));
        assert!(html.contains("A &lt;b&gt;bold&lt;/b&gt; summary."));
    }

    #[tokio::test]
    async fn metrics_count_uploads_and_failures() {
        let config = Config::for_tests("http://unused.invalid");
        let state = AppState::new(&config, StubClient::replying(vec![])).expect("state");
        let app = create_router(state.clone());
        app.clone()
            .oneshot(upload_request("file", "a.csv", b"x,y\n"))
            .await
            .expect("upload");
        app.clone()
            .oneshot(upload_request("file", "a.txt", b"x"))
            .await
            .expect("upload");

        let snapshot = state.metrics_snapshot();
        assert_eq!(snapshot.documents_extracted, 1);
        assert_eq!(snapshot.extraction_failures, 1);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("metrics");
        let body = json_body(response).await;
        assert_eq!(body["documents_extracted"], 1);
        assert_eq!(body["active_sessions"], 1);
    }

    #[test]
    fn export_stem_is_header_safe() {
        assert_eq!(export_stem("report.pdf"), "report");
        assert_eq!(export_stem("my \"quoted\" file.csv"), "my__quoted__file");
        assert_eq!(export_stem("../etc/passwd"), "passwd");
        assert_eq!(export_stem(""), "document");
    }

    #[tokio::test]
    async fn malformed_chat_bodies_get_json_errors() {
        let app = app(StubClient::replying(vec![]));

        let response = app
            .clone()
            .oneshot(with_cookie(Method::POST, "/chat", "", Body::from("not json")))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/chat")
                    .body(Body::from(json!({ "question": "Hi" }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(json_body(response).await["error"]
            .as_str()
            .expect("error")
            .contains("application/json"));
    }

    #[tokio::test]
    async fn non_multipart_upload_gets_json_error() {
        let app = app(StubClient::replying(vec![]));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/upload")
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from("just text"))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!(json_body(response).await["error"]
            .as_str()
            .expect("error")
            .contains("Could not read the upload"));
    }

    #[tokio::test]
    async fn reset_during_generation_reports_session_end() {
        for (uri, body) in [
            ("/summarize", Body::empty()),
            ("/chat", Body::from(json!({ "question": "What?" }).to_string())),
        ] {
            let client = Arc::new(GatedClient::default());
            let app = app(client.clone());
            let response = app
                .clone()
                .oneshot(upload_request("file", "doc.html", b"<p>Body</p>"))
                .await
                .expect("upload");
            let cookie = cookie_from(&response);

            let pending = tokio::spawn(
                app.clone()
                    .oneshot(with_cookie(Method::POST, uri, &cookie, body)),
            );
            client.entered.notified().await;
            let response = app
                .clone()
                .oneshot(with_cookie(Method::POST, "/reset", &cookie, Body::empty()))
                .await
                .expect("reset");
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
            client.release.notify_one();

            let response = pending.await.expect("task").expect("response");
            assert_eq!(response.status(), StatusCode::GONE, "{uri}");
            assert!(json_body(response).await["error"]
                .as_str()
                .expect("error")
                .contains("session ended"));

            let response = app
                .oneshot(with_cookie(Method::GET, "/export", &cookie, Body::empty()))
                .await
                .expect("export");
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }
}
