//! In-memory, per-browser session state.
//!
//! A session ties at most one active [`Document`] to the most recent [`Summary`] and an
//! append-only chat history. Sessions live only in process memory: they are discarded once idle
//! past the configured TTL, on explicit reset, or when the server restarts.

use crate::extract::{DocumentFormat, Extracted};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

/// An uploaded document and its extracted content.
#[derive(Debug)]
pub struct Document {
    /// Identifier assigned at upload time.
    pub id: Uuid,
    /// Filename supplied by the browser.
    pub filename: String,
    /// Format detected from the filename.
    pub format: DocumentFormat,
    /// Size of the uploaded bytes.
    pub size_bytes: usize,
    /// Extracted text or tabular content.
    pub content: Extracted,
    /// Upload time.
    pub uploaded_at: OffsetDateTime,
}

impl Document {
    /// Build a document stamped with a fresh identifier and the current time.
    pub fn new(filename: String, format: DocumentFormat, size_bytes: usize, content: Extracted) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename,
            format,
            size_bytes,
            content,
            uploaded_at: OffsetDateTime::now_utc(),
        }
    }
}

/// A generated summary and the document it describes.
#[derive(Debug, Clone)]
pub struct Summary {
    /// Document the summary was generated from.
    pub document_id: Uuid,
    /// Filename of that document.
    pub filename: String,
    /// Model output.
    pub text: String,
    /// Generation time.
    pub generated_at: OffsetDateTime,
}

/// One answered chat question.
#[derive(Debug, Clone)]
pub struct ChatExchange {
    /// Document that was active when the question was asked.
    pub document_id: Uuid,
    /// User question.
    pub question: String,
    /// Model answer.
    pub answer: String,
    /// Time the answer was recorded.
    pub asked_at: OffsetDateTime,
}

/// Server-side state for one browser.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    document: Option<Arc<Document>>,
    summary: Option<Summary>,
    history: Vec<ChatExchange>,
    last_seen: Instant,
}

impl Session {
    fn new(id: Uuid) -> Self {
        Self {
            id,
            document: None,
            summary: None,
            history: Vec::new(),
            last_seen: Instant::now(),
        }
    }

    /// Active document, if one was uploaded.
    pub fn document(&self) -> Option<Arc<Document>> {
        self.document.clone()
    }

    /// Install `document` as the active document, returning the one it replaces.
    ///
    /// The previous summary and chat history are kept.
    pub fn replace_document(&mut self, document: Document) -> Option<Arc<Document>> {
        self.document.replace(Arc::new(document))
    }

    /// Most recently generated summary.
    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    /// Record a freshly generated summary, superseding any earlier one.
    pub fn record_summary(&mut self, summary: Summary) {
        self.summary = Some(summary);
    }

    /// Full chat history in the order questions were answered.
    pub fn history(&self) -> &[ChatExchange] {
        &self.history
    }

    /// Append an answered question. History is never truncated or reordered.
    pub fn append_exchange(&mut self, exchange: ChatExchange) -> usize {
        self.history.push(exchange);
        self.history.len()
    }

    /// The last `limit` exchanges about `document_id`, oldest first.
    pub fn recent_exchanges(&self, document_id: Uuid, limit: usize) -> Vec<ChatExchange> {
        let mut recent: Vec<ChatExchange> = self
            .history
            .iter()
            .rev()
            .filter(|exchange| exchange.document_id == document_id)
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        recent
    }
}

/// Shared map of live sessions with idle expiry.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create an empty store whose sessions expire after `ttl` without access.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Return `id` when it names a live session, otherwise create a new session.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> Uuid {
        let mut sessions = self.sessions.lock().await;
        self.prune(&mut sessions);
        if let Some(session) = id.and_then(|id| sessions.get_mut(&id)) {
            session.last_seen = Instant::now();
            return session.id;
        }
        let id = Uuid::new_v4();
        sessions.insert(id, Session::new(id));
        tracing::debug!(session = %id, live = sessions.len(), "Created session");
        id
    }

    /// Run `f` against the live session `id`, refreshing its idle timer.
    ///
    /// Returns `None` when the session does not exist or has expired.
    pub async fn with_session<R>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut sessions = self.sessions.lock().await;
        self.prune(&mut sessions);
        let session = sessions.get_mut(&id)?;
        session.last_seen = Instant::now();
        Some(f(session))
    }

    /// Discard session `id`. Returns whether it existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.lock().await.remove(&id).is_some()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        self.prune(&mut sessions);
        sessions.len()
    }

    /// Whether no sessions are live.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn prune(&self, sessions: &mut HashMap<Uuid, Session>) {
        let before = sessions.len();
        sessions.retain(|_, session| session.last_seen.elapsed() <= self.ttl);
        let expired = before - sessions.len();
        if expired > 0 {
            tracing::debug!(expired, "Pruned idle sessions");
        }
    }
}
