use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing document and model activity.
#[derive(Default)]
pub struct UsageMetrics {
    documents_extracted: AtomicU64,
    extraction_failures: AtomicU64,
    summaries_generated: AtomicU64,
    chat_answers: AtomicU64,
    upstream_failures: AtomicU64,
}

impl UsageMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully extracted upload.
    pub fn record_extraction(&self) {
        self.documents_extracted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an upload that was rejected or could not be parsed.
    pub fn record_extraction_failure(&self) {
        self.extraction_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a generated summary.
    pub fn record_summary(&self) {
        self.summaries_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an answered chat question.
    pub fn record_chat_answer(&self) {
        self.chat_answers.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed call to the model provider.
    pub fn record_upstream_failure(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_extracted: self.documents_extracted.load(Ordering::Relaxed),
            extraction_failures: self.extraction_failures.load(Ordering::Relaxed),
            summaries_generated: self.summaries_generated.load(Ordering::Relaxed),
            chat_answers: self.chat_answers.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of usage counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Uploads extracted since startup.
    pub documents_extracted: u64,
    /// Uploads rejected or unreadable since startup.
    pub extraction_failures: u64,
    /// Summaries generated since startup.
    pub summaries_generated: u64,
    /// Chat questions answered since startup.
    pub chat_answers: u64,
    /// Failed model calls since startup.
    pub upstream_failures: u64,
}
