#![deny(missing_docs)]

//! Core library for docsum: upload a document, summarize it with Gemini, and chat about it.

/// HTTP routing, session cookies, and request handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Text and table extraction for PDF, CSV, XLSX, and HTML uploads.
pub mod extract;
/// Gemini `generateContent` client and the generation trait.
pub mod gemini;
/// Structured logging and tracing setup.
pub mod logging;
/// Usage counters.
pub mod metrics;
/// Prompt construction and content truncation.
pub mod prompt;
/// In-memory per-visitor session state.
pub mod session;
