//! Serializable views of session state shared by the JSON endpoints and the page template.

use crate::extract::{DocumentFormat, Extracted, Sheet};
use crate::session::{ChatExchange, Document, Session, Summary};
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

/// Characters of running text included in a preview.
pub const PREVIEW_TEXT_CHARS: usize = 2000;
/// Rows per sheet included in a preview.
pub const PREVIEW_ROWS: usize = 20;

fn rfc3339(timestamp: OffsetDateTime) -> String {
    timestamp.format(&Rfc3339).unwrap_or_default()
}

/// Preview of the active document.
#[derive(Debug, Serialize)]
pub struct DocumentPreview {
    pub(crate) id: Uuid,
    pub(crate) filename: String,
    pub(crate) format: DocumentFormat,
    pub(crate) size_bytes: usize,
    pub(crate) char_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) pages: Option<usize>,
    pub(crate) uploaded_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) text: Option<String>,
    pub(crate) text_truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) sheets: Option<Vec<SheetPreview>>,
}

/// Leading rows of one sheet.
#[derive(Debug, Serialize)]
pub struct SheetPreview {
    pub(crate) name: Option<String>,
    pub(crate) total_rows: usize,
    pub(crate) rows: Vec<Vec<String>>,
}

impl From<&Sheet> for SheetPreview {
    fn from(sheet: &Sheet) -> Self {
        Self {
            name: sheet.name.clone(),
            total_rows: sheet.rows.len(),
            rows: sheet.rows.iter().take(PREVIEW_ROWS).cloned().collect(),
        }
    }
}

impl From<&Document> for DocumentPreview {
    fn from(document: &Document) -> Self {
        let (text, text_truncated, pages, sheets) = match &document.content {
            Extracted::Text { text, pages } => {
                let preview: String = text.chars().take(PREVIEW_TEXT_CHARS).collect();
                let truncated = preview.len() < text.len();
                (Some(preview), truncated, *pages, None)
            }
            Extracted::Table { sheets } => (
                None,
                false,
                None,
                Some(sheets.iter().map(SheetPreview::from).collect()),
            ),
        };
        Self {
            id: document.id,
            filename: document.filename.clone(),
            format: document.format,
            size_bytes: document.size_bytes,
            char_count: document.content.char_count(),
            pages,
            uploaded_at: rfc3339(document.uploaded_at),
            text,
            text_truncated,
            sheets,
        }
    }
}

/// The latest summary.
#[derive(Debug, Serialize)]
pub struct SummaryView {
    pub(crate) summary: String,
    pub(crate) filename: String,
    pub(crate) generated_at: String,
}

impl From<&Summary> for SummaryView {
    fn from(summary: &Summary) -> Self {
        Self {
            summary: summary.text.clone(),
            filename: summary.filename.clone(),
            generated_at: rfc3339(summary.generated_at),
        }
    }
}

/// One chat exchange.
#[derive(Debug, Serialize)]
pub struct ExchangeView {
    pub(crate) document_id: Uuid,
    pub(crate) question: String,
    pub(crate) answer: String,
    pub(crate) asked_at: String,
}

impl From<&ChatExchange> for ExchangeView {
    fn from(exchange: &ChatExchange) -> Self {
        Self {
            document_id: exchange.document_id,
            question: exchange.question.clone(),
            answer: exchange.answer.clone(),
            asked_at: rfc3339(exchange.asked_at),
        }
    }
}

/// Everything the page template renders.
#[derive(Debug, Default, Serialize)]
pub struct PageView {
    pub(crate) document: Option<DocumentPreview>,
    pub(crate) summary: Option<SummaryView>,
    pub(crate) history: Vec<ExchangeView>,
}

impl From<&Session> for PageView {
    fn from(session: &Session) -> Self {
        Self {
            document: session.document().as_deref().map(DocumentPreview::from),
            summary: session.summary().map(SummaryView::from),
            history: session.history().iter().map(ExchangeView::from).collect(),
        }
    }
}
