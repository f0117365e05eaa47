//! Format-specific extraction of uploaded documents into prompt-ready content.
//!
//! Each extractor turns raw bytes into either plain text (PDF, HTML) or a table-like structure
//! (CSV, XLSX). Callers dispatch through [`extract`], which also rejects extractions that
//! produced nothing but whitespace.

mod html;
mod pdf;
mod tabular;

use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// File extensions accepted by the upload handler, in display order.
pub const ALLOWED_EXTENSIONS: [&str; 4] = [".pdf", ".csv", ".xlsx", ".html"];

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Comma-separated values.
    Csv,
    /// Office Open XML workbook.
    Xlsx,
    /// HTML page.
    Html,
}

impl DocumentFormat {
    /// Detect the format from a filename's extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self, ExtractError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            "html" | "htm" => Ok(Self::Html),
            _ => Err(ExtractError::Unsupported { extension }),
        }
    }

    /// Human readable label used in messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Csv => "CSV",
            Self::Xlsx => "XLSX",
            Self::Html => "HTML",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors surfaced to the user when a file cannot be turned into content.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Extension is not one of [`ALLOWED_EXTENSIONS`].
    #[error("Invalid file type '{extension}'. Allowed types are: {}", ALLOWED_EXTENSIONS.join(", "))]
    Unsupported {
        /// Lowercased extension without the leading dot (empty when missing).
        extension: String,
    },
    /// Parsing library rejected the file.
    #[error("Could not read the {format} file, it may be corrupted: {reason}")]
    Corrupted {
        /// Declared format of the upload.
        format: DocumentFormat,
        /// Diagnostic from the parsing library.
        reason: String,
    },
    /// File parsed but contained no text.
    #[error(
        "Could not extract any text from the {0} file. The file might be empty, corrupted, or an unsupported format."
    )]
    Empty(DocumentFormat),
}

impl ExtractError {
    pub(crate) fn corrupted(format: DocumentFormat, reason: impl fmt::Display) -> Self {
        Self::Corrupted {
            format,
            reason: reason.to_string(),
        }
    }
}

/// One sheet of tabular content. CSV files produce a single unnamed sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sheet {
    /// Worksheet title, absent for CSV.
    pub name: Option<String>,
    /// Cell values row by row; empty cells are empty strings.
    pub rows: Vec<Vec<String>>,
}

/// Content extracted from an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    /// Running text, with the page count when the format has pages.
    Text {
        /// Extracted text.
        text: String,
        /// Number of pages in the source document, when known.
        pages: Option<usize>,
    },
    /// Table-like content.
    Table {
        /// Sheets in workbook order.
        sheets: Vec<Sheet>,
    },
}

impl Extracted {
    /// Render the content as the plain text forwarded to the model.
    ///
    /// Tables become one `Sheet: <name>` header per named sheet followed by comma-joined rows.
    pub fn to_prompt_text(&self) -> String {
        match self {
            Self::Text { text, .. } => text.clone(),
            Self::Table { sheets } => {
                let mut out = String::new();
                for sheet in sheets {
                    if let Some(name) = &sheet.name {
                        out.push_str("Sheet: ");
                        out.push_str(name);
                        out.push('\n');
                    }
                    for row in &sheet.rows {
                        out.push_str(&row.join(", "));
                        out.push('\n');
                    }
                }
                out
            }
        }
    }

    /// True when no non-whitespace text was extracted.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text { text, .. } => text.trim().is_empty(),
            Self::Table { sheets } => sheets
                .iter()
                .flat_map(|sheet| sheet.rows.iter().flatten())
                .all(|cell| cell.trim().is_empty()),
        }
    }

    /// Number of characters in the prompt rendering.
    pub fn char_count(&self) -> usize {
        self.to_prompt_text().chars().count()
    }
}

/// Extract content from `bytes` according to `format`.
pub fn extract(format: DocumentFormat, bytes: &[u8]) -> Result<Extracted, ExtractError> {
    let extracted = match format {
        DocumentFormat::Pdf => pdf::extract_pdf(bytes)?,
        DocumentFormat::Csv => tabular::extract_csv(bytes)?,
        DocumentFormat::Xlsx => tabular::extract_xlsx(bytes)?,
        DocumentFormat::Html => html::extract_html(bytes),
    };

    if extracted.is_blank() {
        return Err(ExtractError::Empty(format));
    }
    tracing::debug!(%format, chars = extracted.char_count(), "Extracted document content");
    Ok(extracted)
}

/// Detect the format from `filename` and extract `bytes`.
pub fn extract_file(filename: &str, bytes: &[u8]) -> Result<(DocumentFormat, Extracted), ExtractError> {
    let format = DocumentFormat::from_filename(filename)?;
    extract(format, bytes).map(|content| (format, content))
}
