use super::{DocumentFormat, ExtractError, Extracted};

/// Extract the text layer of a PDF. Image-only PDFs come back blank and are rejected upstream.
pub(super) fn extract_pdf(bytes: &[u8]) -> Result<Extracted, ExtractError> {
    let raw = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|error| ExtractError::corrupted(DocumentFormat::Pdf, error))?;

    let pages = match lopdf::Document::load_mem(bytes) {
        Ok(document) => Some(document.get_pages().len()),
        Err(error) => {
            tracing::debug!(error = %error, "lopdf could not count pages");
            None
        }
    };

    Ok(Extracted::Text {
        text: normalize(&raw),
        pages,
    })
}

/// Drop NUL bytes and trailing whitespace, and collapse runs of blank lines.
fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0usize;
    for line in raw.replace('\0', "").lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}
