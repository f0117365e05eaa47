use super::{DocumentFormat, ExtractError, Extracted, Sheet};
use calamine::{Reader, Xlsx};
use std::borrow::Cow;
use std::io::Cursor;

/// Parse CSV bytes into a single unnamed sheet.
///
/// Bytes are decoded as UTF-8 and fall back to Latin-1 when that fails. Rows may have differing
/// lengths and the first row is kept as data.
pub(super) fn extract_csv(bytes: &[u8]) -> Result<Extracted, ExtractError> {
    let text = decode_text(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|error| ExtractError::corrupted(DocumentFormat::Csv, error))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Extracted::Table {
        sheets: vec![Sheet { name: None, rows }],
    })
}

/// Parse an XLSX workbook, one [`Sheet`] per worksheet in workbook order.
pub(super) fn extract_xlsx(bytes: &[u8]) -> Result<Extracted, ExtractError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|error| ExtractError::corrupted(DocumentFormat::Xlsx, error))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|error| ExtractError::corrupted(DocumentFormat::Xlsx, error))?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        sheets.push(Sheet {
            name: Some(name),
            rows,
        });
    }

    Ok(Extracted::Table { sheets })
}

fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            tracing::debug!("CSV is not valid UTF-8; decoding as Latin-1");
            Cow::Owned(bytes.iter().map(|&byte| char::from(byte)).collect())
        }
    }
}
