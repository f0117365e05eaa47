use super::Extracted;
use scraper::Html;

const INVISIBLE_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Collect the visible text nodes of an HTML page, one trimmed node per line.
///
/// HTML parsing never fails; malformed markup is repaired by the parser.
pub(super) fn extract_html(bytes: &[u8]) -> Extracted {
    let source = String::from_utf8_lossy(bytes);
    let document = Html::parse_document(&source);

    let lines: Vec<&str> = document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| INVISIBLE_ELEMENTS.contains(&element.name()))
            });
            if hidden {
                return None;
            }
            let trimmed = text.trim();
            (!trimmed.is_empty()).then_some(trimmed)
        })
        .collect();

    Extracted::Text {
        text: lines.join("\n"),
        pages: None,
    }
}
