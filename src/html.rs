//! HTML to plain text.

use scraper::{ElementRef, Html};

/// Elements whose subtrees never contribute text.
const SKIPPED: &[&str] = &["script", "style", "nav", "header", "footer", "noscript"];

/// Visible text of an HTML page with whitespace collapsed.
///
/// Returns `None` when the result is empty or when fewer than `min_ascii_ratio`
/// of its characters are printable ASCII (binary or mis-decoded content).
pub fn html_to_text(html: &str, min_ascii_ratio: f64) -> Option<String> {
    let document = Html::parse_document(html);
    let mut raw = String::new();
    collect_text(document.root_element(), &mut raw);

    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() || !is_readable(&text, min_ascii_ratio) {
        return None;
    }
    Some(text)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    if SKIPPED.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push(' ');
            out.push_str(text);
        } else if let Some(el) = ElementRef::wrap(child) {
            collect_text(el, out);
        }
    }
}

/// Share of printable ASCII (plus `\n`, `\r`, `\t`) is at least `min_ratio`.
pub fn is_readable(text: &str, min_ratio: f64) -> bool {
    let mut total = 0usize;
    let mut ascii = 0usize;
    for c in text.chars() {
        total += 1;
        if matches!(c, ' '..='~' | '\n' | '\r' | '\t') {
            ascii += 1;
        }
    }
    total == 0 || (ascii as f64 / total as f64) >= min_ratio
}
