//! HTML to plain text extraction

use scraper::{ElementRef, Html};

/// Tags whose entire subtree carries no visible text.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "head", "template"];

/// Extract the document's visible text, discarding tags, scripts, and
/// styles, with runs of whitespace collapsed to single spaces.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    collect_text(document.root_element(), &mut out);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef, out: &mut String) {
    if SKIPPED_TAGS.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, out);
        }
    }
}
