use scraper::{ElementRef, Selector};

use crate::error::CrawlError;

/// Visible text of a node, whitespace-trimmed.
pub fn extract_text(node: ElementRef) -> String {
    node.text().collect::<String>().trim().to_string()
}

pub fn parse_selector(selector: &str) -> Result<Selector, CrawlError> {
    Selector::parse(selector).map_err(|e| CrawlError::InvalidSelector(format!("{selector}: {e:?}")))
}

/// Replaces every non-alphanumeric character so a title can be a file stem.
pub fn sanitize_file_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "untitled".to_string()
    } else {
        stem
    }
}
