use scraper::{ElementRef, Selector};

use crate::ScrapeError;

/// All text below `node`, trimmed.
pub fn extract_text(node: ElementRef) -> String {
    node.text().collect::<String>().trim().to_string()
}

/// The first whitespace-separated token, dropping unit suffixes such as
/// `"4,95 pts"`.
pub fn first_token(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

pub fn parse_selector(source_name: &str, css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css)
        .map_err(|e| ScrapeError::structure(source_name, format!("invalid selector {css:?}: {e:?}")))
}

/// Nearest enclosing element with the given tag name.
pub fn nearest_ancestor<'a>(node: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    node.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == tag)
}
