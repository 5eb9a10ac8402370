//! Small helpers over `scraper` shared by the site extractors.

use listing_sync::{ParseError, ParseResult};
use scraper::{ElementRef, Html, Selector};
use url::Url;

pub fn selector(css: &str) -> ParseResult<Selector> {
    Selector::parse(css).map_err(|e| ParseError::Selector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Element text with surrounding whitespace removed.
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed text of the first match, `None` when nothing matches.
pub fn first_text(document: &Html, css: &str) -> ParseResult<Option<String>> {
    let selector = selector(css)?;
    Ok(document.select(&selector).next().map(text_of))
}

/// Trimmed text of every match, in document order.
pub fn all_text(document: &Html, css: &str) -> ParseResult<Vec<String>> {
    let selector = selector(css)?;
    Ok(document.select(&selector).map(text_of).collect())
}

/// Resolve `href` against the page it was found on.
pub fn resolve(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match Url::parse(href) {
        Ok(url) => Some(url.into()),
        Err(_) => Url::parse(base).ok()?.join(href).ok().map(Into::into),
    }
}

/// Empty strings count as missing.
pub fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.is_empty())
}
