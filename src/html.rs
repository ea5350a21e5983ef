//! Shared helpers for HTML scraping: static patterns, text extraction, and
//! href resolution.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Compiles a CSS selector at static init; panics on invalid selector.
pub(crate) fn compile_static_selector(selector: &str) -> Selector {
    Selector::parse(selector)
        .unwrap_or_else(|e| panic!("invalid static selector '{selector}': {e:?}"))
}

/// `a[href]` anywhere below an element.
pub(crate) static ANCHOR_WITH_HREF: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("a[href]"));

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"\s+"));

/// Collapses runs of whitespace into single spaces and trims.
#[must_use]
pub(crate) fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_RE.replace_all(value.trim(), " ").into_owned()
}

/// All descendant text of `element`, whitespace collapsed.
#[must_use]
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Resolves `href` against `base`.
///
/// Protocol-relative `//host/...` links take the base's scheme. Returns `None`
/// for empty, fragment-only and `javascript:` hrefs.
#[must_use]
pub(crate) fn absolutize_href(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    if href.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }
    let joined = base.join(href).ok()?;
    matches!(joined.scheme(), "http" | "https").then_some(joined)
}

/// Normalizes a host for comparison: lowercase, no leading `www.`.
#[must_use]
pub(crate) fn canonical_host(host: &str) -> String {
    host.trim()
        .trim_end_matches('.')
        .to_ascii_lowercase()
        .trim_start_matches("www.")
        .to_string()
}
