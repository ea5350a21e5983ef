//! Download-link extraction strategies for mirror pages.
//!
//! Each [`LinkPattern`] inspects a parsed page and may return an href. The
//! resolver tries them in [`default_patterns`] order and stops at the first
//! hit. Hrefs are returned raw; the resolver joins them against the page's
//! final URL.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::html::{
    ANCHOR_WITH_HREF, absolutize_href, canonical_host, compile_static_selector, element_text,
};

/// One extraction strategy.
pub trait LinkPattern: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Returns the raw href of the download link, if this pattern matches.
    fn find(&self, page: &Html, page_url: &Url) -> Option<String>;
}

/// The strategies in priority order.
#[must_use]
pub fn default_patterns() -> Vec<Box<dyn LinkPattern>> {
    vec![
        Box::new(HeadingGetLink),
        Box::new(HighlightedCellGetLink),
        Box::new(DownloadPathGetLink),
        Box::new(AlternateHostLink),
    ]
}

const GET_LABEL: &str = "GET";

fn is_get_label(anchor: ElementRef<'_>) -> bool {
    element_text(anchor).eq_ignore_ascii_case(GET_LABEL)
}

fn href(anchor: ElementRef<'_>) -> Option<String> {
    anchor
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
}

static HEADING_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("h2 a[href]"));

/// `<h2><a href="...">GET</a></h2>`, the common mirror skin.
#[derive(Debug, Clone, Copy)]
pub struct HeadingGetLink;

impl LinkPattern for HeadingGetLink {
    fn name(&self) -> &'static str {
        "heading-get"
    }

    fn find(&self, page: &Html, _page_url: &Url) -> Option<String> {
        page.select(&HEADING_ANCHOR)
            .filter(|anchor| is_get_label(*anchor))
            .find_map(href)
    }
}

static COLORED_CELL_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("td[bgcolor] a[href]"));

/// Highlight colour of the download cell on the legacy skin.
const HIGHLIGHT_BGCOLOR: &str = "#a9f5bc";

/// A GET anchor inside the green-highlighted cell of the legacy skin.
#[derive(Debug, Clone, Copy)]
pub struct HighlightedCellGetLink;

impl LinkPattern for HighlightedCellGetLink {
    fn name(&self) -> &'static str {
        "highlighted-cell-get"
    }

    fn find(&self, page: &Html, _page_url: &Url) -> Option<String> {
        page.select(&COLORED_CELL_ANCHOR)
            .filter(|anchor| is_get_label(*anchor) && in_highlighted_cell(*anchor))
            .find_map(href)
    }
}

fn in_highlighted_cell(anchor: ElementRef<'_>) -> bool {
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "td")
        .and_then(|td| td.value().attr("bgcolor"))
        .is_some_and(|color| color.trim().eq_ignore_ascii_case(HIGHLIGHT_BGCOLOR))
}

/// Path fragments of file-serving endpoints.
const DOWNLOAD_PATH_FRAGMENTS: &[&str] = &["get.php", "/main/", "/download/", "ads.php", "/get/"];

/// Any exact "GET" anchor pointing at a download endpoint. Relative and
/// same-host links win over off-site ones.
#[derive(Debug, Clone, Copy)]
pub struct DownloadPathGetLink;

impl LinkPattern for DownloadPathGetLink {
    fn name(&self) -> &'static str {
        "download-path-get"
    }

    fn find(&self, page: &Html, page_url: &Url) -> Option<String> {
        let page_host = page_url.host_str().map(canonical_host);
        let candidates: Vec<String> = page
            .select(&ANCHOR_WITH_HREF)
            .filter(|anchor| element_text(*anchor) == GET_LABEL)
            .filter_map(href)
            .filter(|href| {
                let lowered = href.to_ascii_lowercase();
                DOWNLOAD_PATH_FRAGMENTS
                    .iter()
                    .any(|fragment| lowered.contains(fragment))
            })
            .collect();

        let local = candidates.iter().find(|href| {
            let is_relative = !href.contains("://") && !href.starts_with("//");
            is_relative
                || absolutize_href(href, page_url)
                    .and_then(|url| url.host_str().map(canonical_host))
                    .is_some_and(|host| Some(host) == page_host)
        });
        local.or(candidates.first()).cloned()
    }
}

static EMBEDDED_SOURCE: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("iframe[src], embed[src]"));

/// Hosts that serve files directly.
const ALTERNATE_HOST_FRAGMENTS: &[&str] = &["sci-hub", "booksdl", "library.lol", "ipfs"];

/// Paths that serve files directly.
const ALTERNATE_PATH_FRAGMENTS: &[&str] = &["/scimag/get.php", "/ipfs/"];

/// Last resort: a link or embedded document on a known file host.
#[derive(Debug, Clone, Copy)]
pub struct AlternateHostLink;

impl LinkPattern for AlternateHostLink {
    fn name(&self) -> &'static str {
        "alternate-host"
    }

    fn find(&self, page: &Html, page_url: &Url) -> Option<String> {
        let embedded = page
            .select(&EMBEDDED_SOURCE)
            .filter_map(|el| el.value().attr("src"));
        let anchors = page
            .select(&ANCHOR_WITH_HREF)
            .filter_map(|el| el.value().attr("href"));

        embedded
            .chain(anchors)
            .map(str::trim)
            .find(|raw| {
                absolutize_href(raw, page_url).is_some_and(|url| {
                    url != *page_url && is_alternate_host(&url) && has_file_path(&url)
                })
            })
            .map(str::to_string)
    }
}

fn is_alternate_host(url: &Url) -> bool {
    let host = url.host_str().map(canonical_host).unwrap_or_default();
    let path = url.path().to_ascii_lowercase();
    ALTERNATE_HOST_FRAGMENTS
        .iter()
        .any(|fragment| host.contains(fragment))
        || ALTERNATE_PATH_FRAGMENTS
            .iter()
            .any(|fragment| path.contains(fragment))
}

/// Skips bare host links (site logos, "home").
fn has_file_path(url: &Url) -> bool {
    url.path().trim_matches('/').len() > 1
}
