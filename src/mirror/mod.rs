//! Mirror page resolution.
//!
//! A search hit points at a mirror (or details) page, not at the file. The
//! [`MirrorResolver`] fetches that page and runs an ordered list of
//! [`LinkPattern`]s over it; the first match, joined against the page's final
//! URL, is the download URL.

mod error;
mod patterns;

pub use error::ResolveError;
pub use patterns::{
    AlternateHostLink, DownloadPathGetLink, HeadingGetLink, HighlightedCellGetLink, LinkPattern,
    default_patterns,
};

use std::sync::Arc;
use std::time::Duration;

use scraper::Html;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::PipelineConfig;
use crate::context::RequestContext;
use crate::html::absolutize_href;
use crate::transport::{Transport, TransportRequest};

/// Extensions that mark a URL as already pointing at a document.
pub const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "epub", "djvu", "mobi", "azw3", "fb2", "chm", "rtf", "doc", "docx", "txt", "zip",
    "rar", "7z", "cbz", "cbr",
];

/// Resolves mirror pages to download URLs.
pub struct MirrorResolver {
    transport: Arc<dyn Transport>,
    patterns: Vec<Box<dyn LinkPattern>>,
    timeout: Duration,
    max_page_bytes: usize,
}

impl MirrorResolver {
    /// Creates a resolver with the default pattern order.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration, max_page_bytes: usize) -> Self {
        Self::with_patterns(transport, default_patterns(), timeout, max_page_bytes)
    }

    /// Creates a resolver with a custom pattern list.
    #[must_use]
    pub fn with_patterns(
        transport: Arc<dyn Transport>,
        patterns: Vec<Box<dyn LinkPattern>>,
        timeout: Duration,
        max_page_bytes: usize,
    ) -> Self {
        Self {
            transport,
            patterns,
            timeout,
            max_page_bytes,
        }
    }

    /// Creates a resolver from pipeline settings.
    #[must_use]
    pub fn from_config(transport: Arc<dyn Transport>, config: &PipelineConfig) -> Self {
        Self::new(transport, config.mirror_timeout, config.max_page_bytes)
    }

    /// Fetches `mirror_url` and extracts the download URL.
    ///
    /// Returns `Ok(None)` when the page loads but no pattern matches and the
    /// URL itself does not look like a document. A mirror that serves a
    /// non-HTML body directly resolves to its own final URL. On success the
    /// page's final URL is recorded in `ctx` as the next referer.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the page cannot be fetched.
    #[instrument(skip(self, ctx), fields(url = %mirror_url))]
    pub async fn resolve(
        &self,
        mirror_url: &Url,
        ctx: &mut RequestContext,
    ) -> Result<Option<Url>, ResolveError> {
        let request = TransportRequest::get(mirror_url.clone(), self.timeout).with_context(ctx);
        let mut response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ResolveError::from_transport(mirror_url.as_str(), e))?;

        if !response.is_success() {
            return Err(ResolveError::http_status(
                mirror_url.as_str(),
                response.status(),
            ));
        }

        let final_url = response.final_url().clone();
        ctx.record_visit(&final_url);

        if !response.is_html() && response.content_type().is_some() {
            response.close();
            info!(final_url = %final_url, "mirror serves the file directly");
            return Ok(Some(final_url));
        }

        let html = response
            .read_text(self.max_page_bytes)
            .await
            .map_err(|e| ResolveError::from_transport(final_url.as_str(), e))?;

        let resolved = self.extract(&html, &final_url).or_else(|| {
            has_document_extension(mirror_url).then(|| {
                debug!("no pattern matched, using document-like mirror URL");
                mirror_url.clone()
            })
        });
        match &resolved {
            Some(url) => info!(download_url = %url, "mirror resolved"),
            None => info!("no download link found on mirror page"),
        }
        Ok(resolved)
    }

    /// Runs the patterns over `html` without any I/O.
    #[must_use]
    pub fn extract(&self, html: &str, page_url: &Url) -> Option<Url> {
        let page = Html::parse_document(html);
        for pattern in &self.patterns {
            let Some(raw) = pattern.find(&page, page_url) else {
                debug!(pattern = pattern.name(), "pattern did not match");
                continue;
            };
            match absolutize_href(&raw, page_url) {
                Some(url) => {
                    debug!(pattern = pattern.name(), url = %url, "pattern matched");
                    return Some(url);
                }
                None => debug!(pattern = pattern.name(), href = %raw, "matched href is not a usable URL"),
            }
        }
        None
    }
}

impl std::fmt::Debug for MirrorResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.patterns.iter().map(|p| p.name()).collect();
        f.debug_struct("MirrorResolver")
            .field("patterns", &names)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// True when the URL path ends in a known document extension.
#[must_use]
pub fn has_document_extension(url: &Url) -> bool {
    url.path()
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext.as_str()))
}
