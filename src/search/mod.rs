//! Aggregator search: request building and results-table parsing.
//!
//! [`Searcher::search`] issues one GET per query and turns the results table
//! into [`ResultItem`]s using a fixed per-category [`CategoryLayout`]. A query
//! that matches nothing yields an empty [`SearchResultSet`], never an error.

mod error;
mod item;
mod layout;
mod table;

pub use error::{RowParseError, SearchError};
pub use item::{NOT_AVAILABLE, ResultItem, ResultItemBuilder, SearchResultSet, UNKNOWN_EXTENSION};
pub use layout::{CategoryLayout, Column, ColumnMap, FileColumns, MirrorColumns, SearchCategory};
pub use table::strip_identifier_suffix;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument};
use url::Url;

use crate::config::{ConfigError, PipelineConfig};
use crate::context::RequestContext;
use crate::transport::{Transport, TransportRequest};

/// Runs searches against one aggregator.
#[derive(Clone)]
pub struct Searcher {
    transport: Arc<dyn Transport>,
    base_url: Url,
    timeout: Duration,
    max_page_bytes: usize,
}

impl Searcher {
    /// Creates a searcher rooted at `base_url` (paths are joined beneath it).
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: Url,
        timeout: Duration,
        max_page_bytes: usize,
    ) -> Self {
        Self {
            transport,
            base_url,
            timeout,
            max_page_bytes,
        }
    }

    /// Creates a searcher from pipeline settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if the configured base URL is invalid.
    pub fn from_config(
        transport: Arc<dyn Transport>,
        config: &PipelineConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(
            transport,
            config.base()?,
            config.search_timeout,
            config.max_page_bytes,
        ))
    }

    /// Builds the category-specific search URL for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidUrl`] if the category path cannot be
    /// joined onto the base URL.
    pub fn search_url(&self, query: &str, category: SearchCategory) -> Result<Url, SearchError> {
        let layout = category.layout();
        let mut url = self
            .base_url
            .join(layout.path)
            .map_err(|e| SearchError::InvalidUrl {
                base: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair(layout.query_param, query.trim());
            for (key, value) in layout.extra_params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Searches `category` for `query`.
    ///
    /// On success the search page's final URL is recorded in `ctx` so the
    /// following mirror fetch carries it as referer.
    ///
    /// # Errors
    ///
    /// - [`SearchError::EmptyQuery`] for a blank query (no request is sent)
    /// - [`SearchError::Unreachable`] on network failure
    /// - [`SearchError::HttpStatus`] on a non-2xx response
    /// - [`SearchError::NoResultsTable`] when the page has no results table
    ///   and does not report zero hits
    #[instrument(skip(self, ctx), fields(category = ?category))]
    pub async fn search(
        &self,
        query: &str,
        category: SearchCategory,
        ctx: &mut RequestContext,
    ) -> Result<SearchResultSet, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let url = self.search_url(query, category)?;
        debug!(url = %url, "requesting search page");

        let request = TransportRequest::get(url.clone(), self.timeout).with_context(ctx);
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| SearchError::unreachable(url.as_str(), e))?;

        if !response.is_success() {
            return Err(SearchError::http_status(url.as_str(), response.status()));
        }

        let final_url = response.final_url().clone();
        let html = response
            .read_text(self.max_page_bytes)
            .await
            .map_err(|e| SearchError::unreachable(final_url.as_str(), e))?;
        ctx.record_visit(&final_url);

        let items = table::parse_results(&html, &final_url, category.layout())?;
        info!(results = items.len(), "search complete");
        Ok(SearchResultSet::new(query, category, Some(final_url), items))
    }
}

impl std::fmt::Debug for Searcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Searcher")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
