//! Search → resolve → download orchestration.
//!
//! Each call runs on its own spawned task so the caller's event loop stays
//! free while a download streams. A task that panics still produces a
//! terminal answer: [`SearchError::Unexpected`] for searches,
//! [`FailureKind::Other`] for fetches.

use std::sync::Arc;

use tokio::task::JoinError;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::cache::{PendingResults, ResultCache};
use crate::config::{ConfigError, PipelineConfig};
use crate::context::RequestContext;
use crate::download::{DownloadFailure, DownloadOutcome, Downloader, FailureKind};
use crate::mirror::{MirrorResolver, ResolveError};
use crate::search::{ResultItem, SearchCategory, SearchError, Searcher};
use crate::transport::Transport;

/// Outcome of fetching one selected item, with the links a reply may offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// Download result.
    pub outcome: DownloadOutcome,
    /// Mirror page that was resolved.
    pub mirror_url: Option<Url>,
    /// Direct file URL, when resolution succeeded.
    pub download_url: Option<Url>,
}

impl FetchResult {
    fn failed(failure: DownloadFailure, mirror_url: Option<Url>) -> Self {
        Self {
            outcome: failure.into(),
            mirror_url,
            download_url: None,
        }
    }
}

struct Inner {
    config: PipelineConfig,
    article_mirror: Url,
    searcher: Searcher,
    resolver: MirrorResolver,
    downloader: Downloader,
    cache: ResultCache,
}

/// Shared pipeline handle. Cheap to clone.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<Inner>,
}

impl Pipeline {
    /// Builds a pipeline over `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails validation.
    pub fn new(config: PipelineConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        config.validate()?;
        let searcher = Searcher::from_config(Arc::clone(&transport), &config)?;
        let resolver = MirrorResolver::from_config(Arc::clone(&transport), &config);
        let downloader = Downloader::from_config(transport, &config);
        let inner = Inner {
            article_mirror: config.article_mirror()?,
            cache: ResultCache::new(config.cache_capacity),
            searcher,
            resolver,
            downloader,
            config,
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Pipeline settings.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// The shared result cache.
    #[must_use]
    pub fn cache(&self) -> &ResultCache {
        &self.inner.cache
    }

    /// Runs a search on a worker task.
    ///
    /// The results are returned pending; promote them once the reply id is
    /// known.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on search failure, or
    /// [`SearchError::Unexpected`] if the task panicked.
    pub async fn search(
        &self,
        query: &str,
        category: SearchCategory,
    ) -> Result<PendingResults, SearchError> {
        let inner = Arc::clone(&self.inner);
        let query = query.to_string();
        let task = tokio::spawn(async move {
            let mut ctx = RequestContext::new();
            inner.searcher.search(&query, category, &mut ctx).await
        });
        match task.await {
            Ok(result) => result.map(PendingResults::new),
            Err(join_error) => {
                let message = describe_join_error(&join_error);
                error!(%message, "search task failed");
                Err(SearchError::unexpected(message))
            }
        }
    }

    /// Resolves and downloads `item` on a worker task.
    ///
    /// `source_url` is the search page the item came from; it seeds the
    /// flow's referer.
    pub async fn fetch(&self, item: &ResultItem, source_url: Option<&Url>) -> FetchResult {
        let inner = Arc::clone(&self.inner);
        let item = item.clone();
        let referer = source_url.cloned();
        let task = tokio::spawn(async move { inner.fetch(&item, referer).await });
        match task.await {
            Ok(result) => result,
            Err(join_error) => {
                let message = describe_join_error(&join_error);
                error!(%message, "fetch task failed");
                FetchResult::failed(DownloadFailure::new(FailureKind::Other, message), None)
            }
        }
    }

    /// The article mirror's page for `item`'s DOI, offered as a manual
    /// fallback link for articles.
    #[must_use]
    pub fn article_link(&self, item: &ResultItem) -> Option<Url> {
        item.doi()
            .and_then(|doi| self.inner.article_mirror.join(doi).ok())
    }
}

impl Inner {
    #[instrument(skip(self, item, referer), fields(title = %item.title()))]
    async fn fetch(&self, item: &ResultItem, referer: Option<Url>) -> FetchResult {
        let mut ctx = referer.map_or_else(RequestContext::new, RequestContext::with_referer);

        let Some(target) = item.target_url().cloned() else {
            warn!("item has no mirror link");
            return FetchResult::failed(
                DownloadFailure::new(FailureKind::NoLinkFound, "no mirror link for this item"),
                None,
            );
        };

        let download_url = match self.resolver.resolve(&target, &mut ctx).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                return FetchResult::failed(
                    DownloadFailure::new(
                        FailureKind::NoLinkFound,
                        "could not find a download link on the mirror page",
                    )
                    .with_url(target.as_str()),
                    Some(target),
                );
            }
            Err(error) => {
                warn!(%error, "mirror resolution failed");
                return FetchResult::failed(
                    resolve_failure(&error).with_url(target.as_str()),
                    Some(target),
                );
            }
        };

        let outcome = self
            .downloader
            .download(&download_url, item.title(), item.extension(), &ctx)
            .await;
        info!(
            success = outcome.is_success(),
            kind = ?outcome.failure_kind(),
            "fetch finished"
        );
        FetchResult {
            outcome,
            mirror_url: Some(target),
            download_url: Some(download_url),
        }
    }
}

fn resolve_failure(error: &ResolveError) -> DownloadFailure {
    let kind = match error {
        ResolveError::Timeout { .. } => FailureKind::Timeout,
        ResolveError::Unreachable { .. } => FailureKind::Network,
        ResolveError::HttpStatus { status, .. } => FailureKind::ServerError { status: *status },
    };
    DownloadFailure::new(kind, error.to_string())
}

fn describe_join_error(error: &JoinError) -> String {
    if error.is_panic() {
        "worker task panicked".to_string()
    } else {
        "worker task was cancelled".to_string()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.inner.config)
            .field("cache", &self.inner.cache)
            .finish_non_exhaustive()
    }
}
