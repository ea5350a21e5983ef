//! Pipeline tunables.

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default aggregator base URL.
pub const DEFAULT_BASE_URL: &str = "https://libgen.is/";

/// Default article-mirror base URL (used for DOI links).
pub const DEFAULT_ARTICLE_MIRROR_URL: &str = "https://sci-hub.se/";

/// Default attachment size cap: 25 MiB.
pub const DEFAULT_SIZE_CAP_BYTES: u64 = 25 * 1024 * 1024;

/// Default number of result sets kept in the cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Default results shown per page.
pub const DEFAULT_RESULTS_PER_PAGE: usize = 5;

/// Default maximum mirror/search page size read into memory: 2 MiB.
pub const DEFAULT_MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

/// Errors from [`PipelineConfig::validate`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric setting must be positive.
    #[error("{field} must be greater than zero")]
    Zero {
        /// Setting name.
        field: &'static str,
    },

    /// A URL setting could not be parsed or is not http(s).
    #[error("{field} is not a valid http(s) URL: {value}")]
    InvalidUrl {
        /// Setting name.
        field: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Every knob the search → resolve → download pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Aggregator base URL; category paths are joined onto it.
    pub base_url: String,
    /// Article mirror base URL.
    pub article_mirror_url: String,
    /// Largest file relayed to the user.
    pub size_cap_bytes: u64,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Search page timeout.
    pub search_timeout: Duration,
    /// Mirror page timeout (mirror pages are slower than search).
    pub mirror_timeout: Duration,
    /// Whole-download timeout.
    pub download_timeout: Duration,
    /// Send a HEAD size probe before the GET.
    pub head_probe: bool,
    /// Result sets kept in the cache.
    pub cache_capacity: usize,
    /// Results per display page.
    pub results_per_page: usize,
    /// How long a result view accepts selections.
    pub selection_window: Duration,
    /// Largest HTML page read into memory.
    pub max_page_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            article_mirror_url: DEFAULT_ARTICLE_MIRROR_URL.to_string(),
            size_cap_bytes: DEFAULT_SIZE_CAP_BYTES,
            connect_timeout: Duration::from_secs(10),
            search_timeout: Duration::from_secs(20),
            mirror_timeout: Duration::from_secs(45),
            download_timeout: Duration::from_secs(300),
            head_probe: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            results_per_page: DEFAULT_RESULTS_PER_PAGE,
            selection_window: Duration::from_secs(600),
            max_page_bytes: DEFAULT_MAX_PAGE_BYTES,
        }
    }
}

impl PipelineConfig {
    /// Checks every field.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_http_url("base_url", &self.base_url)?;
        parse_http_url("article_mirror_url", &self.article_mirror_url)?;

        let positives: [(&'static str, bool); 9] = [
            ("size_cap_bytes", self.size_cap_bytes > 0),
            ("connect_timeout", !self.connect_timeout.is_zero()),
            ("search_timeout", !self.search_timeout.is_zero()),
            ("mirror_timeout", !self.mirror_timeout.is_zero()),
            ("download_timeout", !self.download_timeout.is_zero()),
            ("cache_capacity", self.cache_capacity > 0),
            ("results_per_page", self.results_per_page > 0),
            ("selection_window", !self.selection_window.is_zero()),
            ("max_page_bytes", self.max_page_bytes > 0),
        ];
        match positives.into_iter().find(|(_, ok)| !ok) {
            Some((field, _)) => Err(ConfigError::Zero { field }),
            None => Ok(()),
        }
    }

    /// The aggregator base URL, with a trailing slash so paths join beneath it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if `base_url` does not parse.
    pub fn base(&self) -> Result<Url, ConfigError> {
        parse_http_url("base_url", &self.base_url)
    }

    /// The article mirror base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if `article_mirror_url` does not parse.
    pub fn article_mirror(&self) -> Result<Url, ConfigError> {
        parse_http_url("article_mirror_url", &self.article_mirror_url)
    }
}

fn parse_http_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
    };
    let trimmed = value.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|_| invalid())?;
    if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() {
        Ok(url)
    } else {
        Err(invalid())
    }
}
