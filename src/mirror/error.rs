//! Error types for mirror resolution.
//!
//! Not finding a link is `Ok(None)`, not an error. These variants cover the
//! cases where the mirror page itself could not be read.

use thiserror::Error;

use crate::transport::TransportError;

/// Failure fetching a mirror page.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// Network failure (connect, reset, DNS).
    #[error("mirror page unreachable at {url}: {source}")]
    Unreachable {
        /// Mirror page URL.
        url: String,
        /// Transport failure.
        #[source]
        source: TransportError,
    },

    /// Mirror page did not answer in time.
    #[error("mirror page timed out at {url}: {}", .source.message())]
    Timeout {
        /// Mirror page URL.
        url: String,
        /// Transport failure.
        #[source]
        source: TransportError,
    },

    /// Mirror page answered with a non-2xx status.
    #[error("mirror page returned HTTP {status} for {url}")]
    HttpStatus {
        /// Mirror page URL.
        url: String,
        /// HTTP status.
        status: u16,
    },
}

impl ResolveError {
    /// Classifies a transport failure for `url`.
    pub fn from_transport(url: impl Into<String>, source: TransportError) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url, source }
        } else {
            Self::Unreachable { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }
}
