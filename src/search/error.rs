//! Error types for search operations.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors that abort a whole search.
///
/// A legitimate zero-hit query is *not* an error; it returns an empty
/// [`SearchResultSet`](super::SearchResultSet).
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// The query was blank after trimming.
    #[error("search query is empty")]
    EmptyQuery,

    /// The category has no searchable table (magazines are link-only).
    #[error("category '{category}' is link-only and cannot be searched")]
    LinkOnlyCategory {
        /// Category label.
        category: String,
    },

    /// The search URL could not be built from the configured base URL.
    #[error("invalid search URL built from '{base}': {reason}")]
    InvalidUrl {
        /// Configured base URL.
        base: String,
        /// Why it failed.
        reason: String,
    },

    /// Network failure reaching the aggregator.
    #[error("search unreachable at {url}: {source}")]
    Unreachable {
        /// Search URL.
        url: String,
        /// Transport failure.
        #[source]
        source: TransportError,
    },

    /// Aggregator answered with a non-2xx status.
    #[error("search returned HTTP {status} for {url}")]
    HttpStatus {
        /// Search URL.
        url: String,
        /// HTTP status.
        status: u16,
    },

    /// The page contains no recognisable results table.
    #[error("no results table found at {url}")]
    NoResultsTable {
        /// Final page URL.
        url: String,
    },

    /// Anything else, including a panicked search task.
    #[error("unexpected search failure: {message}")]
    Unexpected {
        /// Description.
        message: String,
    },
}

impl SearchError {
    /// Creates an unreachable error.
    pub fn unreachable(url: impl Into<String>, source: TransportError) -> Self {
        Self::Unreachable {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an unexpected-failure error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }
}

/// Why a single table row was dropped. Never fatal to the search.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RowParseError {
    /// Row has fewer cells than the layout references.
    #[error("row has {found} cells, layout needs {needed}")]
    TooFewCells {
        /// Cells present.
        found: usize,
        /// Cells required.
        needed: usize,
    },

    /// Title cell empty after trimming.
    #[error("row has no title")]
    MissingTitle,

    /// Neither a mirror link nor a details link was found.
    #[error("row '{title}' has no mirror or details link")]
    NoMirror {
        /// Parsed title.
        title: String,
    },
}
