//! Error types for the transport layer.

use thiserror::Error;

/// Errors raised while talking to a remote host.
///
/// Messages are captured as strings so stub transports in tests can build
/// every variant without a live `reqwest::Error`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request or body read exceeded its timeout.
    #[error("timeout requesting {url}: {message}")]
    Timeout {
        /// The URL being requested.
        url: String,
        /// Underlying error text.
        message: String,
    },

    /// DNS, TCP or TLS connection setup failed.
    #[error("connection error requesting {url}: {message}")]
    Connect {
        /// The URL being requested.
        url: String,
        /// Underlying error text.
        message: String,
    },

    /// Any other failure while sending or streaming.
    #[error("network error requesting {url}: {message}")]
    Network {
        /// The URL being requested.
        url: String,
        /// Underlying error text.
        message: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {message}")]
    ClientBuild {
        /// Underlying error text.
        message: String,
    },
}

impl TransportError {
    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Timeout {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a connection error.
    pub fn connect(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a generic network error.
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Classifies a `reqwest` error for `url`.
    pub fn from_reqwest(url: impl Into<String>, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(url, error.to_string())
        } else if error.is_connect() {
            Self::connect(url, error.to_string())
        } else {
            Self::network(url, error.to_string())
        }
    }

    /// Returns true for timeouts.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// The underlying error text without the URL prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Timeout { message, .. }
            | Self::Connect { message, .. }
            | Self::Network { message, .. }
            | Self::ClientBuild { message } => message,
        }
    }
}
