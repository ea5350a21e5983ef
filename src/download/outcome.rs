//! Download results as data.
//!
//! Every download ends in exactly one [`DownloadOutcome`]: either the file
//! bytes or a classified [`DownloadFailure`]. Failures are never raised as
//! errors so the front end can pick a tailored fallback per [`FailureKind`].

use std::fmt;

use bytes::Bytes;
use serde::Serialize;

/// Why a download did not produce a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FailureKind {
    /// File exceeds the size cap (advertised or while streaming).
    TooLarge,
    /// Server returned an HTML page instead of the file.
    HtmlPoisoned,
    /// Server returned a CAPTCHA challenge.
    CaptchaBlocked,
    /// Server answered with a non-2xx status.
    ServerError {
        /// HTTP status.
        status: u16,
    },
    /// Request or stream timed out.
    Timeout,
    /// Connection or stream failure other than a timeout.
    Network,
    /// No download link could be found.
    NoLinkFound,
    /// Anything unexpected, including a panicked task.
    Other,
}

impl FailureKind {
    /// Short label for logs and summaries.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::TooLarge => "too large",
            Self::HtmlPoisoned => "html instead of file",
            Self::CaptchaBlocked => "captcha",
            Self::ServerError { .. } => "server error",
            Self::Timeout => "timeout",
            Self::Network => "network error",
            Self::NoLinkFound => "no link found",
            Self::Other => "unexpected error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerError { status } => write!(f, "server error (HTTP {status})"),
            other => f.write_str(other.label()),
        }
    }
}

/// A classified download failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadFailure {
    /// Failure class.
    pub kind: FailureKind,
    /// Human-readable detail (original error text where there was one).
    pub detail: String,
    /// URL worth showing the user (final URL for poisoned/CAPTCHA pages).
    pub url: Option<String>,
    /// Bytes received before aborting (streamed `TooLarge`).
    pub bytes_received: Option<u64>,
}

impl DownloadFailure {
    /// Creates a failure with no URL or byte count.
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            url: None,
            bytes_received: None,
        }
    }

    /// Attaches the URL to show the user.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attaches the partial byte count.
    #[must_use]
    pub fn with_bytes_received(mut self, bytes: u64) -> Self {
        self.bytes_received = Some(bytes);
        self
    }
}

impl fmt::Display for DownloadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// Terminal result of one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The whole file, within the cap.
    Success {
        /// File contents.
        bytes: Bytes,
        /// Sanitized filename with extension.
        filename: String,
    },
    /// Classified failure.
    Failure(DownloadFailure),
}

impl DownloadOutcome {
    /// Shorthand for a failure outcome.
    pub fn failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self::Failure(DownloadFailure::new(kind, detail))
    }

    /// True for [`DownloadOutcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The failure kind, if this is a failure.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure(failure) => Some(failure.kind),
        }
    }
}

impl From<DownloadFailure> for DownloadOutcome {
    fn from(failure: DownloadFailure) -> Self {
        Self::Failure(failure)
    }
}
