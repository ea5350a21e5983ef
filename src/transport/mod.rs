//! Transport seam between the pipeline and the network.
//!
//! The pipeline never touches `reqwest` directly. It sends a
//! [`TransportRequest`] through a [`Transport`] and receives a
//! [`TransportResponse`] whose body is pulled chunk by chunk. This keeps the
//! streaming size cap and connection release testable with stub transports.
//!
//! # Connection release
//!
//! Every body is wrapped so that [`ResponseBody::close`] runs exactly once:
//! either explicitly via [`TransportResponse::close`] or implicitly when the
//! response is dropped. No exit path can leave a connection half-read.

mod error;
mod http;

pub use error::TransportError;
pub use http::HttpTransport;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use tracing::debug;
use url::Url;

use crate::context::RequestContext;

/// HTTP method used by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Size probe without a body.
    Head,
    /// Page or file fetch.
    Get,
}

/// A single outbound request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Target URL.
    pub url: Url,
    /// Whole-request timeout (headers and body).
    pub timeout: Duration,
    /// Per-flow referer, if the flow has visited a page already.
    pub referer: Option<Url>,
}

impl TransportRequest {
    /// Creates a GET request.
    #[must_use]
    pub fn get(url: Url, timeout: Duration) -> Self {
        Self {
            method: Method::Get,
            url,
            timeout,
            referer: None,
        }
    }

    /// Creates a HEAD request.
    #[must_use]
    pub fn head(url: Url, timeout: Duration) -> Self {
        Self {
            method: Method::Head,
            url,
            timeout,
            referer: None,
        }
    }

    /// Attaches the flow's current referer.
    #[must_use]
    pub fn with_context(mut self, ctx: &RequestContext) -> Self {
        self.referer = ctx.referer().cloned();
        self
    }
}

/// A streamed response body.
#[async_trait]
pub trait ResponseBody: Send {
    /// Returns the next chunk, or `None` at end of body.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError>;

    /// Releases the underlying connection. Further reads return `None`.
    fn close(&mut self);
}

/// Sends requests on behalf of the pipeline.
///
/// Uses `async_trait` so the pipeline can hold an `Arc<dyn Transport>`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request`, following redirects, and returns once headers arrive.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

struct GuardedBody {
    inner: Box<dyn ResponseBody>,
    closed: bool,
}

impl GuardedBody {
    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.inner.close();
        }
    }
}

impl Drop for GuardedBody {
    fn drop(&mut self) {
        self.close();
    }
}

/// Response headers plus a guarded streaming body.
pub struct TransportResponse {
    status: u16,
    final_url: Url,
    headers: HeaderMap,
    body: GuardedBody,
}

impl TransportResponse {
    /// Builds a response around a body.
    #[must_use]
    pub fn new(
        status: u16,
        final_url: Url,
        headers: HeaderMap,
        body: Box<dyn ResponseBody>,
    ) -> Self {
        Self {
            status,
            final_url,
            headers,
            body: GuardedBody {
                inner: body,
                closed: false,
            },
        }
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// True for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// URL after redirects.
    #[must_use]
    pub fn final_url(&self) -> &Url {
        &self.final_url
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header as a string, if present and valid ASCII.
    #[must_use]
    pub fn header_str(&self, name: impl reqwest::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Parsed `Content-Length`.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.header_str(CONTENT_LENGTH)
            .and_then(|v| v.trim().parse::<u64>().ok())
    }

    /// Raw `Content-Type`.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(CONTENT_TYPE)
    }

    /// True when `Content-Type` names an HTML document.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.content_type().is_some_and(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("text/html") || ct.contains("application/xhtml")
        })
    }

    /// Pulls the next body chunk.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the stream fails or times out.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        if self.body.closed {
            return Ok(None);
        }
        self.body.inner.next_chunk().await
    }

    /// Releases the connection now instead of at drop.
    pub fn close(&mut self) {
        self.body.close();
    }

    /// True once the body has been released.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.body.closed
    }

    /// Reads at most `limit` bytes of body as lossy UTF-8, then closes.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the stream fails before `limit` is reached.
    pub async fn read_text(mut self, limit: usize) -> Result<String, TransportError> {
        let mut buffer: Vec<u8> = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            let room = limit.saturating_sub(buffer.len());
            if chunk.len() > room {
                buffer.extend_from_slice(&chunk[..room]);
                debug!(url = %self.final_url, limit, "page body truncated at read limit");
                break;
            }
            buffer.extend_from_slice(&chunk);
            if buffer.len() >= limit {
                break;
            }
        }
        self.close();
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("final_url", &self.final_url.as_str())
            .field("closed", &self.body.closed)
            .finish_non_exhaustive()
    }
}
