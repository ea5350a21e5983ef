//! `reqwest`-backed [`Transport`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::header::REFERER;
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder};
use tracing::{debug, instrument};

use super::{Method, ResponseBody, Transport, TransportError, TransportRequest, TransportResponse};
use crate::user_agent::{BROWSER_USER_AGENT, browser_headers};

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// Shared HTTP client for search pages, mirror pages and file downloads.
///
/// Holds no per-flow state: the referer travels on each
/// [`TransportRequest`]. Cheap to clone (connection pool is shared).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with the browser header set and `connect_timeout`.
    ///
    /// Proxies from `HTTPS_PROXY`, `HTTP_PROXY` and `ALL_PROXY` are honoured
    /// by the underlying client.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] if the TLS backend cannot be
    /// initialised.
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = base_client_builder(connect_timeout)
            .build()
            .map_err(|e| TransportError::ClientBuild {
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Wraps an existing client (used by tests that need custom policies).
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn base_client_builder(connect_timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(connect_timeout)
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(browser_headers())
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(level = "debug", skip(self, request), fields(method = ?request.method, url = %request.url))]
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let TransportRequest {
            method,
            url,
            timeout,
            referer,
        } = request;

        let mut builder = match method {
            Method::Head => self.client.head(url.clone()),
            Method::Get => self.client.get(url.clone()),
        }
        .timeout(timeout);
        if let Some(referer) = referer {
            builder = builder.header(REFERER, referer.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url.as_str(), &e))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        debug!(status, final_url = %final_url, "response headers received");

        let body = ReqwestBody {
            url: final_url.to_string(),
            stream: Some(response.bytes_stream().boxed()),
        };
        Ok(TransportResponse::new(
            status,
            final_url,
            headers,
            Box::new(body),
        ))
    }
}

/// Streaming body over a live `reqwest` response.
///
/// Dropping the stream drops the response, which aborts the connection
/// instead of returning it to the pool half-read.
struct ReqwestBody {
    url: String,
    stream: Option<BoxStream<'static, reqwest::Result<Bytes>>>,
}

#[async_trait]
impl ResponseBody for ReqwestBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        match stream.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => {
                self.stream = None;
                Err(TransportError::from_reqwest(self.url.as_str(), &e))
            }
            None => {
                self.stream = None;
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!(url = %self.url, "response body released");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use url::Url;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_attaches_referer_from_context() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("referer", "https://libgen.example/search.php?req=x"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let ctx = RequestContext::with_referer(
            Url::parse("https://libgen.example/search.php?req=x").unwrap(),
        );
        let url = Url::parse(&format!("{}/page", mock_server.uri())).unwrap();
        let response = transport
            .send(TransportRequest::get(url, Duration::from_secs(5)).with_context(&ctx))
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.read_text(1024).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_send_sends_browser_user_agent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/file.pdf"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let url = Url::parse(&format!("{}/file.pdf", mock_server.uri())).unwrap();
        let response = transport
            .send(TransportRequest::head(url, Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(response.is_success());

        // The UA contains a comma, which the header() matcher would split on.
        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let user_agent = requests[0]
            .headers
            .get("user-agent")
            .and_then(|h| h.to_str().ok());
        assert_eq!(user_agent, Some(BROWSER_USER_AGENT));
    }

    #[tokio::test]
    async fn test_send_reports_final_url_after_redirect() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/new", mock_server.uri()).as_str()),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let url = Url::parse(&format!("{}/old", mock_server.uri())).unwrap();
        let response = transport
            .send(TransportRequest::get(url, Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(response.final_url().path(), "/new");
    }

    #[tokio::test]
    async fn test_send_connection_refused_is_transport_error() {
        let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
        let url = Url::parse("http://127.0.0.1:9/unreachable").unwrap();
        let result = transport
            .send(TransportRequest::get(url, Duration::from_secs(2)))
            .await;
        assert!(result.is_err(), "expected failure, got {result:?}");
    }
}
