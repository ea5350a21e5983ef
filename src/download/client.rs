//! Size-capped streaming downloader.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::CONTENT_DISPOSITION;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::constants::HTML_SNIFF_BYTES;
use super::filename::{FilenameHints, resolve_filename};
use super::inspect::{has_captcha_marker, is_captcha_prone};
use super::outcome::{DownloadFailure, DownloadOutcome, FailureKind};
use crate::config::PipelineConfig;
use crate::context::RequestContext;
use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};

/// Streams files into memory under a hard size cap.
///
/// Never returns an error: every path ends in a [`DownloadOutcome`], and the
/// response body is closed on every path (explicitly on aborts, by the
/// response guard otherwise).
pub struct Downloader {
    transport: Arc<dyn Transport>,
    size_cap: u64,
    timeout: Duration,
    head_probe: bool,
}

impl Downloader {
    /// Creates a downloader.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        size_cap: u64,
        timeout: Duration,
        head_probe: bool,
    ) -> Self {
        Self {
            transport,
            size_cap,
            timeout,
            head_probe,
        }
    }

    /// Creates a downloader from pipeline settings.
    #[must_use]
    pub fn from_config(transport: Arc<dyn Transport>, config: &PipelineConfig) -> Self {
        Self::new(
            transport,
            config.size_cap_bytes,
            config.download_timeout,
            config.head_probe,
        )
    }

    /// The configured size cap in bytes.
    #[must_use]
    pub fn size_cap(&self) -> u64 {
        self.size_cap
    }

    /// Downloads `file_url`, sending the flow's referer from `ctx`.
    ///
    /// `title_hint` becomes the sanitized base name; `extension_hint` is the
    /// search row's extension (`"n/a"` when unknown).
    #[instrument(skip(self, title_hint, ctx), fields(url = %file_url))]
    pub async fn download(
        &self,
        file_url: &Url,
        title_hint: &str,
        extension_hint: &str,
        ctx: &RequestContext,
    ) -> DownloadOutcome {
        if self.head_probe
            && let Some(failure) = self.probe_size(file_url, ctx).await
        {
            return failure.into();
        }

        let request = TransportRequest::get(file_url.clone(), self.timeout).with_context(ctx);
        let mut response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(error) => return transport_failure(&error).into(),
        };
        let final_url = response.final_url().clone();

        if !response.is_success() {
            let status = response.status();
            response.close();
            warn!(status, final_url = %final_url, "download rejected by server");
            return server_error(status, &final_url).into();
        }

        if response.is_html() {
            return classify_html(response, file_url).await.into();
        }

        if let Some(length) = response.content_length()
            && length > self.size_cap
        {
            response.close();
            warn!(length, cap = self.size_cap, "advertised size exceeds cap");
            return too_large(length, self.size_cap, &final_url).into();
        }

        let filename = resolve_filename(&FilenameHints {
            content_disposition: response.header_str(CONTENT_DISPOSITION),
            content_type: response.content_type(),
            final_url: &final_url,
            title_hint,
            extension_hint,
        });

        match self.stream_body(&mut response).await {
            Ok(bytes) if bytes.is_empty() => {
                DownloadOutcome::failure(FailureKind::Other, "server sent an empty file")
            }
            Ok(bytes) => {
                info!(bytes = bytes.len(), filename = %filename, "download complete");
                DownloadOutcome::Success { bytes, filename }
            }
            Err(failure) => failure.into(),
        }
    }

    /// HEAD size check. `Some` only when the advertised size exceeds the cap;
    /// every probe failure falls through to the GET.
    async fn probe_size(&self, file_url: &Url, ctx: &RequestContext) -> Option<DownloadFailure> {
        let request = TransportRequest::head(file_url.clone(), self.timeout).with_context(ctx);
        let mut response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(error) => {
                debug!(error = %error, "HEAD probe failed, continuing with GET");
                return None;
            }
        };
        response.close();

        if !response.is_success() {
            debug!(status = response.status(), "HEAD probe not successful, continuing with GET");
            return None;
        }
        let length = response.content_length()?;
        (length > self.size_cap).then(|| {
            warn!(length, cap = self.size_cap, "HEAD probe: file exceeds cap");
            too_large(length, self.size_cap, response.final_url())
        })
    }

    /// Reads the body until EOF, aborting as soon as the running count
    /// passes the cap.
    async fn stream_body(
        &self,
        response: &mut TransportResponse,
    ) -> Result<Bytes, DownloadFailure> {
        let capacity = response
            .content_length()
            .unwrap_or(0)
            .min(self.size_cap);
        let mut buffer: Vec<u8> = Vec::with_capacity(usize::try_from(capacity).unwrap_or(0));
        let mut received: u64 = 0;

        loop {
            match response.next_chunk().await {
                Ok(Some(chunk)) => {
                    received += chunk.len() as u64;
                    if received > self.size_cap {
                        response.close();
                        warn!(
                            received,
                            cap = self.size_cap,
                            "size cap exceeded mid-stream, connection closed"
                        );
                        return Err(DownloadFailure::new(
                            FailureKind::TooLarge,
                            format!(
                                "file exceeds the {} limit (stopped after {})",
                                format_bytes(self.size_cap),
                                format_bytes(received)
                            ),
                        )
                        .with_url(response.final_url().as_str())
                        .with_bytes_received(received));
                    }
                    buffer.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(error) => {
                    response.close();
                    return Err(transport_failure(&error).with_bytes_received(received));
                }
            }
        }
        response.close();
        Ok(Bytes::from(buffer))
    }
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("size_cap", &self.size_cap)
            .field("timeout", &self.timeout)
            .field("head_probe", &self.head_probe)
            .finish_non_exhaustive()
    }
}

/// HTML where a file was expected: read a short prefix, close, classify.
async fn classify_html(response: TransportResponse, requested: &Url) -> DownloadFailure {
    let final_url = response.final_url().clone();
    let captcha_prone = is_captcha_prone(&final_url) || is_captcha_prone(requested);
    let prefix = match response.read_text(HTML_SNIFF_BYTES).await {
        Ok(prefix) => prefix,
        Err(error) => {
            debug!(%error, final_url = %final_url, "could not read HTML prefix");
            String::new()
        }
    };

    if captcha_prone && has_captcha_marker(&prefix) {
        warn!(final_url = %final_url, "CAPTCHA page returned instead of file");
        return DownloadFailure::new(
            FailureKind::CaptchaBlocked,
            "the mirror asked for a CAPTCHA",
        )
        .with_url(final_url.as_str());
    }
    warn!(final_url = %final_url, "HTML page returned instead of file");
    DownloadFailure::new(
        FailureKind::HtmlPoisoned,
        "the mirror returned a web page instead of the file",
    )
    .with_url(final_url.as_str())
}

fn transport_failure(error: &TransportError) -> DownloadFailure {
    let kind = match error {
        TransportError::Timeout { .. } => FailureKind::Timeout,
        TransportError::Connect { .. } | TransportError::Network { .. } => FailureKind::Network,
        TransportError::ClientBuild { .. } => FailureKind::Other,
    };
    warn!(%error, "download transport failure");
    DownloadFailure::new(kind, error.message())
}

fn server_error(status: u16, final_url: &Url) -> DownloadFailure {
    let detail = match status {
        404 => "the file was not found on the mirror".to_string(),
        403 => "the mirror refused access to the file".to_string(),
        502..=504 => "the mirror is temporarily unavailable".to_string(),
        other => format!("the mirror answered with HTTP {other}"),
    };
    DownloadFailure::new(FailureKind::ServerError { status }, detail).with_url(final_url.as_str())
}

fn too_large(length: u64, cap: u64, url: &Url) -> DownloadFailure {
    DownloadFailure::new(
        FailureKind::TooLarge,
        format!(
            "file is {}, over the {} limit",
            format_bytes(length),
            format_bytes(cap)
        ),
    )
    .with_url(url.as_str())
}

/// `1536` → `"1.5 KiB"`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
