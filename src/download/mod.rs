//! Streaming file download with a hard size cap.
//!
//! [`Downloader::download`] turns a direct file URL into a
//! [`DownloadOutcome`]:
//!
//! - optional HEAD probe rejects advertised oversize files before any GET
//! - non-2xx statuses become [`FailureKind::ServerError`]
//! - HTML bodies are content poisoning, classified as
//!   [`FailureKind::CaptchaBlocked`] or [`FailureKind::HtmlPoisoned`] from a
//!   short prefix, then closed
//! - the body is streamed with a running byte count and aborted the moment
//!   it passes the cap
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bookfinder_core::context::RequestContext;
//! use bookfinder_core::download::{DownloadOutcome, Downloader};
//! use bookfinder_core::transport::HttpTransport;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(HttpTransport::new(Duration::from_secs(10))?);
//! let downloader = Downloader::new(transport, 25 * 1024 * 1024, Duration::from_secs(300), true);
//! let url = url::Url::parse("https://mirror.example/get.php?md5=ABC")?;
//! match downloader.download(&url, "Dune", "epub", &RequestContext::new()).await {
//!     DownloadOutcome::Success { filename, bytes } => println!("{filename}: {} bytes", bytes.len()),
//!     DownloadOutcome::Failure(failure) => eprintln!("{failure}"),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
pub mod filename;
mod inspect;
mod outcome;

pub use client::{Downloader, format_bytes};
pub use constants::{CAPTCHA_MARKERS, HTML_SNIFF_BYTES};
pub use filename::{FilenameHints, KNOWN_EXTENSIONS, resolve_filename, resolve_unique_path};
pub use outcome::{DownloadFailure, DownloadOutcome, FailureKind};
