//! Bookfinder Core Library
//!
//! Searches a shadow-library aggregator, resolves a chosen result's mirror
//! page to a direct file link, and downloads the file under a hard size cap.
//! Chat front ends sit on top of [`pipeline::Pipeline`] and the helpers in
//! [`presentation`].
//!
//! # Architecture
//!
//! - [`transport`] - HTTP seam (`Transport` trait, reqwest implementation)
//! - [`search`] - search requests and results-table parsing
//! - [`mirror`] - mirror page → direct download link
//! - [`download`] - size-capped streaming download and failure classification
//! - [`cache`] - bounded result cache keyed by reply message id
//! - [`pipeline`] - search → resolve → download on worker tasks
//! - [`presentation`] - paging, selection views and user-facing replies
//! - [`health`] - liveness endpoint

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod context;
pub mod download;
pub mod health;
mod html;
pub mod mirror;
pub mod pipeline;
pub mod presentation;
pub mod search;
pub mod transport;
mod user_agent;

// Re-export commonly used types
pub use cache::{MessageId, PendingResults, ResultCache};
pub use config::{ConfigError, PipelineConfig};
pub use context::RequestContext;
pub use download::{DownloadFailure, DownloadOutcome, Downloader, FailureKind};
pub use mirror::{MirrorResolver, ResolveError};
pub use pipeline::{FetchResult, Pipeline};
pub use search::{ResultItem, SearchCategory, SearchError, SearchResultSet, Searcher};
pub use transport::{HttpTransport, Transport, TransportError};
