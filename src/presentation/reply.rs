//! User-facing replies for finished fetches.

use bytes::Bytes;
use url::Url;

use crate::download::{DownloadFailure, DownloadOutcome, FailureKind};
use crate::pipeline::FetchResult;
use crate::search::ResultItem;

/// Longest attachment name most chat platforms accept untouched.
pub const ATTACHMENT_NAME_LIMIT: usize = 80;

const SHORTENED_BASE_CHARS: usize = 75;

/// How a reply should be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyTone {
    /// The file is attached.
    Success,
    /// Partial success; a link is offered instead.
    Warning,
    /// The fetch failed.
    Error,
}

impl ReplyTone {
    /// Leading marker for plain-text front ends.
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Self::Success => "✅",
            Self::Warning => "⚠️",
            Self::Error => "❌",
        }
    }
}

/// File to upload with a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Upload name, already shortened to [`ATTACHMENT_NAME_LIMIT`].
    pub filename: String,
    /// File contents.
    pub bytes: Bytes,
}

/// What to tell the user about a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Styling hint.
    pub tone: ReplyTone,
    /// Message body, without the tone marker.
    pub text: String,
    /// File to upload, only on success.
    pub attachment: Option<Attachment>,
}

impl Reply {
    fn new(tone: ReplyTone, text: String) -> Self {
        Self {
            tone,
            text,
            attachment: None,
        }
    }

    /// Reply for a file the platform refused to take.
    #[must_use]
    pub fn upload_failed(download_url: Option<&Url>) -> Self {
        let mut text = "Could not upload the file (it may be slightly too large for this chat)."
            .to_string();
        if let Some(url) = download_url {
            text.push_str(&format!("\nTry downloading directly: {url}"));
        }
        Self::new(ReplyTone::Warning, text)
    }

    /// Text prefixed with the tone marker.
    #[must_use]
    pub fn render(&self) -> String {
        format!("{} {}", self.tone.marker(), self.text)
    }
}

/// Maps a finished fetch onto the reply for `item`.
///
/// `article_link` is the article mirror page for the item's DOI, offered when
/// a CAPTCHA blocked the automatic download.
#[must_use]
pub fn reply_for(result: &FetchResult, item: &ResultItem, article_link: Option<&Url>) -> Reply {
    match &result.outcome {
        DownloadOutcome::Success { bytes, filename } => Reply {
            tone: ReplyTone::Success,
            text: format!("Download complete for '{}'!", item.title()),
            attachment: Some(Attachment {
                filename: shorten_attachment_name(filename),
                bytes: bytes.clone(),
            }),
        },
        DownloadOutcome::Failure(failure) => failure_reply(failure, result, item, article_link),
    }
}

fn failure_reply(
    failure: &DownloadFailure,
    result: &FetchResult,
    item: &ResultItem,
    article_link: Option<&Url>,
) -> Reply {
    let direct = result.download_url.as_ref().map(Url::as_str);
    let shown = failure.url.as_deref();
    let other_mirror = other_mirror(item, result.mirror_url.as_ref());

    match failure.kind {
        FailureKind::TooLarge => {
            let mut text = format!("File is too large to send here ({}).", failure.detail);
            if let Some(url) = direct.or(shown) {
                text.push_str(&format!("\nDownload it directly: {url}"));
            }
            Reply::new(ReplyTone::Warning, text)
        }
        FailureKind::CaptchaBlocked => {
            let mut text =
                "The mirror asked for a CAPTCHA, so the file could not be fetched automatically."
                    .to_string();
            if let Some(url) = article_link.map(Url::as_str).or(shown).or(direct) {
                text.push_str(&format!("\nOpen it in your browser: {url}"));
            }
            Reply::new(ReplyTone::Warning, text)
        }
        FailureKind::HtmlPoisoned => {
            let mut text = "The mirror returned a web page instead of the file.".to_string();
            if let Some(url) = shown.or(direct) {
                text.push_str(&format!("\nTry the page directly: {url}"));
            }
            Reply::new(ReplyTone::Warning, text)
        }
        FailureKind::NoLinkFound => {
            let mut text = format!("Could not find a valid download link for '{}'.", item.title());
            if let Some(url) = other_mirror {
                text.push_str(&format!("\nAnother mirror may work: {url}"));
            }
            Reply::new(ReplyTone::Error, text)
        }
        FailureKind::ServerError { .. } | FailureKind::Timeout | FailureKind::Network => {
            let stage = if result.download_url.is_some() {
                "Error downloading"
            } else {
                "Error getting download link"
            };
            let mut text = format!("{stage}: {}", failure.detail);
            if let Some(url) = other_mirror {
                text.push_str(&format!("\nAnother mirror may work: {url}"));
            }
            Reply::new(ReplyTone::Error, text)
        }
        FailureKind::Other => Reply::new(
            ReplyTone::Error,
            "An unexpected error occurred during the download process.".to_string(),
        ),
    }
}

fn other_mirror<'a>(item: &'a ResultItem, tried: Option<&Url>) -> Option<&'a Url> {
    item.mirror_urls().find(|url| Some(*url) != tried)
}

/// Shortens `filename` to fit [`ATTACHMENT_NAME_LIMIT`]: the first 75
/// characters of the base, `...`, then the extension.
#[must_use]
pub fn shorten_attachment_name(filename: &str) -> String {
    if filename.chars().count() <= ATTACHMENT_NAME_LIMIT {
        return filename.to_string();
    }
    let (base, extension) = match filename.rfind('.') {
        Some(dot) if dot > 0 => filename.split_at(dot),
        _ => (filename, ""),
    };
    let head: String = base.chars().take(SHORTENED_BASE_CHARS).collect();
    format!("{head}...{extension}")
}
