//! Content-poisoning checks on HTML responses.

use url::Url;

use super::constants::{CAPTCHA_HOST_FRAGMENTS, CAPTCHA_MARKERS, CAPTCHA_PATH_FRAGMENTS};
use crate::html::canonical_host;

/// True when `url` belongs to an article mirror that serves CAPTCHA pages.
#[must_use]
pub(crate) fn is_captcha_prone(url: &Url) -> bool {
    let host = url.host_str().map(canonical_host).unwrap_or_default();
    let path = url.path().to_ascii_lowercase();
    CAPTCHA_HOST_FRAGMENTS
        .iter()
        .any(|fragment| host.contains(fragment))
        || CAPTCHA_PATH_FRAGMENTS
            .iter()
            .any(|fragment| path.contains(fragment))
}

/// True when the body prefix carries a CAPTCHA marker.
#[must_use]
pub(crate) fn has_captcha_marker(prefix: &str) -> bool {
    let lowered = prefix.to_lowercase();
    CAPTCHA_MARKERS.iter().any(|marker| lowered.contains(marker))
}
