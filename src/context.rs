//! Per-flow request state.
//!
//! Some mirrors refuse hotlinked downloads unless the `Referer` names the page
//! the user "came from". Each search → resolve → download sequence carries its
//! own [`RequestContext`] so concurrent users never see each other's referer.

use url::Url;

/// Request state owned by a single user flow.
///
/// Not `Clone`: a context is threaded through one flow by `&mut` and is never
/// shared between flows.
#[derive(Debug, Default)]
pub struct RequestContext {
    referer: Option<Url>,
}

impl RequestContext {
    /// Creates a context with no referer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context that starts from a known page (used when a flow is
    /// resumed from a cached search).
    #[must_use]
    pub fn with_referer(referer: Url) -> Self {
        Self {
            referer: Some(referer),
        }
    }

    /// The most recently visited page's final URL, if any.
    #[must_use]
    pub fn referer(&self) -> Option<&Url> {
        self.referer.as_ref()
    }

    /// Records the final (post-redirect) URL of a page that was fetched
    /// successfully.
    pub fn record_visit(&mut self, final_url: &Url) {
        self.referer = Some(final_url.clone());
    }
}
