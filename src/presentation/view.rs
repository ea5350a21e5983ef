//! Interactive selection state for one results reply.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use super::page::PageWindow;
use crate::cache::{MessageId, ResultCache};
use crate::search::{ResultItem, SearchResultSet};

/// Opaque id of the chat user who ran a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a selection or page turn was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// The user did not start this search.
    #[error("These buttons are not for you.")]
    NotOwner,

    /// The cached result set is gone.
    #[error("Sorry, the original search data has expired. Please search again.")]
    Expired,

    /// The 1-based index is outside the result set.
    #[error("Invalid selection index {index} (there are {len} results).")]
    InvalidIndex {
        /// Requested 1-based index.
        index: usize,
        /// Number of cached results.
        len: usize,
    },
}

/// A selected item together with the result set it came from.
#[derive(Debug, Clone)]
pub struct Selection {
    results: Arc<SearchResultSet>,
    index: usize,
}

impl Selection {
    /// The selected item.
    #[must_use]
    pub fn item(&self) -> &ResultItem {
        // index was validated against this set
        &self.results.items()[self.index]
    }

    /// Zero-based index within the result set.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The search page the results were parsed from (the flow's first referer).
    #[must_use]
    pub fn source_url(&self) -> Option<&url::Url> {
        self.results.source_url()
    }
}

/// Selection state attached to one results reply.
///
/// Only the user who ran the search may page or select, and only until the
/// selection window elapses. The result set itself lives in the
/// [`ResultCache`] under the same message id.
#[derive(Debug, Clone)]
pub struct SelectionView {
    owner: UserId,
    message_id: MessageId,
    window: PageWindow,
    created_at: Instant,
}

impl SelectionView {
    /// View over `total` cached results, starting at the first page.
    #[must_use]
    pub fn new(owner: UserId, message_id: MessageId, total: usize, per_page: usize) -> Self {
        Self::created_at(owner, message_id, total, per_page, Instant::now())
    }

    /// Like [`new`](Self::new) with an explicit creation time.
    #[must_use]
    pub fn created_at(
        owner: UserId,
        message_id: MessageId,
        total: usize,
        per_page: usize,
        created_at: Instant,
    ) -> Self {
        Self {
            owner,
            message_id,
            window: PageWindow::new(total, per_page, 0),
            created_at,
        }
    }

    #[must_use]
    pub fn owner(&self) -> UserId {
        self.owner
    }

    #[must_use]
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Current page.
    #[must_use]
    pub fn window(&self) -> PageWindow {
        self.window
    }

    /// Rejects anyone but the user who ran the search.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::NotOwner`] for other users.
    pub fn authorize(&self, user: UserId) -> Result<(), SelectionError> {
        if user == self.owner {
            Ok(())
        } else {
            debug!(%user, owner = %self.owner, "selection by non-owner refused");
            Err(SelectionError::NotOwner)
        }
    }

    /// True once `window` has elapsed since creation.
    #[must_use]
    pub fn expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= window
    }

    /// Moves one page forward (`true`) or back; stays put at either end.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::NotOwner`] for other users.
    pub fn turn_page(&mut self, user: UserId, forward: bool) -> Result<PageWindow, SelectionError> {
        self.authorize(user)?;
        self.window = if forward {
            self.window.next()
        } else {
            self.window.prev()
        };
        Ok(self.window)
    }

    /// Picks the item shown as `display_index` (one-based).
    ///
    /// # Errors
    ///
    /// - [`SelectionError::NotOwner`] for other users
    /// - [`SelectionError::Expired`] when the cache no longer holds the set
    /// - [`SelectionError::InvalidIndex`] when the number is out of range
    pub fn select(
        &self,
        user: UserId,
        display_index: usize,
        cache: &ResultCache,
    ) -> Result<Selection, SelectionError> {
        self.authorize(user)?;
        let results = cache.get(self.message_id).ok_or(SelectionError::Expired)?;
        let len = results.len();
        let index = display_index
            .checked_sub(1)
            .filter(|index| *index < len)
            .ok_or(SelectionError::InvalidIndex {
                index: display_index,
                len,
            })?;
        Ok(Selection { results, index })
    }

    /// Ends the view and drops its cached results.
    pub fn expire(self, cache: &ResultCache) {
        if cache.remove(self.message_id).is_some() {
            info!(message_id = %self.message_id, "selection expired, cached results removed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::search::SearchCategory;
    use url::Url;

    const OWNER: UserId = UserId(7);
    const OTHER: UserId = UserId(8);
    const MSG: MessageId = MessageId(100);

    fn cache_with(count: usize) -> ResultCache {
        let items = (0..count)
            .map(|i| {
                ResultItem::builder(format!("Book {i}"))
                    .primary_mirror(Some(
                        Url::parse(&format!("https://m.example/{i}")).unwrap(),
                    ))
                    .build()
                    .unwrap()
            })
            .collect();
        let cache = ResultCache::new(10);
        cache.insert(
            MSG,
            SearchResultSet::new("q", SearchCategory::NonFiction, None, items),
        );
        cache
    }

    #[test]
    fn test_only_owner_may_select() {
        let cache = cache_with(3);
        let view = SelectionView::new(OWNER, MSG, 3, 5);
        assert_eq!(
            view.select(OTHER, 1, &cache).unwrap_err(),
            SelectionError::NotOwner
        );
        assert_eq!(view.select(OWNER, 2, &cache).unwrap().item().title(), "Book 1");
    }

    #[test]
    fn test_index_validation() {
        let cache = cache_with(3);
        let view = SelectionView::new(OWNER, MSG, 3, 5);
        assert!(matches!(
            view.select(OWNER, 0, &cache),
            Err(SelectionError::InvalidIndex { index: 0, len: 3 })
        ));
        assert!(matches!(
            view.select(OWNER, 4, &cache),
            Err(SelectionError::InvalidIndex { index: 4, len: 3 })
        ));
    }

    #[test]
    fn test_expiry_window_and_cache_removal() {
        let cache = cache_with(2);
        let start = Instant::now();
        let view = SelectionView::created_at(OWNER, MSG, 2, 5, start);
        let window = Duration::from_secs(600);
        assert!(!view.expired(start + Duration::from_secs(599), window));
        assert!(view.expired(start + window, window));

        view.clone().expire(&cache);
        assert!(!cache.contains(MSG));
        assert_eq!(
            view.select(OWNER, 1, &cache).unwrap_err(),
            SelectionError::Expired
        );
    }

    #[test]
    fn test_turn_page_clamps_at_ends() {
        let mut view = SelectionView::new(OWNER, MSG, 12, 5);
        assert!(view.turn_page(OTHER, true).is_err());
        assert_eq!(view.turn_page(OWNER, false).unwrap().page(), 0);
        assert_eq!(view.turn_page(OWNER, true).unwrap().page(), 1);
        assert_eq!(view.turn_page(OWNER, true).unwrap().page(), 2);
        assert_eq!(view.turn_page(OWNER, true).unwrap().page(), 2);
    }
}
