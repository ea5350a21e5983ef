//! Bounded result cache keyed by reply message id.
//!
//! A search's results only get a key once the reply carrying them has been
//! sent. Until then they live in a [`PendingResults`], which is consumed by
//! [`PendingResults::promote`] when the id is known. Eviction is FIFO by
//! first insertion.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::search::SearchResultSet;

/// Opaque id of the reply message that displays a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Default)]
struct Entries {
    map: HashMap<MessageId, Arc<SearchResultSet>>,
    order: VecDeque<MessageId>,
}

/// FIFO-bounded map from [`MessageId`] to shared result sets.
///
/// Safe to share across tasks; all operations take a short internal lock.
pub struct ResultCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl ResultCache {
    /// Creates a cache holding at most `capacity` result sets (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(Entries::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // Every critical section leaves map and order consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `results` under `id` and returns the ids evicted to make room.
    ///
    /// Re-inserting an existing id replaces the value in place; its eviction
    /// position is unchanged.
    pub fn insert(&self, id: MessageId, results: SearchResultSet) -> Vec<MessageId> {
        self.insert_shared(id, Arc::new(results))
    }

    fn insert_shared(&self, id: MessageId, results: Arc<SearchResultSet>) -> Vec<MessageId> {
        let mut entries = self.lock();
        if entries.map.insert(id, results).is_some() {
            return Vec::new();
        }
        entries.order.push_back(id);

        let mut evicted = Vec::new();
        while entries.order.len() > self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.map.remove(&oldest);
            evicted.push(oldest);
        }
        if !evicted.is_empty() {
            debug!(?evicted, "evicted oldest cached result sets");
        }
        evicted
    }

    /// The result set for `id`.
    #[must_use]
    pub fn get(&self, id: MessageId) -> Option<Arc<SearchResultSet>> {
        self.lock().map.get(&id).cloned()
    }

    /// Removes `id` (view timeout). Returns the removed set.
    pub fn remove(&self, id: MessageId) -> Option<Arc<SearchResultSet>> {
        let mut entries = self.lock();
        let removed = entries.map.remove(&id)?;
        entries.order.retain(|existing| *existing != id);
        Some(removed)
    }

    /// True when `id` is cached.
    #[must_use]
    pub fn contains(&self, id: MessageId) -> bool {
        self.lock().map.contains_key(&id)
    }

    /// Number of cached result sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    /// True when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of result sets.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

/// Results of a search whose reply has not been sent yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingResults {
    results: SearchResultSet,
}

impl PendingResults {
    /// Wraps freshly parsed results.
    #[must_use]
    pub fn new(results: SearchResultSet) -> Self {
        Self { results }
    }

    /// The results, for rendering the first reply.
    #[must_use]
    pub fn results(&self) -> &SearchResultSet {
        &self.results
    }

    /// Caches the results under the now-known reply id and returns the
    /// shared handle.
    pub fn promote(self, id: MessageId, cache: &ResultCache) -> Arc<SearchResultSet> {
        let shared = Arc::new(self.results);
        cache.insert_shared(id, Arc::clone(&shared));
        shared
    }

    /// Unwraps the results without caching (e.g. an empty set is never cached).
    #[must_use]
    pub fn into_inner(self) -> SearchResultSet {
        self.results
    }
}
