//! Last-known-good feed results, one slot per configured feed.
//!
//! Slots are indexed by the feed's position in the configured list. A
//! successful fetch swaps in a fresh `Arc<Feed>`; readers holding the old
//! `Arc` keep a complete, unchanged snapshot, so nobody ever sees a feed
//! half-way through an update. A failed fetch only raises a flag next to the
//! stored feed so stale content stays on screen.

use crate::feed::{Feed, FeedSource, FetchError};
use std::sync::Arc;

/// What is known about one configured feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEntry {
    /// No fetch has completed yet.
    NotYetFetched,
    /// At least one fetch succeeded. `failure` is set when the most recent
    /// attempt failed; `feed` is then the last good result.
    Fetched {
        feed: Arc<Feed>,
        failure: Option<FetchError>,
    },
    /// Every attempt so far has failed.
    Failed(FetchError),
}

impl FeedEntry {
    pub fn feed(&self) -> Option<&Arc<Feed>> {
        match self {
            FeedEntry::Fetched { feed, .. } => Some(feed),
            _ => None,
        }
    }

    /// Whether the most recent fetch attempt failed.
    pub fn has_failure(&self) -> bool {
        matches!(
            self,
            FeedEntry::Failed(_) | FeedEntry::Fetched { failure: Some(_), .. }
        )
    }

    pub fn article_count(&self) -> usize {
        self.feed().map_or(0, |f| f.len())
    }
}

/// Slots for every configured feed, in configuration order.
#[derive(Debug, Clone)]
pub struct FeedStore {
    sources: Vec<FeedSource>,
    entries: Vec<FeedEntry>,
}

impl FeedStore {
    pub fn new(sources: Vec<FeedSource>) -> Self {
        let entries = vec![FeedEntry::NotYetFetched; sources.len()];
        Self { sources, entries }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    pub fn source(&self, index: usize) -> Option<&FeedSource> {
        self.sources.get(index)
    }

    pub fn entry(&self, index: usize) -> Option<&FeedEntry> {
        self.entries.get(index)
    }

    pub fn article_count(&self, index: usize) -> usize {
        self.entry(index).map_or(0, FeedEntry::article_count)
    }

    /// Replaces the slot with a fresh result and clears any failure flag.
    ///
    /// Returns `false` if `index` is not a configured feed.
    pub fn record_success(&mut self, index: usize, feed: Feed) -> bool {
        let Some(entry) = self.entries.get_mut(index) else {
            return false;
        };
        *entry = FeedEntry::Fetched {
            feed: Arc::new(feed),
            failure: None,
        };
        true
    }

    /// Flags the slot as failed, keeping any previously fetched feed.
    ///
    /// Returns `false` if `index` is not a configured feed.
    pub fn record_failure(&mut self, index: usize, error: FetchError) -> bool {
        let Some(entry) = self.entries.get_mut(index) else {
            return false;
        };
        *entry = match std::mem::replace(entry, FeedEntry::NotYetFetched) {
            FeedEntry::Fetched { feed, .. } => FeedEntry::Fetched {
                feed,
                failure: Some(error),
            },
            FeedEntry::NotYetFetched | FeedEntry::Failed(_) => FeedEntry::Failed(error),
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Article;
    use pretty_assertions::assert_eq;

    fn sources(n: usize) -> Vec<FeedSource> {
        (0..n)
            .map(|i| FeedSource::new(format!("https://example.com/{}", i), format!("Feed {}", i)))
            .collect()
    }

    fn feed_with(store: &FeedStore, index: usize, titles: &[&str]) -> Feed {
        let articles = titles.iter().map(|t| Article::new(*t, "")).collect();
        Feed::new(store.source(index).unwrap(), articles)
    }

    #[test]
    fn test_new_store_is_unfetched() {
        let store = FeedStore::new(sources(3));
        assert_eq!(store.len(), 3);
        for i in 0..3 {
            assert_eq!(store.entry(i), Some(&FeedEntry::NotYetFetched));
        }
        assert_eq!(store.entry(3), None);
    }

    #[test]
    fn test_success_replaces_and_clears_failure() {
        let mut store = FeedStore::new(sources(1));
        let first = feed_with(&store, 0, &["a"]);
        store.record_success(0, first);
        store.record_failure(0, FetchError::Timeout);
        assert!(store.entry(0).unwrap().has_failure());

        let second = feed_with(&store, 0, &["b", "c"]);
        store.record_success(0, second);
        let entry = store.entry(0).unwrap();
        assert!(!entry.has_failure());
        assert_eq!(entry.article_count(), 2);
    }

    #[test]
    fn test_failure_keeps_last_good_feed() {
        let mut store = FeedStore::new(sources(1));
        let feed = feed_with(&store, 0, &["a", "b"]);
        store.record_success(0, feed);
        let before = store.entry(0).unwrap().feed().cloned().unwrap();

        store.record_failure(0, FetchError::Unreachable("down".into()));

        let entry = store.entry(0).unwrap();
        assert!(entry.has_failure());
        assert!(Arc::ptr_eq(entry.feed().unwrap(), &before));
        assert_eq!(entry.article_count(), 2);
    }

    #[test]
    fn test_failure_without_data() {
        let mut store = FeedStore::new(sources(1));
        store.record_failure(0, FetchError::Timeout);
        assert_eq!(store.entry(0), Some(&FeedEntry::Failed(FetchError::Timeout)));

        store.record_failure(0, FetchError::Empty);
        assert_eq!(store.entry(0), Some(&FeedEntry::Failed(FetchError::Empty)));
    }

    #[test]
    fn test_failure_on_one_feed_leaves_others_untouched() {
        let mut store = FeedStore::new(sources(2));
        let feed = feed_with(&store, 1, &["x"]);
        store.record_success(1, feed);
        let before = store.entry(1).cloned();

        store.record_failure(0, FetchError::Timeout);

        assert_eq!(store.entry(1).cloned(), before);
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let mut store = FeedStore::new(sources(1));
        let old = feed_with(&store, 0, &["old"]);
        store.record_success(0, old);
        let held = store.entry(0).unwrap().feed().cloned().unwrap();

        let new = feed_with(&store, 0, &["new1", "new2"]);
        store.record_success(0, new);

        assert_eq!(held.articles[0].title, "old");
        assert_eq!(store.article_count(0), 2);
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let mut store = FeedStore::new(sources(1));
        assert!(!store.record_failure(5, FetchError::Timeout));
        let feed = Feed::empty(&FeedSource::new("u", "n"));
        assert!(!store.record_success(5, feed));
    }
}
