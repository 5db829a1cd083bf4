//! Navigation state machine: which feed, which article, and which mode.
//!
//! The controller is the single authority on what belongs on screen. It
//! reacts to two kinds of input, both applied under the engine lock:
//!
//! - button presses ([`NavigationController::handle_button`])
//! - store updates ([`NavigationController::on_store_update`])
//!
//! Indices always wrap modulo their counts. Every change that should restart
//! the scroll animation bumps [`NavigationController::view_generation`].

use crate::config::ConfigError;
use crate::input::ButtonEvent;
use crate::store::{FeedEntry, FeedStore};

/// What kind of content the current feed can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Nothing fetched for the current feed yet
    Loading,
    /// The current feed has at least one article
    Ready,
    /// The current feed has nothing to show: every fetch failed, or the
    /// last successful fetch carried no entries.
    ///
    /// An empty successful fetch lands here on purpose so the panel says
    /// "No articles" instead of scrolling a blank line.
    Error,
}

impl Mode {
    /// Mode for a store entry, ignoring failure flags when good data exists.
    pub fn for_entry(entry: &FeedEntry) -> Self {
        match entry {
            FeedEntry::NotYetFetched => Mode::Loading,
            FeedEntry::Failed(_) => Mode::Error,
            FeedEntry::Fetched { feed, .. } if feed.is_empty() => Mode::Error,
            FeedEntry::Fetched { .. } => Mode::Ready,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationState {
    pub feed_index: usize,
    pub article_index: usize,
    pub mode: Mode,
}

#[derive(Debug, Clone)]
pub struct NavigationController {
    state: NavigationState,
    feed_count: usize,
    view_generation: u64,
}

impl NavigationController {
    /// Starts on the first feed in `Loading` mode.
    ///
    /// An empty feed list is a configuration error, never a runtime state.
    pub fn new(store: &FeedStore) -> Result<Self, ConfigError> {
        if store.is_empty() {
            return Err(ConfigError::NoFeeds);
        }
        let mut controller = Self {
            state: NavigationState {
                feed_index: 0,
                article_index: 0,
                mode: Mode::Loading,
            },
            feed_count: store.len(),
            view_generation: 0,
        };
        controller.reevaluate(store);
        Ok(controller)
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    /// Bumped whenever the displayed article changes identity; the renderer
    /// restarts its scroll cycle when it sees a new value.
    pub fn view_generation(&self) -> u64 {
        self.view_generation
    }

    /// Applies one button press. Returns `true` if the view changed.
    pub fn handle_button(&mut self, event: ButtonEvent, store: &FeedStore) -> bool {
        match event {
            ButtonEvent::NextArticle => self.step_article(store, true),
            ButtonEvent::PrevArticle => self.step_article(store, false),
            ButtonEvent::SwitchFeed => {
                self.state.feed_index = (self.state.feed_index + 1) % self.feed_count;
                self.state.article_index = 0;
                self.view_generation += 1;
                self.reevaluate(store);
                tracing::debug!(
                    feed_index = self.state.feed_index,
                    mode = ?self.state.mode,
                    "Switched feed"
                );
                true
            }
        }
    }

    /// Reacts to a store slot being replaced or flagged.
    ///
    /// Updates for feeds other than the current one have no visible effect;
    /// they are picked up when that feed becomes current. Returns `true` if
    /// the view changed.
    pub fn on_store_update(&mut self, feed_index: usize, store: &FeedStore) -> bool {
        if feed_index != self.state.feed_index {
            return false;
        }
        let before = self.state;
        self.reevaluate(store);
        if self.state.article_index != before.article_index {
            self.view_generation += 1;
        }
        self.state != before
    }

    fn step_article(&mut self, store: &FeedStore, forward: bool) -> bool {
        let count = store.article_count(self.state.feed_index);
        if count == 0 {
            return false;
        }
        let current = self.state.article_index.min(count - 1);
        self.state.article_index = if forward {
            (current + 1) % count
        } else {
            (current + count - 1) % count
        };
        self.view_generation += 1;
        true
    }

    /// Recomputes the mode from the current feed's slot and clamps the
    /// article index into the (possibly shrunk) article list.
    fn reevaluate(&mut self, store: &FeedStore) {
        let index = self.state.feed_index;
        self.state.mode = store.entry(index).map_or(Mode::Loading, Mode::for_entry);

        let count = store.article_count(index);
        if count == 0 {
            self.state.article_index = 0;
        } else if self.state.article_index >= count {
            self.state.article_index = count - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Article, Feed, FeedSource, FetchError};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn store_with(n: usize) -> FeedStore {
        FeedStore::new(
            (0..n)
                .map(|i| FeedSource::new(format!("https://example.com/{}", i), format!("Feed {}", i)))
                .collect(),
        )
    }

    fn fill(store: &mut FeedStore, index: usize, articles: usize) {
        let source = store.source(index).unwrap().clone();
        let articles = (0..articles)
            .map(|i| Article::new(format!("a{}", i), "body"))
            .collect();
        store.record_success(index, Feed::new(&source, articles));
    }

    #[test]
    fn test_empty_store_is_rejected() {
        let store = store_with(0);
        assert!(matches!(
            NavigationController::new(&store),
            Err(ConfigError::NoFeeds)
        ));
    }

    #[test]
    fn test_starts_loading_on_first_feed() {
        let store = store_with(3);
        let nav = NavigationController::new(&store).unwrap();
        assert_eq!(
            nav.state(),
            NavigationState {
                feed_index: 0,
                article_index: 0,
                mode: Mode::Loading
            }
        );
    }

    #[test]
    fn test_first_data_makes_ready() {
        let mut store = store_with(2);
        let mut nav = NavigationController::new(&store).unwrap();
        fill(&mut store, 0, 2);
        assert!(nav.on_store_update(0, &store));
        assert_eq!(nav.state().mode, Mode::Ready);
        assert_eq!(nav.state().article_index, 0);
    }

    #[test]
    fn test_next_and_prev_wrap() {
        let mut store = store_with(1);
        fill(&mut store, 0, 3);
        let mut nav = NavigationController::new(&store).unwrap();

        nav.handle_button(ButtonEvent::PrevArticle, &store);
        assert_eq!(nav.state().article_index, 2);
        nav.handle_button(ButtonEvent::NextArticle, &store);
        assert_eq!(nav.state().article_index, 0);
        nav.handle_button(ButtonEvent::NextArticle, &store);
        assert_eq!(nav.state().article_index, 1);
    }

    #[test]
    fn test_article_buttons_noop_without_articles() {
        let store = store_with(1);
        let mut nav = NavigationController::new(&store).unwrap();
        let generation = nav.view_generation();

        assert!(!nav.handle_button(ButtonEvent::NextArticle, &store));
        assert!(!nav.handle_button(ButtonEvent::PrevArticle, &store));
        assert_eq!(nav.state().mode, Mode::Loading);
        assert_eq!(nav.view_generation(), generation);
    }

    #[test]
    fn test_switch_feed_resets_article_and_reevaluates() {
        let mut store = store_with(2);
        fill(&mut store, 0, 3);
        store.record_failure(1, FetchError::Timeout);
        let mut nav = NavigationController::new(&store).unwrap();
        nav.handle_button(ButtonEvent::NextArticle, &store);

        nav.handle_button(ButtonEvent::SwitchFeed, &store);
        assert_eq!(
            nav.state(),
            NavigationState {
                feed_index: 1,
                article_index: 0,
                mode: Mode::Error
            }
        );

        nav.handle_button(ButtonEvent::SwitchFeed, &store);
        assert_eq!(nav.state().feed_index, 0);
        assert_eq!(nav.state().mode, Mode::Ready);
        assert_eq!(nav.state().article_index, 0);
    }

    #[test]
    fn test_update_for_other_feed_is_lazy() {
        let mut store = store_with(2);
        let mut nav = NavigationController::new(&store).unwrap();
        fill(&mut store, 1, 4);

        assert!(!nav.on_store_update(1, &store));
        assert_eq!(nav.state().mode, Mode::Loading);

        nav.handle_button(ButtonEvent::SwitchFeed, &store);
        assert_eq!(nav.state().mode, Mode::Ready);
    }

    #[test]
    fn test_shrink_clamps_article_index() {
        let mut store = store_with(1);
        fill(&mut store, 0, 5);
        let mut nav = NavigationController::new(&store).unwrap();
        for _ in 0..4 {
            nav.handle_button(ButtonEvent::NextArticle, &store);
        }
        assert_eq!(nav.state().article_index, 4);
        let generation = nav.view_generation();

        fill(&mut store, 0, 2);
        assert!(nav.on_store_update(0, &store));
        assert_eq!(nav.state().article_index, 1);
        assert_eq!(nav.state().mode, Mode::Ready);
        assert!(nav.view_generation() > generation);
    }

    #[test]
    fn test_shrink_to_zero_enters_error() {
        let mut store = store_with(1);
        fill(&mut store, 0, 3);
        let mut nav = NavigationController::new(&store).unwrap();
        nav.handle_button(ButtonEvent::NextArticle, &store);

        fill(&mut store, 0, 0);
        nav.on_store_update(0, &store);
        assert_eq!(nav.state().mode, Mode::Error);
        assert_eq!(nav.state().article_index, 0);
    }

    #[test]
    fn test_failure_after_success_stays_ready() {
        let mut store = store_with(1);
        fill(&mut store, 0, 2);
        let mut nav = NavigationController::new(&store).unwrap();
        nav.handle_button(ButtonEvent::NextArticle, &store);

        store.record_failure(0, FetchError::Unreachable("offline".into()));
        assert!(!nav.on_store_update(0, &store));
        assert_eq!(nav.state().mode, Mode::Ready);
        assert_eq!(nav.state().article_index, 1);
    }

    #[test]
    fn test_failure_while_loading_enters_error() {
        let mut store = store_with(1);
        let mut nav = NavigationController::new(&store).unwrap();
        store.record_failure(0, FetchError::Timeout);
        assert!(nav.on_store_update(0, &store));
        assert_eq!(nav.state().mode, Mode::Error);

        fill(&mut store, 0, 1);
        nav.on_store_update(0, &store);
        assert_eq!(nav.state().mode, Mode::Ready);
    }

    proptest! {
        #[test]
        fn prop_switch_feed_is_modular(feeds in 1usize..8, presses in 0usize..50) {
            let store = store_with(feeds);
            let mut nav = NavigationController::new(&store).unwrap();
            for _ in 0..presses {
                nav.handle_button(ButtonEvent::SwitchFeed, &store);
            }
            prop_assert_eq!(nav.state().feed_index, presses % feeds);
            prop_assert_eq!(nav.state().article_index, 0);
        }

        #[test]
        fn prop_article_index_stays_in_range(
            k in 1usize..12,
            moves in proptest::collection::vec(any::<bool>(), 0..64),
        ) {
            let mut store = store_with(1);
            fill(&mut store, 0, k);
            let mut nav = NavigationController::new(&store).unwrap();
            let mut expected = 0usize;
            for forward in moves {
                let event = if forward { ButtonEvent::NextArticle } else { ButtonEvent::PrevArticle };
                nav.handle_button(event, &store);
                expected = if forward { (expected + 1) % k } else { (expected + k - 1) % k };
                prop_assert!(nav.state().article_index < k);
                prop_assert_eq!(nav.state().article_index, expected);
            }
        }

        #[test]
        fn prop_shrink_never_points_past_end(k in 1usize..12, shrink_to in 0usize..12, steps in 0usize..12) {
            let mut store = store_with(1);
            fill(&mut store, 0, k);
            let mut nav = NavigationController::new(&store).unwrap();
            for _ in 0..steps {
                nav.handle_button(ButtonEvent::NextArticle, &store);
            }
            let before = nav.state().article_index;

            fill(&mut store, 0, shrink_to);
            nav.on_store_update(0, &store);

            if shrink_to == 0 {
                prop_assert_eq!(nav.state().mode, Mode::Error);
                prop_assert_eq!(nav.state().article_index, 0);
            } else {
                prop_assert!(nav.state().article_index < shrink_to);
                prop_assert_eq!(nav.state().article_index, before.min(shrink_to - 1));
            }
        }
    }
}
