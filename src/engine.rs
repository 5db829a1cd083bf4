//! Wires the store, navigation, scroll renderer and display together.
//!
//! Three kinds of activity share one [`EngineState`] behind a mutex:
//!
//! - one refresh task per feed (see [`crate::scheduler`])
//! - the render loop, which draws one frame per tick and, when configured,
//!   moves on to the next article by itself
//! - the input loop, which applies debounced button presses
//!
//! The lock is only held for short synchronous sections, never across an
//! `.await`. After the input loop or a refresh changes the view it wakes the
//! render loop, so a press is visible on the next frame rather than the next
//! tick.

use crate::config::{ActiveHours, ConfigError};
use crate::display::{DisplayHandle, RenderSinkError};
use crate::feed::{Feed, FeedFetcher, FeedSource, FetchError};
use crate::input::{ButtonEvent, InputReceiver};
use crate::navigation::{Mode, NavigationController, NavigationState};
use crate::scheduler::RefreshScheduler;
use crate::scroll::{AutoAdvance, Screen, ScrollConfig, ScrollRenderer};
use crate::shutdown::{ShutdownCoordinator, ShutdownSignal, ShutdownTrigger};
use crate::store::FeedStore;
use chrono::Local;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior};

pub const LOADING_MESSAGE: &str = "Loading...";

/// Store plus navigation: everything a frame is computed from.
#[derive(Debug)]
pub struct EngineState {
    pub store: FeedStore,
    pub nav: NavigationController,
}

pub type SharedState = Arc<Mutex<EngineState>>;

/// Locks the shared state. A panicked holder cannot leave it half-updated
/// (every mutation is a single assignment), so poisoning is ignored.
pub fn lock_state(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EngineState {
    pub fn new(sources: Vec<FeedSource>) -> Result<Self, ConfigError> {
        let store = FeedStore::new(sources);
        let nav = NavigationController::new(&store)?;
        Ok(Self { store, nav })
    }

    /// Records one fetch outcome and lets navigation react to it.
    ///
    /// `Empty` counts as a successful fetch with no articles. Returns `true`
    /// if the view changed.
    pub fn apply_fetch(&mut self, index: usize, outcome: Result<Feed, FetchError>) -> bool {
        let recorded = match outcome {
            Ok(feed) => self.store.record_success(index, feed),
            Err(FetchError::Empty) => match self.store.source(index).cloned() {
                Some(source) => self.store.record_success(index, Feed::empty(&source)),
                None => false,
            },
            Err(e) => self.store.record_failure(index, e),
        };
        recorded && self.nav.on_store_update(index, &self.store)
    }

    /// Applies one button press. Returns `true` if the view changed.
    pub fn apply_button(&mut self, event: ButtonEvent) -> bool {
        self.nav.handle_button(event, &self.store)
    }

    /// What belongs on the panel right now.
    pub fn screen(&self, active: bool) -> Screen {
        if !active {
            return Screen::Off;
        }
        let nav = self.nav.state();
        let Some(source) = self.store.source(nav.feed_index) else {
            return Screen::Status(LOADING_MESSAGE.to_string());
        };
        let feed = self
            .store
            .entry(nav.feed_index)
            .and_then(|entry| entry.feed());

        match nav.mode {
            Mode::Loading => Screen::Status(LOADING_MESSAGE.to_string()),
            Mode::Error if feed.is_some() => {
                Screen::Status(format!("No articles: {}", source.display_name))
            }
            Mode::Error => Screen::Status(format!("Error: {}", source.display_name)),
            Mode::Ready => match feed.and_then(|f| f.articles.get(nav.article_index)) {
                Some(article) => Screen::Article {
                    header: source.display_name.clone(),
                    text: Arc::from(article.scroll_text()),
                    generation: self.nav.view_generation(),
                },
                None => Screen::Status(LOADING_MESSAGE.to_string()),
            },
        }
    }
}

/// Timing and layout knobs for a running engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub refresh_interval: Duration,
    pub tick: Duration,
    pub scroll: ScrollConfig,
    /// Off by default: the current article loops until a button is pressed.
    pub auto_advance: AutoAdvance,
    /// `None` keeps the panel on around the clock.
    pub active_hours: Option<ActiveHours>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(300),
            tick: Duration::from_millis(100),
            scroll: ScrollConfig::default(),
            auto_advance: AutoAdvance::default(),
            active_hours: None,
        }
    }
}

pub struct Engine {
    state: SharedState,
    fetcher: Arc<dyn FeedFetcher>,
    settings: EngineSettings,
    redraw: Arc<Notify>,
}

impl Engine {
    /// Fails with [`ConfigError::NoFeeds`] for an empty source list.
    pub fn new(
        sources: Vec<FeedSource>,
        fetcher: Arc<dyn FeedFetcher>,
        settings: EngineSettings,
    ) -> Result<Self, ConfigError> {
        let state = EngineState::new(sources)?;
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            fetcher,
            settings,
            redraw: Arc::new(Notify::new()),
        })
    }

    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    pub fn snapshot(&self) -> NavigationState {
        lock_state(&self.state).nav.state()
    }

    /// Spawns the refresh tasks, the render loop and the input loop on the
    /// coordinator. They run until shutdown is signalled.
    pub fn start(
        &self,
        coordinator: &mut ShutdownCoordinator,
        input: InputReceiver,
        display: DisplayHandle,
    ) {
        let feed_count = lock_state(&self.state).store.len();
        tracing::info!(
            feeds = feed_count,
            refresh_secs = self.settings.refresh_interval.as_secs(),
            tick_ms = self.settings.tick.as_millis() as u64,
            "Starting engine"
        );

        RefreshScheduler::new(Arc::clone(&self.fetcher), self.settings.refresh_interval).start(
            coordinator,
            Arc::clone(&self.state),
            Arc::clone(&self.redraw),
        );

        let render = RenderLoop {
            state: Arc::clone(&self.state),
            display,
            renderer: ScrollRenderer::new(self.settings.scroll),
            tick: self.settings.tick,
            auto_advance: self.settings.auto_advance,
            shown: None,
            active_hours: self.settings.active_hours,
            redraw: Arc::clone(&self.redraw),
            trigger: coordinator.trigger(),
        };
        let signal = coordinator.signal();
        coordinator.spawn("render", render.run(signal));

        let signal = coordinator.signal();
        coordinator.spawn(
            "input",
            input_loop(Arc::clone(&self.state), input, Arc::clone(&self.redraw), signal),
        );
    }
}

struct RenderLoop {
    state: SharedState,
    display: DisplayHandle,
    renderer: ScrollRenderer,
    tick: Duration,
    auto_advance: AutoAdvance,
    /// Generation of the article on screen and when it first appeared.
    shown: Option<(u64, Instant)>,
    active_hours: Option<ActiveHours>,
    redraw: Arc<Notify>,
    trigger: ShutdownTrigger,
}

impl RenderLoop {
    async fn run(mut self, shutdown: ShutdownSignal) {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            // Redraws requested by input or refresh repaint without advancing
            // the scroll, so presses do not speed the animation up.
            let advance = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = self.redraw.notified() => false,
                _ = ticker.tick() => true,
            };

            let active = self
                .active_hours
                .map_or(true, |hours| hours.contains(Local::now().time()));
            let screen = lock_state(&self.state).screen(active);
            let frame = self.renderer.frame(&screen, &self.display, advance);

            match self.display.draw(&frame) {
                Ok(()) => {}
                Err(RenderSinkError::Released) => {
                    tracing::debug!("Display released, render loop stopping");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Display failed");
                    self.trigger.trigger("display error");
                    break;
                }
            }

            if advance {
                self.advance_if_due(&screen);
            }
        }

        tracing::debug!("Render loop stopped");
    }

    /// Moves to the next article once the configured cycle count or display
    /// time is reached. Goes through the same path as a button press.
    fn advance_if_due(&mut self, screen: &Screen) {
        if !self.auto_advance.is_enabled() {
            return;
        }
        let Screen::Article { generation, .. } = screen else {
            self.shown = None;
            return;
        };

        let now = Instant::now();
        let since = match self.shown {
            Some((seen, since)) if seen == *generation => since,
            _ => {
                self.shown = Some((*generation, now));
                now
            }
        };
        let shown_for = now.saturating_duration_since(since);
        if !self
            .auto_advance
            .is_due(self.renderer.cycles_completed(), shown_for)
        {
            return;
        }

        let (changed, nav) = {
            let mut state = lock_state(&self.state);
            let changed = state.apply_button(ButtonEvent::NextArticle);
            (changed, state.nav.state())
        };
        tracing::debug!(
            feed_index = nav.feed_index,
            article_index = nav.article_index,
            shown_ms = shown_for.as_millis() as u64,
            "Auto-advanced to next article"
        );
        if changed {
            self.redraw.notify_one();
        }
    }
}

async fn input_loop(
    state: SharedState,
    mut input: InputReceiver,
    redraw: Arc<Notify>,
    shutdown: ShutdownSignal,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            event = input.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let (changed, nav) = {
            let mut state = lock_state(&state);
            let changed = state.apply_button(event);
            (changed, state.nav.state())
        };
        tracing::debug!(
            ?event,
            feed_index = nav.feed_index,
            article_index = nav.article_index,
            mode = ?nav.mode,
            "Button applied"
        );
        if changed {
            redraw.notify_one();
        }
    }

    tracing::debug!("Input loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Article;
    use pretty_assertions::assert_eq;

    fn state(n: usize) -> EngineState {
        let sources = (0..n)
            .map(|i| FeedSource::new(format!("https://example.com/{}", i), format!("Feed {}", i)))
            .collect();
        EngineState::new(sources).unwrap()
    }

    fn feed(state: &EngineState, index: usize, titles: &[&str]) -> Feed {
        let source = state.store.source(index).unwrap();
        Feed::new(source, titles.iter().map(|t| Article::new(*t, "")).collect())
    }

    #[test]
    fn test_empty_sources_rejected() {
        assert!(matches!(
            EngineState::new(Vec::new()),
            Err(ConfigError::NoFeeds)
        ));
    }

    #[test]
    fn test_screen_follows_mode() {
        let mut state = state(2);
        assert_eq!(state.screen(true), Screen::Status("Loading...".to_string()));

        assert!(state.apply_fetch(0, Err(FetchError::Timeout)));
        assert_eq!(state.screen(true), Screen::Status("Error: Feed 0".to_string()));

        let ok = feed(&state, 0, &["Hello"]);
        assert!(state.apply_fetch(0, Ok(ok)));
        assert_eq!(
            state.screen(true),
            Screen::Article {
                header: "Feed 0".to_string(),
                text: Arc::from("Hello"),
                generation: state.nav.view_generation(),
            }
        );
        assert_eq!(state.screen(false), Screen::Off);
    }

    #[test]
    fn test_empty_outcome_is_a_successful_fetch() {
        let mut state = state(1);
        state.apply_fetch(0, Err(FetchError::Empty));

        assert!(!state.store.entry(0).unwrap().has_failure());
        assert_eq!(state.nav.state().mode, Mode::Error);
        assert_eq!(
            state.screen(true),
            Screen::Status("No articles: Feed 0".to_string())
        );
    }

    #[test]
    fn test_failure_keeps_stale_articles_visible() {
        let mut state = state(1);
        let ok = feed(&state, 0, &["a", "b"]);
        state.apply_fetch(0, Ok(ok));
        state.apply_button(ButtonEvent::NextArticle);

        assert!(!state.apply_fetch(0, Err(FetchError::Unreachable("down".into()))));
        let nav = state.nav.state();
        assert_eq!(nav.mode, Mode::Ready);
        assert_eq!(nav.article_index, 1);
        assert!(matches!(state.screen(true), Screen::Article { .. }));
    }

    #[test]
    fn test_update_to_other_feed_is_invisible() {
        let mut state = state(2);
        let before = state.screen(true);
        let other = feed(&state, 1, &["x"]);

        assert!(!state.apply_fetch(1, Ok(other)));
        assert_eq!(state.screen(true), before);

        state.apply_button(ButtonEvent::SwitchFeed);
        assert_eq!(state.nav.state().mode, Mode::Ready);
    }
}
