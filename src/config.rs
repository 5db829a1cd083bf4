//! Configuration file parser for config.toml.
//!
//! Every key has a default except the feed list, which [`Config::validate`]
//! requires to be non-empty. Unknown keys are accepted by serde but logged
//! as warnings so typos do not go unnoticed.
use crate::feed::FeedSource;
use crate::scroll::{AutoAdvance, ScrollConfig};
use chrono::NaiveTime;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("No feeds configured: add at least one [[feeds]] entry")]
    NoFeeds,

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Invalid URL for feed #{index}: {reason}")]
    InvalidUrl { index: usize, reason: String },

    #[error("Invalid scroll settings: {0}")]
    InvalidScroll(String),

    #[error("Invalid display settings: {0}")]
    InvalidDisplay(String),

    #[error("Invalid active hours: {0}")]
    InvalidTime(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// One `[[feeds]]` entry. A missing display name falls back to the URL's host.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub url: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Panel width in pixels.
    pub width_px: u32,
    /// Advance of one glyph in pixels (fixed-pitch font).
    pub glyph_width_px: u32,
    /// Start of the daily window in which the panel shows content, "HH:MM".
    pub active_from: Option<String>,
    /// End of that window (exclusive), "HH:MM".
    pub active_until: Option<String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width_px: 128,
            glyph_width_px: 6,
            active_from: None,
            active_until: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrollSection {
    pub step_px: u32,
    pub tick_ms: u64,
    pub gap_px: u32,
    /// Starting offset of each cycle. Defaults to `-width_px`.
    pub lead_in_px: Option<i32>,
    pub hold_ticks: u32,
    /// Move to the next article after this many full cycles. 0 disables.
    pub auto_advance_cycles: u32,
    /// Move to the next article after this many seconds on screen. 0 disables.
    pub auto_advance_secs: u64,
}

impl Default for ScrollSection {
    fn default() -> Self {
        Self {
            step_px: 2,
            tick_ms: 100,
            gap_px: 32,
            lead_in_px: None,
            hold_ticks: 30,
            auto_advance_cycles: 0,
            auto_advance_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Repeats of the same button inside this window are dropped. 0 disables.
    pub debounce_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between refreshes of each feed.
    pub refresh_interval_secs: u64,

    /// Upper bound on a single fetch, in seconds.
    pub fetch_timeout_secs: u64,

    /// Maximum number of articles kept per feed (0 = unlimited).
    pub max_articles_per_feed: usize,

    /// How long shutdown waits for tasks before aborting them.
    pub shutdown_grace_ms: u64,

    /// Feeds in display order.
    pub feeds: Vec<FeedConfig>,

    pub display: DisplayConfig,
    pub scroll: ScrollSection,
    pub input: InputConfig,

    /// Keybinding overrides. Keys are action names, values are key strings.
    pub keybindings: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 300,
            fetch_timeout_secs: 30,
            max_articles_per_feed: 10,
            shutdown_grace_ms: 1000,
            feeds: Vec::new(),
            display: DisplayConfig::default(),
            scroll: ScrollSection::default(),
            input: InputConfig::default(),
            keybindings: HashMap::new(),
        }
    }
}

/// Daily window in which the panel shows content.
///
/// `until` is exclusive. A window whose end is before its start wraps
/// midnight, e.g. 22:00-06:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveHours {
    pub from: NaiveTime,
    pub until: NaiveTime,
}

impl ActiveHours {
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.from <= self.until {
            self.from <= time && time < self.until
        } else {
            time >= self.from || time < self.until
        }
    }
}

fn parse_clock(field: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| {
        ConfigError::InvalidTime(format!("{} = \"{}\" is not HH:MM ({})", field, value, e))
    })
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "refresh_interval_secs",
        "fetch_timeout_secs",
        "max_articles_per_feed",
        "shutdown_grace_ms",
        "feeds",
        "display",
        "scroll",
        "input",
        "keybindings",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`, which has no feeds
    ///   and therefore fails [`validate`](Self::validate)
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        Self::warn_unknown_keys(&content);

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            feeds = config.feeds.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    fn warn_unknown_keys(content: &str) {
        let Ok(raw) = content.parse::<toml::Table>() else {
            return;
        };
        for key in raw.keys() {
            if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                tracing::warn!(key = %key, "Unknown key in config file, ignoring");
            }
        }
    }

    /// Checks everything the engine relies on. Run once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feeds.is_empty() {
            return Err(ConfigError::NoFeeds);
        }
        for (index, feed) in self.feeds.iter().enumerate() {
            let url = Url::parse(&feed.url).map_err(|e| ConfigError::InvalidUrl {
                index,
                reason: e.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidUrl {
                    index,
                    reason: format!("unsupported scheme '{}'", url.scheme()),
                });
            }
        }

        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::InvalidInterval(
                "refresh_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidInterval(
                "fetch_timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.scroll.step_px == 0 {
            return Err(ConfigError::InvalidScroll(
                "step_px must be at least 1".to_string(),
            ));
        }
        if self.scroll.tick_ms == 0 {
            return Err(ConfigError::InvalidScroll(
                "tick_ms must be at least 1".to_string(),
            ));
        }

        if self.display.width_px == 0 || self.display.glyph_width_px == 0 {
            return Err(ConfigError::InvalidDisplay(
                "width_px and glyph_width_px must be non-zero".to_string(),
            ));
        }
        if self.display.glyph_width_px > self.display.width_px {
            return Err(ConfigError::InvalidDisplay(format!(
                "glyph_width_px ({}) exceeds width_px ({})",
                self.display.glyph_width_px, self.display.width_px
            )));
        }
        if i32::try_from(self.display.width_px).is_err() {
            return Err(ConfigError::InvalidDisplay(format!(
                "width_px {} is too large",
                self.display.width_px
            )));
        }

        self.active_hours()?;
        Ok(())
    }

    /// Feed sources in configured order.
    pub fn sources(&self) -> Vec<FeedSource> {
        self.feeds
            .iter()
            .map(|feed| {
                let name = feed
                    .display_name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .or_else(|| {
                        Url::parse(&feed.url)
                            .ok()
                            .and_then(|u| u.host_str().map(str::to_string))
                    })
                    .unwrap_or_else(|| feed.url.clone());
                FeedSource::new(feed.url.clone(), name)
            })
            .collect()
    }

    pub fn scroll_config(&self) -> ScrollConfig {
        let width = i32::try_from(self.display.width_px).unwrap_or(i32::MAX);
        ScrollConfig {
            step_px: self.scroll.step_px,
            lead_in_px: self.scroll.lead_in_px.unwrap_or(-width),
            gap_px: self.scroll.gap_px,
            hold_ticks: self.scroll.hold_ticks,
        }
    }

    pub fn auto_advance(&self) -> AutoAdvance {
        AutoAdvance {
            after_cycles: Some(self.scroll.auto_advance_cycles).filter(|&n| n > 0),
            after: Some(self.scroll.auto_advance_secs)
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
        }
    }

    /// The configured active-hours window; `None` means always on.
    pub fn active_hours(&self) -> Result<Option<ActiveHours>, ConfigError> {
        match (&self.display.active_from, &self.display.active_until) {
            (None, None) => Ok(None),
            (Some(from), Some(until)) => {
                let from = parse_clock("active_from", from)?;
                let until = parse_clock("active_until", until)?;
                if from == until {
                    return Err(ConfigError::InvalidTime(
                        "active_from and active_until must differ".to_string(),
                    ));
                }
                Ok(Some(ActiveHours { from, until }))
            }
            _ => Err(ConfigError::InvalidTime(
                "set both active_from and active_until, or neither".to_string(),
            )),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.scroll.tick_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.input.debounce_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

// ============================================================================
// Tests
// ============================================================================
