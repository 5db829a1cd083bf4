//! Horizontal scroll animation for the current article.
//!
//! [`ScrollState`] is pure arithmetic over pixel offsets: it never renders
//! anything and only needs the text width, which the renderer obtains from
//! the display as a measurement. [`ScrollRenderer`] turns the engine's
//! [`Screen`] into a [`Frame`] once per tick, restarting the cycle whenever
//! the article changes.

use crate::display::{Frame, TextMeasure};
use std::sync::Arc;
use std::time::Duration;

/// Scroll timing, in pixels and ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollConfig {
    /// Pixels advanced per tick.
    pub step_px: u32,
    /// Offset a cycle starts from. Negative values start the text to the
    /// right of the left edge so it slides in; `-width` enters from the
    /// right edge.
    pub lead_in_px: i32,
    /// Blank pixels after the text before the next cycle begins.
    pub gap_px: u32,
    /// Ticks to hold at the lead-in before advancing.
    pub hold_ticks: u32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            step_px: 2,
            lead_in_px: -128,
            gap_px: 32,
            hold_ticks: 0,
        }
    }
}

/// Scroll position for one piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollState {
    text: Arc<str>,
    offset_px: i32,
    cycle_length_px: i32,
    held_ticks: u32,
    cycles_completed: u32,
    config: ScrollConfig,
}

impl ScrollState {
    pub fn new(text: Arc<str>, text_width_px: u32, config: ScrollConfig) -> Self {
        let cycle = i64::from(text_width_px) + i64::from(config.gap_px);
        Self {
            text,
            offset_px: config.lead_in_px,
            cycle_length_px: i32::try_from(cycle).unwrap_or(i32::MAX),
            held_ticks: 0,
            cycles_completed: 0,
            config,
        }
    }

    pub fn text(&self) -> &Arc<str> {
        &self.text
    }

    pub fn offset_px(&self) -> i32 {
        self.offset_px
    }

    /// Text width plus the inter-cycle gap.
    pub fn cycle_length_px(&self) -> i32 {
        self.cycle_length_px
    }

    /// Back to the lead-in, hold counter included.
    pub fn reset(&mut self) {
        self.offset_px = self.config.lead_in_px;
        self.held_ticks = 0;
    }

    /// Advances one tick and returns the new offset.
    ///
    /// The offset never decreases within a cycle. When the next step would
    /// reach the cycle length the offset wraps to the lead-in instead.
    pub fn advance(&mut self) -> i32 {
        if self.held_ticks < self.config.hold_ticks {
            self.held_ticks += 1;
            return self.offset_px;
        }
        let step = i32::try_from(self.config.step_px).unwrap_or(i32::MAX);
        let next = self.offset_px.saturating_add(step);
        if next >= self.cycle_length_px {
            self.reset();
            self.cycles_completed = self.cycles_completed.saturating_add(1);
        } else {
            self.offset_px = next;
        }
        self.offset_px
    }

    /// How many times the text has scrolled fully past and wrapped.
    pub fn cycles_completed(&self) -> u32 {
        self.cycles_completed
    }

    /// Number of [`advance`](Self::advance) calls that bring a freshly reset
    /// state back to the lead-in.
    pub fn ticks_per_cycle(&self) -> u64 {
        let span = i64::from(self.cycle_length_px) - i64::from(self.config.lead_in_px);
        let step = i64::from(self.config.step_px.max(1));
        let moving = if span <= 0 { 1 } else { (span + step - 1) / step };
        u64::from(self.config.hold_ticks) + moving as u64
    }
}

/// When to move on to the next article without a button press.
///
/// Both limits are optional and either one firing advances. With neither
/// set, the current article loops until a button is pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoAdvance {
    /// Advance after this many full scroll cycles.
    pub after_cycles: Option<u32>,
    /// Advance after the article has been on screen this long.
    pub after: Option<Duration>,
}

impl AutoAdvance {
    pub fn is_enabled(&self) -> bool {
        self.after_cycles.is_some() || self.after.is_some()
    }

    /// Whether an article that has completed `cycles` scroll cycles and
    /// been shown for `shown_for` is due to be replaced.
    pub fn is_due(&self, cycles: u32, shown_for: Duration) -> bool {
        self.after_cycles.is_some_and(|n| cycles >= n)
            || self.after.is_some_and(|limit| shown_for >= limit)
    }
}

/// What the engine wants on screen, computed under the engine lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Article {
        header: String,
        text: Arc<str>,
        generation: u64,
    },
    Status(String),
    /// Outside the configured active hours.
    Off,
}

/// Produces one frame per tick from the current [`Screen`].
#[derive(Debug)]
pub struct ScrollRenderer {
    config: ScrollConfig,
    current: Option<(u64, ScrollState)>,
}

impl ScrollRenderer {
    pub fn new(config: ScrollConfig) -> Self {
        Self {
            config,
            current: None,
        }
    }

    /// Completed cycles of the article being scrolled, 0 if none.
    pub fn cycles_completed(&self) -> u32 {
        self.current.as_ref().map_or(0, |(_, s)| s.cycles_completed())
    }

    /// Offset of the running cycle, if an article is being scrolled.
    pub fn offset_px(&self) -> Option<i32> {
        self.current.as_ref().map(|(_, s)| s.offset_px())
    }

    /// Builds the frame for `screen`.
    ///
    /// A new view generation or new text restarts the cycle at the lead-in.
    /// The offset advances only when `advance` is set, so redraws triggered
    /// by button presses do not speed the animation up.
    pub fn frame(&mut self, screen: &Screen, measure: &dyn TextMeasure, advance: bool) -> Frame {
        match screen {
            Screen::Article {
                header,
                text,
                generation,
            } => {
                let stale = match &self.current {
                    Some((seen, state)) => *seen != *generation || state.text() != text,
                    None => true,
                };
                if stale {
                    let width = measure.measure_text_width(text);
                    self.current = Some((
                        *generation,
                        ScrollState::new(Arc::clone(text), width, self.config),
                    ));
                }
                let Some((_, state)) = self.current.as_mut() else {
                    return Frame::Blank;
                };
                let frame = Frame::Scroll {
                    header: header.clone(),
                    text: Arc::clone(state.text()),
                    offset_px: state.offset_px(),
                };
                if advance {
                    state.advance();
                }
                frame
            }
            Screen::Status(message) => {
                self.current = None;
                Frame::Status(message.clone())
            }
            Screen::Off => {
                self.current = None;
                Frame::Blank
            }
        }
    }
}
