//! Display boundary: frames, the sink trait and scoped ownership.
//!
//! The engine hands [`Frame`]s to a [`DisplaySink`] and asks it for text
//! measurements; it never touches pixels. The physical display is owned by
//! a [`DisplayGuard`] which releases it exactly once, on the explicit
//! shutdown path or on drop, whichever comes first.
//!
//! Sinks:
//! - [`TerminalSink`] - ratatui preview of the panel in a terminal
//! - [`LogSink`] - headless, frames become tracing events

mod log;
mod terminal;

use crate::util::{column_window, display_width};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

pub use log::LogSink;
pub use terminal::TerminalSink;

/// One render request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Draw `text` shifted left by `offset_px`, under a `header` line.
    Scroll {
        header: String,
        text: Arc<str>,
        offset_px: i32,
    },
    /// Draw a static status message.
    Status(String),
    /// Blank the panel.
    Blank,
}

#[derive(Debug, Error)]
pub enum RenderSinkError {
    #[error("display I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("display already released")]
    Released,
}

/// Text measurement, the only thing the scroll arithmetic needs from a display.
pub trait TextMeasure {
    fn measure_text_width(&self, text: &str) -> u32;
}

/// A physical (or emulated) display.
pub trait DisplaySink: TextMeasure + Send {
    fn draw(&mut self, frame: &Frame) -> Result<(), RenderSinkError>;

    /// Gives the hardware back. Must be idempotent.
    fn release(&mut self);
}

/// Fixed-pitch panel geometry shared by the bundled sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelGeometry {
    pub width_px: u32,
    pub glyph_width_px: u32,
}

impl PanelGeometry {
    pub fn columns(&self) -> usize {
        (self.width_px / self.glyph_width_px.max(1)) as usize
    }

    pub fn text_width(&self, text: &str) -> u32 {
        u32::try_from(display_width(text))
            .unwrap_or(u32::MAX)
            .saturating_mul(self.glyph_width_px)
    }

    /// The glyphs visible at `offset_px`, as a row of `columns()` cells.
    ///
    /// Offsets are quantised to whole glyph cells.
    pub fn visible_window(&self, text: &str, offset_px: i32) -> String {
        let glyph = i64::from(self.glyph_width_px.max(1));
        let offset_cols = i64::from(offset_px).div_euclid(glyph);
        column_window(text, offset_cols, self.columns())
    }
}

fn lock_sink(sink: &Mutex<Box<dyn DisplaySink>>) -> MutexGuard<'_, Box<dyn DisplaySink>> {
    sink.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    sink: Mutex<Box<dyn DisplaySink>>,
    released: AtomicBool,
}

/// Scoped ownership of the display.
///
/// Created once at startup; handles given to the render loop stop drawing
/// after release.
pub struct DisplayGuard {
    shared: Arc<Shared>,
}

impl DisplayGuard {
    pub fn acquire(sink: Box<dyn DisplaySink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                sink: Mutex::new(sink),
                released: AtomicBool::new(false),
            }),
        }
    }

    pub fn handle(&self) -> DisplayHandle {
        DisplayHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Releases the display. Returns `true` only for the call that actually
    /// released it.
    pub fn release(&self) -> bool {
        if self.shared.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        lock_sink(&self.shared.sink).release();
        tracing::info!("Display released");
        true
    }

    pub fn is_released(&self) -> bool {
        self.shared.released.load(Ordering::SeqCst)
    }
}

impl Drop for DisplayGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Drawing access for the render loop.
#[derive(Clone)]
pub struct DisplayHandle {
    shared: Arc<Shared>,
}

impl DisplayHandle {
    pub fn draw(&self, frame: &Frame) -> Result<(), RenderSinkError> {
        let mut sink = lock_sink(&self.shared.sink);
        // Checked under the lock so a draw never races a release.
        if self.shared.released.load(Ordering::SeqCst) {
            return Err(RenderSinkError::Released);
        }
        sink.draw(frame)
    }
}

impl TextMeasure for DisplayHandle {
    fn measure_text_width(&self, text: &str) -> u32 {
        lock_sink(&self.shared.sink).measure_text_width(text)
    }
}
