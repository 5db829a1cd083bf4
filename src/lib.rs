//! newsticker: scrolls news headlines across a small monochrome panel.
//!
//! The library holds the engine; `main.rs` only parses arguments, loads the
//! config and picks a display.

pub mod config;
pub mod display;
pub mod engine;
pub mod feed;
pub mod input;
pub mod keybindings;
pub mod navigation;
pub mod scheduler;
pub mod scroll;
pub mod shutdown;
pub mod store;
pub mod util;
