//! Text helpers shared by the feed parser and the display sinks.
//!
//! - **Cleaning**: turn feed-supplied HTML fragments into a single line of
//!   plain text that is safe to put on a panel or a terminal
//! - **Measuring**: Unicode-aware column widths and column windows, the
//!   basis for pixel measurement on fixed-pitch glyph panels
//!
//! # Examples
//!
//! ```
//! use newsticker::util::{clean_feed_text, display_width};
//!
//! assert_eq!(clean_feed_text("<p>Hello\n<b>world</b></p>"), "Hello world");
//! assert_eq!(display_width("Hi 世界"), 7);
//! ```

mod text;

pub use text::{clean_feed_text, column_window, display_width, strip_control_chars, strip_html_tags};
