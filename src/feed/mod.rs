//! Feed model and the fetcher seam.
//!
//! The engine never talks HTTP itself: it drives a [`FeedFetcher`] from the
//! refresh tasks and stores whatever comes back. This module defines that
//! contract plus the production implementation:
//!
//! - [`parser`] - feed-rs based parsing into [`Article`]s
//! - [`fetcher`] - [`HttpFetcher`], reqwest with a bounded timeout and size cap
//!
//! # Example
//!
//! ```ignore
//! use newsticker::feed::{FeedFetcher, FeedSource, HttpFetcher};
//!
//! let fetcher = HttpFetcher::new(Duration::from_secs(30), 10)?;
//! let feed = fetcher.fetch(&source).await?;
//! ```

mod fetcher;
mod parser;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

pub use fetcher::HttpFetcher;
pub use parser::parse_feed;

/// Placed between an article's title and body in the scroll text.
const TITLE_BODY_SEPARATOR: &str = "  |  ";

/// One configured news source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedSource {
    pub url: String,
    pub display_name: String,
}

impl FeedSource {
    pub fn new(url: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            display_name: display_name.into(),
        }
    }
}

/// One news item. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub body: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl Article {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            published_at: None,
        }
    }

    /// The single line that scrolls across the panel: title, then body.
    pub fn scroll_text(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{}{}{}", self.title, TITLE_BODY_SEPARATOR, self.body)
        }
    }
}

/// A source together with its most recently fetched articles.
///
/// An empty article list is a valid result ("fetched, nothing published"),
/// distinct from a feed that was never fetched or failed to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub url: String,
    pub display_name: String,
    pub articles: Vec<Article>,
}

impl Feed {
    pub fn new(source: &FeedSource, articles: Vec<Article>) -> Self {
        Self {
            url: source.url.clone(),
            display_name: source.display_name.clone(),
            articles,
        }
    }

    /// A successful fetch that yielded no entries.
    pub fn empty(source: &FeedSource) -> Self {
        Self::new(source, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

/// Why a single fetch did not produce a feed.
///
/// Every variant is transient: the refresh task logs it and tries again on
/// its next interval.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The fetch did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,
    /// DNS, connect, TLS or HTTP-status failure
    #[error("feed unreachable: {0}")]
    Unreachable(String),
    /// The response was not a parseable RSS/Atom document
    #[error("malformed feed document: {0}")]
    MalformedDocument(String),
    /// The document parsed but carried no entries
    #[error("feed contained no entries")]
    Empty,
}

/// Retrieves and parses one feed.
///
/// Implementations must bound their own running time, since a fetch that
/// never returns stalls that feed's refreshes. They must not touch shared
/// state; storing the result is the caller's job.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> Result<Feed, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_text_joins_title_and_body() {
        let article = Article::new("Title", "Body text");
        assert_eq!(article.scroll_text(), "Title  |  Body text");
    }

    #[test]
    fn test_scroll_text_title_only() {
        assert_eq!(Article::new("Only", "").scroll_text(), "Only");
    }

    #[test]
    fn test_empty_feed_keeps_source_identity() {
        let source = FeedSource::new("https://example.com/rss", "Example");
        let feed = Feed::empty(&source);
        assert!(feed.is_empty());
        assert_eq!(feed.display_name, "Example");
        assert_eq!(feed.url, "https://example.com/rss");
    }
}
