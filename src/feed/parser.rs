use crate::feed::Article;
use crate::util::clean_feed_text;
use feed_rs::parser::{self, ParseFeedError};

const UNTITLED: &str = "Untitled";

/// Parses RSS/Atom bytes into articles, newest-first as published.
///
/// Keeps at most `max_articles` entries (`0` keeps everything). The body is
/// the entry summary, falling back to the content body; both are reduced to
/// a single line of plain text.
pub fn parse_feed(bytes: &[u8], max_articles: usize) -> Result<Vec<Article>, ParseFeedError> {
    let feed = parser::parse(bytes)?;
    let limit = if max_articles == 0 {
        usize::MAX
    } else {
        max_articles
    };

    let articles = feed
        .entries
        .into_iter()
        .take(limit)
        .map(|entry| {
            let title = entry
                .title
                .map(|t| clean_feed_text(&t.content))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNTITLED.to_string());
            let body = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .map(|raw| clean_feed_text(&raw))
                .unwrap_or_default();

            Article {
                title,
                body,
                published_at: entry.published.or(entry.updated),
            }
        })
        .collect();

    Ok(articles)
}
