use crate::feed::parser::parse_feed;
use crate::feed::{Feed, FeedFetcher, FeedSource, FetchError};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::redirect::Policy;
use std::time::Duration;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const MAX_REDIRECTS: usize = 3;

/// Fetches feeds over HTTP(S) and parses them with feed-rs.
///
/// Every fetch is bounded by `timeout` end to end: connect, headers and body.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_articles: usize,
}

impl HttpFetcher {
    /// Builds a fetcher with its own client.
    ///
    /// `max_articles` caps the entries kept per feed (`0` keeps all).
    pub fn new(timeout: Duration, max_articles: usize) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("newsticker/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, timeout, max_articles))
    }

    /// Uses a caller-configured client (proxies, custom TLS roots).
    pub fn with_client(client: reqwest::Client, timeout: Duration, max_articles: usize) -> Self {
        Self {
            client,
            timeout,
            max_articles,
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await.map_err(map_request_error)?;

        if !response.status().is_success() {
            return Err(FetchError::Unreachable(format!(
                "HTTP status {}",
                response.status().as_u16()
            )));
        }

        read_limited_bytes(response, MAX_FEED_SIZE).await
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<Feed, FetchError> {
        let bytes = tokio::time::timeout(self.timeout, self.download(&source.url))
            .await
            .map_err(|_| FetchError::Timeout)??;

        let articles = parse_feed(&bytes, self.max_articles)
            .map_err(|e| FetchError::MalformedDocument(e.to_string()))?;

        if articles.is_empty() {
            return Err(FetchError::Empty);
        }

        tracing::debug!(
            feed = %source.display_name,
            bytes = bytes.len(),
            articles = articles.len(),
            "Fetched feed"
        );
        Ok(Feed::new(source, articles))
    }
}

fn map_request_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Unreachable(err.to_string())
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::MalformedDocument(format!(
                "response of {} bytes exceeds the {} byte limit",
                len, limit
            )));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_request_error)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::MalformedDocument(format!(
                "response exceeds the {} byte limit",
                limit
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    // A body shorter than its Content-Length means the connection dropped.
    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::Unreachable(format!(
                "incomplete response: expected {} bytes, received {}",
                expected,
                bytes.len()
            )));
        }
    }

    Ok(bytes)
}
