use super::types::{entries_from_feed, FeedEntry};
use super::FeedFetch;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("feed-relay/", env!("CARGO_PKG_VERSION"));

/// Fetches feeds over HTTP and parses them with `feed-rs` (RSS and Atom).
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new(request_timeout_ms: u64) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_millis(request_timeout_ms))
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }
}

#[async_trait]
impl FeedFetch for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("feed request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("feed request failed ({}): {}", status, url);
        }

        let body = resp.bytes().await.context("failed to read feed body")?;
        let feed = feed_rs::parser::parse(body.as_ref())
            .with_context(|| format!("failed to parse feed: {}", url))?;

        Ok(entries_from_feed(feed))
    }
}
