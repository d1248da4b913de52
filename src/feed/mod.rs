pub mod http;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use types::FeedEntry;

/// Fetches and parses one feed URL into ordered entries, newest first.
#[async_trait]
pub trait FeedFetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>>;
}
