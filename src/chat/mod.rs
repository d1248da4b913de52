pub mod discord;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;

/// A destination channel that resolved to a live handle.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    pub id: u64,
    pub name: Option<String>,
}

/// Rich attachment for image-post notifications.
#[derive(Debug, Clone, PartialEq)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Look up a destination channel. `Ok(None)` means the channel does not
    /// exist or is not visible to the bot.
    async fn resolve_channel(&self, channel_id: u64) -> Result<Option<ChannelHandle>>;

    /// Send a message to a resolved channel, optionally with an embed.
    async fn send(&self, channel: &ChannelHandle, text: &str, embed: Option<&Embed>)
        -> Result<()>;
}
