use super::types::{ChannelResponse, CreateMessageRequest, CurrentUser, EmbedImage, MessageEmbed};
use super::{ChannelHandle, ChatClient, Embed};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Discord REST client (bot-token auth).
pub struct DiscordRest {
    client: Client,
    token: String,
    base_url: String,
}

impl DiscordRest {
    pub fn new(token: String, base_url: &str, request_timeout_ms: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_timeout_ms))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Call `/users/@me` to check the token before entering the poll loop.
    /// Returns the bot's username; fails if the token is rejected.
    pub async fn validate_token(&self) -> Result<String> {
        let url = format!("{}/users/@me", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .context("failed to reach Discord for token validation")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Discord token validation failed ({}): {}", status, body);
        }

        let user: CurrentUser = resp
            .json()
            .await
            .context("failed to parse current user response")?;
        Ok(user.username)
    }
}

#[async_trait]
impl ChatClient for DiscordRest {
    async fn resolve_channel(&self, channel_id: u64) -> Result<Option<ChannelHandle>> {
        let url = format!("{}/channels/{}", self.base_url, channel_id);
        let resp = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .context("channel lookup request failed")?;

        let status = resp.status();
        // Deleted channel or one the bot cannot see: absent, not an error.
        if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("channel lookup failed ({}): {}", status, body);
        }

        let channel: ChannelResponse = resp
            .json()
            .await
            .context("failed to parse channel response")?;

        Ok(Some(ChannelHandle {
            id: channel.id.parse().unwrap_or(channel_id),
            name: channel.name,
        }))
    }

    async fn send(
        &self,
        channel: &ChannelHandle,
        text: &str,
        embed: Option<&Embed>,
    ) -> Result<()> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel.id);

        let body = CreateMessageRequest {
            content: text.to_string(),
            embeds: embed
                .map(|e| {
                    vec![MessageEmbed {
                        title: e.title.clone(),
                        description: e.description.clone(),
                        image: e.image_url.clone().map(|url| EmbedImage { url }),
                    }]
                })
                .unwrap_or_default(),
        };

        let resp = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await
            .context("message request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("message send failed ({}): {}", status, body);
        }

        Ok(())
    }
}
