use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

const ENV_FILE: &str = ".env";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub poll_interval_minutes: u64,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub feeds: FeedsConfig,
    pub health: Option<HealthConfig>,
    /// Named destination groups shared by several sources.
    #[serde(default)]
    pub channels: HashMap<String, u64>,
    /// Role-mention table: source key -> role id.
    #[serde(default)]
    pub roles: HashMap<String, u64>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DiscordConfig {
    pub api_base: String,
    pub request_timeout_ms: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_base: "https://discord.com/api/v10".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedsConfig {
    /// Per-fetch timeout so one slow feed cannot stall the whole cycle.
    pub request_timeout_ms: u64,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    pub bind_addr: String,
}

/// How entries from a source are formatted on dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Rich embed with the post image attached.
    ImagePost,
    /// Plain text prefixed with a role mention.
    MentionPost,
    /// Plain text with a per-source icon.
    Broadcast,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub key: String,
    pub url: String,
    pub category: Category,
    /// Direct destination channel id. Mutually exclusive with `channel`.
    pub channel_id: Option<u64>,
    /// Named group from `[channels]`. Mutually exclusive with `channel_id`.
    pub channel: Option<String>,
    /// Display name; defaults to the part of `key` after the first `_`.
    pub name: Option<String>,
    /// Overrides the `[roles]` table entry for this source.
    pub role_id: Option<u64>,
    /// Broadcast icon; defaults to 📢.
    pub icon: Option<String>,
}

/// A fully resolved source: destination, display name, and role looked up
/// once at load time. Never mutated after startup.
#[derive(Debug, Clone)]
pub struct WatchedSource {
    pub key: String,
    pub url: String,
    pub name: String,
    pub category: Category,
    pub channel_id: u64,
    pub role_id: Option<u64>,
    pub icon: String,
}

const DEFAULT_BROADCAST_ICON: &str = "📢";

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config TOML")?;
        if config.poll_interval_minutes == 0 {
            anyhow::bail!("poll_interval_minutes must be >= 1");
        }
        Ok(config)
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let path = Path::new(ENV_FILE);
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return,
        };
        // Strip BOM if present (common on Windows-created files)
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        for line in content.lines() {
            let line = line.trim().trim_matches('\r');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"').trim_matches('\'');
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
        }
    }

    /// The bot token comes from the environment (or .env). A missing token is
    /// fatal for the whole process.
    pub fn discord_token() -> Result<String> {
        match std::env::var("DISCORD_TOKEN") {
            Ok(token) if !token.is_empty() => Ok(sanitize_token(&token)),
            _ => anyhow::bail!("DISCORD_TOKEN is not set in the environment"),
        }
    }

    /// Validate and flatten `[[sources]]` into the watcher's static source
    /// list, preserving registration order.
    pub fn resolve_sources(&self) -> Result<Vec<WatchedSource>> {
        let mut seen_keys: HashSet<&str> = HashSet::new();
        let mut resolved = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            if !seen_keys.insert(source.key.as_str()) {
                anyhow::bail!("duplicate source key: {}", source.key);
            }

            let channel_id = match (source.channel_id, source.channel.as_deref()) {
                (Some(id), None) => id,
                (None, Some(group)) => *self.channels.get(group).with_context(|| {
                    format!(
                        "source '{}' references unknown channel group '{}'",
                        source.key, group
                    )
                })?,
                (Some(_), Some(_)) => {
                    anyhow::bail!("source '{}' sets both channel_id and channel", source.key)
                }
                (None, None) => anyhow::bail!(
                    "source '{}' has no destination (set channel_id or channel)",
                    source.key
                ),
            };

            let role_id = source
                .role_id
                .or_else(|| self.roles.get(&source.key).copied());

            let name = source
                .name
                .clone()
                .unwrap_or_else(|| default_display_name(&source.key).to_string());

            resolved.push(WatchedSource {
                key: source.key.clone(),
                url: source.url.clone(),
                name,
                category: source.category,
                channel_id,
                role_id,
                icon: source
                    .icon
                    .clone()
                    .unwrap_or_else(|| DEFAULT_BROADCAST_ICON.to_string()),
            });
        }

        Ok(resolved)
    }
}

/// Display name from a source key: "Instagram_karina" -> "karina",
/// "YouTube" -> "YouTube".
fn default_display_name(key: &str) -> &str {
    key.split_once('_').map_or(key, |(_, rest)| rest)
}

/// Strip carriage returns, BOM, and other invisible chars from a token value.
fn sanitize_token(raw: &str) -> String {
    raw.replace(['\r', '\u{feff}', '\u{200b}'], "")
        .trim()
        .to_string()
}
