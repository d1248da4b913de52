use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use feed_relay::chat::discord::DiscordRest;
use feed_relay::config::Config;
use feed_relay::feed::http::HttpFeedFetcher;
use feed_relay::health;
use feed_relay::watcher::FeedWatcher;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feed_relay=info".into()),
        )
        .init();

    // Load saved token from .env (real env vars take precedence)
    Config::load_env_file();

    let config = Config::load(Path::new("config.toml"))?;
    let sources = config.resolve_sources()?;
    if sources.is_empty() {
        tracing::warn!("no sources configured, nothing to relay");
    }

    let token = match Config::discord_token() {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "cannot start without a Discord token");
            return Err(e);
        }
    };

    let chat = DiscordRest::new(
        token,
        &config.discord.api_base,
        config.discord.request_timeout_ms,
    );
    let bot_user = chat
        .validate_token()
        .await
        .context("Discord token rejected")?;
    tracing::info!(user = %bot_user, "logged in");

    if let Some(health_config) = &config.health {
        let addr: SocketAddr = health_config
            .bind_addr
            .parse()
            .with_context(|| format!("invalid health bind_addr: {}", health_config.bind_addr))?;
        tokio::spawn(async move {
            if let Err(e) = health::serve(addr).await {
                tracing::error!(error = %e, "health endpoint failed");
            }
        });
    }

    let fetcher = HttpFeedFetcher::new(config.feeds.request_timeout_ms);
    let source_count = sources.len();
    let mut watcher = FeedWatcher::new(sources);

    let mut interval =
        tokio::time::interval(Duration::from_secs(config.poll_interval_minutes * 60));
    // Cycles run inline on this task; a cycle that outlasts the interval
    // delays the next tick instead of stacking a second cycle behind it.
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tracing::info!(
        sources = source_count,
        interval_minutes = config.poll_interval_minutes,
        "starting poll loop"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let stats = watcher.run_cycle(&fetcher, &chat).await;
                tracing::info!(
                    checked = stats.checked,
                    dispatched = stats.dispatched,
                    unchanged = stats.unchanged,
                    empty = stats.empty,
                    failed = stats.failed,
                    "cycle complete"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received, stopping poll loop");
                break;
            }
        }
    }

    Ok(())
}
