use crate::chat::{ChatClient, Embed};
use crate::config::{Category, WatchedSource};
use crate::feed::types::FeedEntry;
use crate::feed::FeedFetch;
use std::collections::HashMap;

/// Discord caps embed descriptions at 4096 characters.
const MAX_EMBED_DESCRIPTION: usize = 4096;

/// Counters from one poll cycle, for the cycle-summary log line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleStats {
    pub checked: usize,
    pub dispatched: usize,
    pub unchanged: usize,
    pub empty: usize,
    pub failed: usize,
}

/// Owns the poll cycle and the last-seen cache.
///
/// Sources are processed strictly sequentially in registration order; all
/// per-source failures are logged and isolated to that source.
pub struct FeedWatcher {
    sources: Vec<WatchedSource>,
    last_seen: HashMap<String, String>,
}

impl FeedWatcher {
    pub fn new(sources: Vec<WatchedSource>) -> Self {
        Self {
            sources,
            last_seen: HashMap::new(),
        }
    }

    /// Last dispatched entry identity for a source, if any.
    pub fn last_seen(&self, key: &str) -> Option<&str> {
        self.last_seen.get(key).map(String::as_str)
    }

    /// Run one full pass over all configured sources.
    pub async fn run_cycle(&mut self, feed: &dyn FeedFetch, chat: &dyn ChatClient) -> CycleStats {
        let mut stats = CycleStats::default();
        let Self { sources, last_seen } = self;

        for source in sources.iter() {
            stats.checked += 1;

            let entries = match feed.fetch(&source.url).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(source = %source.key, error = %e, "feed fetch failed");
                    stats.failed += 1;
                    continue;
                }
            };

            let Some(newest) = entries.first() else {
                tracing::debug!(source = %source.key, "feed returned no entries");
                stats.empty += 1;
                continue;
            };

            let Some(identity) = newest.identity() else {
                tracing::warn!(source = %source.key, "newest entry has no link or id");
                stats.failed += 1;
                continue;
            };

            if last_seen.get(&source.key).is_some_and(|seen| seen == identity) {
                tracing::debug!(source = %source.key, "no new entry");
                stats.unchanged += 1;
                continue;
            }

            let channel = match chat.resolve_channel(source.channel_id).await {
                Ok(Some(channel)) => channel,
                Ok(None) => {
                    // Cache deliberately NOT advanced: the entry stays
                    // eligible and is retried once the channel resolves.
                    tracing::warn!(
                        source = %source.key,
                        channel_id = source.channel_id,
                        "destination channel not found, will retry next cycle"
                    );
                    stats.failed += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        source = %source.key,
                        error = %e,
                        "channel lookup failed, will retry next cycle"
                    );
                    stats.failed += 1;
                    continue;
                }
            };

            // Destination is live: record the entry as seen before the send
            // so a send failure cannot double-post on the next cycle.
            last_seen.insert(source.key.clone(), identity.to_string());

            let message = render_notification(source, newest);
            match chat
                .send(&channel, &message.text, message.embed.as_ref())
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        source = %source.key,
                        channel_id = channel.id,
                        entry = %identity,
                        "dispatched new entry"
                    );
                    stats.dispatched += 1;
                }
                Err(e) => {
                    tracing::warn!(source = %source.key, error = %e, "message send failed");
                    stats.failed += 1;
                }
            }
        }

        stats
    }
}

/// A formatted outbound notification: plain text plus an optional embed.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub text: String,
    pub embed: Option<Embed>,
}

/// Format one new entry for its source's category.
pub fn render_notification(source: &WatchedSource, entry: &FeedEntry) -> Notification {
    let link = entry.identity().unwrap_or_default();
    let title = entry
        .title
        .clone()
        .unwrap_or_else(|| format!("New post on {}", source.key));

    match source.category {
        Category::ImagePost => {
            let thumbnail = entry
                .media
                .iter()
                .find(|url| !url.is_empty())
                .cloned()
                .or_else(|| extract_img_src(&entry.summary).map(str::to_string));

            Notification {
                text: link.to_string(),
                embed: Some(Embed {
                    title: format!("📸 New post by {}", source.name),
                    description: truncate_utf8(&entry.summary, MAX_EMBED_DESCRIPTION)
                        .to_string(),
                    image_url: thumbnail,
                }),
            }
        }
        Category::MentionPost => {
            let mention = source
                .role_id
                .map(|id| format!("<@&{}> ", id))
                .unwrap_or_default();

            Notification {
                text: format!(
                    "🐦 {}New post by @{}:\n**{}**\n{}",
                    mention, source.name, title, link
                ),
                embed: None,
            }
        }
        Category::Broadcast => Notification {
            text: format!("{} New post:\n**{}**\n{}", source.icon, title, link),
            embed: None,
        },
    }
}

/// First `<img src="...">` reference in an HTML fragment.
///
/// The search is bounded to each `<img` tag, so a `src` attribute on a later
/// element is never picked up.
pub fn extract_img_src(html: &str) -> Option<&str> {
    let mut offset = 0;
    while let Some(start) = html[offset..].find("<img") {
        let tag_start = offset + start;
        let tag = &html[tag_start..];
        let tag_body = &tag[..tag.find('>').unwrap_or(tag.len())];

        if let Some(pos) = tag_body.find("src=\"") {
            let value = &tag_body[pos + 5..];
            if let Some(close) = value.find('"') {
                if close > 0 {
                    return Some(&value[..close]);
                }
            }
        }

        offset = tag_start + 4;
    }
    None
}

/// Truncate to at most `max` bytes without splitting a character.
fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_source() -> WatchedSource {
        WatchedSource {
            key: "Instagram_karina".to_string(),
            url: "https://example.com/feed.xml".to_string(),
            name: "karina".to_string(),
            category: Category::ImagePost,
            channel_id: 1,
            role_id: None,
            icon: "📢".to_string(),
        }
    }

    fn mention_source(role_id: Option<u64>) -> WatchedSource {
        WatchedSource {
            key: "Twitter_rina".to_string(),
            url: "https://example.com/feed.xml".to_string(),
            name: "rina".to_string(),
            category: Category::MentionPost,
            channel_id: 1,
            role_id,
            icon: "📢".to_string(),
        }
    }

    fn entry(link: &str, title: &str, summary: &str) -> FeedEntry {
        FeedEntry {
            id: "entry-id".to_string(),
            link: Some(link.to_string()),
            title: Some(title.to_string()),
            summary: summary.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_img_src_basic() {
        let html = r#"<p>hi</p><img alt="x" src="https://cdn.example.com/a.jpg">rest"#;
        assert_eq!(extract_img_src(html), Some("https://cdn.example.com/a.jpg"));
    }

    #[test]
    fn test_extract_img_src_none_without_img() {
        assert_eq!(extract_img_src("plain text, no markup"), None);
        assert_eq!(extract_img_src(""), None);
    }

    #[test]
    fn test_extract_img_src_ignores_src_outside_img() {
        let html = r#"<iframe src="https://example.com/embed"></iframe>no image"#;
        assert_eq!(extract_img_src(html), None);
    }

    #[test]
    fn test_extract_img_src_skips_srcless_img() {
        let html = r#"<img alt="no src"><img src="https://cdn.example.com/b.jpg">"#;
        assert_eq!(extract_img_src(html), Some("https://cdn.example.com/b.jpg"));
    }

    #[test]
    fn test_extract_img_src_rejects_empty_value() {
        assert_eq!(extract_img_src(r#"<img src="">"#), None);
    }

    #[test]
    fn test_image_post_prefers_structured_media() {
        let mut e = entry("https://example.com/p/1", "post", r#"<img src="from-summary.jpg">"#);
        e.media = vec!["https://cdn.example.com/structured.jpg".to_string()];

        let n = render_notification(&image_source(), &e);
        let embed = n.embed.unwrap();
        assert_eq!(
            embed.image_url.as_deref(),
            Some("https://cdn.example.com/structured.jpg")
        );
        assert_eq!(n.text, "https://example.com/p/1");
    }

    #[test]
    fn test_image_post_falls_back_to_summary_scan() {
        let e = entry(
            "https://example.com/p/1",
            "post",
            r#"caption <img src="https://cdn.example.com/t.jpg"> more"#,
        );
        let n = render_notification(&image_source(), &e);
        let embed = n.embed.unwrap();
        assert_eq!(embed.title, "📸 New post by karina");
        assert_eq!(embed.image_url.as_deref(), Some("https://cdn.example.com/t.jpg"));
    }

    #[test]
    fn test_image_post_without_any_image() {
        let e = entry("https://example.com/p/2", "post", "no image here");
        let n = render_notification(&image_source(), &e);
        assert_eq!(n.embed.unwrap().image_url, None);
    }

    #[test]
    fn test_mention_post_with_role() {
        let e = entry("https://example.com/t/1", "hello world", "");
        let n = render_notification(&mention_source(Some(999)), &e);
        assert!(n.text.contains("<@&999>"));
        assert!(n.text.contains("New post by @rina"));
        assert!(n.text.contains("**hello world**"));
        assert!(n.text.ends_with("https://example.com/t/1"));
        assert!(n.embed.is_none());
    }

    #[test]
    fn test_mention_post_without_role_has_no_token() {
        let e = entry("https://example.com/t/1", "hello", "");
        let n = render_notification(&mention_source(None), &e);
        assert!(!n.text.contains("<@&"));
        assert!(!n.text.contains("None"));
        // No leftover double space where the mention would have been.
        assert!(n.text.starts_with("🐦 New post by @rina"));
    }

    #[test]
    fn test_broadcast_uses_configured_icon() {
        let source = WatchedSource {
            key: "TikTok".to_string(),
            url: "https://example.com/feed.xml".to_string(),
            name: "TikTok".to_string(),
            category: Category::Broadcast,
            channel_id: 1,
            role_id: None,
            icon: "🎵".to_string(),
        };
        let e = entry("https://example.com/v/1", "clip", "ignored body");
        let n = render_notification(&source, &e);
        assert_eq!(n.text, "🎵 New post:\n**clip**\nhttps://example.com/v/1");
    }

    #[test]
    fn test_missing_title_falls_back_to_source_key() {
        let source = WatchedSource {
            key: "YouTube".to_string(),
            url: "https://example.com/feed.xml".to_string(),
            name: "YouTube".to_string(),
            category: Category::Broadcast,
            channel_id: 1,
            role_id: None,
            icon: "📢".to_string(),
        };
        let e = FeedEntry {
            id: "vid-1".to_string(),
            ..Default::default()
        };
        let n = render_notification(&source, &e);
        assert!(n.text.contains("New post on YouTube"));
    }

    #[test]
    fn test_truncate_utf8_respects_char_boundaries() {
        assert_eq!(truncate_utf8("abcdef", 4), "abcd");
        assert_eq!(truncate_utf8("ab", 4), "ab");
        // 📸 is 4 bytes; cutting at 5 must not split the second one.
        assert_eq!(truncate_utf8("📸📸", 5), "📸");
    }
}
