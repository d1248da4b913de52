use chrono::{DateTime, Utc};

/// Normalized feed entry used by the watcher (format-agnostic).

#[derive(Debug, Clone, Default)]
pub struct FeedEntry {
    pub id: String,
    pub link: Option<String>,
    pub title: Option<String>,
    /// Summary or body HTML; empty when the feed provides none.
    pub summary: String,
    /// Structured media URLs in document order: media contents first, then
    /// thumbnails.
    pub media: Vec<String>,
    pub published: Option<DateTime<Utc>>,
}

impl FeedEntry {
    /// Stable identity for dedup: prefer the link, fall back to the
    /// feed-supplied id.
    pub fn identity(&self) -> Option<&str> {
        match self.link.as_deref() {
            Some(link) if !link.is_empty() => Some(link),
            _ if !self.id.is_empty() => Some(&self.id),
            _ => None,
        }
    }
}

/// Convert a parsed feed into normalized entries, preserving document order
/// (first entry = newest).
///
/// Pure so that tests can exercise the mapping without hitting the network.
pub fn entries_from_feed(feed: feed_rs::model::Feed) -> Vec<FeedEntry> {
    feed.entries
        .into_iter()
        .map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone());

            let mut media = Vec::new();
            for object in &entry.media {
                for content in &object.content {
                    if let Some(url) = &content.url {
                        media.push(url.to_string());
                    }
                }
            }
            for object in &entry.media {
                for thumbnail in &object.thumbnails {
                    media.push(thumbnail.image.uri.clone());
                }
            }

            FeedEntry {
                id: entry.id,
                link,
                title: entry.title.map(|t| t.content),
                summary: entry.summary.map(|s| s.content).unwrap_or_default(),
                media,
                published: entry.published,
            }
        })
        .collect()
}
