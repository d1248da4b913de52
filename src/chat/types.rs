use serde::{Deserialize, Serialize};

/// Discord REST v10 wire types.

#[derive(Debug, Deserialize)]
pub struct ChannelResponse {
    /// Discord serializes snowflakes as strings.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct CreateMessageRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<MessageEmbed>,
}

#[derive(Debug, Serialize)]
pub struct MessageEmbed {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

#[derive(Debug, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_message_omits_embeds() {
        let req = CreateMessageRequest {
            content: "hello".to_string(),
            embeds: Vec::new(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["content"], "hello");
        assert!(json.get("embeds").is_none());
    }

    #[test]
    fn test_embed_omits_missing_image() {
        let req = CreateMessageRequest {
            content: "https://example.com/p/1".to_string(),
            embeds: vec![MessageEmbed {
                title: "📸 New post by karina".to_string(),
                description: "caption".to_string(),
                image: None,
            }],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["embeds"][0]["title"], "📸 New post by karina");
        assert!(json["embeds"][0].get("image").is_none());
    }

    #[test]
    fn test_embed_image_shape() {
        let embed = MessageEmbed {
            title: "t".to_string(),
            description: "d".to_string(),
            image: Some(EmbedImage {
                url: "https://cdn.example.com/thumb.jpg".to_string(),
            }),
        };
        let json = serde_json::to_value(&embed).unwrap();
        assert_eq!(json["image"]["url"], "https://cdn.example.com/thumb.jpg");
    }

    #[test]
    fn test_channel_response_parses_string_snowflake() {
        let channel: ChannelResponse =
            serde_json::from_str(r#"{"id": "1232207096821321799", "name": "posts"}"#).unwrap();
        assert_eq!(channel.id, "1232207096821321799");
        assert_eq!(channel.name.as_deref(), Some("posts"));
    }
}
