//! Feishu / Lark custom bot.

use crate::channels::http::{check_bot_reply, post_json, settings};
use crate::channels::registry::{ChannelKind, ChannelSender, Payload, SendError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct FeishuSettings {
    #[serde(alias = "webhookUrl", alias = "webhook_url", alias = "url")]
    webhook: String,
}

pub struct FeishuSender {
    client: reqwest::Client,
}

impl FeishuSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for FeishuSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Feishu
    }

    async fn send(&self, settings_value: &serde_json::Value, payload: Payload<'_>) -> Result<(), SendError> {
        let s: FeishuSettings = settings(settings_value)?;
        let body = json!({
            "msg_type": "text",
            "content": { "text": payload.text() },
        });
        let reply = post_json(&self.client, &s.webhook, &body).await?;
        // Feishu reports failures as {"code": <non-zero>, "msg": ...}.
        check_bot_reply(&reply, "code", "msg")
    }
}
