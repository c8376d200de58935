//! WeCom (WeChat Work) group robot.

use crate::channels::http::{check_bot_reply, post_json, settings};
use crate::channels::registry::{ChannelKind, ChannelSender, Payload, SendError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct WeComSettings {
    #[serde(alias = "webhookUrl", alias = "webhook_url", alias = "url")]
    webhook: String,
}

pub struct WeComSender {
    client: reqwest::Client,
}

impl WeComSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for WeComSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::WeCom
    }

    async fn send(&self, settings_value: &serde_json::Value, payload: Payload<'_>) -> Result<(), SendError> {
        let s: WeComSettings = settings(settings_value)?;
        let body = json!({
            "msgtype": "text",
            "text": { "content": payload.text() },
        });
        let reply = post_json(&self.client, &s.webhook, &body).await?;
        check_bot_reply(&reply, "errcode", "errmsg")
    }
}
