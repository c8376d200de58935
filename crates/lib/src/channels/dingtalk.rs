//! DingTalk custom robot: text message to the robot webhook.

use crate::channels::http::{check_bot_reply, post_json, settings};
use crate::channels::registry::{ChannelKind, ChannelSender, Payload, SendError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct DingTalkSettings {
    #[serde(alias = "webhookUrl", alias = "webhook_url", alias = "url")]
    webhook: String,
}

pub struct DingTalkSender {
    client: reqwest::Client,
}

impl DingTalkSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for DingTalkSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::DingTalk
    }

    async fn send(&self, settings_value: &serde_json::Value, payload: Payload<'_>) -> Result<(), SendError> {
        let s: DingTalkSettings = settings(settings_value)?;
        let body = json!({
            "msgtype": "text",
            "text": { "content": payload.text() },
        });
        let reply = post_json(&self.client, &s.webhook, &body).await?;
        check_bot_reply(&reply, "errcode", "errmsg")
    }
}
