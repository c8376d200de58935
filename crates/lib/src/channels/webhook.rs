//! Generic webhook: the structured notification as a JSON body.

use crate::channels::http::{ensure_success, settings};
use crate::channels::message::NotificationMessage;
use crate::channels::registry::{ChannelKind, ChannelSender, Payload, SendError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct WebhookSettings {
    url: String,
    /// POST (default) or PUT.
    #[serde(default)]
    method: Option<String>,
    /// Extra request headers, e.g. an Authorization header expected by the receiver.
    #[serde(default)]
    headers: HashMap<String, String>,
}

pub struct WebhookSender {
    client: reqwest::Client,
}

impl WebhookSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for WebhookSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn send(&self, settings_value: &serde_json::Value, payload: Payload<'_>) -> Result<(), SendError> {
        let s: WebhookSettings = settings(settings_value)?;
        let body = match payload {
            Payload::Structured(msg) => msg.clone(),
            Payload::Text(text) => NotificationMessage::system(text),
        };
        let mut req = match s.method.as_deref().map(str::to_ascii_uppercase).as_deref() {
            None | Some("POST") => self.client.post(&s.url),
            Some("PUT") => self.client.put(&s.url),
            Some(other) => {
                return Err(SendError::Settings(format!("unsupported webhook method: {}", other)))
            }
        };
        for (name, value) in &s.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        let res = req.json(&body).send().await?;
        ensure_success(res).await.map(|_| ())
    }
}
