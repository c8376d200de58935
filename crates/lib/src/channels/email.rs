//! Email via an HTTP mail relay.
//!
//! The relay takes `{from, to, subject, text}` as JSON and an optional bearer key;
//! SMTP submission is left to the relay.

use crate::channels::http::{ensure_success, settings};
use crate::channels::registry::{ChannelKind, ChannelSender, Payload, SendError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    fn into_vec(self) -> Vec<String> {
        match self {
            Recipients::One(s) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Recipients::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmailSettings {
    #[serde(alias = "url")]
    endpoint: String,
    #[serde(default, alias = "api_key")]
    api_key: Option<String>,
    from: String,
    to: Recipients,
    #[serde(default)]
    subject_prefix: Option<String>,
}

pub struct EmailSender {
    client: reqwest::Client,
}

impl EmailSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, settings_value: &serde_json::Value, payload: Payload<'_>) -> Result<(), SendError> {
        let s: EmailSettings = settings(settings_value)?;
        let to = s.to.into_vec();
        if to.is_empty() {
            return Err(SendError::Settings("email channel has no recipients".to_string()));
        }
        let title = match payload {
            Payload::Structured(msg) => msg.title(),
            Payload::Text(_) => "smsgate notice".to_string(),
        };
        let subject = match s.subject_prefix {
            Some(prefix) if !prefix.trim().is_empty() => format!("{} {}", prefix.trim(), title),
            _ => title,
        };
        let body = json!({
            "from": s.from,
            "to": to,
            "subject": subject,
            "text": payload.text(),
        });
        let mut req = self.client.post(&s.endpoint).json(&body);
        if let Some(key) = s.api_key.as_deref().filter(|k| !k.is_empty()) {
            req = req.bearer_auth(key);
        }
        let res = req.send().await?;
        ensure_success(res).await.map(|_| ())
    }
}
