//! Channel sender trait and the registry that maps channel kinds to senders.

use crate::channels::message::NotificationMessage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// The channel kinds the fan-out knows how to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    DingTalk,
    WeCom,
    Feishu,
    Webhook,
    Email,
}

impl ChannelKind {
    /// Parse the `type` of a channel config. Unknown strings are `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dingtalk" => Some(ChannelKind::DingTalk),
            "wecom" => Some(ChannelKind::WeCom),
            "feishu" => Some(ChannelKind::Feishu),
            "webhook" => Some(ChannelKind::Webhook),
            "email" => Some(ChannelKind::Email),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::DingTalk => "dingtalk",
            ChannelKind::WeCom => "wecom",
            ChannelKind::Feishu => "feishu",
            ChannelKind::Webhook => "webhook",
            ChannelKind::Email => "email",
        }
    }

    /// Webhook and email get the structured message; chat bots get the rendered text.
    pub fn wants_structured(self) -> bool {
        matches!(self, ChannelKind::Webhook | ChannelKind::Email)
    }
}

/// What a sender receives.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    Text(&'a str),
    Structured(&'a NotificationMessage),
}

impl Payload<'_> {
    /// Text form of the payload, rendering a structured message if needed.
    pub fn text(&self) -> String {
        match self {
            Payload::Text(t) => t.to_string(),
            Payload::Structured(m) => m.render(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("invalid channel settings: {0}")]
    Settings(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("provider error: {0}")]
    Provider(String),
}

/// Delivers one notification to one configured channel. `settings` is the channel's opaque config.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn send(&self, settings: &serde_json::Value, payload: Payload<'_>) -> Result<(), SendError>;
}

/// Immutable map of channel kind -> sender, built at startup.
#[derive(Default)]
pub struct SenderRegistry {
    senders: HashMap<ChannelKind, Arc<dyn ChannelSender>>,
}

impl SenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All five built-in senders sharing one HTTP client.
    pub fn with_defaults() -> Result<Self, SendError> {
        let client = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self::new()
            .with(super::DingTalkSender::new(client.clone()))
            .with(super::WeComSender::new(client.clone()))
            .with(super::FeishuSender::new(client.clone()))
            .with(super::WebhookSender::new(client.clone()))
            .with(super::EmailSender::new(client)))
    }

    /// Add (or replace) the sender for its kind.
    pub fn with(mut self, sender: impl ChannelSender + 'static) -> Self {
        self.senders.insert(sender.kind(), Arc::new(sender));
        self
    }

    pub fn get(&self, kind: ChannelKind) -> Option<Arc<dyn ChannelSender>> {
        self.senders.get(&kind).cloned()
    }
}
