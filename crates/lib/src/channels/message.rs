//! Normalized notification: what happened, from whom, when. Rendered once per fan-out.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Sms,
    Call,
    System,
}

/// Channel-independent notification. `timestamp` is Unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub from: String,
    pub content: String,
    pub timestamp: i64,
}

impl NotificationMessage {
    pub fn sms(from: impl Into<String>, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            kind: NotificationKind::Sms,
            from: from.into(),
            content: content.into(),
            timestamp,
        }
    }

    pub fn call(from: impl Into<String>, timestamp: i64) -> Self {
        Self {
            kind: NotificationKind::Call,
            from: from.into(),
            content: String::new(),
            timestamp,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::System,
            from: "system".to_string(),
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Local time as `YYYY-MM-DD HH:MM:SS`; the raw number if it is out of range.
    pub fn formatted_time(&self) -> String {
        match Local.timestamp_opt(self.timestamp, 0).single() {
            Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => self.timestamp.to_string(),
        }
    }

    /// Short headline, used as email subject.
    pub fn title(&self) -> String {
        match self.kind {
            NotificationKind::Sms => format!("New SMS from {}", self.from),
            NotificationKind::Call => format!("Incoming call from {}", self.from),
            NotificationKind::System => "smsgate notice".to_string(),
        }
    }

    /// Text block sent to chat channels: content, separator, sender, time.
    pub fn render(&self) -> String {
        let body = match self.kind {
            NotificationKind::Call if self.content.is_empty() => "Incoming call",
            _ => self.content.as_str(),
        };
        format!(
            "{}\n----\nFrom: {}\n{}\n",
            body,
            self.from,
            self.formatted_time()
        )
    }
}
