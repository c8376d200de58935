//! Notification channels (DingTalk, WeCom, Feishu, generic webhook, email).
//!
//! A [`ChannelSender`] per channel kind is registered once in a [`SenderRegistry`];
//! the [`Notifier`] loads the channel list on every notification and fans the
//! message out to each enabled channel independently.

mod dingtalk;
mod email;
mod fanout;
mod feishu;
mod http;
mod message;
mod registry;
mod source;
mod webhook;
mod wecom;

pub use dingtalk::DingTalkSender;
pub use email::EmailSender;
pub use fanout::Notifier;
pub use feishu::FeishuSender;
pub use message::{NotificationKind, NotificationMessage};
pub use registry::{ChannelKind, ChannelSender, Payload, SendError, SenderRegistry};
pub use source::{ChannelConfig, ChannelConfigSource, ConfigFileChannels};
pub use webhook::WebhookSender;
pub use wecom::WeComSender;
