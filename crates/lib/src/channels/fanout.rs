//! Fan-out: deliver one notification to every enabled channel, each independently.

use crate::channels::message::NotificationMessage;
use crate::channels::registry::{ChannelKind, Payload, SenderRegistry};
use crate::channels::source::ChannelConfigSource;
use std::sync::Arc;

pub struct Notifier {
    source: Arc<dyn ChannelConfigSource>,
    senders: SenderRegistry,
}

impl Notifier {
    pub fn new(source: Arc<dyn ChannelConfigSource>, senders: SenderRegistry) -> Self {
        Self { source, senders }
    }

    /// Send `msg` to every enabled channel. A failing channel is logged and the rest are
    /// still attempted; unknown channel types are skipped. Nothing is retried.
    pub async fn dispatch(&self, msg: &NotificationMessage) {
        let channels = match self.source.load_channels().await {
            Ok(c) => c,
            Err(e) => {
                log::error!("notify: loading channel configs failed: {:#}", e);
                return;
            }
        };

        let rendered = msg.render();
        for channel in channels.iter().filter(|c| c.enabled) {
            let Some(kind) = ChannelKind::parse(&channel.typ) else {
                continue;
            };
            let Some(sender) = self.senders.get(kind) else {
                continue;
            };
            let payload = if kind.wants_structured() {
                Payload::Structured(msg)
            } else {
                Payload::Text(&rendered)
            };
            match sender.send(&channel.settings, payload).await {
                Ok(()) => log::info!("notify: sent via {}", kind.as_str()),
                Err(e) => log::error!("notify: sending via {} failed: {}", kind.as_str(), e),
            }
        }
    }
}
