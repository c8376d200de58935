use super::ModemService;
use crate::channels::NotificationMessage;
use crate::serial::{DecodedMessage, IncomingSms};
use crate::store::TextMessage;

impl ModemService {
    /// `incoming_sms`: store the record, then notify. Both run in the background; the
    /// store write is scheduled first but the notification does not wait for it.
    pub(super) fn handle_incoming_sms(&self, msg: &DecodedMessage) {
        let sms: IncomingSms = match msg.decode() {
            Ok(s) => s,
            Err(e) => {
                log::error!("sms: {}", e);
                return;
            }
        };
        log::info!(
            "sms: received from {} at {} ({} chars)",
            sms.from,
            sms.timestamp,
            sms.content.chars().count()
        );

        let record = TextMessage::incoming(&sms.from, &sms.content);
        let store = self.store.clone();
        self.background.spawn("store incoming sms", async move {
            if let Err(e) = store.save(&record).await {
                log::error!("sms: saving record {} failed: {}", record.id, e);
            }
        });

        self.notify(NotificationMessage::sms(sms.from, sms.content, sms.timestamp));
    }
}
