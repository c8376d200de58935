use super::ModemService;
use crate::channels::NotificationMessage;
use crate::serial::{CallDisconnected, DecodedMessage, IncomingCall};

impl ModemService {
    /// `incoming_call`: notify with no content. Calls are not persisted.
    pub(super) fn handle_incoming_call(&self, msg: &DecodedMessage) {
        let call: IncomingCall = match msg.decode() {
            Ok(c) => c,
            Err(e) => {
                log::error!("call: {}", e);
                return;
            }
        };
        log::info!("call: incoming from {} at {}", call.from, call.timestamp);
        self.notify(NotificationMessage::call(call.from, call.timestamp));
    }

    /// `call_disconnected`: log only.
    pub(super) fn handle_call_disconnected(&self, msg: &DecodedMessage) {
        match msg.decode::<CallDisconnected>() {
            Ok(end) => log::info!("call: disconnected at {}", end.timestamp),
            Err(e) => log::error!("call: {}", e),
        }
    }
}
