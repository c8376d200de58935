use super::ModemService;
use crate::channels::NotificationMessage;
use crate::serial::{Command, CommandReply, DecodedMessage, ModuleNotice, PhoneNumberReport, SimEvent};

impl ModemService {
    /// `system_ready`: the module (re)started. Reset the cache and ask for fresh status.
    pub(super) fn handle_system_ready(&self, msg: &DecodedMessage) {
        log::info!("modem: system ready: {}", msg.raw);
        self.device.mark_ready();
        self.request_status_update();
    }

    pub(super) fn handle_heartbeat(&self, _msg: &DecodedMessage) {
        log::debug!("modem: heartbeat");
        self.device.heartbeat();
    }

    pub(super) fn handle_status_response(&self, msg: &DecodedMessage) {
        log::debug!("modem: status {}", msg.raw);
        self.device.apply_status(&msg.payload);
    }

    /// Reply to `set_flymode`.
    pub(super) fn handle_cellular_control_response(&self, msg: &DecodedMessage) {
        self.complete_command(msg);
    }

    pub(super) fn handle_command_response(&self, msg: &DecodedMessage) {
        self.complete_command(msg);
    }

    fn complete_command(&self, msg: &DecodedMessage) {
        let reply: CommandReply = match msg.decode() {
            Ok(r) => r,
            Err(e) => {
                log::error!("modem: {}", e);
                return;
            }
        };
        log::info!(
            "modem: {} success={} request_id={}",
            msg.typ,
            reply.success,
            reply.request_id.as_deref().unwrap_or("-")
        );
        match reply.request_id.clone().filter(|id| !id.is_empty()) {
            Some(id) => {
                if !self.pending.complete(&id, reply) {
                    log::debug!("modem: no pending command for request_id {}", id);
                }
            }
            None => log::debug!("modem: {} without request_id: {}", msg.typ, msg.raw),
        }
    }

    pub(super) fn handle_phone_number_response(&self, msg: &DecodedMessage) {
        match msg.decode::<PhoneNumberReport>() {
            Ok(report) => {
                log::info!(
                    "modem: phone number {}",
                    report.phone_number.as_deref().unwrap_or("unknown")
                );
                self.device.set_phone_number(report.phone_number);
            }
            Err(e) => log::error!("modem: {}", e),
        }
    }

    /// `sim_event`: record the SIM state and tell operators when it changes.
    pub(super) fn handle_sim_event(&self, msg: &DecodedMessage) {
        let event: SimEvent = match msg.decode() {
            Ok(e) => e,
            Err(e) => {
                log::error!("modem: {}", e);
                return;
            }
        };
        let state = event.into_state().unwrap_or_else(|| "unknown".to_string());
        log::warn!("modem: sim event: {}", state);
        let previous = self.device.set_sim_state(Some(state.clone()));
        if previous.as_deref() != Some(state.as_str()) {
            self.notify(NotificationMessage::system(format!("SIM state: {}", state)));
        }
        self.request_status_update();
    }

    pub(super) fn handle_warning(&self, msg: &DecodedMessage) {
        let text = notice_text(msg);
        log::warn!("modem: module warning: {}", text);
        self.device.record_warning(text);
    }

    pub(super) fn handle_error(&self, msg: &DecodedMessage) {
        let text = notice_text(msg);
        log::error!("modem: module error: {}", text);
        self.device.record_error(text);
    }

    /// Ask the module for status and phone number. Fire-and-forget; the answers arrive as frames.
    pub fn request_status_update(&self) {
        let commands = self.commands.clone();
        self.background.spawn("status refresh", async move {
            for cmd in [Command::GetStatus, Command::GetPhoneNumber] {
                if let Err(e) = commands.send(&cmd).await {
                    log::warn!("modem: status refresh failed: {}", e);
                    return;
                }
            }
        });
    }
}

/// Human text of a warning/error frame; the raw line when the firmware sent no message.
fn notice_text(msg: &DecodedMessage) -> String {
    match msg.decode::<ModuleNotice>() {
        Ok(ModuleNotice {
            message: Some(m), ..
        }) if !m.is_empty() => m,
        _ => msg.raw.clone(),
    }
}
