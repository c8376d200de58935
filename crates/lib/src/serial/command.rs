//! Commands written to the module, one JSON object per line.

use serde::Serialize;

/// Outbound command. Serialized with a `type` tag, e.g.
/// `{"type":"send_sms","to":"+1555","content":"hi","request_id":"..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Send a text message. The module answers later with `sms_send_result` carrying the same request id.
    SendSms {
        to: String,
        content: String,
        request_id: String,
    },
    /// Toggle flight mode; answered by `cellular_control_response`.
    SetFlymode { enabled: bool, request_id: String },
    /// Reboot the module's MCU. The module announces itself again with `system_ready`.
    #[serde(rename = "reboot_mcu")]
    Reboot { request_id: String },
    /// Ask for a `status_response`.
    GetStatus,
    /// Ask for a `phone_number_response`.
    GetPhoneNumber,
}

impl Command {
    /// Wire form: JSON followed by a newline.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            Command::SendSms { request_id, .. }
            | Command::SetFlymode { request_id, .. }
            | Command::Reboot { request_id } => Some(request_id),
            Command::GetStatus | Command::GetPhoneNumber => None,
        }
    }
}
