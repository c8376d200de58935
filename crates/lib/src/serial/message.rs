//! Decoded frames from the module and the typed payload views handlers decode them into.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// One line from the module, split into its type tag and payload.
///
/// `payload` is the whole JSON object of the line (the `type` key included) and `raw`
/// is the line as received. Consumed by value by the router.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub typ: String,
    pub payload: Map<String, Value>,
    pub raw: String,
}

/// A line that could not be turned into a [`DecodedMessage`].
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("frame has no type tag")]
    MissingType,
}

/// A payload that does not match the shape its handler expects.
#[derive(Debug, Error)]
#[error("malformed {typ} payload: {source}")]
pub struct PayloadError {
    pub typ: String,
    #[source]
    pub source: serde_json::Error,
}

impl DecodedMessage {
    pub fn new(typ: impl Into<String>, payload: Map<String, Value>, raw: impl Into<String>) -> Self {
        Self {
            typ: typ.into(),
            payload,
            raw: raw.into(),
        }
    }

    /// Parse one line of module output. The line must be a JSON object with a non-empty string `type`.
    pub fn parse(line: &str) -> Result<Self, FrameError> {
        let raw = line.trim();
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(payload) = value else {
            return Err(FrameError::NotAnObject);
        };
        let typ = payload
            .get("type")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(FrameError::MissingType)?
            .to_string();
        Ok(Self {
            typ,
            payload,
            raw: raw.to_string(),
        })
    }

    /// Decode the payload into a handler-specific view.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        serde_json::from_value(Value::Object(self.payload.clone())).map_err(|source| PayloadError {
            typ: self.typ.clone(),
            source,
        })
    }

    /// Known kind for this message's tag, if any.
    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_tag(&self.typ)
    }
}

/// The message types the module firmware is known to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    IncomingSms,
    SystemReady,
    Heartbeat,
    StatusResponse,
    CellularControlResponse,
    PhoneNumberResponse,
    CmdResponse,
    SmsSendResult,
    SimEvent,
    Warning,
    Error,
    IncomingCall,
    CallDisconnected,
}

impl MessageKind {
    pub const ALL: [MessageKind; 13] = [
        MessageKind::IncomingSms,
        MessageKind::SystemReady,
        MessageKind::Heartbeat,
        MessageKind::StatusResponse,
        MessageKind::CellularControlResponse,
        MessageKind::PhoneNumberResponse,
        MessageKind::CmdResponse,
        MessageKind::SmsSendResult,
        MessageKind::SimEvent,
        MessageKind::Warning,
        MessageKind::Error,
        MessageKind::IncomingCall,
        MessageKind::CallDisconnected,
    ];

    /// Wire tag, as found in the `type` field.
    pub fn tag(self) -> &'static str {
        match self {
            MessageKind::IncomingSms => "incoming_sms",
            MessageKind::SystemReady => "system_ready",
            MessageKind::Heartbeat => "heartbeat",
            MessageKind::StatusResponse => "status_response",
            MessageKind::CellularControlResponse => "cellular_control_response",
            MessageKind::PhoneNumberResponse => "phone_number_response",
            MessageKind::CmdResponse => "cmd_response",
            MessageKind::SmsSendResult => "sms_send_result",
            MessageKind::SimEvent => "sim_event",
            MessageKind::Warning => "warning",
            MessageKind::Error => "error",
            MessageKind::IncomingCall => "incoming_call",
            MessageKind::CallDisconnected => "call_disconnected",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.tag() == tag)
    }
}

/// `incoming_sms`: a text message received by the module.
///
/// Absent fields take their zero value; only a value of the wrong type fails to decode.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingSms {
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub content: String,
}

/// `incoming_call`: the module is ringing.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingCall {
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub from: String,
}

/// `call_disconnected`: informational only.
#[derive(Debug, Clone, Deserialize)]
pub struct CallDisconnected {
    #[serde(default)]
    pub timestamp: i64,
}

/// `sms_send_result`: outcome of an earlier `send_sms` command.
///
/// Every field is defaulted: an absent `request_id` is a missing correlation key,
/// handled by the correlator, not a decode failure.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsSendResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub to: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub request_id: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// `cmd_response` / `cellular_control_response`: answer to a command carrying a request id.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandReply {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default, alias = "error")]
    pub message: Option<String>,
}

fn default_true() -> bool {
    true
}

/// `phone_number_response`.
#[derive(Debug, Clone, Deserialize)]
pub struct PhoneNumberReport {
    #[serde(default, alias = "number", alias = "phone")]
    pub phone_number: Option<String>,
}

/// `sim_event`: SIM inserted, removed, or changed state.
///
/// Firmware versions disagree on the key; when several are present `state` wins,
/// then `event`, then `status`.
#[derive(Debug, Clone, Deserialize)]
pub struct SimEvent {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl SimEvent {
    pub fn into_state(self) -> Option<String> {
        [self.state, self.event, self.status]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
    }
}

/// `warning` / `error`: free-form notices from the firmware.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleNotice {
    #[serde(default, alias = "msg")]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
}
