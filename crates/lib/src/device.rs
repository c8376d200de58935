//! Cached state of the cellular module, fed by status frames and served by the gateway.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::RwLock;

/// Snapshot of what the module last told us. Timestamps are Unix milliseconds.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub ready: bool,
    pub ready_at: Option<i64>,
    pub last_heartbeat_at: Option<i64>,
    /// Last `status_response` payload (signal, operator, network registration, ...), minus the type tag.
    pub status: Option<Map<String, Value>>,
    pub flymode: Option<bool>,
    pub phone_number: Option<String>,
    pub sim_state: Option<String>,
    pub last_warning: Option<String>,
    pub last_error: Option<String>,
    pub updated_at: Option<i64>,
}

#[derive(Default)]
pub struct DeviceState {
    inner: RwLock<DeviceStatus>,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, f: impl FnOnce(&mut DeviceStatus)) {
        let mut g = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut g);
        g.updated_at = Some(now_ms());
    }

    pub fn snapshot(&self) -> DeviceStatus {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Module (re)booted: previous status no longer applies.
    pub fn mark_ready(&self) {
        self.update(|s| {
            let now = now_ms();
            *s = DeviceStatus {
                ready: true,
                ready_at: Some(now),
                last_heartbeat_at: Some(now),
                ..DeviceStatus::default()
            };
        });
    }

    pub fn heartbeat(&self) {
        self.update(|s| {
            s.ready = true;
            s.last_heartbeat_at = Some(now_ms());
        });
    }

    /// Store a `status_response` payload. A `flymode` / `flight_mode` boolean in it is lifted out.
    pub fn apply_status(&self, payload: &Map<String, Value>) {
        let mut status = payload.clone();
        status.remove("type");
        let flymode = status
            .get("flymode")
            .or_else(|| status.get("flight_mode"))
            .and_then(Value::as_bool);
        self.update(|s| {
            if flymode.is_some() {
                s.flymode = flymode;
            }
            s.status = Some(status);
        });
    }

    pub fn set_flymode(&self, enabled: bool) {
        self.update(|s| s.flymode = Some(enabled));
    }

    pub fn set_phone_number(&self, number: Option<String>) {
        self.update(|s| s.phone_number = number);
    }

    /// Record the SIM state; returns the previous state.
    pub fn set_sim_state(&self, state: Option<String>) -> Option<String> {
        let mut previous = None;
        self.update(|s| previous = std::mem::replace(&mut s.sim_state, state));
        previous
    }

    pub fn record_warning(&self, message: String) {
        self.update(|s| s.last_warning = Some(message));
    }

    pub fn record_error(&self, message: String) {
        self.update(|s| s.last_error = Some(message));
    }
}
