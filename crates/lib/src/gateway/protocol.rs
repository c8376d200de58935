//! HTTP API request and response bodies.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/serial/sms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendSmsRequest {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSmsResponse {
    pub request_id: String,
}

/// Body of `POST /api/serial/flymode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetFlymodeRequest {
    pub enabled: bool,
}

/// Query of `GET /api/messages`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<usize>,
}

/// Error body: `{ "error": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
