//! Shared HTTP plumbing for the channel senders.

use crate::channels::registry::SendError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode a channel's opaque settings into the sender's own shape.
pub(super) fn settings<T: DeserializeOwned>(settings: &Value) -> Result<T, SendError> {
    serde_json::from_value(settings.clone()).map_err(|e| SendError::Settings(e.to_string()))
}

/// Turn a non-2xx reply into [`SendError::Rejected`]; return the body otherwise.
pub(super) async fn ensure_success(res: reqwest::Response) -> Result<String, SendError> {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(SendError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

pub(super) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    body: &Value,
) -> Result<String, SendError> {
    let res = client.post(url).json(body).send().await?;
    ensure_success(res).await
}

/// Chat bot APIs answer 200 with an error code in the body. A missing code counts as success.
pub(super) fn check_bot_reply(body: &str, code_field: &str, msg_field: &str) -> Result<(), SendError> {
    let Ok(reply) = serde_json::from_str::<Value>(body) else {
        return Ok(());
    };
    match reply.get(code_field).and_then(Value::as_i64) {
        Some(0) | None => Ok(()),
        Some(code) => {
            let msg = reply.get(msg_field).and_then(Value::as_str).unwrap_or("");
            Err(SendError::Provider(format!("{} {}: {}", code_field, code, msg)))
        }
    }
}
