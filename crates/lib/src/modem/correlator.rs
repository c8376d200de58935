//! Send-result correlation: match `sms_send_result` to the outgoing record via its request id.

use super::ModemService;
use crate::channels::NotificationMessage;
use crate::serial::{DecodedMessage, SmsSendResult};
use crate::store::MessageStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome reported to an external task scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Success,
    Failed,
}

/// Receives the final status of every correlated send, keyed by request id.
#[async_trait]
pub trait TaskStatusUpdater: Send + Sync {
    async fn update(&self, request_id: &str, status: TaskStatus) -> anyhow::Result<()>;
}

fn resolve(success: bool) -> (MessageStatus, TaskStatus) {
    if success {
        (MessageStatus::Sent, TaskStatus::Success)
    } else {
        (MessageStatus::Failed, TaskStatus::Failed)
    }
}

impl ModemService {
    /// `sms_send_result`. Without a request id there is nothing to update. Otherwise the
    /// record's status is overwritten (so a duplicate frame is harmless), a failure is
    /// announced, and the task-status updater, if any, is told.
    pub(super) fn handle_sms_send_result(&self, msg: &DecodedMessage) {
        let result: SmsSendResult = match msg.decode() {
            Ok(r) => r,
            Err(e) => {
                log::error!("sms: {}", e);
                return;
            }
        };
        if result.request_id.is_empty() {
            log::warn!("sms: send result without request_id: {}", msg.raw);
            return;
        }

        let (status, task_status) = resolve(result.success);
        if result.success {
            log::info!("sms: sent to {} (request_id={})", result.to, result.request_id);
        } else {
            log::warn!("sms: sending to {} failed (request_id={})", result.to, result.request_id);
            self.notify(NotificationMessage::sms(
                "system",
                format!("send failed: {}", result.to),
                chrono::Utc::now().timestamp(),
            ));
        }

        let store = self.store.clone();
        let updater = self.task_status.clone();
        let request_id = result.request_id;
        self.background.spawn("apply send result", async move {
            if let Err(e) = store.update_status(&request_id, status).await {
                log::error!("sms: updating status of {} failed: {}", request_id, e);
            }
            if let Some(updater) = updater {
                if let Err(e) = updater.update(&request_id, task_status).await {
                    log::error!("sms: task status update for {} failed: {:#}", request_id, e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_maps_to_sent() {
        assert_eq!(resolve(true), (MessageStatus::Sent, TaskStatus::Success));
        assert_eq!(resolve(false), (MessageStatus::Failed, TaskStatus::Failed));
    }
}
