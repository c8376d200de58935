//! Commands issued to the module and the waiters for their replies.

use super::ModemService;
use crate::serial::{Command, CommandReply, LinkError};
use crate::store::{MessageStatus, StoreError, TextMessage};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid request: {0}")]
    Invalid(&'static str),
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("module did not answer {command} within {timeout:?}")]
    Timeout {
        command: &'static str,
        timeout: Duration,
    },
    #[error("module rejected {command}: {message}")]
    Rejected {
        command: &'static str,
        message: String,
    },
}

/// Waiters for `cmd_response` / `cellular_control_response`, keyed by request id.
#[derive(Default)]
pub(super) struct PendingReplies {
    inner: Mutex<HashMap<String, oneshot::Sender<CommandReply>>>,
}

impl PendingReplies {
    fn register(&self, request_id: &str) -> oneshot::Receiver<CommandReply> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(request_id.to_string(), tx);
        rx
    }

    /// Hand `reply` to the waiter for `request_id`. False if nobody is waiting.
    pub(super) fn complete(&self, request_id: &str, reply: CommandReply) -> bool {
        match self.lock().remove(request_id) {
            Some(tx) => tx.send(reply).is_ok(),
            None => false,
        }
    }

    fn cancel(&self, request_id: &str) {
        self.lock().remove(request_id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, oneshot::Sender<CommandReply>>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl ModemService {
    /// Queue an SMS. The pending record is stored under the request id before the command
    /// is written, so the later `sms_send_result` always finds it. Returns the request id.
    pub async fn send_sms(&self, to: &str, content: &str) -> Result<String, CommandError> {
        let to = to.trim();
        if to.is_empty() || content.trim().is_empty() {
            return Err(CommandError::Invalid("phone number and content are required"));
        }

        let request_id = new_request_id();
        self.store
            .save(&TextMessage::outgoing(&request_id, to, content))
            .await?;

        let cmd = Command::SendSms {
            to: to.to_string(),
            content: content.to_string(),
            request_id: request_id.clone(),
        };
        if let Err(e) = self.commands.send(&cmd).await {
            if let Err(se) = self.store.update_status(&request_id, MessageStatus::Failed).await {
                log::error!("sms: marking {} failed: {}", request_id, se);
            }
            return Err(e.into());
        }
        log::info!("sms: queued to {} (request_id={})", to, request_id);
        Ok(request_id)
    }

    /// Toggle flight mode and wait for the module's `cellular_control_response`.
    pub async fn set_flymode(&self, enabled: bool) -> Result<(), CommandError> {
        const COMMAND: &str = "set_flymode";
        let request_id = new_request_id();
        let reply = self.pending.register(&request_id);
        let cmd = Command::SetFlymode {
            enabled,
            request_id: request_id.clone(),
        };
        if let Err(e) = self.commands.send(&cmd).await {
            self.pending.cancel(&request_id);
            return Err(e.into());
        }

        match tokio::time::timeout(self.command_timeout, reply).await {
            Ok(Ok(reply)) if reply.success => {
                log::info!("modem: flight mode {}", if enabled { "on" } else { "off" });
                self.device.set_flymode(enabled);
                Ok(())
            }
            Ok(Ok(reply)) => Err(CommandError::Rejected {
                command: COMMAND,
                message: reply.message.unwrap_or_else(|| "no reason given".to_string()),
            }),
            Ok(Err(_)) | Err(_) => {
                self.pending.cancel(&request_id);
                Err(CommandError::Timeout {
                    command: COMMAND,
                    timeout: self.command_timeout,
                })
            }
        }
    }

    /// Reboot the module. Not awaited: the module goes away and comes back with `system_ready`.
    pub async fn reboot(&self) -> Result<(), CommandError> {
        self.commands
            .send(&Command::Reboot {
                request_id: new_request_id(),
            })
            .await?;
        log::info!("modem: reboot requested");
        Ok(())
    }
}
