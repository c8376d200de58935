//! SMS record storage.
//!
//! Records are addressed by id. For outgoing messages the id is the request id sent to
//! the module, which is how `sms_send_result` frames find their record.

use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Received,
    Sent,
    Failed,
    Pending,
}

/// A persisted SMS. `created_at` is Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessage {
    pub id: String,
    pub from: String,
    pub to: String,
    pub content: String,
    pub direction: Direction,
    pub status: MessageStatus,
    pub created_at: i64,
}

impl TextMessage {
    /// Record for a message the module just received.
    pub fn incoming(from: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from: from.into(),
            to: String::new(),
            content: content.into(),
            direction: Direction::Incoming,
            status: MessageStatus::Received,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Pending record for a message about to be handed to the module under `request_id`.
    pub fn outgoing(
        request_id: impl Into<String>,
        to: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: request_id.into(),
            from: String::new(),
            to: to.into(),
            content: content.into(),
            direction: Direction::Outgoing,
            status: MessageStatus::Pending,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("message {0} not found")]
    NotFound(String),
    #[error("message store {} is locked by another process", .0.display())]
    Locked(PathBuf),
    #[error("message store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("message store encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Storage collaborator for SMS records.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert, or replace the record with the same id.
    async fn save(&self, message: &TextMessage) -> Result<(), StoreError>;

    /// Set the status of the record with `id`. Applying the same status twice is harmless.
    async fn update_status(&self, id: &str, status: MessageStatus) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<TextMessage>, StoreError>;

    /// Newest first, at most `limit` records.
    async fn list(&self, limit: usize) -> Result<Vec<TextMessage>, StoreError>;
}

/// In-memory store, optionally persisted to a JSON file after every change.
///
/// When backed by a file, an exclusive lock on `<file>.lock` is held for the lifetime
/// of the store so two gateways cannot write the same file.
pub struct JsonMessageStore {
    path: Option<PathBuf>,
    records: RwLock<Vec<TextMessage>>,
    _lock: Option<std::fs::File>,
}

impl JsonMessageStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: RwLock::new(Vec::new()),
            _lock: None,
        }
    }

    /// Open the store at `path`. A missing file starts empty; an unreadable one is an error.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let lock_path = lock_path_for(&path);
        let lock = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        if lock.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked(path));
        }
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(s) if s.trim().is_empty() => Vec::new(),
            Ok(s) => serde_json::from_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        log::info!(
            "store: loaded {} message record(s) from {}",
            records.len(),
            path.display()
        );
        Ok(Self {
            path: Some(path),
            records: RwLock::new(records),
            _lock: Some(lock),
        })
    }

    async fn persist(&self, records: &[TextMessage]) -> Result<(), StoreError> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(records)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

#[async_trait]
impl MessageStore for JsonMessageStore {
    /// The file is written first; memory changes only once the write succeeded.
    async fn save(&self, message: &TextMessage) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let mut next = records.clone();
        match next.iter_mut().find(|r| r.id == message.id) {
            Some(existing) => *existing = message.clone(),
            None => next.push(message.clone()),
        }
        self.persist(&next).await?;
        *records = next;
        Ok(())
    }

    async fn update_status(&self, id: &str, status: MessageStatus) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let mut next = records.clone();
        let record = next
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.status = status;
        self.persist(&next).await?;
        *records = next;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<TextMessage>, StoreError> {
        Ok(self.records.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self, limit: usize) -> Result<Vec<TextMessage>, StoreError> {
        let records = self.records.read().await;
        let mut out: Vec<TextMessage> = records.iter().rev().take(limit).cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}
