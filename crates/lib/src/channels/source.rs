//! Where channel configurations come from. Loaded fresh for every notification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One configured notification destination. `settings` is opaque to the fan-out and
/// interpreted by the sender for `typ`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, alias = "config")]
    pub settings: serde_json::Value,
}

impl ChannelConfig {
    pub fn new(typ: impl Into<String>, enabled: bool, settings: serde_json::Value) -> Self {
        Self {
            typ: typ.into(),
            enabled,
            settings,
        }
    }
}

#[async_trait]
pub trait ChannelConfigSource: Send + Sync {
    async fn load_channels(&self) -> anyhow::Result<Vec<ChannelConfig>>;
}

/// Fixed channel list.
#[async_trait]
impl ChannelConfigSource for Vec<ChannelConfig> {
    async fn load_channels(&self) -> anyhow::Result<Vec<ChannelConfig>> {
        Ok(self.clone())
    }
}

/// Reads `notifications.channels` from the config file on every call, so enabling or
/// disabling a channel takes effect on the next notification.
pub struct ConfigFileChannels {
    path: PathBuf,
}

impl ConfigFileChannels {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ChannelConfigSource for ConfigFileChannels {
    async fn load_channels(&self) -> anyhow::Result<Vec<ChannelConfig>> {
        let config = crate::config::load_config_async(&self.path).await?;
        Ok(config.notifications.channels)
    }
}
