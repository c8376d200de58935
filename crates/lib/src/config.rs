//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.smsgate/config.json`) and environment.
//! Notification channels live in the same file and are re-read on every fan-out
//! (see `channels::ConfigFileChannels`), so edits take effect without a restart.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::channels::ChannelConfig;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP control plane settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Serial link to the cellular module.
    #[serde(default)]
    pub serial: SerialConfig,

    /// Where SMS records are kept.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Notification channels (DingTalk, WeCom, Feishu, webhook, email).
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Gateway bind, port, and auth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the HTTP API (default 15152).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Auth settings. When absent, defaults to no auth for loopback bind.
    #[serde(default)]
    pub auth: GatewayAuthConfig,
}

/// Gateway auth: token or none (loopback-only when none).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayAuthConfig {
    /// "none" = no shared secret (only safe when bind is loopback). "token" = require a bearer token on /api.
    #[serde(default)]
    pub mode: GatewayAuthMode,

    /// Shared secret for API requests. Overridden by SMSGATE_GATEWAY_TOKEN env.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayAuthMode {
    /// No auth; allow only when bind is loopback.
    #[default]
    None,

    /// Require `Authorization: Bearer <token>` on API requests.
    Token,
}

fn default_gateway_port() -> u16 {
    15152
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            auth: GatewayAuthConfig::default(),
        }
    }
}

/// Serial link settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialConfig {
    /// Path of the tty the module is attached to (e.g. /dev/ttyUSB0). Overridden by SMSGATE_SERIAL_DEVICE env.
    pub device: Option<PathBuf>,

    /// Line speed; the port is opened 8N1 (default 115200).
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// How long to wait for the module to answer a command that expects a reply.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

fn default_command_timeout_secs() -> u64 {
    10
}

fn default_baud_rate() -> u32 {
    115_200
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: None,
            baud_rate: default_baud_rate(),
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

/// Message record storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// JSON file holding SMS records. Relative paths are resolved against the config file's parent.
    /// Default: `data/messages.json` next to the config file.
    pub path: Option<PathBuf>,
}

/// Notification channel list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsConfig {
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Resolve the gateway token: env SMSGATE_GATEWAY_TOKEN overrides config.
pub fn resolve_gateway_token(config: &Config) -> Option<String> {
    non_empty_env("SMSGATE_GATEWAY_TOKEN").or_else(|| {
        config
            .gateway
            .auth
            .token
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Resolve the serial device: env SMSGATE_SERIAL_DEVICE overrides config.
pub fn resolve_serial_device(config: &Config) -> Option<PathBuf> {
    non_empty_env("SMSGATE_SERIAL_DEVICE")
        .map(PathBuf::from)
        .or_else(|| config.serial.device.clone())
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("SMSGATE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".smsgate").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

fn config_dir(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Resolve the message store file: `storage.path` if set (relative paths resolved against the
/// config file's parent), otherwise `data/messages.json` next to the config file.
pub fn resolve_storage_path(config: &Config, config_path: &Path) -> PathBuf {
    let dir = config_dir(config_path);
    match &config.storage.path {
        Some(p) if !p.as_os_str().is_empty() => {
            if p.is_absolute() {
                p.clone()
            } else {
                dir.join(p)
            }
        }
        _ => dir.join("data").join("messages.json"),
    }
}

/// Load config from the given path (or the default path). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Async variant used on hot paths (per-notification channel lookup) so the runtime is not blocked.
pub async fn load_config_async(path: &Path) -> Result<Config> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e).with_context(|| format!("reading config from {}", path.display())),
    }
}
