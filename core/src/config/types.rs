use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::state::{CatchUpPolicy, ManagerOptions};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub listeners: ListenerConfig,

    #[serde(default)]
    pub manager: ManagerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "sysmode_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(flatten)]
    pub provider: StoreProvider,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: StoreProvider::File(FileStoreConfig::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider")]
pub enum StoreProvider {
    #[serde(rename = "file")]
    File(FileStoreConfig),
    /// Nothing is written to disk; state lasts for the process only.
    #[serde(rename = "memory")]
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// Empty means `<data dir>/SystemMode.txt`, filled in by the loader.
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub api_key: String,

    /// Callsign to base URL. Callsigns missing here do not resolve.
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
}

fn default_timeout_ms() -> u64 {
    3_000
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            api_key: String::new(),
            endpoints: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub catch_up: CatchUpPolicy,

    #[serde(default)]
    pub restore_clients: bool,

    /// Per-call bound applied on top of the listener transport's own timeout.
    #[serde(default)]
    pub listener_timeout_ms: Option<u64>,
}

impl From<&ManagerConfig> for ManagerOptions {
    fn from(cfg: &ManagerConfig) -> Self {
        Self {
            catch_up: cfg.catch_up,
            restore_clients: cfg.restore_clients,
            listener_timeout: cfg.listener_timeout_ms.map(Duration::from_millis),
        }
    }
}
