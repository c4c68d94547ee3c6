use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Endpoint used when neither the config file nor the session names one.
pub const DEFAULT_SERVER_URL: &str = "http://10.94.216.104:8080";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Directory shared by finished artifacts and staged uploads.
    #[serde(default)]
    pub cache_directory: Option<PathBuf>,
    /// Directory holding `session.json`.
    #[serde(default)]
    pub config_directory: Option<PathBuf>,
    #[serde(default)]
    pub transfer: TransferConfig,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            cache_directory: None,
            config_directory: None,
            transfer: TransferConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Cache directory, falling back to the platform cache dir.
    pub fn resolved_cache_directory(&self) -> PathBuf {
        self.cache_directory.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("virex")
        })
    }

    pub fn resolved_config_directory(&self) -> PathBuf {
        self.config_directory.clone().unwrap_or_else(default_config_dir)
    }

    pub fn session_path(&self) -> PathBuf {
        self.resolved_config_directory().join("session.json")
    }
}

/// Platform config directory for virex (`<config>/virex`).
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("virex")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Longest wait for the next piece of a response, including the wait for the
    /// server to answer. Resets on every read, so it does not bound a whole transfer.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_connect_timeout_secs() -> u64 {
    60
}

fn default_read_timeout_secs() -> u64 {
    15 * 60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl TransferConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}
