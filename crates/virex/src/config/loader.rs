use std::path::{Path, PathBuf};

use crate::config::schema::ClientConfig;
use crate::error::ConfigError;

pub const ENV_SERVER_URL: &str = "VIREX_SERVER_URL";
pub const ENV_CACHE_DIR: &str = "VIREX_CACHE_DIR";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

/// Loads the config file if it exists, otherwise returns defaults.
/// Environment overrides are applied in both cases.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let path = path.as_ref();
    let mut config = if path.exists() {
        load_config(path)?
    } else {
        log::debug!("No config file at {:?}, using defaults", path);
        ClientConfig::default()
    };

    apply_env_overrides(&mut config);
    validate_config(&config)?;
    Ok(config)
}

pub fn load_config_from_str(content: &str) -> Result<ClientConfig, ConfigError> {
    let mut config: ClientConfig = serde_json::from_str(content)?;
    config.server_url = normalize_server_url(&config.server_url);

    validate_config(&config)?;

    Ok(config)
}

pub fn apply_env_overrides(config: &mut ClientConfig) {
    if let Ok(url) = std::env::var(ENV_SERVER_URL) {
        if !url.trim().is_empty() {
            config.server_url = normalize_server_url(&url);
        }
    }

    if let Ok(dir) = std::env::var(ENV_CACHE_DIR) {
        if !dir.trim().is_empty() {
            config.cache_directory = Some(PathBuf::from(dir));
        }
    }
}

pub fn normalize_server_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Checks that a server URL is usable as an API base.
pub fn validate_server_url(url: &str) -> Result<(), String> {
    if url.is_empty() {
        return Err("Server URL is empty".to_string());
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err("Server URL must start with http:// or https://".to_string());
    }
    url::Url::parse(url).map_err(|e| format!("Invalid server URL: {}", e))?;
    Ok(())
}

fn validate_config(config: &ClientConfig) -> Result<(), ConfigError> {
    validate_server_url(&config.server_url)
        .map_err(|message| ConfigError::Validation { message })?;

    if config.transfer.max_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "transfer.max_attempts must be at least 1".to_string(),
        });
    }

    if config.transfer.connect_timeout_secs == 0 || config.transfer.read_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "transfer timeouts must be greater than zero".to_string(),
        });
    }

    Ok(())
}
