pub mod loader;
pub mod schema;

pub use loader::{
    apply_env_overrides, load_config, load_config_from_str, load_config_or_default,
    normalize_server_url, validate_server_url,
};
pub use schema::{default_config_dir, ClientConfig, TransferConfig, DEFAULT_SERVER_URL};
