pub mod api;
pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod sanitize;
pub mod session;
pub mod store;
pub mod transfer;

pub use api::{DeepLink, HealthStatus, VirexApi};
pub use config::{load_config, load_config_or_default, ClientConfig, TransferConfig};
pub use error::{ConfigError, ErrorCategory, Result, StoreError, VirexError};
pub use job::{
    BroadcastObserver, ChannelObserver, JobError, JobObserver, JobRunner, JobSnapshot, JobState,
    JobSubmission, NoopObserver,
};
pub use logging::{init_logging, LogFormat};
pub use session::{Identity, SessionError, SessionStore};
pub use store::{human_size, Artifact, ArtifactStore};
pub use transfer::{RetryPolicy, TransferClient, TransferError, TransferRequest, Transport};
