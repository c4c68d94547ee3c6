//! Session store error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::error::ErrorCategory;

#[derive(Error, Debug)]
pub enum SessionError {
    /// No user id or auth token is stored.
    #[error("Not signed in: user id and auth token are required")]
    NotAuthenticated,

    #[error("Invalid server URL '{url}': {reason}")]
    InvalidServerUrl { url: String, reason: String },

    #[error("Failed to read session file '{path}': {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session file '{path}' is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to persist session to '{path}': {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SessionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SessionError::NotAuthenticated | SessionError::InvalidServerUrl { .. } => {
                ErrorCategory::PreconditionFailed
            }
            SessionError::Load { .. }
            | SessionError::Corrupt { .. }
            | SessionError::Persist { .. } => ErrorCategory::LocalIoFailure,
        }
    }
}
