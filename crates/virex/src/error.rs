use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::DeepLinkError;
use crate::session::SessionError;
use crate::transfer::TransferError;

/// Failure categories surfaced to callers on a terminal job error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    PreconditionFailed,
    ConnectionFailed,
    Timeout,
    ServerRejected,
    LocalIoFailure,
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::PreconditionFailed => write!(f, "Precondition failed"),
            ErrorCategory::ConnectionFailed => write!(f, "Connection failed"),
            ErrorCategory::Timeout => write!(f, "Timed out"),
            ErrorCategory::ServerRejected => write!(f, "Rejected by server"),
            ErrorCategory::LocalIoFailure => write!(f, "Local I/O failure"),
            ErrorCategory::Unknown => write!(f, "Unexpected error"),
        }
    }
}

#[derive(Error, Debug)]
pub enum VirexError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    DeepLink(#[from] DeepLinkError),
}

impl VirexError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            VirexError::Config(_) => ErrorCategory::PreconditionFailed,
            VirexError::Session(e) => e.category(),
            VirexError::Transfer(e) => e.category(),
            VirexError::Store(e) => e.category(),
            VirexError::DeepLink(e) => e.category(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read directory '{path}': {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove file '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream interrupted while writing '{path}': {source}")]
    Stream {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a managed artifact: {0}")]
    NotManaged(PathBuf),

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

impl StoreError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            StoreError::Stream { source, .. }
                if source.kind() == std::io::ErrorKind::TimedOut =>
            {
                ErrorCategory::Timeout
            }
            StoreError::NotManaged(_) => ErrorCategory::PreconditionFailed,
            _ => ErrorCategory::LocalIoFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, VirexError>;
