//! Transfer error types.

use thiserror::Error;

use crate::error::ErrorCategory;

/// How a single transport attempt failed. The retry loop switches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection could not be established.
    Connect,
    /// The request timed out.
    Timeout,
    /// A local file backing the request body could not be read.
    LocalIo,
    /// Anything else: malformed request, protocol error.
    Other,
}

impl FailureKind {
    /// Only connection and timeout failures are worth another attempt.
    pub fn is_transient(self) -> bool {
        matches!(self, FailureKind::Connect | FailureKind::Timeout)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Connect => write!(f, "connect"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::LocalIo => write!(f, "local i/o"),
            FailureKind::Other => write!(f, "request"),
        }
    }
}

/// Classified failure of one transport attempt.
#[derive(Error, Debug, Clone)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Connect, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn local_io(message: impl Into<String>) -> Self {
        Self::new(FailureKind::LocalIo, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Other, message)
    }
}

#[derive(Error, Debug)]
pub enum TransferError {
    /// Every attempt failed with a connection or timeout error.
    #[error("Connection failed after {attempts} attempts: {message}")]
    RetriesExhausted {
        attempts: u32,
        kind: FailureKind,
        message: String,
    },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Invalid request URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to read upload source: {0}")]
    LocalIo(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Server responded with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to read response body: {0}")]
    Body(#[source] std::io::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl TransferError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TransferError::RetriesExhausted {
                kind: FailureKind::Timeout,
                ..
            } => ErrorCategory::Timeout,
            TransferError::RetriesExhausted { .. } => ErrorCategory::ConnectionFailed,
            TransferError::Precondition(_) | TransferError::InvalidUrl { .. } => {
                ErrorCategory::PreconditionFailed
            }
            TransferError::LocalIo(_) => ErrorCategory::LocalIoFailure,
            TransferError::Rejected { .. } => ErrorCategory::ServerRejected,
            TransferError::Body(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                ErrorCategory::Timeout
            }
            TransferError::Body(_) => ErrorCategory::LocalIoFailure,
            TransferError::Request(_) | TransferError::Decode(_) => ErrorCategory::Unknown,
        }
    }

    /// True when retries ran out rather than the server answering.
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, TransferError::RetriesExhausted { .. })
    }
}

impl From<TransportError> for TransferError {
    fn from(err: TransportError) -> Self {
        match err.kind {
            FailureKind::Connect | FailureKind::Timeout => TransferError::RetriesExhausted {
                attempts: 1,
                kind: err.kind,
                message: err.message,
            },
            FailureKind::LocalIo => TransferError::LocalIo(err.message),
            FailureKind::Other => TransferError::Request(err.message),
        }
    }
}
