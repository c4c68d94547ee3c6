//! Bounded retry with linear backoff.
//!
//! Only connection and timeout failures are retried. A response that reached
//! the client is never retried, whatever its status.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::error::{TransferError, TransportError};
use crate::config::TransferConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &TransferConfig) -> Self {
        Self::new(config.max_attempts, config.retry_base_delay())
    }

    /// Delay after the given failed attempt (1-based): `attempt * base_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// policy's attempts are used up.
///
/// `op` receives the 1-based attempt number.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, TransferError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error: Option<TransportError> = None;

    for attempt in 1..=max_attempts {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = %operation, attempt, "Request succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.kind.is_transient() => {
                warn!(
                    operation = %operation,
                    attempt,
                    max_attempts,
                    "Request failed ({}): {}",
                    e.kind,
                    e.message
                );
                if attempt < max_attempts {
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                }
                last_error = Some(e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    let last = last_error.unwrap_or_else(|| TransportError::other("no attempt was made"));
    Err(TransferError::RetriesExhausted {
        attempts: max_attempts,
        kind: last.kind,
        message: last.message,
    })
}
