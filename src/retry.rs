//! Retry logic with exponential backoff
//!
//! Used for Bot API calls that fail transiently (timeouts, connection
//! resets, 5xx, 429). Downloads themselves are never retried automatically;
//! the user resubmits the link instead.
//!
//! # Example
//!
//! ```no_run
//! use tubedrop::retry::{IsRetryable, with_retry};
//! use tubedrop::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! with_retry(&config, || async { Ok::<_, MyError>(()) }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;

    /// Wait demanded by the remote side, overriding the backoff delay
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
            }
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            Error::RateLimited { .. } => true,
            // Flood control without parameters and 5xx responses from the Bot API
            Error::Transport(msg) => {
                msg.contains("Too Many Requests")
                    || msg.contains("retry after")
                    || msg.contains("HTTP 5")
            }
            Error::Config { .. }
            | Error::Classification(_)
            | Error::Download(_)
            | Error::SizeLimitExceeded { .. }
            | Error::UploadFailed(_)
            | Error::SessionExpired
            | Error::Serialization(_)
            | Error::ExternalTool(_)
            | Error::ApiServerError(_)
            | Error::Other(_) => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// Returns the successful result or the last error after all retry attempts
/// are exhausted. Non-retryable errors return immediately.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                let wait = match e.retry_after() {
                    Some(requested) => requested,
                    None if config.jitter => add_jitter(delay),
                    None => delay,
                };

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = wait.as_millis(),
                    "Operation failed, retrying"
                );

                tokio::time::sleep(wait).await;

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The actual delay will be between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
