//! Retry with exponential backoff for rate-limited provider calls

use crate::{EngineError, Result};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder, backoff::Backoff};
use std::time::Duration;
use tracing::{debug, warn};

/// Substrings identifying rate-limit or quota failures in provider messages
const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "quota", "too many requests", "429"];

/// Retry behaviour for provider calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: usize,
    /// Wait before the second attempt
    pub initial_backoff: Duration,
    /// Upper bound for a single wait
    pub max_backoff: Duration,
    /// Growth factor between waits
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` attempts without waiting in between
    #[must_use]
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }
}

/// True when a provider message describes a rate limit or exhausted quota
#[must_use]
pub fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m))
}

/// Run `f`, retrying retryable failures with exponential backoff
///
/// Only [`EngineError::is_retryable`] errors are retried. When attempts run
/// out the last error is returned unchanged.
///
/// # Errors
///
/// Returns the first non-retryable error, or the last retryable one.
pub fn retry_with_backoff<T, F>(policy: &RetryPolicy, operation_name: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut backoff = create_backoff(policy);
    let mut attempts = 0;

    loop {
        attempts += 1;

        match f() {
            Ok(result) => {
                if attempts > 1 {
                    debug!(
                        operation = operation_name,
                        attempts = attempts,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !err.is_retryable() {
                    debug!(
                        operation = operation_name,
                        error = %err,
                        "Error is not retryable, failing immediately"
                    );
                    return Err(err);
                }

                if attempts >= policy.max_attempts {
                    warn!(
                        operation = operation_name,
                        attempts = attempts,
                        error = %err,
                        "Operation failed after maximum retries"
                    );
                    return Err(err);
                }

                let Some(duration) = backoff.next_backoff() else {
                    return Err(err);
                };
                warn!(
                    operation = operation_name,
                    attempts = attempts,
                    error = %err,
                    retry_in_ms = duration.as_millis(),
                    "Operation failed, retrying"
                );
                std::thread::sleep(duration);
            }
        }
    }
}

fn create_backoff(policy: &RetryPolicy) -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(policy.initial_backoff)
        .with_max_interval(policy.max_backoff)
        .with_multiplier(policy.multiplier)
        .with_randomization_factor(0.0)
        .with_max_elapsed_time(None)
        .build()
}

/// Map an error message to a rate-limit or plain request error
pub(crate) fn classify_failure(engine: &str, message: String) -> EngineError {
    if is_rate_limit_message(&message) {
        EngineError::RateLimited {
            engine: engine.to_string(),
            message,
        }
    } else {
        EngineError::request(engine, message)
    }
}
