//! Retry utilities for transient network failures
//!
//! Exponential backoff with optional jitter. Callers learn how many attempts
//! were made whether the operation eventually succeeded or not, so per-source
//! statistics can report it.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::errors::TransportError;
use crate::utils::jitter::generate_jitter_percent;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Random extra delay as a percentage of the computed delay
    pub jitter_percent: u8,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_percent: 25,
        }
    }
}

impl From<&FetchConfig> for RetryConfig {
    fn from(fetch: &FetchConfig) -> Self {
        Self {
            max_attempts: fetch.max_attempts.max(1),
            initial_delay: fetch.initial_backoff,
            max_delay: fetch.max_backoff,
            backoff_multiplier: fetch.backoff_multiplier,
            jitter_percent: fetch.jitter_percent,
        }
    }
}

impl RetryConfig {
    /// A policy without delays, for tests and one-shot tools
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter_percent: 0,
        }
    }
}

/// Errors that know whether another attempt is worthwhile
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for TransportError {
    fn is_retryable(&self) -> bool {
        TransportError::is_retryable(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome<T> {
    pub value: T,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFailure<E> {
    /// The error of the final attempt
    pub error: E,
    pub attempts: u32,
}

/// Execute an operation with retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration
/// * `operation` - Async closure performing one attempt
/// * `operation_name` - Human-readable name for logging
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    mut operation: F,
    operation_name: &str,
) -> Result<RetryOutcome<T>, RetryFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        "Operation '{}' succeeded on attempt {}/{}",
                        operation_name, attempt, max_attempts
                    );
                }
                return Ok(RetryOutcome {
                    value,
                    attempts: attempt,
                });
            }
            Err(err) => {
                if !err.is_retryable() {
                    debug!(
                        "Operation '{}' failed with non-retryable error: {}",
                        operation_name, err
                    );
                    return Err(RetryFailure {
                        error: err,
                        attempts: attempt,
                    });
                }

                if attempt >= max_attempts {
                    warn!(
                        "Operation '{}' failed after {} attempts: {}",
                        operation_name, attempt, err
                    );
                    return Err(RetryFailure {
                        error: err,
                        attempts: attempt,
                    });
                }

                let delay = calculate_delay(config, attempt);
                warn!(
                    "Operation '{}' failed on attempt {}/{}, retrying in {:?}: {}",
                    operation_name, attempt, max_attempts, delay, err
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Delay to wait after the given (1-based) failed attempt
pub fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16) as i32;
    let base_ms = config.initial_delay.as_millis() as f64 * config.backoff_multiplier.powi(exponent);
    let capped_ms = base_ms.min(config.max_delay.as_millis() as f64).max(0.0) as u64;
    let jitter_ms = generate_jitter_percent(capped_ms, config.jitter_percent);
    Duration::from_millis(capped_ms + jitter_ms)
}
