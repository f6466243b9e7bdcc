// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Retry utilities with exponential backoff for the statistics fetch.
///
/// Only failures the caller marks as transient are retried; everything else
/// is returned on the first attempt.
use std::{fmt::Display, future::Future, time::Duration};

use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior with exponential backoff.
#[derive(Debug, Clone, PartialEq,)]
pub struct RetryConfig
{
    /// Maximum number of attempts, the first one included (default: 3).
    pub max_attempts:   u32,
    /// Delay before the second attempt (default: 500ms).
    pub initial_delay:  Duration,
    /// Multiplier applied to the delay after every failed attempt
    /// (default: 2.0).
    pub backoff_factor: f64,
}

impl Default for RetryConfig
{
    fn default() -> Self
    {
        Self {
            max_attempts:   3,
            initial_delay:  Duration::from_millis(500,),
            backoff_factor: 2.0,
        }
    }
}

/// Executes an async operation, retrying transient failures with exponential
/// backoff.
///
/// # Arguments
///
/// * `config` - Retry configuration (max attempts, delays)
/// * `operation_name` - Name of the operation for logging
/// * `f` - Async function to retry
/// * `is_transient` - Decides whether a failure is worth another attempt
///
/// # Errors
///
/// Returns the first non-transient error, or the last error once all
/// attempts are used.
///
/// # Example
///
/// ```no_run
/// use codestats_readme::{RetryConfig, retry_with_backoff};
/// use masterror::AppError;
///
/// # async fn example() -> Result<(), AppError> {
/// let config = RetryConfig::default();
/// let value = retry_with_backoff(
///     &config,
///     "fetch statistics",
///     || async { Ok::<_, AppError,>(42,) },
///     |_: &AppError| true,
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_with_backoff<F, Fut, T, E, P,>(
    config: &RetryConfig,
    operation_name: &str,
    mut f: F,
    is_transient: P,
) -> Result<T, E,>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E,>,>,
    E: Display,
    P: Fn(&E,) -> bool,
{
    let max_attempts = config.max_attempts.max(1,);
    let mut attempt = 1;
    let mut delay = config.initial_delay;

    loop {
        match f().await {
            Ok(result,) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result,);
            }
            Err(error,) => {
                if !is_transient(&error,) {
                    return Err(error,);
                }
                if attempt >= max_attempts {
                    warn!("{} failed after {} attempts: {}", operation_name, max_attempts, error);
                    return Err(error,);
                }

                warn!(
                    "{} failed on attempt {}/{}: {}. Retrying in {:?}...",
                    operation_name, attempt, max_attempts, error, delay
                );

                sleep(delay,).await;
                delay = delay.mul_f64(config.backoff_factor,);
                attempt += 1;
            }
        }
    }
}
