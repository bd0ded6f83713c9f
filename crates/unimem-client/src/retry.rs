//! Retry policy with exponential backoff.
//!
//! The policy is a plain value object: it knows how many attempts to make,
//! how long to wait before each retry and which errors are worth retrying.
//! `retry_async` drives any fallible async operation with it, so the
//! transport's retry loop can be tested without a network.
//!
//! Jitter (off by default) uses `std::time::SystemTime` UNIX nanos as a seed
//! to avoid requiring the `rand` crate as a dependency.

use tracing::{debug, warn};
use unimem_types::config::RetrySettings;
use unimem_types::MemoryError;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Retry configuration plus error classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first try).
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound for any single delay in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter factor (0.0 = no jitter, 1.0 = full jitter).
    ///
    /// The actual sleep is `delay * (1 + random_fraction * jitter)`, where
    /// `random_fraction` is in `[0, 1)`, clamped to `max_delay_ms`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter: 0.0,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.attempts,
            base_delay_ms: settings.delay_ms,
            max_delay_ms: settings.max_delay_ms,
            jitter: settings.jitter,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Backoff before retry number `attempt` (0-indexed).
    ///
    /// Formula: `min(base * 2^attempt, max_delay)`, then jitter.
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        let base = self
            .base_delay_ms
            .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        let capped = base.min(self.max_delay_ms);

        if self.jitter <= 0.0 {
            return capped;
        }

        let frac = pseudo_random_fraction();
        let with_jitter = (capped as f64) + (capped as f64) * frac * self.jitter;
        (with_jitter as u64).min(self.max_delay_ms)
    }

    /// Whether `err` is worth another attempt.
    ///
    /// Retryable: 408, 409, 429, any 5xx, and network errors where no
    /// response arrived. Everything else fails on first sight.
    pub fn is_retryable(&self, err: &MemoryError) -> bool {
        match err {
            MemoryError::Network(_) => true,
            MemoryError::Http { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Status codes that are retried.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 429) || status >= 500
}

/// Return a pseudo-random fraction in `[0, 1)` using the current system time
/// nanos. This is NOT cryptographically secure, but good enough for jitter.
fn pseudo_random_fraction() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    let mixed = nanos.wrapping_mul(2654435761); // Knuth multiplicative hash
    (mixed as f64) / (u32::MAX as f64 + 1.0)
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Result of a retry operation.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// The operation succeeded.
    Success {
        result: T,
        /// Total number of attempts made (1 = first try succeeded).
        attempts: u32,
    },
    /// Gave up: either the error was not retryable or attempts ran out.
    Exhausted {
        /// The error from the last attempt.
        last_error: E,
        attempts: u32,
    },
}

/// Execute an async operation with retry.
///
/// - `operation` is called once per attempt with the 0-indexed attempt number.
/// - `should_retry` decides whether a failed attempt may be retried.
/// - `on_retry` observes each scheduled retry (error, attempt, delay in ms)
///   before the sleep.
///
/// Attempts are strictly sequential.
pub async fn retry_async<F, Fut, T, E, P, N>(
    policy: &RetryPolicy,
    mut operation: F,
    should_retry: P,
    mut on_retry: N,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    N: FnMut(&E, u32, u64),
    E: std::fmt::Debug,
{
    let max = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        attempt = attempt + 1,
                        "retry succeeded after {} previous failures", attempt
                    );
                }
                return RetryOutcome::Success {
                    result,
                    attempts: attempt + 1,
                };
            }
            Err(err) => {
                let retryable = should_retry(&err);
                if !retryable {
                    debug!(
                        attempt = attempt + 1,
                        "error is not retryable, giving up: {:?}", err
                    );
                    return RetryOutcome::Exhausted {
                        last_error: err,
                        attempts: attempt + 1,
                    };
                }
                if attempt + 1 >= max {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = max,
                        "all retry attempts exhausted: {:?}",
                        err
                    );
                    return RetryOutcome::Exhausted {
                        last_error: err,
                        attempts: attempt + 1,
                    };
                }

                let delay_ms = policy.delay_ms(attempt);
                debug!(
                    attempt = attempt + 1,
                    delay_ms, "retrying after error: {:?}", err
                );
                on_retry(&err, attempt + 1, delay_ms);

                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                attempt += 1;
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
