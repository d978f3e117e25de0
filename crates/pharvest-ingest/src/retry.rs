//! Bounded retry with slow-growth backoff.
//!
//! One `RetryPolicy` object wraps every fallible operation in the pipeline:
//! page fetches, sequence-file downloads, and per-field extraction. The
//! policy knows nothing about what it wraps; the wrapped error decides via
//! [`Transient`] whether a failure is worth another attempt. Non-transient
//! failures (parse errors, client-side HTTP statuses) propagate on the
//! first attempt.
//!
//! The delay grows logarithmically, `base + log2(attempt) * scale`, so a
//! very large attempt budget still produces a near-flat wait curve instead
//! of exponential blowup: with the defaults, retry 1 sleeps 60s and retry
//! 512 sleeps 150s.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Reference attempt budget for network operations.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 623;

/// Reference base delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(60);

/// Reference per-log2 delay increment.
pub const DEFAULT_DELAY_SCALE: Duration = Duration::from_secs(10);

/// Classifies an error as retryable or not.
///
/// Transient means transport-level: timeouts, connection resets, server
/// overload. Data errors are never transient; retrying a parse failure
/// re-reads the same bytes.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// A bounded-retry/backoff decorator for fallible operations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    delay_scale: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY, DEFAULT_DELAY_SCALE)
    }
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` counts every invocation including
    /// the first, and is clamped to at least 1.
    pub fn new(max_attempts: u32, base_delay: Duration, delay_scale: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            delay_scale,
        }
    }

    /// Same delays, different attempt budget. Used for the sequence
    /// resolver's tighter inner budget.
    pub fn with_max_attempts(&self, max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..self.clone()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay slept before retrying after failed attempt number `attempt`
    /// (1-based): `base + log2(attempt) * scale`. Monotonically
    /// non-decreasing in `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        self.base_delay + self.delay_scale.mul_f64(f64::from(attempt).log2())
    }

    /// Invoke `op` until it succeeds, fails non-transiently, or the
    /// attempt budget runs out. The final failure propagates without a
    /// trailing sleep.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        E: Transient + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if attempt >= self.max_attempts => {
                    warn!(
                        attempts = attempt,
                        error = %err,
                        "retry budget exhausted"
                    );
                    return Err(err);
                },
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                },
            }
        }
    }

    /// Synchronous variant for parse-stage operations, composed around
    /// per-field extraction. Extraction failures are never transient, so
    /// this never sleeps in practice; the loop exists so the same policy
    /// object decorates every stage uniformly.
    pub fn run_sync<T, E>(&self, mut op: impl FnMut() -> Result<T, E>) -> Result<T, E>
    where
        E: Transient + std::fmt::Display,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if attempt >= self.max_attempts => {
                    warn!(attempts = attempt, error = %err, "retry budget exhausted");
                    return Err(err);
                },
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    warn!(attempt, error = %err, "transient failure, backing off");
                    std::thread::sleep(delay);
                },
            }
        }
    }
}
