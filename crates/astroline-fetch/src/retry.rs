//! Bounded retry with exponential backoff and jitter.
//!
//! The policy is an explicit value passed into the fetcher, so retry
//! behaviour is testable without touching real I/O.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use astroline_core::config::RetrySettings;

/// Classifies an error as worth retrying or permanent.
///
/// Transient: connection failures, timeouts, upstream 5xx. Permanent:
/// malformed requests, 4xx, parse outcomes.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

/// Retry tuning for upstream fetches.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay: Duration,
    /// Ceiling on any single delay.
    pub max_delay: Duration,
    /// Add up to +100% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(s: &RetrySettings) -> Self {
        Self {
            max_attempts: s.max_attempts,
            base_delay: Duration::from_secs(s.base_delay_secs),
            max_delay: Duration::from_secs(s.max_delay_secs),
            jitter: true,
        }
    }
}

/// Run `operation` until it succeeds, its error is permanent, or the
/// attempt budget is spent. Returns the last error on exhaustion.
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut attempt: u32 = 1;
    let mut delay = policy.base_delay;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(attempts = attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                warn!(
                    error = %e,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "transient failure, retrying"
                );
                let wait = if policy.jitter { jittered(delay) } else { delay };
                tokio::time::sleep(wait).await;
                delay = (delay * 2).min(policy.max_delay);
                attempt += 1;
            }
            Err(e) => {
                warn!(error = %e, attempts = attempt, "operation failed, giving up");
                return Err(e);
            }
        }
    }
}

/// Uniform jitter between `delay` and `2 * delay`.
fn jittered(delay: Duration) -> Duration {
    let factor: f64 = rand::thread_rng().gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + factor))
}
