//! Retry policy for source-client adapters (§4.4: "each client owns its own
//! retry policy with exponential backoff; the orchestrator does not
//! retry"). Grounded on the `RetryPolicy` / `with_retry` pair used by the
//! teacher's remote-node client.

use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Exponential backoff with full jitter, bounded by `max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::default_jitter(3)
    }
}

impl RetryPolicy {
    /// Exponential backoff with full jitter: attempt `n` waits a random
    /// duration in `[0, base_delay * 2^n]`, capped at `max_delay`.
    pub fn default_jitter(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            jitter: true,
        }
    }

    /// Plain exponential backoff with no jitter, mainly useful for
    /// deterministic tests.
    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            jitter: false,
        }
    }

    /// No retries: the first failure is final. Useful for tests that want
    /// deterministic single-shot behavior.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = 2u32.saturating_pow(attempt).min(1 << 20);
        let scaled = self.base_delay.saturating_mul(exp).min(self.max_delay);
        if self.jitter && !scaled.is_zero() {
            let millis = scaled.as_millis().max(1) as u64;
            let jittered = rand::thread_rng().gen_range(0..=millis);
            Duration::from_millis(jittered)
        } else {
            scaled
        }
    }
}

/// Run `operation` until it succeeds or `policy.max_attempts` is exhausted,
/// sleeping with exponential backoff between attempts. Only errors for
/// which `is_retryable` returns `true` are retried; a non-retryable error
/// returns immediately.
pub async fn with_retry<T, E, F, Fut>(
    policy: RetryPolicy,
    operation_name: &str,
    is_retryable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts || !is_retryable(&err) {
                    return Err(err);
                }
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    operation = operation_name,
                    attempt, %err, delay_ms = delay.as_millis() as u64,
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
