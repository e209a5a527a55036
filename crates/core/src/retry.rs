//! Exponential-backoff retry policy for transient step failures.
//!
//! Transient failures (network/storage/timeout) retry with increasing
//! delays up to a bounded attempt count. Permanent failures never reach
//! this module — see [`crate::error::PipelineError::is_transient`].

use std::time::Duration;

use rand::Rng;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based: the delay after the
    /// first failure is `delay_for_attempt(1)`). Clamped to `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        let ms = self.base_delay.as_millis() as f64 * self.multiplier.powi(exp as i32);
        Duration::from_millis(ms as u64).min(self.max_delay)
    }

    /// Like [`delay_for_attempt`](Self::delay_for_attempt) with up to 20%
    /// random jitter added, so concurrent jobs do not retry in lockstep.
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let base = self.delay_for_attempt(attempt);
        let jitter_ms = rand::rng().random_range(0..=base.as_millis() as u64 / 5);
        (base + Duration::from_millis(jitter_ms)).min(self.max_delay)
    }

    /// Whether another attempt is allowed after `attempts_so_far` tries.
    pub fn should_retry(&self, attempts_so_far: u32) -> bool {
        attempts_so_far < self.max_attempts
    }
}
