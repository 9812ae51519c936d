use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The single backoff policy used everywhere a page operation is retried.
/// Delays grow exponentially from `base_delay_ms` and are capped at
/// `cap_ms` so a misconfigured multiplier cannot stall a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub cap_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            multiplier: 2.0,
            cap_ms: 60_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before the given attempt (1-based). Attempt 1 waits the base
    /// delay, attempt 2 waits base * multiplier, and so on.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(24);
        let raw = self.base_delay_ms as f64 * self.multiplier.powi(exp as i32);
        let capped = raw.min(self.cap_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
