//! Exponential backoff policy.
//!
//! Pure delay computation shared by every retry path in the system. The
//! session manager uses it for transport reconnection; any future retry
//! loop reuses the same function so tuning stays in one place.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Exponent clamp applied before shifting. Attempts beyond this are already
/// saturated at `max` for any practical base/max pair.
const MAX_EXPONENT: u32 = 20;

/// Compute the delay before retry number `attempt` (0-based).
///
/// `delay = min(base * 2^attempt, max)`. Deterministic, no side effects.
/// The exponent is clamped before shifting and the multiplication saturates
/// at `max`, so large attempt counts cannot overflow.
pub fn delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let factor = 1u32 << attempt.min(MAX_EXPONENT);
    match base.checked_mul(factor) {
        Some(d) => d.min(max),
        None => max,
    }
}

/// Tuning for a backoff-driven retry loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base: Duration,

    /// Ceiling applied to every computed delay.
    pub max: Duration,

    /// Retry budget; once exhausted the caller stops retrying.
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
            max_attempts: 3,
        }
    }
}

impl BackoffConfig {
    /// Delay for retry number `attempt` under this configuration.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        delay(attempt, self.base, self.max)
    }

    /// Slower schedule for expensive operations (e.g. provider session setup).
    pub fn slow() -> Self {
        Self {
            base: Duration::from_secs(2),
            max: Duration::from_secs(60),
            max_attempts: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_capped() {
        let base = Duration::from_millis(100);
        let max = Duration::from_secs(2);

        assert_eq!(delay(0, base, max), Duration::from_millis(100));
        assert_eq!(delay(1, base, max), Duration::from_millis(200));
        assert_eq!(delay(2, base, max), Duration::from_millis(400));
        assert_eq!(delay(3, base, max), Duration::from_millis(800));
        assert_eq!(delay(4, base, max), Duration::from_millis(1600));
        assert_eq!(delay(5, base, max), max);
        assert_eq!(delay(6, base, max), max);
    }

    #[test]
    fn non_decreasing_in_attempt() {
        let base = Duration::from_millis(250);
        let max = Duration::from_secs(30);

        let mut previous = Duration::ZERO;
        for attempt in 0..64 {
            let d = delay(attempt, base, max);
            assert!(d >= previous, "delay decreased at attempt {attempt}");
            assert!(d <= max);
            previous = d;
        }
    }

    #[test]
    fn huge_attempt_counts_saturate() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(45);

        assert_eq!(delay(u32::MAX, base, max), max);
        assert_eq!(delay(1_000_000, base, max), max);
    }

    #[test]
    fn zero_base_stays_zero() {
        assert_eq!(
            delay(10, Duration::ZERO, Duration::from_secs(5)),
            Duration::ZERO
        );
    }

    #[test]
    fn config_delegates_to_delay() {
        let config = BackoffConfig {
            base: Duration::from_millis(50),
            max: Duration::from_millis(300),
            max_attempts: 4,
        };

        assert_eq!(config.delay_for(0), Duration::from_millis(50));
        assert_eq!(config.delay_for(2), Duration::from_millis(200));
        assert_eq!(config.delay_for(3), Duration::from_millis(300));
    }
}
