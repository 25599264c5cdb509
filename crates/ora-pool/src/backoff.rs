//! Exponential backoff for validation retries.

use std::time::Duration;

/// Exponential backoff between retries of a transient failure.
///
/// Attempt 0 waits `initial`, each further attempt multiplies the delay by
/// `multiplier`, capped at `max`.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffStrategy {
    initial: Duration,
    max: Duration,
    multiplier: f64,
}

impl BackoffStrategy {
    /// Create a strategy with the given initial and maximum delays.
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.max(Duration::from_millis(1));
        Self {
            initial,
            max: max.max(initial),
            multiplier: 2.0,
        }
    }

    /// Set the growth multiplier (at least 1.0).
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Delay before retry number `attempt` (zero-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial.as_secs_f64() * self.multiplier.powi(exp);
        if !secs.is_finite() || secs >= self.max.as_secs_f64() {
            return self.max;
        }
        Duration::from_secs_f64(secs)
    }

    /// The initial delay.
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        self.initial
    }

    /// The maximum delay.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max
    }
}

impl Default for BackoffStrategy {
    /// 50ms initial, 1s max, doubling.
    fn default() -> Self {
        Self::new(Duration::from_millis(50), Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_and_caps() {
        let backoff = BackoffStrategy::new(Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(3), Duration::from_millis(500));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_millis(500));
    }

    #[test]
    fn test_minimums_are_enforced() {
        let backoff = BackoffStrategy::new(Duration::ZERO, Duration::ZERO).with_multiplier(0.5);
        assert_eq!(backoff.initial_delay(), Duration::from_millis(1));
        assert_eq!(backoff.max_delay(), Duration::from_millis(1));
        assert_eq!(backoff.delay(4), Duration::from_millis(1));
    }
}
