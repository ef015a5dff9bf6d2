//! # Backoff
//!
//! Two delay generators:
//!
//! - [`FibonacciBackoff`] spaces out requeues of an object whose reconcile
//!   keeps failing: 5s, 5s, 10s, 15s, 25s, ... capped at 5 minutes.
//! - [`ConflictBackoff`] spaces out status writes rejected with a conflict:
//!   10ms, 50ms, 250ms, ... with 10% jitter, for a bounded number of attempts.

use rand::Rng;
use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, starting from `min_seconds`
/// twice and capped at `max_seconds`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_seconds: u64,
    prev_seconds: u64,
    current_seconds: u64,
    max_seconds: u64,
}

impl FibonacciBackoff {
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            min_seconds,
            prev_seconds: 0,
            current_seconds: min_seconds,
            max_seconds,
        }
    }

    /// Next delay, advancing the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current_seconds;

        let next = self.prev_seconds + self.current_seconds;
        self.prev_seconds = self.current_seconds;
        self.current_seconds = std::cmp::min(next, self.max_seconds);

        Duration::from_secs(result)
    }

    /// Restart from the minimum, called after a successful reconcile
    pub fn reset(&mut self) {
        self.prev_seconds = 0;
        self.current_seconds = self.min_seconds;
    }
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(5, 300)
    }
}

/// Bounds for retrying an optimistic-concurrency write
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total write attempts, the first one included
    pub attempts: u32,
    pub initial_delay: Duration,
    /// Multiplier applied after every retry
    pub factor: f64,
    /// Fraction of the delay added at random, 0.1 adds up to 10%
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 4,
            initial_delay: Duration::from_millis(10),
            factor: 5.0,
            jitter: 0.1,
        }
    }
}

/// Exponential backoff with jitter driven by a [`RetryConfig`]
#[derive(Debug, Clone)]
pub struct ConflictBackoff {
    remaining: u32,
    delay: Duration,
    factor: f64,
    jitter: f64,
}

impl ConflictBackoff {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            // The first attempt is not preceded by a delay
            remaining: config.attempts.saturating_sub(1),
            delay: config.initial_delay,
            factor: config.factor,
            jitter: config.jitter,
        }
    }

    /// Delay before the next attempt, `None` once attempts are exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let base = self.delay;
        self.delay = scale(base, self.factor);

        if self.jitter > 0.0 {
            let extra = rand::rng().random_range(0.0..self.jitter);
            Some(scale(base, 1.0 + extra))
        } else {
            Some(base)
        }
    }
}

fn scale(delay: Duration, factor: f64) -> Duration {
    Duration::from_nanos((delay.as_nanos() as f64 * factor).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::default();

        let seconds: Vec<u64> = (0..10).map(|_| backoff.next_backoff().as_secs()).collect();
        assert_eq!(seconds, vec![5, 5, 10, 15, 25, 40, 65, 105, 170, 275]);

        // Capped at 5 minutes from here on
        assert_eq!(backoff.next_backoff().as_secs(), 300);
        assert_eq!(backoff.next_backoff().as_secs(), 300);
    }

    #[test]
    fn test_fibonacci_backoff_reset() {
        let mut backoff = FibonacciBackoff::new(1, 10);

        assert_eq!(backoff.next_backoff().as_secs(), 1);
        assert_eq!(backoff.next_backoff().as_secs(), 1);
        assert_eq!(backoff.next_backoff().as_secs(), 2);
        assert_eq!(backoff.next_backoff().as_secs(), 3);

        backoff.reset();

        assert_eq!(backoff.next_backoff().as_secs(), 1);
        assert_eq!(backoff.next_backoff().as_secs(), 1);
        assert_eq!(backoff.next_backoff().as_secs(), 2);
    }

    #[test]
    fn test_conflict_backoff_is_bounded() {
        let config = RetryConfig {
            jitter: 0.0,
            ..RetryConfig::default()
        };
        let mut backoff = ConflictBackoff::new(&config);

        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(10)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(50)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(250)));
        assert_eq!(backoff.next_delay(), None);
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn test_conflict_backoff_jitter_stays_in_range() {
        let config = RetryConfig {
            attempts: 50,
            initial_delay: Duration::from_millis(100),
            factor: 1.0,
            jitter: 0.1,
        };
        let mut backoff = ConflictBackoff::new(&config);

        while let Some(delay) = backoff.next_delay() {
            assert!(delay >= Duration::from_millis(100), "{delay:?}");
            assert!(delay <= Duration::from_millis(110), "{delay:?}");
        }
    }

    #[test]
    fn test_single_attempt_never_retries() {
        let config = RetryConfig {
            attempts: 1,
            ..RetryConfig::default()
        };
        assert_eq!(ConflictBackoff::new(&config).next_delay(), None);
    }
}
