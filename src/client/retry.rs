//! Exponential backoff policy.

use std::time::Duration;

/// Backoff for retryable failures: the delay doubles from `initial_delay`
/// up to `max_delay`. With `max_attempts` unset, retries never stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(30_000),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after `current`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        current
            .checked_mul(2)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Whether `attempts` made so far use up the budget.
    pub fn exhausted(&self, attempts: u32) -> bool {
        matches!(self.max_attempts, Some(max) if attempts >= max)
    }

    /// Successive backoff delays.
    #[cfg(test)]
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let policy = *self;
        std::iter::successors(Some(self.initial_delay.min(self.max_delay)), move |d| {
            Some(policy.next_delay(*d))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_then_cap() {
        let delays: Vec<u128> = RetryPolicy::default()
            .delays()
            .take(15)
            .map(|d| d.as_millis())
            .collect();

        assert_eq!(&delays[..5], &[10, 20, 40, 80, 160]);
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert!(delays.iter().all(|d| *d <= 30_000));
        assert_eq!(*delays.last().unwrap(), 30_000);
    }

    #[test]
    fn test_exhausted() {
        let unbounded = RetryPolicy::default();
        assert!(!unbounded.exhausted(u32::MAX));

        let capped = RetryPolicy {
            max_attempts: Some(2),
            ..RetryPolicy::default()
        };
        assert!(!capped.exhausted(1));
        assert!(capped.exhausted(2));
    }
}
