//! Reconnect policy for the recorder's session loop.
//!
//! A policy value instead of a hardcoded sleep, so the schedule can be
//! bounded in tests and inspected without real delays. The default recorder
//! configuration reproduces the classic fixed-five-second, never-give-up
//! loop.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Retry forever with a fixed delay between attempts.
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Allow at most `max_attempts` sessions in total.
    pub fn bounded(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts),
        }
    }

    /// Delay to wait before the next attempt, given how many sessions have
    /// already completed (i.e. failed or disconnected). `None` means the
    /// budget is spent and the caller should stop.
    pub fn next_delay(&self, completed_attempts: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if completed_attempts >= max => None,
            _ => Some(self.delay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_never_exhausts() {
        let policy = RetryPolicy::unbounded(Duration::from_secs(5));
        assert_eq!(policy.next_delay(0), Some(Duration::from_secs(5)));
        assert_eq!(policy.next_delay(1_000_000), Some(Duration::from_secs(5)));
    }

    #[test]
    fn bounded_stops_after_budget() {
        let policy = RetryPolicy::bounded(Duration::from_millis(10), 3);
        assert!(policy.next_delay(1).is_some());
        assert!(policy.next_delay(2).is_some());
        assert_eq!(policy.next_delay(3), None);
        assert_eq!(policy.next_delay(4), None);
    }
}
