//! # Deadline Clock
//!
//! Remaining-time arithmetic against absolute deadlines, and the wall-clock
//! source every component reads.

use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// `max(0, deadline - now)`.
pub fn remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (deadline - now).to_std().unwrap_or(Duration::ZERO)
}

/// Fraction of the window already used up, clamped to `[0, 1]`.
///
/// A zero-length window counts as fully elapsed.
pub fn elapsed_ratio(remaining: Duration, window: Duration) -> f64 {
    if window.is_zero() {
        return 1.0;
    }
    (1.0 - remaining.as_secs_f64() / window.as_secs_f64()).clamp(0.0, 1.0)
}

/// Source of wall-clock time.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The host's clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.lock() = to;
    }

    pub fn advance(&self, by: Duration) {
        let step = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
        *self.lock() += step;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A poisoned clock still holds a valid instant.
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_remaining_is_never_negative() {
        let deadline = t0() + chrono::Duration::seconds(120);
        assert_eq!(remaining(deadline, t0()), Duration::from_secs(120));
        assert_eq!(remaining(deadline, deadline), Duration::ZERO);
        assert_eq!(
            remaining(deadline, deadline + chrono::Duration::seconds(1)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_remaining_is_non_increasing_over_ticks() {
        let deadline = t0() + chrono::Duration::seconds(5);
        let clock = ManualClock::new(t0());
        let mut last = remaining(deadline, clock.now());
        for _ in 0..8 {
            clock.advance(Duration::from_secs(1));
            let next = remaining(deadline, clock.now());
            assert!(next <= last);
            last = next;
        }
        assert_eq!(last, Duration::ZERO);
    }

    #[test]
    fn test_elapsed_ratio_is_clamped() {
        let window = Duration::from_secs(120);
        assert_eq!(elapsed_ratio(Duration::from_secs(60), window), 0.5);
        assert_eq!(elapsed_ratio(Duration::from_secs(500), window), 0.0);
        assert_eq!(elapsed_ratio(Duration::ZERO, window), 1.0);
        assert_eq!(elapsed_ratio(Duration::from_secs(3), Duration::ZERO), 1.0);
    }
}
