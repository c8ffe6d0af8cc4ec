//! Per-alert countdown toward the acceptance deadline.

use crate::clock;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Result of one countdown step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Running { remaining: Duration, progress: f64 },
    /// Reached zero on this step. Reported exactly once.
    Expired,
    /// Already expired on an earlier step.
    Finished,
}

/// Remaining time for one order, recomputed from the wall clock on every step.
///
/// The remaining value only ever shrinks: a wall clock stepping backwards is
/// ignored rather than shown as time coming back.
#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    deadline: DateTime<Utc>,
    window: Duration,
    remaining: Option<Duration>,
    expired: bool,
}

impl Countdown {
    pub fn new(deadline: DateTime<Utc>, window: Duration) -> Self {
        Self {
            deadline,
            window,
            remaining: None,
            expired: false,
        }
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.expired {
            return TickOutcome::Finished;
        }
        let observed = clock::remaining(self.deadline, now);
        let remaining = self.remaining.map_or(observed, |last| last.min(observed));
        self.remaining = Some(remaining);

        if remaining.is_zero() {
            self.expired = true;
            return TickOutcome::Expired;
        }
        TickOutcome::Running {
            remaining,
            progress: self.progress(),
        }
    }

    /// Last observed remaining time; the full window before the first step.
    pub fn remaining(&self) -> Duration {
        self.remaining.unwrap_or(self.window)
    }

    /// Share of the window used up, for the countdown bar.
    pub fn progress(&self) -> f64 {
        clock::elapsed_ratio(self.remaining(), self.window)
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }
}
