//! Quiet-period debouncing of typed queries
//!
//! There is exactly one pending timer. A new submission replaces it, so a
//! burst of keystrokes fires once, with the last value typed. The timer is a
//! deadline that the owner checks on each tick of its loop; nothing here
//! sleeps or spawns.

use std::time::{Duration, Instant};

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

#[derive(Debug)]
struct PendingQuery {
    text: String,
    deadline: Instant,
}

#[derive(Debug)]
pub struct QueryDebouncer {
    quiet_period: Duration,
    pending: Option<PendingQuery>,
}

impl Default for QueryDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

impl QueryDebouncer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    pub fn submit(&mut self, raw: impl Into<String>) {
        self.submit_at(raw, Instant::now());
    }

    /// Cancel the pending timer (if any) and start a new one at `now`.
    pub fn submit_at(&mut self, raw: impl Into<String>, now: Instant) {
        self.pending = Some(PendingQuery {
            text: raw.into(),
            deadline: now + self.quiet_period,
        });
    }

    pub fn fire(&mut self) -> Option<String> {
        self.fire_at(Instant::now())
    }

    /// Take the pending value if its quiet period has elapsed by `now`.
    /// An empty string is returned as-is: it is a valid show-all query.
    pub fn fire_at(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some(pending) if now >= pending.deadline => self.pending.take().map(|p| p.text),
            _ => None,
        }
    }

    /// Drop the pending timer. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }
}
