//! Trailing debounce for color domain recomputes.

use std::time::Duration;

use tokio::time::Instant;

/// Default delay between the last viewport load and a domain recompute.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Trailing-edge debouncer driven by explicit timestamps.
///
/// Each [`Debouncer::request`] pushes the deadline to `now + delay`; the
/// debouncer fires once when polled at or after the deadline.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn request(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` exactly once per burst of requests, when due.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
