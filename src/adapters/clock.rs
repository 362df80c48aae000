//! Wall-clock time adapter.
//!
//! Implements [`Clock`] with `std::time::Instant` and a blocking
//! `std::thread::sleep`. Pulse timing accuracy is bounded by the OS
//! scheduler, which is well inside one pulse period on a Raspberry Pi.

use std::time::{Duration, Instant};

use crate::app::ports::Clock;

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time since the clock was created.
    pub fn uptime(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
