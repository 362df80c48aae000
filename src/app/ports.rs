//! Port traits: the hexagonal boundary between the drive core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ FailSafeSession / DriveService (domain)
//! ```
//!
//! The core needs exactly two capabilities from its environment: setting a
//! digital output line HIGH or LOW (an [`embedded_hal::digital::OutputPin`]
//! obtained through a [`LineBinder`]) and sleeping for a duration
//! ([`Clock`]). Events leave the core through an [`EventSink`].

use core::fmt;
use std::time::{Duration, Instant};

use embedded_hal::digital::OutputPin;

use crate::motion::LineRole;

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source with a blocking sleep.
///
/// Pulse timing runs synchronously on the drive worker, so `sleep` blocks
/// the calling thread for the full duration.
pub trait Clock {
    fn now(&self) -> Instant;

    fn sleep(&mut self, duration: Duration);
}

// ───────────────────────────────────────────────────────────────
// Line binder port
// ───────────────────────────────────────────────────────────────

/// Acquires the physical output line behind a board pin.
///
/// Called once per role while a session is being opened, and only after
/// the pin assignment has been validated. Dropping the returned pin must
/// release the line.
pub trait LineBinder {
    type Pin: OutputPin;
    type Error: fmt::Display;

    fn bind(&mut self, role: LineRole, board_pin: u8) -> Result<Self::Pin, Self::Error>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port
// ───────────────────────────────────────────────────────────────

/// The service emits structured [`DriveEvent`](super::events::DriveEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::DriveEvent);
}
