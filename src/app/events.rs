//! Outbound drive events.
//!
//! The [`DriveService`](super::service::DriveService) emits these through
//! the [`EventSink`](super::ports::EventSink) port. The log adapter renders
//! them as single lines; tests record them.

use core::time::Duration;

use crate::error::DriveError;

/// Structured events emitted by the drive service.
#[derive(Debug, Clone, PartialEq)]
pub enum DriveEvent {
    /// The session is bound and all lines are deasserted.
    Ready { pins: [u8; 4] },

    /// A command was taken off the queue.
    CommandStarted { seq: u64, steps: usize },

    /// A command ran to completion; lines are deasserted.
    CommandCompleted { seq: u64, elapsed: Duration },

    /// A command failed; lines were deasserted before this was emitted.
    CommandFailed { seq: u64, error: DriveError },

    /// The session was closed and the lines released.
    Closed { completed: u64, failed: u64 },
}
