//! Inter-thread channels between the I/O thread and the drive worker.
//!
//! Uses `embassy-sync` bounded MPMC channels to bridge the async I/O
//! thread with the blocking drive worker. One [`DriveChannels`] value is
//! created per server and shared through an `Arc` handed to both sides at
//! construction; there are no process-wide statics.
//!
//! ```text
//! ┌──────────────┐  CommandMsg   ┌──────────────┐
//! │  I/O Thread  │─────────────▶│ Drive Worker │
//! │  (async)     │◀─────────────│ (blocking)   │
//! └──────────────┘  ResponseMsg  └──────────────┘
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use super::codec::HttpReply;
use crate::app::commands::DriveCommand;

/// Identifies the connection a response belongs to.
///
/// The serial changes every time a slot accepts a new connection, so a
/// reply that outlives its client is never delivered to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub slot: usize,
    pub serial: u64,
}

/// Validated command from a client, delivered to the drive worker.
pub struct CommandMsg {
    pub ticket: Ticket,
    pub command: DriveCommand,
}

/// Outcome of a command, delivered back to the I/O thread.
pub struct ResponseMsg {
    pub ticket: Ticket,
    pub reply: HttpReply,
}

/// Channel depth for queued commands. A full queue is answered with 503.
pub const CMD_DEPTH: usize = 8;

/// Channel depth for responses.
pub const RESP_DEPTH: usize = 16;

pub struct DriveChannels {
    /// I/O thread → drive worker.
    pub commands: Channel<CriticalSectionRawMutex, CommandMsg, CMD_DEPTH>,
    /// Drive worker → I/O thread.
    pub responses: Channel<CriticalSectionRawMutex, ResponseMsg, RESP_DEPTH>,
    /// Wakes the drive worker for shutdown.
    shutdown: Signal<CriticalSectionRawMutex, ()>,
    /// Polled by the I/O thread.
    stopping: AtomicBool,
}

impl Default for DriveChannels {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveChannels {
    pub const fn new() -> Self {
        Self {
            commands: Channel::new(),
            responses: Channel::new(),
            shutdown: Signal::new(),
            stopping: AtomicBool::new(false),
        }
    }

    /// Ask both threads to stop. The worker finishes its current command
    /// first; queued commands are dropped.
    pub fn request_shutdown(&self) {
        self.stopping.store(true, Ordering::Release);
        self.shutdown.signal(());
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Resolves once [`request_shutdown`](Self::request_shutdown) was called.
    pub async fn shutdown_requested(&self) {
        self.shutdown.wait().await
    }
}
