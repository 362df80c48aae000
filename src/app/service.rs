//! Drive service: the hexagonal core.
//!
//! [`DriveService`] owns the one [`FailSafeSession`] of the process and
//! turns validated [`DriveCommand`]s into session calls, reporting each one
//! through the [`EventSink`] port. It is constructed once and handed to the
//! drive worker; nothing else can reach the lines.
//!
//! ```text
//!  DriveCommand ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                   │      DriveService       │
//!  OutputPin x4 ◀── │  FailSafeSession        │ ◀── Clock
//!                   └────────────────────────┘
//! ```

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::error::Result;
use crate::safety::{FailSafeSession, HaltHandle};

use super::commands::DriveCommand;
use super::events::DriveEvent;
use super::ports::{Clock, EventSink};

// ───────────────────────────────────────────────────────────────
// DriveService
// ───────────────────────────────────────────────────────────────

pub struct DriveService<P: OutputPin, C: Clock> {
    session: FailSafeSession<P, C>,
    seq: u64,
    completed: u64,
    failed: u64,
}

impl<P: OutputPin, C: Clock> DriveService<P, C> {
    pub fn new(session: FailSafeSession<P, C>) -> Self {
        Self {
            session,
            seq: 0,
            completed: 0,
            failed: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce the bound pins.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        let pins = self.session.assignment().pins();
        sink.emit(&DriveEvent::Ready { pins });
        info!("DriveService ready on pins {:?}", pins);
    }

    /// Close the session and report totals. Safe to call more than once.
    pub fn shutdown(&mut self, sink: &mut impl EventSink) -> Result<()> {
        let was_open = self.session.is_open();
        let result = self.session.close();
        if was_open {
            sink.emit(&DriveEvent::Closed {
                completed: self.completed,
                failed: self.failed,
            });
        }
        result
    }

    // ── Commands ──────────────────────────────────────────────

    /// Run one command to completion. Lines are deasserted on return.
    pub fn handle_command(
        &mut self,
        command: &DriveCommand,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        self.seq += 1;
        let seq = self.seq;
        sink.emit(&DriveEvent::CommandStarted {
            seq,
            steps: command.steps(),
        });

        let started = self.session.clock().now();
        let result = match command {
            DriveCommand::Single(request) => self.session.execute(request),
            DriveCommand::Sequence(requests) => self.session.execute_sequence(requests),
        };
        let elapsed = self
            .session
            .clock()
            .now()
            .saturating_duration_since(started);

        match result {
            Ok(()) => {
                self.completed += 1;
                sink.emit(&DriveEvent::CommandCompleted { seq, elapsed });
            }
            Err(error) => {
                self.failed += 1;
                warn!("command #{} failed: {}", seq, error);
                sink.emit(&DriveEvent::CommandFailed { seq, error });
            }
        }
        result
    }

    /// Deassert every line immediately.
    pub fn halt(&mut self) -> Result<()> {
        self.session.halt()
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn halt_handle(&self) -> HaltHandle {
        self.session.halt_handle()
    }

    pub fn session(&self) -> &FailSafeSession<P, C> {
        &self.session
    }

    pub fn is_open(&self) -> bool {
        self.session.is_open()
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }
}
