//! Fail-safe session.
//!
//! The session owns the four bound lines for its whole lifetime and is the
//! only code path allowed to address them. Every drive, however it ends,
//! leaves all lines deasserted before control returns to the caller.
//!
//! ## Session lifecycle
//!
//! 1. [`FailSafeSession::open`] binds the (already validated) assignment and
//!    deasserts every line. A bind failure returns no session.
//! 2. `drive*` calls validate their input before touching any line, then run
//!    through the [`Interpreter`].
//! 3. [`FailSafeSession::close`] deasserts, releases the bindings and flips
//!    the state to `Closed`. This happens exactly once; later calls are
//!    no-ops and every `drive*` call fails with `SessionClosed`.
//! 4. Dropping an open session closes it.
//!
//! ## Halt latch
//!
//! A [`HaltHandle`] may be cloned onto other threads (Ctrl-C handler, I/O
//! thread). Triggering it stops the running drive at the next pulse
//! boundary with [`DriveError::Interrupted`]; cleanup still runs. The latch
//! stays set, rejecting new drives, until [`HaltHandle::clear`].

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;

use embedded_hal::digital::OutputPin;
use log::{error, info, warn};

use crate::app::ports::{Clock, LineBinder};
use crate::drivers::lines::SignalLines;
use crate::error::{DriveError, Result};
use crate::motion::DriveRequest;
use crate::motion::interpreter::Interpreter;
use crate::pins::LineAssignment;

// ---------------------------------------------------------------------------
// Halt latch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct HaltHandle(Arc<AtomicBool>);

impl HaltHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        if !self.0.swap(true, Ordering::AcqRel) {
            info!("halt: latch triggered");
        }
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `Err(Interrupted)` while the latch is set.
    pub fn check(&self) -> Result<()> {
        if self.is_triggered() {
            Err(DriveError::Interrupted)
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

pub struct FailSafeSession<P: OutputPin, C: Clock> {
    lines: SignalLines<P>,
    clock: C,
    interpreter: Interpreter,
    halt: HaltHandle,
    state: SessionState,
}

impl<P: OutputPin, C: Clock> FailSafeSession<P, C> {
    pub fn open<B>(
        assignment: LineAssignment,
        binder: &mut B,
        clock: C,
        period: Duration,
    ) -> Result<Self>
    where
        B: LineBinder<Pin = P>,
    {
        let lines = SignalLines::bind(assignment, binder)?;
        info!(
            "session: open on pins {:?}, pulse period {:?}",
            assignment.pins(),
            period
        );
        Ok(Self {
            lines,
            clock,
            interpreter: Interpreter::new(period),
            halt: HaltHandle::new(),
            state: SessionState::Open,
        })
    }

    /// Validate raw board pins (order RF, RB, LF, LB), then [`open`](Self::open).
    ///
    /// An invalid assignment is rejected before `binder` is called.
    pub fn with_pins<B>(pins: [u8; 4], binder: &mut B, clock: C, period: Duration) -> Result<Self>
    where
        B: LineBinder<Pin = P>,
    {
        let [rf, rb, lf, lb] = pins;
        let assignment = LineAssignment::new(rf, rb, lf, lb)?;
        Self::open(assignment, binder, clock, period)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn assignment(&self) -> &LineAssignment {
        self.lines.assignment()
    }

    pub fn period(&self) -> Duration {
        self.interpreter.period()
    }

    pub fn halt_handle(&self) -> HaltHandle {
        self.halt.clone()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Drive `operation` at `duty` for `secs` seconds, then stop.
    pub fn drive(&mut self, operation: &str, duty: i64, secs: f64) -> Result<()> {
        self.ensure_open()?;
        let request = DriveRequest::parse(operation, duty, secs)?;
        self.run(&request)
    }

    /// Run an already validated request.
    pub fn execute(&mut self, request: &DriveRequest) -> Result<()> {
        self.ensure_open()?;
        self.run(request)
    }

    /// Run each `(operation, duty, secs)` entry in order, then deassert.
    ///
    /// Entries are validated as they are reached; the first failure skips
    /// the rest.
    pub fn drive_sequence(&mut self, steps: &[(&str, i64, f64)]) -> Result<()> {
        self.ensure_open()?;
        let outcome = steps.iter().try_for_each(|(op, duty, secs)| {
            let request = DriveRequest::parse(op, *duty, *secs)?;
            self.run(&request)
        });
        self.finish_sequence(outcome)
    }

    /// Validated counterpart of [`drive_sequence`](Self::drive_sequence).
    pub fn execute_sequence(&mut self, requests: &[DriveRequest]) -> Result<()> {
        self.ensure_open()?;
        let outcome = requests.iter().try_for_each(|request| self.run(request));
        self.finish_sequence(outcome)
    }

    /// Deassert every line now.
    pub fn halt(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.lines.deassert_all()
    }

    /// Deassert, release the bindings and refuse further drives.
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        let cleanup = self.lines.deassert_all();
        self.lines.release();
        self.state = SessionState::Closed;
        if let Err(e) = cleanup {
            error!("session: lines not deasserted on close: {}", e);
        }
        info!("session: closed");
        cleanup
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Closed => Err(DriveError::SessionClosed),
        }
    }

    fn run(&mut self, request: &DriveRequest) -> Result<()> {
        self.interpreter
            .execute(&mut self.lines, &mut self.clock, &self.halt, request)
    }

    fn finish_sequence(&mut self, outcome: Result<()>) -> Result<()> {
        let cleanup = self.lines.deassert_all();
        match (outcome, cleanup) {
            (Err(e), Err(c)) => {
                warn!("session: halt after failed sequence also failed: {}", c);
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), cleanup) => cleanup,
        }
    }
}

impl<P: OutputPin, C: Clock> Drop for FailSafeSession<P, C> {
    fn drop(&mut self) {
        if self.is_open() {
            let _ = self.close();
        }
    }
}
