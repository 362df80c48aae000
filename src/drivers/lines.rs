//! Signal line abstraction for the two H-bridge channels.
//!
//! Owns the four bound output lines. The H-bridge inputs are active-low:
//! asserting a role drives its line LOW, deasserting drives it HIGH.
//!
//! ## Safety contract
//!
//! [`SignalLines::deassert_all`] is the single chokepoint every cleanup
//! path goes through. It attempts all four lines even when one write fails.
//! Once [`release`](SignalLines::release) has run, every operation fails
//! with [`DriveError::SessionClosed`].

use embedded_hal::digital::{Error as _, OutputPin};
use log::{trace, warn};

use crate::app::ports::LineBinder;
use crate::error::{DriveError, Result};
use crate::motion::{LinePattern, LineRole};
use crate::pins::LineAssignment;

pub struct SignalLines<P> {
    assignment: LineAssignment,
    /// `None` once released.
    pins: Option<[P; 4]>,
}

impl<P: OutputPin> SignalLines<P> {
    /// Bind all four roles through `binder`, then deassert every line.
    ///
    /// If any bind fails, lines bound so far are dropped (released) and no
    /// controller is returned.
    pub fn bind<B>(assignment: LineAssignment, binder: &mut B) -> Result<Self>
    where
        B: LineBinder<Pin = P>,
    {
        let mut bound = Vec::with_capacity(LineRole::ALL.len());
        for role in LineRole::ALL {
            let pin = assignment.pin(role);
            match binder.bind(role, pin) {
                Ok(line) => bound.push(line),
                Err(e) => {
                    warn!("lines: binding {} to pin {} failed: {}", role, pin, e);
                    return Err(DriveError::LineSetup(role));
                }
            }
        }

        let pins: [P; 4] = bound
            .try_into()
            .map_err(|_| DriveError::LineSetup(LineRole::LeftBackward))?;
        Self::from_pins(assignment, pins)
    }

    /// Wrap already-acquired lines (order RF, RB, LF, LB) and deassert them.
    pub fn from_pins(assignment: LineAssignment, pins: [P; 4]) -> Result<Self> {
        let mut lines = Self {
            assignment,
            pins: Some(pins),
        };
        lines.deassert_all()?;
        Ok(lines)
    }

    pub fn assignment(&self) -> &LineAssignment {
        &self.assignment
    }

    pub fn is_bound(&self) -> bool {
        self.pins.is_some()
    }

    /// Drive `role` to its active (LOW) level.
    pub fn assert(&mut self, role: LineRole) -> Result<()> {
        trace!("lines: assert {}", role);
        let line = self.line(role)?;
        line.set_low().map_err(|e| {
            warn!("lines: {} set_low failed: {:?}", role, e.kind());
            DriveError::LineFault(role)
        })
    }

    /// Drive `role` to its idle (HIGH) level.
    pub fn deassert(&mut self, role: LineRole) -> Result<()> {
        trace!("lines: deassert {}", role);
        let line = self.line(role)?;
        line.set_high().map_err(|e| {
            warn!("lines: {} set_high failed: {:?}", role, e.kind());
            DriveError::LineFault(role)
        })
    }

    /// Assert every line the pattern marks active. Other lines are untouched.
    pub fn apply(&mut self, pattern: LinePattern) -> Result<()> {
        for role in pattern.active_roles() {
            self.assert(role)?;
        }
        Ok(())
    }

    /// Deassert all four lines, returning the first failure.
    pub fn deassert_all(&mut self) -> Result<()> {
        if self.pins.is_none() {
            return Err(DriveError::SessionClosed);
        }
        let mut first_err = None;
        for role in LineRole::ALL {
            if let Err(e) = self.deassert(role) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Drop the bound lines, returning them to the system.
    pub fn release(&mut self) {
        if self.pins.take().is_some() {
            log::info!("lines: released pins {:?}", self.assignment.pins());
        }
    }

    fn line(&mut self, role: LineRole) -> Result<&mut P> {
        self.pins
            .as_mut()
            .map(|pins| &mut pins[role.index()])
            .ok_or(DriveError::SessionClosed)
    }
}
