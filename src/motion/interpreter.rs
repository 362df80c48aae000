//! Drive command interpreter.
//!
//! Turns one validated [`DriveRequest`] into line activity:
//!
//! ```text
//!   wait (idle op or zero duty) ──▶ deassert, sleep duration, deassert
//!   duration == 0               ──▶ deassert, return
//!   otherwise                   ──▶ deadline = now + duration
//!                                   pulses = floor(duration / period)
//!                                   PulseGenerator::run
//!                                   deassert_all (always)
//!                                   sleep until deadline (success only)
//! ```
//!
//! Every path ends with all four lines deasserted, or with the first
//! hardware error that prevented it.

use core::time::Duration;

use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use super::pulse::PulseGenerator;
use super::{DriveRequest, PulseCount};
use crate::app::ports::Clock;
use crate::drivers::lines::SignalLines;
use crate::error::Result;
use crate::safety::HaltHandle;

#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter {
    generator: PulseGenerator,
}

impl Interpreter {
    pub const fn new(period: Duration) -> Self {
        Self {
            generator: PulseGenerator::new(period),
        }
    }

    pub const fn period(&self) -> Duration {
        self.generator.period()
    }

    pub fn execute<P, C>(
        &self,
        lines: &mut SignalLines<P>,
        clock: &mut C,
        halt: &HaltHandle,
        request: &DriveRequest,
    ) -> Result<()>
    where
        P: OutputPin,
        C: Clock,
    {
        halt.check()?;

        if request.is_wait() {
            debug!("interpreter: wait {:?} ({})", request.duration, request.operation);
            lines.deassert_all()?;
            let outcome = self.wait(clock, halt, request.duration);
            return settle(outcome, lines.deassert_all());
        }

        if request.duration.is_zero() {
            return lines.deassert_all();
        }

        let period = self.generator.period();
        let pulses = PulseCount::covering(request.duration, period);
        let deadline = clock.now().checked_add(request.duration);
        debug!("interpreter: {} as {} pulses", request, pulses.get());

        let outcome = self.generator.run(
            lines,
            clock,
            halt,
            request.operation.pattern(),
            request.duty,
            pulses,
        );
        settle(outcome, lines.deassert_all())?;

        if let Some(deadline) = deadline {
            let remaining = deadline.saturating_duration_since(clock.now());
            if !remaining.is_zero() {
                clock.sleep(remaining);
            }
        }
        Ok(())
    }

    /// Sleep `duration` in period-sized slices, checking the halt latch
    /// between slices.
    fn wait<C: Clock>(&self, clock: &mut C, halt: &HaltHandle, duration: Duration) -> Result<()> {
        let slice = self.generator.period();
        if slice.is_zero() {
            clock.sleep(duration);
            return Ok(());
        }
        let mut remaining = duration;
        while !remaining.is_zero() {
            halt.check()?;
            let step = remaining.min(slice);
            clock.sleep(step);
            remaining -= step;
        }
        Ok(())
    }
}

/// Combine a run outcome with its cleanup. The run's error wins; a cleanup
/// failure after a successful run is still reported.
fn settle(outcome: Result<()>, cleanup: Result<()>) -> Result<()> {
    match (outcome, cleanup) {
        (Err(e), Err(c)) => {
            warn!("interpreter: cleanup after '{}' also failed: {}", e, c);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), cleanup) => cleanup,
    }
}
