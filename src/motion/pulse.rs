//! Duty-cycle pulse generator.
//!
//! Bit-bangs a fixed-period PWM on the active lines of a [`LinePattern`].
//! Each pulse asserts the pattern, holds for `duty * period / 10`, deasserts
//! every line and holds for the remainder. Timing is blocking on purpose:
//! the generator runs on the drive worker and must not yield mid-pulse.
//!
//! The halt latch is only sampled at pulse boundaries, so an interrupted
//! run never leaves a pulse half-finished.

use core::time::Duration;

use embedded_hal::digital::OutputPin;
use log::trace;

use super::{DEFAULT_PULSE_PERIOD, DutyCycle, LinePattern, PulseCount};
use crate::app::ports::Clock;
use crate::drivers::lines::SignalLines;
use crate::error::Result;
use crate::safety::HaltHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseGenerator {
    period: Duration,
}

impl PulseGenerator {
    pub const fn new(period: Duration) -> Self {
        Self { period }
    }

    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Emit `count` pulses of `pattern` at `duty`.
    ///
    /// Zero duty only waits `count * period`. On error the lines may be left
    /// asserted; the caller owns cleanup.
    pub fn run<P, C>(
        &self,
        lines: &mut SignalLines<P>,
        clock: &mut C,
        halt: &HaltHandle,
        pattern: LinePattern,
        duty: DutyCycle,
        count: PulseCount,
    ) -> Result<()>
    where
        P: OutputPin,
        C: Clock,
    {
        if duty.is_off() {
            for _ in 0..count.get() {
                halt.check()?;
                clock.sleep(self.period);
            }
            return Ok(());
        }

        let on = duty.on_time(self.period);
        let off = duty.off_time(self.period);
        trace!(
            "pulse: {} pulses of {:?} on / {:?} off",
            count.get(),
            on,
            off
        );

        for _ in 0..count.get() {
            halt.check()?;
            lines.apply(pattern)?;
            clock.sleep(on);
            lines.deassert_all()?;
            if !off.is_zero() {
                clock.sleep(off);
            }
        }
        Ok(())
    }
}

impl Default for PulseGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_PULSE_PERIOD)
    }
}
