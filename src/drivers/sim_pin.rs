//! In-memory output line.
//!
//! Stands in for a GPIO line when no character device is available (or
//! `--simulate` is given). Level changes are logged at trace level so a
//! dry run can be followed with `RUST_LOG=rcdrive=trace`. A new pin starts
//! HIGH, like a line requested with an idle default.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};
use log::trace;

use crate::motion::LineRole;

#[derive(Debug)]
pub struct SimPin {
    role: LineRole,
    board_pin: u8,
    high: bool,
    transitions: u64,
}

impl SimPin {
    pub fn new(role: LineRole, board_pin: u8) -> Self {
        Self {
            role,
            board_pin,
            high: true,
            transitions: 0,
        }
    }

    pub fn board_pin(&self) -> u8 {
        self.board_pin
    }

    /// Number of level changes since creation.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    fn write(&mut self, high: bool) {
        if self.high != high {
            self.transitions += 1;
            trace!(
                "sim: {} (pin {}) -> {}",
                self.role,
                self.board_pin,
                if high { "HIGH" } else { "LOW" }
            );
        }
        self.high = high;
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true);
        Ok(())
    }
}

impl StatefulOutputPin for SimPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}
