//! GPIO line binders.
//!
//! Implement [`LineBinder`] for the two backends:
//!
//! - [`SimLineBinder`] hands out in-memory [`SimPin`]s. Always available.
//! - [`CdevLineBinder`] (feature `gpio-cdev`) requests real output lines
//!   from the Linux GPIO character device through `linux-embedded-hal`.
//!   Board pin numbers are translated to BCM line offsets first.
//!
//! Both bind lines HIGH (deasserted) so the H-bridge sees no input between
//! binding and the session's first explicit deassert.

use core::fmt;

use log::debug;

use crate::app::ports::LineBinder;
use crate::drivers::sim_pin::SimPin;
use crate::motion::LineRole;

// ───────────────────────────────────────────────────────────────
// Error type
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// Board pin has no GPIO line behind it.
    UnmappedPin(u8),
    /// The GPIO driver refused the request.
    Gpio(String),
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmappedPin(pin) => write!(f, "board pin {pin} has no GPIO line"),
            Self::Gpio(msg) => write!(f, "GPIO request failed: {msg}"),
        }
    }
}

impl std::error::Error for BindError {}

// ───────────────────────────────────────────────────────────────
// Simulation
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SimLineBinder;

impl LineBinder for SimLineBinder {
    type Pin = SimPin;
    type Error = BindError;

    fn bind(&mut self, role: LineRole, board_pin: u8) -> Result<SimPin, BindError> {
        if crate::pins::board_to_bcm(board_pin).is_none() {
            return Err(BindError::UnmappedPin(board_pin));
        }
        debug!("gpio(sim): {} on board pin {}", role, board_pin);
        Ok(SimPin::new(role, board_pin))
    }
}

// ───────────────────────────────────────────────────────────────
// Linux GPIO character device
// ───────────────────────────────────────────────────────────────

#[cfg(feature = "gpio-cdev")]
pub use cdev::CdevLineBinder;

#[cfg(feature = "gpio-cdev")]
mod cdev {
    use linux_embedded_hal::CdevPin;
    use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
    use log::info;

    use super::BindError;
    use crate::app::ports::LineBinder;
    use crate::motion::LineRole;
    use crate::pins::board_to_bcm;

    const CONSUMER: &str = "rcdrive";

    pub struct CdevLineBinder {
        chip: Chip,
    }

    impl CdevLineBinder {
        pub fn open(path: &str) -> Result<Self, BindError> {
            let chip = Chip::new(path).map_err(|e| BindError::Gpio(e.to_string()))?;
            info!("gpio: using {}", path);
            Ok(Self { chip })
        }
    }

    impl LineBinder for CdevLineBinder {
        type Pin = CdevPin;
        type Error = BindError;

        fn bind(&mut self, role: LineRole, board_pin: u8) -> Result<CdevPin, BindError> {
            let offset = board_to_bcm(board_pin).ok_or(BindError::UnmappedPin(board_pin))?;
            let handle = self
                .chip
                .get_line(u32::from(offset))
                .and_then(|line| line.request(LineRequestFlags::OUTPUT, 1, CONSUMER))
                .map_err(|e| BindError::Gpio(e.to_string()))?;
            info!("gpio: {} on board pin {} (BCM {})", role, board_pin, offset);
            CdevPin::new(handle).map_err(|e| BindError::Gpio(e.to_string()))
        }
    }
}
