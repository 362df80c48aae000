//! Unified error type for the drive core.
//!
//! Every fallible operation in the session, interpreter and pulse generator
//! funnels into [`DriveError`]. All variants are `Copy` so they can be
//! handed across the worker channel and into event records without
//! allocation.

use core::fmt;

use crate::motion::LineRole;

// ---------------------------------------------------------------------------
// Drive error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveError {
    /// Pins are not pairwise distinct or not output-capable header pins.
    InvalidPinAssignment(PinFault),
    /// Operation name is not in the operation table.
    UnknownOperation,
    /// Duty cycle outside 0–10.
    InvalidDutyCycle(i64),
    /// Negative pulse count.
    InvalidPulseCount(i64),
    /// Duration is NaN or infinite.
    InvalidDuration,
    /// The session was closed; no line may be touched.
    SessionClosed,
    /// The halt latch was triggered while driving.
    Interrupted,
    /// Binding a line to its pin failed during construction.
    LineSetup(LineRole),
    /// Writing a level to a bound line failed.
    LineFault(LineRole),
}

impl DriveError {
    /// True for validation failures raised before any line is touched.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidPinAssignment(_)
                | Self::UnknownOperation
                | Self::InvalidDutyCycle(_)
                | Self::InvalidPulseCount(_)
                | Self::InvalidDuration
        )
    }
}

impl fmt::Display for DriveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPinAssignment(e) => write!(f, "invalid pin assignment: {e}"),
            Self::UnknownOperation => write!(f, "unknown operation"),
            Self::InvalidDutyCycle(d) => write!(f, "duty cycle {d} outside 0-10"),
            Self::InvalidPulseCount(n) => write!(f, "pulse count {n} is negative"),
            Self::InvalidDuration => write!(f, "duration is not a finite number"),
            Self::SessionClosed => write!(f, "controller session has been closed"),
            Self::Interrupted => write!(f, "drive interrupted by halt request"),
            Self::LineSetup(role) => write!(f, "could not bind {role} line"),
            Self::LineFault(role) => write!(f, "write to {role} line failed"),
        }
    }
}

impl std::error::Error for DriveError {}

// ---------------------------------------------------------------------------
// Pin assignment faults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinFault {
    /// The pin is not an output-capable header pin.
    NotOutputCapable { role: LineRole, pin: u8 },
    /// Two roles were given the same pin.
    Duplicate { pin: u8 },
}

impl fmt::Display for PinFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotOutputCapable { role, pin } => {
                write!(f, "{role} pin {pin} is not a valid output pin")
            }
            Self::Duplicate { pin } => write!(f, "pin {pin} assigned to more than one line"),
        }
    }
}

impl From<PinFault> for DriveError {
    fn from(e: PinFault) -> Self {
        Self::InvalidPinAssignment(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Drive-core `Result` alias.
pub type Result<T> = core::result::Result<T, DriveError>;
