//! Drive data model: line roles, operations, duty cycles and requests.
//!
//! ```text
//!   "forward", 5, 1.0s ──▶ DriveRequest ──▶ Interpreter ──▶ PulseGenerator
//!                          (validated)       (deadline)      (assert/hold/
//!                                                             deassert/hold)
//! ```
//!
//! Everything in this module is pure data. Validation happens when a value
//! is constructed, so a [`DriveRequest`] that exists has already passed
//! every check that must run before a line is touched.

pub mod interpreter;
pub mod pulse;

use core::fmt;
use core::str::FromStr;
use core::time::Duration;

use crate::error::{DriveError, Result};

/// PWM timebase of the pulse generator.
pub const DEFAULT_PULSE_PERIOD: Duration = Duration::from_millis(100);

/// Highest duty-cycle level; the line is held asserted for the whole period.
pub const MAX_DUTY: u8 = 10;

// ---------------------------------------------------------------------------
// Line roles
// ---------------------------------------------------------------------------

/// The four logical output lines of the two H-bridge channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LineRole {
    RightForward = 0,
    RightBackward = 1,
    LeftForward = 2,
    LeftBackward = 3,
}

impl LineRole {
    /// All roles in table order (RF, RB, LF, LB).
    pub const ALL: [LineRole; 4] = [
        Self::RightForward,
        Self::RightBackward,
        Self::LeftForward,
        Self::LeftBackward,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::RightForward => "right-forward",
            Self::RightBackward => "right-backward",
            Self::LeftForward => "left-forward",
            Self::LeftBackward => "left-backward",
        }
    }
}

impl fmt::Display for LineRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Line patterns
// ---------------------------------------------------------------------------

/// Which lines an operation asserts, indexed by [`LineRole::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinePattern([bool; 4]);

impl LinePattern {
    /// Nothing asserted.
    pub const IDLE: Self = Self([false; 4]);

    pub const fn new(rf: bool, rb: bool, lf: bool, lb: bool) -> Self {
        Self([rf, rb, lf, lb])
    }

    pub const fn is_asserted(&self, role: LineRole) -> bool {
        self.0[role.index()]
    }

    pub fn is_idle(&self) -> bool {
        self.0.iter().all(|active| !active)
    }

    /// Roles asserted by this pattern, in table order.
    pub fn active_roles(&self) -> impl Iterator<Item = LineRole> + '_ {
        LineRole::ALL
            .into_iter()
            .filter(|role| self.is_asserted(*role))
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Symbolic drive operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Idle,
    Stop,
    Halt,
    Forward,
    Backward,
    Left,
    Right,
    Cw,
    Ccw,
}

impl Operation {
    pub const ALL: [Operation; 9] = [
        Self::Idle,
        Self::Stop,
        Self::Halt,
        Self::Forward,
        Self::Backward,
        Self::Left,
        Self::Right,
        Self::Cw,
        Self::Ccw,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Stop => "stop",
            Self::Halt => "halt",
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Left => "left",
            Self::Right => "right",
            Self::Cw => "cw",
            Self::Ccw => "ccw",
        }
    }

    /// Lines asserted for this operation (RF, RB, LF, LB).
    pub const fn pattern(self) -> LinePattern {
        match self {
            Self::Idle | Self::Stop | Self::Halt => LinePattern::IDLE,
            Self::Forward => LinePattern::new(true, false, true, false),
            Self::Backward => LinePattern::new(false, true, false, true),
            Self::Right => LinePattern::new(false, false, true, false),
            Self::Left => LinePattern::new(true, false, false, false),
            Self::Cw => LinePattern::new(false, true, true, false),
            Self::Ccw => LinePattern::new(true, false, false, true),
        }
    }

    /// Idle, stop and halt only wait.
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle | Self::Stop | Self::Halt)
    }
}

impl FromStr for Operation {
    type Err = DriveError;

    /// Case-insensitive lookup; unknown names are rejected.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(s))
            .ok_or(DriveError::UnknownOperation)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Duty cycle
// ---------------------------------------------------------------------------

/// Speed level 0–10; the fraction of each pulse period the lines stay asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DutyCycle(u8);

impl DutyCycle {
    pub const OFF: Self = Self(0);
    pub const FULL: Self = Self(MAX_DUTY);

    pub fn new(level: i64) -> Result<Self> {
        if (0..=i64::from(MAX_DUTY)).contains(&level) {
            Ok(Self(level as u8))
        } else {
            Err(DriveError::InvalidDutyCycle(level))
        }
    }

    pub const fn level(self) -> u8 {
        self.0
    }

    pub const fn is_off(self) -> bool {
        self.0 == 0
    }

    /// Asserted part of a pulse: `duty * period / 10`.
    pub fn on_time(self, period: Duration) -> Duration {
        period * u32::from(self.0) / u32::from(MAX_DUTY)
    }

    /// Deasserted remainder: `(10 - duty) * period / 10`.
    pub fn off_time(self, period: Duration) -> Duration {
        period * u32::from(MAX_DUTY - self.0) / u32::from(MAX_DUTY)
    }
}

impl fmt::Display for DutyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, MAX_DUTY)
    }
}

// ---------------------------------------------------------------------------
// Pulse count
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PulseCount(u64);

impl PulseCount {
    pub fn new(count: i64) -> Result<Self> {
        u64::try_from(count)
            .map(Self)
            .map_err(|_| DriveError::InvalidPulseCount(count))
    }

    /// Whole periods that fit in `duration` (rounds down).
    pub fn covering(duration: Duration, period: Duration) -> Self {
        let count = duration
            .as_nanos()
            .checked_div(period.as_nanos())
            .unwrap_or(0);
        Self(u64::try_from(count).unwrap_or(u64::MAX))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Durations
// ---------------------------------------------------------------------------

/// Convert caller seconds to a [`Duration`].
///
/// Non-positive values map to zero (the no-op drive); values are rounded to
/// whole microseconds so that e.g. 0.3 s covers exactly three 100 ms periods.
pub fn duration_from_secs(secs: f64) -> Result<Duration> {
    if !secs.is_finite() {
        return Err(DriveError::InvalidDuration);
    }
    if secs <= 0.0 {
        return Ok(Duration::ZERO);
    }
    Ok(Duration::from_micros((secs * 1_000_000.0).round() as u64))
}

// ---------------------------------------------------------------------------
// Drive request
// ---------------------------------------------------------------------------

/// A validated (operation, duty cycle, duration) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveRequest {
    pub operation: Operation,
    pub duty: DutyCycle,
    pub duration: Duration,
}

impl DriveRequest {
    pub const fn new(operation: Operation, duty: DutyCycle, duration: Duration) -> Self {
        Self {
            operation,
            duty,
            duration,
        }
    }

    /// Validate raw caller input. The operation is looked up first, then the
    /// duty cycle, then the duration.
    pub fn parse(operation: &str, duty: i64, secs: f64) -> Result<Self> {
        let operation = operation.parse::<Operation>()?;
        let duty = DutyCycle::new(duty)?;
        let duration = duration_from_secs(secs)?;
        Ok(Self::new(operation, duty, duration))
    }

    /// True when the request never asserts a line.
    pub const fn is_wait(&self) -> bool {
        self.operation.is_idle() || self.duty.is_off()
    }
}

impl fmt::Display for DriveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} for {:.3}s",
            self.operation,
            self.duty,
            self.duration.as_secs_f64()
        )
    }
}
