//! Request body validation.
//!
//! Turns a JSON body into a fully validated [`DriveCommand`]. Nothing that
//! fails here ever reaches the drive worker.
//!
//! Accepted shapes (exactly one key set):
//!
//! ```text
//! {"drive": "<op>"[, "speed": 0-10][, "duration": secs]}
//! {"drive_ops": [["<op>", secs] | ["<op>", speed, secs], ...]}
//! ```

use core::fmt;
use core::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::app::commands::DriveCommand;
use crate::error::DriveError;
use crate::motion::{DriveRequest, DutyCycle, Operation, duration_from_secs};

// ───────────────────────────────────────────────────────────────
// Defaults applied to omitted fields
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDefaults {
    /// Duty used when `speed` is omitted.
    pub speed: DutyCycle,
    /// Duration of a bare `{"drive": op}`.
    pub duration: Duration,
    /// Longest single step a client may request.
    pub max_duration: Duration,
}

impl Default for CommandDefaults {
    fn default() -> Self {
        Self {
            speed: DutyCycle::FULL,
            duration: Duration::from_secs(1),
            max_duration: Duration::from_secs(60),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Error type
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    /// Not JSON, wrong key set, or wrong element types.
    Malformed,
    /// Values parsed but failed drive validation.
    Invalid(DriveError),
    /// A step is longer than the configured maximum.
    TooLong,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "request body has an unrecognised shape"),
            Self::Invalid(e) => write!(f, "invalid drive request: {e}"),
            Self::TooLong => write!(f, "requested duration exceeds the maximum"),
        }
    }
}

impl From<DriveError> for RequestError {
    fn from(e: DriveError) -> Self {
        Self::Invalid(e)
    }
}

// ───────────────────────────────────────────────────────────────
// Wire shapes
// ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum Body {
    Single(SingleBody),
    Sequence(SequenceBody),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SingleBody {
    drive: String,
    #[serde(default)]
    speed: Option<i64>,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SequenceBody {
    drive_ops: Vec<StepEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StepEntry {
    Timed(String, f64),
    Paced(String, i64, f64),
}

// ───────────────────────────────────────────────────────────────
// Parsing
// ───────────────────────────────────────────────────────────────

/// Parse and validate a request body.
pub fn parse_body(body: &[u8], defaults: &CommandDefaults) -> Result<DriveCommand, RequestError> {
    // Objects only: derived struct visitors would also accept JSON arrays.
    let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        debug!("request: body is not JSON: {}", e);
        RequestError::Malformed
    })?;
    if !value.is_object() {
        return Err(RequestError::Malformed);
    }
    let body = Body::deserialize(value).map_err(|e| {
        debug!("request: rejected body: {}", e);
        RequestError::Malformed
    })?;

    match body {
        Body::Single(single) => {
            let operation = single.drive.parse::<Operation>()?;
            let duty = single.speed.map_or(Ok(defaults.speed), DutyCycle::new)?;
            let duration = match single.duration {
                Some(secs) => checked_duration(secs, defaults)?,
                None => defaults.duration,
            };
            Ok(DriveCommand::Single(DriveRequest::new(operation, duty, duration)))
        }
        Body::Sequence(sequence) => {
            let steps = sequence
                .drive_ops
                .into_iter()
                .map(|entry| -> Result<DriveRequest, RequestError> {
                    let (op, speed, secs) = match entry {
                        StepEntry::Timed(op, secs) => (op, None, secs),
                        StepEntry::Paced(op, speed, secs) => (op, Some(speed), secs),
                    };
                    let operation = op.parse::<Operation>()?;
                    let duty = speed.map_or(Ok(defaults.speed), DutyCycle::new)?;
                    let duration = checked_duration(secs, defaults)?;
                    Ok(DriveRequest::new(operation, duty, duration))
                })
                .collect::<Result<Vec<_>, RequestError>>()?;
            Ok(DriveCommand::Sequence(steps))
        }
    }
}

fn checked_duration(secs: f64, defaults: &CommandDefaults) -> Result<Duration, RequestError> {
    let duration = duration_from_secs(secs)?;
    if duration > defaults.max_duration {
        return Err(RequestError::TooLong);
    }
    Ok(duration)
}
