//! Runtime configuration
//!
//! All tunable parameters for the drive controller. Every field has a
//! default, so a JSON file only needs the keys it changes. CLI flags
//! override the listen address and port after loading.

use core::fmt;
use core::time::Duration;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::motion::{DEFAULT_PULSE_PERIOD, DutyCycle, MAX_DUTY};
use crate::pins::{self, LineAssignment};
use crate::rpc::channels::CMD_DEPTH;
use crate::rpc::request::CommandDefaults;

/// Upper bound for every duration field (one hour).
pub const MAX_CONFIG_SECS: f64 = 3600.0;

// ───────────────────────────────────────────────────────────────
// Error type
// ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    /// The config file does not exist.
    NotFound,
    /// The file is not valid JSON for [`DriveConfig`].
    Corrupted(String),
    /// A field failed range validation.
    /// The `&'static str` names the field.
    ValidationFailed(&'static str),
    /// Reading the file failed.
    IoError(std::io::ErrorKind),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted(msg) => write!(f, "config corrupted: {}", msg),
            Self::ValidationFailed(field) => write!(f, "validation failed: {}", field),
            Self::IoError(kind) => write!(f, "I/O error: {}", kind),
        }
    }
}

impl std::error::Error for ConfigError {}

// ───────────────────────────────────────────────────────────────
// Pins
// ───────────────────────────────────────────────────────────────

/// Board pin numbers of the four H-bridge inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    pub right_forward: u8,
    pub right_backward: u8,
    pub left_forward: u8,
    pub left_backward: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            right_forward: pins::DEFAULT_RIGHT_FORWARD_PIN,
            right_backward: pins::DEFAULT_RIGHT_BACKWARD_PIN,
            left_forward: pins::DEFAULT_LEFT_FORWARD_PIN,
            left_backward: pins::DEFAULT_LEFT_BACKWARD_PIN,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// DriveConfig
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    // --- Hardware ---
    pub pins: PinConfig,
    /// GPIO character device (feature `gpio-cdev`)
    pub gpio_chip: String,

    // --- Timing ---
    /// PWM timebase (milliseconds)
    pub pulse_period_ms: u64,

    // --- Network defaults ---
    /// Duty (0-10) for requests without a `speed`
    pub default_speed: u8,
    /// Duration (seconds) of a bare `{"drive": op}`
    pub default_drive_secs: f64,
    /// Longest step a client may request (seconds)
    pub max_drive_secs: f64,

    // --- Listener ---
    pub listen_address: String,
    pub listen_port: u16,
    /// Concurrent connections, at most the command queue depth
    pub max_clients: usize,
    /// Time a client has, from accept, to send a complete request (seconds)
    pub request_timeout_secs: f64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            pins: PinConfig::default(),
            gpio_chip: "/dev/gpiochip0".into(),

            pulse_period_ms: DEFAULT_PULSE_PERIOD.as_millis() as u64, // 10 Hz PWM

            default_speed: MAX_DUTY,
            default_drive_secs: 1.0,
            max_drive_secs: 60.0,

            listen_address: "127.0.0.1".into(),
            listen_port: 9999,
            max_clients: 4,
            request_timeout_secs: 10.0,
        }
    }
}

impl DriveConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound,
            kind => ConfigError::IoError(kind),
        })?;
        let config: Self =
            serde_json::from_str(&text).map_err(|e| ConfigError::Corrupted(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pulse_period_ms == 0 {
            return Err(ConfigError::ValidationFailed("pulse_period_ms"));
        }
        if self.default_speed > MAX_DUTY {
            return Err(ConfigError::ValidationFailed("default_speed"));
        }
        if !secs_in_range(self.max_drive_secs) {
            return Err(ConfigError::ValidationFailed("max_drive_secs"));
        }
        if !secs_in_range(self.default_drive_secs) || self.default_drive_secs > self.max_drive_secs
        {
            return Err(ConfigError::ValidationFailed("default_drive_secs"));
        }
        if !secs_in_range(self.request_timeout_secs) {
            return Err(ConfigError::ValidationFailed("request_timeout_secs"));
        }
        // Each client holds at most one queued command.
        if self.max_clients == 0 || self.max_clients > CMD_DEPTH {
            return Err(ConfigError::ValidationFailed("max_clients"));
        }
        self.listen_address
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::ValidationFailed("listen_address"))?;
        self.assignment()
            .map_err(|_| ConfigError::ValidationFailed("pins"))?;
        Ok(())
    }

    pub fn pulse_period(&self) -> Duration {
        Duration::from_millis(self.pulse_period_ms)
    }

    pub fn assignment(&self) -> crate::error::Result<LineAssignment> {
        let p = &self.pins;
        LineAssignment::new(
            p.right_forward,
            p.right_backward,
            p.left_forward,
            p.left_backward,
        )
    }

    pub fn request_timeout(&self) -> Duration {
        secs_to_duration(self.request_timeout_secs)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self
            .listen_address
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::ValidationFailed("listen_address"))?;
        Ok(SocketAddr::new(ip, self.listen_port))
    }

    /// Defaults applied to network requests. Call after [`validate`](Self::validate).
    pub fn command_defaults(&self) -> CommandDefaults {
        CommandDefaults {
            speed: DutyCycle::new(i64::from(self.default_speed)).unwrap_or(DutyCycle::FULL),
            duration: secs_to_duration(self.default_drive_secs),
            max_duration: secs_to_duration(self.max_drive_secs),
        }
    }
}

fn secs_in_range(secs: f64) -> bool {
    secs.is_finite() && secs > 0.0 && secs <= MAX_CONFIG_SECS
}

/// Out-of-range values (rejected by `validate`) map to zero.
fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}
