//! rcdrive library.
//!
//! Duty-cycle motor actuation for a two-motor RC vehicle driven from four
//! Raspberry Pi GPIO lines, plus the HTTP command surface that serialises
//! requests onto the one physical vehicle. Exposes every layer for
//! integration testing; the hardware backend is chosen by the binary.

#![deny(unused_must_use)]

// Links the std embassy-time driver used by async-io-mini timers.
use embassy_time as _;

pub mod app;
pub mod config;
pub mod error;
pub mod motion;
pub mod pins;
pub mod rpc;
pub mod safety;

pub mod adapters;
pub mod drivers;

pub use error::{DriveError, PinFault, Result};
