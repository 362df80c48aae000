//! Application core: drive orchestration with no direct I/O.
//!
//! Hardware, time and event output are reached only through the port
//! traits in [`ports`], so the whole layer runs against mock adapters in
//! tests.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
