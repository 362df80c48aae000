//! Output line drivers and thread helpers.

pub mod lines;
pub mod sim_pin;
pub mod task;
