//! Inbound commands to the drive service.
//!
//! Produced by the network surface (after full validation) or by the CLI,
//! and interpreted by [`DriveService`](super::service::DriveService).

use crate::motion::DriveRequest;

/// A fully validated unit of work for the vehicle.
#[derive(Debug, Clone, PartialEq)]
pub enum DriveCommand {
    /// Drive for exactly the request's duration, then stop.
    Single(DriveRequest),

    /// Run each request back-to-back, then halt.
    Sequence(Vec<DriveRequest>),
}

impl DriveCommand {
    /// Number of drive steps in this command.
    pub fn steps(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Sequence(requests) => requests.len(),
        }
    }
}
