//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each [`DriveEvent`] as one log line
//! through the `log` facade (rendered by `env_logger` in the binary).

use log::{info, warn};

use crate::app::events::DriveEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`DriveEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &DriveEvent) {
        match event {
            DriveEvent::Ready { pins } => {
                info!(
                    "READY | RF={} RB={} LF={} LB={}",
                    pins[0], pins[1], pins[2], pins[3]
                );
            }
            DriveEvent::CommandStarted { seq, steps } => {
                info!("DRIVE | #{} started, {} step(s)", seq, steps);
            }
            DriveEvent::CommandCompleted { seq, elapsed } => {
                info!("DRIVE | #{} done in {:.3}s", seq, elapsed.as_secs_f64());
            }
            DriveEvent::CommandFailed { seq, error } => {
                warn!("DRIVE | #{} failed: {}", seq, error);
            }
            DriveEvent::Closed { completed, failed } => {
                info!("CLOSE | {} completed, {} failed", completed, failed);
            }
        }
    }
}
