//! Named worker-thread spawning.
//!
//! The process runs exactly two long-lived threads besides `main`: the drive
//! worker, which owns the session and blocks inside pulse timing, and the
//! I/O thread, which runs the network reactor. Both are created through
//! [`spawn`] so they carry a name and an explicit stack size in panics and
//! debugger output.

use std::io;
use std::thread::{Builder, JoinHandle};

/// Thread parameters for one long-lived task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: &'static str,
    pub stack_kb: usize,
}

/// Drive worker: owns the session, runs blocking pulse timing.
pub const DRIVE_WORKER: TaskSpec = TaskSpec {
    name: "drive-worker",
    stack_kb: 64,
};

/// Network reactor: accept, read and write tasks.
pub const IO_THREAD: TaskSpec = TaskSpec {
    name: "rpc-io",
    stack_kb: 128,
};

/// Spawn `f` on a fresh thread configured by `spec`.
pub fn spawn<F, T>(spec: TaskSpec, f: F) -> io::Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    log::info!("Spawning '{}' (stack={}KB)", spec.name, spec.stack_kb);
    Builder::new()
        .name(spec.name.into())
        .stack_size(spec.stack_kb * 1024)
        .spawn(f)
}
