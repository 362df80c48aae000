//! Mock hardware for integration tests.
//!
//! A virtual-time clock and four recording output lines sharing one event
//! log, so tests can assert on the exact level history (with timestamps)
//! without touching real GPIO. Sleeping advances virtual time instantly.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use rcdrive::app::events::DriveEvent;
use rcdrive::app::ports::{Clock, EventSink, LineBinder};
use rcdrive::motion::{DEFAULT_PULSE_PERIOD, LineRole};
use rcdrive::safety::{FailSafeSession, HaltHandle};

// ── Line event record ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEvent {
    pub at: Duration,
    pub role: LineRole,
    pub high: bool,
}

#[derive(Default)]
struct HwState {
    elapsed: Duration,
    events: Vec<LineEvent>,
    /// Lines whose next `set_low` fails once.
    fail_next_assert: Vec<LineRole>,
    /// Trigger this latch (once) when virtual time reaches the instant.
    halt_at: Option<(Duration, HaltHandle)>,
    released: usize,
}

// ── MockHw ────────────────────────────────────────────────────

/// Shared handle to the mock vehicle: clock, lines and their history.
#[derive(Clone)]
pub struct MockHw {
    state: Arc<Mutex<HwState>>,
    base: Instant,
}

impl MockHw {
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            base: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HwState> {
        self.state.lock().unwrap()
    }

    pub fn clock(&self) -> MockClock {
        MockClock { hw: self.clone() }
    }

    pub fn binder(&self) -> MockBinder {
        MockBinder {
            hw: self.clone(),
            bound: Vec::new(),
            fail_bind: None,
        }
    }

    /// Open a session on the default pins with the default period.
    pub fn session(&self) -> FailSafeSession<MockPin, MockClock> {
        let mut binder = self.binder();
        let session = FailSafeSession::with_pins(
            [24, 26, 29, 31],
            &mut binder,
            self.clock(),
            DEFAULT_PULSE_PERIOD,
        )
        .unwrap();
        self.clear();
        session
    }

    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    pub fn events(&self) -> Vec<LineEvent> {
        self.lock().events.clone()
    }

    pub fn clear(&self) {
        self.lock().events.clear();
    }

    /// Lines dropped (released) so far.
    pub fn released(&self) -> usize {
        self.lock().released
    }

    pub fn fail_next_assert(&self, role: LineRole) {
        self.lock().fail_next_assert.push(role);
    }

    pub fn halt_at(&self, at: Duration, halt: HaltHandle) {
        self.lock().halt_at = Some((at, halt));
    }

    /// Current level of each line, HIGH (deasserted) until written.
    pub fn levels(&self) -> [bool; 4] {
        let mut levels = [true; 4];
        for e in self.lock().events.iter() {
            levels[e.role.index()] = e.high;
        }
        levels
    }

    pub fn all_deasserted(&self) -> bool {
        self.levels().iter().all(|high| *high)
    }

    /// Number of HIGH → LOW transitions on `role`.
    pub fn assert_count(&self, role: LineRole) -> usize {
        let mut high = true;
        let mut count = 0;
        for e in self.lock().events.iter().filter(|e| e.role == role) {
            if high && !e.high {
                count += 1;
            }
            high = e.high;
        }
        count
    }

    /// Total time `role` spent LOW.
    pub fn asserted_time(&self, role: LineRole) -> Duration {
        let state = self.lock();
        let mut total = Duration::ZERO;
        let mut low_since = None;
        for e in state.events.iter().filter(|e| e.role == role) {
            match (e.high, low_since) {
                (false, None) => low_since = Some(e.at),
                (true, Some(since)) => {
                    total += e.at - since;
                    low_since = None;
                }
                _ => {}
            }
        }
        if let Some(since) = low_since {
            total += state.elapsed - since;
        }
        total
    }

    pub fn never_asserted(&self) -> bool {
        self.lock().events.iter().all(|e| e.high)
    }
}

// ── MockClock ─────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockClock {
    hw: MockHw,
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.hw.base + self.hw.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        let mut state = self.hw.lock();
        state.elapsed += duration;
        if state.halt_at.as_ref().is_some_and(|(at, _)| state.elapsed >= *at) {
            if let Some((_, halt)) = state.halt_at.take() {
                halt.trigger();
            }
        }
    }
}

// ── MockPin ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPinError;

impl embedded_hal::digital::Error for MockPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

pub struct MockPin {
    role: LineRole,
    hw: MockHw,
}

impl MockPin {
    fn write(&mut self, high: bool) -> Result<(), MockPinError> {
        let mut state = self.hw.lock();
        if !high {
            if let Some(i) = state.fail_next_assert.iter().position(|r| *r == self.role) {
                state.fail_next_assert.remove(i);
                return Err(MockPinError);
            }
        }
        let at = state.elapsed;
        state.events.push(LineEvent {
            at,
            role: self.role,
            high,
        });
        Ok(())
    }
}

impl Drop for MockPin {
    fn drop(&mut self) {
        self.hw.lock().released += 1;
    }
}

impl ErrorType for MockPin {
    type Error = MockPinError;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), MockPinError> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), MockPinError> {
        self.write(true)
    }
}

// ── MockBinder ────────────────────────────────────────────────

pub struct MockBinder {
    hw: MockHw,
    pub bound: Vec<(LineRole, u8)>,
    pub fail_bind: Option<LineRole>,
}

impl LineBinder for MockBinder {
    type Pin = MockPin;
    type Error = &'static str;

    fn bind(&mut self, role: LineRole, board_pin: u8) -> Result<MockPin, &'static str> {
        if self.fail_bind == Some(role) {
            return Err("line busy");
        }
        self.bound.push((role, board_pin));
        Ok(MockPin {
            role,
            hw: self.hw.clone(),
        })
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<DriveEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &DriveEvent) {
        self.events.push(event.clone());
    }
}
