//! Session-level tests: line timing, fail-safe cleanup and lifecycle.

use std::time::Duration;

use rcdrive::error::{DriveError, PinFault};
use rcdrive::motion::{DEFAULT_PULSE_PERIOD, LineRole, Operation};
use rcdrive::safety::{FailSafeSession, SessionState};

use crate::mock_hw::MockHw;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

// ── Timing ────────────────────────────────────────────────────

#[test]
fn forward_half_speed_pulses_both_forward_lines() {
    let hw = MockHw::new();
    let mut session = hw.session();

    session.drive("forward", 5, 1.0).unwrap();

    assert_eq!(hw.elapsed(), ms(1000));
    for role in [LineRole::RightForward, LineRole::LeftForward] {
        assert_eq!(hw.assert_count(role), 10, "{role}");
        assert_eq!(hw.asserted_time(role), ms(500), "{role}");
    }
    for role in [LineRole::RightBackward, LineRole::LeftBackward] {
        assert_eq!(hw.assert_count(role), 0, "{role}");
    }
    assert!(hw.all_deasserted());
}

#[test]
fn clockwise_full_speed_covers_whole_periods() {
    let hw = MockHw::new();
    let mut session = hw.session();

    session.drive("cw", 10, 0.3).unwrap();

    assert_eq!(hw.elapsed(), ms(300));
    assert_eq!(hw.assert_count(LineRole::RightBackward), 3);
    assert_eq!(hw.assert_count(LineRole::LeftForward), 3);
    assert_eq!(hw.asserted_time(LineRole::LeftForward), ms(300));
    assert_eq!(hw.assert_count(LineRole::RightForward), 0);
    assert!(hw.all_deasserted());
}

#[test]
fn partial_period_is_padded_with_lines_idle() {
    let hw = MockHw::new();
    let mut session = hw.session();

    session.drive("left", 3, 0.25).unwrap();

    // Two whole pulses, then idle until the requested 250ms.
    assert_eq!(hw.elapsed(), ms(250));
    assert_eq!(hw.assert_count(LineRole::RightForward), 2);
    assert_eq!(hw.asserted_time(LineRole::RightForward), ms(60));
    let last_low = hw.events().iter().filter(|e| !e.high).map(|e| e.at).max();
    assert_eq!(last_low, Some(ms(100)));
}

#[test]
fn every_operation_ends_deasserted() {
    for op in Operation::ALL {
        let hw = MockHw::new();
        let mut session = hw.session();
        session.drive(op.name(), 7, 0.5).unwrap();
        assert!(hw.all_deasserted(), "{op}");
        assert_eq!(hw.elapsed(), ms(500), "{op}");
        if op.is_idle() {
            assert!(hw.never_asserted(), "{op}");
        }
    }
}

#[test]
fn operation_names_are_case_insensitive() {
    let hw = MockHw::new();
    let mut session = hw.session();
    session.drive("CCW", 10, 0.1).unwrap();
    assert_eq!(hw.assert_count(LineRole::RightForward), 1);
    assert_eq!(hw.assert_count(LineRole::LeftBackward), 1);
}

#[test]
fn zero_duty_waits_without_asserting() {
    let hw = MockHw::new();
    let mut session = hw.session();

    session.drive("forward", 0, 0.7).unwrap();

    assert_eq!(hw.elapsed(), ms(700));
    assert!(hw.never_asserted());
}

#[test]
fn non_positive_duration_returns_immediately() {
    let hw = MockHw::new();
    let mut session = hw.session();

    session.drive("backward", 10, 0.0).unwrap();
    session.drive("backward", 10, -3.0).unwrap();

    assert_eq!(hw.elapsed(), Duration::ZERO);
    assert!(hw.never_asserted());
}

// ── Validation ────────────────────────────────────────────────

#[test]
fn invalid_input_touches_nothing() {
    let hw = MockHw::new();
    let mut session = hw.session();

    assert_eq!(session.drive("sideways", 5, 1.0), Err(DriveError::UnknownOperation));
    assert_eq!(session.drive("forward", 11, 1.0), Err(DriveError::InvalidDutyCycle(11)));
    assert_eq!(session.drive("forward", -1, 1.0), Err(DriveError::InvalidDutyCycle(-1)));
    assert_eq!(session.drive("forward", 5, f64::NAN), Err(DriveError::InvalidDuration));
    assert_eq!(
        session.drive("idle", 11, 1.0),
        Err(DriveError::InvalidDutyCycle(11))
    );

    assert!(hw.events().is_empty());
    assert_eq!(hw.elapsed(), Duration::ZERO);
    assert!(session.is_open());
}

#[test]
fn duplicate_pins_fail_before_binding() {
    let hw = MockHw::new();
    let mut binder = hw.binder();
    let result = FailSafeSession::with_pins(
        [24, 26, 24, 31],
        &mut binder,
        hw.clock(),
        DEFAULT_PULSE_PERIOD,
    );
    assert_eq!(
        result.err(),
        Some(DriveError::InvalidPinAssignment(PinFault::Duplicate { pin: 24 }))
    );
    assert!(binder.bound.is_empty());
}

#[test]
fn power_pin_is_not_an_output() {
    let hw = MockHw::new();
    let mut binder = hw.binder();
    let result =
        FailSafeSession::with_pins([1, 26, 29, 31], &mut binder, hw.clock(), DEFAULT_PULSE_PERIOD);
    assert_eq!(
        result.err(),
        Some(DriveError::InvalidPinAssignment(PinFault::NotOutputCapable {
            role: LineRole::RightForward,
            pin: 1,
        }))
    );
    assert!(binder.bound.is_empty());
}

#[test]
fn bind_failure_yields_no_session() {
    let hw = MockHw::new();
    let mut binder = hw.binder();
    binder.fail_bind = Some(LineRole::LeftForward);
    let result = FailSafeSession::with_pins(
        [24, 26, 29, 31],
        &mut binder,
        hw.clock(),
        DEFAULT_PULSE_PERIOD,
    );
    assert_eq!(result.err(), Some(DriveError::LineSetup(LineRole::LeftForward)));
}

#[test]
fn open_deasserts_every_line() {
    let hw = MockHw::new();
    let mut binder = hw.binder();
    let _session = FailSafeSession::with_pins(
        [24, 26, 29, 31],
        &mut binder,
        hw.clock(),
        DEFAULT_PULSE_PERIOD,
    )
    .unwrap();
    let events = hw.events();
    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|e| e.high));
    assert_eq!(
        binder.bound,
        vec![
            (LineRole::RightForward, 24),
            (LineRole::RightBackward, 26),
            (LineRole::LeftForward, 29),
            (LineRole::LeftBackward, 31),
        ]
    );
}

// ── Sequences ─────────────────────────────────────────────────

#[test]
fn sequence_runs_in_order_then_stops() {
    let hw = MockHw::new();
    let mut session = hw.session();

    session
        .drive_sequence(&[("forward", 10, 0.2), ("stop", 0, 0.1), ("backward", 10, 0.2)])
        .unwrap();

    assert_eq!(hw.elapsed(), ms(500));
    let first_back = hw
        .events()
        .iter()
        .find(|e| e.role == LineRole::RightBackward && !e.high)
        .map(|e| e.at);
    assert_eq!(first_back, Some(ms(300)));
    assert!(hw.all_deasserted());
}

#[test]
fn sequence_stops_at_first_invalid_step() {
    let hw = MockHw::new();
    let mut session = hw.session();

    let result = session.drive_sequence(&[("forward", 10, 0.2), ("sideways", 10, 0.2), ("left", 10, 0.2)]);

    assert_eq!(result, Err(DriveError::UnknownOperation));
    assert_eq!(hw.elapsed(), ms(200));
    assert_eq!(hw.assert_count(LineRole::RightForward), 2);
    assert!(hw.all_deasserted());
}

#[test]
fn line_fault_still_leaves_lines_deasserted() {
    let hw = MockHw::new();
    let mut session = hw.session();
    hw.fail_next_assert(LineRole::LeftForward);

    let result = session.drive("forward", 10, 1.0);

    assert_eq!(result, Err(DriveError::LineFault(LineRole::LeftForward)));
    assert!(hw.all_deasserted());
    // No padding after a failure.
    assert_eq!(hw.elapsed(), Duration::ZERO);
    // The session stays usable.
    session.drive("forward", 10, 0.1).unwrap();
}

// ── Halt ──────────────────────────────────────────────────────

#[test]
fn halt_latch_interrupts_at_pulse_boundary() {
    let hw = MockHw::new();
    let mut session = hw.session();
    let halt = session.halt_handle();
    hw.halt_at(ms(300), halt.clone());

    let result = session.drive("forward", 5, 1.0);

    assert_eq!(result, Err(DriveError::Interrupted));
    assert_eq!(hw.elapsed(), ms(300));
    assert_eq!(hw.assert_count(LineRole::RightForward), 3);
    assert!(hw.all_deasserted());

    // Latched until cleared.
    assert_eq!(session.drive("stop", 0, 0.1), Err(DriveError::Interrupted));
    halt.clear();
    session.drive("stop", 0, 0.1).unwrap();
}

#[test]
fn halt_interrupts_a_wait() {
    let hw = MockHw::new();
    let mut session = hw.session();
    hw.halt_at(ms(200), session.halt_handle());

    assert_eq!(session.drive("idle", 0, 5.0), Err(DriveError::Interrupted));
    assert_eq!(hw.elapsed(), ms(200));
}

#[test]
fn explicit_halt_deasserts_now() {
    let hw = MockHw::new();
    let mut session = hw.session();
    session.halt().unwrap();
    assert_eq!(hw.events().len(), 4);
    assert!(hw.all_deasserted());
}

// ── Lifecycle ─────────────────────────────────────────────────

#[test]
fn closed_session_refuses_everything() {
    let hw = MockHw::new();
    let mut session = hw.session();

    session.close().unwrap();
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(hw.released(), 4);
    assert!(hw.all_deasserted());
    hw.clear();

    assert_eq!(session.drive("forward", 5, 1.0), Err(DriveError::SessionClosed));
    assert_eq!(session.drive("sideways", 5, 1.0), Err(DriveError::SessionClosed));
    assert_eq!(session.drive_sequence(&[]), Err(DriveError::SessionClosed));
    assert_eq!(session.halt(), Err(DriveError::SessionClosed));
    assert!(hw.events().is_empty());

    // Closing again is a no-op.
    session.close().unwrap();
    assert_eq!(hw.released(), 4);
}

#[test]
fn dropping_an_open_session_closes_it() {
    let hw = MockHw::new();
    {
        let mut session = hw.session();
        session.drive("right", 10, 0.1).unwrap();
    }
    assert_eq!(hw.released(), 4);
    assert!(hw.all_deasserted());
}
