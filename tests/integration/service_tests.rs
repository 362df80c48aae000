//! Drive service and worker tests.
//!
//! The worker is run on its own thread against the channel pair, exactly
//! as `serve` wires it, with the I/O thread's side played by the test.

use std::sync::Arc;
use std::time::Duration;

use rcdrive::app::commands::DriveCommand;
use rcdrive::app::events::DriveEvent;
use rcdrive::app::service::DriveService;
use rcdrive::error::DriveError;
use rcdrive::motion::{DriveRequest, LineRole};
use rcdrive::rpc::channels::{CommandMsg, DriveChannels, Ticket};
use rcdrive::rpc::engine;
use rcdrive::rpc::request::{CommandDefaults, parse_body};

use crate::mock_hw::{MockHw, RecordingSink};

fn request(op: &str, duty: i64, secs: f64) -> DriveRequest {
    DriveRequest::parse(op, duty, secs).unwrap()
}

// ── DriveService ──────────────────────────────────────────────

#[test]
fn start_announces_pins() {
    let hw = MockHw::new();
    let mut service = DriveService::new(hw.session());
    let mut sink = RecordingSink::default();

    service.start(&mut sink);

    assert_eq!(sink.events, vec![DriveEvent::Ready { pins: [24, 26, 29, 31] }]);
}

#[test]
fn completed_command_reports_elapsed_time() {
    let hw = MockHw::new();
    let mut service = DriveService::new(hw.session());
    let mut sink = RecordingSink::default();

    let command = DriveCommand::Sequence(vec![request("forward", 10, 0.2), request("left", 5, 0.3)]);
    service.handle_command(&command, &mut sink).unwrap();

    assert_eq!(
        sink.events,
        vec![
            DriveEvent::CommandStarted { seq: 1, steps: 2 },
            DriveEvent::CommandCompleted {
                seq: 1,
                elapsed: Duration::from_millis(500),
            },
        ]
    );
    assert_eq!(service.completed(), 1);
    assert_eq!(service.failed(), 0);
    assert!(hw.all_deasserted());
}

#[test]
fn failed_command_is_counted_and_reported() {
    let hw = MockHw::new();
    let mut service = DriveService::new(hw.session());
    let mut sink = RecordingSink::default();
    hw.fail_next_assert(LineRole::RightBackward);

    let command = DriveCommand::Single(request("backward", 10, 1.0));
    let result = service.handle_command(&command, &mut sink);

    assert_eq!(result, Err(DriveError::LineFault(LineRole::RightBackward)));
    assert_eq!(
        sink.events.last(),
        Some(&DriveEvent::CommandFailed {
            seq: 1,
            error: DriveError::LineFault(LineRole::RightBackward),
        })
    );
    assert_eq!(service.failed(), 1);
    assert!(hw.all_deasserted());

    service.handle_command(&command, &mut sink).unwrap();
    assert_eq!(service.completed(), 1);
    assert!(matches!(sink.events.last(), Some(DriveEvent::CommandCompleted { seq: 2, .. })));
}

#[test]
fn shutdown_reports_totals_once() {
    let hw = MockHw::new();
    let mut service = DriveService::new(hw.session());
    let mut sink = RecordingSink::default();
    service
        .handle_command(&DriveCommand::Single(request("stop", 0, 0.1)), &mut sink)
        .unwrap();
    sink.events.clear();

    service.shutdown(&mut sink).unwrap();
    service.shutdown(&mut sink).unwrap();

    assert_eq!(sink.events, vec![DriveEvent::Closed { completed: 1, failed: 0 }]);
    assert!(!service.is_open());
    assert_eq!(hw.released(), 4);

    let after = service.handle_command(&DriveCommand::Single(request("forward", 5, 1.0)), &mut sink);
    assert_eq!(after, Err(DriveError::SessionClosed));
}

// ── Worker loop ───────────────────────────────────────────────

fn send(channels: &DriveChannels, slot: usize, body: &str) {
    let command = parse_body(body.as_bytes(), &CommandDefaults::default()).unwrap();
    let msg = CommandMsg {
        ticket: Ticket { slot, serial: slot as u64 + 1 },
        command,
    };
    assert!(channels.commands.try_send(msg).is_ok());
}

#[test]
fn worker_serves_commands_in_order_then_shuts_down() {
    let hw = MockHw::new();
    let service = DriveService::new(hw.session());
    let channels = Arc::new(DriveChannels::new());

    send(&channels, 0, r#"{"drive": "forward", "speed": 5, "duration": 0.5}"#);
    send(&channels, 1, r#"{"drive_ops": [["left", 0.2], ["cw", 3, 0.2]]}"#);

    let worker = {
        let channels = channels.clone();
        std::thread::spawn(move || {
            let mut sink = RecordingSink::default();
            let result = engine::run_worker(service, &channels, &mut sink);
            (result, sink)
        })
    };

    let first = futures_lite::future::block_on(channels.responses.receive());
    let second = futures_lite::future::block_on(channels.responses.receive());
    assert_eq!(first.ticket, Ticket { slot: 0, serial: 1 });
    assert_eq!(first.reply.status, 200);
    assert_eq!(second.ticket, Ticket { slot: 1, serial: 2 });
    assert_eq!(second.reply.status, 200);

    channels.request_shutdown();
    let (result, sink) = worker.join().unwrap();
    result.unwrap();

    assert_eq!(hw.elapsed(), Duration::from_millis(900));
    assert!(hw.all_deasserted());
    assert_eq!(hw.released(), 4);
    assert_eq!(sink.events.first(), Some(&DriveEvent::Ready { pins: [24, 26, 29, 31] }));
    assert_eq!(
        sink.events.last(),
        Some(&DriveEvent::Closed { completed: 2, failed: 0 })
    );
}

#[test]
fn worker_maps_line_fault_to_server_error() {
    let hw = MockHw::new();
    let mut service = DriveService::new(hw.session());
    let mut sink = RecordingSink::default();
    hw.fail_next_assert(LineRole::RightForward);

    let msg = CommandMsg {
        ticket: Ticket { slot: 0, serial: 1 },
        command: DriveCommand::Single(request("forward", 10, 0.5)),
    };
    assert_eq!(engine::process(&mut service, &msg, &mut sink).status, 500);
    assert_eq!(engine::process(&mut service, &msg, &mut sink).status, 200);
}

#[test]
fn halt_latch_maps_to_unavailable() {
    let hw = MockHw::new();
    let mut service = DriveService::new(hw.session());
    let mut sink = RecordingSink::default();
    service.halt_handle().trigger();

    let msg = CommandMsg {
        ticket: Ticket { slot: 0, serial: 1 },
        command: DriveCommand::Single(request("forward", 10, 0.5)),
    };
    assert_eq!(engine::process(&mut service, &msg, &mut sink).status, 503);
    assert!(hw.never_asserted());
}

#[test]
fn pending_shutdown_wins_over_queued_work() {
    let hw = MockHw::new();
    let service = DriveService::new(hw.session());
    let channels = DriveChannels::new();
    send(&channels, 0, r#"{"drive": "forward"}"#);
    channels.request_shutdown();

    let mut sink = RecordingSink::default();
    engine::run_worker(service, &channels, &mut sink).unwrap();

    assert_eq!(hw.elapsed(), Duration::ZERO);
    assert!(channels.responses.try_receive().is_err());
    assert_eq!(
        sink.events,
        vec![
            DriveEvent::Ready { pins: [24, 26, 29, 31] },
            DriveEvent::Closed { completed: 0, failed: 0 },
        ]
    );
}
