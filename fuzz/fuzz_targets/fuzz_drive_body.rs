//! Fuzz target: `parse_body`
//!
//! Every accepted body must describe steps the drive core would accept:
//! known operations, duty 0-10, and no step longer than the maximum.
//!
//! cargo fuzz run fuzz_drive_body

#![no_main]

use libfuzzer_sys::fuzz_target;
use rcdrive::app::commands::DriveCommand;
use rcdrive::rpc::request::{CommandDefaults, parse_body};

fuzz_target!(|data: &[u8]| {
    let defaults = CommandDefaults::default();
    let Ok(command) = parse_body(data, &defaults) else {
        return;
    };
    let steps = match &command {
        DriveCommand::Single(request) => std::slice::from_ref(request),
        DriveCommand::Sequence(requests) => requests.as_slice(),
    };
    assert_eq!(steps.len(), command.steps());
    for step in steps {
        assert!(step.duty.level() <= 10);
        assert!(step.duration <= defaults.max_duration);
    }
});
