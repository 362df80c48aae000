//! Drive engine: the worker side of the network surface.
//!
//! **Transport-decoupled**: the engine never sees a socket. It takes
//! validated [`CommandMsg`]s off the command channel one at a time, runs
//! them on the [`DriveService`] and pushes a [`ResponseMsg`] back for the
//! I/O thread to deliver.
//!
//! Commands are strictly serialised: the next one is not received until
//! the current one has finished, cleanup included. A client that hangs up
//! mid-drive does not shorten the drive.

use embedded_hal::digital::OutputPin;
use futures_lite::future;
use log::{info, warn};

use super::channels::{CommandMsg, DriveChannels, ResponseMsg};
use super::codec::HttpReply;
use crate::app::ports::{Clock, EventSink};
use crate::app::service::DriveService;
use crate::error::Result;

/// Run one command and build the reply for its client.
pub fn process<P, C>(
    service: &mut DriveService<P, C>,
    msg: &CommandMsg,
    sink: &mut impl EventSink,
) -> HttpReply
where
    P: OutputPin,
    C: Clock,
{
    match service.handle_command(&msg.command, sink) {
        Ok(()) => HttpReply::ok(),
        Err(e) => HttpReply::from_drive_error(e),
    }
}

/// Block on the next command, or `None` once shutdown was requested.
///
/// Shutdown is polled first, so a pending shutdown wins over queued work.
pub fn next_command(channels: &DriveChannels) -> Option<CommandMsg> {
    future::block_on(future::or(
        async {
            channels.shutdown_requested().await;
            None
        },
        async { Some(channels.commands.receive().await) },
    ))
}

/// Worker loop. Returns after shutdown, with the session closed.
pub fn run_worker<P, C>(
    mut service: DriveService<P, C>,
    channels: &DriveChannels,
    sink: &mut impl EventSink,
) -> Result<()>
where
    P: OutputPin,
    C: Clock,
{
    service.start(sink);
    info!("drive worker: waiting for commands");

    while let Some(msg) = next_command(channels) {
        let reply = process(&mut service, &msg, sink);
        let response = ResponseMsg {
            ticket: msg.ticket,
            reply,
        };
        if channels.responses.try_send(response).is_err() {
            warn!("drive worker: response channel full, reply for slot {} dropped", msg.ticket.slot);
        }
    }

    info!(
        "drive worker: stopping ({} completed, {} failed)",
        service.completed(),
        service.failed()
    );
    service.shutdown(sink)
}
