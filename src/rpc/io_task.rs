//! Async I/O task: reactor-driven multi-client HTTP bridge.
//!
//! Runs in a dedicated thread using `edge-executor` for cooperative
//! multi-task scheduling and `async-io-mini` for reactor-driven
//! timers (no busy-spinning). Three concurrent futures:
//!
//! 1. **Accept**: polls `try_accept()` every 50ms via reactor timer
//! 2. **Read**: polls every connected client every 1ms, decodes requests,
//!    answers what it can locally and queues drive commands
//! 3. **Write**: truly async via `responses.receive().await`
//!    (wakes as soon as the drive worker finishes a command)
//!
//! ```text
//!  ┌────────────────────────────────────────────────────────────┐
//!  │  I/O Thread                                                │
//!  │  ┌──────────────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                        │  │
//!  │  │                                                      │  │
//!  │  │  ┌─────────┐  ┌──────────┐  ┌───────────────┐       │  │
//!  │  │  │ Accept  │  │ Read All │  │ Write (async) │       │  │
//!  │  │  │ 50ms ⏱  │  │ 1ms ⏱   │  │ wake-on-send  │       │  │
//!  │  │  └─────────┘  └──────────┘  └───────────────┘       │  │
//!  │  └──────────────────────────────────────────────────────┘  │
//!  └────────────────────────────────────────────────────────────┘
//! ```
//!
//! A connection whose request was queued is not read again; it waits for
//! its reply. If it has gone away by then the reply is discarded. A
//! connection that has not delivered a complete request within the request
//! timeout is dropped, freeing its slot.

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;
use std::sync::Arc;

use log::{debug, info, warn};

use super::channels::{CommandMsg, DriveChannels, Ticket};
use super::codec::{HttpReply, HttpRequest, Method, RequestDecoder};
use super::request::{CommandDefaults, parse_body};
use crate::adapters::tcp_transport::{TcpTransport, TransportError};

const READ_BUF_SIZE: usize = 1024;

const ACCEPT_INTERVAL: Duration = Duration::from_millis(50);
const READ_INTERVAL: Duration = Duration::from_millis(1);

// ── Per-client decoder state ─────────────────────────────────

struct IoSlot {
    decoder: RequestDecoder,
    /// A command for this connection is queued or running.
    awaiting_reply: bool,
}

impl IoSlot {
    fn new() -> Self {
        Self {
            decoder: RequestDecoder::new(),
            awaiting_reply: false,
        }
    }

    fn reset(&mut self) {
        self.decoder.reset();
        self.awaiting_reply = false;
    }
}

// ── Request dispatch ─────────────────────────────────────────

/// What to do with a decoded request.
enum Dispatch {
    /// Answer immediately and close.
    Reply(HttpReply),
    /// Handed to the worker; the reply comes later.
    Queued,
}

fn dispatch(
    request: HttpRequest,
    ticket: Ticket,
    channels: &DriveChannels,
    defaults: &CommandDefaults,
) -> Dispatch {
    match request.method {
        Method::Get => Dispatch::Reply(HttpReply::usage(200)),
        Method::Head => Dispatch::Reply(HttpReply::usage(200).without_body()),
        Method::Post => match parse_body(&request.body, defaults) {
            Ok(command) => {
                if channels.is_stopping() {
                    return Dispatch::Reply(HttpReply::unavailable("shutting down"));
                }
                debug!("IO[{}]: queueing {} step(s)", ticket.slot, command.steps());
                match channels.commands.try_send(CommandMsg { ticket, command }) {
                    Ok(()) => Dispatch::Queued,
                    Err(_) => {
                        warn!("IO[{}]: command queue full", ticket.slot);
                        Dispatch::Reply(HttpReply::unavailable("command queue full"))
                    }
                }
            }
            Err(e) => {
                info!("IO[{}]: rejected request: {}", ticket.slot, e);
                Dispatch::Reply(HttpReply::usage(400))
            }
        },
        Method::Other(ref m) => {
            debug!("IO[{}]: method {} not allowed", ticket.slot, m);
            Dispatch::Reply(HttpReply::usage(405))
        }
    }
}

fn reply(transport: &mut TcpTransport, slot: usize, reply: &HttpReply) {
    if let Err(e) = transport.send_and_close(slot, &reply.encode()) {
        warn!("IO[{}]: reply failed: {}", slot, e);
    }
}

// ── Async I/O loop ───────────────────────────────────────────

type SharedTransport = Rc<RefCell<TcpTransport>>;
type SharedSlots = Rc<RefCell<Vec<IoSlot>>>;

/// Accept task: checks for new TCP connections at 50ms intervals.
async fn accept_loop(transport: SharedTransport, slots: SharedSlots) {
    loop {
        {
            let mut t = transport.borrow_mut();
            while let Some((slot, serial)) = t.try_accept() {
                debug!("IO: client #{} in slot {}", serial, slot);
                slots.borrow_mut()[slot].reset();
            }
        }
        async_io_mini::Timer::after(ACCEPT_INTERVAL).await;
    }
}

/// Read task: polls all connected clients at 1ms intervals.
async fn read_loop(
    transport: SharedTransport,
    slots: SharedSlots,
    channels: Arc<DriveChannels>,
    defaults: CommandDefaults,
    request_timeout: Duration,
) {
    let mut read_buf = [0u8; READ_BUF_SIZE];
    loop {
        {
            let mut t = transport.borrow_mut();
            let mut s = slots.borrow_mut();
            let evicted = t.evict_idle(request_timeout, |slot| s[slot].awaiting_reply);
            for slot in evicted {
                s[slot].reset();
            }
            for slot in 0..t.capacity() {
                if !t.is_connected(slot) || s[slot].awaiting_reply {
                    continue;
                }
                let Some(serial) = t.serial(slot) else {
                    continue;
                };
                let n = match t.read_client(slot, &mut read_buf) {
                    Ok(0) => continue,
                    Ok(n) => n,
                    Err(TransportError::NotConnected) => {
                        s[slot].reset();
                        continue;
                    }
                    Err(e) => {
                        warn!("IO[{}]: read error: {}", slot, e);
                        s[slot].reset();
                        continue;
                    }
                };
                match s[slot].decoder.feed(&read_buf[..n]) {
                    Ok(None) => {}
                    Ok(Some(request)) => {
                        let ticket = Ticket { slot, serial };
                        match dispatch(request, ticket, &channels, &defaults) {
                            Dispatch::Queued => s[slot].awaiting_reply = true,
                            Dispatch::Reply(r) => {
                                reply(&mut t, slot, &r);
                                s[slot].reset();
                            }
                        }
                    }
                    Err(e) => {
                        info!("IO[{}]: bad request: {}", slot, e);
                        reply(&mut t, slot, &HttpReply::usage(400));
                        s[slot].reset();
                    }
                }
            }
        }
        async_io_mini::Timer::after(READ_INTERVAL).await;
    }
}

/// Write task: wakes when the drive worker pushes a response.
async fn write_loop(transport: SharedTransport, slots: SharedSlots, channels: Arc<DriveChannels>) {
    loop {
        let resp = channels.responses.receive().await;
        let Ticket { slot, serial } = resp.ticket;

        let mut t = transport.borrow_mut();
        if t.serial(slot) != Some(serial) {
            debug!("IO[{}]: client #{} left before its reply", slot, serial);
            continue;
        }
        reply(&mut t, slot, &resp.reply);
        slots.borrow_mut()[slot].reset();
    }
}

/// Resolves once shutdown was requested.
async fn stop_watch(channels: Arc<DriveChannels>) {
    while !channels.is_stopping() {
        async_io_mini::Timer::after(ACCEPT_INTERVAL).await;
    }
}

/// Entry point for the I/O thread. Sets up the executor, spawns the
/// three async tasks, and drives them until shutdown.
fn run_io_loop(
    transport: TcpTransport,
    channels: Arc<DriveChannels>,
    defaults: CommandDefaults,
    request_timeout: Duration,
) {
    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();

    let capacity = transport.capacity();
    let transport: SharedTransport = Rc::new(RefCell::new(transport));
    let slots: SharedSlots = Rc::new(RefCell::new((0..capacity).map(|_| IoSlot::new()).collect()));

    executor
        .spawn(accept_loop(transport.clone(), slots.clone()))
        .detach();
    executor
        .spawn(read_loop(
            transport.clone(),
            slots.clone(),
            channels.clone(),
            defaults,
            request_timeout,
        ))
        .detach();
    executor
        .spawn(write_loop(transport.clone(), slots.clone(), channels.clone()))
        .detach();

    info!("IO task started (async, reactor-driven, {} max clients)", capacity);

    futures_lite::future::block_on(executor.run(stop_watch(channels)));
    info!("IO task stopped");
}

// ── Thread spawn ─────────────────────────────────────────────

/// Spawn the I/O task in its own thread.
///
/// Takes ownership of the transport; the listener closes when the thread
/// exits after [`DriveChannels::request_shutdown`]. Clients get
/// `request_timeout` from accept to deliver a complete request.
pub fn spawn(
    transport: TcpTransport,
    channels: Arc<DriveChannels>,
    defaults: CommandDefaults,
    request_timeout: Duration,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    crate::drivers::task::spawn(crate::drivers::task::IO_THREAD, move || {
        run_io_loop(transport, channels, defaults, request_timeout)
    })
}

// ── Tests ────────────────────────────────────────────────────
