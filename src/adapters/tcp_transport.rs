//! Multi-client TCP transport adapter.
//!
//! A non-blocking listener with a fixed number of connection slots. The
//! I/O thread polls it from its reactor tasks:
//!
//! 1. `bind()` binds the listener (non-blocking mode).
//! 2. `try_accept()` moves a pending connection into a free slot and gives
//!    it a fresh serial. When every slot is busy, connections wait in the
//!    kernel backlog.
//! 3. `read_client()` is non-blocking; `Ok(0)` means no data yet.
//! 4. `send_and_close()` writes a complete response and frees the slot.
//! 5. `evict_idle()` drops connections that sent no complete request in
//!    time, so silent clients cannot hold every slot.

use core::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

/// Upper bound on a blocking response write.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

// ───────────────────────────────────────────────────────────────
// Error type
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Binding the listener failed.
    Bind(io::ErrorKind),
    /// TCP or socket I/O failure.
    Io(io::ErrorKind),
    /// The slot has no connected client.
    NotConnected,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind(kind) => write!(f, "could not bind listener: {kind}"),
            Self::Io(kind) => write!(f, "socket I/O error: {kind}"),
            Self::NotConnected => write!(f, "no client connected"),
        }
    }
}

impl std::error::Error for TransportError {}

// ───────────────────────────────────────────────────────────────
// TcpTransport
// ───────────────────────────────────────────────────────────────

struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    serial: u64,
    accepted: Instant,
}

pub struct TcpTransport {
    listener: TcpListener,
    slots: Vec<Option<Connection>>,
    next_serial: u64,
}

impl TcpTransport {
    /// Bind to `addr` with room for `max_clients` concurrent connections.
    /// Port `0` lets the OS pick (see [`local_addr`](Self::local_addr)).
    pub fn bind(addr: SocketAddr, max_clients: usize) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).map_err(|e| TransportError::Bind(e.kind()))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| TransportError::Io(e.kind()))?;
        let transport = Self {
            listener,
            slots: (0..max_clients.max(1)).map(|_| None).collect(),
            next_serial: 0,
        };
        info!(
            "TCP: listening on {} ({} slots)",
            transport.local_addr()?,
            transport.slots.len()
        );
        Ok(transport)
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(|e| TransportError::Io(e.kind()))
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_connected(&self, slot: usize) -> bool {
        matches!(self.slots.get(slot), Some(Some(_)))
    }

    /// Serial of the connection currently in `slot`.
    pub fn serial(&self, slot: usize) -> Option<u64> {
        self.slots.get(slot)?.as_ref().map(|c| c.serial)
    }

    /// Accept one pending connection into a free slot.
    ///
    /// Returns `(slot, serial)` for the new connection.
    pub fn try_accept(&mut self) -> Option<(usize, u64)> {
        let slot = self.slots.iter().position(Option::is_none)?;
        match self.listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = stream.set_nonblocking(true) {
                    warn!("TCP: failed to set non-blocking on {}: {}", peer, e);
                    return None;
                }
                self.next_serial += 1;
                let serial = self.next_serial;
                debug!("TCP: {} -> slot {} (#{})", peer, slot, serial);
                self.slots[slot] = Some(Connection {
                    stream,
                    peer,
                    serial,
                    accepted: Instant::now(),
                });
                Some((slot, serial))
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => None,
            Err(e) => {
                warn!("TCP: accept error: {}", e);
                None
            }
        }
    }

    /// Non-blocking read from `slot`.
    ///
    /// EOF frees the slot and returns `NotConnected`.
    pub fn read_client(&mut self, slot: usize, buf: &mut [u8]) -> Result<usize, TransportError> {
        let conn = self
            .slots
            .get_mut(slot)
            .and_then(Option::as_mut)
            .ok_or(TransportError::NotConnected)?;
        match conn.stream.read(buf) {
            Ok(0) => {
                debug!("TCP: {} closed (EOF)", conn.peer);
                self.slots[slot] = None;
                Err(TransportError::NotConnected)
            }
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(e) => {
                self.slots[slot] = None;
                Err(TransportError::Io(e.kind()))
            }
        }
    }

    /// Write a complete response to `slot`, then close the connection.
    pub fn send_and_close(&mut self, slot: usize, data: &[u8]) -> Result<(), TransportError> {
        let conn = self
            .slots
            .get_mut(slot)
            .and_then(Option::take)
            .ok_or(TransportError::NotConnected)?;
        let mut stream = conn.stream;
        stream
            .set_nonblocking(false)
            .and_then(|()| stream.set_write_timeout(Some(WRITE_TIMEOUT)))
            .and_then(|()| stream.write_all(data))
            .and_then(|()| stream.flush())
            .map_err(|e| TransportError::Io(e.kind()))?;
        let _ = stream.shutdown(Shutdown::Both);
        debug!("TCP: replied to {} ({} bytes)", conn.peer, data.len());
        Ok(())
    }

    /// Drop every connection older than `timeout` whose slot is not `busy`.
    ///
    /// Returns the freed slots.
    pub fn evict_idle(&mut self, timeout: Duration, busy: impl Fn(usize) -> bool) -> Vec<usize> {
        let mut evicted = Vec::new();
        for (slot, entry) in self.slots.iter_mut().enumerate() {
            let expired = entry
                .as_ref()
                .is_some_and(|c| c.accepted.elapsed() >= timeout);
            if expired && !busy(slot) {
                if let Some(conn) = entry.take() {
                    info!("TCP: {} sent no request within {:?}, dropped", conn.peer, timeout);
                }
                evicted.push(slot);
            }
        }
        evicted
    }

    /// Drop the connection in `slot` without a reply.
    pub fn disconnect(&mut self, slot: usize) {
        if let Some(conn) = self.slots.get_mut(slot).and_then(Option::take) {
            debug!("TCP: dropped {}", conn.peer);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
