//! Non-blocking UDP sockets
//!
//! Two independent sockets: a [`UdpReceiver`] bound to the listen endpoint and
//! drained on every host tick, and a [`UdpSender`] that fires datagrams at the
//! reply endpoint. Neither ever blocks.

use std::fmt::Display;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::panic::{self, AssertUnwindSafe};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};

/// Largest payload a UDP datagram can carry over IPv4
pub const MAX_DATAGRAM: usize = 65_507;

/// Default receive buffer; holds any UDP datagram
pub const DEFAULT_RECV_BUFFER: usize = MAX_DATAGRAM;

/// Counters for one [`UdpReceiver::drain`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Datagrams handed to the handler
    pub received: usize,
    /// Empty or single-newline datagrams skipped
    pub ignored: usize,
    /// Datagrams whose handler returned an error or panicked, plus
    /// oversized datagrams that were dropped unread
    pub failed: usize,
}

impl DrainStats {
    /// Total datagrams pulled off the socket
    pub fn total(&self) -> usize {
        self.received + self.ignored
    }
}

// ============================================================================
// UdpReceiver
// ============================================================================

/// Listening socket drained cooperatively
pub struct UdpReceiver {
    socket: Option<UdpSocket>,
    endpoint: Endpoint,
    buffer: Vec<u8>,
}

impl UdpReceiver {
    /// Bind a non-blocking socket on `endpoint`
    ///
    /// Datagrams longer than `buffer_size` are dropped whole, never handed
    /// to the handler cut short. Bind failure is fatal for the caller; there
    /// is no fallback port.
    pub fn bind(endpoint: Endpoint, buffer_size: usize) -> Result<Self> {
        let socket = bind_nonblocking(&endpoint)?;
        tracing::debug!("Listening for OSC on {}", endpoint);

        Ok(Self {
            socket: Some(socket),
            endpoint,
            // One spare byte: a read that fills it means the datagram was cut
            buffer: vec![0; buffer_size.max(1) + 1],
        })
    }

    /// Process every datagram currently queued, then return
    ///
    /// The handler runs synchronously once per datagram, in arrival order. An
    /// error or panic from one datagram is logged and counted; the rest of
    /// the queue is still processed.
    pub fn drain<F, E>(&mut self, mut handler: F) -> DrainStats
    where
        F: FnMut(&[u8], SocketAddr) -> std::result::Result<(), E>,
        E: Display,
    {
        let mut stats = DrainStats::default();
        let Some(socket) = self.socket.as_ref() else {
            return stats;
        };

        loop {
            let (size, from) = match socket.recv_from(&mut self.buffer) {
                Ok(received) => received,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // ICMP port-unreachable from an earlier send shows up here on
                    // some platforms; it says nothing about the inbound queue.
                    if e.kind() == io::ErrorKind::ConnectionReset {
                        continue;
                    }
                    tracing::warn!("UDP receive on {} failed: {}", self.endpoint, e);
                    break;
                }
            };

            if size == self.buffer.len() {
                stats.received += 1;
                stats.failed += 1;
                tracing::warn!(
                    "Dropped datagram from {}: longer than the {} byte receive buffer",
                    from,
                    self.buffer.len() - 1
                );
                continue;
            }

            let datagram = &self.buffer[..size];
            if datagram.is_empty() || datagram == b"\n" {
                stats.ignored += 1;
                continue;
            }

            stats.received += 1;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(datagram, from)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    stats.failed += 1;
                    tracing::warn!("Dropped datagram from {}: {}", from, e);
                }
                Err(_) => {
                    stats.failed += 1;
                    tracing::error!("Handler panicked on datagram from {}", from);
                }
            }
        }

        if stats.total() > 0 {
            tracing::trace!(
                "Drained {} datagrams ({} ignored, {} failed)",
                stats.total(),
                stats.ignored,
                stats.failed
            );
        }
        stats
    }

    /// Close the current socket and bind a new one on `endpoint`
    ///
    /// On failure the receiver stays closed and reports the bind error.
    pub fn rebind(&mut self, endpoint: Endpoint) -> Result<()> {
        self.close();
        let socket = bind_nonblocking(&endpoint)?;
        tracing::debug!("Rebound OSC listener {} -> {}", self.endpoint, endpoint);
        self.socket = Some(socket);
        self.endpoint = endpoint;
        Ok(())
    }

    /// The configured endpoint
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Actual bound address (useful when binding port 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref()?.local_addr().ok()
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// Close the socket; later drains are no-ops
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            tracing::debug!("Closed OSC listener on {}", self.endpoint);
        }
    }
}

// ============================================================================
// UdpSender
// ============================================================================

/// Fire-and-forget datagram sender
pub struct UdpSender {
    socket: Option<UdpSocket>,
    destination: Endpoint,
    target: Option<SocketAddr>,
}

impl UdpSender {
    /// Open a sender for `destination`
    pub fn open(destination: Endpoint) -> Result<Self> {
        let mut sender = Self {
            socket: None,
            destination,
            target: None,
        };
        sender.reopen()?;
        Ok(sender)
    }

    /// Send one datagram, best effort
    ///
    /// Empty payloads are skipped. Failures are logged and swallowed; the
    /// return value only says whether the datagram left this process.
    pub fn send(&self, bytes: &[u8]) -> bool {
        if bytes.is_empty() {
            return false;
        }
        let (Some(socket), Some(target)) = (self.socket.as_ref(), self.target) else {
            tracing::warn!("Dropping {} byte datagram, sender is closed", bytes.len());
            return false;
        };

        match socket.send_to(bytes, target) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("UDP send to {} failed: {}", self.destination, e);
                false
            }
        }
    }

    /// Point the sender at a new destination, reopening the socket
    pub fn set_destination(&mut self, destination: Endpoint) -> Result<()> {
        tracing::debug!("OSC reply destination {} -> {}", self.destination, destination);
        self.destination = destination;
        self.reopen()
    }

    pub fn destination(&self) -> &Endpoint {
        &self.destination
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    pub fn close(&mut self) {
        self.socket = None;
        self.target = None;
    }

    fn reopen(&mut self) -> Result<()> {
        self.close();
        let target = self.destination.resolve()?;
        let local = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local).map_err(|source| TransportError::Bind {
            endpoint: local.to_string(),
            source,
        })?;
        socket.set_nonblocking(true)?;

        self.socket = Some(socket);
        self.target = Some(target);
        Ok(())
    }
}

fn bind_nonblocking(endpoint: &Endpoint) -> Result<UdpSocket> {
    let addr = endpoint.resolve()?;
    let socket = UdpSocket::bind(addr).map_err(|source| TransportError::Bind {
        endpoint: endpoint.to_string(),
        source,
    })?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_receiver() -> UdpReceiver {
        UdpReceiver::bind(Endpoint::new("127.0.0.1", 0), DEFAULT_RECV_BUFFER).unwrap()
    }

    #[test]
    fn test_drain_empty_queue_returns_immediately() {
        let mut receiver = loopback_receiver();
        let stats = receiver.drain(|_, _| Ok::<(), String>(()));
        assert_eq!(stats, DrainStats::default());
    }

    #[test]
    fn test_send_empty_payload_is_noop() {
        let sender = UdpSender::open(Endpoint::new("127.0.0.1", 9)).unwrap();
        assert!(!sender.send(&[]));
    }

    #[test]
    fn test_closed_receiver_drains_nothing() {
        let mut receiver = loopback_receiver();
        receiver.close();
        assert!(!receiver.is_open());
        assert!(receiver.local_addr().is_none());
        assert_eq!(receiver.drain(|_, _| Ok::<(), String>(())).total(), 0);
    }

    #[test]
    fn test_closed_sender_drops() {
        let mut sender = UdpSender::open(Endpoint::new("127.0.0.1", 9)).unwrap();
        sender.close();
        assert!(!sender.send(b"x"));
    }

    #[test]
    fn test_bind_conflict_is_error() {
        let receiver = loopback_receiver();
        let taken = receiver.local_addr().unwrap();
        let err = UdpReceiver::bind(Endpoint::from(taken), DEFAULT_RECV_BUFFER);
        assert!(matches!(err, Err(TransportError::Bind { .. })));
    }
}
