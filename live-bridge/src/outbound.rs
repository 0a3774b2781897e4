//! Outbound OSC: encode and send, best effort
//!
//! Shared by handlers (replies) and subscription callbacks (notifications)
//! through an `Rc`. Encoding failures and send failures are logged and
//! counted, never returned.

use std::cell::{Cell, RefCell};

use osc_codec::{encode_bundle, encode_message, OscBundle, OscMessage};
use osc_transport::{Endpoint, TransportError, UdpSender};

/// Counters since the sender was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboundStats {
    /// Packets handed to the sink
    pub sent: u64,
    /// Packets that failed to encode or send
    pub dropped: u64,
}

enum Sink {
    Udp(UdpSender),
    /// Encoded packets kept in memory
    Recording(Vec<Vec<u8>>),
    Closed,
}

/// Encoder plus datagram sink
pub struct OutboundSender {
    sink: RefCell<Sink>,
    closed: Cell<bool>,
    sent: Cell<u64>,
    dropped: Cell<u64>,
}

impl OutboundSender {
    /// Sender writing to a UDP socket
    pub fn udp(sender: UdpSender) -> Self {
        Self::with_sink(Sink::Udp(sender))
    }

    /// Sender that keeps every encoded packet in memory
    ///
    /// Used for tests and dry runs; see [`take_recorded`](Self::take_recorded).
    pub fn recording() -> Self {
        Self::with_sink(Sink::Recording(Vec::new()))
    }

    fn with_sink(sink: Sink) -> Self {
        Self {
            sink: RefCell::new(sink),
            closed: Cell::new(false),
            sent: Cell::new(0),
            dropped: Cell::new(0),
        }
    }

    /// Encode and send one message
    pub fn send(&self, message: &OscMessage) -> bool {
        match encode_message(message) {
            Ok(bytes) => self.transmit(bytes),
            Err(e) => {
                tracing::warn!("Not sending {}: {}", message.address, e);
                self.dropped.set(self.dropped.get() + 1);
                false
            }
        }
    }

    /// Encode and send a bundle as one datagram
    pub fn send_bundle(&self, bundle: &OscBundle) -> bool {
        if bundle.is_empty() {
            return false;
        }
        match encode_bundle(bundle) {
            Ok(bytes) => self.transmit(bytes),
            Err(e) => {
                tracing::warn!("Not sending bundle of {} packets: {}", bundle.len(), e);
                self.dropped.set(self.dropped.get() + 1);
                false
            }
        }
    }

    fn transmit(&self, bytes: Vec<u8>) -> bool {
        let ok = !self.closed.get()
            && match &mut *self.sink.borrow_mut() {
                Sink::Udp(sender) => sender.send(&bytes),
                Sink::Recording(packets) => {
                    packets.push(bytes);
                    true
                }
                Sink::Closed => false,
            };
        if ok {
            self.sent.set(self.sent.get() + 1);
        } else {
            self.dropped.set(self.dropped.get() + 1);
        }
        ok
    }

    /// Point a UDP sender at a new destination
    ///
    /// A no-op for recording and closed senders.
    pub fn set_destination(&self, destination: Endpoint) -> Result<(), TransportError> {
        match &mut *self.sink.borrow_mut() {
            Sink::Udp(sender) => sender.set_destination(destination),
            Sink::Recording(_) | Sink::Closed => Ok(()),
        }
    }

    pub fn destination(&self) -> Option<Endpoint> {
        match &*self.sink.borrow() {
            Sink::Udp(sender) => Some(sender.destination().clone()),
            Sink::Recording(_) | Sink::Closed => None,
        }
    }

    /// Close the sink; later sends are dropped
    ///
    /// A recording sink keeps what it already holds.
    pub fn close(&self) {
        self.closed.set(true);
        let mut sink = self.sink.borrow_mut();
        if let Sink::Udp(_) = &*sink {
            *sink = Sink::Closed;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    pub fn stats(&self) -> OutboundStats {
        OutboundStats {
            sent: self.sent.get(),
            dropped: self.dropped.get(),
        }
    }

    /// Drain recorded packets, flattening bundles into their messages
    ///
    /// Returns nothing for UDP senders.
    pub fn take_recorded(&self) -> Vec<OscMessage> {
        self.take_recorded_packets()
            .iter()
            .filter_map(|bytes| osc_codec::decode(bytes).ok())
            .flatten()
            .collect()
    }

    /// Drain recorded packets as raw datagrams
    pub fn take_recorded_packets(&self) -> Vec<Vec<u8>> {
        match &mut *self.sink.borrow_mut() {
            Sink::Recording(packets) => std::mem::take(packets),
            Sink::Udp(_) | Sink::Closed => Vec::new(),
        }
    }
}

impl std::fmt::Debug for OutboundSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sink = match &*self.sink.borrow() {
            Sink::Udp(sender) => format!("udp -> {}", sender.destination()),
            Sink::Recording(packets) => format!("recording ({} pending)", packets.len()),
            Sink::Closed => "closed".to_string(),
        };
        f.debug_struct("OutboundSender")
            .field("sink", &sink)
            .field("sent", &self.sent.get())
            .field("dropped", &self.dropped.get())
            .finish()
    }
}
