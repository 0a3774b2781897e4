//! Non-blocking UDP transport for the LiveOSC bridge
//!
//! The host calls into the bridge on its own schedule, so nothing here may
//! block: the receiver is drained until the OS reports `WouldBlock`, and the
//! sender fires datagrams without waiting for anything.
//!
//! ```rust,no_run
//! use osc_transport::{Endpoint, UdpReceiver, UdpSender, DEFAULT_RECV_BUFFER};
//!
//! let mut receiver = UdpReceiver::bind(Endpoint::default_listen(), DEFAULT_RECV_BUFFER)?;
//! let sender = UdpSender::open(Endpoint::default_reply())?;
//!
//! // Once per host tick
//! receiver.drain(|datagram, _from| {
//!     sender.send(datagram); // echo
//!     Ok::<(), String>(())
//! });
//! # Ok::<(), osc_transport::TransportError>(())
//! ```

mod config;
mod endpoint;
mod error;
mod socket;

pub use config::TransportConfig;
pub use endpoint::{Endpoint, DEFAULT_LISTEN_PORT, DEFAULT_REPLY_PORT};
pub use error::{Result, TransportError};
pub use socket::{DrainStats, UdpReceiver, UdpSender, DEFAULT_RECV_BUFFER, MAX_DATAGRAM};
