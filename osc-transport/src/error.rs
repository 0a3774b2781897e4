//! Error types for the datagram transport

use std::io;

use thiserror::Error;

/// Errors raised by socket setup and reconfiguration
///
/// Per-datagram send failures are never surfaced as errors; they are logged
/// and dropped inside [`crate::UdpSender::send`].
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to bind the listening (or sending) socket
    #[error("Failed to bind UDP socket to {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Socket option or other socket-level failure
    #[error("Socket error: {0}")]
    Socket(#[from] io::Error),

    /// Host name could not be resolved to an address
    #[error("Could not resolve {0}")]
    Resolve(String),

    /// Endpoint string could not be parsed
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;
