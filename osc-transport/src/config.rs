//! Transport configuration

use serde::{Deserialize, Serialize};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::socket::DEFAULT_RECV_BUFFER;

/// Socket configuration for the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Where inbound OSC is received
    /// Default: 0.0.0.0:9000
    pub listen: Endpoint,

    /// Where replies and notifications are sent
    /// Default: localhost:9001
    pub reply: Endpoint,

    /// Receive buffer size; longer datagrams are dropped whole and counted
    /// as failed
    /// Default: 65507 (any UDP datagram)
    pub recv_buffer_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            listen: Endpoint::default_listen(),
            reply: Endpoint::default_reply(),
            recv_buffer_size: DEFAULT_RECV_BUFFER,
        }
    }
}

impl TransportConfig {
    /// Loopback-only configuration with OS-assigned listen port
    pub fn loopback(reply_port: u16) -> Self {
        Self {
            listen: Endpoint::new("127.0.0.1", 0),
            reply: Endpoint::new("127.0.0.1", reply_port),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.recv_buffer_size < 16 {
            return Err(TransportError::InvalidEndpoint(format!(
                "receive buffer of {} bytes cannot hold an OSC message",
                self.recv_buffer_size
            )));
        }
        if self.reply.port == 0 {
            return Err(TransportError::InvalidEndpoint(format!(
                "reply endpoint {} has no port",
                self.reply
            )));
        }
        if self.listen.host.is_empty() || self.reply.host.is_empty() {
            return Err(TransportError::InvalidEndpoint("empty host".to_string()));
        }
        Ok(())
    }
}
