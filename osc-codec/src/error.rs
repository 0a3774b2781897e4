//! Error types for OSC encoding and decoding.

use thiserror::Error;

/// Errors produced while encoding or decoding OSC packets.
///
/// Decoding is atomic: any of these errors means the whole datagram is
/// rejected and no messages from it are delivered.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// The packet ended before a complete field could be read
    #[error("Packet truncated: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Address pattern missing the leading '/'
    #[error("Invalid OSC address: {0:?}")]
    InvalidAddress(String),

    /// The address string was empty
    #[error("OSC address is empty")]
    EmptyAddress,

    /// Type tag string did not start with ','
    #[error("Invalid type tag string: {0:?}")]
    InvalidTypeTags(String),

    /// A type tag this codec does not understand
    #[error("Unknown OSC type tag '{0}'")]
    UnknownTypeTag(char),

    /// String field not NUL-terminated, badly padded or not UTF-8
    #[error("Invalid OSC string at offset {0}")]
    InvalidString(usize),

    /// A bundle element declared a size that is not a positive multiple of 4
    /// or runs past the end of the bundle
    #[error("Invalid bundle element size {size} at offset {offset}")]
    BundleElementSize { offset: usize, size: i32 },

    /// Outbound argument outside {int, float, string}
    #[error("Unsupported argument type for outbound message: {0}")]
    UnsupportedArgument(&'static str),
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;
