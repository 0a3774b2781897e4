//! OSC 1.0 codec for the LiveOSC bridge
//!
//! Encodes and decodes addressed messages (an address string plus typed
//! arguments) and bundles of them.
//!
//! # Quick Start
//!
//! ```rust
//! use osc_codec::{decode, encode_message, OscMessage, OscType};
//!
//! let bytes = encode_message(&OscMessage::new("/live/tempo", 120.5f32)).unwrap();
//! let messages = decode(&bytes).unwrap();
//!
//! assert_eq!(messages[0].address, "/live/tempo");
//! assert_eq!(messages[0].args, vec![OscType::Float(120.5)]);
//! ```
//!
//! # Argument Conversion
//!
//! Anything implementing [`IntoOscArgs`] can be used as an argument list. A
//! scalar is a single-element list, tuples keep their order:
//!
//! ```rust
//! use osc_codec::{OscMessage, OscType};
//!
//! let msg = OscMessage::new("/live/volume", (2i32, 0.73f32));
//! assert_eq!(msg.args, vec![OscType::Int(2), OscType::Float(0.73)]);
//! ```

mod decoder;
mod encoder;
mod error;
mod types;

pub use decoder::{decode, decode_packet};
pub use encoder::{encode_bundle, encode_message, encode_packet};
pub use error::{CodecError, Result};
pub use types::{IntoOscArgs, OscBundle, OscMessage, OscPacket, OscType, TimeTag};
