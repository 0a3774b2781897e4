//! # LiveOSC bridge
//!
//! Connects a live-set object graph ([`live_model`]) to OSC clients over UDP:
//!
//! - inbound datagrams are decoded and routed by literal address to the
//!   handler catalogue in [`handlers`], which reads or mutates the song and
//!   replies to the configured client
//! - native attribute listeners, managed by [`SubscriptionManager`], push
//!   every change back out as an OSC notification
//!
//! ```rust,no_run
//! use live_bridge::{init_logging, Bridge, BridgeConfig, LoggingMode};
//! use live_model::memory::MemorySong;
//!
//! init_logging(LoggingMode::Development)?;
//! let song = MemorySong::with_layout(8, 8);
//! let mut bridge = Bridge::start(song, BridgeConfig::load_default()?)?;
//! bridge.tick();
//! # Ok::<(), live_bridge::BridgeError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! host timer ──► Bridge::tick ──► UdpReceiver::drain ──► DispatchTable ──► handlers
//!                     │                                                      │
//!                     └── structural flag ──► SubscriptionManager::rebuild   ▼
//! song listeners ──► notify fns (BUCKET_TABLE) ──────────────────────► OutboundSender
//! ```
//!
//! Everything runs on the host's thread; none of the public types are `Send`.

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod outbound;
pub mod subscription;

pub use bridge::{Bridge, TickReport};
pub use config::{BridgeConfig, ConfigError};
pub use dispatch::{DispatchOutcome, DispatchTable, Handler, HandlerContext, HandlerResult};
pub use error::{BridgeError, DispatchError, HandlerError, Result, SubscriptionError};
pub use logging::{init_logging, init_logging_from_env, LoggingError, LoggingMode};
pub use outbound::{OutboundSender, OutboundStats};
pub use subscription::{
    BucketKind, RebuildReport, SubscriptionContext, SubscriptionManager, SubscriptionOptions,
    SubscriptionStats,
};

pub use osc_codec::{OscMessage, OscType};
pub use osc_transport::{Endpoint, TransportConfig};
