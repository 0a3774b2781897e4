//! Attribute-change subscriptions
//!
//! Every outbound notification comes from a native listener attached by the
//! [`SubscriptionManager`]. Listeners are grouped into buckets, one per
//! [`BucketKind`]; [`BUCKET_TABLE`] says which event each bucket listens to
//! and which function turns a firing into an OSC message.

mod kind;
mod manager;
pub mod table;
mod target;

pub use kind::{BucketKind, SubscriptionContext, TrackScope};
pub use manager::{
    DetachReport, RebuildReport, SubscriptionManager, SubscriptionOptions, SubscriptionStats,
};
pub use table::{BucketRow, NotifyFn, Outbound, BUCKET_TABLE};
pub use target::{EntityRef, WeakEntity};
