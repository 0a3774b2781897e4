//! Bucket identities and the per-subscription context

use std::fmt;

/// Which family of tracks a track-level subscription belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum TrackScope {
    /// Visible tracks
    #[default]
    Normal,
    Return,
    Master,
}

/// One subscription bucket: entity category × event × track scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BucketKind {
    // Song
    Tempo,
    Playing,
    Overdub,
    SelectedScene,
    SelectedTrack,
    /// Track list changed
    Tracks,

    // Tracks and mixer
    TrackName(TrackScope),
    Arm,
    Solo(TrackScope),
    Mute(TrackScope),
    Volume(TrackScope),
    Pan(TrackScope),
    Send(TrackScope),
    Crossfader,
    SelectedDevice(TrackScope),
    /// Device chain changed
    Devices,
    /// Left and right output meters
    Meter(TrackScope),

    // Devices
    DeviceParam(TrackScope),
    /// Parameter list changed
    Parameters,

    // Clips
    /// Clip added to or removed from a slot
    SlotHasClip,
    ClipStatus,
    ClipPosition,
    ClipName,
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Indices captured when a subscription is made
///
/// The notification function reads them instead of searching the graph, so
/// they are only valid until the next rebuild, which recreates every
/// subscription with fresh indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscriptionContext {
    pub scope: TrackScope,
    pub track: usize,
    pub slot: usize,
    pub send: usize,
    pub device: usize,
    pub parameter: usize,
    /// Which of the bucket's events fired; for meters 0 is left, 1 right
    pub channel: usize,
}

impl SubscriptionContext {
    /// Context for song-level subscriptions
    pub fn song() -> Self {
        Self::default()
    }

    pub fn track(scope: TrackScope, track: usize) -> Self {
        Self {
            scope,
            track,
            ..Self::default()
        }
    }

    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = slot;
        self
    }

    pub fn with_send(mut self, send: usize) -> Self {
        self.send = send;
        self
    }

    pub fn with_device(mut self, device: usize) -> Self {
        self.device = device;
        self
    }

    pub fn with_parameter(mut self, parameter: usize) -> Self {
        self.parameter = parameter;
        self
    }

    pub fn with_channel(mut self, channel: usize) -> Self {
        self.channel = channel;
        self
    }
}
