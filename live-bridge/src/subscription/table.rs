//! Static bucket table
//!
//! One row per [`BucketKind`]: which native events it listens to, whether a
//! firing means the topology changed, and which outbound address and
//! notification function it uses. Every notification function is a plain
//! `fn` that reads the current value straight from the entity; the only
//! per-subscription state is the [`SubscriptionContext`].

use live_model::{ClipState, Event, Song};
use osc_codec::OscMessage;

use super::kind::{BucketKind, SubscriptionContext, TrackScope};
use super::target::EntityRef;

/// Builds the outbound message for one firing, or `None` to stay quiet
pub type NotifyFn = fn(
    address: &'static str,
    entity: &EntityRef,
    ctx: &SubscriptionContext,
    song: &dyn Song,
) -> Option<OscMessage>;

/// Outbound half of a bucket
#[derive(Debug, Clone, Copy)]
pub struct Outbound {
    pub address: &'static str,
    pub build: NotifyFn,
}

/// One row of [`BUCKET_TABLE`]
#[derive(Debug, Clone, Copy)]
pub struct BucketRow {
    pub kind: BucketKind,
    /// One listener per event; its position becomes the context's channel
    pub events: &'static [Event],
    /// Firing sets the structural-change flag
    pub structural: bool,
    /// `None` for buckets that only signal a topology change
    pub outbound: Option<Outbound>,
}

const fn row(
    kind: BucketKind,
    events: &'static [Event],
    address: &'static str,
    build: NotifyFn,
) -> BucketRow {
    BucketRow {
        kind,
        events,
        structural: false,
        outbound: Some(Outbound { address, build }),
    }
}

const fn structural(
    kind: BucketKind,
    events: &'static [Event],
    outbound: Option<Outbound>,
) -> BucketRow {
    BucketRow {
        kind,
        events,
        structural: true,
        outbound,
    }
}

use BucketKind as K;
use TrackScope::{Master, Normal, Return};

const METERS: &[Event] = &[Event::OutputMeterLeft, Event::OutputMeterRight];

pub static BUCKET_TABLE: &[BucketRow] = &[
    // Song
    row(K::Tempo, &[Event::Tempo], "/live/tempo", tempo),
    row(K::Playing, &[Event::IsPlaying], "/live/play", playing),
    row(K::Overdub, &[Event::Overdub], "/live/overdub", overdub),
    row(K::SelectedScene, &[Event::SelectedScene], "/live/scene", selected_scene),
    row(K::SelectedTrack, &[Event::SelectedTrack], "/live/track", selected_track),
    structural(
        K::Tracks,
        &[Event::Tracks],
        Some(Outbound { address: "/live/refresh", build: refresh }),
    ),
    // Track names
    row(K::TrackName(Normal), &[Event::Name], "/live/name/track", track_name),
    row(K::TrackName(Return), &[Event::Name], "/live/name/return", track_name),
    // Track switches
    row(K::Arm, &[Event::Arm], "/live/arm", arm),
    row(K::Solo(Normal), &[Event::Solo], "/live/solo", solo),
    row(K::Solo(Return), &[Event::Solo], "/live/return/solo", solo),
    row(K::Mute(Normal), &[Event::Mute], "/live/mute", mute),
    row(K::Mute(Return), &[Event::Mute], "/live/return/mute", mute),
    // Mixer parameters
    row(K::Volume(Normal), &[Event::Value], "/live/volume", mixer_value),
    row(K::Volume(Return), &[Event::Value], "/live/return/volume", mixer_value),
    row(K::Volume(Master), &[Event::Value], "/live/master/volume", mixer_value),
    row(K::Pan(Normal), &[Event::Value], "/live/pan", mixer_value),
    row(K::Pan(Return), &[Event::Value], "/live/return/pan", mixer_value),
    row(K::Pan(Master), &[Event::Value], "/live/master/pan", mixer_value),
    row(K::Send(Normal), &[Event::Value], "/live/send", send_value),
    row(K::Send(Return), &[Event::Value], "/live/return/send", send_value),
    row(K::Crossfader, &[Event::Value], "/live/master/crossfader", mixer_value),
    // Output meters
    row(K::Meter(Normal), METERS, "/live/track/meter", output_meter),
    row(K::Meter(Return), METERS, "/live/return/meter", output_meter),
    row(K::Meter(Master), METERS, "/live/master/meter", output_meter),
    // Devices
    row(
        K::SelectedDevice(Normal),
        &[Event::SelectedDevice],
        "/live/device/selected",
        selected_device,
    ),
    row(
        K::SelectedDevice(Return),
        &[Event::SelectedDevice],
        "/live/return/device/selected",
        selected_device,
    ),
    row(
        K::SelectedDevice(Master),
        &[Event::SelectedDevice],
        "/live/master/devices/selected",
        selected_device,
    ),
    structural(K::Devices, &[Event::Devices], None),
    row(K::DeviceParam(Normal), &[Event::Value], "/live/device/param", device_param),
    row(K::DeviceParam(Return), &[Event::Value], "/live/return/device/param", device_param),
    row(K::DeviceParam(Master), &[Event::Value], "/live/master/device/param", device_param),
    structural(K::Parameters, &[Event::Parameters], None),
    // Clips
    structural(
        K::SlotHasClip,
        &[Event::HasClip],
        Some(Outbound { address: "/live/track/info", build: slot_has_clip }),
    ),
    row(K::ClipStatus, &[Event::PlayingStatus], "/live/clip/info", clip_status),
    row(K::ClipPosition, &[Event::PlayingPosition], "/live/clip/position", clip_position),
    row(K::ClipName, &[Event::Name], "/live/name/clip", clip_name),
];

/// Table row for `kind`
pub fn lookup(kind: BucketKind) -> Option<&'static BucketRow> {
    BUCKET_TABLE.iter().find(|row| row.kind == kind)
}

// ============================================================================
// Song
// ============================================================================

fn tempo(
    address: &'static str,
    e: &EntityRef,
    _: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    e.song().map(|song| OscMessage::new(address, song.tempo()))
}

fn playing(
    address: &'static str,
    e: &EntityRef,
    _: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    let state = if e.song()?.is_playing() { 2 } else { 1 };
    Some(OscMessage::new(address, state))
}

fn overdub(
    address: &'static str,
    e: &EntityRef,
    _: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    Some(OscMessage::new(address, e.song()?.overdub() as i32 + 1))
}

/// 1-based; 0 when nothing is selected
fn selected_scene(
    address: &'static str,
    e: &EntityRef,
    _: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    let index = e.song()?.selected_scene().map(|i| i + 1).unwrap_or(0);
    Some(OscMessage::new(address, index))
}

fn selected_track(
    address: &'static str,
    e: &EntityRef,
    _: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    let index = e.song()?.selected_track().map(|i| i + 1).unwrap_or(0);
    Some(OscMessage::new(address, index))
}

fn refresh(
    address: &'static str,
    _: &EntityRef,
    _: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    Some(OscMessage::new(address, 1))
}

// ============================================================================
// Tracks and mixer
// ============================================================================

fn track_name(
    address: &'static str,
    e: &EntityRef,
    ctx: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    Some(OscMessage::new(address, (ctx.track, e.track()?.name())))
}

fn arm(
    address: &'static str,
    e: &EntityRef,
    ctx: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    Some(OscMessage::new(address, (ctx.track, e.track()?.arm())))
}

fn solo(
    address: &'static str,
    e: &EntityRef,
    ctx: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    Some(OscMessage::new(address, (ctx.track, e.track()?.solo())))
}

fn mute(
    address: &'static str,
    e: &EntityRef,
    ctx: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    Some(OscMessage::new(address, (ctx.track, e.track()?.mute())))
}

/// Volume, pan and crossfader: master values carry no track index
fn mixer_value(
    address: &'static str,
    e: &EntityRef,
    ctx: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    let value = e.parameter()?.value();
    Some(match ctx.scope {
        Master => OscMessage::new(address, value),
        Normal | Return => OscMessage::new(address, (ctx.track, value)),
    })
}

fn send_value(
    address: &'static str,
    e: &EntityRef,
    ctx: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    let value = e.parameter()?.value();
    Some(OscMessage::new(address, (ctx.track, ctx.send, value)))
}

/// `(track, channel, level)`; the master carries no track index
fn output_meter(
    address: &'static str,
    e: &EntityRef,
    ctx: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    let track = e.track()?;
    let level = match ctx.channel {
        0 => track.output_meter_left(),
        _ => track.output_meter_right(),
    };
    Some(match ctx.scope {
        Master => OscMessage::new(address, (ctx.channel, level)),
        Normal | Return => OscMessage::new(address, (ctx.track, ctx.channel, level)),
    })
}

/// Silent when the selection is cleared
fn selected_device(
    address: &'static str,
    e: &EntityRef,
    ctx: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    let device = e.track()?.selected_device()?;
    Some(match ctx.scope {
        Master => OscMessage::new(address, device),
        Normal | Return => OscMessage::new(address, (ctx.track, device)),
    })
}

fn device_param(
    address: &'static str,
    e: &EntityRef,
    ctx: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    let param = e.parameter()?;
    let (value, name) = (param.value(), param.name());
    Some(match ctx.scope {
        Master => OscMessage::new(address, (ctx.device, ctx.parameter, value, name)),
        Normal | Return => {
            OscMessage::new(address, (ctx.track, ctx.device, ctx.parameter, value, name))
        }
    })
}

// ============================================================================
// Clips
// ============================================================================

/// `(track, armed, slot, state, loop length)`; an emptied slot reports
/// state 0 and length 0
fn slot_has_clip(
    address: &'static str,
    e: &EntityRef,
    ctx: &SubscriptionContext,
    song: &dyn Song,
) -> Option<OscMessage> {
    let slot = e.clip_slot()?;
    let armed = song
        .tracks()
        .get(ctx.track)
        .map(|track| track.can_be_armed() && track.arm())
        .unwrap_or(false);

    let clip = slot.clip();
    let state = ClipState::of(clip.as_deref()).code();
    let length = clip
        .as_ref()
        .map(|c| c.loop_end() - c.loop_start())
        .unwrap_or(0.0);

    Some(OscMessage::new(address, (ctx.track, armed, ctx.slot, state, length)))
}

fn clip_status(
    address: &'static str,
    e: &EntityRef,
    ctx: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    let state = ClipState::of(Some(e.clip()?)).code();
    Some(OscMessage::new(address, (ctx.track, ctx.slot, state)))
}

/// Only while the clip is playing
fn clip_position(
    address: &'static str,
    e: &EntityRef,
    ctx: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    let clip = e.clip()?;
    if !clip.is_playing() {
        return None;
    }
    Some(OscMessage::new(
        address,
        (
            ctx.track,
            ctx.slot,
            clip.playing_position(),
            clip.length(),
            clip.loop_start(),
            clip.loop_end(),
        ),
    ))
}

fn clip_name(
    address: &'static str,
    e: &EntityRef,
    ctx: &SubscriptionContext,
    _: &dyn Song,
) -> Option<OscMessage> {
    let clip = e.clip()?;
    Some(OscMessage::new(address, (ctx.track, ctx.slot, clip.name(), clip.color())))
}
