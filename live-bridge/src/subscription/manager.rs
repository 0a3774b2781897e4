//! Subscription lifecycle
//!
//! [`SubscriptionManager`] owns one bucket per [`BucketKind`]. Each bucket
//! maps an entity's identity to the native listeners registered on it (one
//! per event the bucket listens to), so a bucket never holds two entries for
//! the same entity and every registration it made can be found again for
//! detaching.
//!
//! Topology changes are handled by [`SubscriptionManager::rebuild`]: every
//! bucket is emptied (detaching whatever is still attached) and the current
//! graph is walked to subscribe everything afresh.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use live_model::{EntityId, Event, Listener, Song, SongRef, TrackRef};
use tracing::debug;

use super::kind::{BucketKind, SubscriptionContext, TrackScope};
use super::table::{self, BucketRow, BUCKET_TABLE};
use super::target::{EntityRef, WeakEntity};
use crate::error::SubscriptionError;
use crate::outbound::OutboundSender;

/// What the rebuild walk subscribes beyond the fixed catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionOptions {
    /// Subscribe clip playing positions (high-rate traffic)
    pub clip_positions: bool,
    /// Subscribe track, return and master output meters (high-rate traffic)
    pub meters: bool,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            clip_positions: true,
            meters: true,
        }
    }
}

/// Cumulative counters over the manager's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionStats {
    pub subscribed: u64,
    pub detached: u64,
    /// Entries whose entity was gone (or no longer held the listener) at
    /// unsubscribe time
    pub already_gone: u64,
    /// Attach or detach calls rejected by the entity
    pub failed: u64,
    pub rebuilds: u64,
}

/// Outcome of emptying one or more buckets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetachReport {
    pub detached: usize,
    pub already_gone: usize,
    pub failed: usize,
}

impl DetachReport {
    fn merge(&mut self, other: DetachReport) {
        self.detached += other.detached;
        self.already_gone += other.already_gone;
        self.failed += other.failed;
    }
}

/// Outcome of one [`SubscriptionManager::rebuild`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub detached: usize,
    pub already_gone: usize,
    pub subscribed: usize,
    pub failed: usize,
}

struct Entry {
    target: WeakEntity,
    listeners: Vec<(Event, Listener)>,
    context: SubscriptionContext,
}

pub struct SubscriptionManager {
    song: Weak<dyn Song>,
    outbound: Rc<OutboundSender>,
    structural: Rc<Cell<bool>>,
    options: SubscriptionOptions,
    buckets: BTreeMap<BucketKind, HashMap<EntityId, Entry>>,
    stats: SubscriptionStats,
}

impl SubscriptionManager {
    /// Create a manager with one empty bucket per table row
    ///
    /// `structural` is set by any listener on a topology bucket; the owner
    /// polls and clears it.
    pub fn new(
        song: &SongRef,
        outbound: Rc<OutboundSender>,
        structural: Rc<Cell<bool>>,
        options: SubscriptionOptions,
    ) -> Self {
        let buckets = BUCKET_TABLE
            .iter()
            .map(|row| (row.kind, HashMap::new()))
            .collect();
        Self {
            song: Rc::downgrade(song),
            outbound,
            structural,
            options,
            buckets,
            stats: SubscriptionStats::default(),
        }
    }

    pub fn options(&self) -> SubscriptionOptions {
        self.options
    }

    pub fn set_options(&mut self, options: SubscriptionOptions) {
        self.options = options;
    }

    // ========================================================================
    // Subscribe / unsubscribe
    // ========================================================================

    /// Attach the bucket's listeners to `entity`
    ///
    /// Returns `Ok(false)` if the entity is already in the bucket; nothing is
    /// registered twice. If the entity rejects any of the bucket's events,
    /// the listeners already attached are taken off again.
    pub fn subscribe(
        &mut self,
        kind: BucketKind,
        entity: &EntityRef,
        context: SubscriptionContext,
    ) -> Result<bool, SubscriptionError> {
        let row = table::lookup(kind).ok_or(SubscriptionError::UnknownBucket(kind))?;
        let id = entity.id();
        match self.buckets.get(&kind) {
            None => return Err(SubscriptionError::UnknownBucket(kind)),
            Some(bucket) if bucket.contains_key(&id) => return Ok(false),
            Some(_) => {}
        }

        let target = entity.downgrade();
        let mut listeners = Vec::with_capacity(row.events.len());
        for (channel, &event) in row.events.iter().enumerate() {
            let listener = self.listener_for(row, target.clone(), context.with_channel(channel));
            if let Err(source) = entity.add_listener(event, &listener) {
                for (event, listener) in &listeners {
                    let _ = entity.remove_listener(*event, listener);
                }
                self.stats.failed += 1;
                return Err(SubscriptionError::Attach {
                    kind,
                    entity: id,
                    source,
                });
            }
            listeners.push((event, listener));
        }

        if let Some(bucket) = self.buckets.get_mut(&kind) {
            bucket.insert(
                id,
                Entry {
                    target,
                    listeners,
                    context,
                },
            );
        }
        self.stats.subscribed += 1;
        Ok(true)
    }

    /// Detach every listener in the bucket and empty it
    pub fn unsubscribe_all(&mut self, kind: BucketKind) -> DetachReport {
        let mut report = DetachReport::default();
        let Some(bucket) = self.buckets.get_mut(&kind) else {
            return report;
        };

        for (id, entry) in bucket.drain() {
            let Some(entity) = entry.target.upgrade().filter(|e| e.is_alive()) else {
                report.already_gone += 1;
                continue;
            };

            let mut held = 0;
            let mut rejected = None;
            for (event, listener) in &entry.listeners {
                if !entity.has_listener(*event, listener) {
                    continue;
                }
                held += 1;
                if let Err(source) = entity.remove_listener(*event, listener) {
                    rejected = Some(source);
                }
            }

            match (held, rejected) {
                (0, _) => report.already_gone += 1,
                (_, None) => report.detached += 1,
                (_, Some(source)) => {
                    report.failed += 1;
                    let error = SubscriptionError::Detach {
                        kind,
                        entity: id,
                        source,
                    };
                    debug!(%error, "Detach rejected");
                }
            }
        }

        self.stats.detached += report.detached as u64;
        self.stats.already_gone += report.already_gone as u64;
        self.stats.failed += report.failed as u64;
        report
    }

    /// Empty every bucket
    pub fn clear(&mut self) -> DetachReport {
        let kinds: Vec<BucketKind> = self.buckets.keys().copied().collect();
        let mut report = DetachReport::default();
        for kind in kinds {
            report.merge(self.unsubscribe_all(kind));
        }
        report
    }

    /// Drop every subscription and resubscribe against the current topology
    pub fn rebuild(&mut self, song: &SongRef) -> RebuildReport {
        self.song = Rc::downgrade(song);

        let detach = self.clear();
        let mut report = RebuildReport {
            detached: detach.detached,
            already_gone: detach.already_gone,
            failed: detach.failed,
            ..RebuildReport::default()
        };

        self.walk_song(song, &mut report);
        self.stats.rebuilds += 1;

        debug!(
            detached = report.detached,
            already_gone = report.already_gone,
            subscribed = report.subscribed,
            failed = report.failed,
            "Rebuilt subscriptions"
        );
        report
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn len(&self, kind: BucketKind) -> usize {
        self.buckets.get(&kind).map(HashMap::len).unwrap_or(0)
    }

    /// Subscriptions across all buckets
    pub fn total(&self) -> usize {
        self.buckets.values().map(HashMap::len).sum()
    }

    /// Native listeners across all buckets; meter entries hold two each
    pub fn listener_total(&self) -> usize {
        self.buckets
            .values()
            .flat_map(HashMap::values)
            .map(|entry| entry.listeners.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn is_subscribed(&self, kind: BucketKind, id: EntityId) -> bool {
        self.buckets
            .get(&kind)
            .map(|bucket| bucket.contains_key(&id))
            .unwrap_or(false)
    }

    /// Context captured when `id` was subscribed to `kind`
    pub fn context(&self, kind: BucketKind, id: EntityId) -> Option<SubscriptionContext> {
        self.buckets.get(&kind)?.get(&id).map(|entry| entry.context)
    }

    /// Entity ids currently in `kind`, sorted
    pub fn entries(&self, kind: BucketKind) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .buckets
            .get(&kind)
            .map(|bucket| bucket.keys().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn kinds(&self) -> impl Iterator<Item = BucketKind> + '_ {
        self.buckets.keys().copied()
    }

    pub fn stats(&self) -> SubscriptionStats {
        self.stats
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn listener_for(
        &self,
        row: &'static BucketRow,
        target: WeakEntity,
        context: SubscriptionContext,
    ) -> Listener {
        let song = self.song.clone();
        let outbound = Rc::clone(&self.outbound);
        let structural = Rc::clone(&self.structural);

        Listener::new(move || {
            if row.structural {
                structural.set(true);
            }
            let Some(notify) = row.outbound else {
                return;
            };
            let (Some(entity), Some(song)) = (target.upgrade(), song.upgrade()) else {
                return;
            };
            if let Some(message) = (notify.build)(notify.address, &entity, &context, &*song) {
                outbound.send(&message);
            }
        })
    }

    fn attach(
        &mut self,
        kind: BucketKind,
        entity: &EntityRef,
        context: SubscriptionContext,
        report: &mut RebuildReport,
    ) {
        match self.subscribe(kind, entity, context) {
            Ok(true) => report.subscribed += 1,
            Ok(false) => {}
            Err(error) => {
                report.failed += 1;
                debug!(%error, "Subscription skipped");
            }
        }
    }

    fn walk_song(&mut self, song: &SongRef, report: &mut RebuildReport) {
        let entity = EntityRef::Song(Rc::clone(song));
        let context = SubscriptionContext::song();
        for kind in [
            BucketKind::Tempo,
            BucketKind::Playing,
            BucketKind::Overdub,
            BucketKind::SelectedScene,
            BucketKind::SelectedTrack,
            BucketKind::Tracks,
        ] {
            self.attach(kind, &entity, context, report);
        }

        for (index, track) in song.tracks().iter().enumerate() {
            self.walk_track(TrackScope::Normal, index, track, report);
        }
        for (index, track) in song.return_tracks().iter().enumerate() {
            self.walk_track(TrackScope::Return, index, track, report);
        }
        self.walk_track(TrackScope::Master, 0, &song.master_track(), report);
    }

    fn walk_track(
        &mut self,
        scope: TrackScope,
        index: usize,
        track: &TrackRef,
        report: &mut RebuildReport,
    ) {
        let context = SubscriptionContext::track(scope, index);
        let entity = EntityRef::Track(Rc::clone(track));

        if scope != TrackScope::Master {
            self.attach(BucketKind::TrackName(scope), &entity, context, report);
            self.attach(BucketKind::Solo(scope), &entity, context, report);
            self.attach(BucketKind::Mute(scope), &entity, context, report);
        }
        if scope == TrackScope::Normal && track.can_be_armed() {
            self.attach(BucketKind::Arm, &entity, context, report);
        }
        self.attach(BucketKind::SelectedDevice(scope), &entity, context, report);
        self.attach(BucketKind::Devices, &entity, context, report);
        if self.options.meters && (scope != TrackScope::Normal || track.has_audio_output()) {
            self.attach(BucketKind::Meter(scope), &entity, context, report);
        }

        // Mixer
        let volume = EntityRef::Parameter(track.volume());
        let pan = EntityRef::Parameter(track.panning());
        self.attach(BucketKind::Volume(scope), &volume, context, report);
        self.attach(BucketKind::Pan(scope), &pan, context, report);

        if scope == TrackScope::Master {
            if let Some(crossfader) = track.crossfader() {
                let crossfader = EntityRef::Parameter(crossfader);
                self.attach(BucketKind::Crossfader, &crossfader, context, report);
            }
        } else {
            for (send_index, send) in track.sends().into_iter().enumerate() {
                let send = EntityRef::Parameter(send);
                self.attach(BucketKind::Send(scope), &send, context.with_send(send_index), report);
            }
        }

        // Clips live on visible tracks only
        if scope == TrackScope::Normal {
            for (slot_index, slot) in track.clip_slots().into_iter().enumerate() {
                let slot_context = context.with_slot(slot_index);
                let clip = slot.clip();
                self.attach(
                    BucketKind::SlotHasClip,
                    &EntityRef::ClipSlot(slot),
                    slot_context,
                    report,
                );

                if let Some(clip) = clip {
                    let clip = EntityRef::Clip(clip);
                    self.attach(BucketKind::ClipStatus, &clip, slot_context, report);
                    self.attach(BucketKind::ClipName, &clip, slot_context, report);
                    if self.options.clip_positions {
                        self.attach(BucketKind::ClipPosition, &clip, slot_context, report);
                    }
                }
            }
        }

        for (device_index, device) in track.devices().into_iter().enumerate() {
            let device_context = context.with_device(device_index);
            let parameters = device.parameters();
            self.attach(
                BucketKind::Parameters,
                &EntityRef::Device(device),
                device_context,
                report,
            );
            for (param_index, param) in parameters.into_iter().enumerate() {
                self.attach(
                    BucketKind::DeviceParam(scope),
                    &EntityRef::Parameter(param),
                    device_context.with_parameter(param_index),
                    report,
                );
            }
        }
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        if !self.is_empty() {
            self.clear();
        }
    }
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("total", &self.total())
            .field("options", &self.options)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use live_model::memory::MemorySong;
    use live_model::{Clip, Entity, Parameter as _, Song as _, Track as _};
    use osc_codec::{OscMessage, OscType};

    struct Harness {
        memory: Rc<MemorySong>,
        song: SongRef,
        outbound: Rc<OutboundSender>,
        structural: Rc<Cell<bool>>,
        manager: SubscriptionManager,
    }

    fn harness(tracks: usize, scenes: usize) -> Harness {
        let memory = MemorySong::with_layout(tracks, scenes);
        let song: SongRef = memory.clone();
        let outbound = Rc::new(OutboundSender::recording());
        let structural = Rc::new(Cell::new(false));
        let manager = SubscriptionManager::new(
            &song,
            Rc::clone(&outbound),
            Rc::clone(&structural),
            SubscriptionOptions::default(),
        );
        Harness {
            memory,
            song,
            outbound,
            structural,
            manager,
        }
    }

    #[test]
    fn test_buckets_exist_for_every_row() {
        let h = harness(0, 0);
        assert_eq!(h.manager.kinds().count(), BUCKET_TABLE.len());
        assert!(h.manager.is_empty());
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let mut h = harness(1, 0);
        let entity = EntityRef::Song(Rc::clone(&h.song));
        let ctx = SubscriptionContext::song();

        assert!(h.manager.subscribe(BucketKind::Tempo, &entity, ctx).unwrap());
        assert!(!h.manager.subscribe(BucketKind::Tempo, &entity, ctx).unwrap());
        assert_eq!(h.manager.len(BucketKind::Tempo), 1);
        assert_eq!(h.memory.listeners_on(Event::Tempo), 1);
    }

    #[test]
    fn test_listener_sends_current_value() {
        let mut h = harness(0, 0);
        let entity = EntityRef::Song(Rc::clone(&h.song));
        h.manager
            .subscribe(BucketKind::Tempo, &entity, SubscriptionContext::song())
            .unwrap();

        h.memory.set_tempo(140.0).unwrap();
        assert_eq!(
            h.outbound.take_recorded(),
            vec![OscMessage::new("/live/tempo", 140.0f32)]
        );
    }

    #[test]
    fn test_structural_listener_sets_flag() {
        let mut h = harness(1, 0);
        h.manager.rebuild(&h.song);
        assert!(!h.structural.get());

        h.memory.add_track("new");
        assert!(h.structural.get());
        let sent = h.outbound.take_recorded();
        assert_eq!(sent, vec![OscMessage::new("/live/refresh", 1)]);
    }

    #[test]
    fn test_unsupported_event_is_counted() {
        let mut h = harness(0, 0);
        let group = h.memory.add_group_track("Group");
        let entity = EntityRef::Track(group);

        let result = h.manager.subscribe(BucketKind::Arm, &entity, SubscriptionContext::default());
        assert!(matches!(result, Err(SubscriptionError::Attach { .. })));
        assert_eq!(h.manager.len(BucketKind::Arm), 0);
        assert_eq!(h.manager.stats().failed, 1);
    }

    #[test]
    fn test_unsubscribe_all_detaches() {
        let mut h = harness(2, 1);
        h.manager.rebuild(&h.song);
        assert_eq!(h.manager.len(BucketKind::TrackName(TrackScope::Normal)), 2);

        let report = h.manager.unsubscribe_all(BucketKind::TrackName(TrackScope::Normal));
        assert_eq!(report.detached, 2);
        assert_eq!(h.manager.len(BucketKind::TrackName(TrackScope::Normal)), 0);
        h.memory.track(0).unwrap().set_name("renamed");
        assert!(h.outbound.take_recorded().is_empty());
    }

    #[test]
    fn test_stale_entities_count_as_gone() {
        let mut h = harness(1, 1);
        h.manager.rebuild(&h.song);
        h.memory.track(0).unwrap().kill();

        let report = h.manager.unsubscribe_all(BucketKind::Mute(TrackScope::Normal));
        assert_eq!(
            report,
            DetachReport {
                detached: 0,
                already_gone: 1,
                failed: 0
            }
        );
    }

    #[test]
    fn test_rebuild_walks_whole_graph() {
        let mut h = harness(1, 1);
        let report = h.manager.rebuild(&h.song);

        // song 6, track 9 + 1 slot, master 6
        assert_eq!(report.subscribed, 22);
        assert_eq!(report.failed, 0);
        assert_eq!(h.manager.total(), 22);
        assert_eq!(h.manager.listener_total(), 24);
    }

    #[test]
    fn test_rebuild_is_stable() {
        let mut h = harness(2, 2);
        let first = h.manager.rebuild(&h.song);
        let second = h.manager.rebuild(&h.song);

        assert_eq!(second.detached, first.subscribed);
        assert_eq!(second.subscribed, first.subscribed);
        assert_eq!(h.memory.graph_listener_count(), h.manager.listener_total());
    }

    #[test]
    fn test_context_indices() {
        let mut h = harness(3, 2);
        let clip = h.memory.track(2).unwrap().clip_slot(1).unwrap().create_clip("Bass", 4.0);
        h.manager.rebuild(&h.song);

        let ctx = h
            .manager
            .context(BucketKind::ClipStatus, clip.entity_id())
            .unwrap();
        assert_eq!((ctx.track, ctx.slot), (2, 1));

        clip.fire();
        clip.launch();
        let sent = h.outbound.take_recorded();
        assert!(sent.contains(&OscMessage::new("/live/clip/info", (2, 1, 2))));
    }

    #[test]
    fn test_clip_positions_optional() {
        let mut h = harness(1, 1);
        h.memory.track(0).unwrap().clip_slot(0).unwrap().create_clip("A", 4.0);
        h.manager.set_options(SubscriptionOptions {
            clip_positions: false,
            ..SubscriptionOptions::default()
        });
        h.manager.rebuild(&h.song);

        assert_eq!(h.manager.len(BucketKind::ClipPosition), 0);
        assert_eq!(h.manager.len(BucketKind::ClipStatus), 1);
    }

    #[test]
    fn test_meter_change_sends_one_message() {
        let mut h = harness(2, 0);
        h.manager.rebuild(&h.song);
        assert_eq!(h.manager.len(BucketKind::Meter(TrackScope::Normal)), 2);
        assert_eq!(h.manager.len(BucketKind::Meter(TrackScope::Master)), 1);

        h.memory.track(1).unwrap().set_output_meters(0.5, 0.0).unwrap();
        assert_eq!(
            h.outbound.take_recorded(),
            vec![OscMessage::new("/live/track/meter", (1, 0, 0.5f32))]
        );

        h.memory.master().set_output_meters(0.5, 0.25).unwrap();
        assert_eq!(
            h.outbound.take_recorded(),
            vec![
                OscMessage::new("/live/master/meter", (0, 0.5f32)),
                OscMessage::new("/live/master/meter", (1, 0.25f32)),
            ]
        );
    }

    #[test]
    fn test_meters_skip_tracks_without_audio_output() {
        let mut h = harness(2, 0);
        h.memory.track(0).unwrap().set_has_audio_output(false);
        h.memory.add_return_track("A");
        h.manager.rebuild(&h.song);

        let midi = h.memory.track(0).unwrap();
        assert!(!h.manager.is_subscribed(BucketKind::Meter(TrackScope::Normal), midi.entity_id()));
        assert_eq!(h.manager.len(BucketKind::Meter(TrackScope::Normal)), 1);
        assert_eq!(h.manager.len(BucketKind::Meter(TrackScope::Return)), 1);
        assert_eq!(midi.listeners_on(Event::OutputMeterLeft), 0);
    }

    #[test]
    fn test_meters_optional() {
        let mut h = harness(1, 0);
        h.manager.set_options(SubscriptionOptions {
            meters: false,
            ..SubscriptionOptions::default()
        });
        h.manager.rebuild(&h.song);

        assert_eq!(h.manager.len(BucketKind::Meter(TrackScope::Normal)), 0);
        assert_eq!(h.manager.len(BucketKind::Meter(TrackScope::Master)), 0);
        h.memory.master().set_output_meters(1.0, 1.0).unwrap();
        assert!(h.outbound.take_recorded().is_empty());
    }

    #[test]
    fn test_meter_entry_detaches_both_channels() {
        let mut h = harness(1, 0);
        h.manager.rebuild(&h.song);
        let track = h.memory.track(0).unwrap();
        assert_eq!(track.listeners_on(Event::OutputMeterRight), 1);

        let report = h.manager.unsubscribe_all(BucketKind::Meter(TrackScope::Normal));
        assert_eq!(report.detached, 1);
        assert_eq!(track.listeners_on(Event::OutputMeterLeft), 0);
        assert_eq!(track.listeners_on(Event::OutputMeterRight), 0);
    }

    #[test]
    fn test_return_and_master_scopes() {
        let mut h = harness(1, 0);
        let ret = h.memory.add_return_track("A");
        ret.add_device("Reverb").add_parameter("Decay", 0.5, 0.0, 1.0);
        h.memory.master().add_device("Limiter").add_parameter("Ceiling", 0.2, 0.0, 1.0);
        h.manager.rebuild(&h.song);

        assert_eq!(h.manager.len(BucketKind::Send(TrackScope::Normal)), 1);
        assert_eq!(h.manager.len(BucketKind::TrackName(TrackScope::Return)), 1);
        assert_eq!(h.manager.len(BucketKind::DeviceParam(TrackScope::Return)), 1);
        assert_eq!(h.manager.len(BucketKind::DeviceParam(TrackScope::Master)), 1);
        assert_eq!(h.manager.len(BucketKind::Crossfader), 1);
        assert_eq!(h.manager.len(BucketKind::Arm), 1);

        h.memory.master().device(0).unwrap().parameter(0).unwrap().set_value(0.4).unwrap();
        let sent = h.outbound.take_recorded();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].address, "/live/master/device/param");
        assert_eq!(
            sent[0].args,
            vec![
                OscType::Int(0),
                OscType::Int(0),
                OscType::Float(0.4),
                OscType::String("Ceiling".into())
            ]
        );
    }
}
