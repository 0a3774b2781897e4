//! Subscription manager behaviour against the in-memory host
//!
//! Covers idempotent subscribe, full rebuild after topology changes, and the
//! single-notification guarantee for one native event.

mod test_helpers;

use live_bridge::subscription::{EntityRef, TrackScope};
use live_bridge::{BucketKind, SubscriptionContext};
use live_model::{Entity, Parameter as _, Song as _, Track as _};
use osc_codec::OscMessage;
use proptest::prelude::*;
use rstest::rstest;
use test_helpers::{quiet_loopback, recording_bridge, ManagerHarness};

#[test]
fn test_subscribe_twice_attaches_once() {
    let mut h = ManagerHarness::new(3, 0);
    let track = h.memory.track(1).unwrap();
    let volume = EntityRef::Parameter(track.volume_param());
    let ctx = SubscriptionContext::track(TrackScope::Normal, 1);

    let kind = BucketKind::Volume(TrackScope::Normal);
    assert!(h.manager.subscribe(kind, &volume, ctx).unwrap());
    assert!(!h.manager.subscribe(kind, &volume, ctx).unwrap());

    assert_eq!(h.manager.len(kind), 1);
    assert_eq!(track.volume_param().listener_count(), 1);
}

/// Scenario: one volume change on track 2 produces exactly one message
#[test]
fn test_volume_change_notifies_once() {
    let mut h = ManagerHarness::new(4, 0);
    let track = h.memory.track(2).unwrap();
    let volume = EntityRef::Parameter(track.volume_param());
    h.manager
        .subscribe(
            BucketKind::Volume(TrackScope::Normal),
            &volume,
            SubscriptionContext::track(TrackScope::Normal, 2),
        )
        .unwrap();

    track.volume_param().set_value(0.73).unwrap();

    assert_eq!(
        h.outbound.take_recorded(),
        vec![OscMessage::new("/live/volume", (2, 0.73f32))]
    );
}

/// Same event through a full rebuild: still exactly one message
#[test]
fn test_volume_change_after_rebuild_notifies_once() {
    let mut h = ManagerHarness::new(4, 2);
    h.manager.rebuild(&h.song);
    h.manager.rebuild(&h.song);

    h.memory.track(2).unwrap().volume_param().set_value(0.73).unwrap();
    assert_eq!(
        h.outbound.take_recorded(),
        vec![OscMessage::new("/live/volume", (2, 0.73f32))]
    );
}

/// One meter movement after two rebuilds: one message per channel that moved
#[test]
fn test_meter_change_after_rebuild_notifies_once() {
    let mut h = ManagerHarness::new(3, 1);
    h.manager.rebuild(&h.song);
    h.manager.rebuild(&h.song);

    h.memory.track(2).unwrap().set_output_meters(0.0, 0.6).unwrap();
    assert_eq!(
        h.outbound.take_recorded(),
        vec![OscMessage::new("/live/track/meter", (2, 1, 0.6f32))]
    );

    let ret = h.memory.add_return_track("Delay");
    h.manager.rebuild(&h.song);
    h.outbound.take_recorded();
    ret.set_output_meters(0.4, 0.0).unwrap();
    assert_eq!(
        h.outbound.take_recorded(),
        vec![OscMessage::new("/live/return/meter", (0, 0, 0.4f32))]
    );
}

/// Scenario: 4 → 3 tracks, one tick later the removed track is silent
#[test]
fn test_track_removal_rebuilds_on_tick() {
    let memory = live_model::memory::MemorySong::with_layout(4, 2);
    let mut bridge = recording_bridge(&memory, quiet_loopback());
    let volume = BucketKind::Volume(TrackScope::Normal);
    assert_eq!(bridge.subscriptions().len(volume), 4);

    let removed = memory.remove_track(3).unwrap();
    assert!(removed.listener_count() > 0);
    assert!(bridge.rebuild_pending());

    let report = bridge.tick();
    assert!(report.rebuild.is_some());
    assert!(!bridge.rebuild_pending());
    assert_eq!(bridge.subscriptions().len(volume), 3);
    assert_eq!(removed.listener_count(), 0);
    assert!(!bridge.subscriptions().is_subscribed(volume, removed.volume_param().entity_id()));

    bridge.outbound().take_recorded();
    removed.volume_param().set_value(0.1).unwrap();
    removed.set_name("gone");
    assert!(bridge.outbound().take_recorded().is_empty());
}

#[test]
fn test_several_changes_between_ticks_rebuild_once() {
    let memory = live_model::memory::MemorySong::with_layout(2, 1);
    let mut bridge = recording_bridge(&memory, quiet_loopback());
    let before = bridge.subscription_stats().rebuilds;

    memory.add_track("3");
    memory.add_scene("Scene 2");
    memory.add_return_track("A");
    bridge.tick();
    bridge.tick();

    assert_eq!(bridge.subscription_stats().rebuilds, before + 1);
    assert_eq!(bridge.subscriptions().len(BucketKind::Send(TrackScope::Normal)), 3);
    assert_eq!(bridge.subscriptions().len(BucketKind::TrackName(TrackScope::Return)), 1);
}

#[rstest]
#[case::tempo(BucketKind::Tempo)]
#[case::track_names(BucketKind::TrackName(TrackScope::Normal))]
#[case::volume(BucketKind::Volume(TrackScope::Normal))]
#[case::master_volume(BucketKind::Volume(TrackScope::Master))]
fn test_unsubscribe_all_empties_bucket(#[case] kind: BucketKind) {
    let mut h = ManagerHarness::new(3, 1);
    h.manager.rebuild(&h.song);
    let before = h.manager.len(kind);
    assert!(before > 0);

    let report = h.manager.unsubscribe_all(kind);
    assert_eq!(report.detached + report.already_gone, before);
    assert_eq!(h.manager.len(kind), 0);
}

#[test]
fn test_master_volume_has_no_track_index() {
    let mut h = ManagerHarness::new(1, 0);
    h.manager.rebuild(&h.song);
    h.memory.master().volume_param().set_value(0.5).unwrap();
    assert_eq!(
        h.outbound.take_recorded(),
        vec![OscMessage::new("/live/master/volume", 0.5f32)]
    );
}

#[test]
fn test_tempo_notification_after_rebuild() {
    let mut h = ManagerHarness::new(0, 0);
    h.manager.rebuild(&h.song);
    h.memory.set_tempo(87.0).unwrap();
    assert_eq!(
        h.outbound.take_recorded(),
        vec![OscMessage::new("/live/tempo", 87.0f32)]
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Removed and killed tracks end with no listeners; current ones are
    /// each subscribed exactly once
    #[test]
    fn prop_rebuild_leaves_no_residue(
        initial in 1usize..6,
        remove in 0usize..6,
        kill_every in 1usize..3,
        added in 0usize..3,
        scenes in 0usize..3,
    ) {
        let mut h = ManagerHarness::new(initial, scenes);
        h.manager.rebuild(&h.song);

        let remove = remove.min(initial);
        let mut stale = Vec::new();
        for i in 0..remove {
            let track = h.memory.remove_track(0).unwrap();
            if i % kill_every == 0 {
                track.kill();
            }
            stale.push(track);
        }
        for i in 0..added {
            h.memory.add_track(&format!("new {}", i));
        }
        prop_assert!(remove + added == 0 || h.structural.get());

        h.manager.rebuild(&h.song);
        h.structural.set(false);

        let current = initial - remove + added;
        prop_assert_eq!(h.manager.len(BucketKind::Volume(TrackScope::Normal)), current);
        prop_assert_eq!(h.manager.len(BucketKind::TrackName(TrackScope::Normal)), current);
        for track in &stale {
            prop_assert_eq!(track.listener_count(), 0);
        }
        prop_assert_eq!(h.memory.graph_listener_count(), h.manager.listener_total());
    }
}
