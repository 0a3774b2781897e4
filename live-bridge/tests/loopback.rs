//! End-to-end bridge tests over real loopback sockets

mod test_helpers;

use live_bridge::{Bridge, BridgeConfig, Endpoint, TransportConfig};
use live_model::memory::MemorySong;
use live_model::{Song as _, SongRef, Track as _};
use osc_codec::{encode_bundle, OscBundle, OscMessage, OscType};
use test_helpers::{settle, Client};

fn start(memory: &std::rc::Rc<MemorySong>, client: &Client, config: BridgeConfig) -> Bridge {
    let song: SongRef = memory.clone();
    let config = config.with_transport(TransportConfig::loopback(client.port()));
    Bridge::start(song, config).expect("bridge should bind loopback sockets")
}

#[test]
fn test_tempo_query_gets_one_reply() {
    let memory = MemorySong::with_layout(2, 2);
    memory.set_tempo(120.5).unwrap();
    let client = Client::bind();
    let mut bridge = start(&memory, &client, BridgeConfig::quiet());

    client.send(bridge.local_addr().unwrap(), &OscMessage::empty("/live/tempo"));
    settle();
    let report = bridge.tick();
    assert_eq!(report.drain.received, 1);
    assert_eq!(report.dispatch.handlers, 1);

    assert_eq!(
        client.recv_all(),
        vec![OscMessage::new("/live/tempo", 120.5f32)]
    );
}

#[test]
fn test_trailing_query_literal() {
    let memory = MemorySong::with_layout(1, 0);
    let client = Client::bind();
    let mut bridge = start(&memory, &client, BridgeConfig::quiet());

    client.send(
        bridge.local_addr().unwrap(),
        &OscMessage::new("/live/tempo", "query"),
    );
    settle();
    bridge.tick();
    assert_eq!(client.recv_all(), vec![OscMessage::new("/live/tempo", 120.0f32)]);
}

#[test]
fn test_batch_is_processed_in_order() {
    let memory = MemorySong::with_layout(4, 0);
    let client = Client::bind();
    let mut bridge = start(&memory, &client, BridgeConfig::quiet());
    let to = bridge.local_addr().unwrap();

    for t in [3, 0, 2, 1] {
        client.send(to, &OscMessage::new("/live/name/track", t));
    }
    settle();
    let report = bridge.tick();
    assert_eq!(report.drain.received, 4);

    let replies: Vec<Vec<OscType>> = client.recv_all().into_iter().map(|m| m.args).collect();
    assert_eq!(
        replies,
        vec![
            vec![OscType::Int(3), OscType::String("4".into())],
            vec![OscType::Int(0), OscType::String("1".into())],
            vec![OscType::Int(2), OscType::String("3".into())],
            vec![OscType::Int(1), OscType::String("2".into())],
        ]
    );
}

#[test]
fn test_failures_do_not_stop_the_batch() {
    let memory = MemorySong::with_layout(2, 0);
    let client = Client::bind();
    let mut bridge = start(&memory, &client, BridgeConfig::quiet());
    let to = bridge.local_addr().unwrap();

    client.send(to, &OscMessage::new("/live/volume", (99, 0.5f32)));
    client.send_raw(to, b"not osc at all");
    client.send(to, &OscMessage::empty("/live/nowhere"));
    client.send(to, &OscMessage::new("/live/tempo", 99.0f32));
    settle();

    let report = bridge.tick();
    assert_eq!(report.drain.received, 4);
    assert_eq!(report.drain.failed, 1);
    assert_eq!(report.dispatch.failures, 1);
    assert_eq!(report.dispatch.unhandled, 1);
    assert_eq!(memory.tempo(), 99.0);
}

#[test]
fn test_notifications_reach_the_client() {
    let memory = MemorySong::with_layout(3, 0);
    let client = Client::bind();
    let _bridge = start(&memory, &client, BridgeConfig::quiet());

    memory.track(1).unwrap().set_mute(true).unwrap();
    assert_eq!(
        client.recv_all(),
        vec![OscMessage::new("/live/mute", (1, 1))]
    );
}

#[test]
fn test_song_time_drains_without_tick() {
    let memory = MemorySong::with_layout(1, 0);
    let client = Client::bind();
    let config = BridgeConfig {
        beat_updates: true,
        ..BridgeConfig::quiet()
    };
    let bridge = start(&memory, &client, config);

    client.send(bridge.local_addr().unwrap(), &OscMessage::new("/live/tempo", 140.0f32));
    settle();
    memory.start_playing();
    memory.advance(1.5);

    assert_eq!(memory.tempo(), 140.0);
    let received = client.recv_all();
    assert!(received.contains(&OscMessage::new("/live/beat", 1)));
}

#[test]
fn test_startup_and_shutdown_announcements() {
    let memory = MemorySong::with_layout(2, 0);
    let client = Client::bind();
    let config = BridgeConfig {
        startup_announcements: true,
        ..BridgeConfig::quiet()
    };
    let mut bridge = start(&memory, &client, config);
    assert_eq!(
        client.recv_all(),
        vec![OscMessage::new("/remix/oscserver/startup", 1)]
    );

    bridge.shutdown();
    bridge.shutdown();
    assert_eq!(
        client.recv_all(),
        vec![OscMessage::new("/remix/oscserver/shutdown", 1)]
    );
    assert_eq!(memory.graph_listener_count(), 0);
}

#[test]
fn test_refresh_after_rebuild() {
    let memory = MemorySong::with_layout(2, 1);
    memory
        .track(1)
        .unwrap()
        .clip_slot(0)
        .unwrap()
        .create_clip("Bass", 4.0);
    let client = Client::bind();
    let config = BridgeConfig {
        refresh_on_rebuild: true,
        ..BridgeConfig::quiet()
    };
    let _bridge = start(&memory, &client, config);

    let received = client.recv_all();
    assert_eq!(received.len(), 4);
    assert_eq!(received[0], OscMessage::new("/live/name/track", (0, "1")));
    assert_eq!(received[1], OscMessage::new("/live/name/track", (1, "2")));
    assert_eq!(received[2].address, "/live/name/clip");
    assert_eq!(
        received[2].args[..3],
        [OscType::Int(1), OscType::Int(0), OscType::String("Bass".into())]
    );
    assert_eq!(received[3], OscMessage::new("/live/name/trackblock", ("1", "2")));
}

#[test]
fn test_endpoints_reconfigure_at_runtime() {
    let memory = MemorySong::with_layout(1, 0);
    let first = Client::bind();
    let second = Client::bind();
    let mut bridge = start(&memory, &first, BridgeConfig::quiet());

    bridge
        .set_listen_endpoint(Endpoint::new("127.0.0.1", 0))
        .unwrap();
    bridge
        .set_reply_endpoint(Endpoint::new("127.0.0.1", second.port()))
        .unwrap();
    assert_eq!(bridge.config().transport.reply.port, second.port());

    second.send(bridge.local_addr().unwrap(), &OscMessage::empty("/live/tempo"));
    settle();
    bridge.tick();

    assert!(first.recv().is_none());
    assert_eq!(second.recv_all(), vec![OscMessage::new("/live/tempo", 120.0f32)]);
}

fn undo_bundle(count: usize) -> Vec<u8> {
    let mut bundle = OscBundle::new();
    for _ in 0..count {
        bundle.append("/live/undo", ());
    }
    encode_bundle(&bundle).unwrap()
}

#[test]
fn test_large_bundle_applied_in_full() {
    let memory = MemorySong::with_layout(1, 0);
    let client = Client::bind();
    let mut bridge = start(&memory, &client, BridgeConfig::quiet());

    let bytes = undo_bundle(300);
    assert!(bytes.len() > 4096);
    client.send_raw(bridge.local_addr().unwrap(), &bytes);
    settle();

    let report = bridge.tick();
    assert_eq!(report.drain.failed, 0);
    assert_eq!(report.dispatch.handlers, 300);
    assert_eq!(memory.undo_count(), 300);
}

#[test]
fn test_bundle_over_receive_buffer_applies_nothing() {
    let memory = MemorySong::with_layout(1, 0);
    let client = Client::bind();
    let song: SongRef = memory.clone();
    let config = BridgeConfig::quiet().with_transport(TransportConfig {
        recv_buffer_size: 1024,
        ..TransportConfig::loopback(client.port())
    });
    let mut bridge = Bridge::start(song, config).unwrap();

    let bytes = undo_bundle(300);
    client.send_raw(bridge.local_addr().unwrap(), &bytes);
    client.send(bridge.local_addr().unwrap(), &OscMessage::empty("/live/redo"));
    settle();

    let report = bridge.tick();
    assert_eq!(report.drain.received, 2);
    assert_eq!(report.drain.failed, 1);
    assert_eq!(memory.undo_count(), 0);
    assert_eq!(memory.redo_count(), 1);
}
