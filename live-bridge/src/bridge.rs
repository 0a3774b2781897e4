//! The bridge: sockets, dispatch and subscriptions behind one handle
//!
//! The host drives everything. It calls [`Bridge::tick`] on its periodic
//! timer; the song's current-song-time listener additionally drains the
//! socket while the transport runs. Nothing blocks and nothing runs on
//! another thread.
//!
//! # Example
//!
//! ```rust,no_run
//! use live_bridge::{Bridge, BridgeConfig};
//! use live_model::memory::MemorySong;
//! use live_model::SongRef;
//!
//! let song: SongRef = MemorySong::with_layout(8, 8);
//! let mut bridge = Bridge::start(song, BridgeConfig::default())?;
//!
//! loop {
//!     let report = bridge.tick();
//!     if report.rebuild.is_some() {
//!         println!("topology changed");
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(100));
//! }
//! # Ok::<(), live_bridge::BridgeError>(())
//! ```

use std::cell::{Cell, RefCell};
use std::net::SocketAddr;
use std::rc::{Rc, Weak};

use live_model::{Event, Listener, Observable, Song, SongRef};
use osc_codec::{OscBundle, OscMessage, OscType};
use osc_transport::{DrainStats, Endpoint, UdpReceiver, UdpSender};
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::dispatch::{DispatchOutcome, DispatchTable, HandlerContext};
use crate::error::{BridgeError, Result};
use crate::handlers;
use crate::outbound::OutboundSender;
use crate::subscription::{
    RebuildReport, SubscriptionManager, SubscriptionOptions, SubscriptionStats,
};

/// What one [`Bridge::tick`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub drain: DrainStats,
    pub dispatch: DispatchOutcome,
    /// Set when a structural change was pending and the subscriptions were
    /// rebuilt
    pub rebuild: Option<RebuildReport>,
}

// ============================================================================
// Inbound side
// ============================================================================

struct Inbound {
    receiver: UdpReceiver,
    dispatch: DispatchTable,
    ctx: HandlerContext,
}

impl Inbound {
    fn drain(&mut self) -> (DrainStats, DispatchOutcome) {
        let Inbound {
            receiver,
            dispatch,
            ctx,
        } = self;
        let mut outcome = DispatchOutcome::default();
        let stats = receiver.drain(|data, _from| {
            dispatch.dispatch_datagram(data, ctx).map(|o| outcome.merge(o))
        });
        (stats, outcome)
    }
}

/// Emits `/live/beat` whenever the integer beat changes
struct BeatClock {
    last: Cell<i32>,
    enabled: bool,
    outbound: Rc<OutboundSender>,
}

impl BeatClock {
    fn observe(&self, song_time: f32) {
        let beat = song_time.floor() as i32;
        if beat != self.last.get() {
            self.last.set(beat);
            if self.enabled {
                self.outbound.send(&OscMessage::new("/live/beat", beat));
            }
        }
    }
}

/// Time-advance work: drain unless a drain is already running, then the
/// beat check
fn time_advanced(
    inbound: &RefCell<Inbound>,
    song: &dyn Song,
    beats: &BeatClock,
) -> Option<(DrainStats, DispatchOutcome)> {
    // A handler inside an ongoing drain can move song time; that drain
    // already covers the queue.
    let drained = inbound.try_borrow_mut().ok().map(|mut inbound| inbound.drain());
    beats.observe(song.current_song_time());
    drained
}

// ============================================================================
// Bridge
// ============================================================================

/// A running OSC bridge for one song
pub struct Bridge {
    song: SongRef,
    config: BridgeConfig,
    inbound: Rc<RefCell<Inbound>>,
    outbound: Rc<OutboundSender>,
    subscriptions: SubscriptionManager,
    structural: Rc<Cell<bool>>,
    beats: Rc<BeatClock>,
    time_listener: Option<Listener>,
    shut_down: bool,
}

impl Bridge {
    /// Bind both sockets and bring the bridge up
    ///
    /// Socket failures are fatal. On success the handler catalogue is
    /// registered, every subscription is made and
    /// `/remix/oscserver/startup` has been sent.
    pub fn start(song: SongRef, config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let sender = UdpSender::open(config.transport.reply.clone())?;
        Self::start_with_outbound(song, config, Rc::new(OutboundSender::udp(sender)))
    }

    /// Like [`start`](Self::start), with a caller-supplied outbound sender
    ///
    /// Only the listening socket is bound. Used with
    /// [`OutboundSender::recording`] to observe traffic in tests and dry
    /// runs.
    pub fn start_with_outbound(
        song: SongRef,
        config: BridgeConfig,
        outbound: Rc<OutboundSender>,
    ) -> Result<Self> {
        config.validate()?;
        let receiver = UdpReceiver::bind(
            config.transport.listen.clone(),
            config.transport.recv_buffer_size,
        )?;

        let mut dispatch = DispatchTable::new();
        handlers::register_all(&mut dispatch);
        debug!("Registered {} OSC addresses", dispatch.len());

        let inbound = Rc::new(RefCell::new(Inbound {
            receiver,
            dispatch,
            ctx: HandlerContext::new(Rc::clone(&song), Rc::clone(&outbound)),
        }));

        let structural = Rc::new(Cell::new(false));
        let subscriptions = SubscriptionManager::new(
            &song,
            Rc::clone(&outbound),
            Rc::clone(&structural),
            SubscriptionOptions {
                clip_positions: config.clip_position_updates,
                meters: config.meter_updates,
            },
        );
        let beats = Rc::new(BeatClock {
            last: Cell::new(0),
            enabled: config.beat_updates,
            outbound: Rc::clone(&outbound),
        });

        let mut bridge = Self {
            song,
            config,
            inbound,
            outbound,
            subscriptions,
            structural,
            beats,
            time_listener: None,
            shut_down: false,
        };

        bridge.attach_time_listener();
        bridge.rebuild();
        if bridge.config.startup_announcements {
            bridge
                .outbound
                .send(&OscMessage::new("/remix/oscserver/startup", 1));
        }

        info!(
            listen = ?bridge.local_addr(),
            reply = ?bridge.outbound.destination(),
            "LiveOSC bridge started"
        );
        Ok(bridge)
    }

    fn attach_time_listener(&mut self) {
        let inbound = Rc::downgrade(&self.inbound);
        let song: Weak<dyn Song> = Rc::downgrade(&self.song);
        let beats = Rc::downgrade(&self.beats);

        let listener = Listener::new(move || {
            if let (Some(inbound), Some(song), Some(beats)) =
                (inbound.upgrade(), song.upgrade(), beats.upgrade())
            {
                time_advanced(&inbound, &*song, &beats);
            }
        });

        match self.song.add_listener(Event::CurrentSongTime, &listener) {
            Ok(()) => self.time_listener = Some(listener),
            // The periodic tick still drains; only the beat messages are lost
            Err(e) => warn!("No song-time listener, beats disabled: {}", e),
        }
    }

    // ========================================================================
    // Host entry points
    // ========================================================================

    /// Process every queued datagram, then rebuild once if the topology
    /// changed
    pub fn tick(&mut self) -> TickReport {
        if self.shut_down {
            return TickReport::default();
        }

        let (drain, dispatch) = self.inbound.borrow_mut().drain();
        let rebuild = self.structural.get().then(|| self.rebuild());

        TickReport {
            drain,
            dispatch,
            rebuild,
        }
    }

    /// Song time moved: drain the socket and emit `/live/beat` on a new beat
    ///
    /// The song-time listener calls this on its own; hosts without that
    /// event can call it directly.
    pub fn on_time_advance(&mut self) -> TickReport {
        if self.shut_down {
            return TickReport::default();
        }
        let (drain, dispatch) =
            time_advanced(&self.inbound, &*self.song, &self.beats).unwrap_or_default();
        TickReport {
            drain,
            dispatch,
            rebuild: None,
        }
    }

    /// Mark the topology dirty; the next tick rebuilds
    pub fn request_rebuild(&self) {
        self.structural.set(true);
    }

    pub fn rebuild_pending(&self) -> bool {
        self.structural.get()
    }

    /// Rebuild every subscription now and clear the pending flag
    pub fn rebuild(&mut self) -> RebuildReport {
        self.structural.set(false);
        let report = self.subscriptions.rebuild(&self.song);
        if self.config.refresh_on_rebuild {
            self.push_refresh();
        }
        report
    }

    /// Dispatch one message as if it had arrived on the socket
    pub fn handle_message(&mut self, message: &OscMessage) -> usize {
        let mut inbound = self.inbound.borrow_mut();
        let Inbound { dispatch, ctx, .. } = &mut *inbound;
        dispatch.dispatch(message, ctx)
    }

    /// Every track name and clip name as one bundle, then the track-name
    /// block
    fn push_refresh(&self) {
        let tracks = self.song.tracks();
        let mut bundle = OscBundle::new();
        let mut names = Vec::with_capacity(tracks.len());

        for (t, track) in tracks.iter().enumerate() {
            let name = track.name();
            bundle.append("/live/name/track", (t, name.clone()));
            names.push(OscType::from(name));
            for (c, slot) in track.clip_slots().iter().enumerate() {
                if let Some(clip) = slot.clip() {
                    bundle.append("/live/name/clip", (t, c, clip.name(), clip.color()));
                }
            }
        }

        self.outbound.send_bundle(&bundle);
        self.outbound
            .send(&OscMessage::new("/live/name/trackblock", names));
    }

    // ========================================================================
    // Runtime reconfiguration
    // ========================================================================

    /// Close the listening socket and bind `endpoint`
    ///
    /// On failure the bridge stops receiving until a later rebind succeeds.
    pub fn set_listen_endpoint(&mut self, endpoint: Endpoint) -> Result<()> {
        if self.shut_down {
            return Err(BridgeError::ShutDown);
        }
        self.inbound.borrow_mut().receiver.rebind(endpoint.clone())?;
        info!("Listening on {}", endpoint);
        self.config.transport.listen = endpoint;
        Ok(())
    }

    /// Send replies and notifications to `endpoint` from now on
    pub fn set_reply_endpoint(&mut self, endpoint: Endpoint) -> Result<()> {
        if self.shut_down {
            return Err(BridgeError::ShutDown);
        }
        self.outbound.set_destination(endpoint.clone())?;
        info!("Replying to {}", endpoint);
        self.config.transport.reply = endpoint;
        Ok(())
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Detach every listener, announce shutdown and close both sockets
    ///
    /// Safe to call more than once; also runs on drop.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        let detached = self.subscriptions.clear();
        if let Some(listener) = self.time_listener.take() {
            if self.song.has_listener(Event::CurrentSongTime, &listener) {
                if let Err(e) = self.song.remove_listener(Event::CurrentSongTime, &listener) {
                    debug!("Failed to detach song-time listener: {}", e);
                }
            }
        }

        if self.config.startup_announcements {
            self.outbound
                .send(&OscMessage::new("/remix/oscserver/shutdown", 1));
        }

        if let Ok(mut inbound) = self.inbound.try_borrow_mut() {
            inbound.receiver.close();
        }
        self.outbound.close();

        info!(
            detached = detached.detached,
            already_gone = detached.already_gone,
            "LiveOSC bridge shut down"
        );
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn song(&self) -> &SongRef {
        &self.song
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn outbound(&self) -> &Rc<OutboundSender> {
        &self.outbound
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    pub fn subscription_stats(&self) -> SubscriptionStats {
        self.subscriptions.stats()
    }

    /// Address the listening socket is bound to, if open
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inbound.borrow().receiver.local_addr()
    }

    /// Registered inbound addresses, sorted
    pub fn addresses(&self) -> Vec<String> {
        self.inbound
            .borrow()
            .dispatch
            .addresses()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("local_addr", &self.local_addr())
            .field("outbound", &self.outbound)
            .field("subscriptions", &self.subscriptions)
            .field("shut_down", &self.shut_down)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use live_model::memory::MemorySong;
    use live_model::{Song as _, Track as _};

    fn bridge(tracks: usize, scenes: usize, config: BridgeConfig) -> (Rc<MemorySong>, Bridge) {
        let memory = MemorySong::with_layout(tracks, scenes);
        let song: SongRef = memory.clone();
        let bridge = Bridge::start_with_outbound(
            song,
            config,
            Rc::new(OutboundSender::recording()),
        )
        .unwrap();
        (memory, bridge)
    }

    #[test]
    fn test_start_announces_and_refreshes() {
        let (_memory, bridge) = bridge(2, 0, BridgeConfig::loopback(9));
        let sent = bridge.outbound().take_recorded();
        let addresses: Vec<&str> = sent.iter().map(|m| m.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec![
                "/live/name/track",
                "/live/name/track",
                "/live/name/trackblock",
                "/remix/oscserver/startup"
            ]
        );
        assert!(bridge.subscriptions().total() > 0);
    }

    #[test]
    fn test_quiet_start_sends_nothing() {
        let config = BridgeConfig::quiet().with_transport(BridgeConfig::loopback(9).transport);
        let (_memory, bridge) = bridge(2, 2, config);
        assert!(bridge.outbound().take_recorded().is_empty());
    }

    #[test]
    fn test_structural_change_rebuilds_once() {
        let config = BridgeConfig::quiet().with_transport(BridgeConfig::loopback(9).transport);
        let (memory, mut bridge) = bridge(2, 0, config);

        memory.add_track("3");
        memory.add_track("4");
        assert!(bridge.rebuild_pending());

        let report = bridge.tick();
        assert!(report.rebuild.is_some());
        assert!(!bridge.rebuild_pending());
        assert!(bridge.tick().rebuild.is_none());
        assert_eq!(memory.graph_listener_count(), bridge.subscriptions().listener_total() + 1);
    }

    #[test]
    fn test_beats_follow_song_time() {
        let config = BridgeConfig {
            startup_announcements: false,
            refresh_on_rebuild: false,
            ..BridgeConfig::loopback(9)
        };
        let (memory, bridge) = bridge(0, 0, config);

        memory.set_current_song_time(0.5);
        memory.set_current_song_time(1.25);
        memory.set_current_song_time(1.75);
        memory.set_current_song_time(3.0);
        let beats: Vec<OscMessage> = bridge
            .outbound()
            .take_recorded()
            .into_iter()
            .filter(|m| m.address == "/live/beat")
            .collect();
        assert_eq!(
            beats,
            vec![
                OscMessage::new("/live/beat", 1),
                OscMessage::new("/live/beat", 3)
            ]
        );
    }

    #[test]
    fn test_handle_message_reaches_song() {
        let config = BridgeConfig::quiet().with_transport(BridgeConfig::loopback(9).transport);
        let (memory, mut bridge) = bridge(3, 0, config);
        bridge.handle_message(&OscMessage::new("/live/name/track", (0, "Kick")));
        assert_eq!(memory.track(0).unwrap().name(), "Kick");
        assert_eq!(
            bridge.outbound().take_recorded(),
            vec![OscMessage::new("/live/name/track", (0, "Kick"))]
        );
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (memory, mut bridge) = bridge(2, 2, BridgeConfig::loopback(9));
        let outbound = Rc::clone(bridge.outbound());
        outbound.take_recorded();

        bridge.shutdown();
        assert_eq!(
            outbound.take_recorded(),
            vec![OscMessage::new("/remix/oscserver/shutdown", 1)]
        );
        assert_eq!(memory.graph_listener_count(), 0);
        assert!(bridge.local_addr().is_none());
        assert!(outbound.is_closed());

        bridge.shutdown();
        assert!(outbound.take_recorded().is_empty());
        assert!(matches!(
            bridge.set_reply_endpoint(Endpoint::new("127.0.0.1", 9002)),
            Err(BridgeError::ShutDown)
        ));
        drop(bridge);
        assert_eq!(memory.graph_listener_count(), 0);
    }
}
