//! Shared fixtures for the bridge integration tests

#![allow(dead_code)]

use std::cell::Cell;
use std::net::{SocketAddr, UdpSocket};
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use live_bridge::{
    Bridge, BridgeConfig, OutboundSender, SubscriptionManager, SubscriptionOptions,
    TransportConfig,
};
use live_model::memory::MemorySong;
use live_model::SongRef;
use osc_codec::{decode, encode_message, OscMessage};

/// A manager over an in-memory song with a recording sender
pub struct ManagerHarness {
    pub memory: Rc<MemorySong>,
    pub song: SongRef,
    pub outbound: Rc<OutboundSender>,
    pub structural: Rc<Cell<bool>>,
    pub manager: SubscriptionManager,
}

impl ManagerHarness {
    pub fn new(tracks: usize, scenes: usize) -> Self {
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
        Self {
            memory,
            song,
            outbound,
            structural,
            manager,
        }
    }
}

/// Bridge with loopback listen socket and a recording sender
pub fn recording_bridge(memory: &Rc<MemorySong>, config: BridgeConfig) -> Bridge {
    let song: SongRef = memory.clone();
    Bridge::start_with_outbound(song, config, Rc::new(OutboundSender::recording()))
        .expect("bridge should start on loopback")
}

/// Quiet config with loopback sockets
pub fn quiet_loopback() -> BridgeConfig {
    BridgeConfig::quiet().with_transport(TransportConfig::loopback(9001))
}

/// A UDP socket playing the OSC client
pub struct Client {
    pub socket: UdpSocket,
}

impl Client {
    pub fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("client bind");
        socket
            .set_read_timeout(Some(Duration::from_millis(500)))
            .expect("client timeout");
        Self { socket }
    }

    pub fn port(&self) -> u16 {
        self.socket.local_addr().expect("client addr").port()
    }

    pub fn send(&self, to: SocketAddr, message: &OscMessage) {
        let bytes = encode_message(message).expect("encodable");
        self.socket.send_to(&bytes, to).expect("client send");
    }

    pub fn send_raw(&self, to: SocketAddr, bytes: &[u8]) {
        self.socket.send_to(bytes, to).expect("client send");
    }

    /// Next datagram decoded, or `None` after the read timeout
    pub fn recv(&self) -> Option<Vec<OscMessage>> {
        let mut buf = vec![0u8; osc_transport::MAX_DATAGRAM];
        let (len, _) = self.socket.recv_from(&mut buf).ok()?;
        decode(&buf[..len]).ok()
    }

    /// Every datagram until the socket goes quiet, flattened
    pub fn recv_all(&self) -> Vec<OscMessage> {
        let mut out = Vec::new();
        while let Some(messages) = self.recv() {
            out.extend(messages);
        }
        out
    }
}

/// Loopback delivery is not instantaneous; give the kernel a moment
pub fn settle() {
    thread::sleep(Duration::from_millis(50));
}
