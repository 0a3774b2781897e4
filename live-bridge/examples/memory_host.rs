//! Run the bridge against an in-memory song
//!
//! Binds the listen and reply ports, then plays a small set: the transport
//! runs, one scene launches and song time advances every tick, so a
//! connected OSC client sees beats, clip positions, a pulsing master meter
//! and whatever it changes itself.
//!
//! Run with: cargo run -p liveosc-bridge --example memory_host -- --tracks 8
//! Try:      oscsend localhost 9000 /live/tempo f 128

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use live_bridge::{init_logging_from_env, Bridge, BridgeConfig, Endpoint};
use live_model::memory::MemorySong;
use live_model::{Song as _, SongRef, Track as _};

/// In-memory LiveOSC host
#[derive(Parser, Debug)]
#[command(name = "memory_host")]
#[command(about = "Serve an in-memory song over OSC")]
struct Args {
    /// Address to receive OSC on (overrides the config file)
    #[arg(short, long)]
    listen: Option<Endpoint>,

    /// Address to send replies and notifications to (overrides the config file)
    #[arg(short, long)]
    reply: Option<Endpoint>,

    /// Number of audio tracks
    #[arg(short, long, default_value = "4")]
    tracks: usize,

    /// Number of scenes
    #[arg(short, long, default_value = "4")]
    scenes: usize,

    /// Tick interval in milliseconds
    #[arg(long, default_value = "100")]
    tick_ms: u64,
}

fn build_song(tracks: usize, scenes: usize) -> std::rc::Rc<MemorySong> {
    let memory = MemorySong::with_layout(tracks, scenes);
    for (t, track) in memory.memory_tracks().iter().enumerate() {
        track.set_name(&format!("Track {}", t + 1));
        if let Some(slot) = track.clip_slot(0) {
            slot.create_clip(&format!("Loop {}", t + 1), 4.0);
        }
    }
    memory.add_return_track("Reverb");
    if let Some(track) = memory.track(0) {
        let eq = track.add_device("EQ Eight");
        eq.add_parameter("Gain", 0.5, 0.0, 1.0);
        eq.add_parameter("Freq", 1000.0, 20.0, 20000.0);
    }
    memory
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging_from_env()?;

    let mut config = BridgeConfig::load_default()?;
    if let Some(listen) = args.listen {
        config.transport.listen = listen;
    }
    if let Some(reply) = args.reply {
        config.transport.reply = reply;
    }

    let memory = build_song(args.tracks, args.scenes);
    let song: SongRef = memory.clone();
    let mut bridge = Bridge::start(song, config)?;
    println!(
        "Listening on {:?}, replying to {}",
        bridge.local_addr(),
        bridge.config().transport.reply
    );
    println!("{} addresses registered (Ctrl+C to quit)", bridge.addresses().len());

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    memory.start_playing();
    if let Some(scene) = memory.scenes().first() {
        scene.fire();
    }

    let tick = Duration::from_millis(args.tick_ms);
    while running.load(Ordering::SeqCst) {
        let report = bridge.tick();
        if report.drain.received > 0 {
            println!(
                "{} datagram(s), {} handler call(s), {} failure(s)",
                report.drain.received, report.dispatch.handlers, report.dispatch.failures
            );
        }
        if let Some(rebuild) = report.rebuild {
            println!("Topology changed: {} subscriptions", rebuild.subscribed);
        }

        memory.advance(memory.tempo() / 60.0 * tick.as_secs_f32());
        let pulse = 1.0 - memory.current_song_time().fract();
        memory.master().set_output_meters(pulse * 0.8, pulse * 0.75)?;
        thread::sleep(tick);
    }

    bridge.shutdown();
    println!("Sent: {:?}", bridge.outbound().stats());
    Ok(())
}
