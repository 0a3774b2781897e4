//! Mixer: arm, mute, solo, volume, pan, sends, crossfader
//!
//! Mute, solo, volume, pan and send are registered twice, once for visible
//! tracks under `/live/...` and once for return tracks under
//! `/live/return/...`. Replies go to the address the query came in on.

use live_model::{ParameterRef, Result as ModelResult, Song, Track, TrackRef};
use osc_codec::{OscMessage, OscType};

use super::args::Args;
use crate::dispatch::{DispatchTable, HandlerContext, HandlerResult};
use crate::subscription::TrackScope;

type Getter = fn(&dyn Track) -> bool;
type Setter = fn(&dyn Track, bool) -> ModelResult<()>;
type MixerParam = fn(&dyn Track) -> ParameterRef;

struct ScopedAddresses {
    mute: &'static str,
    solo: &'static str,
    volume: &'static str,
    pan: &'static str,
    send: &'static str,
}

const NORMAL: ScopedAddresses = ScopedAddresses {
    mute: "/live/mute",
    solo: "/live/solo",
    volume: "/live/volume",
    pan: "/live/pan",
    send: "/live/send",
};

const RETURN: ScopedAddresses = ScopedAddresses {
    mute: "/live/return/mute",
    solo: "/live/return/solo",
    volume: "/live/return/volume",
    pan: "/live/return/pan",
    send: "/live/return/send",
};

pub(crate) fn register(table: &mut DispatchTable) {
    table.register("/live/arm", |msg, ctx| {
        switch(TrackScope::Normal, "/live/arm", |t| t.arm(), |t, on| t.set_arm(on), msg, ctx)
    });

    for (scope, addr) in [(TrackScope::Normal, &NORMAL), (TrackScope::Return, &RETURN)] {
        let address = addr.mute;
        table.register(address, move |msg, ctx| {
            switch(scope, address, |t| t.mute(), |t, on| t.set_mute(on), msg, ctx)
        });

        let address = addr.solo;
        table.register(address, move |msg, ctx| {
            switch(scope, address, |t| t.solo(), |t, on| t.set_solo(on), msg, ctx)
        });

        let address = addr.volume;
        table.register(address, move |msg, ctx| {
            track_param(scope, address, |t| t.volume(), msg, ctx)
        });

        let address = addr.pan;
        table.register(address, move |msg, ctx| {
            track_param(scope, address, |t| t.panning(), msg, ctx)
        });

        let address = addr.send;
        table.register(address, move |msg, ctx| send(scope, address, msg, ctx));
    }

    table.register("/live/master/volume", |msg, ctx| {
        master_param("/live/master/volume", |t| t.volume(), msg, ctx)
    });
    table.register("/live/master/pan", |msg, ctx| {
        master_param("/live/master/pan", |t| t.panning(), msg, ctx)
    });
    table.register("/live/master/crossfader", crossfader);
}

/// Visible or return tracks
pub(crate) fn scoped_tracks(song: &dyn Song, scope: TrackScope) -> Vec<TrackRef> {
    match scope {
        TrackScope::Normal => song.tracks(),
        TrackScope::Return => song.return_tracks(),
        TrackScope::Master => vec![song.master_track()],
    }
}

/// `[t]` → `(t, i)`; `[t, i]` sets
fn switch(
    scope: TrackScope,
    address: &'static str,
    get: Getter,
    set: Setter,
    msg: &OscMessage,
    ctx: &mut HandlerContext,
) -> HandlerResult {
    let args = Args::of(msg);
    let tracks = scoped_tracks(&*ctx.song, scope);
    match args.len() {
        1 => {
            let (t, track) = args.pick(0, &tracks, "track")?;
            ctx.reply(address, (t, get(&*track)));
        }
        2 => {
            let (_, track) = args.pick(0, &tracks, "track")?;
            set(&*track, args.flag(1)?)?;
        }
        _ => return Err(args.arity("1 or 2")),
    }
    Ok(())
}

/// `[t]` → `(t, f)`; `[t, f]` sets
fn track_param(
    scope: TrackScope,
    address: &'static str,
    param: MixerParam,
    msg: &OscMessage,
    ctx: &mut HandlerContext,
) -> HandlerResult {
    let args = Args::of(msg);
    let tracks = scoped_tracks(&*ctx.song, scope);
    match args.len() {
        1 => {
            let (t, track) = args.pick(0, &tracks, "track")?;
            ctx.reply(address, (t, param(&*track).value()));
        }
        2 => {
            let (_, track) = args.pick(0, &tracks, "track")?;
            param(&*track).set_value(args.float(1)?)?;
        }
        _ => return Err(args.arity("1 or 2")),
    }
    Ok(())
}

/// `[]` → `(f)`; `[f]` sets
fn master_param(
    address: &'static str,
    param: MixerParam,
    msg: &OscMessage,
    ctx: &mut HandlerContext,
) -> HandlerResult {
    let args = Args::of(msg);
    let master = ctx.song.master_track();
    match args.len() {
        0 => {
            ctx.reply(address, param(&*master).value());
        }
        1 => param(&*master).set_value(args.float(0)?)?,
        _ => return Err(args.arity("0 or 1")),
    }
    Ok(())
}

/// `[t]` → `(t, s0, v0, s1, v1, ...)`; `[t, s]` → `(t, s, f)`; `[t, s, f]`
/// sets
fn send(
    scope: TrackScope,
    address: &'static str,
    msg: &OscMessage,
    ctx: &mut HandlerContext,
) -> HandlerResult {
    let args = Args::of(msg);
    let tracks = scoped_tracks(&*ctx.song, scope);
    if args.len() == 0 || args.len() > 3 {
        return Err(args.arity("1, 2 or 3"));
    }

    let (t, track) = args.pick(0, &tracks, "track")?;
    let sends = track.sends();
    match args.len() {
        1 => {
            let mut reply = vec![OscType::from(t)];
            for (s, level) in sends.iter().enumerate() {
                reply.push(OscType::from(s));
                reply.push(OscType::from(level.value()));
            }
            ctx.reply(address, reply);
        }
        2 => {
            let (s, level) = args.pick(1, &sends, "send")?;
            ctx.reply(address, (t, s, level.value()));
        }
        _ => {
            let (_, level) = args.pick(1, &sends, "send")?;
            level.set_value(args.float(2)?)?;
        }
    }
    Ok(())
}

/// `[]` → `/live/master/crossfader (f)`; `[f]` sets
fn crossfader(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    let Some(fader) = ctx.song.master_track().crossfader() else {
        return Ok(());
    };
    match args.len() {
        0 => {
            ctx.reply("/live/master/crossfader", fader.value());
        }
        1 => fader.set_value(args.float(0)?)?,
        _ => return Err(args.arity("0 or 1")),
    }
    Ok(())
}
