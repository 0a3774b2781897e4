//! Clip launching, clip state and loop settings

use live_model::{ClipState, Track};
use osc_codec::{OscMessage, OscType};

use super::args::Args;
use super::names::clip_at;
use crate::dispatch::{DispatchTable, HandlerContext, HandlerResult};

pub(crate) fn register(table: &mut DispatchTable) {
    table.register("/live/play/clip", play_clip);
    table.register("/live/play/clipslot", play_clipslot);
    table.register("/live/play/scene", play_scene);
    table.register("/live/stop/clip", stop_clip);
    table.register("/live/stop/track", stop_track);
    table.register("/live/track/jump", track_jump);
    table.register("/live/track/info", track_info);
    table.register("/live/clip/info", clip_info);
    table.register("/live/clip/warping", warping);

    for (address, with_ids) in [
        ("/live/clip/loopstate", false),
        ("/live/clip/loopstate_id", true),
    ] {
        table.register(address, move |msg, ctx| loop_state(with_ids, msg, ctx));
    }
    for (address, with_ids) in [
        ("/live/clip/loopstart", false),
        ("/live/clip/loopstart_id", true),
    ] {
        table.register(address, move |msg, ctx| loop_start(with_ids, msg, ctx));
    }
    for (address, with_ids) in [("/live/clip/loopend", false), ("/live/clip/loopend_id", true)] {
        table.register(address, move |msg, ctx| loop_end(with_ids, msg, ctx));
    }
}

/// `[t, c]` launches the clip; an empty slot is an error
fn play_clip(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    if args.len() != 2 {
        return Err(args.arity("2"));
    }
    clip_at(&*ctx.song, args.int(0)?, args.int(1)?)?.fire();
    Ok(())
}

/// `[t, c]` fires the slot, whatever it holds
fn play_clipslot(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    if args.len() != 2 {
        return Err(args.arity("2"));
    }
    let (_, track) = args.pick(0, &ctx.song.tracks(), "track")?;
    let (_, slot) = args.pick(1, &track.clip_slots(), "clip slot")?;
    slot.fire();
    Ok(())
}

fn play_scene(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    if args.len() != 1 {
        return Err(args.arity("1"));
    }
    let (_, scene) = args.pick(0, &ctx.song.scenes(), "scene")?;
    scene.fire();
    Ok(())
}

fn stop_clip(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    if args.len() != 2 {
        return Err(args.arity("2"));
    }
    let (_, track) = args.pick(0, &ctx.song.tracks(), "track")?;
    let (_, slot) = args.pick(1, &track.clip_slots(), "clip slot")?;
    slot.stop();
    Ok(())
}

fn stop_track(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    if args.len() != 1 {
        return Err(args.arity("1"));
    }
    let (_, track) = args.pick(0, &ctx.song.tracks(), "track")?;
    track.stop_all_clips();
    Ok(())
}

/// `[t, beats]` moves inside the track's running clip
fn track_jump(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    if args.len() != 2 {
        return Err(args.arity("2"));
    }
    let (_, track) = args.pick(0, &ctx.song.tracks(), "track")?;
    track.jump_in_running_session_clip(args.float(1)?);
    Ok(())
}

/// `(t, armed, c0, state0, length0, c1, ...)` for one track
fn track_status(index: usize, track: &dyn Track) -> Vec<OscType> {
    let armed = track.can_be_armed() && track.arm();
    let mut reply = vec![OscType::from(index), OscType::from(armed)];
    for (c, slot) in track.clip_slots().iter().enumerate() {
        let clip = slot.clip();
        reply.push(OscType::from(c));
        reply.push(OscType::from(ClipState::of(clip.as_deref()).code()));
        reply.push(OscType::from(clip.map(|clip| clip.length()).unwrap_or(0.0)));
    }
    reply
}

/// `[]` every track, `[t]` one track
fn track_info(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    let tracks = ctx.song.tracks();
    match args.len() {
        0 => {
            for (t, track) in tracks.iter().enumerate() {
                ctx.reply("/live/track/info", track_status(t, &**track));
            }
        }
        1 => {
            let (t, track) = args.pick(0, &tracks, "track")?;
            ctx.reply("/live/track/info", track_status(t, &*track));
        }
        _ => return Err(args.arity("0 or 1")),
    }
    Ok(())
}

/// `[t, c]` → `(t, c, state)`; an empty slot reports state 0
fn clip_info(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    if args.len() != 2 {
        return Err(args.arity("2"));
    }
    let (t, track) = args.pick(0, &ctx.song.tracks(), "track")?;
    let (c, slot) = args.pick(1, &track.clip_slots(), "clip slot")?;
    let state = ClipState::of(slot.clip().as_deref()).code();
    ctx.reply("/live/clip/info", (t, c, state));
    Ok(())
}

/// `[t, c]` → `(t, c, i)`; `[t, c, i]` sets
fn warping(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    let (t, c) = (args.int(0)?, args.int(1)?);
    let clip = clip_at(&*ctx.song, t, c)?;
    match args.len() {
        2 => {
            ctx.reply("/live/clip/warping", (t, c, clip.warping()));
        }
        3 => clip.set_warping(args.flag(2)?),
        _ => return Err(args.arity("2 or 3")),
    }
    Ok(())
}

/// `[t, c]` → `/live/clip/loopstate (i)`, or `(t, c, i)` from the `_id`
/// address; `[t, c, i]` sets
fn loop_state(with_ids: bool, msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    let (t, c) = (args.int(0)?, args.int(1)?);
    let clip = clip_at(&*ctx.song, t, c)?;
    match args.len() {
        2 if with_ids => {
            ctx.reply("/live/clip/loopstate", (t, c, clip.looping()));
        }
        2 => {
            ctx.reply("/live/clip/loopstate", clip.looping());
        }
        3 => clip.set_looping(args.flag(2)?),
        _ => return Err(args.arity("2 or 3")),
    }
    Ok(())
}

fn loop_start(with_ids: bool, msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    let (t, c) = (args.int(0)?, args.int(1)?);
    let clip = clip_at(&*ctx.song, t, c)?;
    match args.len() {
        2 if with_ids => {
            ctx.reply("/live/clip/loopstart", (t, c, clip.loop_start()));
        }
        2 => {
            ctx.reply("/live/clip/loopstart", clip.loop_start());
        }
        3 => clip.set_loop_start(args.float(2)?)?,
        _ => return Err(args.arity("2 or 3")),
    }
    Ok(())
}

fn loop_end(with_ids: bool, msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    let (t, c) = (args.int(0)?, args.int(1)?);
    let clip = clip_at(&*ctx.song, t, c)?;
    match args.len() {
        2 if with_ids => {
            ctx.reply("/live/clip/loopend", (t, c, clip.loop_end()));
        }
        2 => {
            ctx.reply("/live/clip/loopend", clip.loop_end());
        }
        3 => clip.set_loop_end(args.float(2)?)?,
        _ => return Err(args.arity("2 or 3")),
    }
    Ok(())
}
