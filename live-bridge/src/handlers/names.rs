//! Counts, selection and names of tracks, scenes and clips

use live_model::{ClipRef, Song};
use osc_codec::{OscMessage, OscType};

use super::args::{pick, Args};
use crate::dispatch::{DispatchTable, HandlerContext, HandlerResult};
use crate::error::HandlerError;

pub(crate) fn register(table: &mut DispatchTable) {
    table.register("/live/tracks", tracks);
    table.register("/live/scenes", scenes);
    table.register("/live/scene", scene);
    table.register("/live/name/track", name_track);
    table.register("/live/name/trackblock", name_trackblock);
    table.register("/live/name/scene", name_scene);
    table.register("/live/name/sceneblock", name_sceneblock);
    table.register("/live/name/clip", name_clip);
    table.register("/live/name/clipblock", name_clipblock);
}

/// Clip at `(track, slot)`, or `EmptySlot`
pub(crate) fn clip_at(song: &dyn Song, track: i32, slot: i32) -> Result<ClipRef, HandlerError> {
    let (t, track) = pick(track, &song.tracks(), "track")?;
    let (s, slot) = pick(slot, &track.clip_slots(), "clip slot")?;
    slot.clip().ok_or(HandlerError::EmptySlot { track: t, slot: s })
}

fn tracks(_: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    ctx.reply("/live/tracks", ctx.song.tracks().len());
    Ok(())
}

fn scenes(_: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    ctx.reply("/live/scenes", ctx.song.scenes().len());
    Ok(())
}

/// `[]` → `/live/scene (i selected+1)`, 0 when none; `[i]` selects
fn scene(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    match args.len() {
        0 => {
            let selected = ctx.song.selected_scene().map(|i| i + 1).unwrap_or(0);
            ctx.reply("/live/scene", selected);
        }
        1 => {
            let (index, _) = args.pick(0, &ctx.song.scenes(), "scene")?;
            ctx.song.select_scene(index)?;
        }
        _ => return Err(args.arity("0 or 1")),
    }
    Ok(())
}

/// `[]` all, `[i]` one, `[i, s]` renames
fn name_track(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    let tracks = ctx.song.tracks();
    match args.len() {
        0 => {
            for (i, track) in tracks.iter().enumerate() {
                ctx.reply("/live/name/track", (i, track.name()));
            }
        }
        1 => {
            let (i, track) = args.pick(0, &tracks, "track")?;
            ctx.reply("/live/name/track", (i, track.name()));
        }
        2 => {
            let (_, track) = args.pick(0, &tracks, "track")?;
            track.set_name(args.string(1)?);
        }
        _ => return Err(args.arity("0, 1 or 2")),
    }
    Ok(())
}

/// Indices `offset..offset+size` clamped to what exists
fn block_range(offset: i32, size: i32, len: usize) -> std::ops::Range<usize> {
    let start = usize::try_from(offset).unwrap_or(0).min(len);
    let end = start.saturating_add(usize::try_from(size).unwrap_or(0)).min(len);
    start..end
}

/// `[offset, size]` → `/live/name/trackblock (s...)`
fn name_trackblock(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    if args.len() != 2 {
        return Err(args.arity("2"));
    }
    let tracks = ctx.song.tracks();
    let names: Vec<OscType> = tracks[block_range(args.int(0)?, args.int(1)?, tracks.len())]
        .iter()
        .map(|t| OscType::from(t.name()))
        .collect();
    ctx.reply("/live/name/trackblock", names);
    Ok(())
}

/// `[]` all, `[i]` one, `[i, s]` renames
fn name_scene(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    let scenes = ctx.song.scenes();
    match args.len() {
        0 => {
            for (i, scene) in scenes.iter().enumerate() {
                ctx.reply("/live/name/scene", (i, scene.name()));
            }
        }
        1 => {
            let (i, scene) = args.pick(0, &scenes, "scene")?;
            ctx.reply("/live/name/scene", (i, scene.name()));
        }
        2 => {
            let (_, scene) = args.pick(0, &scenes, "scene")?;
            scene.set_name(args.string(1)?);
        }
        _ => return Err(args.arity("0, 1 or 2")),
    }
    Ok(())
}

/// `[offset, size]` → `/live/name/sceneblock (s...)`
fn name_sceneblock(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    if args.len() != 2 {
        return Err(args.arity("2"));
    }
    let scenes = ctx.song.scenes();
    let names: Vec<OscType> = scenes[block_range(args.int(0)?, args.int(1)?, scenes.len())]
        .iter()
        .map(|s| OscType::from(s.name()))
        .collect();
    ctx.reply("/live/name/sceneblock", names);
    Ok(())
}

/// Every clip as `/live/name/clip (track, slot, name, color)`
fn send_all_clip_names(ctx: &HandlerContext) {
    for (t, track) in ctx.song.tracks().iter().enumerate() {
        for (s, slot) in track.clip_slots().iter().enumerate() {
            if let Some(clip) = slot.clip() {
                ctx.reply("/live/name/clip", (t, s, clip.name(), clip.color()));
            }
        }
    }
}

/// `[]` all, `[t, c]` one, `[t, c, s]` renames, `[t, c, s, i]` renames and
/// recolors
fn name_clip(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    match args.len() {
        0 => send_all_clip_names(ctx),
        2 => {
            let (t, s) = (args.int(0)?, args.int(1)?);
            let clip = clip_at(&*ctx.song, t, s)?;
            ctx.reply("/live/name/clip", (t, s, clip.name(), clip.color()));
        }
        3 | 4 => {
            let clip = clip_at(&*ctx.song, args.int(0)?, args.int(1)?)?;
            clip.set_name(args.string(2)?);
            if args.len() == 4 {
                clip.set_color(args.int(3)?);
            }
        }
        _ => return Err(args.arity("0, 2, 3 or 4")),
    }
    Ok(())
}

/// `[track, slot, width, height]` → `/live/name/clipblock (s...)`, row by
/// row; empty or missing slots give `""`
fn name_clipblock(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    if args.len() != 4 {
        return Err(args.arity("4"));
    }
    let (track0, slot0) = (args.int(0)?, args.int(1)?);
    let (width, height) = (args.int(2)?.max(0), args.int(3)?.max(0));

    let mut names = Vec::new();
    for dy in 0..height {
        for dx in 0..width {
            let name = clip_at(&*ctx.song, track0 + dx, slot0 + dy)
                .map(|clip| clip.name())
                .unwrap_or_default();
            names.push(OscType::from(name));
        }
    }
    ctx.reply("/live/name/clipblock", names);
    Ok(())
}
