//! Song transport: tempo, time, play/stop, cues, undo, overdub, quantization

use osc_codec::OscMessage;

use super::args::Args;
use crate::dispatch::{DispatchTable, HandlerContext, HandlerResult};

pub(crate) fn register(table: &mut DispatchTable) {
    table.register("/live/tempo", tempo);
    table.register("/live/time", time);
    table.register("/live/play", play);
    table.register("/live/play/continue", play_continue);
    table.register("/live/play/selection", play_selection);
    table.register("/live/stop", stop);
    table.register("/live/next/cue", next_cue);
    table.register("/live/prev/cue", prev_cue);
    table.register("/live/undo", undo);
    table.register("/live/redo", redo);
    table.register("/live/overdub", overdub);
    table.register("/live/state", state);
    table.register("/live/quantization", quantization);
}

/// `[]` → `/live/tempo (f)`; `[f]` sets
fn tempo(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    match args.len() {
        0 => {
            ctx.reply("/live/tempo", ctx.song.tempo());
        }
        1 => ctx.song.set_tempo(args.float(0)?)?,
        _ => return Err(args.arity("0 or 1")),
    }
    Ok(())
}

/// `[]` → `/live/time (f)`; `[f]` jumps
fn time(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    match args.len() {
        0 => {
            ctx.reply("/live/time", ctx.song.current_song_time());
        }
        1 => ctx.song.set_current_song_time(args.float(0)?.max(0.0)),
        _ => return Err(args.arity("0 or 1")),
    }
    Ok(())
}

fn play(_: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    ctx.song.start_playing();
    Ok(())
}

fn play_continue(_: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    ctx.song.continue_playing();
    Ok(())
}

fn play_selection(_: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    ctx.song.play_selection();
    Ok(())
}

fn stop(_: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    ctx.song.stop_playing();
    Ok(())
}

fn next_cue(_: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    ctx.song.jump_to_next_cue();
    Ok(())
}

fn prev_cue(_: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    ctx.song.jump_to_prev_cue();
    Ok(())
}

fn undo(_: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    ctx.song.undo();
    Ok(())
}

fn redo(_: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    ctx.song.redo();
    Ok(())
}

/// `[]` → `/live/overdub (i overdub+1)`; `[i]` sets
fn overdub(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    match args.len() {
        0 => {
            ctx.reply("/live/overdub", ctx.song.overdub() as i32 + 1);
        }
        1 => ctx.song.set_overdub(args.flag(0)?),
        _ => return Err(args.arity("0 or 1")),
    }
    Ok(())
}

/// `/live/state (f tempo, i overdub)`
fn state(_: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    ctx.reply("/live/state", (ctx.song.tempo(), ctx.song.overdub()));
    Ok(())
}

/// `[]` → `/live/quantization (i)`; `[i]` sets
fn quantization(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let args = Args::of(msg);
    match args.len() {
        0 => {
            ctx.reply("/live/quantization", ctx.song.clip_trigger_quantization());
        }
        1 => ctx.song.set_clip_trigger_quantization(args.int(0)?),
        _ => return Err(args.arity("0 or 1")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::Fixture;
    use osc_codec::OscType;
    use live_model::Song as _;

    #[test]
    fn test_tempo_query_and_set() {
        let fx = Fixture::new(1, 1);
        fx.send("/live/tempo", 120.5f32);
        assert_eq!(fx.memory.tempo(), 120.5);

        fx.send("/live/tempo", ());
        assert_eq!(fx.replies(), vec![OscMessage::new("/live/tempo", 120.5f32)]);

        fx.send("/live/tempo", "query");
        assert_eq!(fx.replies().len(), 1);
    }

    #[test]
    fn test_tempo_out_of_range_is_rejected() {
        let fx = Fixture::new(0, 0);
        assert_eq!(fx.send("/live/tempo", 5000.0f32).failures, 1);
        assert_eq!(fx.memory.tempo(), 120.0);
    }

    #[test]
    fn test_play_and_stop() {
        let fx = Fixture::new(0, 0);
        fx.send("/live/play", ());
        assert!(fx.memory.is_playing());
        fx.send("/live/stop", ());
        assert!(!fx.memory.is_playing());
    }

    #[test]
    fn test_overdub_reply_is_offset() {
        let fx = Fixture::new(0, 0);
        fx.send("/live/overdub", 1);
        fx.send("/live/overdub", ());
        assert_eq!(fx.replies()[0].args, vec![OscType::Int(2)]);
    }

    #[test]
    fn test_state_and_quantization() {
        let fx = Fixture::new(0, 0);
        fx.send("/live/quantization", 7);
        fx.send("/live/quantization", ());
        fx.send("/live/state", ());
        let replies = fx.replies();
        assert_eq!(replies[0], OscMessage::new("/live/quantization", 7));
        assert_eq!(replies[1], OscMessage::new("/live/state", (120.0f32, 0)));
    }

    #[test]
    fn test_undo_redo() {
        let fx = Fixture::new(0, 0);
        fx.send("/live/undo", ());
        fx.send("/live/redo", ());
        assert_eq!(fx.memory.undo_count(), 1);
        assert_eq!(fx.memory.redo_count(), 1);
    }
}
