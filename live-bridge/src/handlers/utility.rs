//! `/remix/...` utility addresses

use std::time::{SystemTime, UNIX_EPOCH};

use osc_codec::OscMessage;

use crate::dispatch::{DispatchTable, HandlerContext, HandlerResult};

pub(crate) fn register(table: &mut DispatchTable) {
    table.register("/remix/echo", echo);
    table.register("/remix/time", time);
}

/// Reply with the same arguments
fn echo(msg: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    ctx.reply("/remix/echo", msg.args.clone());
    Ok(())
}

/// Reply with wall-clock seconds since the Unix epoch
///
/// OSC floats are 32-bit, so at current epoch values the reply is only
/// accurate to a couple of minutes.
fn time(_: &OscMessage, ctx: &mut HandlerContext) -> HandlerResult {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    ctx.reply("/remix/time", seconds as f32);
    Ok(())
}
