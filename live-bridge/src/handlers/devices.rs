//! Device lists, device parameters and parameter ranges
//!
//! Visible, return and master tracks share one implementation. Visible and
//! return addresses take the track index as their first argument and echo
//! it back; master addresses have no track argument.

use live_model::{Song, TrackRef};
use osc_codec::{OscMessage, OscType};

use super::args::Args;
use super::mixer::scoped_tracks;
use crate::dispatch::{DispatchTable, HandlerContext, HandlerResult};
use crate::error::HandlerError;
use crate::subscription::TrackScope;

struct DeviceAddresses {
    list: &'static str,
    device: &'static str,
    all_params: &'static str,
    param: &'static str,
    range: &'static str,
}

const NORMAL: DeviceAddresses = DeviceAddresses {
    list: "/live/devicelist",
    device: "/live/device",
    all_params: "/live/device/allparam",
    param: "/live/device/param",
    range: "/live/device/range",
};

const RETURN: DeviceAddresses = DeviceAddresses {
    list: "/live/return/devicelist",
    device: "/live/return/device",
    all_params: "/live/return/device/allparam",
    param: "/live/return/device/param",
    range: "/live/return/device/range",
};

const MASTER: DeviceAddresses = DeviceAddresses {
    list: "/live/master/devicelist",
    device: "/live/master/device",
    all_params: "/live/master/device",
    param: "/live/master/device",
    range: "/live/master/device/range",
};

pub(crate) fn register(table: &mut DispatchTable) {
    for (scope, addr) in [
        (TrackScope::Normal, &NORMAL),
        (TrackScope::Return, &RETURN),
        (TrackScope::Master, &MASTER),
    ] {
        table.register(addr.list, move |msg, ctx| device_list(scope, addr, msg, ctx));
        table.register(addr.device, move |msg, ctx| device(scope, addr, msg, ctx));
        table.register(addr.range, move |msg, ctx| device_range(scope, addr, msg, ctx));
    }
}

/// The addressed track plus the reply prefix and the index of the first
/// argument after the track
fn locate(
    scope: TrackScope,
    args: &Args<'_>,
    song: &dyn Song,
) -> Result<(TrackRef, Vec<OscType>, usize), HandlerError> {
    if scope == TrackScope::Master {
        return Ok((song.master_track(), Vec::new(), 0));
    }
    if args.len() == 0 {
        return Err(args.arity("a track index"));
    }
    let (t, track) = args.pick(0, &scoped_tracks(song, scope), "track")?;
    Ok((track, vec![OscType::from(t)], 1))
}

/// `[t]` → `(t, 0, name0, 1, name1, ...)`
fn device_list(
    scope: TrackScope,
    addr: &DeviceAddresses,
    msg: &OscMessage,
    ctx: &mut HandlerContext,
) -> HandlerResult {
    let args = Args::of(msg);
    let (track, mut reply, rest) = locate(scope, &args, &*ctx.song)?;
    if args.len() != rest {
        return Err(args.arity(if rest == 0 { "0" } else { "1" }));
    }
    for (d, device) in track.devices().iter().enumerate() {
        reply.push(OscType::from(d));
        reply.push(OscType::from(device.name()));
    }
    ctx.reply(addr.list, reply);
    Ok(())
}

/// `[t, d]` all parameters as `(t, d, p, value, name, ...)`; `[t, d, p]` one
/// parameter; `[t, d, p, f]` sets
fn device(
    scope: TrackScope,
    addr: &DeviceAddresses,
    msg: &OscMessage,
    ctx: &mut HandlerContext,
) -> HandlerResult {
    let args = Args::of(msg);
    let (track, mut reply, rest) = locate(scope, &args, &*ctx.song)?;
    let extra = args.len() - rest;
    if !(1..=3).contains(&extra) {
        return Err(args.arity("device [, parameter [, value]]"));
    }

    let (d, device) = args.pick(rest, &track.devices(), "device")?;
    let params = device.parameters();
    reply.push(OscType::from(d));

    match extra {
        1 => {
            for (p, param) in params.iter().enumerate() {
                reply.push(OscType::from(p));
                reply.push(OscType::from(param.value()));
                reply.push(OscType::from(param.name()));
            }
            ctx.reply(addr.all_params, reply);
        }
        2 => {
            let (p, param) = args.pick(rest + 1, &params, "parameter")?;
            reply.push(OscType::from(p));
            reply.push(OscType::from(param.value()));
            reply.push(OscType::from(param.name()));
            ctx.reply(addr.param, reply);
        }
        _ => {
            let (_, param) = args.pick(rest + 1, &params, "parameter")?;
            param.set_value(args.float(rest + 2)?)?;
        }
    }
    Ok(())
}

/// `[t, d]` → `(t, d, p, min, max, ...)`; `[t, d, p]` one parameter
fn device_range(
    scope: TrackScope,
    addr: &DeviceAddresses,
    msg: &OscMessage,
    ctx: &mut HandlerContext,
) -> HandlerResult {
    let args = Args::of(msg);
    let (track, mut reply, rest) = locate(scope, &args, &*ctx.song)?;
    let extra = args.len() - rest;
    if !(1..=2).contains(&extra) {
        return Err(args.arity("device [, parameter]"));
    }

    let (d, device) = args.pick(rest, &track.devices(), "device")?;
    let params = device.parameters();
    reply.push(OscType::from(d));

    let selected: Vec<(usize, _)> = if extra == 1 {
        params.into_iter().enumerate().collect()
    } else {
        vec![args.pick(rest + 1, &params, "parameter")?]
    };
    for (p, param) in selected {
        reply.push(OscType::from(p));
        reply.push(OscType::from(param.min()));
        reply.push(OscType::from(param.max()));
    }
    ctx.reply(addr.range, reply);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::Fixture;
    use live_model::Parameter as _;

    fn with_devices(fx: &Fixture) {
        let eq = fx.memory.track(0).unwrap().add_device("EQ");
        eq.add_parameter("Gain", 0.5, 0.0, 1.0);
        eq.add_parameter("Freq", 100.0, 20.0, 20000.0);
        fx.memory
            .master()
            .add_device("Limiter")
            .add_parameter("Ceiling", -0.3, -24.0, 0.0);
    }

    #[test]
    fn test_devicelist() {
        let fx = Fixture::new(1, 0);
        with_devices(&fx);
        fx.send("/live/devicelist", 0);
        fx.send("/live/master/devicelist", ());
        assert_eq!(
            fx.replies(),
            vec![
                OscMessage::new("/live/devicelist", (0, 0, "EQ")),
                OscMessage::new("/live/master/devicelist", (0, "Limiter")),
            ]
        );
    }

    #[test]
    fn test_device_param_forms() {
        let fx = Fixture::new(1, 0);
        with_devices(&fx);

        fx.send("/live/device", (0, 0, 0, 0.25f32));
        let param = fx.memory.track(0).unwrap().device(0).unwrap().parameter(0).unwrap();
        assert_eq!(param.value(), 0.25);

        fx.send("/live/device", (0, 0, 1));
        fx.send("/live/device", (0, 0));
        let replies = fx.replies();
        assert_eq!(
            replies[0],
            OscMessage::new("/live/device/param", (0, 0, 1, 100.0f32, "Freq"))
        );
        assert_eq!(replies[1].address, "/live/device/allparam");
        assert_eq!(replies[1].arity(), 2 + 2 * 3);
    }

    #[test]
    fn test_master_device() {
        let fx = Fixture::new(1, 0);
        with_devices(&fx);
        fx.send("/live/master/device", (0, 0));
        assert_eq!(
            fx.replies(),
            vec![OscMessage::new("/live/master/device", (0, 0, -0.3f32, "Ceiling"))]
        );
    }

    #[test]
    fn test_ranges_are_min_then_max() {
        let fx = Fixture::new(1, 0);
        with_devices(&fx);
        fx.send("/live/device/range", (0, 0, 1));
        fx.send("/live/master/device/range", 0);
        assert_eq!(
            fx.replies(),
            vec![
                OscMessage::new("/live/device/range", (0, 0, 1, 20.0f32, 20000.0f32)),
                OscMessage::new("/live/master/device/range", (0, 0, -24.0f32, 0.0f32)),
            ]
        );
    }

    #[test]
    fn test_missing_device_fails() {
        let fx = Fixture::new(1, 0);
        assert_eq!(fx.send("/live/device", (0, 3)).failures, 1);
        assert_eq!(fx.send("/live/device", ()).failures, 1);
    }
}
