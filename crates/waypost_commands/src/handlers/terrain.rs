use super::data;
use crate::context::{CommandContext, Invocation};
use crate::error::{CommandError, CommandResult, ErrorCode};
use crate::params::{join_csv, ResultMap};
use crate::permissions::Capability;
use waypost_core::session::Simulator;
use waypost_core::{EventKind, GridEvent, Vector3};

/// Highest region-local grid coordinate.
const REGION_EDGE: f32 = 255.0;

/// Reported for points whose height is unknown.
const UNKNOWN_HEIGHT: f32 = -1.0;

/// `getterrainheight`: heights over the rectangle spanned by `southwest`
/// and `northeast`, x-major, as one CSV list.
pub fn get_terrain_height(
    ctx: &CommandContext,
    invocation: &Invocation,
) -> CommandResult<ResultMap> {
    ctx.authorize(invocation, Capability::LAND)?;
    let params = &invocation.params;
    let locator = ctx.locator();

    let region = locator.find_simulator(params.get("region").unwrap_or_default())?;
    await_parcels(ctx, &region)?;
    let region = locator.simulator_for(region.handle)?;

    let southwest = params.parse_or("southwest", Vector3::ZERO);
    let northeast = params.parse_or("northeast", Vector3::new(REGION_EDGE, REGION_EDGE, 0.0));
    let (x0, x1) = span(southwest.x, northeast.x);
    let (y0, y1) = span(southwest.y, northeast.y);

    let mut heights = Vec::with_capacity((x1 - x0 + 1) * (y1 - y0 + 1));
    for x in x0..=x1 {
        for y in y0..=y1 {
            heights.push(region.terrain_height(x, y).unwrap_or(UNKNOWN_HEIGHT).to_string());
        }
    }
    Ok(data(join_csv(&heights)))
}

/// Waits until the region's parcel map has been downloaded.
fn await_parcels(ctx: &CommandContext, region: &Simulator) -> CommandResult<()> {
    let handle = region.handle;
    let complete = region.parcel_map_complete;
    ctx.bridge
        .call(
            &format!("parcels:{handle}"),
            EventKind::SimParcelsDownloaded,
            ctx.session.services_timeout(),
            move |event| match event {
                GridEvent::SimParcelsDownloaded { region, .. } if *region == handle => Some(()),
                _ => None,
            },
            || {
                if complete {
                    return Some(());
                }
                ctx.grid.request_all_sim_parcels(handle);
                None
            },
        )
        .map_err(CommandError::bridged(ErrorCode::TimeoutGettingParcels))
}

/// Rounds and clamps two coordinates into an ascending grid span.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn span(a: f32, b: f32) -> (usize, usize) {
    let clamp = |v: f32| {
        if v.is_finite() {
            v.round().clamp(0.0, REGION_EDGE) as usize
        } else {
            0
        }
    };
    let (a, b) = (clamp(a), clamp(b));
    (a.min(b), a.max(b))
}
