use crate::context::{CommandContext, Invocation};
use crate::error::{CommandError, CommandResult, ErrorCode};
use crate::params::{pairs, ResultMap};
use crate::permissions::Capability;
use waypost_core::session::{Primitive, Simulator};
use waypost_core::{ShapeData, Vector3};

/// Smallest edge a primitive may have.
pub const MINIMUM_PRIMITIVE_SIZE: f32 = 0.01;

/// Largest edge a primitive may have.
pub const MAXIMUM_PRIMITIVE_SIZE: f32 = 64.0;

/// Resolves the `item` primitive and the simulator it lives in.
fn target(ctx: &CommandContext, invocation: &Invocation) -> CommandResult<(Primitive, Simulator)> {
    let range = ctx.range(invocation);
    let item = invocation
        .params
        .require("item", ErrorCode::NoItemSpecified)?;
    let locator = ctx.locator();
    let primitive = locator.find_primitive(item, range)?;
    let simulator = locator.simulator_for(primitive.region)?;
    Ok((primitive, simulator))
}

/// `setprimitivescale`: resizes a primitive, linked parts too when
/// `uniform` (the default).
pub fn set_primitive_scale(
    ctx: &CommandContext,
    invocation: &Invocation,
) -> CommandResult<ResultMap> {
    ctx.authorize(invocation, Capability::INTERACT)?;
    let params = &invocation.params;
    let uniform = params.flag("uniform", true);
    let (primitive, simulator) = target(ctx, invocation)?;

    let scale: Vector3 = params.parse_required("scale", ErrorCode::InvalidScale)?;
    if ctx.session.enforce_building_constraints
        && [scale.x, scale.y, scale.z]
            .iter()
            .any(|edge| !(MINIMUM_PRIMITIVE_SIZE..=MAXIMUM_PRIMITIVE_SIZE).contains(edge))
    {
        return Err(ErrorCode::ScaleWouldExceedBuildingConstraints.into());
    }

    ctx.store.objects.read(|_| {
        ctx.grid
            .set_scale(simulator.handle, primitive.local_id, scale, uniform);
    });
    Ok(ResultMap::new())
}

/// `setprimitiveshapedata`: changes a primitive's construction.
///
/// `type` picks a preset body to start from, otherwise the primitive's own
/// shape is kept. `data` overrides fields as `name,value` pairs.
pub fn set_primitive_shape_data(
    ctx: &CommandContext,
    invocation: &Invocation,
) -> CommandResult<ResultMap> {
    ctx.authorize(invocation, Capability::INTERACT)?;
    let params = &invocation.params;
    let (primitive, simulator) = target(ctx, invocation)?;

    let mut shape = params
        .get("type")
        .and_then(ShapeData::preset)
        .unwrap_or(primitive.shape);

    let fields = params.list("data")?;
    for (field, value) in pairs(&fields) {
        match shape.set_field(field, value) {
            Ok(true) => {}
            Ok(false) => tracing::debug!(field, "ignoring unknown shape field"),
            Err(error) => {
                return Err(CommandError::with_detail(
                    ErrorCode::InvalidShapeData,
                    error.to_string(),
                ))
            }
        }
    }

    ctx.store.objects.read(|_| {
        ctx.grid.set_shape(simulator.handle, primitive.local_id, shape);
    });
    Ok(ResultMap::new())
}
