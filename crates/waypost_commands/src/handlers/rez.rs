use super::group::current_groups;
use crate::context::{CommandContext, Invocation};
use crate::error::{CommandError, CommandResult, ErrorCode};
use crate::params::ResultMap;
use crate::permissions::Capability;
use waypost_core::grid::RezRequest;
use waypost_core::session::{GroupPowers, Parcel, ParcelFlags};
use waypost_core::{Quaternion, Uuid, Vector3};

/// Highest altitude objects may be rezzed at.
pub const MAXIMUM_REZ_ALTITUDE: f32 = 4096.0;

/// `rez`: places an inventory item in the world.
pub fn rez(ctx: &CommandContext, invocation: &Invocation) -> CommandResult<ResultMap> {
    let caller = ctx.authorize(invocation, Capability::INVENTORY)?;
    let group = caller.id;
    let params = &invocation.params;
    let locator = ctx.locator();

    let item = params.require("item", ErrorCode::NoItemSpecified)?;
    let item = locator.find_item(item)?;

    let position: Vector3 = params.parse_required("position", ErrorCode::InvalidPosition)?;
    if ctx.session.enforce_building_constraints && position.z > MAXIMUM_REZ_ALTITUDE {
        return Err(ErrorCode::PositionWouldExceedMaximumRezAltitude.into());
    }
    let rotation = params.parse_or("rotation", Quaternion::IDENTITY);

    let region = locator.find_simulator(params.get("region").unwrap_or_default())?;
    let parcel = locator.find_parcel(region.handle, position)?;

    let agent = ctx.store.agent.read(|agent| agent.id);
    if !parcel.flags.contains(ParcelFlags::CREATE_OBJECTS)
        && !region.estate_manager
        && parcel.owner != agent
    {
        check_group_rez(ctx, &parcel, group)?;
    }

    ctx.store.inventory.read(|_| {
        ctx.grid.request_rez(RezRequest {
            item: item.id,
            region: region.handle,
            position,
            rotation,
            group,
        });
    });
    tracing::debug!(item = %item.name, region = %region.name, %position, "rez requested");
    Ok(ResultMap::new())
}

/// Rezzing on restricted land needs the parcel's group to be the caller's
/// group, with the rez power granted to the agent.
fn check_group_rez(ctx: &CommandContext, parcel: &Parcel, group: Uuid) -> CommandResult<()> {
    if !parcel.group_owned && parcel.group != group {
        return Err(CommandError::with_detail(
            ErrorCode::NoGroupPowerForCommand,
            "parcel belongs to another group",
        ));
    }
    let powers = current_groups(ctx)?
        .into_iter()
        .find(|membership| membership.id == group)
        .map(|membership| membership.powers)
        .unwrap_or_default();
    if powers.contains(GroupPowers::ALLOW_REZ) {
        Ok(())
    } else {
        Err(CommandError::with_detail(
            ErrorCode::NoGroupPowerForCommand,
            "group role does not allow rezzing",
        ))
    }
}
