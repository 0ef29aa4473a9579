use crate::context::{CommandContext, Invocation};
use crate::error::{CommandResult, ErrorCode};
use crate::params::ResultMap;
use crate::permissions::Capability;
use waypost_core::{AssetKind, DerezDestination, Uuid};

/// `derez`: takes an in-world primitive back into inventory.
///
/// `folder` defaults to the folder for objects. `type` names the
/// destination; anything unrecognised takes the object.
pub fn derez(ctx: &CommandContext, invocation: &Invocation) -> CommandResult<ResultMap> {
    ctx.authorize(invocation, Capability::INVENTORY)?;
    let params = &invocation.params;
    let range = ctx.range(invocation);
    let locator = ctx.locator();

    let folder = match params.get("folder") {
        Some(reference) => locator.find_folder(reference)?.id,
        None => ctx
            .store
            .inventory
            .read(|inventory| inventory.folder_for_type(AssetKind::Object)),
    };
    let destination = params
        .get("type")
        .and_then(DerezDestination::from_name)
        .unwrap_or_default();

    let item = params.require("item", ErrorCode::NoItemSpecified)?;
    let primitive = locator.find_primitive(item, range)?;

    ctx.store.objects.read(|_| {
        ctx.grid
            .request_derez(primitive.local_id, destination, folder, Uuid::new_v4());
    });
    Ok(ResultMap::new())
}
