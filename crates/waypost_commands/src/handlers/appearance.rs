use crate::context::{CommandContext, Invocation};
use crate::error::{CommandResult, ErrorCode};
use crate::params::ResultMap;
use crate::permissions::Capability;
use std::collections::HashSet;
use waypost_core::session::{InventoryItem, InventoryStore};
use waypost_core::{AssetKind, Uuid, WearableType};

/// `changeappearance`: wears the contents of `folder`.
///
/// Body parts stay on unless the new outfit brings one of the same type.
/// With `deanimate`, playing animations other than the built-in ones are
/// stopped first.
pub fn change_appearance(
    ctx: &CommandContext,
    invocation: &Invocation,
) -> CommandResult<ResultMap> {
    ctx.authorize(invocation, Capability::GROOMING)?;
    let params = &invocation.params;

    let folder = params.require("folder", ErrorCode::NoFolderSpecified)?;
    let folder = ctx.locator().find_folder(folder)?;

    let outfit = ctx
        .store
        .inventory
        .read(|inventory| equipable(inventory, folder.id));
    if outfit.is_empty() {
        return Err(ErrorCode::NoEquipableItems.into());
    }

    if params.flag("deanimate", false) {
        let playing = ctx
            .store
            .agent
            .write(waypost_core::session::AgentState::take_custom_animations);
        for animation in playing {
            ctx.grid.stop_animation(animation);
        }
    }

    ctx.store
        .inventory
        .write(|inventory| relink_current_outfit(inventory, &outfit));

    let worn: Vec<Uuid> = outfit.iter().map(|item| item.id).collect();
    ctx.store.appearance.write(|appearance| {
        appearance.worn.clone_from(&worn);
        ctx.grid.replace_outfit(&worn);
    });
    ctx.rebake.schedule();

    tracing::info!(folder = %folder.name, items = worn.len(), "appearance changed");
    Ok(ResultMap::new())
}

/// Wearable items directly inside `folder`, with links followed.
fn equipable(inventory: &InventoryStore, folder: Uuid) -> Vec<InventoryItem> {
    inventory
        .children(folder)
        .iter()
        .filter_map(|id| inventory.item(*id))
        .filter_map(|item| inventory.resolve_link(item))
        .filter(|item| {
            matches!(
                item.asset_kind,
                AssetKind::Clothing | AssetKind::Bodypart | AssetKind::Object
            )
        })
        .cloned()
        .collect()
}

/// Replaces the links in the current outfit folder with links to `outfit`.
fn relink_current_outfit(inventory: &mut InventoryStore, outfit: &[InventoryItem]) {
    let Some(current) = inventory.current_outfit_folder() else {
        tracing::debug!("no current outfit folder");
        return;
    };

    let replaced: HashSet<WearableType> = outfit
        .iter()
        .filter(|item| item.asset_kind == AssetKind::Bodypart)
        .filter_map(|item| item.wearable)
        .collect();

    let stale: Vec<Uuid> = inventory
        .children(current)
        .iter()
        .filter_map(|id| inventory.item(*id))
        .filter(|link| {
            let target = inventory.resolve_link(link);
            match target.and_then(|item| item.wearable) {
                Some(wearable) if wearable.is_body_part() => replaced.contains(&wearable),
                _ => true,
            }
        })
        .map(|link| link.id)
        .collect();
    for id in stale {
        inventory.remove(id);
    }

    let kept: HashSet<Uuid> = inventory
        .children(current)
        .iter()
        .filter_map(|id| inventory.item(*id))
        .filter_map(|link| link.link_target)
        .collect();
    for item in outfit.iter().filter(|item| !kept.contains(&item.id)) {
        let mut link = InventoryItem::new(current, item.name.clone(), AssetKind::Link);
        link.link_target = Some(item.id);
        link.wearable = item.wearable;
        link.description.clone_from(&item.description);
        inventory.insert_item(link);
    }
    inventory.mark_needs_update(current);
}
