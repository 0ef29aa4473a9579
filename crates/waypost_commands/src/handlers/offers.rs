use crate::context::{CommandContext, Invocation};
use crate::error::{CommandResult, ErrorCode};
use crate::params::ResultMap;
use crate::permissions::Capability;
use waypost_core::{OfferDecision, Uuid};

/// `replytoinventoryoffer`: accepts or declines a pending offer.
///
/// Accepted items go to `folder`, or to the folder for their kind.
pub fn reply_to_inventory_offer(
    ctx: &CommandContext,
    invocation: &Invocation,
) -> CommandResult<ResultMap> {
    ctx.authorize(invocation, Capability::INVENTORY)?;
    let params = &invocation.params;

    let session: Uuid = params.parse_required("session", ErrorCode::NoSessionSpecified)?;
    let offer = ctx
        .offers
        .peek(session)
        .ok_or(ErrorCode::InventoryOfferNotFound)?;

    let folder = match params.get("folder") {
        Some(reference) => ctx.locator().find_folder(reference)?.id,
        None => ctx
            .store
            .inventory
            .read(|inventory| inventory.folder_for_type(offer.asset_kind)),
    };

    let decision = match params.get("action").map(str::to_ascii_lowercase).as_deref() {
        Some("accept") => OfferDecision::Accept {
            folder: Some(folder),
        },
        Some("decline") => OfferDecision::Decline,
        _ => return Err(ErrorCode::UnknownAction.into()),
    };

    // A concurrent reply or the expiry may have settled it since the peek.
    ctx.offers.resolve(session, decision)?;
    tracing::info!(offer = %session, item = %offer.item_name, ?decision, "inventory offer answered");
    Ok(ResultMap::new())
}
