//! # Grid Interface
//!
//! The session's view of the remote virtual-world service. Requests are
//! fire-and-forget; their outcomes arrive later as [`GridEvent`]s on the
//! grid's [`EventHub`], delivered from network threads.
//!
//! Implementations must never publish a reply on the thread that issued
//! the request.

pub mod events;
pub mod hub;

pub use events::{
    AgentMatch, ChatAudible, ChatEvent, ChatSource, ChatVolume, EventKind, GridEvent,
    InventoryOffer,
};
pub use hub::{EventHub, Handler, Subscription};

use crate::shape::ShapeData;
use crate::types::{
    AssetKind, DerezDestination, InventoryType, PermissionMask, Quaternion, RegionHandle,
    Vector3, WearableType,
};
use std::sync::Arc;
use uuid::Uuid;

/// Rez an inventory item into the world.
#[derive(Clone, Debug, PartialEq)]
pub struct RezRequest {
    /// Item to rez
    pub item: Uuid,
    /// Target region
    pub region: RegionHandle,
    /// Region-local position
    pub position: Vector3,
    /// Initial rotation
    pub rotation: Quaternion,
    /// Group to rez as
    pub group: Uuid,
}

/// Create an inventory item, optionally from asset bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateItemRequest {
    /// Correlation id echoed in the reply
    pub transaction: Uuid,
    /// Folder to create the item in
    pub folder: Uuid,
    /// Item name
    pub name: String,
    /// Item description
    pub description: String,
    /// Asset kind
    pub asset_kind: AssetKind,
    /// Inventory type
    pub inventory_type: InventoryType,
    /// Wearable slot for clothing and body parts
    pub wearable: Option<WearableType>,
    /// Asset the item should point at; nil when created empty
    pub asset_id: Uuid,
    /// Next-owner permissions
    pub permissions: PermissionMask,
}

/// Upload new content into an existing item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemUpload {
    /// Correlation id echoed in the reply
    pub transaction: Uuid,
    /// Item receiving the content
    pub item: Uuid,
    /// Content bytes
    pub data: Vec<u8>,
}

/// Requests the session can make of the grid.
pub trait Grid: Send + Sync {
    /// Hub replies and updates are published on.
    fn events(&self) -> &Arc<EventHub>;

    /// Asks for the money balance. Reply: [`GridEvent::BalanceReply`].
    fn request_balance(&self);

    /// Asks for current group memberships. Reply: [`GridEvent::CurrentGroups`].
    fn request_current_groups(&self);

    /// Leaves a group. Reply: [`GridEvent::GroupLeaveReply`].
    fn leave_group(&self, group: Uuid);

    /// Downloads every parcel of a region.
    /// Reply: [`GridEvent::SimParcelsDownloaded`].
    fn request_all_sim_parcels(&self, region: RegionHandle);

    /// Asks which parcel covers a point. Reply: [`GridEvent::ParcelProperties`].
    fn request_parcel_properties(&self, query: Uuid, region: RegionHandle, position: Vector3);

    /// Takes an object back into inventory. No reply.
    fn request_derez(
        &self,
        local_id: u32,
        destination: DerezDestination,
        folder: Uuid,
        transaction: Uuid,
    );

    /// Rezzes an item. No reply beyond the resulting object update.
    fn request_rez(&self, request: RezRequest);

    /// Creates an item holding `data`. Reply: [`GridEvent::ItemCreatedFromAsset`].
    fn create_item_from_asset(&self, request: CreateItemRequest, data: Vec<u8>);

    /// Creates an item. Reply: [`GridEvent::ItemCreated`].
    fn create_item(&self, request: CreateItemRequest);

    /// Stores asset bytes and returns the new asset id; nil on failure.
    fn upload_asset(&self, kind: AssetKind, data: &[u8]) -> Uuid;

    /// Uploads a notecard body. Reply: [`GridEvent::AssetUploaded`].
    fn upload_notecard(&self, upload: ItemUpload);

    /// Uploads a gesture body. Reply: [`GridEvent::AssetUploaded`].
    fn upload_gesture(&self, upload: ItemUpload);

    /// Uploads and compiles script source. Reply: [`GridEvent::ScriptUpdated`].
    fn update_script(&self, upload: ItemUpload, mono: bool);

    /// Invites an agent to teleport to us. No reply.
    fn send_teleport_lure(&self, agent: Uuid, message: &str);

    /// Rescales a primitive. No reply beyond the resulting object update.
    fn set_scale(&self, region: RegionHandle, local_id: u32, scale: Vector3, uniform: bool);

    /// Reshapes a primitive. No reply beyond the resulting object update.
    fn set_shape(&self, region: RegionHandle, local_id: u32, shape: ShapeData);

    /// Stops an animation playing on the agent. No reply.
    fn stop_animation(&self, animation: Uuid);

    /// Replaces the worn outfit. No reply.
    fn replace_outfit(&self, items: &[Uuid]);

    /// Asks the grid to rebake the agent's appearance. No reply.
    fn request_rebake(&self);

    /// Searches the directory for an agent by name.
    /// Reply: [`GridEvent::AgentSearchReply`].
    fn search_agent(&self, query: Uuid, first_name: &str, last_name: &str);

    /// Asks for object names. Reply: [`GridEvent::ObjectProperties`].
    fn request_object_properties(&self, query: Uuid, region: RegionHandle, local_ids: &[u32]);

    /// Accepts or declines an inventory offer. No reply.
    fn respond_to_offer(&self, offer: &InventoryOffer, accept: bool, folder: Uuid);
}
