//! # Grid Events
//!
//! Everything the grid pushes at the session: replies to requests, world
//! updates and unsolicited messages.

use crate::session::inventory::InventoryItem;
use crate::session::world::{GroupMembership, Parcel, Primitive, Simulator};
use crate::types::{AssetKind, RegionHandle, Vector3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An inventory offer from another agent or object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryOffer {
    /// Session id of the offer; the correlation id for replies
    pub session: Uuid,
    /// Name of the sender
    pub from_name: String,
    /// Id of the sender
    pub from_agent: Uuid,
    /// Offered item or folder id
    pub object: Uuid,
    /// Display name of what is offered
    pub item_name: String,
    /// Asset kind of what is offered
    pub asset_kind: AssetKind,
    /// Accompanying message
    pub message: String,
}

/// Who produced a chat line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatSource {
    /// The grid itself
    System,
    /// An avatar
    Agent,
    /// A scripted object
    Object,
}

/// Whether the agent could hear a chat line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatAudible {
    /// Out of range
    Not,
    /// Heard but unintelligible
    Barely,
    /// Heard
    Fully,
}

/// Loudness of a chat line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatVolume {
    /// Whisper, 10m
    Whisper,
    /// Normal, 20m
    Normal,
    /// Shout, 100m
    Shout,
    /// Region-wide owner say
    OwnerSay,
}

/// A line of local chat.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Speaker name
    pub from_name: String,
    /// Message text
    pub message: String,
    /// Owner of the speaker
    pub owner: Uuid,
    /// Speaker id
    pub source: Uuid,
    /// Speaker position
    pub position: Vector3,
    /// Kind of speaker
    pub source_type: ChatSource,
    /// Audibility
    pub audible: ChatAudible,
    /// Loudness
    pub volume: ChatVolume,
}

/// One match of a directory search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMatch {
    /// Agent id
    pub id: Uuid,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
}

/// Events delivered by the grid.
#[derive(Clone, Debug, PartialEq)]
pub enum GridEvent {
    /// Money balance reply.
    BalanceReply {
        /// Current balance
        balance: i64,
    },
    /// Current group memberships.
    CurrentGroups {
        /// Every group the agent is in
        groups: Vec<GroupMembership>,
    },
    /// Outcome of leaving a group.
    GroupLeaveReply {
        /// Group left
        group: Uuid,
        /// Whether the grid accepted the request
        success: bool,
    },
    /// Properties of the parcel at a queried point.
    ParcelProperties {
        /// Query id echoed from the request
        query: Uuid,
        /// Region queried
        region: RegionHandle,
        /// The parcel, if one covers the point
        parcel: Option<Parcel>,
    },
    /// Every parcel of a region has arrived.
    SimParcelsDownloaded {
        /// Region
        region: RegionHandle,
        /// Its parcels
        parcels: Vec<Parcel>,
    },
    /// Item created from uploaded asset bytes.
    ItemCreatedFromAsset {
        /// Transaction id echoed from the request
        transaction: Uuid,
        /// Whether the item exists
        success: bool,
        /// Grid status text
        status: String,
        /// The new item
        item: Option<InventoryItem>,
    },
    /// Item created without content.
    ItemCreated {
        /// Transaction id echoed from the request
        transaction: Uuid,
        /// Whether the item exists
        success: bool,
        /// The new item
        item: Option<InventoryItem>,
    },
    /// Notecard or gesture body uploaded into an existing item.
    AssetUploaded {
        /// Transaction id echoed from the request
        transaction: Uuid,
        /// Whether the upload succeeded
        success: bool,
        /// Item updated
        item_id: Uuid,
        /// New asset id
        asset_id: Uuid,
    },
    /// Script source uploaded and compiled.
    ScriptUpdated {
        /// Transaction id echoed from the request
        transaction: Uuid,
        /// Whether the upload succeeded
        success: bool,
        /// Whether compilation succeeded
        compiled: bool,
        /// Compiler messages
        messages: Vec<String>,
        /// Item updated
        item_id: Uuid,
        /// New asset id
        asset_id: Uuid,
    },
    /// Directory search results.
    AgentSearchReply {
        /// Query id echoed from the request
        query: Uuid,
        /// Matching agents
        matches: Vec<AgentMatch>,
    },
    /// Object names for a properties request.
    ObjectProperties {
        /// Query id echoed from the request
        query: Uuid,
        /// Region of the objects
        region: RegionHandle,
        /// `(local id, name)` pairs
        names: Vec<(u32, String)>,
    },
    /// A primitive appeared or changed.
    ObjectUpdate {
        /// The primitive's new state
        primitive: Primitive,
    },
    /// A primitive went away.
    ObjectKilled {
        /// Region
        region: RegionHandle,
        /// Region-local id
        local_id: u32,
    },
    /// Someone offered us inventory.
    InventoryOffered {
        /// The offer
        offer: InventoryOffer,
    },
    /// Local chat.
    Chat(ChatEvent),
    /// A simulator connection was established.
    SimulatorConnected {
        /// The simulator
        simulator: Simulator,
        /// Whether the agent is now in this region
        current: bool,
    },
}

/// Discriminant of a [`GridEvent`], used for subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum EventKind {
    BalanceReply,
    CurrentGroups,
    GroupLeaveReply,
    ParcelProperties,
    SimParcelsDownloaded,
    ItemCreatedFromAsset,
    ItemCreated,
    AssetUploaded,
    ScriptUpdated,
    AgentSearchReply,
    ObjectProperties,
    ObjectUpdate,
    ObjectKilled,
    InventoryOffered,
    Chat,
    SimulatorConnected,
}

impl GridEvent {
    /// The event's kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::BalanceReply { .. } => EventKind::BalanceReply,
            Self::CurrentGroups { .. } => EventKind::CurrentGroups,
            Self::GroupLeaveReply { .. } => EventKind::GroupLeaveReply,
            Self::ParcelProperties { .. } => EventKind::ParcelProperties,
            Self::SimParcelsDownloaded { .. } => EventKind::SimParcelsDownloaded,
            Self::ItemCreatedFromAsset { .. } => EventKind::ItemCreatedFromAsset,
            Self::ItemCreated { .. } => EventKind::ItemCreated,
            Self::AssetUploaded { .. } => EventKind::AssetUploaded,
            Self::ScriptUpdated { .. } => EventKind::ScriptUpdated,
            Self::AgentSearchReply { .. } => EventKind::AgentSearchReply,
            Self::ObjectProperties { .. } => EventKind::ObjectProperties,
            Self::ObjectUpdate { .. } => EventKind::ObjectUpdate,
            Self::ObjectKilled { .. } => EventKind::ObjectKilled,
            Self::InventoryOffered { .. } => EventKind::InventoryOffered,
            Self::Chat(_) => EventKind::Chat,
            Self::SimulatorConnected { .. } => EventKind::SimulatorConnected,
        }
    }
}
