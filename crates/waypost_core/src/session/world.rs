//! # World State Partitions
//!
//! Everything the session knows about the world outside the inventory tree.

use crate::shape::ShapeData;
use crate::types::{Quaternion, RegionHandle, Vector3};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Items currently worn by the agent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Appearance {
    /// Worn item ids, in wear order
    pub worn: Vec<Uuid>,
}

/// Asset bytes fetched or uploaded during the session.
#[derive(Clone, Debug, Default)]
pub struct AssetCache {
    entries: HashMap<Uuid, Vec<u8>>,
}

impl AssetCache {
    /// Stores asset bytes, replacing any previous copy.
    pub fn store(&mut self, id: Uuid, data: Vec<u8>) {
        self.entries.insert(id, data);
    }

    /// Cached bytes for `id`.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&[u8]> {
        self.entries.get(&id).map(Vec::as_slice)
    }

    /// Whether `id` is cached.
    #[must_use]
    pub fn contains(&self, id: Uuid) -> bool {
        self.entries.contains_key(&id)
    }
}

bitflags! {
    /// Powers a group role grants its members.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct GroupPowers: u64 {
        /// Invite new members
        const INVITE = 1 << 1;
        /// Eject members
        const EJECT = 1 << 2;
        /// Rez objects on group land
        const ALLOW_REZ = 1 << 25;
        /// Send group notices
        const SEND_NOTICES = 1 << 42;
    }
}

/// A group the agent belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    /// Group id
    pub id: Uuid,
    /// Group name
    pub name: String,
    /// Powers held in this group
    pub powers: GroupPowers,
}

/// Current group memberships.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Groups {
    /// Memberships, as last reported by the grid
    pub memberships: Vec<GroupMembership>,
}

impl Groups {
    /// Membership by group id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&GroupMembership> {
        self.memberships.iter().find(|g| g.id == id)
    }
}

/// Side length of a region in metres.
pub const REGION_SIZE: usize = 256;

/// A connected simulator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Simulator {
    /// Region name
    pub name: String,
    /// Region handle
    pub handle: RegionHandle,
    /// Whether the agent manages the region's estate
    pub estate_manager: bool,
    /// Row-major `REGION_SIZE` x `REGION_SIZE` height map, when downloaded
    pub terrain: Option<Vec<f32>>,
    /// Whether every parcel of the region is known
    pub parcel_map_complete: bool,
}

impl Simulator {
    /// Creates a simulator with no terrain and no parcels.
    #[must_use]
    pub fn new(name: impl Into<String>, handle: RegionHandle) -> Self {
        Self {
            name: name.into(),
            handle,
            estate_manager: false,
            terrain: None,
            parcel_map_complete: false,
        }
    }

    /// Terrain height at a region-local point, if known.
    #[must_use]
    pub fn terrain_height(&self, x: usize, y: usize) -> Option<f32> {
        if x >= REGION_SIZE || y >= REGION_SIZE {
            return None;
        }
        self.terrain
            .as_ref()
            .and_then(|map| map.get(y * REGION_SIZE + x).copied())
    }
}

/// Connected simulators.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Network {
    /// All connected simulators
    pub simulators: Vec<Simulator>,
    /// Handle of the region the agent is in
    pub current: Option<RegionHandle>,
}

impl Network {
    /// Simulator by handle.
    #[must_use]
    pub fn by_handle(&self, handle: RegionHandle) -> Option<&Simulator> {
        self.simulators.iter().find(|s| s.handle == handle)
    }

    /// Mutable simulator by handle.
    pub fn by_handle_mut(&mut self, handle: RegionHandle) -> Option<&mut Simulator> {
        self.simulators.iter_mut().find(|s| s.handle == handle)
    }

    /// The simulator the agent is in.
    #[must_use]
    pub fn current(&self) -> Option<&Simulator> {
        self.current.and_then(|handle| self.by_handle(handle))
    }

    /// Adds or replaces a simulator.
    pub fn upsert(&mut self, simulator: Simulator) {
        match self.by_handle_mut(simulator.handle) {
            Some(existing) => *existing = simulator,
            None => self.simulators.push(simulator),
        }
    }
}

/// An in-world primitive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    /// Object id
    pub id: Uuid,
    /// Region-local id
    pub local_id: u32,
    /// Region the object is in
    pub region: RegionHandle,
    /// Name, once object properties have arrived
    pub name: Option<String>,
    /// Position
    pub position: Vector3,
    /// Rotation
    pub rotation: Quaternion,
    /// Scale
    pub scale: Vector3,
    /// Construction parameters
    pub shape: ShapeData,
}

/// Known primitives.
#[derive(Clone, Debug, Default)]
pub struct Objects {
    /// Primitives in arrival order
    pub primitives: Vec<Primitive>,
}

impl Objects {
    /// Adds or replaces a primitive, keyed by region and local id.
    pub fn upsert(&mut self, primitive: Primitive) {
        match self
            .primitives
            .iter_mut()
            .find(|p| p.region == primitive.region && p.local_id == primitive.local_id)
        {
            Some(existing) => {
                // Updates do not carry names; keep the one we have.
                let name = existing.name.take();
                *existing = primitive;
                if existing.name.is_none() {
                    existing.name = name;
                }
            }
            None => self.primitives.push(primitive),
        }
    }

    /// Drops a primitive.
    pub fn remove(&mut self, region: RegionHandle, local_id: u32) {
        self.primitives
            .retain(|p| !(p.region == region && p.local_id == local_id));
    }

    /// Mutable primitive by region and local id.
    pub fn get_mut(&mut self, region: RegionHandle, local_id: u32) -> Option<&mut Primitive> {
        self.primitives
            .iter_mut()
            .find(|p| p.region == region && p.local_id == local_id)
    }
}

/// The agent's own state.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentState {
    /// Agent id
    pub id: Uuid,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Region-local position
    pub position: Vector3,
    /// Last known money balance
    pub balance: i64,
    /// Animations currently playing on the agent
    pub animations: Vec<Uuid>,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: String::new(),
            last_name: String::new(),
            position: Vector3::ZERO,
            balance: 0,
            animations: Vec::new(),
        }
    }
}

impl AgentState {
    /// Removes and returns the playing animations that are not built in.
    pub fn take_custom_animations(&mut self) -> Vec<Uuid> {
        let (builtin, custom): (Vec<Uuid>, Vec<Uuid>) = std::mem::take(&mut self.animations)
            .into_iter()
            .partition(|id| is_builtin_animation(*id));
        self.animations = builtin;
        custom
    }
}

/// Animations every agent has without an inventory item.
pub const BUILTIN_ANIMATIONS: &[(&str, Uuid)] = &[
    ("away", Uuid::from_u128(0xfd03_7134_85d4_f241_72c6_4f42_164f_edee)),
    ("busy", Uuid::from_u128(0xefcf_670c_2d18_8128_973a_034e_bc80_6b67)),
    ("crouch", Uuid::from_u128(0x201f_3fdf_cb1f_dbec_201f_7333_e328_ae7c)),
    ("falldown", Uuid::from_u128(0x6663_07d9_a860_572d_6fd4_c3ab_8865_c094)),
    ("fly", Uuid::from_u128(0xaec4_610c_757f_bc4e_c092_c6e9_caf1_8daf)),
    ("hover", Uuid::from_u128(0x4ae8_016b_31b9_03bb_c401_b1ea_941d_b41d)),
    ("jump", Uuid::from_u128(0x2305_bd75_1ca9_b03b_1faa_b176_b8a8_c49e)),
    ("land", Uuid::from_u128(0x7a17_b059_12b2_41b1_570a_1863_68b6_aa6f)),
    ("prejump", Uuid::from_u128(0x7a4e_87fe_de39_6fcb_6223_024b_0089_3244)),
    ("run", Uuid::from_u128(0x05dd_bff8_aaa9_92a1_2b74_8fe7_7a29_b445)),
    ("sit", Uuid::from_u128(0x1a5f_e8ac_a804_8a5d_7cbd_56bd_8318_4568)),
    ("sit_ground", Uuid::from_u128(0x1c76_00d6_661f_b87b_efe2_d742_1eb9_3c86)),
    ("stand", Uuid::from_u128(0x2408_fe9e_df1d_1d7d_f4ff_1384_fa7b_350f)),
    ("stand_1", Uuid::from_u128(0x1546_8e00_3400_bb66_cecc_646d_7c14_458e)),
    ("stand_2", Uuid::from_u128(0x370f_3a20_6ca6_9971_848c_9a01_bc42_ae3c)),
    ("stand_3", Uuid::from_u128(0x42b4_6214_4b44_79ae_deb8_0df6_1424_ff4b)),
    ("stand_4", Uuid::from_u128(0xf22f_ed8b_a5ed_2c93_64d5_bdd8_b93c_889f)),
    ("turnleft", Uuid::from_u128(0x56e0_ba0d_4a9f_7f27_6117_32f2_ebbf_6135)),
    ("turnright", Uuid::from_u128(0x2d6d_aa51_3192_6794_8e2e_a15f_8338_ec30)),
    ("type", Uuid::from_u128(0xc541_c47f_e0c0_058b_ad1a_d6ae_3a45_84d9)),
    ("walk", Uuid::from_u128(0x6ed2_4bd8_91aa_4b12_ccc7_c97c_857a_b4e0)),
];

/// Whether `id` is one of [`BUILTIN_ANIMATIONS`].
#[must_use]
pub fn is_builtin_animation(id: Uuid) -> bool {
    BUILTIN_ANIMATIONS.iter().any(|(_, builtin)| *builtin == id)
}

bitflags! {
    /// Parcel options relevant to object creation.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ParcelFlags: u32 {
        /// Anyone may create objects
        const CREATE_OBJECTS = 1 << 6;
        /// Group members may create objects
        const CREATE_GROUP_OBJECTS = 1 << 26;
    }
}

/// A land parcel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    /// Region-local parcel id
    pub local_id: i32,
    /// Parcel name
    pub name: String,
    /// Owner id (a group id when group owned)
    pub owner: Uuid,
    /// Group set on the parcel
    pub group: Uuid,
    /// Deeded to the group
    pub group_owned: bool,
    /// Parcel flags
    pub flags: ParcelFlags,
    /// South-west corner, inclusive
    pub min: (f32, f32),
    /// North-east corner, exclusive
    pub max: (f32, f32),
}

impl Parcel {
    /// Whether the parcel covers a region-local point.
    #[must_use]
    pub fn contains(&self, position: Vector3) -> bool {
        position.x >= self.min.0
            && position.x < self.max.0
            && position.y >= self.min.1
            && position.y < self.max.1
    }
}

/// Known parcels per region.
#[derive(Clone, Debug, Default)]
pub struct Parcels {
    by_region: HashMap<RegionHandle, Vec<Parcel>>,
}

impl Parcels {
    /// Adds or replaces a parcel.
    pub fn upsert(&mut self, region: RegionHandle, parcel: Parcel) {
        let parcels = self.by_region.entry(region).or_default();
        match parcels.iter_mut().find(|p| p.local_id == parcel.local_id) {
            Some(existing) => *existing = parcel,
            None => parcels.push(parcel),
        }
    }

    /// Parcels of a region.
    #[must_use]
    pub fn region(&self, region: RegionHandle) -> &[Parcel] {
        self.by_region.get(&region).map_or(&[], Vec::as_slice)
    }

    /// Parcel covering `position` in `region`.
    #[must_use]
    pub fn at(&self, region: RegionHandle, position: Vector3) -> Option<&Parcel> {
        self.region(region).iter().find(|p| p.contains(position))
    }
}
