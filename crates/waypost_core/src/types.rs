//! # Shared Value Types
//!
//! Vectors, rotations, region handles and the closed enumerations that
//! command parameters resolve into.
//!
//! Every enumeration here is resolved from its wire name through a static
//! table built at compile time; there is no runtime scan of variant names.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use uuid::Uuid;

/// 3D vector - positions, scales, region-local coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vector3 {
    /// Creates a new vector
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Distance to another point
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}, {}>", self.x, self.y, self.z)
    }
}

/// Error returned when a vector or rotation literal is malformed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("malformed vector literal: {0}")]
pub struct ParseVectorError(pub String);

/// Splits `<a, b, c>` (angle brackets optional) into its numeric components.
fn parse_components<const N: usize>(s: &str) -> Result<[f32; N], ParseVectorError> {
    let inner = s
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>');
    let mut out = [0.0f32; N];
    let mut parts = inner.split(',');
    for slot in &mut out {
        let part = parts.next().ok_or_else(|| ParseVectorError(s.to_string()))?;
        *slot = part
            .trim()
            .parse::<f32>()
            .map_err(|_| ParseVectorError(s.to_string()))?;
    }
    if parts.next().is_some() {
        return Err(ParseVectorError(s.to_string()));
    }
    Ok(out)
}

impl FromStr for Vector3 {
    type Err = ParseVectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, y, z] = parse_components::<3>(s)?;
        Ok(Self::new(x, y, z))
    }
}

/// Quaternion for rotations
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
    /// W component
    pub w: f32,
}

impl Quaternion {
    /// Creates a new quaternion
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Identity rotation
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl FromStr for Quaternion {
    type Err = ParseVectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, y, z, w] = parse_components::<4>(s)?;
        Ok(Self::new(x, y, z, w))
    }
}

/// Grid-wide handle of a region (simulator).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionHandle(pub u64);

impl fmt::Display for RegionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Looks up `name` case-insensitively in a static name table.
fn lookup<T: Copy>(table: &[(&'static str, T)], name: &str) -> Option<T> {
    let name = name.trim();
    table
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, value)| *value)
}

/// Asset kinds known to the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    /// Image
    Texture,
    /// Sound clip
    Sound,
    /// Calling card
    CallingCard,
    /// Landmark
    Landmark,
    /// Clothing layer
    Clothing,
    /// Rezzable object
    Object,
    /// Notecard
    Notecard,
    /// Inventory folder
    Folder,
    /// Script source
    LslText,
    /// Body part (shape, skin, hair, eyes)
    Bodypart,
    /// Animation
    Animation,
    /// Gesture
    Gesture,
    /// Inventory link to an item
    Link,
    /// Current outfit container
    CurrentOutfit,
    /// Trash container
    Trash,
}

impl AssetKind {
    const NAMES: &'static [(&'static str, Self)] = &[
        ("texture", Self::Texture),
        ("sound", Self::Sound),
        ("callingcard", Self::CallingCard),
        ("landmark", Self::Landmark),
        ("clothing", Self::Clothing),
        ("object", Self::Object),
        ("notecard", Self::Notecard),
        ("folder", Self::Folder),
        ("lsltext", Self::LslText),
        ("bodypart", Self::Bodypart),
        ("animation", Self::Animation),
        ("gesture", Self::Gesture),
        ("link", Self::Link),
        ("currentoutfit", Self::CurrentOutfit),
        ("trash", Self::Trash),
    ];

    /// Resolves a wire name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        lookup(Self::NAMES, name)
    }

    /// Returns the wire name.
    #[must_use]
    pub fn name(self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(_, kind)| *kind == self)
            .map_or("unknown", |(name, _)| *name)
    }

    /// Inventory type an item of this asset kind is created with.
    #[must_use]
    pub const fn inventory_type(self) -> InventoryType {
        match self {
            Self::Texture => InventoryType::Texture,
            Self::Sound => InventoryType::Sound,
            Self::CallingCard => InventoryType::CallingCard,
            Self::Landmark => InventoryType::Landmark,
            Self::Clothing | Self::Bodypart => InventoryType::Wearable,
            Self::Object => InventoryType::Object,
            Self::Notecard => InventoryType::Notecard,
            Self::LslText => InventoryType::Lsl,
            Self::Animation => InventoryType::Animation,
            Self::Gesture => InventoryType::Gesture,
            Self::Folder | Self::CurrentOutfit | Self::Trash | Self::Link => {
                InventoryType::Folder
            }
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inventory types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryType {
    /// Image
    Texture,
    /// Sound clip
    Sound,
    /// Calling card
    CallingCard,
    /// Landmark
    Landmark,
    /// Rezzable object
    Object,
    /// Notecard
    Notecard,
    /// Folder
    Folder,
    /// Script
    Lsl,
    /// Clothing or body part
    Wearable,
    /// Animation
    Animation,
    /// Gesture
    Gesture,
    /// Worn attachment
    Attachment,
}

/// Wearable slot types for clothing and body parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WearableType {
    /// Body shape
    Shape,
    /// Skin
    Skin,
    /// Hair
    Hair,
    /// Eyes
    Eyes,
    /// Shirt
    Shirt,
    /// Pants
    Pants,
    /// Shoes
    Shoes,
    /// Socks
    Socks,
    /// Jacket
    Jacket,
    /// Gloves
    Gloves,
    /// Undershirt
    Undershirt,
    /// Underpants
    Underpants,
    /// Skirt
    Skirt,
    /// Alpha mask
    Alpha,
    /// Tattoo layer
    Tattoo,
    /// Physics
    Physics,
}

impl WearableType {
    const NAMES: &'static [(&'static str, Self)] = &[
        ("shape", Self::Shape),
        ("skin", Self::Skin),
        ("hair", Self::Hair),
        ("eyes", Self::Eyes),
        ("shirt", Self::Shirt),
        ("pants", Self::Pants),
        ("shoes", Self::Shoes),
        ("socks", Self::Socks),
        ("jacket", Self::Jacket),
        ("gloves", Self::Gloves),
        ("undershirt", Self::Undershirt),
        ("underpants", Self::Underpants),
        ("skirt", Self::Skirt),
        ("alpha", Self::Alpha),
        ("tattoo", Self::Tattoo),
        ("physics", Self::Physics),
    ];

    /// Resolves a wire name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        lookup(Self::NAMES, name)
    }

    /// Body parts are mandatory layers; an outfit always keeps one of each.
    #[must_use]
    pub const fn is_body_part(self) -> bool {
        matches!(self, Self::Shape | Self::Skin | Self::Hair | Self::Eyes)
    }
}

bitflags! {
    /// Next-owner permission mask of an inventory item.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PermissionMask: u32 {
        /// Can transfer to another owner
        const TRANSFER = 1 << 13;
        /// Can be modified
        const MODIFY = 1 << 14;
        /// Can be copied
        const COPY = 1 << 15;
        /// Can be moved
        const MOVE = 1 << 19;
        /// Can be damaged
        const DAMAGE = 1 << 20;
        /// Everything
        const ALL = Self::TRANSFER.bits()
            | Self::MODIFY.bits()
            | Self::COPY.bits()
            | Self::MOVE.bits()
            | Self::DAMAGE.bits();
    }
}

impl PermissionMask {
    const NAMES: &'static [(&'static str, Self)] = &[
        ("none", Self::empty()),
        ("transfer", Self::TRANSFER),
        ("modify", Self::MODIFY),
        ("copy", Self::COPY),
        ("move", Self::MOVE),
        ("damage", Self::DAMAGE),
        ("all", Self::ALL),
    ];

    /// Resolves a single permission name (case-insensitive).
    #[must_use]
    pub fn named(name: &str) -> Option<Self> {
        lookup(Self::NAMES, name)
    }

    /// Combines every recognised name; unknown names are ignored.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names
            .into_iter()
            .filter_map(Self::named)
            .fold(Self::empty(), |acc, flag| acc | flag)
    }
}

/// Where a de-rezzed object goes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DerezDestination {
    /// Save back into the existing inventory item
    AgentInventorySave,
    /// Copy into inventory, leaving the object in world
    AgentInventoryCopy,
    /// Take into inventory
    #[default]
    AgentInventoryTake,
    /// Take a copy even without copy permission (god mode)
    AgentInventoryTakeCopy,
    /// Move to the trash folder
    TrashFolder,
    /// Return to the owner's lost and found
    ReturnToOwner,
    /// Delete outright
    Delete,
}

impl DerezDestination {
    const NAMES: &'static [(&'static str, Self)] = &[
        ("agentinventorysave", Self::AgentInventorySave),
        ("agentinventorycopy", Self::AgentInventoryCopy),
        ("agentinventorytake", Self::AgentInventoryTake),
        ("agentinventorytakecopy", Self::AgentInventoryTakeCopy),
        ("trashfolder", Self::TrashFolder),
        ("returntoowner", Self::ReturnToOwner),
        ("delete", Self::Delete),
    ];

    /// Resolves a wire name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        lookup(Self::NAMES, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_parse() {
        let v: Vector3 = "<1, 2.5, -3>".parse().unwrap();
        assert_eq!(v, Vector3::new(1.0, 2.5, -3.0));

        let bare: Vector3 = "4,5,6".parse().unwrap();
        assert_eq!(bare, Vector3::new(4.0, 5.0, 6.0));

        assert!("<1, 2>".parse::<Vector3>().is_err());
        assert!("<1, 2, 3, 4>".parse::<Vector3>().is_err());
        assert!("<a, b, c>".parse::<Vector3>().is_err());
    }

    #[test]
    fn test_quaternion_parse() {
        let q: Quaternion = "<0, 0, 0, 1>".parse().unwrap();
        assert_eq!(q, Quaternion::IDENTITY);
    }

    #[test]
    fn test_name_tables() {
        assert_eq!(AssetKind::from_name("Landmark"), Some(AssetKind::Landmark));
        assert_eq!(AssetKind::from_name("LSLText"), Some(AssetKind::LslText));
        assert_eq!(AssetKind::from_name("hologram"), None);
        assert_eq!(AssetKind::Landmark.name(), "landmark");

        assert_eq!(WearableType::from_name("SKIN"), Some(WearableType::Skin));
        assert!(WearableType::Skin.is_body_part());
        assert!(!WearableType::Shirt.is_body_part());

        assert_eq!(
            DerezDestination::from_name("TrashFolder"),
            Some(DerezDestination::TrashFolder)
        );
    }

    #[test]
    fn test_permission_names() {
        let mask = PermissionMask::from_names(["copy", "Transfer", "bogus", ""]);
        assert!(mask.contains(PermissionMask::COPY));
        assert!(mask.contains(PermissionMask::TRANSFER));
        assert!(!mask.contains(PermissionMask::MODIFY));
    }
}
