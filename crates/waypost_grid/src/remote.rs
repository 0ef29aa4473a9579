//! # Remote World
//!
//! What the grid knows that the session has to ask for: balance, groups,
//! parcels, the agent directory, object names and stored assets. Tests
//! seed it directly.

use std::collections::{HashMap, HashSet};
use waypost_core::grid::AgentMatch;
use waypost_core::session::{GroupMembership, Parcel};
use waypost_core::{AssetKind, RegionHandle, Uuid, Vector3};

/// Server-side state of the simulated grid.
#[derive(Clone, Debug, Default)]
pub struct RemoteWorld {
    /// Money balance
    pub balance: i64,
    /// Price of a charged upload
    pub upload_cost: i64,
    /// Groups the agent belongs to
    pub groups: Vec<GroupMembership>,
    /// Groups the grid refuses to let the agent leave
    pub sticky_groups: HashSet<Uuid>,
    /// Parcels per region
    pub parcels: HashMap<RegionHandle, Vec<Parcel>>,
    /// Searchable agents
    pub directory: Vec<AgentMatch>,
    /// Object names by region and local id
    pub object_names: HashMap<(RegionHandle, u32), String>,
    /// Compiler errors every script upload fails with, when set
    pub script_errors: Option<Vec<String>>,
    /// Reject every asset upload
    pub reject_uploads: bool,
    /// Stored asset bytes
    pub assets: HashMap<Uuid, (AssetKind, Vec<u8>)>,
}

impl RemoteWorld {
    /// Stores asset bytes and returns their id; nil when uploads are
    /// rejected.
    pub fn store_asset(&mut self, kind: AssetKind, data: &[u8]) -> Uuid {
        if self.reject_uploads {
            return Uuid::nil();
        }
        let id = Uuid::new_v4();
        self.assets.insert(id, (kind, data.to_vec()));
        id
    }

    /// Whether uploading `kind` costs money.
    #[must_use]
    pub fn is_charged(kind: AssetKind) -> bool {
        matches!(kind, AssetKind::Texture | AssetKind::Animation)
    }

    /// Parcel covering `position`.
    #[must_use]
    pub fn parcel_at(&self, region: RegionHandle, position: Vector3) -> Option<Parcel> {
        self.parcels
            .get(&region)?
            .iter()
            .find(|p| p.contains(position))
            .cloned()
    }

    /// Directory matches for a name, case-insensitive.
    #[must_use]
    pub fn search(&self, first: &str, last: &str) -> Vec<AgentMatch> {
        self.directory
            .iter()
            .filter(|a| {
                a.first_name.eq_ignore_ascii_case(first) && a.last_name.eq_ignore_ascii_case(last)
            })
            .cloned()
            .collect()
    }

    /// Leaves a group. Fails for groups the agent is not in or cannot
    /// leave.
    pub fn leave(&mut self, group: Uuid) -> bool {
        if self.sticky_groups.contains(&group) {
            return false;
        }
        let before = self.groups.len();
        self.groups.retain(|g| g.id != group);
        self.groups.len() != before
    }
}
