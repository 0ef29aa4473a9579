//! # Session State
//!
//! The [`SessionStore`] owns every partition of session state, each behind
//! its named lock. Network threads mutate it through the [`feed`];
//! command handlers read it and issue requests.

pub mod feed;
pub mod inventory;
pub mod world;

pub use feed::SessionFeed;
pub use inventory::{InventoryFolder, InventoryItem, InventoryNode, InventoryStore};
pub use world::{
    is_builtin_animation, AgentState, Appearance, AssetCache, GroupMembership, GroupPowers,
    Groups, Network, Objects, Parcel, ParcelFlags, Parcels, Primitive, Simulator,
    BUILTIN_ANIMATIONS,
};

use crate::sync::{Domain, LockSet, NamedLock, Partition};

/// All session state, partitioned by lock domain.
#[derive(Debug)]
pub struct SessionStore {
    /// Inventory tree
    pub inventory: Partition<InventoryStore>,
    /// Worn items
    pub appearance: Partition<Appearance>,
    /// Asset cache
    pub assets: Partition<AssetCache>,
    /// Group memberships
    pub groups: Partition<Groups>,
    /// Simulators
    pub network: Partition<Network>,
    /// Primitives
    pub objects: Partition<Objects>,
    /// The agent
    pub agent: Partition<AgentState>,
    /// Parcels
    pub parcels: Partition<Parcels>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(InventoryStore::new(), AgentState::default())
    }
}

impl SessionStore {
    /// Creates a store around an existing inventory and agent.
    #[must_use]
    pub fn new(inventory: InventoryStore, agent: AgentState) -> Self {
        Self {
            inventory: Partition::new(Domain::Inventory, inventory),
            appearance: Partition::new(Domain::Appearance, Appearance::default()),
            assets: Partition::new(Domain::Assets, AssetCache::default()),
            groups: Partition::new(Domain::Groups, Groups::default()),
            network: Partition::new(Domain::Network, Network::default()),
            objects: Partition::new(Domain::Objects, Objects::default()),
            agent: Partition::new(Domain::SelfAgent, agent),
            parcels: Partition::new(Domain::Parcels, Parcels::default()),
        }
    }

    /// The named lock for `domain`.
    #[must_use]
    pub fn named(&self, domain: Domain) -> &dyn NamedLock {
        match domain {
            Domain::Inventory => &self.inventory,
            Domain::Appearance => &self.appearance,
            Domain::Assets => &self.assets,
            Domain::Groups => &self.groups,
            Domain::Network => &self.network,
            Domain::Objects => &self.objects,
            Domain::SelfAgent => &self.agent,
            Domain::Parcels => &self.parcels,
        }
    }

    /// Holds several partitions at once, acquired in canonical order.
    #[must_use]
    pub fn lock(&self, domains: &[Domain]) -> LockSet<'_> {
        let locks: Vec<&dyn NamedLock> = domains.iter().map(|d| self.named(*d)).collect();
        LockSet::acquire(&locks)
    }
}
