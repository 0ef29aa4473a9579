//! # Resource Locator
//!
//! Resolves references given by callers into entities held in the session
//! store.
//!
//! ## Resolution order
//!
//! 1. Identifier: parse as a UUID and look it up directly.
//! 2. Pattern: compile the reference as a case-insensitive regular
//!    expression and take the first unanchored match in traversal order.
//! 3. Literal: take the first case-insensitive equal name.
//!
//! Stage 3 runs whenever stage 2 finds nothing, whether or not the
//! reference compiled. A reference with an unescaped `/` is an inventory
//! path instead, resolved segment by segment from the root, and never
//! falls back to name matching.
//!
//! Every lookup runs under the owning partition's lock and returns an owned
//! copy of what it found.

mod reference;

pub use reference::{escape_segment, Reference};

use crate::error::{EntityKind, LocateError, LocateResult};
use crate::grid::{AgentMatch, EventKind, Grid, GridEvent};
use crate::session::{
    GroupMembership, InventoryFolder, InventoryItem, InventoryNode, Parcel, Primitive,
    SessionStore, Simulator,
};
use crate::sync::Bridge;
use crate::types::{RegionHandle, Vector3};
use regex::RegexBuilder;
use std::time::Duration;
use uuid::Uuid;

/// Returns the value of the first candidate whose name matches
/// `reference`, by pattern first and literal equality second.
pub fn first_match<'n, T, I>(reference: &str, candidates: I) -> Option<T>
where
    I: IntoIterator<Item = (&'n str, T)>,
    T: Clone,
{
    let candidates: Vec<(&str, T)> = candidates.into_iter().collect();

    if let Ok(pattern) = RegexBuilder::new(reference).case_insensitive(true).build() {
        if let Some((_, value)) = candidates.iter().find(|(name, _)| pattern.is_match(name)) {
            return Some(value.clone());
        }
    }

    let wanted = reference.to_lowercase();
    candidates
        .into_iter()
        .find(|(name, _)| name.to_lowercase() == wanted)
        .map(|(_, value)| value)
}

/// How an agent is identified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentReference<'a> {
    /// By id
    Id(Uuid),
    /// By first and last name
    Name {
        /// First name
        first: &'a str,
        /// Last name
        last: &'a str,
    },
}

/// Reference resolution over one session.
#[derive(Clone, Copy)]
pub struct Locator<'a> {
    store: &'a SessionStore,
    grid: &'a dyn Grid,
    bridge: &'a Bridge,
    data_timeout: Duration,
}

impl<'a> Locator<'a> {
    /// Creates a locator. `data_timeout` bounds the bridged lookups
    /// (object names, directory search, parcel queries).
    #[must_use]
    pub fn new(
        store: &'a SessionStore,
        grid: &'a dyn Grid,
        bridge: &'a Bridge,
        data_timeout: Duration,
    ) -> Self {
        Self {
            store,
            grid,
            bridge,
            data_timeout,
        }
    }

    /// Resolves an inventory reference to any node.
    pub fn find_node(&self, reference: &str, kind: EntityKind) -> LocateResult<InventoryNode> {
        let not_found = || LocateError::not_found(kind, reference);
        let parsed = Reference::parse(reference);

        self.store.inventory.read(|inv| {
            let id = match &parsed {
                Reference::Id(id) => Some(*id),
                Reference::Path(segments) => {
                    segments.iter().try_fold(inv.root(), |parent, segment| {
                        inv.children(parent).iter().copied().find(|child| {
                            inv.get(*child)
                                .is_some_and(|node| node.name() == segment.as_str())
                        })
                    })
                }
                Reference::Name(name) => {
                    first_match(name, inv.walk().map(|node| (node.name(), node.id())))
                }
            };
            id.and_then(|id| inv.get(id).cloned()).ok_or_else(not_found)
        })
    }

    /// Resolves a folder. Hitting an item is a miss.
    pub fn find_folder(&self, reference: &str) -> LocateResult<InventoryFolder> {
        match self.find_node(reference, EntityKind::Folder)? {
            InventoryNode::Folder(folder) => Ok(folder),
            InventoryNode::Item(_) => Err(LocateError::not_found(EntityKind::Folder, reference)),
        }
    }

    /// Resolves an item. Hitting a folder is a miss.
    pub fn find_item(&self, reference: &str) -> LocateResult<InventoryItem> {
        match self.find_node(reference, EntityKind::Item)? {
            InventoryNode::Item(item) => Ok(item),
            InventoryNode::Folder(_) => Err(LocateError::not_found(EntityKind::Item, reference)),
        }
    }

    /// Resolves a primitive within `range` metres of the agent.
    ///
    /// When nothing matches by name and some in-range primitives have no
    /// name yet, their properties are requested once and the scan repeated.
    pub fn find_primitive(&self, reference: &str, range: f32) -> LocateResult<Primitive> {
        let origin = self.store.agent.read(|agent| agent.position);
        let in_range = || -> Vec<Primitive> {
            self.store.objects.read(|objects| {
                objects
                    .primitives
                    .iter()
                    .filter(|p| p.position.distance(origin) <= range)
                    .cloned()
                    .collect()
            })
        };

        if let Ok(id) = reference.trim().parse::<Uuid>() {
            return in_range()
                .into_iter()
                .find(|p| p.id == id)
                .ok_or_else(|| LocateError::not_found(EntityKind::Primitive, reference));
        }

        let candidates = in_range();
        if let Some(found) = match_primitive(reference, &candidates) {
            return Ok(found);
        }

        let unnamed: Vec<&Primitive> = candidates.iter().filter(|p| p.name.is_none()).collect();
        if let Some(first) = unnamed.first() {
            let region = first.region;
            let local_ids: Vec<u32> = unnamed
                .iter()
                .filter(|p| p.region == region)
                .map(|p| p.local_id)
                .collect();
            self.request_object_names(region, &local_ids);
            if let Some(found) = match_primitive(reference, &in_range()) {
                return Ok(found);
            }
        }

        Err(LocateError::not_found(EntityKind::Primitive, reference))
    }

    fn request_object_names(&self, region: RegionHandle, local_ids: &[u32]) {
        let query = Uuid::new_v4();
        let outcome = self.bridge.call(
            &format!("objectproperties:{query}"),
            EventKind::ObjectProperties,
            self.data_timeout,
            move |event| match event {
                GridEvent::ObjectProperties { query: q, .. } if *q == query => Some(()),
                _ => None,
            },
            || {
                self.grid.request_object_properties(query, region, local_ids);
                None
            },
        );
        if let Err(error) = outcome {
            tracing::debug!(%error, "object names unavailable");
        }
    }

    /// Resolves a simulator by name; an empty reference is the current one.
    pub fn find_simulator(&self, reference: &str) -> LocateResult<Simulator> {
        let wanted = reference.trim();
        self.store
            .network
            .read(|network| {
                if wanted.is_empty() {
                    network.current().cloned()
                } else {
                    let wanted = wanted.to_lowercase();
                    network
                        .simulators
                        .iter()
                        .find(|s| s.name.to_lowercase() == wanted)
                        .cloned()
                }
            })
            .ok_or_else(|| LocateError::not_found(EntityKind::Simulator, reference))
    }

    /// The simulator a primitive lives in.
    pub fn simulator_for(&self, region: RegionHandle) -> LocateResult<Simulator> {
        self.store
            .network
            .read(|network| network.by_handle(region).cloned())
            .ok_or_else(|| LocateError::not_found(EntityKind::Simulator, region.to_string()))
    }

    /// Resolves one of the agent's groups.
    pub fn find_group(&self, reference: &str) -> LocateResult<GroupMembership> {
        self.store
            .groups
            .read(|groups| match reference.trim().parse::<Uuid>() {
                Ok(id) => groups.get(id).cloned(),
                Err(_) => first_match(
                    reference,
                    groups.memberships.iter().map(|g| (g.name.as_str(), g)),
                )
                .cloned(),
            })
            .ok_or_else(|| LocateError::not_found(EntityKind::Group, reference))
    }

    /// Resolves an agent. Names go through one directory search.
    pub fn find_agent(&self, reference: AgentReference<'_>) -> LocateResult<Uuid> {
        let (first, last) = match reference {
            AgentReference::Id(id) => return Ok(id),
            AgentReference::Name { first, last } => (first.trim(), last.trim()),
        };
        let display = format!("{first} {last}");
        let not_found = || LocateError::not_found(EntityKind::Agent, display.clone());
        if first.is_empty() || last.is_empty() {
            return Err(not_found());
        }

        let query = Uuid::new_v4();
        let matches = self
            .bridge
            .call(
                &format!("agentsearch:{query}"),
                EventKind::AgentSearchReply,
                self.data_timeout,
                move |event| match event {
                    GridEvent::AgentSearchReply { query: q, matches } if *q == query => {
                        Some(matches.clone())
                    }
                    _ => None,
                },
                || {
                    self.grid.search_agent(query, first, last);
                    None
                },
            )
            .map_err(|error| {
                tracing::debug!(%error, "agent search failed");
                not_found()
            })?;

        matches
            .iter()
            .find(|m: &&AgentMatch| {
                m.first_name.eq_ignore_ascii_case(first) && m.last_name.eq_ignore_ascii_case(last)
            })
            .map(|m| m.id)
            .ok_or_else(not_found)
    }

    /// Asks the grid which parcel covers `position`.
    pub fn find_parcel(&self, region: RegionHandle, position: Vector3) -> LocateResult<Parcel> {
        let not_found = || LocateError::not_found(EntityKind::Parcel, position.to_string());
        let query = Uuid::new_v4();
        let parcel = self
            .bridge
            .call(
                &format!("parcelproperties:{query}"),
                EventKind::ParcelProperties,
                self.data_timeout,
                move |event| match event {
                    GridEvent::ParcelProperties { query: q, parcel, .. } if *q == query => {
                        Some(parcel.clone())
                    }
                    _ => None,
                },
                || {
                    self.grid.request_parcel_properties(query, region, position);
                    None
                },
            )
            .map_err(|error| {
                tracing::debug!(%error, "parcel query failed");
                not_found()
            })?;
        parcel.ok_or_else(not_found)
    }
}

impl std::fmt::Debug for Locator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locator")
            .field("data_timeout", &self.data_timeout)
            .finish_non_exhaustive()
    }
}

fn match_primitive(reference: &str, candidates: &[Primitive]) -> Option<Primitive> {
    first_match(
        reference,
        candidates
            .iter()
            .filter_map(|p| p.name.as_deref().map(|name| (name, p))),
    )
    .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_before_literal() {
        let names = [("Blue Shirt", 1), ("Shirt", 2)];
        // "shirt" is a valid pattern and matches the first entry unanchored.
        assert_eq!(first_match("shirt", names), Some(1));
    }

    #[test]
    fn test_literal_when_pattern_does_not_compile() {
        let names = [("a(b", 1), ("c", 2)];
        assert_eq!(first_match("A(B", names), Some(1));
    }

    #[test]
    fn test_no_match() {
        let names = [("alpha", 1)];
        assert_eq!(first_match("omega", names), None);
    }
}
