//! # Permission Gate
//!
//! Per-group capability masks, loaded once from configuration and read-only
//! afterwards. A caller names its group by name (case-insensitive) or by
//! uuid; a group that is not configured is denied everything.

use crate::config::GroupConfig;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

bitflags! {
    /// Capabilities a group can be granted.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capability: u32 {
        /// Move the agent, send teleport lures
        const MOVEMENT = 1 << 0;
        /// Spend and query money
        const ECONOMY = 1 << 1;
        /// Land and terrain
        const LAND = 1 << 2;
        /// Outfit and appearance
        const GROOMING = 1 << 3;
        /// Inventory and uploads
        const INVENTORY = 1 << 4;
        /// Touch and edit objects
        const INTERACT = 1 << 5;
        /// Mute lists
        const MUTE = 1 << 6;
        /// Group databases
        const DATABASE = 1 << 7;
        /// Subscribe to notifications
        const NOTIFICATIONS = 1 << 8;
        /// Chat and instant messages
        const TALK = 1 << 9;
        /// Directory searches
        const DIRECTORY = 1 << 10;
        /// Bot-level operations
        const SYSTEM = 1 << 11;
        /// Friendship management
        const FRIENDSHIP = 1 << 12;
        /// Run external processes
        const EXECUTE = 1 << 13;
        /// Group membership
        const GROUP = 1 << 14;
        /// Input and output filters
        const FILTER = 1 << 15;
        /// Scheduled commands
        const SCHEDULE = 1 << 16;
    }
}

impl Capability {
    const NAMES: &'static [(&'static str, Self)] = &[
        ("movement", Self::MOVEMENT),
        ("economy", Self::ECONOMY),
        ("land", Self::LAND),
        ("grooming", Self::GROOMING),
        ("inventory", Self::INVENTORY),
        ("interact", Self::INTERACT),
        ("mute", Self::MUTE),
        ("database", Self::DATABASE),
        ("notifications", Self::NOTIFICATIONS),
        ("talk", Self::TALK),
        ("directory", Self::DIRECTORY),
        ("system", Self::SYSTEM),
        ("friendship", Self::FRIENDSHIP),
        ("execute", Self::EXECUTE),
        ("group", Self::GROUP),
        ("filter", Self::FILTER),
        ("schedule", Self::SCHEDULE),
    ];

    /// Resolves one configuration name (case-insensitive).
    #[must_use]
    pub fn named(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::NAMES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, capability)| *capability)
    }

    /// Combines configuration names. Unknown names are logged and skipped.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names.into_iter().fold(Self::empty(), |acc, name| {
            match Self::named(name) {
                Some(capability) => acc | capability,
                None => {
                    warn!(capability = name, "unknown capability ignored");
                    acc
                }
            }
        })
    }

    /// Configuration name of a single capability.
    #[must_use]
    pub fn name(self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(_, capability)| *capability == self)
            .map_or("unknown", |(name, _)| *name)
    }
}

/// A configured group, as the gate sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupIdentity {
    /// Group name
    pub name: String,
    /// Group id
    pub id: Uuid,
    /// Granted capabilities
    pub capabilities: Capability,
    /// Shared secret callers must present, when set
    pub password: Option<String>,
    /// Notification kinds the group subscribes to
    pub notifications: Vec<String>,
}

/// Capability lookup for command callers.
#[derive(Clone, Debug, Default)]
pub struct PermissionGate {
    groups: Vec<GroupIdentity>,
}

impl PermissionGate {
    /// Builds the gate from configured groups.
    #[must_use]
    pub fn new(groups: &[GroupConfig]) -> Self {
        let groups = groups
            .iter()
            .map(|group| GroupIdentity {
                name: group.name.clone(),
                id: group.uuid,
                capabilities: Capability::from_names(group.permissions.iter().map(String::as_str)),
                password: group.password.clone(),
                notifications: group.notifications.clone(),
            })
            .collect();
        Self { groups }
    }

    /// Finds a configured group by uuid or case-insensitive name.
    #[must_use]
    pub fn group(&self, identity: &str) -> Option<&GroupIdentity> {
        let identity = identity.trim();
        match identity.parse::<Uuid>() {
            Ok(id) => self.groups.iter().find(|g| g.id == id),
            Err(_) => self
                .groups
                .iter()
                .find(|g| g.name.to_lowercase() == identity.to_lowercase()),
        }
    }

    /// Finds the group and checks the presented password against the
    /// configured one. Groups without a password accept any caller.
    #[must_use]
    pub fn authenticate(&self, identity: &str, password: Option<&str>) -> Option<&GroupIdentity> {
        self.group(identity).filter(|group| match &group.password {
            Some(expected) => password == Some(expected.as_str()),
            None => true,
        })
    }

    /// Whether `identity` holds `capability`.
    #[must_use]
    pub fn authorize(&self, identity: &str, capability: Capability) -> bool {
        self.group(identity)
            .is_some_and(|group| group.capabilities.contains(capability))
    }

    /// Every configured group.
    #[must_use]
    pub fn groups(&self) -> &[GroupIdentity] {
        &self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> (PermissionGate, Uuid) {
        let id = Uuid::new_v4();
        let gate = PermissionGate::new(&[GroupConfig {
            name: "Builders".to_string(),
            uuid: id,
            password: None,
            permissions: vec![
                "inventory".to_string(),
                "Economy".to_string(),
                "teleportation".to_string(),
            ],
            notifications: Vec::new(),
        }]);
        (gate, id)
    }

    #[test]
    fn test_authorize_by_name_and_uuid() {
        let (gate, id) = gate();
        assert!(gate.authorize("builders", Capability::INVENTORY));
        assert!(gate.authorize(&id.to_string(), Capability::ECONOMY));
        assert!(!gate.authorize("Builders", Capability::LAND));
    }

    #[test]
    fn test_unconfigured_group_is_denied() {
        let (gate, _) = gate();
        assert!(!gate.authorize("Strangers", Capability::INVENTORY));
        assert!(!gate.authorize(&Uuid::new_v4().to_string(), Capability::INVENTORY));
    }

    #[test]
    fn test_unknown_capability_names_are_ignored() {
        let (gate, _) = gate();
        let group = gate.group("Builders").unwrap();
        assert_eq!(group.capabilities, Capability::INVENTORY | Capability::ECONOMY);
    }

    #[test]
    fn test_password_must_match_when_configured() {
        let vault = PermissionGate::new(&[GroupConfig {
            name: "Vault".to_string(),
            uuid: Uuid::new_v4(),
            password: Some("hunter2".to_string()),
            permissions: vec!["system".to_string()],
            notifications: Vec::new(),
        }]);
        assert!(vault.authenticate("vault", Some("hunter2")).is_some());
        assert!(vault.authenticate("vault", Some("guess")).is_none());
        assert!(vault.authenticate("vault", None).is_none());

        let (open, _) = gate();
        assert!(open.authenticate("Builders", None).is_some());
    }

    #[test]
    fn test_capability_names_round_trip() {
        for (name, capability) in Capability::NAMES {
            assert_eq!(Capability::named(name), Some(*capability));
            assert_eq!(capability.name(), *name);
        }
    }
}
