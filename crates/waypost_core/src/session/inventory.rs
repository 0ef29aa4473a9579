//! # Inventory Tree
//!
//! Folders and items keyed by id. Children keep insertion order, so a
//! depth-first pre-order walk from the root is stable between calls as long
//! as the tree is not mutated.

use crate::types::{AssetKind, InventoryType, PermissionMask, WearableType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// An inventory folder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryFolder {
    /// Folder id
    pub id: Uuid,
    /// Parent folder; `None` only for the root
    pub parent: Option<Uuid>,
    /// Display name
    pub name: String,
    /// Asset kind new items of that kind are filed under
    pub preferred: Option<AssetKind>,
    /// Contents are stale and must be re-fetched
    pub needs_update: bool,
}

/// An inventory item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Item id
    pub id: Uuid,
    /// Containing folder
    pub parent: Uuid,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Backing asset
    pub asset_id: Uuid,
    /// Asset kind
    pub asset_kind: AssetKind,
    /// Inventory type
    pub inventory_type: InventoryType,
    /// Wearable slot, for clothing and body parts
    pub wearable: Option<WearableType>,
    /// Target of a link item
    pub link_target: Option<Uuid>,
    /// Next-owner permissions
    pub permissions: PermissionMask,
}

impl InventoryItem {
    /// Creates an item with empty description and full permissions.
    #[must_use]
    pub fn new(parent: Uuid, name: impl Into<String>, asset_kind: AssetKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent,
            name: name.into(),
            description: String::new(),
            asset_id: Uuid::nil(),
            asset_kind,
            inventory_type: asset_kind.inventory_type(),
            wearable: None,
            link_target: None,
            permissions: PermissionMask::ALL,
        }
    }

    /// Sets the wearable slot.
    #[must_use]
    pub fn wearing(mut self, wearable: WearableType) -> Self {
        self.wearable = Some(wearable);
        self
    }

    /// True for link items.
    #[inline]
    #[must_use]
    pub fn is_link(&self) -> bool {
        self.link_target.is_some()
    }
}

/// A node of the inventory tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryNode {
    /// Folder
    Folder(InventoryFolder),
    /// Item
    Item(InventoryItem),
}

impl InventoryNode {
    /// Node id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            Self::Folder(f) => f.id,
            Self::Item(i) => i.id,
        }
    }

    /// Node name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Folder(f) => &f.name,
            Self::Item(i) => &i.name,
        }
    }

    /// Parent id; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Uuid> {
        match self {
            Self::Folder(f) => f.parent,
            Self::Item(i) => Some(i.parent),
        }
    }

    /// The folder, if this node is one.
    #[must_use]
    pub fn as_folder(&self) -> Option<&InventoryFolder> {
        match self {
            Self::Folder(f) => Some(f),
            Self::Item(_) => None,
        }
    }

    /// The item, if this node is one.
    #[must_use]
    pub fn as_item(&self) -> Option<&InventoryItem> {
        match self {
            Self::Item(i) => Some(i),
            Self::Folder(_) => None,
        }
    }
}

/// The agent's inventory tree.
#[derive(Clone, Debug)]
pub struct InventoryStore {
    root: Uuid,
    nodes: HashMap<Uuid, InventoryNode>,
    children: HashMap<Uuid, Vec<Uuid>>,
}

impl Default for InventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryStore {
    /// Creates a tree holding only the root folder.
    #[must_use]
    pub fn new() -> Self {
        let root = InventoryFolder {
            id: Uuid::new_v4(),
            parent: None,
            name: "My Inventory".to_string(),
            preferred: None,
            needs_update: false,
        };
        let id = root.id;
        let mut nodes = HashMap::new();
        nodes.insert(id, InventoryNode::Folder(root));
        Self {
            root: id,
            nodes,
            children: HashMap::new(),
        }
    }

    /// Root folder id.
    #[inline]
    #[must_use]
    pub fn root(&self) -> Uuid {
        self.root
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds only the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&InventoryNode> {
        self.nodes.get(&id)
    }

    /// Looks up a folder by id.
    #[must_use]
    pub fn folder(&self, id: Uuid) -> Option<&InventoryFolder> {
        self.get(id).and_then(InventoryNode::as_folder)
    }

    /// Looks up an item by id.
    #[must_use]
    pub fn item(&self, id: Uuid) -> Option<&InventoryItem> {
        self.get(id).and_then(InventoryNode::as_item)
    }

    /// Mutable item lookup.
    pub fn item_mut(&mut self, id: Uuid) -> Option<&mut InventoryItem> {
        match self.nodes.get_mut(&id) {
            Some(InventoryNode::Item(item)) => Some(item),
            _ => None,
        }
    }

    /// Children of `folder` in insertion order.
    #[must_use]
    pub fn children(&self, folder: Uuid) -> &[Uuid] {
        self.children.get(&folder).map_or(&[], Vec::as_slice)
    }

    /// Creates a folder under `parent` and returns its id.
    pub fn add_folder(
        &mut self,
        parent: Uuid,
        name: impl Into<String>,
        preferred: Option<AssetKind>,
    ) -> Uuid {
        let folder = InventoryFolder {
            id: Uuid::new_v4(),
            parent: Some(parent),
            name: name.into(),
            preferred,
            needs_update: false,
        };
        let id = folder.id;
        self.insert(InventoryNode::Folder(folder));
        id
    }

    /// Inserts or replaces an item. Moving an item to another parent
    /// re-files it at the end of the new parent's children.
    pub fn insert_item(&mut self, item: InventoryItem) -> Uuid {
        let id = item.id;
        self.insert(InventoryNode::Item(item));
        id
    }

    fn insert(&mut self, node: InventoryNode) {
        let id = node.id();
        let parent = node.parent();
        if let Some(previous) = self.nodes.insert(id, node) {
            if previous.parent() == parent {
                return;
            }
            if let Some(old_parent) = previous.parent() {
                self.detach(old_parent, id);
            }
        }
        if let Some(parent) = parent {
            self.children.entry(parent).or_default().push(id);
        }
    }

    fn detach(&mut self, parent: Uuid, id: Uuid) {
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|child| *child != id);
        }
    }

    /// Removes a node and everything beneath it. The root cannot be removed.
    pub fn remove(&mut self, id: Uuid) -> Option<InventoryNode> {
        if id == self.root {
            return None;
        }
        let node = self.nodes.remove(&id)?;
        if let Some(parent) = node.parent() {
            self.detach(parent, id);
        }
        let mut pending = self.children.remove(&id).unwrap_or_default();
        while let Some(child) = pending.pop() {
            self.nodes.remove(&child);
            if let Some(grandchildren) = self.children.remove(&child) {
                pending.extend(grandchildren);
            }
        }
        Some(node)
    }

    /// Depth-first pre-order walk from the root, root included.
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            store: self,
            stack: vec![self.root],
        }
    }

    /// First folder, in walk order, that prefers `kind`; the root otherwise.
    #[must_use]
    pub fn folder_for_type(&self, kind: AssetKind) -> Uuid {
        self.walk()
            .filter_map(InventoryNode::as_folder)
            .find(|folder| folder.preferred == Some(kind))
            .map_or(self.root, |folder| folder.id)
    }

    /// The current outfit folder, if the tree has one.
    #[must_use]
    pub fn current_outfit_folder(&self) -> Option<Uuid> {
        self.walk()
            .filter_map(InventoryNode::as_folder)
            .find(|folder| folder.preferred == Some(AssetKind::CurrentOutfit))
            .map(|folder| folder.id)
    }

    /// Follows a link item to its target; non-links resolve to themselves.
    #[must_use]
    pub fn resolve_link<'a>(&'a self, item: &'a InventoryItem) -> Option<&'a InventoryItem> {
        match item.link_target {
            Some(target) => self.item(target),
            None => Some(item),
        }
    }

    /// Flags a folder's contents as stale.
    pub fn mark_needs_update(&mut self, folder: Uuid) {
        if let Some(InventoryNode::Folder(f)) = self.nodes.get_mut(&folder) {
            f.needs_update = true;
        }
    }
}

/// Iterator returned by [`InventoryStore::walk`].
pub struct Walk<'a> {
    store: &'a InventoryStore,
    stack: Vec<Uuid>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a InventoryNode;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.stack.pop()?;
            let Some(node) = self.store.nodes.get(&id) else {
                continue;
            };
            // Reverse so the first child is visited first.
            self.stack
                .extend(self.store.children(id).iter().rev().copied());
            return Some(node);
        }
    }
}
