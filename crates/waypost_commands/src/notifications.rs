//! # Notification Emitter
//!
//! Turns raw grid events into flat notification records for subscribed
//! groups. The emitter holds no session state, so any thread may use it.
//!
//! Without a field filter each kind emits its default fields. With one,
//! only the requested fields are emitted, as `name,value` pairs in `data`.

use crate::params::{join_csv, ResultMap};
use crate::permissions::{Capability, GroupIdentity, PermissionGate};
use std::fmt;
use waypost_core::grid::{ChatAudible, ChatEvent, ChatSource, ChatVolume, InventoryOffer};

/// Guesses the language of a chat line.
pub trait LanguageDetector: Send + Sync {
    /// Language name or code for `text`.
    fn detect(&self, text: &str) -> String;
}

/// Detector that never knows.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnknownLanguage;

impl LanguageDetector for UnknownLanguage {
    fn detect(&self, _text: &str) -> String {
        "Unknown".to_string()
    }
}

/// Notification kinds a group can subscribe to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// Local chat
    Local,
    /// Inventory offers
    Inventory,
}

impl NotificationKind {
    const NAMES: &'static [(&'static str, Self)] =
        &[("local", Self::Local), ("inventory", Self::Inventory)];

    /// Wire name.
    #[must_use]
    pub fn name(self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(_, kind)| *kind == self)
            .map_or("", |(name, _)| *name)
    }

    /// Resolves a wire name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::NAMES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, kind)| *kind)
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A raw event worth notifying about.
#[derive(Clone, Copy, Debug)]
pub enum Notification<'a> {
    /// Local chat line
    Local(&'a ChatEvent),
    /// Inventory offer
    Inventory(&'a InventoryOffer),
}

impl Notification<'_> {
    /// Kind of this notification.
    #[must_use]
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Local(_) => NotificationKind::Local,
            Self::Inventory(_) => NotificationKind::Inventory,
        }
    }
}

/// Builds notification records.
pub struct NotificationEmitter {
    detector: Box<dyn LanguageDetector>,
}

impl NotificationEmitter {
    /// Emitter using `detector` for chat languages.
    #[must_use]
    pub fn new(detector: Box<dyn LanguageDetector>) -> Self {
        Self { detector }
    }

    /// Builds the record for `notification`. `filter` lists the fields to
    /// project; unknown names are skipped.
    #[must_use]
    pub fn emit(&self, notification: Notification<'_>, filter: Option<&[String]>) -> ResultMap {
        let mut record = ResultMap::new();
        record.insert("type".to_string(), notification.kind().name().to_string());

        if let Some(filter) = filter.filter(|fields| !fields.is_empty()) {
            let projected: Vec<String> = filter
                .iter()
                .filter_map(|field| {
                    field_value(notification, field).map(|value| [field.clone(), value])
                })
                .flatten()
                .collect();
            record.insert("data".to_string(), join_csv(&projected));
            return record;
        }

        match notification {
            Notification::Local(chat) => self.local(chat, &mut record),
            Notification::Inventory(offer) => inventory(offer, &mut record),
        }
        record
    }

    fn local(&self, chat: &ChatEvent, record: &mut ResultMap) {
        insert_names(&chat.from_name, record);
        // Out-of-range chat arrives without text.
        if !chat.message.is_empty() {
            record.insert("message".to_string(), chat.message.clone());
            record.insert("language".to_string(), self.detector.detect(&chat.message));
        }
        record.insert("owner".to_string(), chat.owner.to_string());
        record.insert("item".to_string(), chat.source.to_string());
        record.insert("position".to_string(), chat.position.to_string());
        record.insert("entity".to_string(), source_name(chat.source_type).to_string());
        record.insert("audible".to_string(), audible_name(chat.audible).to_string());
        record.insert("volume".to_string(), volume_name(chat.volume).to_string());
    }
}

impl Default for NotificationEmitter {
    fn default() -> Self {
        Self::new(Box::new(UnknownLanguage))
    }
}

impl fmt::Debug for NotificationEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationEmitter").finish_non_exhaustive()
    }
}

fn inventory(offer: &InventoryOffer, record: &mut ResultMap) {
    insert_names(&offer.from_name, record);
    record.insert("agent".to_string(), offer.from_agent.to_string());
    record.insert("session".to_string(), offer.session.to_string());
    record.insert("item".to_string(), offer.object.to_string());
    record.insert("name".to_string(), offer.item_name.clone());
    record.insert("asset".to_string(), offer.asset_kind.to_string());
    if !offer.message.is_empty() {
        record.insert("message".to_string(), offer.message.clone());
    }
}

/// `firstname` and `lastname`, for names with exactly two parts.
fn insert_names(full_name: &str, record: &mut ResultMap) {
    let parts: Vec<&str> = full_name.split_whitespace().collect();
    if let [first, last] = parts.as_slice() {
        record.insert("firstname".to_string(), (*first).to_string());
        record.insert("lastname".to_string(), (*last).to_string());
    }
}

/// Raw event field by name (case-insensitive).
fn field_value(notification: Notification<'_>, field: &str) -> Option<String> {
    let field = field.trim().to_ascii_lowercase();
    match notification {
        Notification::Local(chat) => match field.as_str() {
            "fromname" => Some(chat.from_name.clone()),
            "message" => Some(chat.message.clone()),
            "ownerid" | "owner" => Some(chat.owner.to_string()),
            "sourceid" | "source" => Some(chat.source.to_string()),
            "position" => Some(chat.position.to_string()),
            "sourcetype" => Some(source_name(chat.source_type).to_string()),
            "audiblelevel" | "audible" => Some(audible_name(chat.audible).to_string()),
            "type" | "volume" => Some(volume_name(chat.volume).to_string()),
            _ => None,
        },
        Notification::Inventory(offer) => match field.as_str() {
            "fromname" => Some(offer.from_name.clone()),
            "fromagentid" | "agent" => Some(offer.from_agent.to_string()),
            "imsessionid" | "session" => Some(offer.session.to_string()),
            "objectid" | "item" => Some(offer.object.to_string()),
            "name" => Some(offer.item_name.clone()),
            "assettype" | "asset" => Some(offer.asset_kind.to_string()),
            "message" => Some(offer.message.clone()),
            _ => None,
        },
    }
}

fn source_name(source: ChatSource) -> &'static str {
    match source {
        ChatSource::System => "System",
        ChatSource::Agent => "Agent",
        ChatSource::Object => "Object",
    }
}

fn audible_name(audible: ChatAudible) -> &'static str {
    match audible {
        ChatAudible::Not => "Not",
        ChatAudible::Barely => "Barely",
        ChatAudible::Fully => "Fully",
    }
}

fn volume_name(volume: ChatVolume) -> &'static str {
    match volume {
        ChatVolume::Whisper => "Whisper",
        ChatVolume::Normal => "Normal",
        ChatVolume::Shout => "Shout",
        ChatVolume::OwnerSay => "OwnerSay",
    }
}

/// Groups subscribed to `kind` that may receive notifications.
#[must_use]
pub fn subscribers(gate: &PermissionGate, kind: NotificationKind) -> Vec<&GroupIdentity> {
    gate.groups()
        .iter()
        .filter(|group| group.capabilities.contains(Capability::NOTIFICATIONS))
        .filter(|group| {
            group
                .notifications
                .iter()
                .any(|name| NotificationKind::from_name(name) == Some(kind))
        })
        .collect()
}
