//! # Command Errors
//!
//! The closed set of error codes a command can fail with. Every code has a
//! stable snake-case wire name and belongs to one category.

use std::fmt;
use thiserror::Error;
use waypost_core::{BridgeError, EntityKind, LocateError, OfferError};

/// Broad classes of failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The caller may not do this
    Permission,
    /// A parameter was missing or malformed
    Parameter,
    /// A reference did not resolve
    NotFound,
    /// No confirmation arrived within the budget
    Timeout,
    /// The grid refused or the operation could not complete
    OperationFailed,
    /// A type name is not in its closed table
    UnknownType,
}

/// Error codes, one per distinct failure a caller can see.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ErrorCode {
    NoPermission,
    AccessDenied,
    NoGroupPowerForCommand,

    UnknownCommand,
    NoGroupSpecified,
    NoSessionSpecified,
    NoFolderSpecified,
    NoItemSpecified,
    NoNameProvided,
    InvalidPosition,
    InvalidScale,
    InvalidAssetData,
    InvalidShapeData,
    InvalidParameter,
    UnknownAction,
    PositionWouldExceedMaximumRezAltitude,
    ScaleWouldExceedBuildingConstraints,

    FolderNotFound,
    InventoryItemNotFound,
    PrimitiveNotFound,
    RegionNotFound,
    GroupNotFound,
    AgentNotFound,
    CouldNotFindParcel,
    InventoryOfferNotFound,

    TimeoutGettingBalance,
    TimeoutGettingGroups,
    TimeoutLeavingGroup,
    TimeoutGettingParcels,
    TimeoutCreatingItem,
    TimeoutUploadingAsset,

    CouldNotLeaveGroup,
    InsufficientFunds,
    AssetUploadFailed,
    UnableToCreateItem,
    NoEquipableItems,
    CommandQueueFull,
    OperationFailed,

    UnknownAssetType,
    UnknownWearableType,
}

impl ErrorCode {
    const TABLE: &'static [(Self, &'static str, ErrorCategory)] = &[
        (Self::NoPermission, "no_permission", ErrorCategory::Permission),
        (Self::AccessDenied, "access_denied", ErrorCategory::Permission),
        (
            Self::NoGroupPowerForCommand,
            "no_group_power_for_command",
            ErrorCategory::Permission,
        ),
        (Self::UnknownCommand, "unknown_command", ErrorCategory::Parameter),
        (Self::NoGroupSpecified, "no_group_specified", ErrorCategory::Parameter),
        (Self::NoSessionSpecified, "no_session_specified", ErrorCategory::Parameter),
        (Self::NoFolderSpecified, "no_folder_specified", ErrorCategory::Parameter),
        (Self::NoItemSpecified, "no_item_specified", ErrorCategory::Parameter),
        (Self::NoNameProvided, "no_name_provided", ErrorCategory::Parameter),
        (Self::InvalidPosition, "invalid_position", ErrorCategory::Parameter),
        (Self::InvalidScale, "invalid_scale", ErrorCategory::Parameter),
        (Self::InvalidAssetData, "invalid_asset_data", ErrorCategory::Parameter),
        (Self::InvalidShapeData, "invalid_shape_data", ErrorCategory::Parameter),
        (Self::InvalidParameter, "invalid_parameter", ErrorCategory::Parameter),
        (Self::UnknownAction, "unknown_action", ErrorCategory::Parameter),
        (
            Self::PositionWouldExceedMaximumRezAltitude,
            "position_would_exceed_maximum_rez_altitude",
            ErrorCategory::Parameter,
        ),
        (
            Self::ScaleWouldExceedBuildingConstraints,
            "scale_would_exceed_building_constraints",
            ErrorCategory::Parameter,
        ),
        (Self::FolderNotFound, "folder_not_found", ErrorCategory::NotFound),
        (
            Self::InventoryItemNotFound,
            "inventory_item_not_found",
            ErrorCategory::NotFound,
        ),
        (Self::PrimitiveNotFound, "primitive_not_found", ErrorCategory::NotFound),
        (Self::RegionNotFound, "region_not_found", ErrorCategory::NotFound),
        (Self::GroupNotFound, "group_not_found", ErrorCategory::NotFound),
        (Self::AgentNotFound, "agent_not_found", ErrorCategory::NotFound),
        (Self::CouldNotFindParcel, "could_not_find_parcel", ErrorCategory::NotFound),
        (
            Self::InventoryOfferNotFound,
            "inventory_offer_not_found",
            ErrorCategory::NotFound,
        ),
        (Self::TimeoutGettingBalance, "timeout_getting_balance", ErrorCategory::Timeout),
        (Self::TimeoutGettingGroups, "timeout_getting_groups", ErrorCategory::Timeout),
        (Self::TimeoutLeavingGroup, "timeout_leaving_group", ErrorCategory::Timeout),
        (Self::TimeoutGettingParcels, "timeout_getting_parcels", ErrorCategory::Timeout),
        (Self::TimeoutCreatingItem, "timeout_creating_item", ErrorCategory::Timeout),
        (Self::TimeoutUploadingAsset, "timeout_uploading_asset", ErrorCategory::Timeout),
        (Self::CouldNotLeaveGroup, "could_not_leave_group", ErrorCategory::OperationFailed),
        (Self::InsufficientFunds, "insufficient_funds", ErrorCategory::OperationFailed),
        (Self::AssetUploadFailed, "asset_upload_failed", ErrorCategory::OperationFailed),
        (Self::UnableToCreateItem, "unable_to_create_item", ErrorCategory::OperationFailed),
        (Self::NoEquipableItems, "no_equipable_items", ErrorCategory::OperationFailed),
        (Self::CommandQueueFull, "command_queue_full", ErrorCategory::OperationFailed),
        (Self::OperationFailed, "operation_failed", ErrorCategory::OperationFailed),
        (Self::UnknownAssetType, "unknown_asset_type", ErrorCategory::UnknownType),
        (Self::UnknownWearableType, "unknown_wearable_type", ErrorCategory::UnknownType),
    ];

    fn entry(self) -> (&'static str, ErrorCategory) {
        Self::TABLE
            .iter()
            .find(|(code, _, _)| *code == self)
            .map_or(
                ("operation_failed", ErrorCategory::OperationFailed),
                |(_, name, category)| (*name, *category),
            )
    }

    /// Stable wire name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.entry().0
    }

    /// Category the code belongs to.
    #[must_use]
    pub fn category(self) -> ErrorCategory {
        self.entry().1
    }

    /// Resolves a wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(_, candidate, _)| *candidate == name)
            .map(|(code, _, _)| *code)
    }

    /// Every code, in declaration order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::TABLE.iter().map(|(code, _, _)| *code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed command: one code and an optional human-readable detail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}")]
pub struct CommandError {
    code: ErrorCode,
    detail: Option<String>,
}

impl CommandError {
    /// Error with no detail.
    #[must_use]
    pub const fn new(code: ErrorCode) -> Self {
        Self { code, detail: None }
    }

    /// Error carrying extra context for the caller.
    #[must_use]
    pub fn with_detail(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: Some(detail.into()),
        }
    }

    /// The code.
    #[inline]
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// The detail, if any.
    #[inline]
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Maps a bridge failure to the operation's own timeout code.
    pub fn bridged(timeout: ErrorCode) -> impl FnOnce(BridgeError) -> Self {
        move |error| match error {
            BridgeError::Timeout { .. } => Self::new(timeout),
        }
    }
}

impl From<ErrorCode> for CommandError {
    fn from(code: ErrorCode) -> Self {
        Self::new(code)
    }
}

impl From<LocateError> for CommandError {
    fn from(error: LocateError) -> Self {
        let code = match error.kind() {
            EntityKind::Folder => ErrorCode::FolderNotFound,
            EntityKind::Item => ErrorCode::InventoryItemNotFound,
            EntityKind::Primitive => ErrorCode::PrimitiveNotFound,
            EntityKind::Simulator => ErrorCode::RegionNotFound,
            EntityKind::Group => ErrorCode::GroupNotFound,
            EntityKind::Agent => ErrorCode::AgentNotFound,
            EntityKind::Parcel => ErrorCode::CouldNotFindParcel,
        };
        Self::with_detail(code, error.to_string())
    }
}

impl From<OfferError> for CommandError {
    fn from(error: OfferError) -> Self {
        Self::with_detail(ErrorCode::InventoryOfferNotFound, error.to_string())
    }
}

/// Result type for command handlers.
pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    #[test]
    fn test_wire_names_are_unique_and_round_trip() {
        let mut seen = HashSet::new();
        for code in ErrorCode::all() {
            assert!(seen.insert(code.name()), "duplicate name {}", code.name());
            assert_eq!(ErrorCode::from_name(code.name()), Some(code));
            assert!(code
                .name()
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '_'));
        }
        assert_eq!(seen.len(), ErrorCode::all().count());
    }

    #[test]
    fn test_locate_errors_map_by_entity_kind() {
        let error: CommandError = LocateError::not_found(EntityKind::Folder, "Objects").into();
        assert_eq!(error.code(), ErrorCode::FolderNotFound);
        assert_eq!(error.code().category(), ErrorCategory::NotFound);

        let error: CommandError = LocateError::not_found(EntityKind::Simulator, "Ahern").into();
        assert_eq!(error.code(), ErrorCode::RegionNotFound);
    }

    #[test]
    fn test_bridge_errors_pick_the_operation_timeout() {
        let timeout = BridgeError::Timeout {
            key: "balance".to_string(),
            timeout: Duration::from_millis(5),
        };
        let error = CommandError::bridged(ErrorCode::TimeoutGettingBalance)(timeout);
        assert_eq!(error.code(), ErrorCode::TimeoutGettingBalance);
        assert!(error.detail().is_none());
    }
}
