//! `upload`: creates inventory content from base64 asset data.
//!
//! Each asset kind takes its own path through the grid. Charged kinds
//! (textures and animations) check the balance first and are created from
//! the bytes in one step. Wearables, sounds and landmarks are uploaded as
//! assets and then wrapped in a new item. Gestures, notecards and scripts
//! get an empty item first and the content is uploaded into it.

use super::balance::refresh_balance;
use crate::context::{CommandContext, Invocation};
use crate::error::{CommandError, CommandResult, ErrorCode};
use crate::params::{join_csv, ResultMap};
use crate::permissions::Capability;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use waypost_core::grid::{CreateItemRequest, ItemUpload};
use waypost_core::session::InventoryItem;
use waypost_core::{AssetKind, EventKind, Grid, GridEvent, PermissionMask, Uuid, WearableType};

/// Kinds the command accepts.
const UPLOADABLE: &[AssetKind] = &[
    AssetKind::Texture,
    AssetKind::Animation,
    AssetKind::Sound,
    AssetKind::Bodypart,
    AssetKind::Clothing,
    AssetKind::Landmark,
    AssetKind::Gesture,
    AssetKind::Notecard,
    AssetKind::LslText,
];

/// One upload in flight.
struct Upload<'a> {
    ctx: &'a CommandContext,
    transaction: Uuid,
    folder: Uuid,
    name: String,
    description: String,
    kind: AssetKind,
    permissions: PermissionMask,
    data: Vec<u8>,
}

/// Where the content ended up.
struct Uploaded {
    item: Uuid,
    asset: Uuid,
    errors: Vec<String>,
}

/// `upload` handler.
pub fn upload(ctx: &CommandContext, invocation: &Invocation) -> CommandResult<ResultMap> {
    ctx.authorize(invocation, Capability::INVENTORY)?;
    let params = &invocation.params;

    let name = params.require("name", ErrorCode::NoNameProvided)?.to_string();
    let description = params.get("description").unwrap_or_default().to_string();
    let permissions = params.list("permissions")?;
    let permissions = PermissionMask::from_names(permissions.iter().map(String::as_str));

    let kind = params
        .get("type")
        .and_then(AssetKind::from_name)
        .filter(|kind| UPLOADABLE.contains(kind))
        .ok_or(ErrorCode::UnknownAssetType)?;

    let data = params.require("data", ErrorCode::InvalidAssetData)?;
    // Form decoding turns '+' into spaces.
    let data = STANDARD
        .decode(data.trim().replace(' ', "+"))
        .map_err(|error| {
            CommandError::with_detail(ErrorCode::InvalidAssetData, error.to_string())
        })?;

    let existing = match params.get("item") {
        Some(reference) => {
            let item = ctx.locator().find_item(reference)?;
            if item.asset_kind != kind {
                return Err(CommandError::with_detail(
                    ErrorCode::InventoryItemNotFound,
                    format!("{} is not a {kind}", item.name),
                ));
            }
            Some(item.id)
        }
        None => None,
    };

    let folder = ctx
        .store
        .inventory
        .read(|inventory| inventory.folder_for_type(kind));
    let mut upload = Upload {
        ctx,
        transaction: Uuid::new_v4(),
        folder,
        name,
        description,
        kind,
        permissions,
        data: data.clone(),
    };

    let uploaded = match kind {
        AssetKind::Texture | AssetKind::Animation => {
            ctx.authorize(invocation, Capability::ECONOMY)?;
            upload.charged()?
        }
        AssetKind::Sound => upload.wrapped(None, PermissionMask::ALL)?,
        AssetKind::Bodypart | AssetKind::Clothing => {
            let wearable = params
                .get("wear")
                .and_then(WearableType::from_name)
                .ok_or(ErrorCode::UnknownWearableType)?;
            upload.wrapped(Some(wearable), PermissionMask::TRANSFER)?
        }
        AssetKind::Landmark => {
            upload.permissions = PermissionMask::ALL;
            upload.wrapped(None, PermissionMask::ALL)?
        }
        AssetKind::Gesture => upload.gesture(existing)?,
        AssetKind::Notecard => upload.notecard(existing)?,
        _ => upload.script(existing, params.flag("mono", true))?,
    };

    ctx.store.inventory.write(|inventory| inventory.mark_needs_update(folder));
    if !uploaded.asset.is_nil() {
        ctx.store.assets.write(|assets| assets.store(uploaded.asset, data));
    }
    tracing::info!(%kind, item = %uploaded.item, asset = %uploaded.asset, "upload complete");

    let mut fields = Vec::new();
    if !uploaded.errors.is_empty() {
        fields.push("error".to_string());
        fields.push(join_csv(&uploaded.errors));
    }
    fields.extend([
        "item".to_string(),
        uploaded.item.to_string(),
        "asset".to_string(),
        uploaded.asset.to_string(),
    ]);
    Ok(super::data(join_csv(&fields)))
}

impl Upload<'_> {
    fn key(&self) -> String {
        format!("upload:{}", self.transaction)
    }

    fn request(&self, asset_id: Uuid, wearable: Option<WearableType>) -> CreateItemRequest {
        CreateItemRequest {
            transaction: self.transaction,
            folder: self.folder,
            name: self.name.clone(),
            description: self.description.clone(),
            asset_kind: self.kind,
            inventory_type: self.kind.inventory_type(),
            wearable,
            asset_id,
            permissions: self.permissions,
        }
    }

    /// Charged kinds: balance check, then one create-from-bytes step.
    fn charged(self) -> CommandResult<Uploaded> {
        let cost = self.ctx.session.upload_cost;
        let balance = refresh_balance(self.ctx)?;
        if balance < cost {
            return Err(CommandError::with_detail(
                ErrorCode::InsufficientFunds,
                format!("balance {balance} is below the upload cost {cost}"),
            ));
        }

        let transaction = self.transaction;
        let request = self.request(Uuid::nil(), None);
        let ctx = self.ctx;
        let data = self.data;
        let (success, status, item) = ctx
            .bridge
            .call(
                &format!("upload:{transaction}"),
                EventKind::ItemCreatedFromAsset,
                ctx.session.services_timeout(),
                move |event| match event {
                    GridEvent::ItemCreatedFromAsset {
                        transaction: t,
                        success,
                        status,
                        item,
                    } if *t == transaction => Some((*success, status.clone(), item.clone())),
                    _ => None,
                },
                || {
                    ctx.grid.create_item_from_asset(request, data);
                    None
                },
            )
            .map_err(CommandError::bridged(ErrorCode::TimeoutUploadingAsset))?;

        match item {
            Some(item) if success => Ok(Uploaded {
                item: item.id,
                asset: item.asset_id,
                errors: Vec::new(),
            }),
            _ => Err(CommandError::with_detail(ErrorCode::AssetUploadFailed, status)),
        }
    }

    /// Asset first, then an item pointing at it.
    fn wrapped(
        mut self,
        wearable: Option<WearableType>,
        default_permissions: PermissionMask,
    ) -> CommandResult<Uploaded> {
        if self.permissions.is_empty() {
            self.permissions = default_permissions;
        }
        let asset = self.ctx.grid.upload_asset(self.kind, &self.data);
        if asset.is_nil() {
            return Err(ErrorCode::AssetUploadFailed.into());
        }
        let item = self
            .create(self.request(asset, wearable))?
            .ok_or(ErrorCode::AssetUploadFailed)?;
        Ok(Uploaded {
            item: item.id,
            asset,
            errors: Vec::new(),
        })
    }

    /// Bridged item creation; `None` when the grid refused.
    fn create(&self, request: CreateItemRequest) -> CommandResult<Option<InventoryItem>> {
        let transaction = self.transaction;
        let ctx = self.ctx;
        ctx.bridge
            .call(
                &self.key(),
                EventKind::ItemCreated,
                ctx.session.services_timeout(),
                move |event| match event {
                    GridEvent::ItemCreated {
                        transaction: t,
                        success,
                        item,
                    } if *t == transaction => Some(item.clone().filter(|_| *success)),
                    _ => None,
                },
                || {
                    ctx.grid.create_item(request);
                    None
                },
            )
            .map_err(CommandError::bridged(ErrorCode::TimeoutCreatingItem))
    }

    /// The given item, or a new empty one.
    fn target(&self, existing: Option<Uuid>) -> CommandResult<Uuid> {
        if let Some(item) = existing {
            return Ok(item);
        }
        let mut request = self.request(Uuid::nil(), None);
        if request.permissions.is_empty() {
            request.permissions = PermissionMask::ALL;
        }
        self.create(request)?
            .map(|item| item.id)
            .ok_or_else(|| ErrorCode::UnableToCreateItem.into())
    }

    /// Bridged content upload into an existing item; `(success, asset)`.
    fn content(
        &self,
        item: Uuid,
        data: Vec<u8>,
        send: fn(&dyn Grid, ItemUpload),
        timeout: ErrorCode,
    ) -> CommandResult<(bool, Uuid)> {
        let transaction = self.transaction;
        let ctx = self.ctx;
        ctx.bridge
            .call(
                &self.key(),
                EventKind::AssetUploaded,
                ctx.session.services_timeout(),
                move |event| match event {
                    GridEvent::AssetUploaded {
                        transaction: t,
                        success,
                        asset_id,
                        ..
                    } if *t == transaction => Some((*success, *asset_id)),
                    _ => None,
                },
                || {
                    send(
                        ctx.grid.as_ref(),
                        ItemUpload {
                            transaction,
                            item,
                            data,
                        },
                    );
                    None
                },
            )
            .map_err(CommandError::bridged(timeout))
    }

    fn gesture(self, existing: Option<Uuid>) -> CommandResult<Uploaded> {
        let item = self.target(existing)?;
        let (success, asset) = self.content(
            item,
            self.data.clone(),
            |grid, upload| grid.upload_gesture(upload),
            ErrorCode::TimeoutUploadingAsset,
        )?;
        finished(success, item, asset, Vec::new())
    }

    /// Notecards are created with a blank body before the real one goes up.
    fn notecard(self, existing: Option<Uuid>) -> CommandResult<Uploaded> {
        let item = self.target(existing)?;
        let (blank, _) = self.content(
            item,
            b"\n".to_vec(),
            |grid, upload| grid.upload_notecard(upload),
            ErrorCode::TimeoutCreatingItem,
        )?;
        if !blank {
            return Err(ErrorCode::UnableToCreateItem.into());
        }
        let (success, asset) = self.content(
            item,
            self.data.clone(),
            |grid, upload| grid.upload_notecard(upload),
            ErrorCode::TimeoutUploadingAsset,
        )?;
        finished(success, item, asset, Vec::new())
    }

    fn script(self, existing: Option<Uuid>, mono: bool) -> CommandResult<Uploaded> {
        let item = self.target(existing)?;
        let transaction = self.transaction;
        let ctx = self.ctx;
        let data = self.data.clone();
        let (success, compiled, messages, asset) = ctx
            .bridge
            .call(
                &self.key(),
                EventKind::ScriptUpdated,
                ctx.session.services_timeout(),
                move |event| match event {
                    GridEvent::ScriptUpdated {
                        transaction: t,
                        success,
                        compiled,
                        messages,
                        asset_id,
                        ..
                    } if *t == transaction => {
                        Some((*success, *compiled, messages.clone(), *asset_id))
                    }
                    _ => None,
                },
                || {
                    ctx.grid.update_script(
                        ItemUpload {
                            transaction,
                            item,
                            data,
                        },
                        mono,
                    );
                    None
                },
            )
            .map_err(CommandError::bridged(ErrorCode::TimeoutUploadingAsset))?;

        let errors = if compiled { Vec::new() } else { messages };
        finished(success, item, asset, errors)
    }
}

fn finished(success: bool, item: Uuid, asset: Uuid, errors: Vec<String>) -> CommandResult<Uploaded> {
    if success {
        Ok(Uploaded {
            item,
            asset,
            errors,
        })
    } else {
        Err(ErrorCode::AssetUploadFailed.into())
    }
}
