//! # Simulated Grid
//!
//! An in-process [`Grid`]. Requests are answered from a [`RemoteWorld`] and
//! the replies handed to a pool of delivery threads, which publish them on
//! the hub after a latency drawn from the configured [`NetworkConditions`].
//! Replies are never published on the requesting thread.

use crate::conditions::{Jitter, NetworkConditions};
use crate::remote::RemoteWorld;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, MutexGuard};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};
use waypost_core::grid::{CreateItemRequest, InventoryOffer, ItemUpload, RezRequest};
use waypost_core::session::InventoryItem;
use waypost_core::{
    AssetKind, DerezDestination, EventHub, EventKind, Grid, GridEvent, RegionHandle, ShapeData,
    Uuid, Vector3,
};

/// A request as received by the grid.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum GridRequest {
    Balance,
    CurrentGroups,
    LeaveGroup(Uuid),
    AllSimParcels(RegionHandle),
    ParcelProperties {
        region: RegionHandle,
        position: Vector3,
    },
    Derez {
        local_id: u32,
        destination: DerezDestination,
        folder: Uuid,
    },
    Rez(RezRequest),
    CreateItemFromAsset(CreateItemRequest),
    CreateItem(CreateItemRequest),
    UploadAsset(AssetKind),
    UploadNotecard(Uuid),
    UploadGesture(Uuid),
    UpdateScript {
        item: Uuid,
        mono: bool,
    },
    TeleportLure {
        agent: Uuid,
        message: String,
    },
    SetScale {
        region: RegionHandle,
        local_id: u32,
        scale: Vector3,
        uniform: bool,
    },
    SetShape {
        region: RegionHandle,
        local_id: u32,
        shape: ShapeData,
    },
    StopAnimation(Uuid),
    ReplaceOutfit(Vec<Uuid>),
    Rebake,
    SearchAgent {
        first: String,
        last: String,
    },
    ObjectProperties {
        region: RegionHandle,
        local_ids: Vec<u32>,
    },
    OfferResponse {
        offer: Uuid,
        accept: bool,
        folder: Uuid,
    },
}

/// A reply waiting to go out.
struct Delivery {
    due: Instant,
    event: GridEvent,
}

/// Configuration for a simulated grid.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Reply latency and loss.
    pub network: NetworkConditions,
    /// Seed for jitter.
    pub seed: u64,
    /// Number of delivery threads.
    pub delivery_threads: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            network: NetworkConditions::PERFECT,
            seed: 0x5EED,
            delivery_threads: 2,
        }
    }
}

/// In-process grid.
pub struct SimulatedGrid {
    hub: Arc<EventHub>,
    world: Mutex<RemoteWorld>,
    requests: Mutex<Vec<GridRequest>>,
    jitter: Mutex<Jitter>,
    suppressed: Mutex<HashSet<EventKind>>,
    delays: Mutex<HashMap<EventKind, Duration>>,
    outbox: Option<Sender<Delivery>>,
    workers: Vec<JoinHandle<()>>,
}

impl SimulatedGrid {
    /// Creates a grid with perfect network conditions.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SimulationConfig::default())
    }

    /// Creates a grid with the given simulation settings.
    #[must_use]
    pub fn with_config(config: SimulationConfig) -> Self {
        let hub = EventHub::new();
        let (tx, rx) = unbounded::<Delivery>();
        let workers = (0..config.delivery_threads.max(1))
            .filter_map(|i| {
                let hub = Arc::clone(&hub);
                let rx = rx.clone();
                thread::Builder::new()
                    .name(format!("waypost-net-{i}"))
                    .spawn(move || deliver(&hub, &rx))
                    .map_err(|error| warn!(%error, "could not start delivery thread"))
                    .ok()
            })
            .collect();

        Self {
            hub,
            world: Mutex::new(RemoteWorld::default()),
            requests: Mutex::new(Vec::new()),
            jitter: Mutex::new(Jitter::new(config.network, config.seed)),
            suppressed: Mutex::new(HashSet::new()),
            delays: Mutex::new(HashMap::new()),
            outbox: Some(tx),
            workers,
        }
    }

    /// Server-side state, for seeding and inspection.
    pub fn world(&self) -> MutexGuard<'_, RemoteWorld> {
        self.world.lock()
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<GridRequest> {
        self.requests.lock().clone()
    }

    /// Number of received requests matching `predicate`.
    pub fn count_requests(&self, predicate: impl Fn(&GridRequest) -> bool) -> usize {
        self.requests.lock().iter().filter(|r| predicate(r)).count()
    }

    /// Drops every future reply of `kind`.
    pub fn suppress(&self, kind: EventKind) {
        self.suppressed.lock().insert(kind);
    }

    /// Lets replies of `kind` through again.
    pub fn restore(&self, kind: EventKind) {
        self.suppressed.lock().remove(&kind);
    }

    /// Adds `extra` latency to every future reply of `kind`.
    pub fn delay(&self, kind: EventKind, extra: Duration) {
        self.delays.lock().insert(kind, extra);
    }

    /// Publishes `event` on the calling thread, bypassing the network.
    pub fn publish_now(&self, event: &GridEvent) {
        self.hub.publish(event);
    }

    /// Queues an unsolicited event through the network threads.
    pub fn inject(&self, event: GridEvent) {
        self.reply(event);
    }

    fn log(&self, request: GridRequest) {
        trace!(?request, "grid request");
        self.requests.lock().push(request);
    }

    fn reply(&self, event: GridEvent) {
        let kind = event.kind();
        if self.suppressed.lock().contains(&kind) {
            debug!(?kind, "reply suppressed");
            return;
        }
        let Some(latency) = self.jitter.lock().next_delivery() else {
            debug!(?kind, "reply lost");
            return;
        };
        let extra = self.delays.lock().get(&kind).copied().unwrap_or_default();
        let delivery = Delivery {
            due: Instant::now() + latency + extra,
            event,
        };
        let sent = self
            .outbox
            .as_ref()
            .is_some_and(|outbox| outbox.send(delivery).is_ok());
        if !sent {
            warn!(?kind, "delivery threads gone; reply dropped");
        }
    }
}

impl Default for SimulatedGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SimulatedGrid {
    fn drop(&mut self) {
        // Closing the channel lets the workers drain and exit.
        self.outbox.take();
        let current = thread::current().id();
        for worker in self.workers.drain(..) {
            // The last handle can be released by a delivery thread itself.
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                warn!("delivery thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for SimulatedGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedGrid")
            .field("requests", &self.requests.lock().len())
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}

/// Delivery thread body.
fn deliver(hub: &EventHub, outbox: &Receiver<Delivery>) {
    for delivery in outbox {
        let now = Instant::now();
        if delivery.due > now {
            thread::sleep(delivery.due - now);
        }
        hub.publish(&delivery.event);
    }
}

fn new_item(request: &CreateItemRequest, asset_id: Uuid) -> InventoryItem {
    InventoryItem {
        id: Uuid::new_v4(),
        parent: request.folder,
        name: request.name.clone(),
        description: request.description.clone(),
        asset_id,
        asset_kind: request.asset_kind,
        inventory_type: request.inventory_type,
        wearable: request.wearable,
        link_target: None,
        permissions: request.permissions,
    }
}

impl Grid for SimulatedGrid {
    fn events(&self) -> &Arc<EventHub> {
        &self.hub
    }

    fn request_balance(&self) {
        self.log(GridRequest::Balance);
        let balance = self.world.lock().balance;
        self.reply(GridEvent::BalanceReply { balance });
    }

    fn request_current_groups(&self) {
        self.log(GridRequest::CurrentGroups);
        let groups = self.world.lock().groups.clone();
        self.reply(GridEvent::CurrentGroups { groups });
    }

    fn leave_group(&self, group: Uuid) {
        self.log(GridRequest::LeaveGroup(group));
        let success = self.world.lock().leave(group);
        self.reply(GridEvent::GroupLeaveReply { group, success });
    }

    fn request_all_sim_parcels(&self, region: RegionHandle) {
        self.log(GridRequest::AllSimParcels(region));
        let parcels = self
            .world
            .lock()
            .parcels
            .get(&region)
            .cloned()
            .unwrap_or_default();
        self.reply(GridEvent::SimParcelsDownloaded { region, parcels });
    }

    fn request_parcel_properties(&self, query: Uuid, region: RegionHandle, position: Vector3) {
        self.log(GridRequest::ParcelProperties { region, position });
        let parcel = self.world.lock().parcel_at(region, position);
        self.reply(GridEvent::ParcelProperties {
            query,
            region,
            parcel,
        });
    }

    fn request_derez(
        &self,
        local_id: u32,
        destination: DerezDestination,
        folder: Uuid,
        _transaction: Uuid,
    ) {
        self.log(GridRequest::Derez {
            local_id,
            destination,
            folder,
        });
    }

    fn request_rez(&self, request: RezRequest) {
        self.log(GridRequest::Rez(request));
    }

    fn create_item_from_asset(&self, request: CreateItemRequest, data: Vec<u8>) {
        self.log(GridRequest::CreateItemFromAsset(request.clone()));
        let transaction = request.transaction;
        let outcome = {
            let mut world = self.world.lock();
            if RemoteWorld::is_charged(request.asset_kind) && world.balance < world.upload_cost {
                Err("insufficient funds")
            } else {
                let asset_id = world.store_asset(request.asset_kind, &data);
                if asset_id.is_nil() {
                    Err("upload rejected")
                } else {
                    if RemoteWorld::is_charged(request.asset_kind) {
                        world.balance -= world.upload_cost;
                    }
                    Ok(new_item(&request, asset_id))
                }
            }
        };
        let event = match outcome {
            Ok(item) => GridEvent::ItemCreatedFromAsset {
                transaction,
                success: true,
                status: "Complete".to_string(),
                item: Some(item),
            },
            Err(status) => GridEvent::ItemCreatedFromAsset {
                transaction,
                success: false,
                status: status.to_string(),
                item: None,
            },
        };
        self.reply(event);
    }

    fn create_item(&self, request: CreateItemRequest) {
        self.log(GridRequest::CreateItem(request.clone()));
        let item = new_item(&request, request.asset_id);
        self.reply(GridEvent::ItemCreated {
            transaction: request.transaction,
            success: true,
            item: Some(item),
        });
    }

    fn upload_asset(&self, kind: AssetKind, data: &[u8]) -> Uuid {
        self.log(GridRequest::UploadAsset(kind));
        self.world.lock().store_asset(kind, data)
    }

    fn upload_notecard(&self, upload: ItemUpload) {
        self.log(GridRequest::UploadNotecard(upload.item));
        let asset_id = self.world.lock().store_asset(AssetKind::Notecard, &upload.data);
        self.reply(GridEvent::AssetUploaded {
            transaction: upload.transaction,
            success: !asset_id.is_nil(),
            item_id: upload.item,
            asset_id,
        });
    }

    fn upload_gesture(&self, upload: ItemUpload) {
        self.log(GridRequest::UploadGesture(upload.item));
        let asset_id = self.world.lock().store_asset(AssetKind::Gesture, &upload.data);
        self.reply(GridEvent::AssetUploaded {
            transaction: upload.transaction,
            success: !asset_id.is_nil(),
            item_id: upload.item,
            asset_id,
        });
    }

    fn update_script(&self, upload: ItemUpload, mono: bool) {
        self.log(GridRequest::UpdateScript {
            item: upload.item,
            mono,
        });
        let (asset_id, errors) = {
            let mut world = self.world.lock();
            let asset_id = world.store_asset(AssetKind::LslText, &upload.data);
            (asset_id, world.script_errors.clone())
        };
        self.reply(GridEvent::ScriptUpdated {
            transaction: upload.transaction,
            success: !asset_id.is_nil(),
            compiled: errors.is_none(),
            messages: errors.unwrap_or_default(),
            item_id: upload.item,
            asset_id,
        });
    }

    fn send_teleport_lure(&self, agent: Uuid, message: &str) {
        self.log(GridRequest::TeleportLure {
            agent,
            message: message.to_string(),
        });
    }

    fn set_scale(&self, region: RegionHandle, local_id: u32, scale: Vector3, uniform: bool) {
        self.log(GridRequest::SetScale {
            region,
            local_id,
            scale,
            uniform,
        });
    }

    fn set_shape(&self, region: RegionHandle, local_id: u32, shape: ShapeData) {
        self.log(GridRequest::SetShape {
            region,
            local_id,
            shape,
        });
    }

    fn stop_animation(&self, animation: Uuid) {
        self.log(GridRequest::StopAnimation(animation));
    }

    fn replace_outfit(&self, items: &[Uuid]) {
        self.log(GridRequest::ReplaceOutfit(items.to_vec()));
    }

    fn request_rebake(&self) {
        self.log(GridRequest::Rebake);
    }

    fn search_agent(&self, query: Uuid, first_name: &str, last_name: &str) {
        self.log(GridRequest::SearchAgent {
            first: first_name.to_string(),
            last: last_name.to_string(),
        });
        let matches = self.world.lock().search(first_name, last_name);
        self.reply(GridEvent::AgentSearchReply { query, matches });
    }

    fn request_object_properties(&self, query: Uuid, region: RegionHandle, local_ids: &[u32]) {
        self.log(GridRequest::ObjectProperties {
            region,
            local_ids: local_ids.to_vec(),
        });
        let names = {
            let world = self.world.lock();
            local_ids
                .iter()
                .filter_map(|id| {
                    world
                        .object_names
                        .get(&(region, *id))
                        .map(|name| (*id, name.clone()))
                })
                .collect()
        };
        self.reply(GridEvent::ObjectProperties {
            query,
            region,
            names,
        });
    }

    fn respond_to_offer(&self, offer: &InventoryOffer, accept: bool, folder: Uuid) {
        self.log(GridRequest::OfferResponse {
            offer: offer.session,
            accept,
            folder,
        });
    }
}
