//! # Session Feed
//!
//! The long-lived subscriber set that applies grid events to the session
//! store. It is registered before any command runs and stays attached for
//! the life of the session.
//!
//! Each handler takes exactly the partition lock its event touches and
//! nothing else, so it can always make progress while command handlers
//! sit in bridged waits.

use super::SessionStore;
use crate::grid::{EventKind, Grid, GridEvent, InventoryOffer, Subscription};
use crate::offers::{OfferDecision, OfferRegistry};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Subscriptions that keep the session store in step with the grid.
pub struct SessionFeed {
    subscriptions: Vec<Subscription>,
}

impl SessionFeed {
    /// Attaches to `grid`'s hub. Offers that nobody answers within
    /// `offer_timeout` are declined.
    pub fn start(
        store: Arc<SessionStore>,
        offers: Arc<OfferRegistry>,
        grid: Arc<dyn Grid>,
        offer_timeout: Duration,
    ) -> Self {
        let hub = Arc::clone(grid.events());
        let mut subscriptions = Vec::new();

        let mut on = |kind: EventKind, apply: fn(&SessionStore, &GridEvent)| {
            let store = Arc::clone(&store);
            subscriptions.push(hub.subscribe(kind, move |event| apply(&store, event)));
        };
        on(EventKind::BalanceReply, apply_balance);
        on(EventKind::CurrentGroups, apply_groups);
        on(EventKind::GroupLeaveReply, apply_group_leave);
        on(EventKind::ParcelProperties, apply_parcel);
        on(EventKind::SimParcelsDownloaded, apply_sim_parcels);
        on(EventKind::ItemCreatedFromAsset, apply_item_created);
        on(EventKind::ItemCreated, apply_item_created);
        on(EventKind::AssetUploaded, apply_asset_uploaded);
        on(EventKind::ScriptUpdated, apply_asset_uploaded);
        on(EventKind::ObjectUpdate, apply_object);
        on(EventKind::ObjectKilled, apply_object);
        on(EventKind::ObjectProperties, apply_object);
        on(EventKind::SimulatorConnected, apply_simulator);

        {
            let store = Arc::clone(&store);
            let grid = Arc::clone(&grid);
            subscriptions.push(hub.subscribe(EventKind::InventoryOffered, move |event| {
                if let GridEvent::InventoryOffered { offer } = event {
                    accept_later(&store, &offers, &grid, offer.clone(), offer_timeout);
                }
            }));
        }

        info!(handlers = subscriptions.len(), "session feed attached");
        Self { subscriptions }
    }

    /// Number of attached handlers.
    #[must_use]
    pub fn handlers(&self) -> usize {
        self.subscriptions.len()
    }
}

impl std::fmt::Debug for SessionFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFeed")
            .field("handlers", &self.subscriptions.len())
            .finish()
    }
}

fn apply_balance(store: &SessionStore, event: &GridEvent) {
    if let GridEvent::BalanceReply { balance } = event {
        store.agent.write(|agent| agent.balance = *balance);
    }
}

fn apply_groups(store: &SessionStore, event: &GridEvent) {
    if let GridEvent::CurrentGroups { groups } = event {
        store.groups.write(|g| g.memberships.clone_from(groups));
    }
}

fn apply_group_leave(store: &SessionStore, event: &GridEvent) {
    if let GridEvent::GroupLeaveReply {
        group,
        success: true,
    } = event
    {
        store
            .groups
            .write(|g| g.memberships.retain(|m| m.id != *group));
    }
}

fn apply_parcel(store: &SessionStore, event: &GridEvent) {
    if let GridEvent::ParcelProperties {
        region,
        parcel: Some(parcel),
        ..
    } = event
    {
        store
            .parcels
            .write(|parcels| parcels.upsert(*region, parcel.clone()));
    }
}

fn apply_sim_parcels(store: &SessionStore, event: &GridEvent) {
    if let GridEvent::SimParcelsDownloaded { region, parcels } = event {
        store.network.write(|network| {
            if let Some(sim) = network.by_handle_mut(*region) {
                sim.parcel_map_complete = true;
            }
        });
        store.parcels.write(|known| {
            for parcel in parcels {
                known.upsert(*region, parcel.clone());
            }
        });
    }
}

fn apply_item_created(store: &SessionStore, event: &GridEvent) {
    let item = match event {
        GridEvent::ItemCreatedFromAsset {
            success: true,
            item: Some(item),
            ..
        }
        | GridEvent::ItemCreated {
            success: true,
            item: Some(item),
            ..
        } => item,
        _ => return,
    };
    debug!(item = %item.id, name = %item.name, "inventory item created");
    store.inventory.write(|inv| inv.insert_item(item.clone()));
}

fn apply_asset_uploaded(store: &SessionStore, event: &GridEvent) {
    let (item_id, asset_id) = match event {
        GridEvent::AssetUploaded {
            success: true,
            item_id,
            asset_id,
            ..
        }
        | GridEvent::ScriptUpdated {
            success: true,
            item_id,
            asset_id,
            ..
        } => (*item_id, *asset_id),
        _ => return,
    };
    store.inventory.write(|inv| {
        if let Some(item) = inv.item_mut(item_id) {
            item.asset_id = asset_id;
        }
    });
}

fn apply_object(store: &SessionStore, event: &GridEvent) {
    match event {
        GridEvent::ObjectUpdate { primitive } => {
            store.objects.write(|objects| objects.upsert(primitive.clone()));
        }
        GridEvent::ObjectKilled { region, local_id } => {
            store.objects.write(|objects| objects.remove(*region, *local_id));
        }
        GridEvent::ObjectProperties { region, names, .. } => {
            store.objects.write(|objects| {
                for (local_id, name) in names {
                    if let Some(prim) = objects.get_mut(*region, *local_id) {
                        prim.name = Some(name.clone());
                    }
                }
            });
        }
        _ => {}
    }
}

fn apply_simulator(store: &SessionStore, event: &GridEvent) {
    if let GridEvent::SimulatorConnected { simulator, current } = event {
        info!(region = %simulator.name, handle = %simulator.handle, "simulator connected");
        store.network.write(|network| {
            network.upsert(simulator.clone());
            if *current {
                network.current = Some(simulator.handle);
            }
        });
    }
}

/// Files the offer and settles it on a short-lived thread.
fn accept_later(
    store: &Arc<SessionStore>,
    offers: &Arc<OfferRegistry>,
    grid: &Arc<dyn Grid>,
    offer: InventoryOffer,
    timeout: Duration,
) {
    info!(
        offer = %offer.session,
        from = %offer.from_name,
        item = %offer.item_name,
        "inventory offer received"
    );
    let Some(ticket) = offers.register(offer.clone()) else {
        debug!(offer = %offer.session, "offer already pending; ignoring repeat");
        return;
    };
    let fallback = offer.clone();
    let store = Arc::clone(store);
    let registry = Arc::clone(offers);
    let sender = Arc::clone(grid);

    let spawned = thread::Builder::new()
        .name("waypost-offer".to_string())
        .spawn(move || {
            let (accept, folder) = match registry.await_decision(&ticket, timeout) {
                OfferDecision::Accept { folder } => {
                    let folder = folder.unwrap_or_else(|| {
                        store
                            .inventory
                            .read(|inv| inv.folder_for_type(offer.asset_kind))
                    });
                    (true, folder)
                }
                OfferDecision::Decline => (false, Uuid::nil()),
            };
            debug!(offer = %offer.session, accept, "inventory offer settled");
            sender.respond_to_offer(&offer, accept, folder);
        });

    if let Err(error) = spawned {
        warn!(%error, "could not start offer thread; declining");
        if offers.expire(fallback.session) {
            grid.respond_to_offer(&fallback, false, Uuid::nil());
        }
    }
}
