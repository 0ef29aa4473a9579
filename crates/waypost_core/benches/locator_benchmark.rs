//! # Locator Benchmark
//!
//! Reference resolution over a large inventory, one case per stage.
//!
//! Run with: `cargo bench --package waypost_core`

// Benchmarks don't need strict docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;

use waypost_core::grid::{CreateItemRequest, InventoryOffer, ItemUpload, RezRequest};
use waypost_core::session::{AgentState, InventoryItem, InventoryStore};
use waypost_core::{
    AssetKind, Bridge, DerezDestination, EventHub, Grid, Locator, RegionHandle, SessionStore,
    ShapeData, Uuid, Vector3,
};

/// Grid that never answers; inventory lookups need no round trips.
struct IdleGrid {
    hub: Arc<EventHub>,
}

impl Grid for IdleGrid {
    fn events(&self) -> &Arc<EventHub> {
        &self.hub
    }
    fn request_balance(&self) {}
    fn request_current_groups(&self) {}
    fn leave_group(&self, _: Uuid) {}
    fn request_all_sim_parcels(&self, _: RegionHandle) {}
    fn request_parcel_properties(&self, _: Uuid, _: RegionHandle, _: Vector3) {}
    fn request_derez(&self, _: u32, _: DerezDestination, _: Uuid, _: Uuid) {}
    fn request_rez(&self, _: RezRequest) {}
    fn create_item_from_asset(&self, _: CreateItemRequest, _: Vec<u8>) {}
    fn create_item(&self, _: CreateItemRequest) {}
    fn upload_asset(&self, _: AssetKind, _: &[u8]) -> Uuid {
        Uuid::nil()
    }
    fn upload_notecard(&self, _: ItemUpload) {}
    fn upload_gesture(&self, _: ItemUpload) {}
    fn update_script(&self, _: ItemUpload, _: bool) {}
    fn send_teleport_lure(&self, _: Uuid, _: &str) {}
    fn set_scale(&self, _: RegionHandle, _: u32, _: Vector3, _: bool) {}
    fn set_shape(&self, _: RegionHandle, _: u32, _: ShapeData) {}
    fn stop_animation(&self, _: Uuid) {}
    fn replace_outfit(&self, _: &[Uuid]) {}
    fn request_rebake(&self) {}
    fn search_agent(&self, _: Uuid, _: &str, _: &str) {}
    fn request_object_properties(&self, _: Uuid, _: RegionHandle, _: &[u32]) {}
    fn respond_to_offer(&self, _: &InventoryOffer, _: bool, _: Uuid) {}
}

/// Inventory with `folders` folders of 50 items each.
fn build_inventory(folders: usize) -> (InventoryStore, Uuid) {
    let mut inv = InventoryStore::new();
    let root = inv.root();
    let mut last = Uuid::nil();
    for f in 0..folders {
        let folder = inv.add_folder(root, format!("Folder {f}"), None);
        for i in 0..50 {
            last = inv.insert_item(InventoryItem::new(
                folder,
                format!("Item {f}-{i}"),
                AssetKind::Object,
            ));
        }
    }
    (inv, last)
}

fn bench_locate(c: &mut Criterion) {
    let mut group = c.benchmark_group("locate_item");

    for folders in [10, 100, 400] {
        let (inventory, last) = build_inventory(folders);
        let store = SessionStore::new(inventory, AgentState::default());
        let grid = IdleGrid {
            hub: EventHub::new(),
        };
        let bridge = Bridge::new(Arc::clone(grid.events()));
        let locator = Locator::new(&store, &grid, &bridge, Duration::from_millis(1));

        let id = last.to_string();
        let tail = format!("Item {}-49", folders - 1);
        let path = format!("/Folder {}/Item {}-49", folders - 1, folders - 1);

        group.bench_with_input(BenchmarkId::new("identifier", folders), &id, |b, r| {
            b.iter(|| black_box(locator.find_item(r)));
        });
        group.bench_with_input(BenchmarkId::new("name", folders), &tail, |b, r| {
            b.iter(|| black_box(locator.find_item(r)));
        });
        group.bench_with_input(BenchmarkId::new("path", folders), &path, |b, r| {
            b.iter(|| black_box(locator.find_item(r)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_locate);
criterion_main!(benches);
