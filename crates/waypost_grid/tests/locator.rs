//! Reference resolution against a live (simulated) session.

use std::sync::Arc;
use std::time::Duration;

use waypost_core::grid::AgentMatch;
use waypost_core::session::{InventoryItem, Parcel, ParcelFlags, Primitive, Simulator};
use waypost_core::{
    AgentReference, AssetKind, Bridge, EntityKind, Grid, GridEvent, LocateError, Locator,
    OfferRegistry, Quaternion, RegionHandle, SessionFeed, SessionStore, ShapeData, Uuid, Vector3,
};
use waypost_grid::{GridRequest, SimulatedGrid};

const TIMEOUT: Duration = Duration::from_secs(2);
const HOME: RegionHandle = RegionHandle(1000);

struct Session {
    grid: Arc<SimulatedGrid>,
    store: Arc<SessionStore>,
    bridge: Bridge,
    _feed: SessionFeed,
}

impl Session {
    fn new() -> Self {
        let grid = Arc::new(SimulatedGrid::new());
        let store = Arc::new(SessionStore::default());
        let feed = SessionFeed::start(
            Arc::clone(&store),
            Arc::new(OfferRegistry::new()),
            Arc::clone(&grid) as Arc<dyn Grid>,
            TIMEOUT,
        );
        grid.publish_now(&GridEvent::SimulatorConnected {
            simulator: Simulator::new("Ahern", HOME),
            current: true,
        });
        let bridge = Bridge::new(Arc::clone(grid.events()));
        Self {
            grid,
            store,
            bridge,
            _feed: feed,
        }
    }

    fn locator(&self) -> Locator<'_> {
        Locator::new(&self.store, self.grid.as_ref(), &self.bridge, TIMEOUT)
    }

    fn add_primitive(&self, local_id: u32, name: Option<&str>, position: Vector3) -> Uuid {
        let primitive = Primitive {
            id: Uuid::new_v4(),
            local_id,
            region: HOME,
            name: name.map(str::to_string),
            position,
            rotation: Quaternion::IDENTITY,
            scale: Vector3::new(1.0, 1.0, 1.0),
            shape: ShapeData::BOX,
        };
        let id = primitive.id;
        self.grid.publish_now(&GridEvent::ObjectUpdate { primitive });
        id
    }
}

#[test]
fn test_locate_by_id_despite_name_collisions() {
    let session = Session::new();
    let (first, second) = session.store.inventory.write(|inv| {
        let root = inv.root();
        let a = inv.insert_item(InventoryItem::new(root, "Lamp", AssetKind::Object));
        let b = inv.insert_item(InventoryItem::new(root, "Lamp", AssetKind::Object));
        (a, b)
    });

    let locator = session.locator();
    assert_eq!(locator.find_item(&second.to_string()).unwrap().id, second);
    // By name the first in traversal order wins.
    assert_eq!(locator.find_item("Lamp").unwrap().id, first);
}

#[test]
fn test_first_pattern_match_in_traversal_order() {
    let session = Session::new();
    let expected = session.store.inventory.write(|inv| {
        let root = inv.root();
        let outfits = inv.add_folder(root, "Outfits", None);
        let hit = inv.insert_item(InventoryItem::new(outfits, "Red Dress", AssetKind::Clothing));
        inv.insert_item(InventoryItem::new(root, "Blue Dress", AssetKind::Clothing));
        hit
    });

    let found = session.locator().find_item("^.* dress$").unwrap();
    assert_eq!(found.id, expected);
}

#[test]
fn test_kind_specific_not_found() {
    let session = Session::new();
    session.store.inventory.write(|inv| {
        let root = inv.root();
        inv.add_folder(root, "Scripts", Some(AssetKind::LslText));
        inv.insert_item(InventoryItem::new(root, "Greeter", AssetKind::LslText));
    });

    let locator = session.locator();
    assert_eq!(
        locator.find_folder("Greeter"),
        Err(LocateError::not_found(EntityKind::Folder, "Greeter"))
    );
    assert_eq!(
        locator.find_item("Scripts").unwrap_err().kind(),
        EntityKind::Item
    );
    assert_eq!(
        locator.find_item("Nothing").unwrap_err().kind(),
        EntityKind::Item
    );
}

#[test]
fn test_paths_resolve_exactly_without_fallback() {
    let session = Session::new();
    let chair = session.store.inventory.write(|inv| {
        let root = inv.root();
        let objects = inv.add_folder(root, "Objects", Some(AssetKind::Object));
        let furniture = inv.add_folder(objects, "Furniture", None);
        inv.insert_item(InventoryItem::new(furniture, "Chair", AssetKind::Object))
    });

    let locator = session.locator();
    assert_eq!(locator.find_item("/Objects/Furniture/Chair").unwrap().id, chair);
    assert_eq!(locator.find_item("Objects/Furniture/Chair").unwrap().id, chair);
    assert!(locator.find_item("/objects/furniture/chair").is_err());
    assert!(locator.find_item("/Objects/Chair").is_err());
    assert!(locator.find_folder("/Objects/Furniture").is_ok());
}

#[test]
fn test_primitive_range_and_name_rescan() {
    let session = Session::new();
    session.add_primitive(1, Some("Far Lamp"), Vector3::new(200.0, 200.0, 20.0));
    let unnamed = session.add_primitive(2, None, Vector3::new(3.0, 4.0, 0.0));
    session
        .grid
        .world()
        .object_names
        .insert((HOME, 2), "Near Lamp".to_string());

    let locator = session.locator();
    assert_eq!(
        locator.find_primitive("Far Lamp", 10.0).unwrap_err().kind(),
        EntityKind::Primitive
    );
    assert_eq!(locator.find_primitive("Near Lamp", 10.0).unwrap().id, unnamed);
    assert_eq!(
        session
            .grid
            .count_requests(|r| matches!(r, GridRequest::ObjectProperties { .. })),
        1
    );
}

#[test]
fn test_simulator_lookup() {
    let session = Session::new();
    let locator = session.locator();
    assert_eq!(locator.find_simulator("").unwrap().handle, HOME);
    assert_eq!(locator.find_simulator("AHERN").unwrap().handle, HOME);
    assert_eq!(
        locator.find_simulator("Nowhere").unwrap_err().kind(),
        EntityKind::Simulator
    );
}

#[test]
fn test_agent_by_name() {
    let session = Session::new();
    let ada = Uuid::new_v4();
    session.grid.world().directory.push(AgentMatch {
        id: ada,
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
    });

    let locator = session.locator();
    assert_eq!(
        locator.find_agent(AgentReference::Name {
            first: "ada",
            last: "lovelace"
        }),
        Ok(ada)
    );
    assert_eq!(
        locator
            .find_agent(AgentReference::Name {
                first: "Grace",
                last: "Hopper"
            })
            .unwrap_err()
            .kind(),
        EntityKind::Agent
    );
}

#[test]
fn test_parcel_query() {
    let session = Session::new();
    session.grid.world().parcels.insert(
        HOME,
        vec![Parcel {
            local_id: 4,
            name: "Plaza".to_string(),
            owner: Uuid::new_v4(),
            group: Uuid::nil(),
            group_owned: false,
            flags: ParcelFlags::CREATE_OBJECTS,
            min: (0.0, 0.0),
            max: (64.0, 64.0),
        }],
    );

    let locator = session.locator();
    let parcel = locator
        .find_parcel(HOME, Vector3::new(10.0, 10.0, 22.0))
        .unwrap();
    assert_eq!(parcel.name, "Plaza");
    // The feed recorded it too.
    assert_eq!(session.store.parcels.read(|p| p.region(HOME).len()), 1);

    assert_eq!(
        locator
            .find_parcel(HOME, Vector3::new(100.0, 100.0, 0.0))
            .unwrap_err()
            .kind(),
        EntityKind::Parcel
    );
}
