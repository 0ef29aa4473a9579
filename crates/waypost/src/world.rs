//! Starting state for a console session: a standard inventory layout, a
//! home region with flat terrain and open land, and some money.

use waypost_core::session::world::REGION_SIZE;
use waypost_core::session::{AgentState, InventoryStore, Parcel, ParcelFlags, Simulator};
use waypost_core::{AssetKind, GridEvent, RegionHandle, SessionStore, Uuid};
use waypost_grid::SimulatedGrid;

/// Handle of the home region.
pub const HOME: RegionHandle = RegionHandle(256_000);

/// Terrain height everywhere in the home region.
const GROUND: f32 = 20.0;

/// Folders every inventory starts with, with the kind each prefers.
const STANDARD_FOLDERS: &[(&str, AssetKind)] = &[
    ("Animations", AssetKind::Animation),
    ("Body Parts", AssetKind::Bodypart),
    ("Clothing", AssetKind::Clothing),
    ("Current Outfit", AssetKind::CurrentOutfit),
    ("Gestures", AssetKind::Gesture),
    ("Landmarks", AssetKind::Landmark),
    ("Notecards", AssetKind::Notecard),
    ("Objects", AssetKind::Object),
    ("Scripts", AssetKind::LslText),
    ("Sounds", AssetKind::Sound),
    ("Textures", AssetKind::Texture),
    ("Trash", AssetKind::Trash),
];

/// Session store with the standard folders and a named agent.
pub fn session_store(first_name: &str, last_name: &str) -> SessionStore {
    let mut inventory = InventoryStore::new();
    let root = inventory.root();
    for (name, kind) in STANDARD_FOLDERS {
        inventory.add_folder(root, *name, Some(*kind));
    }
    let agent = AgentState {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        ..AgentState::default()
    };
    SessionStore::new(inventory, agent)
}

/// Seeds the grid side and connects the session to the home region.
pub fn seed(grid: &SimulatedGrid, region: &str, balance: i64, upload_cost: i64) {
    #[allow(clippy::cast_precision_loss)]
    let edge = REGION_SIZE as f32;
    {
        let mut world = grid.world();
        world.balance = balance;
        world.upload_cost = upload_cost;
        world.parcels.insert(
            HOME,
            vec![Parcel {
                local_id: 1,
                name: format!("{region} Commons"),
                owner: Uuid::nil(),
                group: Uuid::nil(),
                group_owned: false,
                flags: ParcelFlags::CREATE_OBJECTS,
                min: (0.0, 0.0),
                max: (edge, edge),
            }],
        );
    }

    let mut simulator = Simulator::new(region, HOME);
    simulator.terrain = Some(vec![GROUND; REGION_SIZE * REGION_SIZE]);
    grid.publish_now(&GridEvent::SimulatorConnected {
        simulator,
        current: true,
    });
}
