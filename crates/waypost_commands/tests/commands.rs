//! Commands end to end against a simulated grid.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use waypost_commands::{execute, Dispatcher, ErrorCode, Params, Response, Session, WaypostConfig};
use waypost_core::grid::{AgentMatch, InventoryOffer};
use waypost_core::session::world::REGION_SIZE;
use waypost_core::session::{
    GroupMembership, GroupPowers, InventoryItem, Parcel, ParcelFlags, Primitive, Simulator,
    BUILTIN_ANIMATIONS,
};
use waypost_core::{
    AssetKind, DerezDestination, EventKind, Grid, GridEvent, Quaternion, RegionHandle,
    SessionStore, ShapeData, Uuid, Vector3, WearableType,
};
use waypost_grid::{GridRequest, SimulatedGrid};

const HOME: RegionHandle = RegionHandle(1000);
const BUILDERS: &str = "7a1b2c3d-0000-4000-8000-000000000001";
const GUESTS: &str = "7a1b2c3d-0000-4000-8000-000000000002";
const VAULT: &str = "7a1b2c3d-0000-4000-8000-000000000003";

fn config(timeout_ms: u64) -> WaypostConfig {
    WaypostConfig::from_toml(&format!(
        r#"
[session]
services_timeout_ms = {timeout_ms}
data_timeout_ms = {timeout_ms}
rebake_delay_ms = 50
upload_cost = 10
dispatch_workers = 1
queue_capacity = 1

[[groups]]
name = "Builders"
uuid = "{BUILDERS}"
permissions = ["movement", "economy", "land", "grooming", "inventory", "interact", "group"]

[[groups]]
name = "Guests"
uuid = "{GUESTS}"
permissions = ["movement"]

[[groups]]
name = "Vault"
uuid = "{VAULT}"
password = "hunter2"
permissions = ["economy"]
"#
    ))
    .unwrap()
}

struct Harness {
    grid: Arc<SimulatedGrid>,
    store: Arc<SessionStore>,
    session: Session,
}

impl Harness {
    fn new() -> Self {
        Self::with_timeout(2000)
    }

    fn with_timeout(timeout_ms: u64) -> Self {
        let grid = Arc::new(SimulatedGrid::new());
        let store = Arc::new(SessionStore::default());
        let session = Session::start(
            Arc::clone(&store),
            Arc::clone(&grid) as Arc<dyn Grid>,
            &config(timeout_ms),
        );
        grid.publish_now(&GridEvent::SimulatorConnected {
            simulator: Simulator::new("Ahern", HOME),
            current: true,
        });
        Self {
            grid,
            store,
            session,
        }
    }

    fn run(&self, command: &str, group: &str, pairs: &[(&str, &str)]) -> Response {
        let mut all = vec![("command", command), ("group", group)];
        all.extend_from_slice(pairs);
        execute(self.session.context(), Params::from_pairs(all))
    }

    fn add_primitive(&self, local_id: u32, name: &str, position: Vector3) -> Uuid {
        let primitive = Primitive {
            id: Uuid::new_v4(),
            local_id,
            region: HOME,
            name: Some(name.to_string()),
            position,
            rotation: Quaternion::IDENTITY,
            scale: Vector3::new(1.0, 1.0, 1.0),
            shape: ShapeData::BOX,
        };
        let id = primitive.id;
        self.grid.publish_now(&GridEvent::ObjectUpdate { primitive });
        id
    }

    fn add_parcel(&self, owner: Uuid, group: Uuid, flags: ParcelFlags) {
        self.grid.world().parcels.insert(
            HOME,
            vec![Parcel {
                local_id: 1,
                name: "Plaza".to_string(),
                owner,
                group,
                group_owned: false,
                flags,
                min: (0.0, 0.0),
                max: (256.0, 256.0),
            }],
        );
    }
}

fn builders() -> Uuid {
    BUILDERS.parse().unwrap()
}

fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

fn assert_error(response: &Response, code: ErrorCode) {
    assert_eq!(response.error(), Some(code), "{}", response.encode());
}

// -----------------------------------------------------------------------------
// Dispatch and authentication
// -----------------------------------------------------------------------------

#[test]
fn test_unknown_command_and_missing_group() {
    let h = Harness::new();
    assert_error(&h.run("teleport", "Builders", &[]), ErrorCode::UnknownCommand);

    let response = execute(
        h.session.context(),
        Params::from_pairs([("command", "getbalance")]),
    );
    assert_error(&response, ErrorCode::NoGroupSpecified);
}

#[test]
fn test_unconfigured_group_is_denied() {
    let h = Harness::new();
    assert_error(&h.run("getbalance", "Strangers", &[]), ErrorCode::AccessDenied);
    assert_eq!(h.grid.count_requests(|r| *r == GridRequest::Balance), 0);
}

#[test]
fn test_group_password() {
    let h = Harness::new();
    h.grid.world().balance = 5;
    assert_error(&h.run("getbalance", "Vault", &[]), ErrorCode::AccessDenied);
    assert_error(
        &h.run("getbalance", "Vault", &[("password", "guess")]),
        ErrorCode::AccessDenied,
    );
    let response = h.run("getbalance", VAULT, &[("password", "hunter2")]);
    assert_eq!(response.field("data"), Some("5"));
}

#[test]
fn test_permission_denial_leaves_store_untouched() {
    let h = Harness::new();
    let folder = h.store.inventory.write(|inv| {
        let root = inv.root();
        let outfit = inv.add_folder(root, "Casual", None);
        inv.insert_item(
            InventoryItem::new(outfit, "Shirt", AssetKind::Clothing).wearing(WearableType::Shirt),
        );
        outfit
    });

    let response = h.run("changeappearance", "Guests", &[("folder", &folder.to_string())]);
    assert_error(&response, ErrorCode::NoPermission);
    assert!(h.store.appearance.read(|a| a.worn.is_empty()));
    assert_eq!(
        h.grid
            .count_requests(|r| matches!(r, GridRequest::ReplaceOutfit(_))),
        0
    );

    let response = h.run(
        "upload",
        "Guests",
        &[("name", "Note"), ("type", "notecard"), ("data", "aGk=")],
    );
    assert_error(&response, ErrorCode::NoPermission);
    assert!(h.grid.requests().is_empty());
}

#[test]
fn test_dispatcher_round_trip_and_full_queue() {
    let h = Harness::new();
    h.grid.world().balance = 42;
    let dispatcher = Dispatcher::start(Arc::clone(h.session.context()));

    let response = dispatcher.call(Params::decode("command=getbalance&group=Builders"));
    assert_eq!(response.encode(), "command=getbalance&success=True&data=42");

    // One worker, one queue slot, slow replies: a burst must overflow.
    h.grid.delay(EventKind::BalanceReply, Duration::from_millis(200));
    let outcomes: Vec<_> = (0..8)
        .map(|_| dispatcher.submit(Params::decode("command=getbalance&group=Builders")))
        .collect();
    let refused = outcomes
        .iter()
        .filter(|outcome| {
            outcome
                .as_ref()
                .err()
                .is_some_and(|e| e.code() == ErrorCode::CommandQueueFull)
        })
        .count();
    assert!(refused >= 1);
    assert_eq!(dispatcher.rejected(), refused as u64);

    for receiver in outcomes.into_iter().flatten() {
        assert!(receiver.recv().unwrap().success());
    }
}

// -----------------------------------------------------------------------------
// Balance and groups
// -----------------------------------------------------------------------------

#[test]
fn test_getbalance_updates_store() {
    let h = Harness::new();
    h.grid.world().balance = 250;
    let response = h.run("getbalance", "builders", &[]);
    assert_eq!(response.field("data"), Some("250"));
    assert_eq!(h.store.agent.read(|a| a.balance), 250);
}

#[test]
fn test_concurrent_balance_requests_both_succeed() {
    let h = Harness::new();
    h.grid.world().balance = 64;
    h.grid.delay(EventKind::BalanceReply, Duration::from_millis(100));

    let callers: Vec<_> = (0..2)
        .map(|_| {
            let ctx = Arc::clone(h.session.context());
            thread::spawn(move || {
                execute(
                    &ctx,
                    Params::decode("command=getbalance&group=Builders"),
                )
            })
        })
        .collect();

    for caller in callers {
        let response = caller.join().unwrap();
        assert_eq!(response.field("data"), Some("64"), "{}", response.encode());
    }
    assert_eq!(h.grid.count_requests(|r| *r == GridRequest::Balance), 2);
}

#[test]
fn test_getbalance_timeout() {
    let h = Harness::with_timeout(100);
    h.grid.suppress(EventKind::BalanceReply);
    let started = Instant::now();
    assert_error(&h.run("getbalance", "Builders", &[]), ErrorCode::TimeoutGettingBalance);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_leave_group() {
    let h = Harness::new();
    h.grid.world().groups.push(GroupMembership {
        id: builders(),
        name: "Builders".to_string(),
        powers: GroupPowers::empty(),
    });

    let response = h.run("leave", "Builders", &[]);
    assert!(response.success(), "{}", response.encode());
    assert!(h.grid.world().groups.is_empty());
    wait_until("store to drop the group", || {
        h.store.groups.read(|g| g.get(builders()).is_none())
    });

    assert_error(&h.run("leave", "Builders", &[]), ErrorCode::GroupNotFound);
}

#[test]
fn test_leave_refused_by_grid() {
    let h = Harness::new();
    {
        let mut world = h.grid.world();
        world.groups.push(GroupMembership {
            id: builders(),
            name: "Builders".to_string(),
            powers: GroupPowers::empty(),
        });
        world.sticky_groups.insert(builders());
    }
    assert_error(&h.run("leave", "Builders", &[]), ErrorCode::CouldNotLeaveGroup);
}

// -----------------------------------------------------------------------------
// Lure, derez, rez
// -----------------------------------------------------------------------------

#[test]
fn test_lure_by_name() {
    let h = Harness::new();
    let friend = Uuid::new_v4();
    h.grid.world().directory.push(AgentMatch {
        id: friend,
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
    });

    let response = h.run(
        "lure",
        "Guests",
        &[("firstname", "ada"), ("lastname", "lovelace"), ("message", "come over")],
    );
    assert!(response.success(), "{}", response.encode());
    assert_eq!(
        h.grid.count_requests(|r| *r
            == GridRequest::TeleportLure {
                agent: friend,
                message: "come over".to_string(),
            }),
        1
    );

    let response = h.run("lure", "Guests", &[("firstname", "No"), ("lastname", "Body")]);
    assert_error(&response, ErrorCode::AgentNotFound);
}

#[test]
fn test_derez_defaults_to_objects_folder() {
    let h = Harness::new();
    let objects = h
        .store
        .inventory
        .write(|inv| inv.add_folder(inv.root(), "Objects", Some(AssetKind::Object)));
    h.add_primitive(7, "Chair", Vector3::new(2.0, 2.0, 0.0));

    let response = h.run("derez", "Builders", &[("item", "Chair")]);
    assert!(response.success(), "{}", response.encode());
    assert_eq!(
        h.grid.count_requests(|r| *r
            == GridRequest::Derez {
                local_id: 7,
                destination: DerezDestination::AgentInventoryTake,
                folder: objects,
            }),
        1
    );
}

#[test]
fn test_derez_rejects_item_as_folder() {
    let h = Harness::new();
    let note = h.store.inventory.write(|inv| {
        inv.insert_item(InventoryItem::new(inv.root(), "Note", AssetKind::Notecard))
    });
    h.add_primitive(7, "Chair", Vector3::ZERO);

    let response = h.run(
        "derez",
        "Builders",
        &[("item", "Chair"), ("folder", &note.to_string())],
    );
    assert_error(&response, ErrorCode::FolderNotFound);
    assert!(h.grid.requests().is_empty());

    let response = h.run("derez", "Builders", &[("item", "Table")]);
    assert_error(&response, ErrorCode::PrimitiveNotFound);
}

#[test]
fn test_rez_on_open_land() {
    let h = Harness::new();
    let item = h.store.inventory.write(|inv| {
        inv.insert_item(InventoryItem::new(inv.root(), "Lamp", AssetKind::Object))
    });
    h.add_parcel(Uuid::new_v4(), Uuid::nil(), ParcelFlags::CREATE_OBJECTS);

    let response = h.run(
        "rez",
        "Builders",
        &[("item", "Lamp"), ("position", "<10, 20, 30>")],
    );
    assert!(response.success(), "{}", response.encode());
    let rezzed: Vec<_> = h
        .grid
        .requests()
        .into_iter()
        .filter_map(|r| match r {
            GridRequest::Rez(request) => Some(request),
            _ => None,
        })
        .collect();
    assert_eq!(rezzed.len(), 1);
    assert_eq!(rezzed[0].item, item);
    assert_eq!(rezzed[0].position, Vector3::new(10.0, 20.0, 30.0));
    assert_eq!(rezzed[0].group, builders());
}

#[test]
fn test_rez_constraints() {
    let h = Harness::new();
    h.store.inventory.write(|inv| {
        inv.insert_item(InventoryItem::new(inv.root(), "Lamp", AssetKind::Object));
    });
    h.add_parcel(Uuid::new_v4(), Uuid::nil(), ParcelFlags::CREATE_OBJECTS);

    let response = h.run(
        "rez",
        "Builders",
        &[("item", "Lamp"), ("position", "<10, 20, 5000>")],
    );
    assert_error(&response, ErrorCode::PositionWouldExceedMaximumRezAltitude);

    let response = h.run("rez", "Builders", &[("item", "Lamp"), ("position", "up")]);
    assert_error(&response, ErrorCode::InvalidPosition);

    let response = h.run("rez", "Builders", &[("item", "Ghost"), ("position", "<1,1,1>")]);
    assert_error(&response, ErrorCode::InventoryItemNotFound);
    assert_eq!(h.grid.count_requests(|r| matches!(r, GridRequest::Rez(_))), 0);
}

#[test]
fn test_rez_on_restricted_land_needs_group_power() {
    let h = Harness::new();
    h.store.inventory.write(|inv| {
        inv.insert_item(InventoryItem::new(inv.root(), "Lamp", AssetKind::Object));
    });
    let args = [("item", "Lamp"), ("position", "<1, 1, 1>")];

    // Someone else's land, someone else's group.
    h.add_parcel(Uuid::new_v4(), Uuid::new_v4(), ParcelFlags::empty());
    assert_error(&h.run("rez", "Builders", &args), ErrorCode::NoGroupPowerForCommand);

    // Our group's land, but no rez power.
    h.add_parcel(Uuid::new_v4(), builders(), ParcelFlags::empty());
    h.grid.world().groups.push(GroupMembership {
        id: builders(),
        name: "Builders".to_string(),
        powers: GroupPowers::empty(),
    });
    assert_error(&h.run("rez", "Builders", &args), ErrorCode::NoGroupPowerForCommand);

    h.grid.world().groups[0].powers = GroupPowers::ALLOW_REZ;
    let response = h.run("rez", "Builders", &args);
    assert!(response.success(), "{}", response.encode());
}

// -----------------------------------------------------------------------------
// Inventory offers
// -----------------------------------------------------------------------------

fn offer() -> InventoryOffer {
    InventoryOffer {
        session: Uuid::new_v4(),
        from_name: "Grace Hopper".to_string(),
        from_agent: Uuid::new_v4(),
        object: Uuid::new_v4(),
        item_name: "Manual".to_string(),
        asset_kind: AssetKind::Notecard,
        message: String::new(),
    }
}

#[test]
fn test_offer_answered_exactly_once() {
    let h = Harness::new();
    let folder = h
        .store
        .inventory
        .write(|inv| inv.add_folder(inv.root(), "Inbox", None));
    let offer = offer();
    h.grid.publish_now(&GridEvent::InventoryOffered {
        offer: offer.clone(),
    });
    let session = offer.session.to_string();

    let response = h.run(
        "replytoinventoryoffer",
        "Builders",
        &[("session", &session), ("action", "Accept"), ("folder", "Inbox")],
    );
    assert!(response.success(), "{}", response.encode());
    wait_until("offer response", || {
        h.grid.count_requests(|r| matches!(r, GridRequest::OfferResponse { .. })) == 1
    });
    assert_eq!(
        h.grid.requests().last(),
        Some(&GridRequest::OfferResponse {
            offer: offer.session,
            accept: true,
            folder,
        })
    );

    let again = h.run(
        "replytoinventoryoffer",
        "Builders",
        &[("session", &session), ("action", "decline")],
    );
    assert_error(&again, ErrorCode::InventoryOfferNotFound);
}

#[test]
fn test_offer_reply_validation() {
    let h = Harness::new();
    let offer = offer();
    h.grid.publish_now(&GridEvent::InventoryOffered {
        offer: offer.clone(),
    });
    let session = offer.session.to_string();

    assert_error(
        &h.run("replytoinventoryoffer", "Builders", &[("action", "accept")]),
        ErrorCode::NoSessionSpecified,
    );
    assert_error(
        &h.run(
            "replytoinventoryoffer",
            "Builders",
            &[("session", &session), ("action", "maybe")],
        ),
        ErrorCode::UnknownAction,
    );
    // Still pending after a rejected reply.
    assert!(h.session.context().offers.peek(offer.session).is_some());
}

// -----------------------------------------------------------------------------
// Appearance
// -----------------------------------------------------------------------------

#[test]
fn test_change_appearance_relinks_current_outfit() {
    let h = Harness::new();
    let (shirt, shape, old_skin, old_shape, current) = h.store.inventory.write(|inv| {
        let root = inv.root();
        let current = inv.add_folder(root, "Current Outfit", Some(AssetKind::CurrentOutfit));
        let closet = inv.add_folder(root, "Closet", None);
        let old_skin = inv.insert_item(
            InventoryItem::new(closet, "Old Skin", AssetKind::Bodypart).wearing(WearableType::Skin),
        );
        let old_shape = inv.insert_item(
            InventoryItem::new(closet, "Old Shape", AssetKind::Bodypart)
                .wearing(WearableType::Shape),
        );
        let old_pants = inv.insert_item(
            InventoryItem::new(closet, "Old Pants", AssetKind::Clothing)
                .wearing(WearableType::Pants),
        );
        for target in [old_skin, old_shape, old_pants] {
            let mut link = InventoryItem::new(current, "link", AssetKind::Link);
            link.link_target = Some(target);
            inv.insert_item(link);
        }

        let casual = inv.add_folder(root, "Casual", None);
        let shirt = inv.insert_item(
            InventoryItem::new(casual, "Shirt", AssetKind::Clothing).wearing(WearableType::Shirt),
        );
        let shape = inv.insert_item(
            InventoryItem::new(closet, "Slim Shape", AssetKind::Bodypart)
                .wearing(WearableType::Shape),
        );
        let mut shape_link = InventoryItem::new(casual, "Slim Shape", AssetKind::Link);
        shape_link.link_target = Some(shape);
        inv.insert_item(shape_link);
        inv.insert_item(InventoryItem::new(casual, "Readme", AssetKind::Notecard));
        (shirt, shape, old_skin, old_shape, current)
    });
    let dance = Uuid::new_v4();
    let stand = BUILTIN_ANIMATIONS
        .iter()
        .find(|(name, _)| *name == "stand")
        .map(|(_, id)| *id)
        .unwrap();
    h.store.agent.write(|a| a.animations.extend([stand, dance]));

    let response = h.run(
        "changeappearance",
        "Builders",
        &[("folder", "/Casual"), ("deanimate", "True")],
    );
    assert!(response.success(), "{}", response.encode());

    let worn = h.store.appearance.read(|a| a.worn.clone());
    assert_eq!(worn, vec![shirt, shape]);
    assert_eq!(h.store.agent.read(|a| a.animations.clone()), vec![stand]);
    assert_eq!(
        h.grid
            .count_requests(|r| matches!(r, GridRequest::StopAnimation(_))),
        1
    );
    assert_eq!(
        h.grid
            .count_requests(|r| *r == GridRequest::StopAnimation(dance)),
        1
    );

    let targets: Vec<Uuid> = h.store.inventory.read(|inv| {
        inv.children(current)
            .iter()
            .filter_map(|id| inv.item(*id))
            .filter_map(|link| link.link_target)
            .collect()
    });
    assert!(targets.contains(&old_skin));
    assert!(!targets.contains(&old_shape));
    assert!(targets.contains(&shirt));
    assert!(targets.contains(&shape));
    assert_eq!(targets.len(), 3);
    assert!(h
        .store
        .inventory
        .read(|inv| inv.folder(current).is_some_and(|f| f.needs_update)));

    wait_until("rebake", || {
        h.grid.count_requests(|r| *r == GridRequest::Rebake) == 1
    });
}

#[test]
fn test_change_appearance_needs_wearables() {
    let h = Harness::new();
    h.store.inventory.write(|inv| {
        let empty = inv.add_folder(inv.root(), "Empty", None);
        inv.insert_item(InventoryItem::new(empty, "Readme", AssetKind::Notecard));
    });
    assert_error(
        &h.run("changeappearance", "Builders", &[("folder", "Empty")]),
        ErrorCode::NoEquipableItems,
    );
    assert_error(
        &h.run("changeappearance", "Builders", &[]),
        ErrorCode::NoFolderSpecified,
    );
}

// -----------------------------------------------------------------------------
// Terrain and primitives
// -----------------------------------------------------------------------------

#[test]
fn test_terrain_heights_x_major() {
    let h = Harness::new();
    let mut simulator = Simulator::new("Ahern", HOME);
    #[allow(clippy::cast_precision_loss)]
    let terrain = (0..REGION_SIZE * REGION_SIZE)
        .map(|i| ((i % REGION_SIZE) * 10 + i / REGION_SIZE) as f32)
        .collect();
    simulator.terrain = Some(terrain);
    h.grid.publish_now(&GridEvent::SimulatorConnected {
        simulator,
        current: true,
    });

    let response = h.run(
        "getterrainheight",
        "Builders",
        &[("southwest", "<1, 0, 0>"), ("northeast", "<0, 1, 0>")],
    );
    assert_eq!(response.field("data"), Some("0,1,10,11"));
    assert_eq!(
        h.grid
            .count_requests(|r| *r == GridRequest::AllSimParcels(HOME)),
        1
    );

    // The parcel map is now complete; no second download.
    h.run("getterrainheight", "Builders", &[("northeast", "<0, 0, 0>")]);
    assert_eq!(
        h.grid
            .count_requests(|r| *r == GridRequest::AllSimParcels(HOME)),
        1
    );
}

#[test]
fn test_terrain_unknown_heights_and_timeout() {
    let h = Harness::with_timeout(100);
    let response = h.run(
        "getterrainheight",
        "Builders",
        &[("southwest", "<254.6, 255, 0>")],
    );
    assert_eq!(response.field("data"), Some("-1"));

    let h = Harness::with_timeout(100);
    h.grid.suppress(EventKind::SimParcelsDownloaded);
    assert_error(
        &h.run("getterrainheight", "Builders", &[]),
        ErrorCode::TimeoutGettingParcels,
    );
    assert_error(
        &h.run("getterrainheight", "Builders", &[("region", "Nowhere")]),
        ErrorCode::RegionNotFound,
    );
}

#[test]
fn test_set_primitive_scale() {
    let h = Harness::new();
    h.add_primitive(3, "Crate", Vector3::new(1.0, 1.0, 1.0));

    let response = h.run(
        "setprimitivescale",
        "Builders",
        &[("item", "Crate"), ("scale", "<2, 2, 0.5>"), ("uniform", "false")],
    );
    assert!(response.success(), "{}", response.encode());
    assert_eq!(
        h.grid.count_requests(|r| *r
            == GridRequest::SetScale {
                region: HOME,
                local_id: 3,
                scale: Vector3::new(2.0, 2.0, 0.5),
                uniform: false,
            }),
        1
    );

    assert_error(
        &h.run(
            "setprimitivescale",
            "Builders",
            &[("item", "Crate"), ("scale", "<100, 1, 1>")],
        ),
        ErrorCode::ScaleWouldExceedBuildingConstraints,
    );
    assert_error(
        &h.run("setprimitivescale", "Builders", &[("item", "Crate")]),
        ErrorCode::InvalidScale,
    );
    assert_error(
        &h.run("setprimitivescale", "Guests", &[("item", "Crate"), ("scale", "<1,1,1>")]),
        ErrorCode::NoPermission,
    );
}

#[test]
fn test_set_primitive_shape_data() {
    let h = Harness::new();
    h.add_primitive(4, "Ball", Vector3::ZERO);

    let response = h.run(
        "setprimitiveshapedata",
        "Builders",
        &[("item", "Ball"), ("type", "sphere"), ("data", "PathBegin,0.25,Sparkle,1")],
    );
    assert!(response.success(), "{}", response.encode());
    let shapes: Vec<ShapeData> = h
        .grid
        .requests()
        .into_iter()
        .filter_map(|r| match r {
            GridRequest::SetShape { shape, .. } => Some(shape),
            _ => None,
        })
        .collect();
    let mut expected = ShapeData::preset("sphere").unwrap();
    expected.path_begin = 0.25;
    assert_eq!(shapes, vec![expected]);

    assert_error(
        &h.run(
            "setprimitiveshapedata",
            "Builders",
            &[("item", "Ball"), ("data", "PathBegin,lots")],
        ),
        ErrorCode::InvalidShapeData,
    );
}

// -----------------------------------------------------------------------------
// Uploads
// -----------------------------------------------------------------------------

fn fields(response: &Response) -> Vec<String> {
    let data = response.field("data").unwrap_or_default();
    data.split(',').map(str::to_string).collect()
}

#[test]
fn test_landmark_upload_returns_item_and_asset() {
    let h = Harness::new();
    let landmarks = h
        .store
        .inventory
        .write(|inv| inv.add_folder(inv.root(), "Landmarks", Some(AssetKind::Landmark)));
    let data = STANDARD.encode(b"region Ahern 128 128 20");

    let response = h.run(
        "upload",
        "Builders",
        &[("name", "Home"), ("type", "landmark"), ("data", &data)],
    );
    assert!(response.success(), "{}", response.encode());
    let fields = fields(&response);
    assert_eq!(fields[0], "item");
    assert_eq!(fields[2], "asset");
    let item: Uuid = fields[1].parse().unwrap();
    let asset: Uuid = fields[3].parse().unwrap();

    wait_until("item in store", || {
        h.store.inventory.read(|inv| inv.item(item).is_some())
    });
    assert!(h.store.assets.read(|a| a.contains(asset)));
    assert!(h.grid.world().assets.contains_key(&asset));
    assert!(h
        .store
        .inventory
        .read(|inv| inv.folder(landmarks).is_some_and(|f| f.needs_update)));
}

#[test]
fn test_charged_upload_checks_funds() {
    let h = Harness::new();
    let data = STANDARD.encode([0u8; 16]);
    let args = [("name", "Logo"), ("type", "texture"), ("data", data.as_str())];

    h.grid.world().balance = 5;
    assert_error(&h.run("upload", "Builders", &args), ErrorCode::InsufficientFunds);
    assert_eq!(
        h.grid
            .count_requests(|r| matches!(r, GridRequest::CreateItemFromAsset(_))),
        0
    );

    {
        let mut world = h.grid.world();
        world.balance = 100;
        world.upload_cost = 10;
    }
    let response = h.run("upload", "Builders", &args);
    assert!(response.success(), "{}", response.encode());
    assert_eq!(h.grid.world().balance, 90);
}

#[test]
fn test_reupload_with_wrong_kind_is_item_not_found() {
    let h = Harness::new();
    h.store.inventory.write(|inv| {
        inv.insert_item(InventoryItem::new(inv.root(), "Greeter", AssetKind::LslText));
    });
    let response = h.run(
        "upload",
        "Builders",
        &[
            ("name", "Greeter"),
            ("type", "notecard"),
            ("item", "Greeter"),
            ("data", "aGk="),
        ],
    );
    assert_error(&response, ErrorCode::InventoryItemNotFound);
    assert!(h.grid.requests().is_empty());
}

#[test]
fn test_notecard_upload_into_existing_item() {
    let h = Harness::new();
    let note = h.store.inventory.write(|inv| {
        inv.insert_item(InventoryItem::new(inv.root(), "Rules", AssetKind::Notecard))
    });
    let data = STANDARD.encode("No running.");
    let response = h.run(
        "upload",
        "Builders",
        &[("name", "Rules"), ("type", "notecard"), ("item", "Rules"), ("data", &data)],
    );
    assert!(response.success(), "{}", response.encode());
    assert_eq!(fields(&response)[1], note.to_string());
    assert_eq!(
        h.grid
            .count_requests(|r| *r == GridRequest::UploadNotecard(note)),
        2
    );
    assert_eq!(
        h.grid
            .count_requests(|r| matches!(r, GridRequest::CreateItem(_))),
        0
    );
}

#[test]
fn test_script_compile_errors_are_reported() {
    let h = Harness::new();
    h.grid.world().script_errors = Some(vec!["(1, 2) : ERROR : Syntax error".to_string()]);
    let data = STANDARD.encode("default { state_entry() { oops } }");

    let response = h.run(
        "upload",
        "Builders",
        &[("name", "Broken"), ("type", "lsltext"), ("data", &data), ("mono", "false")],
    );
    assert!(response.success(), "{}", response.encode());
    assert!(response.field("data").unwrap().starts_with("error,"));
    assert_eq!(
        h.grid
            .count_requests(|r| matches!(r, GridRequest::UpdateScript { mono: false, .. })),
        1
    );
}

#[test]
fn test_wearable_upload_needs_wearable_type() {
    let h = Harness::new();
    let data = STANDARD.encode("shirt");
    assert_error(
        &h.run(
            "upload",
            "Builders",
            &[("name", "Tee"), ("type", "clothing"), ("data", &data), ("wear", "cape")],
        ),
        ErrorCode::UnknownWearableType,
    );

    let response = h.run(
        "upload",
        "Builders",
        &[("name", "Tee"), ("type", "clothing"), ("data", &data), ("wear", "shirt")],
    );
    assert!(response.success(), "{}", response.encode());
    let created: Vec<_> = h
        .grid
        .requests()
        .into_iter()
        .filter_map(|r| match r {
            GridRequest::CreateItem(request) => Some(request),
            _ => None,
        })
        .collect();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].wearable, Some(WearableType::Shirt));
}

#[test]
fn test_upload_parameter_errors() {
    let h = Harness::new();
    assert_error(
        &h.run("upload", "Builders", &[("type", "sound"), ("data", "aGk=")]),
        ErrorCode::NoNameProvided,
    );
    assert_error(
        &h.run("upload", "Builders", &[("name", "x"), ("type", "folder"), ("data", "aGk=")]),
        ErrorCode::UnknownAssetType,
    );
    assert_error(
        &h.run("upload", "Builders", &[("name", "x"), ("type", "sound"), ("data", "***")]),
        ErrorCode::InvalidAssetData,
    );

    h.grid.world().reject_uploads = true;
    assert_error(
        &h.run("upload", "Builders", &[("name", "x"), ("type", "sound"), ("data", "aGk=")]),
        ErrorCode::AssetUploadFailed,
    );
}

#[test]
fn test_upload_timeout() {
    let h = Harness::with_timeout(100);
    h.grid.suppress(EventKind::AssetUploaded);
    let response = h.run(
        "upload",
        "Builders",
        &[("name", "Wave"), ("type", "gesture"), ("data", "aGk=")],
    );
    assert_error(&response, ErrorCode::TimeoutUploadingAsset);
}
