//! Commands issued through the collaborators.

use producer_core::prelude::*;
use producer_test_utils::fixtures::{
    catalog, midgame_snapshot, opening_snapshot, planner, powered, unit, unit_type,
};
use producer_test_utils::world::FakeWorld;

#[test]
fn test_due_probe_is_trained() {
    let planner = planner();
    let snapshot = opening_snapshot(&catalog(), 50);
    let probe = planner.catalog().race().worker;
    let mut world = FakeWorld::from_snapshot(&snapshot);

    let report = planner.plan_tick(&mut world.collaborators(), &[UnitGoal::new(probe, 1).into()], &[]);

    assert!(report.commands.contains(&IssuedCommand::Train {
        producer: UnitId(1),
        unit_type: probe,
    }));
    assert_eq!(world.units.trained, vec![(UnitId(1), probe)]);
}

#[test]
fn test_later_items_are_not_issued() {
    let planner = planner();
    let snapshot = opening_snapshot(&catalog(), 50);
    let probe = planner.catalog().race().worker;
    let mut world = FakeWorld::from_snapshot(&snapshot);

    let report = planner.plan_tick(&mut world.collaborators(), &[UnitGoal::new(probe, 2).into()], &[]);

    assert_eq!(report.schedule.items.len(), 2);
    assert_eq!(world.units.trained.len(), 1);
}

#[test]
fn test_refused_order_is_not_reported() {
    let planner = planner();
    let snapshot = opening_snapshot(&catalog(), 50);
    let probe = planner.catalog().race().worker;
    let mut world = FakeWorld::from_snapshot(&snapshot);
    world.units.accept_orders = false;

    let report = planner.plan_tick(&mut world.collaborators(), &[UnitGoal::new(probe, 1).into()], &[]);

    assert!(!report
        .commands
        .iter()
        .any(|c| matches!(c, IssuedCommand::Train { .. })));
}

#[test]
fn test_due_building_is_handed_to_builder() {
    let planner = planner();
    let snapshot = opening_snapshot(&catalog(), 200);
    let pylon = planner.catalog().race().supply_provider;
    let mut world = FakeWorld::from_snapshot(&snapshot);
    world.builder.builder = Some((UnitId(2), 0));

    let report = planner.plan_tick(&mut world.collaborators(), &[UnitGoal::new(pylon, 1).into()], &[]);

    let tile = report.schedule.items[0].tile.unwrap();
    assert_eq!(world.builder.orders.len(), 1);
    let order = &world.builder.orders[0];
    assert_eq!(order.unit_type, pylon);
    assert_eq!(order.tile, tile);
    assert_eq!(order.worker, Some(UnitId(2)));
    assert_eq!(order.frame, snapshot.frame);
}

#[test]
fn test_research_uses_research_order() {
    let planner = planner();
    let catalog = catalog();
    let snapshot = midgame_snapshot(&catalog);
    let range = catalog.upgrade_id("Singularity_Charge").unwrap();
    let mut world = FakeWorld::from_snapshot(&snapshot);
    let goal = UpgradeGoal {
        upgrade: range,
        level: 1,
        prerequisite: None,
        target_frame: None,
    };

    let report = planner.plan_tick(&mut world.collaborators(), &[goal.into()], &[]);

    let expected = if catalog.upgrade(range).is_tech {
        IssuedCommand::Research {
            producer: UnitId(11),
            upgrade: range,
        }
    } else {
        IssuedCommand::Upgrade {
            producer: UnitId(11),
            upgrade: range,
        }
    };
    assert!(report.commands.contains(&expected), "{:?}", report.commands);
    assert_eq!(world.units.researched, vec![(UnitId(11), range)]);
}

#[test]
fn test_queued_building_with_ready_builder_is_released() {
    let planner = planner();
    let catalog = catalog();
    let mut snapshot = opening_snapshot(&catalog, 0);
    snapshot.pending_buildings.push(PendingBuilding {
        id: PendingBuildingId(7),
        unit_type: unit_type(&catalog, "Protoss_Pylon"),
        tile: TilePosition::new(0, 0),
        frames_until_started: 100,
        frames_until_completed: 550,
        construction_started: false,
        unit: None,
        desired_start_frame: 100,
        builder_ready: true,
    });
    let mut world = FakeWorld::from_snapshot(&snapshot);

    let report = planner.plan_tick(&mut world.collaborators(), &[], &[]);

    assert!(report.commands.contains(&IssuedCommand::ClearDesiredStart {
        pending: PendingBuildingId(7)
    }));
    assert_eq!(world.builder.released, vec![PendingBuildingId(7)]);
    // Nothing new is handed to the builder.
    assert!(world.builder.orders.is_empty());
}

#[test]
fn test_gas_worker_delta_always_sent() {
    let planner = planner();
    let snapshot = opening_snapshot(&catalog(), 0);
    let mut world = FakeWorld::from_snapshot(&snapshot);

    let report = planner.plan_tick(&mut world.collaborators(), &[], &[]);

    assert_eq!(report.commands.last(), Some(&IssuedCommand::GasWorkers { delta: 0 }));
    assert_eq!(world.economy.gas_worker_delta, Some(0));
}

#[test]
fn test_queued_building_behind_earlier_unit_is_not_released() {
    let planner = planner();
    let catalog = catalog();
    let gateway = unit_type(&catalog, "Protoss_Gateway");
    let mut snapshot = opening_snapshot(&catalog, 400);
    snapshot.pending_buildings.push(PendingBuilding {
        id: PendingBuildingId(7),
        unit_type: gateway,
        tile: TilePosition::new(60, 0),
        frames_until_started: 200,
        frames_until_completed: 200 + catalog.unit(gateway).build_time,
        construction_started: false,
        unit: None,
        desired_start_frame: 500,
        builder_ready: true,
    });
    let worker = catalog.race().worker;
    let mut world = FakeWorld::from_snapshot(&snapshot);

    let report = planner.plan_tick(&mut world.collaborators(), &[UnitGoal::new(worker, 1).into()], &[]);

    let first = &report.schedule.items[0];
    assert_eq!((first.kind, first.start), (ProductionType::Unit(worker), 0));
    assert!(world.builder.released.is_empty());
    assert!(!report
        .commands
        .iter()
        .any(|c| matches!(c, IssuedCommand::ClearDesiredStart { .. })));
}

fn gas_tech_snapshot() -> TickSnapshot {
    let catalog = catalog();
    let mut snapshot = opening_snapshot(&catalog, 1_000);
    snapshot.gas = 200;
    snapshot.units.push(unit(10, unit_type(&catalog, "Protoss_Gateway")));
    snapshot
        .build_locations
        .extend([powered(60, 0, 3), powered(60, 6, 4)]);
    snapshot.extractor_sites.clear();
    snapshot
}

#[test]
fn test_gas_tech_prerequisite_waits_for_refinery() {
    let planner = planner();
    let catalog = catalog();
    let core = unit_type(&catalog, "Protoss_Cybernetics_Core");
    let dragoon = unit_type(&catalog, "Protoss_Dragoon");
    let goals = [UnitGoal::new(dragoon, 1).into()];

    let snapshot = gas_tech_snapshot();
    let mut world = FakeWorld::from_snapshot(&snapshot);
    world.builder.builder = Some((UnitId(2), 0));
    let report = planner.plan_tick(&mut world.collaborators(), &goals, &[]);

    let planned = report.schedule.items_of(ProductionType::Unit(core)).next().unwrap();
    assert_eq!(planned.start, 0);
    assert!(planned.is_prerequisite);
    assert!(!world.builder.orders.iter().any(|o| o.unit_type == core));

    let mut snapshot = gas_tech_snapshot();
    snapshot.units.push(unit(12, catalog.race().refinery));
    let mut world = FakeWorld::from_snapshot(&snapshot);
    world.builder.builder = Some((UnitId(2), 0));
    planner.plan_tick(&mut world.collaborators(), &goals, &[]);

    assert!(world.builder.orders.iter().any(|o| o.unit_type == core));
}

#[test]
fn test_reassigned_gas_workers_are_requested() {
    let planner = planner();
    let catalog = catalog();
    let mut snapshot = midgame_snapshot(&catalog);
    snapshot.minerals = 2_000;
    snapshot.gas = 0;
    snapshot.workers.reassignable = 3;
    snapshot.extractor_sites.clear();
    let dragoon = unit_type(&catalog, "Protoss_Dragoon");
    let mut world = FakeWorld::from_snapshot(&snapshot);

    let report = planner.plan_tick(&mut world.collaborators(), &[UnitGoal::new(dragoon, 1).into()], &[]);

    assert_eq!(report.commands.last(), Some(&IssuedCommand::GasWorkers { delta: 3 }));
    assert_eq!(world.economy.gas_worker_delta, Some(3));
}
