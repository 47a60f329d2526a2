//! End-to-end planning scenarios.

use producer_core::prelude::*;
use producer_test_utils::fixtures::{catalog, midgame_snapshot, opening_snapshot, planner, unit, unit_type};

fn pylon_goal(planner: &ProductionPlanner, count: u32) -> ProductionGoal {
    UnitGoal::new(planner.catalog().race().supply_provider, count).into()
}

#[test]
fn test_supply_provider_with_bank_starts_immediately() {
    let planner = planner();
    let snapshot = TickSnapshot {
        minerals: 100,
        supply_used: 8,
        supply_total: 18,
        ..TickSnapshot::default()
    };
    let goal = UnitGoal::unlimited(planner.catalog().race().supply_provider);
    let goal = UnitGoal {
        count: Some(1),
        ..goal
    };

    let schedule = planner.plan(&snapshot, &[goal.into()], &[]);

    assert_eq!(schedule.items.len(), 1);
    assert_eq!(schedule.items[0].start, 0);
    assert_eq!(schedule.goals[0].committed, 1);
    assert_eq!(schedule.goals[0].blocked, None);
}

#[test]
fn test_supply_provider_gets_a_tile() {
    let planner = planner();
    let snapshot = opening_snapshot(&catalog(), 200);

    let schedule = planner.plan(&snapshot, &[pylon_goal(&planner, 1)], &[]);

    let pylon = &schedule.items[0];
    assert_eq!(pylon.start, 0);
    assert!(pylon.tile.is_some());
    // Travel to the site costs a few minerals of lost mining.
    assert!(pylon.mineral_price > 100);
}

#[test]
fn test_unit_without_producer_or_income_commits_nothing() {
    let planner = planner();
    let catalog = catalog();
    let mut snapshot = opening_snapshot(&catalog, 0);
    snapshot.workers = WorkerCounts::default();
    snapshot.units.retain(|u| u.unit_type == catalog.race().resource_depot);
    let zealot = unit_type(&catalog, "Protoss_Zealot");

    let schedule = planner.plan(&snapshot, &[UnitGoal::new(zealot, 1).into()], &[]);

    assert!(schedule.items.is_empty(), "{}", schedule.board());
    assert_eq!(schedule.goals[0].committed, 0);
    assert!(schedule.goals[0].blocked.is_some());
}

#[test]
fn test_second_supply_goal_reuses_first() {
    let planner = planner();
    let snapshot = opening_snapshot(&catalog(), 400);

    let schedule = planner.plan(
        &snapshot,
        &[pylon_goal(&planner, 1), pylon_goal(&planner, 1)],
        &[],
    );

    let pylon = ProductionType::Unit(planner.catalog().race().supply_provider);
    assert_eq!(schedule.items_of(pylon).count(), 1);
    assert_eq!(schedule.goals[0].committed, 1);
    assert_eq!(schedule.goals[1].committed, 1);
}

#[test]
fn test_larger_supply_goal_tops_up() {
    let planner = planner();
    let snapshot = opening_snapshot(&catalog(), 400);

    let schedule = planner.plan(
        &snapshot,
        &[pylon_goal(&planner, 1), pylon_goal(&planner, 2)],
        &[],
    );

    let pylon = ProductionType::Unit(planner.catalog().race().supply_provider);
    assert_eq!(schedule.items_of(pylon).count(), 2);
}

#[test]
fn test_gateway_waits_for_power() {
    let planner = planner();
    let catalog = catalog();
    let snapshot = opening_snapshot(&catalog, 400);
    let gateway = unit_type(&catalog, "Protoss_Gateway");

    let schedule = planner.plan(&snapshot, &[UnitGoal::new(gateway, 1).into()], &[]);

    let power = schedule
        .items_of(ProductionType::Unit(catalog.race().supply_provider))
        .next()
        .expect("power source planned");
    let building = schedule
        .items_of(ProductionType::Unit(gateway))
        .next()
        .expect("gateway planned");
    assert!(power.is_prerequisite);
    assert!(building.start >= power.completion, "{}", schedule.board());
    assert!(building.tile.is_some());
}

#[test]
fn test_dragoon_on_existing_gateway() {
    let planner = planner();
    let catalog = catalog();
    let snapshot = midgame_snapshot(&catalog);
    let dragoon = unit_type(&catalog, "Protoss_Dragoon");

    let schedule = planner.plan(&snapshot, &[UnitGoal::new(dragoon, 1).into()], &[]);

    let item = schedule.items_of(ProductionType::Unit(dragoon)).next().unwrap();
    assert_eq!(item.start, 0);
    assert_eq!(item.producer, Some(ProducerRef::Existing(UnitId(10))));
    assert_eq!(item.gas_price, 50);
}

#[test]
fn test_zealots_queue_on_one_gateway_when_limited() {
    let planner = planner();
    let catalog = catalog();
    let mut snapshot = midgame_snapshot(&catalog);
    snapshot.minerals = 1_000;
    let zealot = unit_type(&catalog, "Protoss_Zealot");
    let goal = UnitGoal::new(zealot, 2).with_producer_limit(1);

    let schedule = planner.plan(&snapshot, &[goal.into()], &[]);

    let starts: Vec<i32> = schedule
        .items_of(ProductionType::Unit(zealot))
        .map(|i| i.start)
        .collect();
    let build_time = catalog.unit(zealot).build_time;
    assert_eq!(starts, vec![0, build_time]);
}

#[test]
fn test_second_gateway_joins_existing_one() {
    let planner = planner();
    let catalog = catalog();
    let mut snapshot = midgame_snapshot(&catalog);
    snapshot.units.push(unit(13, unit_type(&catalog, "Protoss_Gateway")));
    snapshot.minerals = 1_000;
    let zealot = unit_type(&catalog, "Protoss_Zealot");

    let schedule = planner.plan(&snapshot, &[UnitGoal::new(zealot, 2).into()], &[]);

    let producers: Vec<_> = schedule
        .items_of(ProductionType::Unit(zealot))
        .map(|i| (i.start, i.producer))
        .collect();
    assert_eq!(
        producers,
        vec![
            (0, Some(ProducerRef::Existing(UnitId(10)))),
            (0, Some(ProducerRef::Existing(UnitId(13)))),
        ]
    );
}

#[test]
fn test_mineral_reservation_delays_goal() {
    let planner = planner();
    let snapshot = opening_snapshot(&catalog(), 50);
    let probe = planner.catalog().race().worker;
    let goals = [UnitGoal::new(probe, 1).into()];

    let free = planner.plan(&snapshot, &goals, &[]);
    let reserved = planner.plan(
        &snapshot,
        &goals,
        &[MineralReservation {
            amount: 50,
            desired_frame: 0,
        }],
    );

    assert_eq!(free.items[0].start, 0);
    assert!(reserved.items[0].start > 0);
}

#[test]
fn test_target_frame_pushes_start_back() {
    let planner = planner();
    let snapshot = opening_snapshot(&catalog(), 500);
    let probe = planner.catalog().race().worker;
    let goal = UnitGoal {
        target_frame: Some(1_000),
        ..UnitGoal::new(probe, 1)
    };

    let schedule = planner.plan(&snapshot, &[goal.into()], &[]);

    let build_time = planner.catalog().unit(probe).build_time;
    assert_eq!(schedule.items[0].start, 1_000 - build_time);
    assert_eq!(schedule.items[0].completion, 1_000);
}

#[test]
fn test_upgrade_being_researched_is_skipped() {
    let planner = planner();
    let catalog = catalog();
    let mut snapshot = midgame_snapshot(&catalog);
    let range = catalog.upgrade_id("Singularity_Charge").unwrap();
    snapshot.researching.insert(range);
    let goal = UpgradeGoal {
        upgrade: range,
        level: 1,
        prerequisite: None,
        target_frame: None,
    };

    let schedule = planner.plan(&snapshot, &[goal.into()], &[]);

    assert!(schedule.items.is_empty());
    assert!(schedule.goals[0].skipped);
}

#[test]
fn test_range_upgrade_researched_at_core() {
    let planner = planner();
    let catalog = catalog();
    let snapshot = midgame_snapshot(&catalog);
    let range = catalog.upgrade_id("Singularity_Charge").unwrap();
    let goal = UpgradeGoal {
        upgrade: range,
        level: 1,
        prerequisite: None,
        target_frame: None,
    };

    let schedule = planner.plan(&snapshot, &[goal.into()], &[]);

    let item = &schedule.items[0];
    assert_eq!(item.kind, ProductionType::Upgrade { upgrade: range, level: 1 });
    assert_eq!(item.producer, Some(ProducerRef::Existing(UnitId(11))));
}

#[test]
fn test_schedule_is_sorted_and_serializable() {
    let planner = planner();
    let catalog = catalog();
    let snapshot = opening_snapshot(&catalog, 600);
    let goals: Vec<ProductionGoal> = vec![
        UnitGoal::new(catalog.race().worker, 4).into(),
        UnitGoal::new(unit_type(&catalog, "Protoss_Gateway"), 1).into(),
        UnitGoal::new(unit_type(&catalog, "Protoss_Zealot"), 2).into(),
    ];

    let schedule = planner.plan(&snapshot, &goals, &[]);

    assert!(schedule
        .items
        .windows(2)
        .all(|w| (w[0].start, w[0].completion) <= (w[1].start, w[1].completion)));
    let bytes = schedule.to_bytes().unwrap();
    assert_eq!(Schedule::from_bytes(&bytes).unwrap(), schedule);
}

#[test]
fn test_unlimited_goal_adds_producers_when_existing_are_busy() {
    let planner = planner();
    let catalog = catalog();
    let mut snapshot = midgame_snapshot(&catalog);
    snapshot.minerals = 3_000;
    let gateway = unit_type(&catalog, "Protoss_Gateway");
    for unit in snapshot.units.iter_mut().filter(|u| u.unit_type == gateway) {
        unit.remaining_train_time = 5_000;
    }
    let zealot = unit_type(&catalog, "Protoss_Zealot");

    let schedule = planner.plan(&snapshot, &[UnitGoal::unlimited(zealot).into()], &[]);

    let zealots: Vec<_> = schedule.items_of(ProductionType::Unit(zealot)).collect();
    assert!(!zealots.is_empty(), "{}", schedule.board());
    assert!(zealots
        .iter()
        .all(|z| matches!(z.producer, Some(ProducerRef::Planned(_)))));
    assert!(schedule.items_of(ProductionType::Unit(gateway)).next().is_some());
    assert_eq!(schedule.goals[0].committed as usize, zealots.len());
}

fn without_refinery(catalog: &TypeCatalog, minerals: i32) -> TickSnapshot {
    let mut snapshot = midgame_snapshot(catalog);
    snapshot.units.retain(|u| u.unit_type != catalog.race().refinery);
    snapshot.minerals = minerals;
    snapshot.gas = 0;
    snapshot.workers.gas = 0;
    snapshot
}

#[test]
fn test_gas_shortfall_moves_mineral_workers() {
    let planner = planner();
    let catalog = catalog();
    let mut snapshot = midgame_snapshot(&catalog);
    snapshot.minerals = 2_000;
    snapshot.gas = 0;
    snapshot.workers.reassignable = 3;
    snapshot.extractor_sites.clear();
    let dragoon = unit_type(&catalog, "Protoss_Dragoon");

    let schedule = planner.plan(&snapshot, &[UnitGoal::new(dragoon, 1).into()], &[]);

    assert_eq!(schedule.gas_worker_delta, 3);
    // Three gas workers alone need about 235 frames for 50 gas; six need half that.
    let start = schedule.items_of(ProductionType::Unit(dragoon)).next().unwrap().start;
    assert!(start > 100 && start < 200, "start {start}");
}

#[test]
fn test_gas_shortfall_pulls_planned_refinery_earlier() {
    let catalog = catalog();
    let config = PlannerConfig {
        pull_refineries: false,
        ..PlannerConfig::default()
    };
    let planner = ProductionPlanner::new(catalog.clone(), config).unwrap();
    let snapshot = without_refinery(&catalog, 2_000);
    let refinery = catalog.race().refinery;
    let dragoon = unit_type(&catalog, "Protoss_Dragoon");
    let late_refinery = UnitGoal {
        target_frame: Some(snapshot.frame + 2_000),
        ..UnitGoal::new(refinery, 1)
    };

    let alone = planner.plan(&snapshot, &[late_refinery.clone().into()], &[]);
    assert_eq!(alone.items[0].start, 1_400);

    let goals = [late_refinery.into(), UnitGoal::new(dragoon, 1).into()];
    let schedule = planner.plan(&snapshot, &goals, &[]);

    let assimilators: Vec<_> = schedule.items_of(ProductionType::Unit(refinery)).collect();
    assert_eq!(assimilators.len(), 1, "{}", schedule.board());
    let dragoon = schedule.items_of(ProductionType::Unit(dragoon)).next().unwrap();
    assert_eq!(assimilators[0].start, 0);
    assert!(dragoon.start < 1_400, "{}", schedule.board());
    assert!(dragoon.start >= assimilators[0].completion);
}

#[test]
fn test_gas_shortfall_queues_refinery() {
    let planner = planner();
    let catalog = catalog();
    let snapshot = without_refinery(&catalog, 2_000);
    let refinery = catalog.race().refinery;
    let dragoon = unit_type(&catalog, "Protoss_Dragoon");

    let schedule = planner.plan(&snapshot, &[UnitGoal::new(dragoon, 1).into()], &[]);

    let assimilator = schedule
        .items_of(ProductionType::Unit(refinery))
        .next()
        .unwrap_or_else(|| panic!("no refinery queued\n{}", schedule.board()));
    assert!(assimilator.is_prerequisite);
    let dragoon = schedule.items_of(ProductionType::Unit(dragoon)).next().unwrap();
    assert!(dragoon.start >= assimilator.completion);
}
