//! Properties every schedule must hold, over generated openings and goals.

use producer_core::prelude::*;
use producer_test_utils::determinism::strategies::{arb_goals, arb_snapshot};
use producer_test_utils::determinism::verify_plan_determinism;
use producer_test_utils::fixtures::{catalog, planner};
use proptest::prelude::*;

/// Mined per worker per frame, in ten-thousandths.
const RATE_E4: i64 = 465;

fn completed_types(snapshot: &TickSnapshot) -> Vec<UnitTypeId> {
    snapshot
        .units
        .iter()
        .filter(|u| u.completed)
        .map(|u| u.unit_type)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_schedule_sorted_by_start_then_completion(
        (snapshot, goals) in (arb_snapshot(&catalog()), arb_goals(&catalog()))
    ) {
        let schedule = planner().plan(&snapshot, &goals, &[]);
        for pair in schedule.items.windows(2) {
            prop_assert!((pair[0].start, pair[0].completion) <= (pair[1].start, pair[1].completion));
        }
    }

    #[test]
    fn prop_replanning_is_deterministic(
        (snapshot, goals) in (arb_snapshot(&catalog()), arb_goals(&catalog()))
    ) {
        let planner = planner();
        let result = verify_plan_determinism(&planner, &snapshot, &goals, &[], 3);
        prop_assert!(result.is_deterministic, "hashes {:?}", result.hashes);
        let first = planner.plan(&snapshot, &goals, &[]);
        let second = planner.plan(&snapshot, &goals, &[]);
        prop_assert_eq!(first.to_bytes().unwrap(), second.to_bytes().unwrap());
    }

    #[test]
    fn prop_supply_cap_never_exceeded(
        (snapshot, goals) in (arb_snapshot(&catalog()), arb_goals(&catalog()))
    ) {
        let planner = planner();
        let schedule = planner.plan(&snapshot, &goals, &[]);
        let used: i32 = schedule.items.iter().map(|i| i.supply_required).sum();
        prop_assert!(snapshot.supply_used + used <= planner.config().supply_cap);
    }

    #[test]
    fn prop_items_start_inside_window(
        (snapshot, goals) in (arb_snapshot(&catalog()), arb_goals(&catalog()))
    ) {
        let schedule = planner().plan(&snapshot, &goals, &[]);
        for item in &schedule.items {
            prop_assert!(item.start >= 0);
            prop_assert!(item.start < schedule.window);
            prop_assert!(item.completion >= item.start);
        }
    }

    #[test]
    fn prop_spending_never_outruns_income(
        (snapshot, goals) in (arb_snapshot(&catalog()), arb_goals(&catalog()))
    ) {
        let planner = planner();
        let worker = planner.catalog().race().worker;
        let schedule = planner.plan(&snapshot, &goals, &[]);

        let new_workers = schedule.items_of(ProductionType::Unit(worker)).count() as i64;
        let max_workers = i64::from(snapshot.workers.mineral) + new_workers;
        let mut spent = 0i64;
        for item in &schedule.items {
            spent += i64::from(item.mineral_price);
            let income_e4 = RATE_E4 * max_workers * i64::from(item.start + 1);
            prop_assert!(
                spent * 10_000 <= i64::from(snapshot.minerals) * 10_000 + income_e4,
                "spent {} by frame {}\n{}", spent, item.start, schedule.board()
            );
        }
    }

    #[test]
    fn prop_missing_buildings_complete_before_dependents(
        (snapshot, goals) in (arb_snapshot(&catalog()), arb_goals(&catalog()))
    ) {
        let planner = planner();
        let catalog = planner.catalog();
        let schedule = planner.plan(&snapshot, &goals, &[]);
        let existing = completed_types(&snapshot);

        for item in &schedule.items {
            for &required in catalog.requirements(item.kind) {
                if existing.contains(&required) {
                    continue;
                }
                let ready = schedule
                    .items_of(ProductionType::Unit(required))
                    .any(|r| r.completion <= item.start);
                prop_assert!(ready, "{} has no {:?} in time\n{}", item.label, required, schedule.board());
            }
            if let Some(ProducerRef::Planned(sequence)) = item.producer {
                let producer = schedule.items.get(sequence as usize);
                prop_assert!(producer.is_some_and(|p| p.completion <= item.start));
            }
        }
    }
}
