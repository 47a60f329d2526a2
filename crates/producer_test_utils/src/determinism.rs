//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the scheduler produces identical
//! schedules given identical inputs.
//!
//! # Testing Strategy
//!
//! Plans are compared across runs, threads and serialization. Sources of
//! non-determinism include:
//!
//! - **Floating-point math**: Rates are fixed-point via
//!   [`producer_core::math::Fixed`].
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   The planner only iterates ordered collections.
//!
//! - **Leaked state between ticks**: Nothing survives a tick except what
//!   the collaborators report back.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use producer_core::goals::{MineralReservation, ProductionGoal};
use producer_core::schedule::Schedule;
use producer_core::snapshot::TickSnapshot;
use producer_core::ProductionPlanner;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic planner).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that planning was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Planner is non-deterministic!\n\
                 Runs: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a computation multiple times and verify its hash never changes.
///
/// # Example
///
/// ```ignore
/// use producer_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(5, || planner.plan(&snapshot, &goals, &[]), Schedule::state_hash);
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Run, HashFn>(runs: usize, run: Run, hash: HashFn) -> DeterminismResult
where
    Run: Fn() -> S,
    HashFn: Fn(&S) -> u64,
{
    let hashes: Vec<u64> = (0..runs).map(|_| hash(&run())).collect();
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
    }
}

/// Plan the same tick `runs` times and compare schedule hashes.
pub fn verify_plan_determinism(
    planner: &ProductionPlanner,
    snapshot: &TickSnapshot,
    goals: &[ProductionGoal],
    reservations: &[MineralReservation],
    runs: usize,
) -> DeterminismResult {
    verify_determinism(
        runs,
        || planner.plan(snapshot, goals, reservations),
        Schedule::state_hash,
    )
}

/// Plan the same tick on `threads` scoped threads and collect the hashes.
///
/// # Panics
///
/// Panics if a planning thread panics.
pub fn plan_in_parallel(
    planner: &ProductionPlanner,
    snapshot: &TickSnapshot,
    goals: &[ProductionGoal],
    threads: usize,
) -> DeterminismResult {
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| s.spawn(|| planner.plan(snapshot, goals, &[]).state_hash()))
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
    }
}

/// Verify that a bincode round-trip preserves the schedule exactly.
pub fn verify_serialization_determinism(schedule: &Schedule) -> bool {
    let Ok(bytes) = schedule.to_bytes() else {
        return false;
    };
    let Ok(restored) = Schedule::from_bytes(&bytes) else {
        return false;
    };
    restored.state_hash() == schedule.state_hash() && &restored == schedule
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for scheduler inputs.
///
/// Generated snapshots always contain a completed depot, a few workers and
/// a handful of power source sites, so goals have somewhere to go.
pub mod strategies {
    use proptest::prelude::*;

    use producer_core::data::TypeCatalog;
    use producer_core::goals::{ProductionGoal, UnitGoal};
    use producer_core::snapshot::{TickSnapshot, WorkerCounts};

    use crate::fixtures::{opening_snapshot, power_site, unit};

    /// Names of unit types goals are drawn from.
    pub const GOAL_UNITS: [&str; 7] = [
        "Protoss_Probe",
        "Protoss_Zealot",
        "Protoss_Dragoon",
        "Protoss_Pylon",
        "Protoss_Gateway",
        "Protoss_Assimilator",
        "Protoss_Cybernetics_Core",
    ];

    /// An opening-like snapshot with varied bank, supply and workforce.
    pub fn arb_snapshot(catalog: &TypeCatalog) -> impl Strategy<Value = TickSnapshot> {
        let base = opening_snapshot(catalog, 0);
        let worker = catalog.race().worker;
        (0i32..1_500, 0i32..300, 4i32..30, 0usize..6, 2i32..20).prop_map(
            move |(minerals, gas, workers, sites, free_supply)| {
                let mut snapshot = base.clone();
                snapshot.minerals = minerals;
                snapshot.gas = gas;
                snapshot.workers = WorkerCounts {
                    mineral: workers,
                    ..WorkerCounts::default()
                };
                let first_extra = snapshot.units.len() as u32 + 1;
                snapshot
                    .units
                    .extend((0..workers.saturating_sub(4) as u32).map(|i| unit(first_extra + i, worker)));
                snapshot.supply_used = workers * 2;
                snapshot.supply_total = (workers * 2 + free_supply).min(400);
                snapshot
                    .build_locations
                    .extend((0..sites as i32).map(|i| power_site(i * 10, 20)));
                snapshot
            },
        )
    }

    /// One goal for a small number of units of a common type.
    pub fn arb_goal(catalog: &TypeCatalog) -> impl Strategy<Value = ProductionGoal> {
        let types: Vec<_> = GOAL_UNITS.iter().filter_map(|n| catalog.unit_id(n)).collect();
        (prop::sample::select(types), 1u32..4).prop_map(|(unit_type, count)| {
            ProductionGoal::Unit(UnitGoal::new(unit_type, count))
        })
    }

    /// A prioritized goal list.
    pub fn arb_goals(catalog: &TypeCatalog) -> impl Strategy<Value = Vec<ProductionGoal>> {
        prop::collection::vec(arb_goal(catalog), 1..6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{catalog, opening_snapshot, planner};
    use producer_core::goals::UnitGoal;

    #[test]
    fn test_opening_plan_is_deterministic() {
        let planner = planner();
        let race = *planner.catalog().race();
        let snapshot = opening_snapshot(&catalog(), 300);
        let goals: Vec<ProductionGoal> = vec![
            UnitGoal::new(race.worker, 3).into(),
            UnitGoal::new(race.supply_provider, 1).into(),
        ];

        verify_plan_determinism(&planner, &snapshot, &goals, &[], 4).assert_deterministic();
        plan_in_parallel(&planner, &snapshot, &goals, 4).assert_deterministic();
    }

    #[test]
    fn test_schedule_survives_serialization() {
        let planner = planner();
        let race = *planner.catalog().race();
        let snapshot = opening_snapshot(&catalog(), 300);
        let schedule = planner.plan(&snapshot, &[UnitGoal::new(race.worker, 2).into()], &[]);

        assert!(verify_serialization_determinism(&schedule));
    }

    #[test]
    fn test_compute_hash_is_stable() {
        assert_eq!(compute_hash(&(1, "a")), compute_hash(&(1, "a")));
    }
}
