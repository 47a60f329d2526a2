//! Test fixtures and helpers.
//!
//! Pre-built snapshots and build locations for consistent testing. All
//! locations sit in the main base region.

use fixed::types::I32F32;
use producer_core::data::TypeCatalog;
use producer_core::snapshot::{BuildLocation, OwnUnit, PoweredLocation, TickSnapshot, WorkerCounts};
use producer_core::types::{RegionId, TilePosition, UnitId, UnitTypeId};
use producer_core::ProductionPlanner;

/// Frames a builder needs to reach any fixture location.
pub const BUILDER_FRAMES: i32 = 60;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// The bundled Protoss catalog.
///
/// # Panics
///
/// Panics if the bundled catalog fails to load.
#[must_use]
pub fn catalog() -> TypeCatalog {
    TypeCatalog::protoss().expect("bundled catalog loads")
}

/// A planner with the bundled catalog and default config.
///
/// # Panics
///
/// Panics if the bundled catalog fails to load.
#[must_use]
pub fn planner() -> ProductionPlanner {
    ProductionPlanner::protoss().expect("bundled catalog loads")
}

/// Look up a unit type by name.
///
/// # Panics
///
/// Panics if the catalog has no such unit.
#[must_use]
pub fn unit_type(catalog: &TypeCatalog, name: &str) -> UnitTypeId {
    catalog
        .unit_id(name)
        .unwrap_or_else(|| panic!("catalog has no unit named {name}"))
}

/// A completed, idle unit.
#[must_use]
pub fn unit(id: u32, unit_type: UnitTypeId) -> OwnUnit {
    OwnUnit {
        id: UnitId(id),
        unit_type,
        completed: true,
        base: None,
        tile: TilePosition::default(),
        remaining_train_time: 0,
        remaining_research_time: 0,
        last_command: None,
    }
}

/// An unpowered location in the main base.
#[must_use]
pub fn location(x: i32, y: i32, width: u8) -> BuildLocation {
    BuildLocation {
        tile: TilePosition::new(x, y),
        region: RegionId::MAIN_BASE,
        width,
        builder_frames: BUILDER_FRAMES,
        frames_until_powered: if width == 2 { 0 } else { i32::MAX },
        has_exit: true,
        distance_to_exit: 0,
        powers: Vec::new(),
    }
}

/// A location powered right now.
#[must_use]
pub fn powered(x: i32, y: i32, width: u8) -> BuildLocation {
    BuildLocation {
        frames_until_powered: 0,
        ..location(x, y, width)
    }
}

/// A power source site that powers one large and one medium location
/// next to it once a power source completes there.
#[must_use]
pub fn power_site(x: i32, y: i32) -> BuildLocation {
    let powers = [(x + 2, y, 4), (x, y + 3, 3)]
        .into_iter()
        .map(|(px, py, width)| PoweredLocation {
            tile: TilePosition::new(px, py),
            width,
            builder_frames: BUILDER_FRAMES,
            has_exit: true,
            distance_to_exit: 0,
        })
        .collect();
    BuildLocation {
        powers,
        ..location(x, y, 2)
    }
}

/// Opening position: a depot, four mining workers, 8/18 supply and a few
/// power source sites in the main base.
#[must_use]
pub fn opening_snapshot(catalog: &TypeCatalog, minerals: i32) -> TickSnapshot {
    let race = catalog.race();
    let mut units = vec![unit(1, race.resource_depot)];
    units.extend((2..6).map(|id| unit(id, race.worker)));
    TickSnapshot {
        minerals,
        supply_used: 8,
        supply_total: 18,
        workers: WorkerCounts {
            mineral: 4,
            ..WorkerCounts::default()
        },
        units,
        build_locations: (0..4).map(|i| power_site(i * 10, 0)).collect(),
        extractor_sites: vec![powered(40, 40, 4)],
        ..TickSnapshot::default()
    }
}

/// Mid-game position with a working economy: a depot, a gateway, a
/// cybernetics core and an assimilator already mining.
#[must_use]
pub fn midgame_snapshot(catalog: &TypeCatalog) -> TickSnapshot {
    let race = catalog.race();
    let mut snapshot = opening_snapshot(catalog, 600);
    snapshot.frame = 8_000;
    snapshot.gas = 200;
    snapshot.supply_used = 60;
    snapshot.supply_total = 86;
    snapshot.workers = WorkerCounts {
        mineral: 18,
        gas: 3,
        ..WorkerCounts::default()
    };
    snapshot.units.extend([
        unit(10, unit_type(catalog, "Protoss_Gateway")),
        unit(11, unit_type(catalog, "Protoss_Cybernetics_Core")),
        unit(12, race.refinery),
    ]);
    snapshot
        .build_locations
        .extend([powered(60, 0, 4), powered(60, 6, 4), powered(60, 12, 3)]);
    snapshot
}
