//! Turning the near end of the schedule into commands.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::collaborators::Collaborators;
use crate::producers::ProducerSource;
use crate::scheduler::PlanningPass;
use crate::data::TypeCatalog;
use crate::types::{
    PendingBuildingId, ProductionType, TilePosition, UnitId, UnitTypeId, UpgradeTypeId,
};

/// A command sent to a collaborator this tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssuedCommand {
    /// Train a unit.
    Train {
        /// Producer.
        producer: UnitId,
        /// Unit type.
        unit_type: UnitTypeId,
    },
    /// Research a tech.
    Research {
        /// Producer.
        producer: UnitId,
        /// Tech.
        upgrade: UpgradeTypeId,
    },
    /// Research an upgrade level.
    Upgrade {
        /// Producer.
        producer: UnitId,
        /// Upgrade.
        upgrade: UpgradeTypeId,
    },
    /// Hand a building to the builder.
    Build {
        /// Building type.
        unit_type: UnitTypeId,
        /// Placement.
        tile: TilePosition,
        /// Worker set aside for it, if any.
        worker: Option<UnitId>,
        /// Absolute frame to place it on.
        frame: i32,
        /// Builder-side id.
        pending: PendingBuildingId,
    },
    /// Let a queued building go ahead as soon as possible.
    ClearDesiredStart {
        /// Builder-side id.
        pending: PendingBuildingId,
    },
    /// Desired change in gas workers.
    GasWorkers {
        /// Workers to move from minerals to gas.
        delta: i32,
    },
}

impl PlanningPass<'_> {
    /// Issue everything due within the remaining command latency.
    pub(crate) fn issue_commands(&self, world: &mut Collaborators<'_>) -> Vec<IssuedCommand> {
        let catalog = self.catalog;
        let snapshot = self.snapshot;
        let race = *catalog.race();
        let due = snapshot.remaining_latency_frames;
        let mut commands = Vec::new();
        let mut build_gas_delta = 0;
        let mut refinery_queued =
            snapshot.count_all(race.refinery) > 0 || world.builder.pending_of_type(race.refinery) > 0;

        self.clear_first_unbuilt(world, &mut commands);

        for id in self.state.committed.to_vec() {
            let item = self.state.items.get(id);
            let travel = item.build_location.as_ref().map_or(0, |l| l.builder_frames);
            if item.is_queued() || item.start > due + travel {
                continue;
            }

            match item.kind {
                ProductionType::Unit(unit_type) if catalog.unit(unit_type).is_building => {
                    let unit = catalog.unit(unit_type);
                    let Some(location) = item.build_location.as_ref() else {
                        warn!(building = %unit.name, "due building has no location");
                        continue;
                    };
                    let tile = location.tile;
                    if unit.is_gas_tech && item.is_prerequisite && !refinery_queued {
                        debug!(building = %unit.name, "waiting for refinery before gas tech");
                        continue;
                    }
                    if world.builder.is_pending_here(tile) {
                        continue;
                    }

                    let (worker, travel) = match item.builder {
                        Some(worker) => (Some(worker), travel),
                        None => match world.builder.builder_unit(tile, unit_type) {
                            Some((worker, arrival)) => (Some(worker), arrival),
                            None => (None, travel),
                        },
                    };
                    if item.start - travel > due {
                        continue;
                    }

                    let frame = snapshot.frame + item.start;
                    let pending = world.builder.build(unit_type, tile, worker, frame);
                    debug!(building = %unit.name, %tile, frame, "build issued");
                    commands.push(IssuedCommand::Build {
                        unit_type,
                        tile,
                        worker,
                        frame,
                        pending,
                    });
                    if unit_type == race.refinery {
                        refinery_queued = true;
                        build_gas_delta += self.config.workers_per_refinery;
                    }
                }
                kind => {
                    if item.start > due {
                        continue;
                    }
                    let Some(producer) = item.producer else {
                        continue;
                    };
                    let ProducerSource::Existing(unit) = self.state.producers.get(producer).source
                    else {
                        continue;
                    };
                    if let Some(command) = Self::issue_production(world, kind, unit, catalog) {
                        debug!(?command, "production issued");
                        commands.push(command);
                    }
                }
            }
        }

        let delta = self.state.gas_worker_delta + build_gas_delta;
        world.economy.set_desired_gas_worker_delta(delta);
        commands.push(IssuedCommand::GasWorkers { delta });
        commands
    }

    fn issue_production(
        world: &mut Collaborators<'_>,
        kind: ProductionType,
        producer: UnitId,
        catalog: &TypeCatalog,
    ) -> Option<IssuedCommand> {
        match kind {
            ProductionType::Unit(unit_type) => world
                .units
                .train(producer, unit_type)
                .then_some(IssuedCommand::Train {
                    producer,
                    unit_type,
                }),
            ProductionType::Upgrade { upgrade, .. } if catalog.upgrade(upgrade).is_tech => world
                .units
                .research(producer, upgrade)
                .then_some(IssuedCommand::Research { producer, upgrade }),
            ProductionType::Upgrade { upgrade, .. } => world
                .units
                .upgrade(producer, upgrade)
                .then_some(IssuedCommand::Upgrade { producer, upgrade }),
        }
    }

    /// When the first unit or building not yet under way is a queued
    /// building whose builder is at the site, let it go ahead without
    /// waiting for its planned frame.
    fn clear_first_unbuilt(&self, world: &mut Collaborators<'_>, commands: &mut Vec<IssuedCommand>) {
        let first = self
            .state
            .committed
            .ids()
            .map(|id| self.state.items.get(id))
            .filter(|i| i.kind.unit().is_some())
            .find(|i| !(i.is_queued() && i.construction_started));
        let Some(pending) = first.and_then(|i| i.in_progress) else {
            return;
        };
        let ready = self
            .snapshot
            .pending_buildings
            .iter()
            .any(|p| p.id == pending && p.builder_ready && p.desired_start_frame > 0);
        if ready {
            world.builder.clear_desired_start_frame(pending);
            commands.push(IssuedCommand::ClearDesiredStart { pending });
        }
    }
}
