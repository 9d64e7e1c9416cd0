use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::buildings::{BuildError, BuildingId, Upgraded};
use crate::catalog::ArchetypeId;
use crate::land::{ExploreError, RegionId};
use crate::population::WorkerId;
use crate::resources::ResourceMap;
use crate::world::World;

/// Inbound commands accepted from collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Construct {
        archetype: ArchetypeId,
        region: RegionId,
    },
    Upgrade {
        building: BuildingId,
    },
    Repair {
        building: BuildingId,
    },
    AssignWorker {
        building: BuildingId,
        worker: WorkerId,
    },
    RemoveWorker {
        building: BuildingId,
        worker: WorkerId,
    },
    AddFame {
        amount: f64,
        reason: String,
    },
    Explore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Constructed {
        building: BuildingId,
    },
    Upgraded(Upgraded),
    Repaired {
        building: BuildingId,
        cost: ResourceMap,
    },
    WorkerAssigned {
        building: BuildingId,
        worker: WorkerId,
        previous: Option<BuildingId>,
    },
    WorkerRemoved {
        building: BuildingId,
        worker: WorkerId,
        was_assigned: bool,
    },
    FameAdded {
        fame: f64,
        rank: usize,
        ranks_gained: usize,
    },
    Explored {
        region: RegionId,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Explore(#[from] ExploreError),
}

pub fn apply<R: RngCore>(
    world: &mut World,
    command: Command,
    rng: &mut R,
) -> Result<CommandOutcome, CommandError> {
    let outcome = match command {
        Command::Construct { archetype, region } => {
            let building = world.construct(&archetype, region)?;
            CommandOutcome::Constructed { building }
        }
        Command::Upgrade { building } => CommandOutcome::Upgraded(world.upgrade(building)?),
        Command::Repair { building } => {
            let cost = world.repair(building)?;
            CommandOutcome::Repaired { building, cost }
        }
        Command::AssignWorker { building, worker } => {
            let previous = world.assign_worker(building, worker)?;
            CommandOutcome::WorkerAssigned {
                building,
                worker,
                previous,
            }
        }
        Command::RemoveWorker { building, worker } => {
            let was_assigned = world.remove_worker(building, worker)?;
            CommandOutcome::WorkerRemoved {
                building,
                worker,
                was_assigned,
            }
        }
        Command::AddFame { amount, reason } => {
            let ranks_gained = world.add_fame(amount, &reason);
            CommandOutcome::FameAdded {
                fame: world.fame(),
                rank: world.rank(),
                ranks_gained,
            }
        }
        Command::Explore => CommandOutcome::Explored {
            region: world.explore(rng)?,
        },
    };
    Ok(outcome)
}
