use serde::{Deserialize, Serialize};

use crate::buildings::BuildingId;
use crate::calendar::{Rollover, Season};
use crate::catalog::ArchetypeId;
use crate::land::{RegionId, Terrain};
use crate::population::WorkerId;
use crate::progression::RankUnlock;

/// Everything observers are told about. Queued by the world and drained by
/// the engine after each tick or command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    MonthStarted {
        month: u32,
        year: u32,
    },
    SeasonChanged {
        from: Season,
        to: Season,
        year: u32,
    },
    YearStarted {
        year: u32,
    },
    FameAwarded {
        amount: f64,
        reason: String,
        total: f64,
    },
    RankUnlocked(RankUnlock),
    MilestoneReached {
        label: String,
        fame: f64,
    },
    BuildingConstructed {
        building: BuildingId,
        archetype: ArchetypeId,
        region: RegionId,
    },
    BuildingUpgraded {
        old: BuildingId,
        new: BuildingId,
        archetype: ArchetypeId,
        released: Vec<WorkerId>,
    },
    BuildingRepaired {
        building: BuildingId,
    },
    WorkerAssigned {
        building: BuildingId,
        worker: WorkerId,
        previous: Option<BuildingId>,
    },
    WorkerRemoved {
        building: BuildingId,
        worker: WorkerId,
    },
    RegionExplored {
        region: RegionId,
        terrain: Terrain,
        acreage: u32,
    },
}

impl From<Rollover> for Notification {
    fn from(value: Rollover) -> Self {
        match value {
            Rollover::Month { month, year } => Notification::MonthStarted { month, year },
            Rollover::Season { from, to, year } => Notification::SeasonChanged { from, to, year },
            Rollover::Year { year } => Notification::YearStarted { year },
        }
    }
}
