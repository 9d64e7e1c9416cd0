use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::buildings::{BuildError, BuildRules, BuildingId, SettlementBuildings, Upgraded};
use crate::calendar::Calendar;
use crate::catalog::{ArchetypeId, StructureCatalog};
use crate::events::Notification;
use crate::land::{ExploreError, LandRegistry, RegionId, Terrain};
use crate::population::{PopulationDirectory, WorkerId};
use crate::progression::{CapKind, ProgressionTracker};
use crate::resources::{ResourceLedger, ResourceMap};

fn default_decay_per_day() -> f64 {
    crate::buildings::DEFAULT_DECAY_PER_DAY
}

fn default_season_fame() -> f64 {
    10.0
}

fn default_year_fame() -> f64 {
    50.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    #[serde(default = "default_decay_per_day")]
    pub decay_per_day: f64,
    #[serde(default = "default_season_fame")]
    pub season_fame: f64,
    #[serde(default = "default_year_fame")]
    pub year_fame: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            decay_per_day: default_decay_per_day(),
            season_fame: default_season_fame(),
            year_fame: default_year_fame(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingView {
    pub id: BuildingId,
    pub archetype: ArchetypeId,
    pub name: String,
    pub region: RegionId,
    pub workers: usize,
    pub job_capacity: u32,
    pub condition: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionView {
    pub id: RegionId,
    pub name: String,
    pub terrain: Terrain,
    pub acreage: u32,
    pub remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionView {
    pub fame: f64,
    pub rank: usize,
    pub rank_name: String,
    pub next_threshold: Option<f64>,
    pub max_vassals: u32,
    pub max_villages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementSnapshot {
    pub scenario: String,
    pub tick: u64,
    pub calendar: Calendar,
    pub resources: ResourceMap,
    pub production_rates: ResourceMap,
    pub buildings: Vec<BuildingView>,
    pub housing_capacity: u32,
    pub population: u64,
    pub progression: ProgressionView,
    pub regions: Vec<RegionView>,
    pub unexplored_acres: u32,
}

/// The settlement: one owned instance of every subsystem.
pub struct World {
    tick: u64,
    pub(crate) calendar: Calendar,
    pub(crate) ledger: ResourceLedger,
    pub(crate) land: LandRegistry,
    pub(crate) catalog: StructureCatalog,
    pub(crate) buildings: SettlementBuildings,
    pub(crate) progression: ProgressionTracker,
    pub(crate) population: Box<dyn PopulationDirectory>,
    pub(crate) tuning: Tuning,
    pub(crate) last_produced: ResourceMap,
    outbox: Vec<Notification>,
}

impl World {
    pub fn new(
        catalog: StructureCatalog,
        land: LandRegistry,
        ledger: ResourceLedger,
        mut progression: ProgressionTracker,
        population: impl PopulationDirectory + 'static,
        tuning: Tuning,
    ) -> Self {
        progression.prime(population.total_population());
        Self {
            tick: 0,
            calendar: Calendar::default(),
            ledger,
            land,
            catalog,
            buildings: SettlementBuildings::new(),
            progression,
            population: Box::new(population),
            tuning,
            last_produced: ResourceMap::new(),
            outbox: Vec::new(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn advance_time(&mut self) {
        self.tick += 1;
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar.clone()
    }

    pub fn resources(&self) -> ResourceMap {
        self.ledger.query()
    }

    pub fn production_rates(&self) -> ResourceMap {
        self.ledger.production_rates()
    }

    pub fn buildings(&self) -> Vec<BuildingView> {
        self.buildings
            .iter()
            .map(|building| {
                let archetype = self.catalog.get(&building.archetype);
                BuildingView {
                    id: building.id,
                    archetype: building.archetype.clone(),
                    name: archetype
                        .map_or_else(|| building.archetype.to_string(), |a| a.name.clone()),
                    region: building.region,
                    workers: building.workers.len(),
                    job_capacity: archetype.map_or(0, |a| a.job_capacity()),
                    condition: building.condition,
                }
            })
            .collect()
    }

    pub fn workers_of(&self, building: BuildingId) -> Option<Vec<WorkerId>> {
        self.buildings.get(building).map(|b| b.workers.clone())
    }

    pub fn housing_capacity(&self) -> u32 {
        self.buildings.housing_capacity()
    }

    pub fn total_population(&self) -> u64 {
        self.population.total_population()
    }

    pub fn fame(&self) -> f64 {
        self.progression.fame()
    }

    pub fn rank(&self) -> usize {
        self.progression.rank()
    }

    pub fn progression(&self) -> ProgressionView {
        ProgressionView {
            fame: self.progression.fame(),
            rank: self.progression.rank(),
            rank_name: self.progression.rank_name().to_string(),
            next_threshold: self.progression.next_threshold(),
            max_vassals: self.progression.max_allowed(CapKind::Vassals),
            max_villages: self.progression.max_allowed(CapKind::Villages),
        }
    }

    pub fn remaining_acreage(&self, region: RegionId) -> Option<u32> {
        let used = self.buildings.acreage_used(region, &self.catalog, None);
        self.land.remaining_acreage(region, used)
    }

    pub fn regions(&self) -> Vec<RegionView> {
        self.land
            .regions()
            .map(|region| RegionView {
                id: region.id,
                name: region.name.clone(),
                terrain: region.terrain,
                acreage: region.acreage,
                remaining: self.remaining_acreage(region.id).unwrap_or(0),
            })
            .collect()
    }

    pub fn catalog(&self) -> &StructureCatalog {
        &self.catalog
    }

    pub fn snapshot(&self, scenario: &str) -> SettlementSnapshot {
        SettlementSnapshot {
            scenario: scenario.to_string(),
            tick: self.tick,
            calendar: self.calendar(),
            resources: self.resources(),
            production_rates: self.production_rates(),
            buildings: self.buildings(),
            housing_capacity: self.housing_capacity(),
            population: self.total_population(),
            progression: self.progression(),
            regions: self.regions(),
            unexplored_acres: self.land.unexplored_acres(),
        }
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn notify(&mut self, notification: Notification) {
        self.outbox.push(notification);
    }

    fn rules(&self) -> BuildRules<'_> {
        BuildRules {
            catalog: &self.catalog,
            land: &self.land,
            progression: &self.progression,
        }
    }

    pub fn construct(
        &mut self,
        archetype: &ArchetypeId,
        region: RegionId,
    ) -> Result<BuildingId, BuildError> {
        let rules = BuildRules {
            catalog: &self.catalog,
            land: &self.land,
            progression: &self.progression,
        };
        let building = self.buildings.construct(
            rules,
            &mut self.ledger,
            archetype,
            region,
            self.calendar.day,
        )?;
        self.notify(Notification::BuildingConstructed {
            building,
            archetype: archetype.clone(),
            region,
        });
        Ok(building)
    }

    /// Dry run of [`World::construct`].
    pub fn can_construct(
        &self,
        archetype: &ArchetypeId,
        region: RegionId,
    ) -> Result<(), BuildError> {
        self.buildings
            .validate(self.rules(), &self.ledger, archetype, region, None)
            .map(|_| ())
    }

    pub fn upgrade(&mut self, building: BuildingId) -> Result<Upgraded, BuildError> {
        let rules = BuildRules {
            catalog: &self.catalog,
            land: &self.land,
            progression: &self.progression,
        };
        let upgraded = self
            .buildings
            .upgrade(rules, &mut self.ledger, building, self.calendar.day)?;
        self.notify(Notification::BuildingUpgraded {
            old: upgraded.old,
            new: upgraded.new,
            archetype: upgraded.archetype.clone(),
            released: upgraded.released.clone(),
        });
        Ok(upgraded)
    }

    pub fn repair(&mut self, building: BuildingId) -> Result<ResourceMap, BuildError> {
        let cost = self
            .buildings
            .repair(&self.catalog, &mut self.ledger, building)?;
        if !cost.is_empty() {
            self.notify(Notification::BuildingRepaired { building });
        }
        Ok(cost)
    }

    pub fn assign_worker(
        &mut self,
        building: BuildingId,
        worker: WorkerId,
    ) -> Result<Option<BuildingId>, BuildError> {
        let already_there = self.buildings.building_of(worker) == Some(building);
        let previous = self.buildings.assign_worker(
            &self.catalog,
            self.population.as_ref(),
            building,
            worker,
        )?;
        if !already_there {
            self.notify(Notification::WorkerAssigned {
                building,
                worker,
                previous,
            });
        }
        Ok(previous)
    }

    pub fn remove_worker(
        &mut self,
        building: BuildingId,
        worker: WorkerId,
    ) -> Result<bool, BuildError> {
        let removed = self.buildings.remove_worker(building, worker)?;
        if removed {
            self.notify(Notification::WorkerRemoved { building, worker });
        }
        Ok(removed)
    }

    pub fn add_fame(&mut self, amount: f64, reason: &str) -> usize {
        let before = self.progression.fame();
        let unlocks = self.progression.add_fame(amount, reason);
        let gained = self.progression.fame() - before;
        if gained > 0.0 {
            self.notify(Notification::FameAwarded {
                amount: gained,
                reason: reason.to_string(),
                total: self.progression.fame(),
            });
        }
        let count = unlocks.len();
        for unlock in unlocks {
            self.notify(Notification::RankUnlocked(unlock));
        }
        count
    }

    pub fn explore<R: RngCore>(&mut self, rng: &mut R) -> Result<RegionId, ExploreError> {
        let scouts = self.population.available_non_workers();
        let region = self.land.explore(scouts, rng)?;
        if let Some(found) = self.land.get(region) {
            let notification = Notification::RegionExplored {
                region,
                terrain: found.terrain,
                acreage: found.acreage,
            };
            self.notify(notification);
        }
        Ok(region)
    }
}
