//! Constructed buildings, their workers, and the production and decay passes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::Season;
use crate::catalog::{ArchetypeId, Effect, StructureArchetype, StructureCatalog};
use crate::land::{LandRegistry, RegionId, Terrain};
use crate::population::{PopulationDirectory, WorkerId};
use crate::progression::{ProgressionTracker, RequirementKind};
use crate::resources::{LedgerError, Resource, ResourceLedger, ResourceMap};

pub const MAX_CONDITION: f64 = 100.0;
pub const DEFAULT_DECAY_PER_DAY: f64 = 0.1;
const REPAIR_COST_FRACTION: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingId(pub u64);

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "building#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub archetype: ArchetypeId,
    pub region: RegionId,
    pub workers: Vec<WorkerId>,
    pub condition: f64,
    pub built_on_day: u64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("unknown structure '{0}'")]
    UnknownArchetype(ArchetypeId),
    #[error("rank {required} required, current rank is {current}")]
    RankTooLow { required: usize, current: usize },
    #[error("requires an existing '{0}'")]
    MissingPrerequisite(ArchetypeId),
    #[error("unknown region {0}")]
    UnknownRegion(RegionId),
    #[error("cannot build on {terrain}")]
    IncompatibleTerrain { terrain: Terrain },
    #[error("needs {required} acres, only {remaining} remain")]
    InsufficientLand { required: u32, remaining: u32 },
    #[error("insufficient resources: {0}")]
    InsufficientResources(LedgerError),
    #[error("unknown building {0}")]
    UnknownBuilding(BuildingId),
    #[error("building has no job slots")]
    NoJobSlots,
    #[error("all {capacity} job slots are filled")]
    AtCapacity { capacity: u32 },
    #[error("unknown worker {0}")]
    UnknownWorker(WorkerId),
    #[error("'{0}' has no upgrade path")]
    NoUpgradePath(ArchetypeId),
}

impl From<LedgerError> for BuildError {
    fn from(value: LedgerError) -> Self {
        BuildError::InsufficientResources(value)
    }
}

/// Read-only collaborators consulted while validating construction.
#[derive(Clone, Copy)]
pub struct BuildRules<'a> {
    pub catalog: &'a StructureCatalog,
    pub land: &'a LandRegistry,
    pub progression: &'a ProgressionTracker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upgraded {
    pub old: BuildingId,
    pub new: BuildingId,
    pub archetype: ArchetypeId,
    pub released: Vec<WorkerId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettlementBuildings {
    buildings: Vec<Building>,
    next_id: u64,
    housing_capacity: u32,
}

impl SettlementBuildings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Building> {
        self.buildings.iter()
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn housing_capacity(&self) -> u32 {
        self.housing_capacity
    }

    pub fn building_of(&self, worker: WorkerId) -> Option<BuildingId> {
        self.buildings
            .iter()
            .find(|b| b.workers.contains(&worker))
            .map(|b| b.id)
    }

    /// Acres taken in `region`, optionally ignoring one building.
    pub fn acreage_used(
        &self,
        region: RegionId,
        catalog: &StructureCatalog,
        excluding: Option<BuildingId>,
    ) -> u32 {
        self.buildings
            .iter()
            .filter(|b| b.region == region && Some(b.id) != excluding)
            .filter_map(|b| catalog.get(&b.archetype))
            .map(StructureArchetype::acres)
            .sum()
    }

    /// Runs every construction check without mutating anything.
    pub fn validate<'a>(
        &self,
        rules: BuildRules<'a>,
        ledger: &ResourceLedger,
        archetype_id: &ArchetypeId,
        region_id: RegionId,
        replacing: Option<BuildingId>,
    ) -> Result<&'a StructureArchetype, BuildError> {
        let archetype = rules
            .catalog
            .get(archetype_id)
            .ok_or_else(|| BuildError::UnknownArchetype(archetype_id.clone()))?;

        let required = archetype.requires.min_rank;
        if !rules
            .progression
            .meets_rank_requirement(RequirementKind::Rank, required)
        {
            return Err(BuildError::RankTooLow {
                required,
                current: rules.progression.rank(),
            });
        }

        if let Some(prerequisite) = &archetype.requires.building {
            let present = self
                .buildings
                .iter()
                .any(|b| &b.archetype == prerequisite && Some(b.id) != replacing);
            if !present {
                return Err(BuildError::MissingPrerequisite(prerequisite.clone()));
            }
        }

        let region = rules
            .land
            .get(region_id)
            .ok_or(BuildError::UnknownRegion(region_id))?;
        if let Some(land) = &archetype.land {
            if !land.allows(region.terrain) {
                return Err(BuildError::IncompatibleTerrain {
                    terrain: region.terrain,
                });
            }
        }
        let used = self.acreage_used(region_id, rules.catalog, replacing);
        let remaining = region.acreage.saturating_sub(used);
        if remaining < archetype.acres() {
            return Err(BuildError::InsufficientLand {
                required: archetype.acres(),
                remaining,
            });
        }

        ledger.can_afford(&archetype.cost)?;
        Ok(archetype)
    }

    pub fn construct(
        &mut self,
        rules: BuildRules<'_>,
        ledger: &mut ResourceLedger,
        archetype_id: &ArchetypeId,
        region_id: RegionId,
        day: u64,
    ) -> Result<BuildingId, BuildError> {
        let archetype = self.validate(rules, ledger, archetype_id, region_id, None)?;
        ledger.debit(&archetype.cost)?;

        let id = self.allocate();
        self.buildings.push(Building {
            id,
            archetype: archetype.id.clone(),
            region: region_id,
            workers: Vec::new(),
            condition: MAX_CONDITION,
            built_on_day: day,
        });
        if archetype.housing() > 0 {
            self.recompute_housing(rules.catalog);
        }
        tracing::info!(
            building = %id,
            archetype = %archetype.id,
            region = %region_id,
            "constructed"
        );
        Ok(id)
    }

    /// Replaces a building with its first upgrade target. Workers carry over;
    /// any beyond the new job capacity are released from the end of the list.
    pub fn upgrade(
        &mut self,
        rules: BuildRules<'_>,
        ledger: &mut ResourceLedger,
        id: BuildingId,
        day: u64,
    ) -> Result<Upgraded, BuildError> {
        let index = self.index_of(id)?;
        let current = &self.buildings[index];
        let source = rules
            .catalog
            .get(&current.archetype)
            .ok_or_else(|| BuildError::UnknownArchetype(current.archetype.clone()))?;
        let target_id = source
            .upgrade_target()
            .ok_or_else(|| BuildError::NoUpgradePath(source.id.clone()))?;
        let region = current.region;

        let target = self.validate(rules, ledger, target_id, region, Some(id))?;
        ledger.debit(&target.cost)?;

        let old = self.buildings.remove(index);
        let mut workers = old.workers;
        let capacity = target.job_capacity() as usize;
        let released = if workers.len() > capacity {
            workers.split_off(capacity)
        } else {
            Vec::new()
        };
        let new_id = self.allocate();
        self.buildings.insert(
            index,
            Building {
                id: new_id,
                archetype: target.id.clone(),
                region,
                workers,
                condition: MAX_CONDITION,
                built_on_day: day,
            },
        );
        self.recompute_housing(rules.catalog);
        tracing::info!(old = %id, new = %new_id, archetype = %target.id, "upgraded");
        Ok(Upgraded {
            old: id,
            new: new_id,
            archetype: target.id.clone(),
            released,
        })
    }

    /// Price of restoring a building to full condition.
    pub fn repair_cost(
        &self,
        catalog: &StructureCatalog,
        id: BuildingId,
    ) -> Result<ResourceMap, BuildError> {
        let building = self.get(id).ok_or(BuildError::UnknownBuilding(id))?;
        if building.condition >= MAX_CONDITION {
            return Ok(ResourceMap::new());
        }
        let archetype = catalog
            .get(&building.archetype)
            .ok_or_else(|| BuildError::UnknownArchetype(building.archetype.clone()))?;
        let damage = (MAX_CONDITION - building.condition) / MAX_CONDITION;
        Ok(archetype
            .cost
            .iter()
            .map(|(kind, amount)| {
                let cost = (amount * REPAIR_COST_FRACTION * damage).ceil().max(1.0);
                (*kind, cost)
            })
            .collect())
    }

    pub fn repair(
        &mut self,
        catalog: &StructureCatalog,
        ledger: &mut ResourceLedger,
        id: BuildingId,
    ) -> Result<ResourceMap, BuildError> {
        let index = self.index_of(id)?;
        if self.buildings[index].condition >= MAX_CONDITION {
            return Ok(ResourceMap::new());
        }
        let cost = self.repair_cost(catalog, id)?;
        ledger.debit(&cost)?;
        self.buildings[index].condition = MAX_CONDITION;
        tracing::info!(building = %id, "repaired");
        Ok(cost)
    }

    /// Assigns a worker, moving them out of any other building first.
    pub fn assign_worker(
        &mut self,
        catalog: &StructureCatalog,
        directory: &dyn PopulationDirectory,
        id: BuildingId,
        worker: WorkerId,
    ) -> Result<Option<BuildingId>, BuildError> {
        let index = self.index_of(id)?;
        let building = &self.buildings[index];
        let capacity = catalog
            .get(&building.archetype)
            .map_or(0, StructureArchetype::job_capacity);
        if capacity == 0 {
            return Err(BuildError::NoJobSlots);
        }
        if directory.profile(worker).is_none() {
            return Err(BuildError::UnknownWorker(worker));
        }
        if building.workers.contains(&worker) {
            return Ok(None);
        }
        if building.workers.len() >= capacity as usize {
            return Err(BuildError::AtCapacity { capacity });
        }

        let previous = self.building_of(worker);
        for other in &mut self.buildings {
            other.workers.retain(|w| *w != worker);
        }
        self.buildings[index].workers.push(worker);
        tracing::debug!(%worker, building = %id, ?previous, "worker assigned");
        Ok(previous)
    }

    /// Returns whether the worker was present.
    pub fn remove_worker(&mut self, id: BuildingId, worker: WorkerId) -> Result<bool, BuildError> {
        let index = self.index_of(id)?;
        let workers = &mut self.buildings[index].workers;
        let before = workers.len();
        workers.retain(|w| *w != worker);
        Ok(workers.len() != before)
    }

    /// Net output per simulated day across all buildings, after maintenance.
    pub fn production_pass(
        &self,
        catalog: &StructureCatalog,
        land: &LandRegistry,
        directory: &dyn PopulationDirectory,
        season: Season,
    ) -> ResourceMap {
        let mut gross = ResourceMap::new();
        let mut multipliers: BTreeMap<Resource, f64> = BTreeMap::new();
        let mut upkeep = ResourceMap::new();

        for building in &self.buildings {
            let Some(archetype) = catalog.get(&building.archetype) else {
                continue;
            };
            for effect in &archetype.effects {
                if let Effect::ProductionMultiplier { resource, factor } = effect {
                    *multipliers.entry(*resource).or_insert(1.0) *= factor;
                }
            }
            for (kind, amount) in &archetype.maintenance {
                *upkeep.entry(*kind).or_insert(0.0) += amount;
            }
            if building.workers.is_empty() {
                continue;
            }

            let region = land.get(building.region);
            let mut pool = building.workers.as_slice();
            for job in &archetype.jobs {
                if pool.is_empty() {
                    break;
                }
                let take = pool.len().min(job.max_workers as usize);
                let (staff, rest) = pool.split_at(take);
                pool = rest;
                let Some(rule) = &job.produces else {
                    continue;
                };

                let base = rule.per_worker * staff.len() as f64;
                let average_skill = staff
                    .iter()
                    .map(|w| directory.skill_of(*w, rule.skill))
                    .sum::<f64>()
                    / staff.len() as f64;
                let regional = region
                    .and_then(|r| r.potential.get(&rule.resource))
                    .map_or(1.0, |p| p.factor());
                let output = base
                    * skill_modifier(average_skill)
                    * archetype.seasonal_multiplier(season)
                    * regional
                    * (building.condition / MAX_CONDITION);
                *gross.entry(rule.resource).or_insert(0.0) += output;
            }
        }

        for (kind, amount) in gross.iter_mut() {
            if let Some(factor) = multipliers.get(kind) {
                *amount *= factor;
            }
        }
        for (kind, amount) in upkeep {
            *gross.entry(kind).or_insert(0.0) -= amount;
        }
        gross
    }

    pub fn decay_pass(&mut self, days: f64, decay_per_day: f64) {
        let wear = (decay_per_day * days).max(0.0);
        for building in &mut self.buildings {
            building.condition = (building.condition - wear).max(0.0);
        }
    }

    fn recompute_housing(&mut self, catalog: &StructureCatalog) {
        self.housing_capacity = self
            .buildings
            .iter()
            .filter_map(|b| catalog.get(&b.archetype))
            .map(StructureArchetype::housing)
            .sum();
    }

    fn index_of(&self, id: BuildingId) -> Result<usize, BuildError> {
        self.buildings
            .iter()
            .position(|b| b.id == id)
            .ok_or(BuildError::UnknownBuilding(id))
    }

    fn allocate(&mut self) -> BuildingId {
        let id = BuildingId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Ranges over [0.92, 2.0] for skills 1..=10 and never reaches zero.
pub fn skill_modifier(average_skill: f64) -> f64 {
    0.8 + (average_skill / 10.0) * 1.2
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::catalog::{Category, JobSlot, LandRequirement, ProductionRule, Requirements};
    use crate::land::{Potential, Region};
    use crate::population::{Role, Roster, Skill, WorkerProfile};

    fn archetype(id: &str, acres: u32) -> StructureArchetype {
        StructureArchetype {
            id: ArchetypeId::new(id),
            name: id.to_string(),
            category: Category::Resource,
            cost: ResourceMap::from([(Resource::Wood, 20.0)]),
            maintenance: ResourceMap::new(),
            jobs: vec![JobSlot {
                title: "Hand".into(),
                max_workers: 2,
                produces: Some(ProductionRule {
                    resource: Resource::Food,
                    per_worker: 2.0,
                    skill: Skill::Farming,
                }),
            }],
            effects: Vec::new(),
            land: Some(LandRequirement {
                terrain: BTreeSet::from([Terrain::Plains]),
                acres,
            }),
            requires: Requirements::default(),
            seasonal: None,
            upgrades_to: Vec::new(),
        }
    }

    struct Fixture {
        catalog: StructureCatalog,
        land: LandRegistry,
        progression: ProgressionTracker,
        ledger: ResourceLedger,
        roster: Roster,
        buildings: SettlementBuildings,
    }

    impl Fixture {
        fn new(archetypes: Vec<StructureArchetype>) -> Self {
            let mut land = LandRegistry::new(0);
            land.insert(Region {
                id: RegionId(0),
                name: "Vale".into(),
                terrain: Terrain::Plains,
                acreage: 10,
                potential: BTreeMap::new(),
            });
            land.insert(Region {
                id: RegionId(1),
                name: "Crags".into(),
                terrain: Terrain::Mountains,
                acreage: 10,
                potential: BTreeMap::new(),
            });
            let mut ledger = ResourceLedger::with_all_kinds();
            ledger.credit(&ResourceMap::from([(Resource::Wood, 100.0)]));
            let mut roster = Roster::new();
            for (id, skill) in [(1, 5.0), (2, 7.0), (3, 3.0)] {
                roster.insert(
                    WorkerId(id),
                    WorkerProfile {
                        role: Role::Laborer,
                        available: true,
                        skills: BTreeMap::from([(Skill::Farming, skill)]),
                    },
                );
            }
            Self {
                catalog: StructureCatalog::new(archetypes).unwrap(),
                land,
                progression: ProgressionTracker::default(),
                ledger,
                roster,
                buildings: SettlementBuildings::new(),
            }
        }

        fn construct(&mut self, id: &str, region: u32) -> Result<BuildingId, BuildError> {
            let rules = BuildRules {
                catalog: &self.catalog,
                land: &self.land,
                progression: &self.progression,
            };
            self.buildings.construct(
                rules,
                &mut self.ledger,
                &ArchetypeId::new(id),
                RegionId(region),
                0,
            )
        }

        fn assign(
            &mut self,
            building: BuildingId,
            worker: u64,
        ) -> Result<Option<BuildingId>, BuildError> {
            self.buildings
                .assign_worker(&self.catalog, &self.roster, building, WorkerId(worker))
        }
    }

    #[test]
    fn acreage_budget_is_enforced() {
        let mut fx = Fixture::new(vec![
            archetype("six", 6),
            archetype("five", 5),
            archetype("four", 4),
        ]);
        fx.construct("six", 0).unwrap();
        assert_eq!(
            fx.construct("five", 0),
            Err(BuildError::InsufficientLand {
                required: 5,
                remaining: 4
            })
        );
        fx.construct("four", 0).unwrap();
        assert_eq!(fx.buildings.acreage_used(RegionId(0), &fx.catalog, None), 10);
    }

    #[test]
    fn failed_construction_changes_nothing() {
        let mut expensive = archetype("keep", 1);
        expensive.cost = ResourceMap::from([(Resource::Wood, 50.0), (Resource::Stone, 5.0)]);
        let mut ranked = archetype("hall", 1);
        ranked.requires.min_rank = 2;
        let mut dependent = archetype("mill", 1);
        dependent.requires.building = Some(ArchetypeId::new("keep"));
        let mut fx = Fixture::new(vec![expensive, ranked, dependent]);

        let ledger_before = fx.ledger.query();
        let cases = [
            ("keep", 0, "resources"),
            ("hall", 0, "rank"),
            ("mill", 0, "prerequisite"),
            ("keep", 1, "terrain"),
            ("keep", 9, "region"),
            ("nowhere", 0, "archetype"),
        ];
        for (id, region, label) in cases {
            let err = fx.construct(id, region).unwrap_err();
            let matched = match label {
                "resources" => matches!(err, BuildError::InsufficientResources(_)),
                "rank" => matches!(err, BuildError::RankTooLow { required: 2, .. }),
                "prerequisite" => matches!(err, BuildError::MissingPrerequisite(_)),
                "terrain" => matches!(err, BuildError::IncompatibleTerrain { .. }),
                "region" => matches!(err, BuildError::UnknownRegion(RegionId(9))),
                _ => matches!(err, BuildError::UnknownArchetype(_)),
            };
            assert!(matched, "{label}: unexpected {err:?}");
            assert!(fx.buildings.is_empty());
            assert_eq!(fx.ledger.query(), ledger_before);
        }
    }

    #[test]
    fn construction_debits_cost_and_tracks_housing() {
        let mut hut = archetype("hut", 1);
        hut.category = Category::Housing;
        hut.jobs.clear();
        hut.effects = vec![Effect::Housing { capacity: 4 }];
        let mut fx = Fixture::new(vec![hut]);
        fx.construct("hut", 0).unwrap();
        fx.construct("hut", 0).unwrap();
        assert_eq!(fx.ledger.amount(Resource::Wood), 60.0);
        assert_eq!(fx.buildings.housing_capacity(), 8);
    }

    #[test]
    fn workers_are_exclusive() {
        let mut fx = Fixture::new(vec![archetype("field", 1)]);
        let a = fx.construct("field", 0).unwrap();
        let b = fx.construct("field", 0).unwrap();

        assert_eq!(fx.assign(a, 1), Ok(None));
        assert_eq!(fx.assign(a, 2), Ok(None));
        assert_eq!(fx.assign(a, 3), Err(BuildError::AtCapacity { capacity: 2 }));
        assert_eq!(fx.assign(b, 1), Ok(Some(a)));
        assert_eq!(fx.assign(b, 1), Ok(None));
        assert_eq!(fx.assign(a, 3), Ok(None));
        assert_eq!(fx.assign(b, 42), Err(BuildError::UnknownWorker(WorkerId(42))));

        for worker in [1, 2, 3] {
            let holders = fx
                .buildings
                .iter()
                .filter(|b| b.workers.contains(&WorkerId(worker)))
                .count();
            assert_eq!(holders, 1, "worker {worker}");
        }
        assert_eq!(fx.buildings.building_of(WorkerId(1)), Some(b));
        assert_eq!(fx.buildings.remove_worker(b, WorkerId(1)), Ok(true));
        assert_eq!(fx.buildings.remove_worker(b, WorkerId(1)), Ok(false));
    }

    #[test]
    fn full_target_rejects_transfer_without_losing_worker() {
        let mut fx = Fixture::new(vec![archetype("field", 1)]);
        let a = fx.construct("field", 0).unwrap();
        let b = fx.construct("field", 0).unwrap();
        fx.assign(a, 1).unwrap();
        fx.assign(b, 2).unwrap();
        fx.assign(b, 3).unwrap();
        assert!(fx.assign(b, 1).is_err());
        assert_eq!(fx.buildings.building_of(WorkerId(1)), Some(a));
    }

    #[test]
    fn buildings_without_jobs_take_no_workers() {
        let mut wall = archetype("wall", 1);
        wall.category = Category::Military;
        wall.jobs.clear();
        let mut fx = Fixture::new(vec![wall]);
        let id = fx.construct("wall", 0).unwrap();
        assert_eq!(fx.assign(id, 1), Err(BuildError::NoJobSlots));
        assert_eq!(
            fx.assign(BuildingId(99), 1),
            Err(BuildError::UnknownBuilding(BuildingId(99)))
        );
    }

    #[test]
    fn production_matches_skill_formula() {
        let mut fx = Fixture::new(vec![archetype("field", 1)]);
        let id = fx.construct("field", 0).unwrap();
        fx.assign(id, 1).unwrap();
        fx.assign(id, 2).unwrap();
        let delta = fx
            .buildings
            .production_pass(&fx.catalog, &fx.land, &fx.roster, Season::Spring);
        assert!((delta[&Resource::Food] - 6.08).abs() < 1e-9);
    }

    #[test]
    fn production_composes_modifiers() {
        let mut field = archetype("field", 1);
        field.seasonal = Some(BTreeMap::from([(Season::Winter, 0.5)]));
        field.maintenance = ResourceMap::from([(Resource::Wood, 0.25)]);
        let mut granary = archetype("granary", 1);
        granary.category = Category::Crafting;
        granary.jobs.clear();
        granary.effects = vec![Effect::ProductionMultiplier {
            resource: Resource::Food,
            factor: 1.5,
        }];
        let mut fx = Fixture::new(vec![field, granary]);
        fx.land.insert(Region {
            id: RegionId(0),
            name: "Vale".into(),
            terrain: Terrain::Plains,
            acreage: 10,
            potential: BTreeMap::from([(
                Resource::Food,
                Potential {
                    abundance: 50.0,
                    accessibility: 80.0,
                },
            )]),
        });
        let id = fx.construct("field", 0).unwrap();
        fx.construct("granary", 0).unwrap();
        fx.assign(id, 1).unwrap();
        fx.buildings.decay_pass(100.0, 0.5);

        let delta = fx
            .buildings
            .production_pass(&fx.catalog, &fx.land, &fx.roster, Season::Winter);
        let expected = 2.0 * skill_modifier(5.0) * 0.5 * 0.4 * 0.5 * 1.5;
        assert!((delta[&Resource::Food] - expected).abs() < 1e-9);
        assert!((delta[&Resource::Wood] + 0.25).abs() < 1e-9);
    }

    #[test]
    fn unstaffed_buildings_still_pay_maintenance() {
        let mut field = archetype("field", 1);
        field.maintenance = ResourceMap::from([(Resource::Gold, 1.0)]);
        let mut fx = Fixture::new(vec![field]);
        fx.construct("field", 0).unwrap();
        let delta = fx
            .buildings
            .production_pass(&fx.catalog, &fx.land, &fx.roster, Season::Summer);
        assert_eq!(delta.get(&Resource::Food), None);
        assert_eq!(delta[&Resource::Gold], -1.0);
    }

    #[test]
    fn decay_floors_at_zero() {
        let mut fx = Fixture::new(vec![archetype("field", 1)]);
        let id = fx.construct("field", 0).unwrap();
        fx.buildings.decay_pass(10.0, 0.1);
        assert!((fx.buildings.get(id).unwrap().condition - 99.0).abs() < 1e-9);
        fx.buildings.decay_pass(5_000.0, 0.1);
        assert_eq!(fx.buildings.get(id).unwrap().condition, 0.0);
    }

    #[test]
    fn repair_cost_scales_with_damage() {
        let mut fx = Fixture::new(vec![archetype("field", 1)]);
        let id = fx.construct("field", 0).unwrap();
        assert!(fx.buildings.repair(&fx.catalog, &mut fx.ledger, id).unwrap().is_empty());

        fx.buildings.decay_pass(60.0, 1.0);
        let cost = fx.buildings.repair_cost(&fx.catalog, id).unwrap();
        assert_eq!(cost[&Resource::Wood], 3.0);

        let wood = fx.ledger.amount(Resource::Wood);
        fx.buildings.repair(&fx.catalog, &mut fx.ledger, id).unwrap();
        assert_eq!(fx.ledger.amount(Resource::Wood), wood - 3.0);
        assert_eq!(fx.buildings.get(id).unwrap().condition, MAX_CONDITION);

        fx.buildings.decay_pass(1.0, 0.5);
        assert_eq!(
            fx.buildings.repair_cost(&fx.catalog, id).unwrap()[&Resource::Wood],
            1.0
        );
    }

    #[test]
    fn upgrade_replaces_building_and_keeps_workers() {
        let mut field = archetype("field", 6);
        field.upgrades_to = vec![ArchetypeId::new("estate")];
        let mut estate = archetype("estate", 8);
        estate.cost = ResourceMap::from([(Resource::Wood, 30.0)]);
        estate.jobs[0].max_workers = 1;
        let mut fx = Fixture::new(vec![field, estate]);
        let id = fx.construct("field", 0).unwrap();
        fx.assign(id, 2).unwrap();
        fx.assign(id, 1).unwrap();
        fx.buildings.decay_pass(10.0, 1.0);

        let rules = BuildRules {
            catalog: &fx.catalog,
            land: &fx.land,
            progression: &fx.progression,
        };
        let upgraded = fx.buildings.upgrade(rules, &mut fx.ledger, id, 5).unwrap();
        assert_eq!(upgraded.old, id);
        assert_eq!(upgraded.released, vec![WorkerId(1)]);
        assert!(fx.buildings.get(id).is_none());
        let new = fx.buildings.get(upgraded.new).unwrap();
        assert_eq!(new.archetype, ArchetypeId::new("estate"));
        assert_eq!(new.workers, vec![WorkerId(2)]);
        assert_eq!(new.condition, MAX_CONDITION);
        assert_eq!(new.built_on_day, 5);
        assert_eq!(fx.ledger.amount(Resource::Wood), 50.0);
        assert_eq!(fx.buildings.len(), 1);
    }

    #[test]
    fn failed_upgrade_leaves_building_untouched() {
        let mut field = archetype("field", 2);
        field.upgrades_to = vec![ArchetypeId::new("estate")];
        let mut estate = archetype("estate", 2);
        estate.cost = ResourceMap::from([(Resource::Wood, 500.0)]);
        let mut fx = Fixture::new(vec![field, estate]);
        let id = fx.construct("field", 0).unwrap();
        fx.assign(id, 1).unwrap();
        let before = fx.buildings.get(id).cloned();
        let wood = fx.ledger.amount(Resource::Wood);

        let rules = BuildRules {
            catalog: &fx.catalog,
            land: &fx.land,
            progression: &fx.progression,
        };
        let err = fx.buildings.upgrade(rules, &mut fx.ledger, id, 1).unwrap_err();
        assert!(matches!(err, BuildError::InsufficientResources(_)));
        assert_eq!(fx.buildings.get(id).cloned(), before);
        assert_eq!(fx.ledger.amount(Resource::Wood), wood);
    }

    #[test]
    fn upgrade_cannot_consume_its_own_prerequisite() {
        let mut field = archetype("field", 2);
        field.upgrades_to = vec![ArchetypeId::new("estate")];
        let mut estate = archetype("estate", 2);
        estate.requires.building = Some(ArchetypeId::new("field"));
        let mut fx = Fixture::new(vec![field, estate]);
        let first = fx.construct("field", 0).unwrap();

        let rules = BuildRules {
            catalog: &fx.catalog,
            land: &fx.land,
            progression: &fx.progression,
        };
        assert_eq!(
            fx.buildings.upgrade(rules, &mut fx.ledger, first, 1),
            Err(BuildError::MissingPrerequisite(ArchetypeId::new("field")))
        );
        assert!(fx.buildings.get(first).is_some());

        fx.construct("field", 0).unwrap();
        let rules = BuildRules {
            catalog: &fx.catalog,
            land: &fx.land,
            progression: &fx.progression,
        };
        assert!(fx.buildings.upgrade(rules, &mut fx.ledger, first, 2).is_ok());
    }

    #[test]
    fn upgrade_without_target_is_rejected() {
        let mut fx = Fixture::new(vec![archetype("field", 2)]);
        let id = fx.construct("field", 0).unwrap();
        let rules = BuildRules {
            catalog: &fx.catalog,
            land: &fx.land,
            progression: &fx.progression,
        };
        assert_eq!(
            fx.buildings.upgrade(rules, &mut fx.ledger, id, 2),
            Err(BuildError::NoUpgradePath(ArchetypeId::new("field")))
        );
    }
}
