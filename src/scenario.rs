use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::{
    catalog::{ArchetypeId, StructureCatalog},
    land::{LandRegistry, Potential, Region, RegionId, Terrain},
    population::{Role, Roster, Skill, WorkerId, WorkerProfile},
    progression::{
        default_milestones, default_rank_table, Milestone, ProgressionTracker, RankTier,
    },
    resources::{Resource, ResourceLedger, ResourceMap},
    world::{Tuning, World},
};

fn default_tick_days() -> u32 {
    1
}

fn default_snapshot_interval_ticks() -> u64 {
    30
}

fn default_available() -> bool {
    true
}

fn default_resources() -> Vec<Resource> {
    Resource::ALL.to_vec()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default = "default_tick_days")]
    pub tick_days: u32,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default = "default_snapshot_interval_ticks")]
    pub snapshot_interval_ticks: u64,
    /// Structure catalog file, relative to the scenario file. The built-in
    /// catalog is used when omitted.
    #[serde(default)]
    pub structures: Option<PathBuf>,
    #[serde(skip)]
    structures_yaml: Option<String>,
    #[serde(default)]
    pub tuning: Tuning,
    #[serde(default = "default_resources")]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub stockpile: ResourceMap,
    #[serde(default)]
    pub unexplored_acres: u32,
    pub regions: Vec<ScenarioRegion>,
    #[serde(default)]
    pub population: ScenarioPopulation,
    #[serde(default)]
    pub ranks: Option<Vec<RankTier>>,
    #[serde(default)]
    pub milestones: Option<Vec<Milestone>>,
    #[serde(default)]
    pub starting_buildings: Vec<StartingBuilding>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioRegion {
    pub name: String,
    pub terrain: Terrain,
    pub acreage: u32,
    #[serde(default)]
    pub potential: BTreeMap<Resource, Potential>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioPopulation {
    #[serde(default)]
    pub dependents: u64,
    #[serde(default)]
    pub members: Vec<ScenarioMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioMember {
    pub id: u64,
    pub role: Role,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub skills: BTreeMap<Skill, f64>,
}

/// A building placed before the first tick. It is paid for and validated
/// like any other construction, so the stockpile must cover it.
#[derive(Debug, Clone, Deserialize)]
pub struct StartingBuilding {
    pub archetype: ArchetypeId,
    pub region: u32,
    #[serde(default)]
    pub workers: Vec<u64>,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let mut scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if let Some(structures) = &scenario.structures {
            let catalog_path = path
                .parent()
                .map_or_else(|| structures.clone(), |dir| dir.join(structures));
            let text = fs::read_to_string(&catalog_path).with_context(|| {
                format!("Failed to read structure catalog {}", catalog_path.display())
            })?;
            scenario.structures_yaml = Some(text);
        }
        tracing::info!(scenario = %scenario.name, path = %path.display(), "scenario loaded");
        Ok(scenario)
    }
}

impl Scenario {
    pub fn catalog(&self) -> Result<StructureCatalog> {
        let catalog = match &self.structures_yaml {
            Some(text) => StructureCatalog::from_yaml(text),
            None => StructureCatalog::builtin(),
        };
        catalog.with_context(|| format!("Invalid structure catalog for '{}'", self.name))
    }

    pub fn roster(&self) -> Roster {
        let mut roster = Roster::new();
        roster.set_dependents(self.population.dependents);
        for member in &self.population.members {
            roster.insert(
                WorkerId(member.id),
                WorkerProfile {
                    role: member.role,
                    available: member.available,
                    skills: member.skills.clone(),
                },
            );
        }
        roster
    }

    /// Regions are numbered from 1 in file order.
    pub fn land(&self) -> Result<LandRegistry> {
        let mut land = LandRegistry::new(self.unexplored_acres);
        for (index, region) in self.regions.iter().enumerate() {
            ensure!(region.acreage > 0, "region '{}' has no acreage", region.name);
            for (resource, potential) in &region.potential {
                let in_range = |value: f64| (0.0..=100.0).contains(&value);
                ensure!(
                    in_range(potential.abundance) && in_range(potential.accessibility),
                    "region '{}' {resource} potential must lie within 0-100",
                    region.name
                );
            }
            land.insert(Region {
                id: RegionId(index as u32 + 1),
                name: region.name.clone(),
                terrain: region.terrain,
                acreage: region.acreage,
                potential: region.potential.clone(),
            });
        }
        Ok(land)
    }

    pub fn build_world(&self) -> Result<World> {
        let mut ledger = ResourceLedger::new(self.resources.iter().copied());
        ledger.credit(&self.stockpile);

        let progression = ProgressionTracker::new(
            self.ranks.clone().unwrap_or_else(default_rank_table),
            self.milestones.clone().unwrap_or_else(default_milestones),
        )
        .with_context(|| format!("Invalid rank table for '{}'", self.name))?;

        let mut world = World::new(
            self.catalog()?,
            self.land()?,
            ledger,
            progression,
            self.roster(),
            self.tuning,
        );

        for start in &self.starting_buildings {
            let building = world
                .construct(&start.archetype, RegionId(start.region))
                .with_context(|| {
                    format!(
                        "Failed to place starting {} in region {}",
                        start.archetype, start.region
                    )
                })?;
            for worker in &start.workers {
                world
                    .assign_worker(building, WorkerId(*worker))
                    .with_context(|| {
                        format!("Failed to assign worker {worker} to {}", start.archetype)
                    })?;
            }
        }
        world.drain_notifications();
        Ok(world)
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(120)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name: hamlet
seed: 1
stockpile: { wood: 50, stone: 10, gold: 20 }
regions:
  - name: Meadow
    terrain: plains
    acreage: 10
population:
  dependents: 2
  members:
    - { id: 1, role: laborer, skills: { farming: 5 } }
    - { id: 2, role: scout }
starting_buildings:
  - { archetype: cottage, region: 1 }
"#;

    #[test]
    fn minimal_scenario_builds_a_world() {
        let scenario: Scenario = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(scenario.tick_days, 1);
        assert_eq!(scenario.ticks(None), 120);
        assert_eq!(scenario.ticks(Some(5)), 5);

        let world = scenario.build_world().unwrap();
        assert_eq!(world.total_population(), 4);
        assert_eq!(world.buildings().len(), 1);
        assert_eq!(world.housing_capacity(), 4);
        assert_eq!(world.remaining_acreage(RegionId(1)), Some(9));
        assert_eq!(world.resources()[&Resource::Wood], 30.0);
    }

    #[test]
    fn potential_outside_percent_range_is_rejected() {
        let text = MINIMAL.replace(
            "acreage: 10",
            "acreage: 10\n    potential: { food: { abundance: 120, accessibility: 50 } }",
        );
        let scenario: Scenario = serde_yaml::from_str(&text).unwrap();
        assert!(scenario.build_world().is_err());
    }

    #[test]
    fn unaffordable_starting_building_is_an_error() {
        let text = MINIMAL.replace("wood: 50", "wood: 5");
        let scenario: Scenario = serde_yaml::from_str(&text).unwrap();
        assert!(scenario.build_world().is_err());
    }
}
