//! Static building archetypes.
//!
//! Archetypes are loaded once from YAML and validated before the catalog is
//! handed out, so the rest of the crate can rely on every cross reference
//! (upgrade targets, prerequisites) resolving.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::Season;
use crate::land::Terrain;
use crate::population::Skill;
use crate::resources::{Resource, ResourceMap};

const BUILTIN_STRUCTURES: &str = include_str!("../data/structures.yaml");

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchetypeId(pub String);

impl ArchetypeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Housing,
    Resource,
    Military,
    Crafting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRule {
    pub resource: Resource,
    pub per_worker: f64,
    pub skill: Skill,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSlot {
    pub title: String,
    pub max_workers: u32,
    #[serde(default)]
    pub produces: Option<ProductionRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    Housing { capacity: u32 },
    ProductionMultiplier { resource: Resource, factor: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandRequirement {
    #[serde(default)]
    pub terrain: BTreeSet<Terrain>,
    pub acres: u32,
}

impl LandRequirement {
    /// An empty terrain set accepts every terrain.
    pub fn allows(&self, terrain: Terrain) -> bool {
        self.terrain.is_empty() || self.terrain.contains(&terrain)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub min_rank: usize,
    #[serde(default)]
    pub building: Option<ArchetypeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureArchetype {
    pub id: ArchetypeId,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub cost: ResourceMap,
    #[serde(default)]
    pub maintenance: ResourceMap,
    #[serde(default)]
    pub jobs: Vec<JobSlot>,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub land: Option<LandRequirement>,
    #[serde(default)]
    pub requires: Requirements,
    #[serde(default)]
    pub seasonal: Option<BTreeMap<Season, f64>>,
    #[serde(default)]
    pub upgrades_to: Vec<ArchetypeId>,
}

impl StructureArchetype {
    pub fn job_capacity(&self) -> u32 {
        self.jobs.iter().map(|job| job.max_workers).sum()
    }

    pub fn acres(&self) -> u32 {
        self.land.as_ref().map_or(0, |land| land.acres)
    }

    pub fn housing(&self) -> u32 {
        self.effects
            .iter()
            .map(|effect| match effect {
                Effect::Housing { capacity } => *capacity,
                Effect::ProductionMultiplier { .. } => 0,
            })
            .sum()
    }

    pub fn seasonal_multiplier(&self, season: Season) -> f64 {
        self.seasonal
            .as_ref()
            .and_then(|table| table.get(&season).copied())
            .unwrap_or(1.0)
    }

    /// Only the first listed target is ever used.
    pub fn upgrade_target(&self) -> Option<&ArchetypeId> {
        self.upgrades_to.first()
    }

    fn validate(&self, known: &HashSet<&ArchetypeId>) -> Result<(), CatalogError> {
        let invalid = |reason: String| CatalogError::Invalid {
            id: self.id.clone(),
            reason,
        };

        for job in &self.jobs {
            if job.max_workers == 0 {
                return Err(invalid(format!("job '{}' has no worker slots", job.title)));
            }
            if let Some(rule) = &job.produces {
                if !(rule.per_worker >= 0.0 && rule.per_worker.is_finite()) {
                    return Err(invalid(format!(
                        "job '{}' has invalid per-worker output {}",
                        job.title, rule.per_worker
                    )));
                }
            }
        }
        for (kind, amount) in self.cost.iter().chain(self.maintenance.iter()) {
            if !(*amount >= 0.0 && amount.is_finite()) {
                return Err(invalid(format!("invalid {kind} cost {amount}")));
            }
        }
        if let Some(table) = &self.seasonal {
            let bad = table.iter().find(|(_, v)| !(**v >= 0.0 && v.is_finite()));
            if let Some((season, value)) = bad {
                return Err(invalid(format!("invalid {season} multiplier {value}")));
            }
        }
        for effect in &self.effects {
            if let Effect::ProductionMultiplier { resource, factor } = effect {
                if !(*factor > 0.0 && factor.is_finite()) {
                    return Err(invalid(format!("{resource} multiplier must be positive")));
                }
            }
        }

        match self.category {
            Category::Housing if self.housing() == 0 => {
                return Err(invalid("housing structure without housing capacity".into()));
            }
            Category::Resource
                if !self.jobs.iter().any(|job| job.produces.is_some()) =>
            {
                return Err(invalid("resource structure without a producing job".into()));
            }
            _ => {}
        }

        for target in &self.upgrades_to {
            if target == &self.id {
                return Err(invalid("cannot upgrade into itself".into()));
            }
            if !known.contains(target) {
                return Err(CatalogError::UnknownReference {
                    id: self.id.clone(),
                    reference: target.clone(),
                });
            }
        }
        if let Some(prerequisite) = &self.requires.building {
            if !known.contains(prerequisite) {
                return Err(CatalogError::UnknownReference {
                    id: self.id.clone(),
                    reference: prerequisite.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse structure catalog: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("structure '{0}' defined more than once")]
    Duplicate(ArchetypeId),
    #[error("structure '{id}' references unknown structure '{reference}'")]
    UnknownReference {
        id: ArchetypeId,
        reference: ArchetypeId,
    },
    #[error("structure '{id}' is invalid: {reason}")]
    Invalid { id: ArchetypeId, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct StructureCatalog {
    archetypes: BTreeMap<ArchetypeId, StructureArchetype>,
}

impl StructureCatalog {
    pub fn new(archetypes: Vec<StructureArchetype>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for archetype in &archetypes {
            if !seen.insert(&archetype.id) {
                return Err(CatalogError::Duplicate(archetype.id.clone()));
            }
        }
        for archetype in &archetypes {
            archetype.validate(&seen)?;
        }
        let archetypes = archetypes
            .into_iter()
            .map(|archetype| (archetype.id.clone(), archetype))
            .collect();
        Ok(Self { archetypes })
    }

    pub fn from_yaml(text: &str) -> Result<Self, CatalogError> {
        let archetypes: Vec<StructureArchetype> = serde_yaml::from_str(text)?;
        Self::new(archetypes)
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml(BUILTIN_STRUCTURES)
    }

    pub fn get(&self, id: &ArchetypeId) -> Option<&StructureArchetype> {
        self.archetypes.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StructureArchetype> {
        self.archetypes.values()
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}
