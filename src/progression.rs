use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resources::{Resource, ResourceMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankTier {
    pub name: String,
    pub threshold: f64,
    #[serde(default)]
    pub vassals: u32,
    #[serde(default)]
    pub villages: u32,
}

pub fn default_rank_table() -> Vec<RankTier> {
    let tier = |name: &str, threshold: f64, vassals: u32, villages: u32| RankTier {
        name: name.to_string(),
        threshold,
        vassals,
        villages,
    };
    vec![
        tier("Commoner", 0.0, 0, 1),
        tier("Landholder", 100.0, 1, 0),
        tier("Knight", 300.0, 2, 1),
        tier("Baron", 750.0, 3, 1),
        tier("Viscount", 1_500.0, 4, 2),
        tier("Earl", 3_000.0, 5, 2),
        tier("Duke", 6_000.0, 8, 3),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapKind {
    Vassals,
    Villages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Rank,
    Vassals,
    Villages,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankUnlock {
    pub rank: usize,
    pub name: String,
    pub max_vassals: u32,
    pub max_villages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Produced(Resource),
    Population,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub label: String,
    pub metric: Metric,
    pub threshold: f64,
    pub fame: f64,
}

pub fn default_milestones() -> Vec<Milestone> {
    let produced = |resource: Resource, threshold: f64, fame: f64| Milestone {
        label: format!("{threshold} {resource} produced"),
        metric: Metric::Produced(resource),
        threshold,
        fame,
    };
    let population = |threshold: f64, fame: f64| Milestone {
        label: format!("population of {threshold}"),
        metric: Metric::Population,
        threshold,
        fame,
    };
    vec![
        produced(Resource::Food, 500.0, 25.0),
        produced(Resource::Food, 5_000.0, 100.0),
        produced(Resource::Wood, 500.0, 25.0),
        produced(Resource::Stone, 250.0, 25.0),
        produced(Resource::Iron, 100.0, 30.0),
        produced(Resource::Tools, 50.0, 40.0),
        produced(Resource::Gold, 200.0, 30.0),
        population(10.0, 20.0),
        population(25.0, 50.0),
        population(50.0, 100.0),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneHit {
    pub label: String,
    pub fame: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressionUpdate {
    pub milestones: Vec<MilestoneHit>,
    pub unlocks: Vec<RankUnlock>,
}

#[derive(Debug, Error, PartialEq)]
pub enum RankTableError {
    #[error("rank table is empty")]
    Empty,
    #[error("first rank must have threshold 0, found {0}")]
    NonZeroBase(f64),
    #[error("rank '{0}' threshold does not increase")]
    NotIncreasing(String),
}

/// Detects the observation at which a cumulative metric first reaches a
/// threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MilestoneTracker {
    milestones: Vec<Milestone>,
    reached: Vec<bool>,
    produced: ResourceMap,
    last_population: Option<u64>,
}

impl MilestoneTracker {
    fn new(milestones: Vec<Milestone>) -> Self {
        Self {
            reached: vec![false; milestones.len()],
            milestones,
            produced: ResourceMap::new(),
            last_population: None,
        }
    }

    fn value(&self, metric: &Metric, population: u64) -> f64 {
        match metric {
            Metric::Produced(resource) => self.produced.get(resource).copied().unwrap_or(0.0),
            Metric::Population => population as f64,
        }
    }

    fn observe(&mut self, produced: &ResourceMap, population: u64) -> Vec<MilestoneHit> {
        let previous_population = self.last_population.unwrap_or(population);
        let before: Vec<f64> = self
            .milestones
            .iter()
            .map(|m| self.value(&m.metric, previous_population))
            .collect();

        for (resource, amount) in produced {
            if *amount > 0.0 {
                *self.produced.entry(*resource).or_insert(0.0) += amount;
            }
        }
        self.last_population = Some(population);

        let mut hits = Vec::new();
        for (index, milestone) in self.milestones.iter().enumerate() {
            if self.reached[index] {
                continue;
            }
            let now = self.value(&milestone.metric, population);
            if now < milestone.threshold {
                continue;
            }
            self.reached[index] = true;
            if before[index] < milestone.threshold {
                hits.push(MilestoneHit {
                    label: milestone.label.clone(),
                    fame: milestone.fame,
                });
            }
        }
        hits
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionTracker {
    fame: f64,
    rank: usize,
    table: Vec<RankTier>,
    milestones: MilestoneTracker,
}

impl ProgressionTracker {
    pub fn new(table: Vec<RankTier>, milestones: Vec<Milestone>) -> Result<Self, RankTableError> {
        let first = table.first().ok_or(RankTableError::Empty)?;
        if first.threshold != 0.0 {
            return Err(RankTableError::NonZeroBase(first.threshold));
        }
        for pair in table.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(RankTableError::NotIncreasing(pair[1].name.clone()));
            }
        }
        Ok(Self {
            fame: 0.0,
            rank: 0,
            table,
            milestones: MilestoneTracker::new(milestones),
        })
    }

    pub fn fame(&self) -> f64 {
        self.fame
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn rank_name(&self) -> &str {
        &self.table[self.rank].name
    }

    pub fn table(&self) -> &[RankTier] {
        &self.table
    }

    /// Fame needed for the next rank, if any remains.
    pub fn next_threshold(&self) -> Option<f64> {
        self.table.get(self.rank + 1).map(|tier| tier.threshold)
    }

    /// Adds fame and returns one unlock per rank crossed. Non-positive amounts
    /// are ignored.
    pub fn add_fame(&mut self, amount: f64, reason: &str) -> Vec<RankUnlock> {
        if amount <= 0.0 || !amount.is_finite() {
            return Vec::new();
        }
        self.fame += amount;
        tracing::debug!(amount, reason, total = self.fame, "fame awarded");

        let mut unlocks = Vec::new();
        while let Some(next) = self.table.get(self.rank + 1) {
            if self.fame < next.threshold {
                break;
            }
            self.rank += 1;
            let unlock = RankUnlock {
                rank: self.rank,
                name: next.name.clone(),
                max_vassals: self.max_allowed(CapKind::Vassals),
                max_villages: self.max_allowed(CapKind::Villages),
            };
            tracing::info!(rank = unlock.rank, name = %unlock.name, "rank unlocked");
            unlocks.push(unlock);
        }
        unlocks
    }

    /// Feeds one tick of produced resources and the current population into
    /// the milestone detectors and awards fame for every milestone reached.
    pub fn observe(&mut self, produced: &ResourceMap, population: u64) -> ProgressionUpdate {
        let milestones = self.milestones.observe(produced, population);
        let mut unlocks = Vec::new();
        for hit in &milestones {
            unlocks.extend(self.add_fame(hit.fame, &hit.label));
        }
        ProgressionUpdate { milestones, unlocks }
    }

    /// Records the baseline so milestones already met are never rewarded.
    pub fn prime(&mut self, population: u64) {
        self.milestones.observe(&ResourceMap::new(), population);
    }

    pub fn max_allowed(&self, kind: CapKind) -> u32 {
        self.table[..=self.rank]
            .iter()
            .map(|tier| match kind {
                CapKind::Vassals => tier.vassals,
                CapKind::Villages => tier.villages,
            })
            .sum()
    }

    pub fn meets_rank_requirement(&self, kind: RequirementKind, value: usize) -> bool {
        match kind {
            RequirementKind::Rank => self.rank >= value,
            RequirementKind::Vassals => value <= self.max_allowed(CapKind::Vassals) as usize,
            RequirementKind::Villages => value <= self.max_allowed(CapKind::Villages) as usize,
        }
    }
}

impl Default for ProgressionTracker {
    fn default() -> Self {
        Self {
            fame: 0.0,
            rank: 0,
            table: default_rank_table(),
            milestones: MilestoneTracker::new(default_milestones()),
        }
    }
}
