//! Population collaborator contract.
//!
//! The simulation never owns worker lifecycle. It only resolves worker ids to
//! skills and availability through [`PopulationDirectory`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Farming,
    Forestry,
    Mining,
    Masonry,
    Smithing,
    Trade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Laborer,
    Scout,
    Soldier,
}

pub const DEFAULT_SKILL: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub role: Role,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub skills: BTreeMap<Skill, f64>,
}

fn default_available() -> bool {
    true
}

impl WorkerProfile {
    pub fn skill(&self, skill: Skill) -> f64 {
        self.skills.get(&skill).copied().unwrap_or(DEFAULT_SKILL)
    }
}

pub trait PopulationDirectory: Send {
    fn profile(&self, id: WorkerId) -> Option<&WorkerProfile>;

    fn total_population(&self) -> u64;

    /// Members who can leave the settlement for non-labor tasks such as scouting.
    fn available_non_workers(&self) -> usize;

    fn skill_of(&self, id: WorkerId, skill: Skill) -> f64 {
        self.profile(id)
            .map(|profile| profile.skill(skill))
            .unwrap_or(DEFAULT_SKILL)
    }
}

/// In-memory directory used by scenarios and tests.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    members: HashMap<WorkerId, WorkerProfile>,
    dependents: u64,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: WorkerId, profile: WorkerProfile) {
        self.members.insert(id, profile);
    }

    pub fn with_member(mut self, id: WorkerId, profile: WorkerProfile) -> Self {
        self.insert(id, profile);
        self
    }

    pub fn set_dependents(&mut self, dependents: u64) {
        self.dependents = dependents;
    }
}

impl PopulationDirectory for Roster {
    fn profile(&self, id: WorkerId) -> Option<&WorkerProfile> {
        self.members.get(&id)
    }

    fn total_population(&self) -> u64 {
        self.members.len() as u64 + self.dependents
    }

    fn available_non_workers(&self) -> usize {
        self.members
            .values()
            .filter(|p| p.available && p.role != Role::Laborer)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_skills_default_to_one() {
        let roster = Roster::new().with_member(
            WorkerId(1),
            WorkerProfile {
                role: Role::Laborer,
                available: true,
                skills: BTreeMap::from([(Skill::Mining, 6.0)]),
            },
        );
        assert_eq!(roster.skill_of(WorkerId(1), Skill::Mining), 6.0);
        assert_eq!(roster.skill_of(WorkerId(1), Skill::Farming), DEFAULT_SKILL);
        assert_eq!(roster.skill_of(WorkerId(9), Skill::Farming), DEFAULT_SKILL);
    }

    #[test]
    fn scouts_count_as_non_workers_only_when_available() {
        let mut roster = Roster::new();
        for (id, role, available) in [
            (1, Role::Laborer, true),
            (2, Role::Scout, true),
            (3, Role::Soldier, false),
        ] {
            roster.insert(
                WorkerId(id),
                WorkerProfile {
                    role,
                    available,
                    skills: BTreeMap::new(),
                },
            );
        }
        roster.set_dependents(10);
        assert_eq!(roster.available_non_workers(), 1);
        assert_eq!(roster.total_population(), 13);
    }
}
