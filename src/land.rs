use std::collections::BTreeMap;
use std::fmt;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resources::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub u32);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Plains,
    Forest,
    Hills,
    Mountains,
    Coastline,
    River,
    Marsh,
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Terrain::Plains => "plains",
            Terrain::Forest => "forest",
            Terrain::Hills => "hills",
            Terrain::Mountains => "mountains",
            Terrain::Coastline => "coastline",
            Terrain::River => "river",
            Terrain::Marsh => "marsh",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Potential {
    pub abundance: f64,
    pub accessibility: f64,
}

impl Potential {
    /// Multiplier applied to output of this resource in the region.
    pub fn factor(&self) -> f64 {
        (self.abundance / 100.0) * (self.accessibility / 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub terrain: Terrain,
    pub acreage: u32,
    #[serde(default)]
    pub potential: BTreeMap<Resource, Potential>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExploreError {
    #[error("no unexplored land remains")]
    NoUnexploredLand,
    #[error("no available non-worker unit to send exploring")]
    NoScoutAvailable,
}

const MIN_EXPLORED_ACRES: u32 = 5;
const MAX_EXPLORED_ACRES: u32 = 20;

const TERRAIN_WEIGHTS: &[(Terrain, u32)] = &[
    (Terrain::Plains, 30),
    (Terrain::Forest, 25),
    (Terrain::Hills, 15),
    (Terrain::Mountains, 8),
    (Terrain::Coastline, 7),
    (Terrain::River, 10),
    (Terrain::Marsh, 5),
];

/// Typical abundance for each resource a terrain can yield.
fn terrain_yields(terrain: Terrain) -> &'static [(Resource, f64)] {
    match terrain {
        Terrain::Plains => &[(Resource::Food, 70.0), (Resource::Stone, 15.0)],
        Terrain::Forest => &[(Resource::Wood, 80.0), (Resource::Food, 30.0)],
        Terrain::Hills => &[
            (Resource::Stone, 60.0),
            (Resource::Iron, 35.0),
            (Resource::Food, 25.0),
        ],
        Terrain::Mountains => &[
            (Resource::Iron, 70.0),
            (Resource::Stone, 75.0),
            (Resource::Gold, 20.0),
        ],
        Terrain::Coastline => &[(Resource::Food, 55.0), (Resource::Gold, 25.0)],
        Terrain::River => &[
            (Resource::Food, 75.0),
            (Resource::Wood, 30.0),
            (Resource::Gold, 15.0),
        ],
        Terrain::Marsh => &[(Resource::Food, 25.0), (Resource::Wood, 35.0)],
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LandRegistry {
    regions: BTreeMap<RegionId, Region>,
    unexplored_acres: u32,
}

impl LandRegistry {
    pub fn new(unexplored_acres: u32) -> Self {
        Self {
            regions: BTreeMap::new(),
            unexplored_acres,
        }
    }

    pub fn insert(&mut self, region: Region) {
        self.regions.insert(region.id, region);
    }

    pub fn get(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(&id)
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn unexplored_acres(&self) -> u32 {
        self.unexplored_acres
    }

    /// Acreage left in `id` once `used` acres are taken by sited buildings.
    pub fn remaining_acreage(&self, id: RegionId, used: u32) -> Option<u32> {
        self.get(id)
            .map(|region| region.acreage.saturating_sub(used))
    }

    /// Carves a new region out of the unexplored pool.
    pub fn explore<R: RngCore>(
        &mut self,
        scouts_available: usize,
        rng: &mut R,
    ) -> Result<RegionId, ExploreError> {
        if self.unexplored_acres == 0 {
            return Err(ExploreError::NoUnexploredLand);
        }
        if scouts_available == 0 {
            return Err(ExploreError::NoScoutAvailable);
        }

        let terrain = pick_terrain(rng);
        let rolled = rng.gen_range(MIN_EXPLORED_ACRES..=MAX_EXPLORED_ACRES);
        let acreage = rolled.min(self.unexplored_acres);
        self.unexplored_acres -= acreage;

        let mut potential = BTreeMap::new();
        for (resource, typical) in terrain_yields(terrain) {
            let abundance = (typical * rng.gen_range(0.6_f64..1.3)).clamp(0.0, 100.0);
            let accessibility: f64 = rng.gen_range(30.0..90.0);
            potential.insert(
                *resource,
                Potential {
                    abundance: abundance.round(),
                    accessibility: accessibility.round(),
                },
            );
        }

        let id = RegionId(self.regions.keys().last().map_or(0, |id| id.0 + 1));
        let region = Region {
            id,
            name: format!("Frontier {} ({terrain})", id.0),
            terrain,
            acreage,
            potential,
        };
        tracing::info!(region = %id, %terrain, acreage, "new region explored");
        self.insert(region);
        Ok(id)
    }
}

fn pick_terrain<R: RngCore>(rng: &mut R) -> Terrain {
    let total: u32 = TERRAIN_WEIGHTS.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total);
    for (terrain, weight) in TERRAIN_WEIGHTS {
        if roll < *weight {
            return *terrain;
        }
        roll -= weight;
    }
    Terrain::Plains
}
