use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::world::{SettlementSnapshot, World};

#[derive(Serialize)]
struct SnapshotFile<'a> {
    written_at: DateTime<Utc>,
    snapshot: &'a SettlementSnapshot,
}

/// Writes a JSON checkpoint every `interval_ticks` ticks. An interval of 0
/// disables writing.
pub struct SnapshotWriter {
    dir: PathBuf,
    interval_ticks: u64,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, interval_ticks: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval_ticks,
        }
    }

    pub fn is_due(&self, tick: u64) -> bool {
        self.interval_ticks != 0 && tick != 0 && tick % self.interval_ticks == 0
    }

    pub fn maybe_write(&self, world: &World, scenario: &str) -> Result<Option<PathBuf>> {
        if !self.is_due(world.tick()) {
            return Ok(None);
        }
        self.write(&world.snapshot(scenario)).map(Some)
    }

    pub fn write(&self, snapshot: &SettlementSnapshot) -> Result<PathBuf> {
        let dir = self.dir.join(&snapshot.scenario);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot dir {}", dir.display()))?;
        let path = dir.join(format!("tick_{:06}.json", snapshot.tick));
        let file = SnapshotFile {
            written_at: Utc::now(),
            snapshot,
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        tracing::debug!(path = %path.display(), tick = snapshot.tick, "snapshot written");
        Ok(path)
    }
}
