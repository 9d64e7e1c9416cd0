use std::path::PathBuf;

use anyhow::{ensure, Result};
use serde::Serialize;

use crate::{
    commands::{self, Command, CommandError, CommandOutcome},
    events::Notification,
    rng::{RngManager, SystemRng},
    snapshot::SnapshotWriter,
    systems::{CalendarSystem, DecaySystem, MilestoneSystem, ProductionSystem},
    world::{SettlementSnapshot, World},
};

const COMMAND_STREAM: &str = "exploration";

/// Longest single tick accepted, ten years of days. The calendar walks every
/// day of a tick and queues a notification per rollover.
pub const MAX_TICK_DAYS: u32 = 3_600;

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub tick_days: u32,
    pub snapshot_interval_ticks: u64,
    pub snapshot_dir: PathBuf,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    /// Calendar, production, decay, then milestones.
    pub fn with_standard_systems(self) -> Self {
        self.with_system(CalendarSystem::new())
            .with_system(ProductionSystem::new())
            .with_system(DecaySystem::new())
            .with_system(MilestoneSystem::new())
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_ticks,
            ),
            settings: self.settings,
        }
    }
}

/// What one tick did: the state after it and everything observers were told.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub snapshot: SettlementSnapshot,
    pub notifications: Vec<Notification>,
    pub snapshot_path: Option<PathBuf>,
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
}

impl Engine {
    pub fn scenario_name(&self) -> &str {
        &self.settings.scenario_name
    }

    pub fn tick(&mut self, world: &mut World, tick_days: u32) -> Result<TickReport> {
        ensure!(
            (1..=MAX_TICK_DAYS).contains(&tick_days),
            "tick length must be between 1 and {MAX_TICK_DAYS} days, got {tick_days}"
        );
        let current_tick = world.tick();
        for system in &mut self.systems {
            let mut rng_stream = self.rng.stream(system.name());
            let ctx = SystemContext {
                tick: current_tick,
                tick_days,
                dt_days: f64::from(tick_days),
                scenario_name: &self.settings.scenario_name,
            };
            system.run(&ctx, world, &mut rng_stream)?;
        }
        world.advance_time();
        let snapshot_path = self
            .snapshot_writer
            .maybe_write(world, &self.settings.scenario_name)?;
        Ok(TickReport {
            tick: world.tick(),
            snapshot: world.snapshot(&self.settings.scenario_name),
            notifications: world.drain_notifications(),
            snapshot_path,
        })
    }

    pub fn run(&mut self, world: &mut World, ticks: u64) -> Result<()> {
        self.run_with_hook(world, ticks, |_| {})
    }

    pub fn run_with_hook<F>(&mut self, world: &mut World, ticks: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(TickReport),
    {
        let tick_days = self.settings.tick_days;
        for _ in 0..ticks {
            hook(self.tick(world, tick_days)?);
        }
        Ok(())
    }

    /// Applies a command with the engine's deterministic command stream.
    /// Notifications stay queued on the world until the caller drains them.
    pub fn apply(
        &mut self,
        world: &mut World,
        command: Command,
    ) -> Result<CommandOutcome, CommandError> {
        let mut rng = self.rng.stream(COMMAND_STREAM);
        let result = commands::apply(world, command, &mut rng);
        match &result {
            Ok(outcome) => tracing::info!(?outcome, "command applied"),
            Err(err) => tracing::info!(%err, "command rejected"),
        }
        result
    }
}

pub struct SystemContext<'a> {
    pub tick: u64,
    pub tick_days: u32,
    pub dt_days: f64,
    pub scenario_name: &'a str,
}

pub trait System: Send {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}
