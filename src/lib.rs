//! A settlement simulation: a resource ledger, land regions, a catalog of
//! structure archetypes, worker assignment, fame and rank progression, and a
//! calendar-driven tick.

pub mod buildings;
pub mod calendar;
pub mod catalog;
pub mod clock;
pub mod commands;
pub mod engine;
pub mod events;
pub mod land;
pub mod population;
pub mod progression;
pub mod resources;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod systems;
pub mod web;
pub mod world;

pub use commands::{Command, CommandError, CommandOutcome};
pub use engine::{Engine, EngineBuilder, EngineSettings, TickReport};
pub use events::Notification;
pub use scenario::{Scenario, ScenarioLoader};
pub use world::World;
