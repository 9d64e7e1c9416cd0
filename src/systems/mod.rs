mod calendar;
mod decay;
mod milestones;
mod production;

pub use calendar::CalendarSystem;
pub use decay::DecaySystem;
pub use milestones::MilestoneSystem;
pub use production::ProductionSystem;
