use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    events::Notification,
    rng::SystemRng,
    world::World,
};

/// Feeds the tick's output and the population total to the milestone
/// detectors.
pub struct MilestoneSystem;

impl MilestoneSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MilestoneSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for MilestoneSystem {
    fn name(&self) -> &str {
        "milestones"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let population = world.population.total_population();
        let produced = std::mem::take(&mut world.last_produced);
        let update = world.progression.observe(&produced, population);

        let awarded: f64 = update.milestones.iter().map(|hit| hit.fame).sum();
        let mut total = world.progression.fame() - awarded;
        for hit in update.milestones {
            total += hit.fame;
            tracing::info!(label = %hit.label, fame = hit.fame, "milestone reached");
            world.notify(Notification::MilestoneReached {
                label: hit.label.clone(),
                fame: hit.fame,
            });
            world.notify(Notification::FameAwarded {
                amount: hit.fame,
                reason: hit.label,
                total,
            });
        }
        for unlock in update.unlocks {
            world.notify(Notification::RankUnlocked(unlock));
        }
        Ok(())
    }
}
