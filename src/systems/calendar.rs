use anyhow::Result;

use crate::{
    calendar::Rollover,
    engine::{System, SystemContext},
    events::Notification,
    rng::SystemRng,
    world::World,
};

/// Moves the calendar and pays fame for every season and year survived.
pub struct CalendarSystem;

impl CalendarSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CalendarSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CalendarSystem {
    fn name(&self) -> &str {
        "calendar"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let rollovers = world.calendar.advance(ctx.tick_days);
        let tuning = world.tuning;
        for rollover in rollovers {
            tracing::debug!(?rollover, "calendar rollover");
            world.notify(Notification::from(rollover));
            match rollover {
                Rollover::Month { .. } => {}
                Rollover::Season { from, .. } => {
                    world.add_fame(tuning.season_fame, &format!("survived {from}"));
                }
                Rollover::Year { year } => {
                    world.add_fame(tuning.year_fame, &format!("survived year {}", year - 1));
                }
            }
        }
        Ok(())
    }
}
