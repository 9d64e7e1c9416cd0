use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    resources::{scale, Resource},
    rng::SystemRng,
    world::World,
};

pub struct ProductionSystem;

impl ProductionSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProductionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ProductionSystem {
    fn name(&self) -> &str {
        "production"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let season = world.calendar.season;
        let per_day = world.buildings.production_pass(
            &world.catalog,
            &world.land,
            world.population.as_ref(),
            season,
        );

        for kind in Resource::ALL {
            if world.ledger.is_known(kind) {
                let rate = per_day.get(&kind).copied().unwrap_or(0.0);
                world.ledger.set_production_rate(kind, rate);
            }
        }

        let delta = scale(&per_day, ctx.dt_days);
        world.ledger.credit(&delta);
        world.last_produced = delta;
        Ok(())
    }
}
