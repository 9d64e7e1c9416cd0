use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

pub struct DecaySystem;

impl DecaySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DecaySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for DecaySystem {
    fn name(&self) -> &str {
        "decay"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let decay_per_day = world.tuning.decay_per_day;
        world.buildings.decay_pass(ctx.dt_days, decay_per_day);
        Ok(())
    }
}
