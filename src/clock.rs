use std::{fmt, str::FromStr, time::Duration};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Real-time pacing. Speed decides how often ticks happen and how many days
/// each covers; it never changes what a tick does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Speed {
    Slow,
    #[default]
    Normal,
    Fast,
    Fastest,
}

impl Speed {
    pub fn period(self) -> Duration {
        match self {
            Speed::Slow => Duration::from_millis(2_000),
            Speed::Normal => Duration::from_millis(1_000),
            Speed::Fast => Duration::from_millis(500),
            Speed::Fastest => Duration::from_millis(250),
        }
    }

    pub fn days_per_tick(self) -> u32 {
        match self {
            Speed::Slow | Speed::Normal => 1,
            Speed::Fast => 2,
            Speed::Fastest => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Speed::Slow => "slow",
            Speed::Normal => "normal",
            Speed::Fast => "fast",
            Speed::Fastest => "fastest",
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown speed '{0}' (expected slow, normal, fast or fastest)")]
pub struct UnknownSpeed(pub String);

impl FromStr for Speed {
    type Err = UnknownSpeed;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "slow" => Ok(Speed::Slow),
            "normal" => Ok(Speed::Normal),
            "fast" => Ok(Speed::Fast),
            "fastest" => Ok(Speed::Fastest),
            _ => Err(UnknownSpeed(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Clock {
    running: bool,
    speed: Speed,
}

impl Clock {
    pub fn new(speed: Speed, running: bool) -> Self {
        Self { running, speed }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        self.running = true;
    }

    pub fn set_speed(&mut self, speed: Speed) {
        self.speed = speed;
    }

    pub fn period(&self) -> Duration {
        self.speed.period()
    }

    pub fn days_per_tick(&self) -> u32 {
        self.speed.days_per_tick()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(Speed::Normal, true)
    }
}
