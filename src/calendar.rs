use std::fmt;

use serde::{Deserialize, Serialize};

pub const DAYS_PER_MONTH: u32 = 30;
pub const MONTHS_PER_YEAR: u32 = 12;
pub const DAYS_PER_SEASON: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub fn next(self) -> Season {
        match self {
            Season::Spring => Season::Summer,
            Season::Summer => Season::Fall,
            Season::Fall => Season::Winter,
            Season::Winter => Season::Spring,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rollover {
    Month { month: u32, year: u32 },
    Season { from: Season, to: Season, year: u32 },
    Year { year: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    pub day: u64,
    pub day_of_season: u32,
    pub day_of_month: u32,
    pub month: u32,
    pub season: Season,
    pub year: u32,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            day: 0,
            day_of_season: 1,
            day_of_month: 1,
            month: 0,
            season: Season::Spring,
            year: 1,
        }
    }
}

impl Calendar {
    /// Advances one day at a time so that every boundary crossed by a long
    /// advance is reported, in month, season, year order within a day.
    pub fn advance(&mut self, days: u32) -> Vec<Rollover> {
        let mut rollovers = Vec::new();
        for _ in 0..days {
            self.day += 1;
            self.day_of_month += 1;
            self.day_of_season += 1;

            let month_turned = self.day_of_month > DAYS_PER_MONTH;
            let season_turned = self.day_of_season > DAYS_PER_SEASON;
            let from = self.season;
            let mut new_year = false;
            if season_turned {
                self.day_of_season = 1;
                self.season = from.next();
                new_year = self.season == Season::Spring;
                if new_year {
                    self.year += 1;
                }
            }

            if month_turned {
                self.day_of_month = 1;
                self.month = (self.month + 1) % MONTHS_PER_YEAR;
                rollovers.push(Rollover::Month {
                    month: self.month,
                    year: self.year,
                });
            }
            if season_turned {
                rollovers.push(Rollover::Season {
                    from,
                    to: self.season,
                    year: self.year,
                });
                if new_year {
                    rollovers.push(Rollover::Year { year: self.year });
                }
            }
        }
        rollovers
    }
}
