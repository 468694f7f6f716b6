use std::fmt;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::world::ActionJournal;

pub const START_HOUR: u8 = 6;

/// Global resource tracking the simulation timeline. One tick is one game hour.
#[derive(Resource, Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GameTime {
    pub tick: u64,
    pub day: u32,
    pub hour: u8,
}

impl Default for GameTime {
    fn default() -> Self {
        Self {
            tick: 0,
            day: 1,
            hour: START_HOUR,
        }
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Day {}, {:02}:00", self.day, self.hour)
    }
}

impl GameTime {
    /// Rebuild the calendar fields from an absolute tick count.
    pub fn at_tick(tick: u64) -> Self {
        let hours = tick + START_HOUR as u64;
        Self {
            tick,
            day: (hours / 24) as u32 + 1,
            hour: (hours % 24) as u8,
        }
    }

    pub fn advance(&mut self) {
        self.tick += 1;
        self.hour += 1;
        if self.hour >= 24 {
            self.hour = 0;
            self.day += 1;
        }
    }

    pub fn advance_hours(&mut self, hours: u32) {
        for _ in 0..hours {
            self.advance();
        }
    }
}

/// System: charges the hours spent by this tick's actions.
pub fn advance_time_system(mut time: ResMut<GameTime>, journal: Res<ActionJournal>) {
    let hours: u32 = journal.0.iter().map(|report| report.hours).sum();
    time.advance_hours(hours);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_rolls_over_at_midnight() {
        let mut time = GameTime::default();
        time.advance_hours(18);
        assert_eq!(time.tick, 18);
        assert_eq!(time.day, 2);
        assert_eq!(time.hour, 0);
        assert_eq!(time.to_string(), "Day 2, 00:00");
    }

    #[test]
    fn tick_rebuilds_calendar() {
        let mut time = GameTime::default();
        time.advance_hours(53);
        assert_eq!(GameTime::at_tick(53), time);
    }
}
