//! Seasonal family labels attached to heatwave components.

use serde::Serialize;
use std::fmt;

/// Meteorological seasons on fixed day-of-year ranges.
///
/// Winter: `>= 335` or `<= 59`, Spring: 60-151, Summer: 152-243, Autumn: 244-334.
/// The ranges follow a non-leap calendar; leap years shift by at most one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Autumn];

    /// Season of a (possibly fractional) day of year, using the rounded day.
    pub fn from_day_of_year(day_of_year: f64) -> Season {
        let day = day_of_year.round() as i64;
        match day {
            60..=151 => Season::Spring,
            152..=243 => Season::Summer,
            244..=334 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    /// Stable index, 0 = Winter .. 3 = Autumn
    pub fn index(&self) -> u32 {
        match self {
            Season::Winter => 0,
            Season::Spring => 1,
            Season::Summer => 2,
            Season::Autumn => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Seasonal cluster membership of a heatwave.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Family {
    pub id: u32,
    pub name: String,
}

impl Family {
    pub fn from_season(season: Season) -> Self {
        Family {
            id: season.index(),
            name: season.name().to_string(),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.name)
    }
}
