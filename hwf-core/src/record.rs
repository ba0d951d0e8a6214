use crate::error::Result;
use crate::grid::{GridCell, GridSpec};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;

/// One `(grid cell, date)` row of the daily gridded temperature record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRecord {
    pub cell: GridCell,
    pub g_id: u32,
    pub longitude: f64,
    pub latitude: f64,
    pub date: NaiveDate,
    /// Temperature in degrees Celsius
    pub temperature: f64,
}

impl DailyRecord {
    /// Place a lon/lat observation on the grid.
    pub fn locate(
        grid: &GridSpec,
        longitude: f64,
        latitude: f64,
        date: NaiveDate,
        temperature: f64,
    ) -> Result<Self> {
        let cell = grid.locate(longitude, latitude)?;
        Ok(DailyRecord {
            cell,
            g_id: grid.g_id(&cell),
            longitude,
            latitude,
            date,
            temperature,
        })
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Day of year, 1..=366.
    pub fn ytime(&self) -> u32 {
        self.date.ordinal()
    }
}

/// An extreme `(grid cell, day)` event.
///
/// `id` is a dense index into the extreme-event collection, which is kept
/// ordered by `(itime, x, y)`. Records are immutable once extracted; component
/// and cluster labels are attached alongside, never written into the record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub id: usize,
    pub cell: GridCell,
    pub g_id: u32,
    pub longitude: f64,
    pub latitude: f64,
    pub date: NaiveDate,
    /// Dense day index from the start of the dataset
    pub itime: u32,
    /// Day of year, 1..=366
    pub ytime: u32,
    pub temperature: f64,
    pub threshold: f64,
    pub is_extreme: bool,
    /// HWMId-style magnitude, always >= 0
    pub magnitude: f64,
}

impl EventRecord {
    /// Ordering key used for id assignment and time bucketing.
    pub fn order_key(&self) -> (u32, u32, u32) {
        (self.itime, self.cell.x, self.cell.y)
    }
}

/// Identifier of a connected component of extreme events.
///
/// `ComponentId::ISOLATED` (0) is the shared placeholder for events with no
/// adjacent neighbour; real components are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ComponentId(pub u32);

impl ComponentId {
    pub const ISOLATED: ComponentId = ComponentId(0);

    pub fn is_isolated(&self) -> bool {
        *self == ComponentId::ISOLATED
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
