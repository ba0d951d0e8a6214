use crate::error::{HeatwaveError, Result};
use serde::{Deserialize, Serialize};

/// How far (in grid steps) a coordinate may sit from a lattice point and
/// still be accepted as lying on it.
pub const LATTICE_TOLERANCE: f64 = 1e-6;

/// Integer lattice coordinates of a grid cell.
///
/// `x` indexes longitude, `y` indexes latitude, both from the grid origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: u32,
    pub y: u32,
}

impl GridCell {
    pub fn new(x: u32, y: u32) -> Self {
        GridCell { x, y }
    }

    /// True if `other` is this cell or one of its 8 Moore neighbours.
    pub fn is_moore_neighbor(&self, other: &GridCell) -> bool {
        self.x.abs_diff(other.x) <= 1 && self.y.abs_diff(other.y) <= 1
    }
}

/// A regular longitude/latitude lattice.
///
/// Cell `(x, y)` sits at `(lon_origin + x * lon_step, lat_origin + y * lat_step)`.
/// The grid identifier `g_id = x * ny + y` is a bijection with `(x, y)`, and
/// ordering by `g_id` is the same as ordering by longitude then latitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub lon_origin: f64,
    pub lat_origin: f64,
    pub lon_step: f64,
    pub lat_step: f64,
    pub nx: u32,
    pub ny: u32,
}

impl GridSpec {
    pub fn new(
        lon_origin: f64,
        lat_origin: f64,
        lon_step: f64,
        lat_step: f64,
        nx: u32,
        ny: u32,
    ) -> Result<Self> {
        let grid = GridSpec {
            lon_origin,
            lat_origin,
            lon_step,
            lat_step,
            nx,
            ny,
        };
        grid.validate()?;
        Ok(grid)
    }

    /// Check steps are positive and the cell count fits a `u32` g_id.
    pub fn validate(&self) -> Result<()> {
        if !(self.lon_step > 0.0 && self.lat_step > 0.0) {
            return Err(HeatwaveError::InvalidConfig(format!(
                "grid steps must be positive (lon {}, lat {})",
                self.lon_step, self.lat_step
            )));
        }
        if !self.lon_origin.is_finite() || !self.lat_origin.is_finite() {
            return Err(HeatwaveError::InvalidConfig(
                "grid origin must be finite".to_string(),
            ));
        }
        if self.nx == 0 || self.ny == 0 {
            return Err(HeatwaveError::InvalidConfig(format!(
                "grid must have at least one cell ({}x{})",
                self.nx, self.ny
            )));
        }
        if (self.nx as u64) * (self.ny as u64) > u32::MAX as u64 {
            return Err(HeatwaveError::InvalidConfig(format!(
                "grid of {}x{} cells does not fit a 32-bit grid id",
                self.nx, self.ny
            )));
        }
        Ok(())
    }

    /// Infer a regular lattice from the coordinates present in the data.
    ///
    /// The origin is the smallest coordinate on each axis and the step the
    /// smallest positive spacing between distinct values. An axis with a
    /// single distinct value gets a unit step.
    pub fn infer<I>(coordinates: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut lons = Vec::new();
        let mut lats = Vec::new();
        for (lon, lat) in coordinates {
            if !lon.is_finite() || !lat.is_finite() {
                return Err(HeatwaveError::NonIntegerCoordinate {
                    longitude: lon,
                    latitude: lat,
                });
            }
            lons.push(lon);
            lats.push(lat);
        }
        if lons.is_empty() {
            return Err(HeatwaveError::EmptyInput(
                "no coordinates to infer a grid from".to_string(),
            ));
        }
        let (lon_origin, lon_step, nx) = infer_axis(lons);
        let (lat_origin, lat_step, ny) = infer_axis(lats);
        GridSpec::new(lon_origin, lat_origin, lon_step, lat_step, nx, ny)
    }

    /// Locate the cell a longitude/latitude pair falls on.
    pub fn locate(&self, longitude: f64, latitude: f64) -> Result<GridCell> {
        let fx = (longitude - self.lon_origin) / self.lon_step;
        let fy = (latitude - self.lat_origin) / self.lat_step;
        let (rx, ry) = (fx.round(), fy.round());
        if !fx.is_finite()
            || !fy.is_finite()
            || (fx - rx).abs() > LATTICE_TOLERANCE
            || (fy - ry).abs() > LATTICE_TOLERANCE
        {
            return Err(HeatwaveError::NonIntegerCoordinate {
                longitude,
                latitude,
            });
        }
        self.cell_at(rx as i64, ry as i64)
    }

    /// Build a cell from signed indices, rejecting anything off the grid.
    pub fn cell_at(&self, x: i64, y: i64) -> Result<GridCell> {
        if x < 0 || y < 0 || x >= self.nx as i64 || y >= self.ny as i64 {
            return Err(HeatwaveError::CellOutOfBounds {
                x,
                y,
                nx: self.nx,
                ny: self.ny,
            });
        }
        Ok(GridCell::new(x as u32, y as u32))
    }

    pub fn contains(&self, cell: &GridCell) -> bool {
        cell.x < self.nx && cell.y < self.ny
    }

    pub fn check(&self, cell: &GridCell) -> Result<()> {
        self.cell_at(cell.x as i64, cell.y as i64).map(|_| ())
    }

    pub fn g_id(&self, cell: &GridCell) -> u32 {
        cell.x * self.ny + cell.y
    }

    pub fn cell(&self, g_id: u32) -> GridCell {
        GridCell::new(g_id / self.ny, g_id % self.ny)
    }

    /// Longitude/latitude of a cell's lattice point.
    pub fn coordinates(&self, cell: &GridCell) -> (f64, f64) {
        (
            self.lon_origin + cell.x as f64 * self.lon_step,
            self.lat_origin + cell.y as f64 * self.lat_step,
        )
    }

    pub fn n_cells(&self) -> usize {
        self.nx as usize * self.ny as usize
    }
}

fn infer_axis(mut values: Vec<f64>) -> (f64, f64, u32) {
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    let origin = values[0];
    let step = values
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(f64::INFINITY, f64::min);
    if !step.is_finite() {
        return (origin, 1.0, 1);
    }
    let span = values[values.len() - 1] - origin;
    let count = (span / step).round() as u32 + 1;
    (origin, step, count)
}
