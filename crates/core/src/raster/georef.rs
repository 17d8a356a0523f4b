//! Georeferencing of vertex-registered grids

use serde::{Deserialize, Serialize};

/// Cell size and south-west origin of a grid.
///
/// Grid values sit on vertices: column 0 lies at `west`, the last row at
/// `south`, and row 0 at `north = south + (rows - 1) * cell_size`.
/// ```text
/// x = west + col * cell_size
/// y = north - row * cell_size
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Georef {
    /// Distance between neighboring vertices (same horizontally and vertically)
    pub cell_size: f64,
    /// X coordinate of the first column
    pub west: f64,
    /// Y coordinate of the last row
    pub south: f64,
}

impl Georef {
    pub fn new(cell_size: f64, west: f64, south: f64) -> Self {
        Self {
            cell_size,
            west,
            south,
        }
    }

    /// Y coordinate of row 0 for a grid with `rows` rows
    pub fn north(&self, rows: usize) -> f64 {
        self.south + rows.saturating_sub(1) as f64 * self.cell_size
    }

    /// X coordinate of the last column for a grid with `cols` columns
    pub fn east(&self, cols: usize) -> f64 {
        self.west + cols.saturating_sub(1) as f64 * self.cell_size
    }

    /// Coordinates of vertex (row, col)
    pub fn vertex_to_xy(&self, row: usize, col: usize, rows: usize) -> (f64, f64) {
        (
            self.west + col as f64 * self.cell_size,
            self.north(rows) - row as f64 * self.cell_size,
        )
    }

    /// Fractional (row, col) position of a point; not bounds checked
    pub fn xy_to_vertex(&self, x: f64, y: f64, rows: usize) -> (f64, f64) {
        (
            (self.north(rows) - y) / self.cell_size,
            (x - self.west) / self.cell_size,
        )
    }

    /// Whether the cell size is given in angular degrees rather than linear
    /// units. Such grids are converted to meters before computing normals.
    pub fn is_geographic(&self) -> bool {
        self.cell_size < GEOGRAPHIC_CELL_SIZE_THRESHOLD
    }

    /// Cell size in meters, converting degrees on a sphere of mean Earth radius
    pub fn metric_cell_size(&self) -> f64 {
        if self.is_geographic() {
            self.cell_size.to_radians() * EARTH_RADIUS
        } else {
            self.cell_size
        }
    }
}

impl Default for Georef {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }
}

/// Mean Earth radius in meters
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Cell sizes below this value are taken to be in degrees
pub const GEOGRAPHIC_CELL_SIZE_THRESHOLD: f64 = 0.1;
