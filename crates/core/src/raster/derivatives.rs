//! Local differential operators on grid vertices
//!
//! ```text
//! 3x3 window indexing:
//!
//!   z1 z2 z3      (NW) (N) (NE)
//!   z4 z5 z6  ->  (W)  (C) (E)
//!   z7 z8 z9      (SW) (S) (SE)
//! ```
//!
//! Neighbor indices are clamped to the grid, so border vertices replicate
//! their edge values.

use super::Grid;

impl Grid {
    /// The 3x3 window around (row, col) with neighbors `spacing` vertices
    /// away, clamped at the borders.
    pub fn window(&self, row: usize, col: usize, spacing: usize) -> [f64; 9] {
        let (rows, cols) = self.shape();
        let up = row.saturating_sub(spacing);
        let down = (row + spacing).min(rows - 1);
        let left = col.saturating_sub(spacing);
        let right = (col + spacing).min(cols - 1);
        let z = |r: usize, c: usize| self.value(r, c) as f64;
        [
            z(up, left),
            z(up, col),
            z(up, right),
            z(row, left),
            z(row, col),
            z(row, right),
            z(down, left),
            z(down, col),
            z(down, right),
        ]
    }

    /// Slope at vertex (row, col) as rise over run.
    ///
    /// Horn's weighted 3x3 differences divided by `8 * cell_size`; returns
    /// `sqrt(dz/dx² + dz/dy²)`, not an angle.
    pub fn slope(&self, row: usize, col: usize) -> f64 {
        let [z1, z2, z3, z4, _, z6, z7, z8, z9] = self.window(row, col, 1);
        let eight_cs = 8.0 * self.cell_size();
        let dzdx = ((z3 + 2.0 * z6 + z9) - (z1 + 2.0 * z4 + z7)) / eight_cs;
        let dzdy = ((z7 + 2.0 * z8 + z9) - (z1 + 2.0 * z2 + z3)) / eight_cs;
        (dzdx * dzdx + dzdy * dzdy).sqrt()
    }

    /// Aspect at vertex (row, col) from the four immediate neighbors.
    ///
    /// Radians in `(-π, π]`, 0 = east, counter-clockwise positive, pointing
    /// uphill.
    pub fn aspect(&self, row: usize, col: usize) -> f64 {
        let [_, n, _, w, _, e, _, s, _] = self.window(row, col, 1);
        (n - s).atan2(e - w)
    }
}
