//! Point sampling of grids at arbitrary coordinates
//!
//! All samplers return `NaN` for points outside the grid extent and
//! propagate voids: a `NaN` anywhere in the stencil yields `NaN`.

use super::Grid;

/// Catmull-Rom cubic convolution through four equally spaced values,
/// evaluated at `u` in `[0, 1]` between `c1` and `c2`.
#[inline]
pub fn interp_cubic(u: f64, c0: f64, c1: f64, c2: f64, c3: f64) -> f64 {
    (u * (u * (u * (c3 - 3.0 * c2 + 3.0 * c1 - c0) + (-c3 + 4.0 * c2 - 5.0 * c1 + 2.0 * c0))
        + (c2 - c0))
        + 2.0 * c1)
        / 2.0
}

impl Grid {
    /// Value of the vertex closest to (x, y)
    pub fn nearest(&self, x: f64, y: f64) -> f32 {
        if !self.contains(x, y) {
            return f32::NAN;
        }
        let (r, c) = self.georef().xy_to_vertex(x, y, self.rows());
        let row = (r.round().max(0.0) as usize).min(self.rows() - 1);
        let col = (c.round().max(0.0) as usize).min(self.cols() - 1);
        self.value(row, col)
    }

    /// Bilinear interpolation at (x, y).
    ///
    /// Points on the eastern or southern border (and the south-east corner)
    /// have no cell to their right or below; they are interpolated linearly
    /// along the border instead.
    pub fn bilinear(&self, x: f64, y: f64) -> f64 {
        if !self.contains(x, y) {
            return f64::NAN;
        }
        let (rows, cols) = self.shape();
        let (rf, cf) = self.georef().xy_to_vertex(x, y, rows);
        let row = (rf.floor().max(0.0) as usize).min(rows - 1);
        let col = (cf.floor().max(0.0) as usize).min(cols - 1);
        let dy = (rf - row as f64).clamp(0.0, 1.0);
        let dx = (cf - col as f64).clamp(0.0, 1.0);

        let on_east = col == cols - 1;
        let on_south = row == rows - 1;
        match (on_east, on_south) {
            (true, true) => self.value(row, col) as f64,
            (true, false) => {
                let top = self.value(row, col) as f64;
                let bottom = self.value(row + 1, col) as f64;
                top + dy * (bottom - top)
            }
            (false, true) => {
                let left = self.value(row, col) as f64;
                let right = self.value(row, col + 1) as f64;
                left + dx * (right - left)
            }
            (false, false) => {
                let tl = self.value(row, col) as f64;
                let tr = self.value(row, col + 1) as f64;
                let bl = self.value(row + 1, col) as f64;
                let br = self.value(row + 1, col + 1) as f64;
                let top = tl + dx * (tr - tl);
                let bottom = bl + dx * (br - bl);
                top + dy * (bottom - top)
            }
        }
    }

    /// Bicubic interpolation at (x, y) over a 4x4 stencil.
    ///
    /// Where the stencil would leave the grid next to the enclosing cell, the
    /// missing row or column is mirrored across the border vertex.
    pub fn bicubic(&self, x: f64, y: f64) -> f64 {
        if !self.contains(x, y) {
            return f64::NAN;
        }
        let (rows, cols) = self.shape();
        let (rf, cf) = self.georef().xy_to_vertex(x, y, rows);

        // upper-left vertex of the enclosing cell; the last row/col belongs to
        // the cell before it
        let row1 = (rf.floor().max(0.0) as usize).min(rows - 2);
        let col1 = (cf.floor().max(0.0) as usize).min(cols - 2);
        let v = (rf - row1 as f64).clamp(0.0, 1.0);
        let u = (cf - col1 as f64).clamp(0.0, 1.0);

        let [row0, row2, row3] = mirrored_stencil(row1, rows);
        let [col0, col2, col3] = mirrored_stencil(col1, cols);

        let interp_row = |r: usize| {
            interp_cubic(
                u,
                self.value(r, col0) as f64,
                self.value(r, col1) as f64,
                self.value(r, col2) as f64,
                self.value(r, col3) as f64,
            )
        };

        interp_cubic(
            v,
            interp_row(row0),
            interp_row(row1),
            interp_row(row2),
            interp_row(row3),
        )
    }

    /// Aspect at (x, y) from bicubic samples `sampling_dist` away in each
    /// cardinal direction.
    ///
    /// Radians in `(-π, π]`, 0 = east, counter-clockwise positive, pointing
    /// in the direction of steepest ascent. `NaN` when any sample is void or
    /// outside the grid.
    pub fn aspect_at(&self, x: f64, y: f64, sampling_dist: f64) -> f64 {
        let w = self.bicubic(x - sampling_dist, y);
        let e = self.bicubic(x + sampling_dist, y);
        let s = self.bicubic(x, y - sampling_dist);
        let n = self.bicubic(x, y + sampling_dist);
        (n - s).atan2(e - w)
    }
}

/// Indices `[i0, i2, i3]` around `i1` for a cubic stencil over `n` vertices
/// (`i1 <= n - 2`).
fn mirrored_stencil(i1: usize, n: usize) -> [usize; 3] {
    let i2 = i1 + 1;
    let i0 = if i1 == 0 { i2 } else { i1 - 1 };
    let i3 = if i2 == n - 1 { i1 } else { i2 + 1 };
    [i0, i2, i3]
}
