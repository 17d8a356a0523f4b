//! Profile curvature
//!
//! Second-order partial derivatives from a 3x3 stencil (Zevenbergen & Thorne
//! 1987), with the stencil neighbors `spacing` vertices away from the center.
//!
//! ```text
//! z1 z2 z3
//! z4 z5 z6
//! z7 z8 z9
//! ```
//!
//!   p  = dz/dx   = (z6 - z4) / (2*d)
//!   q  = dz/dy   = (z2 - z8) / (2*d)
//!   r  = d²z/dx² = (z4 - 2*z5 + z6) / d²
//!   s  = d²z/dxdy = (z3 - z1 - z9 + z7) / (4*d²)
//!   t  = d²z/dy² = (z2 - 2*z5 + z8) / d²
//!
//!   Profile = -(p²r + 2pqs + q²t) / ((p² + q²) (1 + p² + q²)^1.5)
//!
//! where `d = spacing * cellSize`.

use terrashade_core::Grid;
use terrashade_parallel::TaskContext;

use crate::rowwise::map_rows;

/// Stencil spacing used for the profile curvature visualization
pub const COLORIZER_SPACING: usize = 3;

/// Profile curvature at (row, col); 0 on flat terrain, `NaN` if the stencil
/// touches a void. Stencil indices are clamped to the grid.
pub fn profile_curvature_at(grid: &Grid, row: usize, col: usize, spacing: usize) -> f64 {
    let [z1, z2, z3, z4, z5, z6, z7, z8, z9] = grid.window(row, col, spacing.max(1));
    let d = spacing.max(1) as f64 * grid.cell_size();
    let d2 = d * d;

    let p = (z6 - z4) / (2.0 * d);
    let q = (z2 - z8) / (2.0 * d);
    let r = (z4 - 2.0 * z5 + z6) / d2;
    let s = (z3 - z1 - z9 + z7) / (4.0 * d2);
    let t = (z2 - 2.0 * z5 + z8) / d2;

    let p2q2 = p * p + q * q;
    if p2q2.is_nan() || r.is_nan() || s.is_nan() || t.is_nan() {
        return f64::NAN;
    }
    if p2q2 < 1e-20 {
        return 0.0;
    }
    -(p * p * r + 2.0 * p * q * s + q * q * t) / (p2q2 * (1.0 + p2q2).powf(1.5))
}

/// Profile curvature of every vertex; `None` if cancelled through `ctx`
pub fn profile_curvature(grid: &Grid, spacing: usize, ctx: &TaskContext) -> Option<Grid> {
    map_rows(grid, ctx, |row, out| {
        for (col, o) in out.iter_mut().enumerate() {
            *o = profile_curvature_at(grid, row, col, spacing) as f32;
        }
    })
}
