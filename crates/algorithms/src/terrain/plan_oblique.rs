//! Plan oblique relief
//!
//! Shears every grid column northwards by `(z - reference) / tan(angle)`,
//! so that higher terrain appears further up the map as in an oblique view
//! while the plan position of the foot of each slope is kept. Each output
//! vertex is interpolated between the two sheared source vertices that
//! bracket it; vertices hidden behind higher terrain are skipped.

use terrashade_core::raster::EARTH_RADIUS;
use terrashade_core::{Error, Grid, Result};
use terrashade_parallel::{apply_rows, TaskContext};

/// Shear `grid` for an inclination `angle` in degrees, `(0, 90]`.
///
/// The reference elevation is the grid minimum. 90° leaves the grid
/// unchanged. `None` if cancelled through `ctx`.
pub fn plan_oblique(grid: &Grid, angle: f64, ctx: &TaskContext) -> Result<Option<Grid>> {
    if !(angle > 0.0 && angle <= 90.0) {
        return Err(Error::invalid_parameter(
            "angle",
            angle,
            "must be in (0, 90] degrees",
        ));
    }
    let Some((reference, _)) = grid.min_max().filter(|_| angle < 90.0) else {
        return Ok(Some(grid.clone()));
    };
    let mut k = 1.0 / angle.to_radians().tan();
    if grid.georef().is_geographic() {
        k /= 1f64.to_radians() * EARTH_RADIUS;
    }

    // columns are independent, so they are sheared as the rows of a
    // transposed buffer
    let (rows, cols) = grid.shape();
    let mut columns = vec![f32::NAN; rows * cols];
    let completion = apply_rows(&mut columns, rows, &ctx.without_progress(), |col, column| {
        shear_column(grid, col, reference as f64, k, column)
    });
    if completion.is_cancelled() {
        return Ok(None);
    }

    let mut sheared = grid.like(f32::NAN);
    let out = sheared.as_slice_mut();
    for (col, column) in columns.chunks(rows).enumerate() {
        for (row, &v) in column.iter().enumerate() {
            out[row * cols + col] = v;
        }
    }
    Ok(Some(sheared))
}

/// Write the sheared values of column `col` into `column`, indexed by row
fn shear_column(grid: &Grid, col: usize, reference: f64, k: f64, column: &mut [f32]) {
    let rows = grid.rows();
    let north = grid.north();
    let cell_size = grid.cell_size();
    let y = |row: usize| north - row as f64 * cell_size;

    // lowest visible sheared vertex below the current target as (y, z); after
    // a void run it restarts at the unsheared position of the next vertex
    let mut lower: Option<(f64, f64)> = None;
    // next source vertex to shear, walking north from the bottom row
    let mut next = rows;

    for row in (0..rows).rev() {
        let target = y(row);
        let mut value = f64::NAN;
        while next > 0 {
            let r = next - 1;
            let z = grid.value(r, col) as f64;
            if z.is_nan() {
                lower = None;
                next -= 1;
                continue;
            }
            let sheared_y = y(r) + (z - reference) * k;
            let (low_y, low_z) = *lower.get_or_insert((y(r), z));
            if sheared_y >= target {
                if target >= low_y {
                    let span = sheared_y - low_y;
                    value = if span > 0.0 {
                        let w = (target - low_y) / span;
                        w * z + (1.0 - w) * low_z
                    } else {
                        z
                    };
                }
                break;
            }
            if sheared_y >= low_y {
                lower = Some((sheared_y, z));
            }
            next -= 1;
        }
        column[row] = value as f32;
    }
}
