//! Local hypsometric filtering
//!
//! A high-pass band of the terrain divided by its local standard deviation,
//! so that relief reads the same in flat and in rugged regions.

use serde::{Deserialize, Serialize};
use terrashade_core::{Error, Grid, Result};
use terrashade_parallel::TaskContext;
use tracing::debug;

use super::gauss_low_pass;
use crate::ops;
use crate::pyramid::LaplacianPyramid;
use crate::rowwise::map_rows;

/// Window side of the standard deviation per pyramid level
const FILTER_SIZE_SCALE: usize = 16;

/// Low-pass standard deviation at a high-pass weight of 0
const MIN_STD_DEV: f64 = 0.3;

/// Low-pass standard deviation added per unit of high-pass weight below 1
const STD_DEV_PER_WEIGHT: f64 = 1.2;

/// Parameters for local filtering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalFilterParams {
    /// Amount of detail in the high-pass band. Values below 1 use a Gaussian
    /// low-pass difference, larger values sum that many Laplacian levels
    /// (1.5 = level 0 plus half of level 1).
    pub high_pass_weight: f64,
    /// Pyramid levels in the band used for the standard deviation; the
    /// window side is `levels * 16 + 1` cells.
    pub std_dev_levels: usize,
}

impl Default for LocalFilterParams {
    fn default() -> Self {
        Self {
            high_pass_weight: 1.5,
            std_dev_levels: 3,
        }
    }
}

impl LocalFilterParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.high_pass_weight >= 0.0) || !self.high_pass_weight.is_finite() {
            return Err(Error::invalid_parameter(
                "high_pass_weight",
                self.high_pass_weight,
                "must be a finite number >= 0",
            ));
        }
        if self.std_dev_levels < 1 {
            return Err(Error::invalid_parameter(
                "std_dev_levels",
                self.std_dev_levels,
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Side of the square standard deviation window
    pub fn filter_size(&self) -> usize {
        self.std_dev_levels * FILTER_SIZE_SCALE + 1
    }
}

/// Laplacian weights selecting `weight` levels: full levels below
/// `floor(weight)`, the fractional remainder on the next one.
fn high_pass_weights(levels: usize, weight: f64) -> Vec<f32> {
    let whole = weight.floor() as usize;
    (0..levels)
        .map(|i| {
            if i < whole {
                1.0
            } else if i == whole {
                (weight - i as f64) as f32
            } else {
                0.0
            }
        })
        .collect()
}

/// High-pass band of `grid`.
///
/// Below a weight of 1 this is `grid - lowpass(grid)` with a Gaussian of
/// standard deviation `0.3 + 1.2 * weight`. Otherwise it is the partial sum
/// of the Laplacian `pyramid`, which is faster for large filter sizes.
/// `None` if cancelled through `ctx`.
pub fn high_pass(
    grid: &Grid,
    pyramid: &LaplacianPyramid,
    weight: f64,
    ctx: &TaskContext,
) -> Result<Option<Grid>> {
    if weight < 1.0 {
        let sigma = weight * STD_DEV_PER_WEIGHT + MIN_STD_DEV;
        let Some(low) = gauss_low_pass(grid, sigma, ctx) else {
            return Ok(None);
        };
        ops::diff(grid, &low, ctx)
    } else {
        pyramid.sum_levels(&high_pass_weights(pyramid.len(), weight), true, ctx)
    }
}

/// Root mean square of the first `levels` Laplacian bands over a square
/// window of side `levels * 16 + 1` around each cell.
///
/// The window is truncated at the grid border and void cells contribute
/// nothing, but the sum is always divided by the full window area. Cells that
/// are void in `grid` are void.
pub fn local_std_dev(
    grid: &Grid,
    pyramid: &LaplacianPyramid,
    levels: usize,
    ctx: &TaskContext,
) -> Result<Option<Grid>> {
    let mut weights = pyramid.constant_weights(0.0);
    for w in weights.iter_mut().take(levels) {
        *w = 1.0;
    }
    let Some(band) = pyramid.sum_levels(&weights, true, ctx)? else {
        return Ok(None);
    };
    band.check_same_shape(grid)?;

    let filter_size = levels * FILTER_SIZE_SCALE + 1;
    let half = filter_size / 2;
    let npts = (filter_size * filter_size) as f64;
    let (rows, cols) = grid.shape();
    let table = SquaredSums::new(&band);

    Ok(map_rows(grid, ctx, |row, out| {
        let (top, bottom) = (row.saturating_sub(half), (row + half + 1).min(rows));
        for (col, o) in out.iter_mut().enumerate() {
            if grid.value(row, col).is_nan() {
                continue;
            }
            let (left, right) = (col.saturating_sub(half), (col + half + 1).min(cols));
            *o = (table.sum(top, bottom, left, right) / npts).sqrt() as f32;
        }
    }))
}

/// Summed-area table of squared values; voids count as zero
struct SquaredSums {
    stride: usize,
    sums: Vec<f64>,
}

impl SquaredSums {
    fn new(grid: &Grid) -> Self {
        let (rows, cols) = grid.shape();
        let stride = cols + 1;
        let mut sums = vec![0.0; (rows + 1) * stride];
        for row in 0..rows {
            let mut running = 0.0;
            for (col, &v) in grid.row_slice(row).iter().enumerate() {
                if !v.is_nan() {
                    running += v as f64 * v as f64;
                }
                sums[(row + 1) * stride + col + 1] = sums[row * stride + col + 1] + running;
            }
        }
        Self { stride, sums }
    }

    /// Sum over rows `top..bottom` and columns `left..right`
    fn sum(&self, top: usize, bottom: usize, left: usize, right: usize) -> f64 {
        let at = |r: usize, c: usize| self.sums[r * self.stride + c];
        (at(bottom, right) - at(top, right) - at(bottom, left) + at(top, left)).max(0.0)
    }
}

/// High-pass band divided by local standard deviation, rescaled to the value
/// range of `grid`.
///
/// `pyramid` is the Laplacian pyramid of the unfiltered terrain; `grid` may
/// be a generalized version of it. `None` if cancelled through `ctx`.
pub fn local_filter(
    grid: &Grid,
    pyramid: &LaplacianPyramid,
    params: &LocalFilterParams,
    ctx: &TaskContext,
) -> Result<Option<Grid>> {
    params.validate()?;
    let Some((min, max)) = grid.min_max() else {
        return Ok(Some(grid.clone()));
    };
    let Some(high) = high_pass(grid, pyramid, params.high_pass_weight, ctx)? else {
        return Ok(None);
    };
    let Some(std_dev) = local_std_dev(grid, pyramid, params.std_dev_levels, ctx)? else {
        return Ok(None);
    };
    debug!(
        "local filter: weight {}, window {}",
        params.high_pass_weight,
        params.filter_size()
    );
    divide_and_rescale(&high, &std_dev, (min, max), ctx)
}

/// `high / (std_dev + 1)` rescaled to `min_max`
pub fn divide_and_rescale(
    high: &Grid,
    std_dev: &Grid,
    min_max: (f32, f32),
    ctx: &TaskContext,
) -> Result<Option<Grid>> {
    let Some(filtered) = ops::div(high, std_dev, 1.0, ctx)? else {
        return Ok(None);
    };
    ops::scale_to_range(&filtered, min_max.0, min_max.1, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use terrashade_core::Georef;
    use terrashade_parallel::CancelToken;

    fn ctx() -> TaskContext {
        TaskContext::default()
    }

    fn decompose(grid: &Grid) -> LaplacianPyramid {
        LaplacianPyramid::from_grid(grid, &ctx()).unwrap().unwrap()
    }

    fn terrain(rows: usize, cols: usize) -> Grid {
        let data = (0..rows * cols)
            .map(|i| {
                let (r, c) = ((i / cols) as f32, (i % cols) as f32);
                200.0 + 3.0 * r + 20.0 * (c * 0.9).sin() * (r * 0.4).cos()
            })
            .collect();
        Grid::from_vec(data, rows, cols, Georef::new(10.0, 0.0, 0.0)).unwrap()
    }

    #[test]
    fn test_high_pass_weights() {
        assert_eq!(high_pass_weights(4, 1.5), vec![1.0, 0.5, 0.0, 0.0]);
        assert_eq!(high_pass_weights(3, 2.0), vec![1.0, 1.0, 0.0]);
        assert_eq!(high_pass_weights(2, 5.0), vec![1.0, 1.0]);
    }

    #[test]
    fn test_high_pass_of_constant_is_zero() {
        let grid = Grid::filled(20, 20, 50.0, Georef::default()).unwrap();
        let pyramid = decompose(&grid);
        for weight in [0.5, 1.5] {
            let hp = high_pass(&grid, &pyramid, weight, &ctx()).unwrap().unwrap();
            for &v in hp.as_slice() {
                assert_relative_eq!(v, 0.0, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_squared_sums_match_brute_force() {
        let grid = terrain(6, 7);
        let table = SquaredSums::new(&grid);
        let brute: f64 = (1..4)
            .flat_map(|r| (2..6).map(move |c| (r, c)))
            .map(|(r, c)| (grid.value(r, c) as f64).powi(2))
            .sum();
        assert_relative_eq!(table.sum(1, 4, 2, 6), brute, max_relative = 1e-9);
    }

    #[test]
    fn test_std_dev_uses_nominal_window() {
        let grid = terrain(40, 40);
        let pyramid = decompose(&grid);
        let std = local_std_dev(&grid, &pyramid, 1, &ctx()).unwrap().unwrap();
        // corner windows see a quarter of the cells but divide by the full area
        assert!(std.value(0, 0) < std.value(20, 20));
        assert!(std.as_slice().iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_local_filter_range_and_voids() {
        let mut grid = terrain(48, 48);
        grid.set(5, 30, f32::NAN).unwrap();
        let pyramid = decompose(&grid);
        for weight in [0.4, 1.5] {
            let params = LocalFilterParams {
                high_pass_weight: weight,
                std_dev_levels: 1,
            };
            let filtered = local_filter(&grid, &pyramid, &params, &ctx()).unwrap().unwrap();
            let (min, max) = grid.min_max().unwrap();
            let (fmin, fmax) = filtered.min_max().unwrap();
            assert_relative_eq!(fmin, min, max_relative = 1e-5);
            assert_relative_eq!(fmax, max, max_relative = 1e-5);
            assert!(filtered.value(5, 30).is_nan());
        }
    }

    #[test]
    fn test_rejects_bad_params() {
        let grid = terrain(16, 16);
        let pyramid = decompose(&grid);
        let params = LocalFilterParams {
            high_pass_weight: -1.0,
            std_dev_levels: 3,
        };
        assert!(local_filter(&grid, &pyramid, &params, &ctx()).is_err());
    }

    #[test]
    fn test_cancelled_filter_is_none() {
        let grid = terrain(48, 48);
        let pyramid = decompose(&grid);
        let cancel = CancelToken::new();
        cancel.cancel();
        let cancelled = TaskContext::new().with_cancel(cancel);
        for weight in [0.4, 1.5] {
            let params = LocalFilterParams {
                high_pass_weight: weight,
                std_dev_levels: 1,
            };
            assert!(local_filter(&grid, &pyramid, &params, &cancelled)
                .unwrap()
                .is_none());
        }
    }
}
