//! Gaussian pyramid
//!
//! Level 0 is the source grid. Each coarser level is the previous one blurred
//! with the separable 5-tap binomial kernel `[1, 4, 6, 4, 1] / 16` and
//! decimated to every second row and column. Borders replicate edge values.
//! Voids are skipped by the blur and the remaining weights renormalized, so
//! a coarse cell is void only when its whole footprint is void.

use terrashade_core::{Georef, Grid, Result};
use terrashade_parallel::TaskContext;
use tracing::debug;

use crate::rowwise::map_rows;

/// Coarse levels are not built once a dimension would drop below this
pub const MIN_LEVEL_SIZE: usize = 4;

const KERNEL: [f64; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

/// Successively blurred and decimated copies of a grid, finest first
#[derive(Debug, Clone)]
pub struct GaussianPyramid {
    levels: Vec<Grid>,
}

impl GaussianPyramid {
    /// Build all levels down to [`MIN_LEVEL_SIZE`]; `None` if cancelled
    /// through `ctx`.
    pub fn new(grid: &Grid, ctx: &TaskContext) -> Result<Option<Self>> {
        let mut levels = vec![grid.clone()];
        loop {
            let Some(finest) = levels.last() else { break };
            let (rows, cols) = (finest.rows() / 2, finest.cols() / 2);
            if rows < MIN_LEVEL_SIZE || cols < MIN_LEVEL_SIZE {
                break;
            }
            let Some(blurred) = blur(finest, ctx) else {
                return Ok(None);
            };
            levels.push(downsample(&blurred, rows, cols)?);
        }
        debug!(
            "Gaussian pyramid: {} levels, coarsest {:?}",
            levels.len(),
            levels.last().map(Grid::shape)
        );
        Ok(Some(Self { levels }))
    }

    pub fn levels(&self) -> &[Grid] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Never true, level 0 always exists
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn into_levels(self) -> Vec<Grid> {
        self.levels
    }
}

/// Separable binomial blur, void-aware, replicating the border
pub(crate) fn blur(grid: &Grid, ctx: &TaskContext) -> Option<Grid> {
    let (rows, cols) = grid.shape();
    let horizontal = map_rows(grid, ctx, |row, out| {
        let src = grid.row_slice(row);
        for (col, o) in out.iter_mut().enumerate() {
            *o = convolve(|k| src[tap(col, k, cols)]);
        }
    })?;
    map_rows(grid, ctx, |row, out| {
        for (col, o) in out.iter_mut().enumerate() {
            *o = convolve(|k| horizontal.value(tap(row, k, rows), col));
        }
    })
}

/// Index of kernel tap `k` (0..5) around `i`, clamped to `0..n`
#[inline]
fn tap(i: usize, k: usize, n: usize) -> usize {
    (i + k).saturating_sub(2).min(n - 1)
}

#[inline]
fn convolve(value: impl Fn(usize) -> f32) -> f32 {
    let mut sum = 0.0;
    let mut weight = 0.0;
    for (k, w) in KERNEL.iter().enumerate() {
        let v = value(k);
        if !v.is_nan() {
            sum += w * v as f64;
            weight += w;
        }
    }
    if weight > 0.0 {
        (sum / weight) as f32
    } else {
        f32::NAN
    }
}

/// Every second vertex of `grid`, starting at (0, 0).
///
/// The coarse grid keeps the north-west corner and doubles the cell size.
fn downsample(grid: &Grid, rows: usize, cols: usize) -> Result<Grid> {
    let cell_size = grid.cell_size() * 2.0;
    let south = grid.north() - (rows - 1) as f64 * cell_size;
    let georef = Georef::new(cell_size, grid.west(), south);
    let mut coarse = Grid::new(rows, cols, georef)?;
    for (i, v) in coarse.as_slice_mut().iter_mut().enumerate() {
        *v = grid.value(2 * (i / cols), 2 * (i % cols));
    }
    Ok(coarse)
}

/// Expand `coarse` to the shape and georeferencing of `fine`.
///
/// Even fine vertices coincide with coarse vertices, odd ones lie halfway
/// between two. Bilinear weights skip void corners; the result is void only
/// when all contributing corners are.
pub(crate) fn upsample(coarse: &Grid, fine: &Grid, ctx: &TaskContext) -> Option<Grid> {
    let (rc, cc) = coarse.shape();
    map_rows(fine, ctx, |row, out| {
        let (r0, r1, fr) = bracket(row, rc);
        for (col, o) in out.iter_mut().enumerate() {
            let (c0, c1, fc) = bracket(col, cc);
            let corners = [
                (coarse.value(r0, c0), (1.0 - fr) * (1.0 - fc)),
                (coarse.value(r0, c1), (1.0 - fr) * fc),
                (coarse.value(r1, c0), fr * (1.0 - fc)),
                (coarse.value(r1, c1), fr * fc),
            ];
            let mut sum = 0.0;
            let mut weight = 0.0;
            for (v, w) in corners {
                if w > 0.0 && !v.is_nan() {
                    sum += w * v as f64;
                    weight += w;
                }
            }
            *o = if weight > 0.0 {
                (sum / weight) as f32
            } else {
                f32::NAN
            };
        }
    })
}

/// Coarse indices bracketing fine index `i` and the fraction between them
#[inline]
fn bracket(i: usize, coarse_len: usize) -> (usize, usize, f64) {
    let r0 = i / 2;
    if r0 >= coarse_len {
        let last = coarse_len - 1;
        return (last, last, 0.0);
    }
    let frac = (i % 2) as f64 * 0.5;
    (r0, (r0 + 1).min(coarse_len - 1), frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use terrashade_parallel::{CancelToken, ProcessingMode};

    fn ctx() -> TaskContext {
        TaskContext::default()
    }

    fn pyramid(grid: &Grid) -> GaussianPyramid {
        GaussianPyramid::new(grid, &ctx()).unwrap().unwrap()
    }

    fn ramp(rows: usize, cols: usize) -> Grid {
        let data = (0..rows * cols).map(|i| (i % cols) as f32 * 2.0).collect();
        Grid::from_vec(data, rows, cols, Georef::new(10.0, 100.0, 200.0)).unwrap()
    }

    #[test]
    fn test_level_shapes() {
        let pyramid = pyramid(&ramp(33, 20));
        let shapes: Vec<_> = pyramid.levels().iter().map(Grid::shape).collect();
        assert_eq!(shapes, vec![(33, 20), (16, 10), (8, 5)]);
    }

    #[test]
    fn test_small_grid_has_one_level() {
        let pyramid = pyramid(&ramp(7, 7));
        assert_eq!(pyramid.len(), 1);
    }

    #[test]
    fn test_coarse_georef_keeps_north_west() {
        let pyramid = pyramid(&ramp(17, 17));
        let (fine, coarse) = (&pyramid.levels()[0], &pyramid.levels()[1]);
        assert_relative_eq!(coarse.cell_size(), 20.0);
        assert_relative_eq!(coarse.west(), fine.west());
        assert_relative_eq!(coarse.north(), fine.north());
    }

    #[test]
    fn test_blur_preserves_constant() {
        let grid = Grid::filled(6, 9, 42.0, Georef::default()).unwrap();
        let blurred = blur(&grid, &ctx()).unwrap();
        for &v in blurred.as_slice() {
            assert_relative_eq!(v, 42.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_blur_fills_single_void() {
        let mut grid = Grid::filled(5, 5, 3.0, Georef::default()).unwrap();
        grid.set(2, 2, f32::NAN).unwrap();
        let blurred = blur(&grid, &ctx()).unwrap();
        assert_relative_eq!(blurred.value(2, 2), 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_upsample_interpolates_ramp() {
        let fine = ramp(9, 9);
        let coarse = downsample(&fine, 4, 4).unwrap();
        let up = upsample(&coarse, &fine, &ctx()).unwrap();
        assert_eq!(up.shape(), fine.shape());
        // odd column halfway between two coarse vertices
        assert_relative_eq!(up.value(2, 1), 2.0, epsilon = 1e-6);
        assert_relative_eq!(up.value(2, 4), 8.0, epsilon = 1e-6);
        // beyond the last coarse vertex the edge value is repeated
        assert_relative_eq!(up.value(8, 8), coarse.value(3, 3), epsilon = 1e-6);
    }

    #[test]
    fn test_upsample_void_only_when_all_corners_void() {
        let mut coarse = Grid::filled(4, 4, 1.0, Georef::default()).unwrap();
        coarse.set(1, 1, f32::NAN).unwrap();
        let fine = Grid::new(8, 8, Georef::default()).unwrap();
        let up = upsample(&coarse, &fine, &ctx()).unwrap();
        assert!(up.value(2, 2).is_nan());
        assert_relative_eq!(up.value(3, 3), 1.0);
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let grid = ramp(40, 37);
        let sequential = TaskContext::new().with_mode(ProcessingMode::Sequential);
        let parallel = TaskContext::new().with_mode(ProcessingMode::ParallelWith(3));
        let a = GaussianPyramid::new(&grid, &sequential).unwrap().unwrap();
        let b = GaussianPyramid::new(&grid, &parallel).unwrap().unwrap();
        assert_eq!(a.levels(), b.levels());
    }

    #[test]
    fn test_cancelled_build_is_none() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let ctx = TaskContext::new().with_cancel(cancel);
        assert!(GaussianPyramid::new(&ramp(33, 20), &ctx).unwrap().is_none());
    }
}
