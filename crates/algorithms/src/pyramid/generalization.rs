//! Terrain generalization by weighted Laplacian recombination
//!
//! The `details` parameter in `[-1, 1]` sets how strongly the finest
//! `max_levels` bands are attenuated: −1 keeps everything, 1 removes them all.
//! Bands at or beyond `max_levels` always keep full weight.

use serde::{Deserialize, Serialize};
use terrashade_core::{Error, Grid, Result};
use terrashade_parallel::TaskContext;
use tracing::debug;

use super::LaplacianPyramid;
use crate::ops;

/// Parameters for terrain generalization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralizationParams {
    /// Number of fine pyramid levels subject to attenuation
    pub max_levels: usize,
    /// Detail retention in `[-1, 1]`
    pub details: f64,
}

impl Default for GeneralizationParams {
    fn default() -> Self {
        Self {
            max_levels: 2,
            details: -1.0,
        }
    }
}

impl GeneralizationParams {
    pub fn validate(&self) -> Result<()> {
        if self.max_levels < 1 {
            return Err(Error::invalid_parameter(
                "max_levels",
                self.max_levels,
                "must be at least 1",
            ));
        }
        if !(-1.0..=1.0).contains(&self.details) {
            return Err(Error::invalid_parameter(
                "details",
                self.details,
                "must be in [-1, 1]",
            ));
        }
        Ok(())
    }

    /// Whether any band is attenuated; false means the source is used as is
    pub fn is_generalizing(&self) -> bool {
        self.details > -1.0
    }
}

/// Weight of Laplacian level `level`, in `[0, 1]`.
///
/// Below `max_levels` the weight follows a line `m·level + c`. For positive
/// `details` the line crosses zero at `level = details·max_levels`, so every
/// level up to there is dropped; otherwise it starts at `−details` on
/// level 0.
pub fn pyramid_level_weight(level: usize, params: &GeneralizationParams) -> f32 {
    let max_levels = params.max_levels;
    if level >= max_levels || max_levels == 0 {
        return 1.0;
    }
    let d = params.details;
    if d == 1.0 {
        return 0.0;
    }
    let l = max_levels as f64;
    let (m, c) = if d > 0.0 {
        (1.0 / (l * (1.0 - d)), d / (d - 1.0))
    } else {
        ((1.0 + d) / l, -d)
    };
    (m * level as f64 + c).clamp(0.0, 1.0) as f32
}

/// Weights for every level of a pyramid with `levels` levels
pub fn level_weights(levels: usize, params: &GeneralizationParams) -> Vec<f32> {
    (0..levels)
        .map(|i| pyramid_level_weight(i, params))
        .collect()
}

/// Generalize `grid` using its Laplacian pyramid.
///
/// The result keeps the voids of `grid` and is rescaled to its value range.
/// When not generalizing, returns a copy of `grid`. `None` if cancelled
/// through `ctx`.
pub fn generalize(
    grid: &Grid,
    pyramid: &LaplacianPyramid,
    params: &GeneralizationParams,
    ctx: &TaskContext,
) -> Result<Option<Grid>> {
    params.validate()?;
    if !params.is_generalizing() {
        return Ok(Some(grid.clone()));
    }
    let Some((min, max)) = grid.min_max() else {
        return Ok(Some(grid.clone()));
    };

    let weights = level_weights(pyramid.len(), params);
    debug!("generalizing with weights {:?}", weights);
    let Some(mut generalized) = pyramid.sum_levels(&weights, true, ctx)? else {
        return Ok(None);
    };
    ops::mask_voids(grid, &mut generalized)?;
    ops::scale_to_range(&generalized, min, max, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use terrashade_core::Georef;
    use terrashade_parallel::{CancelToken, ProcessingMode};

    fn ctx() -> TaskContext {
        TaskContext::default()
    }

    fn decompose(grid: &Grid) -> LaplacianPyramid {
        LaplacianPyramid::from_grid(grid, &ctx()).unwrap().unwrap()
    }

    fn params(max_levels: usize, details: f64) -> GeneralizationParams {
        GeneralizationParams {
            max_levels,
            details,
        }
    }

    #[test]
    fn test_weights_full_detail() {
        assert_eq!(level_weights(4, &params(2, -1.0)), vec![1.0; 4]);
    }

    #[test]
    fn test_weights_zero_details() {
        assert_eq!(level_weights(3, &params(2, 0.0)), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_weights_max_details_remove_bands() {
        assert_eq!(level_weights(4, &params(3, 1.0)), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_weights_positive_details() {
        // zero crossing at 0.5 * 4 = 2
        let w = level_weights(5, &params(4, 0.5));
        assert_relative_eq!(w[0], 0.0);
        assert_relative_eq!(w[2], 0.0);
        assert_relative_eq!(w[3], 0.5);
        assert_relative_eq!(w[4], 1.0);
    }

    #[test]
    fn test_weights_zero_up_to_details_times_levels() {
        // zero crossing at 0.75 * 4 = 3, not at 4 * (1 - 0.75) = 1
        let w = level_weights(6, &params(4, 0.75));
        for level in 0..=3 {
            assert_relative_eq!(w[level], 0.0);
        }
        assert_relative_eq!(w[4], 1.0);
        assert_relative_eq!(w[5], 1.0);
    }

    #[test]
    fn test_weights_negative_details() {
        let w = level_weights(3, &params(2, -0.5));
        assert_relative_eq!(w[0], 0.5);
        assert_relative_eq!(w[1], 0.75);
        assert_relative_eq!(w[2], 1.0);
    }

    #[test]
    fn test_validate() {
        assert!(params(0, 0.0).validate().is_err());
        assert!(params(2, 1.5).validate().is_err());
        assert!(params(2, f64::NAN).validate().is_err());
        assert!(params(1, 1.0).validate().is_ok());
        assert!(!params(2, -1.0).is_generalizing());
        assert!(params(2, -0.99).is_generalizing());
    }

    fn hills() -> Grid {
        let data = (0..40 * 40)
            .map(|i| {
                let (r, c) = ((i / 40) as f32, (i % 40) as f32);
                500.0 + 50.0 * (r * 0.2).sin() + 5.0 * (c * 1.3).sin()
            })
            .collect();
        Grid::from_vec(data, 40, 40, Georef::new(30.0, 0.0, 0.0)).unwrap()
    }

    #[test]
    fn test_bypass_is_copy() {
        let grid = hills();
        let pyramid = decompose(&grid);
        let out = generalize(&grid, &pyramid, &params(2, -1.0), &ctx()).unwrap().unwrap();
        assert_eq!(out, grid);
    }

    #[test]
    fn test_generalized_keeps_range_and_voids() {
        let mut grid = hills();
        grid.set(10, 10, f32::NAN).unwrap();
        let pyramid = decompose(&grid);
        let out = generalize(&grid, &pyramid, &params(3, 0.5), &ctx()).unwrap().unwrap();
        let (min, max) = grid.min_max().unwrap();
        let (gmin, gmax) = out.min_max().unwrap();
        assert_relative_eq!(gmin, min, max_relative = 1e-5);
        assert_relative_eq!(gmax, max, max_relative = 1e-5);
        assert!(out.value(10, 10).is_nan());
        assert_eq!(out.void_count(), 1);
    }

    #[test]
    fn test_follows_processing_mode() {
        let grid = hills();
        let pyramid = decompose(&grid);
        let sequential = TaskContext::new().with_mode(ProcessingMode::Sequential);
        let parallel = TaskContext::new().with_mode(ProcessingMode::ParallelWith(3));
        let a = generalize(&grid, &pyramid, &params(3, 0.2), &sequential).unwrap();
        let b = generalize(&grid, &pyramid, &params(3, 0.2), &parallel).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cancelled_generalization_is_none() {
        let grid = hills();
        let pyramid = decompose(&grid);
        let cancel = CancelToken::new();
        cancel.cancel();
        let cancelled = TaskContext::new().with_cancel(cancel);
        assert!(generalize(&grid, &pyramid, &params(3, 0.5), &cancelled)
            .unwrap()
            .is_none());
        // the bypass copies without running any pass
        assert!(generalize(&grid, &pyramid, &params(3, -1.0), &cancelled)
            .unwrap()
            .is_some());
        // invalid parameters are still reported
        assert!(generalize(&grid, &pyramid, &params(0, 0.5), &cancelled).is_err());
    }
}
