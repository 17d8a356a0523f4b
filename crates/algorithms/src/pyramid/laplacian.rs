//! Laplacian pyramid
//!
//! Band-pass decomposition of a grid: level `i` holds the detail lost between
//! Gaussian levels `i` and `i + 1`, the last level holds the coarsest
//! Gaussian level itself. Summing all levels with unit weights reproduces the
//! source at every non-void cell.

use terrashade_core::{Error, Grid, Result};
use terrashade_parallel::TaskContext;
use tracing::debug;

use super::gaussian::{upsample, GaussianPyramid};
use crate::ops;

#[derive(Debug, Clone)]
pub struct LaplacianPyramid {
    levels: Vec<Grid>,
}

impl LaplacianPyramid {
    /// Decompose a Gaussian pyramid; `None` if cancelled through `ctx`
    pub fn new(gaussian: &GaussianPyramid, ctx: &TaskContext) -> Result<Option<Self>> {
        let g = gaussian.levels();
        let mut levels = Vec::with_capacity(g.len());
        for pair in g.windows(2) {
            let Some(expanded) = upsample(&pair[1], &pair[0], ctx) else {
                return Ok(None);
            };
            let Some(band) = ops::diff(&pair[0], &expanded, ctx)? else {
                return Ok(None);
            };
            levels.push(band);
        }
        if let Some(coarsest) = g.last() {
            levels.push(coarsest.clone());
        }
        Ok(Some(Self { levels }))
    }

    /// Build the Gaussian pyramid of `grid` and decompose it
    pub fn from_grid(grid: &Grid, ctx: &TaskContext) -> Result<Option<Self>> {
        match GaussianPyramid::new(grid, ctx)? {
            Some(gaussian) => Self::new(&gaussian, ctx),
            None => Ok(None),
        }
    }

    pub fn levels(&self) -> &[Grid] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// One weight of `w` per level
    pub fn constant_weights(&self, w: f32) -> Vec<f32> {
        vec![w; self.levels.len()]
    }

    /// Weighted sum of all levels at full resolution.
    ///
    /// Coarse levels are expanded one step at a time:
    /// `acc = w[n-1]·L[n-1]`, then `acc = up(acc) + w[i]·L[i]` for each finer
    /// level. With `mask_voids` set, cells that are void in the finest level
    /// (the voids of the source grid) are void in the result. `None` if
    /// cancelled through `ctx`.
    pub fn sum_levels(
        &self,
        weights: &[f32],
        mask_voids: bool,
        ctx: &TaskContext,
    ) -> Result<Option<Grid>> {
        if weights.len() != self.levels.len() {
            return Err(Error::invalid_parameter(
                "weights",
                weights.len(),
                format!("expected one weight for each of {} levels", self.levels.len()),
            ));
        }
        let Some((coarsest, finer)) = self.levels.split_last() else {
            return Err(Error::Algorithm("empty Laplacian pyramid".into()));
        };

        let Some(mut acc) = ops::scale(coarsest, weights[finer.len()], ctx) else {
            return Ok(None);
        };
        for (level, &w) in finer.iter().zip(weights).rev() {
            let Some(mut next) = upsample(&acc, level, ctx) else {
                return Ok(None);
            };
            for (a, &l) in next.as_slice_mut().iter_mut().zip(level.as_slice()) {
                *a += w * l;
            }
            acc = next;
        }
        debug!("summed {} Laplacian levels with weights {:?}", self.len(), weights);

        if mask_voids {
            ops::mask_voids(&self.levels[0], &mut acc)?;
        }
        Ok(Some(acc))
    }
}
