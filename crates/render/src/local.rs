//! Memoized local hypsometric filtering.

use std::sync::Arc;

use terrashade_algorithms::filters::{
    divide_and_rescale, high_pass, local_std_dev, LocalFilterParams,
};
use terrashade_algorithms::pyramid::LaplacianPyramid;
use terrashade_core::{Grid, Result};
use terrashade_parallel::TaskContext;
use tracing::debug;

#[derive(Debug, Clone)]
struct Source {
    grid: Grid,
    min_max: (f32, f32),
    pyramid: Arc<LaplacianPyramid>,
}

/// Locally filtered grid with its high-pass and standard deviation parts
/// cached separately, so that changing one parameter only recomputes the
/// part that depends on it.
#[derive(Debug, Clone, Default)]
pub struct LocalGridModel {
    params: LocalFilterParams,
    source: Option<Source>,
    high_pass: Option<Grid>,
    std_dev: Option<Grid>,
    filtered: Option<Grid>,
}

impl LocalGridModel {
    pub fn new(params: LocalFilterParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            ..Default::default()
        })
    }

    pub fn params(&self) -> &LocalFilterParams {
        &self.params
    }

    pub fn has_grid(&self) -> bool {
        self.source.is_some()
    }

    /// Filter `grid`, rescaling the result to `min_max`. `pyramid` is the
    /// Laplacian pyramid of the unfiltered terrain.
    pub fn set_grid(&mut self, grid: Grid, min_max: (f32, f32), pyramid: Arc<LaplacianPyramid>) {
        self.source = Some(Source {
            grid,
            min_max,
            pyramid,
        });
        self.high_pass = None;
        self.std_dev = None;
        self.filtered = None;
    }

    /// Drop the grid and every derived grid
    pub fn clear(&mut self) {
        *self = Self {
            params: self.params,
            ..Default::default()
        };
    }

    pub fn set_high_pass_weight(&mut self, weight: f64) -> Result<()> {
        let params = LocalFilterParams {
            high_pass_weight: weight,
            ..self.params
        };
        params.validate()?;
        if params != self.params {
            self.params = params;
            self.high_pass = None;
            self.filtered = None;
        }
        Ok(())
    }

    pub fn set_std_dev_levels(&mut self, levels: usize) -> Result<()> {
        let params = LocalFilterParams {
            std_dev_levels: levels,
            ..self.params
        };
        params.validate()?;
        if params != self.params {
            self.params = params;
            self.std_dev = None;
            self.filtered = None;
        }
        Ok(())
    }

    /// Apply both parameters, invalidating only what changed
    pub fn set_params(&mut self, params: LocalFilterParams) -> Result<()> {
        params.validate()?;
        self.set_high_pass_weight(params.high_pass_weight)?;
        self.set_std_dev_levels(params.std_dev_levels)
    }

    /// The filtered grid, recomputed if invalidated.
    ///
    /// `None` without a grid or if cancelled through `ctx`; parts finished
    /// before a cancellation stay cached.
    pub fn filtered_grid(&mut self, ctx: &TaskContext) -> Result<Option<&Grid>> {
        let Some(source) = &self.source else {
            return Ok(None);
        };
        if self.filtered.is_none() {
            if self.high_pass.is_none() {
                debug!("local grid: high pass with weight {}", self.params.high_pass_weight);
                self.high_pass =
                    high_pass(&source.grid, &source.pyramid, self.params.high_pass_weight, ctx)?;
            }
            if self.std_dev.is_none() {
                debug!(
                    "local grid: standard deviation over {} levels",
                    self.params.std_dev_levels
                );
                self.std_dev =
                    local_std_dev(&source.grid, &source.pyramid, self.params.std_dev_levels, ctx)?;
            }
            if let (Some(high), Some(std_dev)) = (&self.high_pass, &self.std_dev) {
                self.filtered = divide_and_rescale(high, std_dev, source.min_max, ctx)?;
            }
        }
        Ok(self.filtered.as_ref())
    }
}
