//! Terrain visualization model
//!
//! Holds the source grid, its Laplacian pyramid and the grids derived from
//! it. Derived grids are cached and dropped by the setters that affect them;
//! they are recomputed on the next read. Setters and grid accessors run in
//! the model's processing mode; rendering runs in the caller's context and
//! can be cancelled through it.
//!
//! ```text
//! grid ─► pyramid ─► generalized ─┬─► slope ───────► contours (foreground)
//!                                 ├─► plan oblique ─► colorizer (background)
//!                                 └─► local filter ─► colorizer (local modes)
//! ```

use std::sync::Arc;
use std::time::Instant;

use terrashade_algorithms::ops;
use terrashade_algorithms::pyramid::{generalize, GaussianPyramid, LaplacianPyramid};
use terrashade_algorithms::terrain::{
    illuminated_contours, plan_oblique, ContourParams, ShadingParams,
};
use terrashade_colormap::{
    colorize, BivariateColorRenderer, ColorRamp, ColorVisualization, ColorizerParams, Rgb,
};
use terrashade_core::{ArgbImage, Error, Grid, Result};
use terrashade_parallel::{ProcessingMode, TaskContext};
use tracing::{debug, info};

use crate::local::LocalGridModel;
use crate::settings::{validate_plan_oblique_angle, ForegroundVisualization, Settings};

#[derive(Debug, Clone)]
struct Source {
    grid: Grid,
    min_max: (f32, f32),
    pyramid: Arc<LaplacianPyramid>,
}

#[derive(Debug, Clone)]
struct Generalized {
    grid: Grid,
    slope: Grid,
}

/// Source grid, rendering settings and memoized derived grids.
#[derive(Debug, Clone, Default)]
pub struct Model {
    settings: Settings,
    source: Option<Source>,
    generalized: Option<Generalized>,
    local: LocalGridModel,
    bivariate: BivariateColorRenderer,
    mode: ProcessingMode,
}

fn no_grid() -> Error {
    Error::Other("no grid has been set".into())
}

fn interrupted() -> Error {
    Error::Algorithm("grid computation was cancelled".into())
}

impl Model {
    /// An empty model with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Result<Self> {
        let mut model = Self::new();
        model.set_settings(settings)?;
        Ok(model)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace all settings, invalidating the derived grids they affect
    pub fn set_settings(&mut self, settings: Settings) -> Result<()> {
        settings.validate()?;
        self.bivariate.set_params(settings.bivariate.clone())?;
        self.local.set_params(settings.local_filter)?;
        if settings.generalization != self.settings.generalization {
            self.invalidate_generalized();
        }
        self.settings = settings;
        Ok(())
    }

    /// Processing mode of the work done outside rendering: pyramid
    /// building, grid edits and the grid accessors
    pub fn set_processing_mode(&mut self, mode: ProcessingMode) {
        self.mode = mode;
    }

    pub fn processing_mode(&self) -> ProcessingMode {
        self.mode
    }

    /// Context of setters and accessors; never cancelled
    fn own_context(&self) -> TaskContext {
        TaskContext::new().with_mode(self.mode)
    }

    // ─── Grid ──────────────────────────────────────────────────────────

    /// Set the elevation grid, build its pyramids and regenerate the
    /// generalized grid.
    pub fn set_grid(&mut self, grid: Grid) -> Result<()> {
        let Some(min_max) = grid.min_max() else {
            return Err(Error::invalid_parameter(
                "grid",
                "all void",
                "must contain at least one valid cell",
            ));
        };
        let start = Instant::now();
        let ctx = self.own_context();
        let gaussian = GaussianPyramid::new(&grid, &ctx)?.ok_or_else(interrupted)?;
        let pyramid = LaplacianPyramid::new(&gaussian, &ctx)?.ok_or_else(interrupted)?;
        debug!(
            "built {}-level pyramid for {}x{} grid in {:?}",
            pyramid.len(),
            grid.cols(),
            grid.rows(),
            start.elapsed()
        );
        self.source = Some(Source {
            grid,
            min_max,
            pyramid: Arc::new(pyramid),
        });
        self.invalidate_generalized();
        self.ensure_generalized_now()
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.source.as_ref().map(|s| &s.grid)
    }

    /// Value range of the source grid, ignoring voids
    pub fn grid_min_max(&self) -> Option<(f32, f32)> {
        self.source.as_ref().map(|s| s.min_max)
    }

    pub fn laplacian_pyramid(&self) -> Option<&LaplacianPyramid> {
        self.source.as_ref().map(|s| s.pyramid.as_ref())
    }

    /// Multiply every elevation by `factor` and rebuild
    pub fn scale_grid(&mut self, factor: f32) -> Result<()> {
        let grid = self.grid().ok_or_else(no_grid)?;
        let scaled = ops::scale(grid, factor, &self.own_context()).ok_or_else(interrupted)?;
        self.set_grid(scaled)
    }

    /// Add `offset` to every elevation and rebuild
    pub fn vertically_offset_grid(&mut self, offset: f32) -> Result<()> {
        let grid = self.grid().ok_or_else(no_grid)?;
        let shifted = ops::add(grid, offset, &self.own_context()).ok_or_else(interrupted)?;
        self.set_grid(shifted)
    }

    /// Turn every cell equal to `value` into a void and rebuild
    pub fn void_grid_value(&mut self, value: f32) -> Result<()> {
        let grid = self.grid().ok_or_else(no_grid)?;
        let voided = ops::void_value(grid, value, &self.own_context()).ok_or_else(interrupted)?;
        self.set_grid(voided)
    }

    // ─── Derived grids ─────────────────────────────────────────────────

    fn invalidate_generalized(&mut self) {
        self.generalized = None;
        self.local.clear();
    }

    /// Regenerate the generalized and slope grids if they were dropped.
    ///
    /// `false` if cancelled through `ctx`; nothing is cached then.
    fn ensure_generalized(&mut self, ctx: &TaskContext) -> Result<bool> {
        if self.generalized.is_some() {
            return Ok(true);
        }
        let Some(source) = &self.source else {
            return Ok(true);
        };
        let start = Instant::now();
        let params = &self.settings.generalization;
        let Some(grid) = generalize(&source.grid, &source.pyramid, params, ctx)? else {
            return Ok(false);
        };
        let Some(slope) = ops::slope_grid(&grid, ctx) else {
            return Ok(false);
        };
        debug!(
            "generalized grid (levels {}, details {}) in {:?}",
            self.settings.generalization.max_levels,
            self.settings.generalization.details,
            start.elapsed()
        );
        self.local
            .set_grid(grid.clone(), source.min_max, Arc::clone(&source.pyramid));
        self.generalized = Some(Generalized { grid, slope });
        Ok(true)
    }

    fn ensure_generalized_now(&mut self) -> Result<()> {
        let ctx = self.own_context();
        if self.ensure_generalized(&ctx)? {
            Ok(())
        } else {
            Err(interrupted())
        }
    }

    /// The generalized grid; `None` without a source grid
    pub fn generalized_grid(&mut self) -> Result<Option<&Grid>> {
        self.ensure_generalized_now()?;
        Ok(self.generalized.as_ref().map(|g| &g.grid))
    }

    /// Slope of the generalized grid; `None` without a source grid
    pub fn generalized_slope_grid(&mut self) -> Result<Option<&Grid>> {
        self.ensure_generalized_now()?;
        Ok(self.generalized.as_ref().map(|g| &g.slope))
    }

    /// The locally filtered generalized grid; `None` without a source grid
    pub fn local_grid(&mut self) -> Result<Option<&Grid>> {
        self.ensure_generalized_now()?;
        let ctx = self.own_context();
        self.local.filtered_grid(&ctx)
    }

    // ─── Setters ───────────────────────────────────────────────────────

    pub fn set_generalization_max_levels(&mut self, max_levels: usize) -> Result<()> {
        let mut params = self.settings.generalization;
        params.max_levels = max_levels;
        params.validate()?;
        if params != self.settings.generalization {
            self.settings.generalization = params;
            self.invalidate_generalized();
        }
        Ok(())
    }

    /// Detail retention in `[-1, 1]`; -1 keeps the source grid unchanged
    pub fn set_generalization_details(&mut self, details: f64) -> Result<()> {
        let mut params = self.settings.generalization;
        params.details = details;
        params.validate()?;
        if params != self.settings.generalization {
            self.settings.generalization = params;
            self.invalidate_generalized();
        }
        Ok(())
    }

    pub fn is_generalizing(&self) -> bool {
        self.settings.generalization.is_generalizing()
    }

    pub fn set_local_high_pass_weight(&mut self, weight: f64) -> Result<()> {
        self.local.set_high_pass_weight(weight)?;
        self.settings.local_filter = *self.local.params();
        Ok(())
    }

    pub fn set_local_std_dev_levels(&mut self, levels: usize) -> Result<()> {
        self.local.set_std_dev_levels(levels)?;
        self.settings.local_filter = *self.local.params();
        Ok(())
    }

    pub fn set_shading(&mut self, shading: ShadingParams) -> Result<()> {
        shading.validate()?;
        self.settings.shading = shading;
        Ok(())
    }

    pub fn set_background(&mut self, background: ColorVisualization) {
        self.settings.background = background;
    }

    pub fn set_foreground(&mut self, foreground: ForegroundVisualization) {
        self.settings.foreground = foreground;
    }

    pub fn is_rendering_foreground(&self) -> bool {
        self.settings.foreground != ForegroundVisualization::None
    }

    pub fn set_ramp(&mut self, ramp: ColorRamp) {
        self.settings.ramp = ramp;
    }

    pub fn set_solid_color(&mut self, color: Rgb) {
        self.settings.solid_color = color;
    }

    pub fn set_contours(&mut self, contours: ContourParams) -> Result<()> {
        contours.validate()?;
        self.settings.contours = contours;
        Ok(())
    }

    pub fn set_plan_oblique_angle(&mut self, angle: f64) -> Result<()> {
        validate_plan_oblique_angle(angle)?;
        self.settings.plan_oblique_angle = angle;
        Ok(())
    }

    pub fn bivariate(&self) -> &BivariateColorRenderer {
        &self.bivariate
    }

    /// The bivariate renderer, for assigning attribute grids and editing
    /// control points
    pub fn bivariate_mut(&mut self) -> &mut BivariateColorRenderer {
        &mut self.bivariate
    }

    // ─── Rendering ─────────────────────────────────────────────────────

    fn colorizer_params(&self) -> ColorizerParams {
        ColorizerParams {
            visualization: self.settings.background,
            ramp: self.settings.ramp.clone(),
            shading: self.settings.shading,
            solid_color: self.settings.solid_color,
        }
    }

    /// Render the background visualization at grid size.
    ///
    /// Bivariate attribute grids must have the shape of the elevation grid.
    /// `None` if cancelled through `ctx`.
    pub fn render_background(&mut self, ctx: &TaskContext) -> Result<Option<ArgbImage>> {
        if !self.ensure_generalized(ctx)? {
            return Ok(None);
        }
        let params = self.colorizer_params();
        let background = params.visualization;
        let start = Instant::now();
        let source = self.source.as_ref().ok_or_else(no_grid)?;

        let image = if background == ColorVisualization::Bivariate {
            let attributes = [self.bivariate.attribute1_grid(), self.bivariate.attribute2_grid()];
            for attribute in attributes.into_iter().flatten() {
                source.grid.check_same_shape(attribute)?;
            }
            let grid = self.bivariate.attribute1_grid().unwrap_or(&source.grid);
            let min_max = self.bivariate.attribute1_min_max().unwrap_or(source.min_max);
            colorize(grid, min_max, &params, &self.bivariate, ctx)?
        } else if background.is_local() {
            let Some(local) = self.local.filtered_grid(ctx)? else {
                return Ok(None);
            };
            colorize(local, source.min_max, &params, &self.bivariate, ctx)?
        } else {
            let generalized = &self.generalized.as_ref().ok_or_else(no_grid)?.grid;
            let angle = self.settings.plan_oblique_angle;
            if angle != 90.0 && background != ColorVisualization::Continuous {
                let Some(sheared) = plan_oblique(generalized, angle, ctx)? else {
                    return Ok(None);
                };
                colorize(&sheared, source.min_max, &params, &self.bivariate, ctx)?
            } else {
                colorize(generalized, source.min_max, &params, &self.bivariate, ctx)?
            }
        };

        if let Some(image) = &image {
            info!(
                "rendered {} background {}x{} in {:?}",
                background,
                image.width(),
                image.height(),
                start.elapsed()
            );
        }
        Ok(image)
    }

    /// Render the foreground at `scale` times the grid size; transparent
    /// where nothing is drawn.
    ///
    /// `None` if cancelled through `ctx`.
    pub fn render_foreground(&mut self, scale: usize, ctx: &TaskContext) -> Result<Option<ArgbImage>> {
        if scale == 0 {
            return Err(Error::invalid_parameter("scale", scale, "must be at least 1"));
        }
        if !self.ensure_generalized(ctx)? {
            return Ok(None);
        }
        let source = self.source.as_ref().ok_or_else(no_grid)?;
        let generalized = self.generalized.as_ref().ok_or_else(no_grid)?;

        let Some(contours) = self.settings.effective_contours() else {
            let (rows, cols) = source.grid.shape();
            return Ok(Some(ArgbImage::new(cols * scale, rows * scale)));
        };
        let start = Instant::now();
        let image = illuminated_contours(
            &generalized.grid,
            &generalized.slope,
            &contours,
            source.min_max,
            scale,
            ctx,
        )?;
        if let Some(image) = &image {
            info!(
                "rendered {} foreground {}x{} in {:?}",
                self.settings.foreground,
                image.width(),
                image.height(),
                start.elapsed()
            );
        }
        Ok(image)
    }

    /// Background enlarged to `scale` times the grid size with the
    /// foreground composited on top.
    ///
    /// `None` if cancelled through `ctx`.
    pub fn render(&mut self, scale: usize, ctx: &TaskContext) -> Result<Option<ArgbImage>> {
        let Some(background) = self.render_background(ctx)? else {
            return Ok(None);
        };
        let mut image = enlarge(&background, scale)?;
        if !self.is_rendering_foreground() {
            return Ok(Some(image));
        }
        let Some(foreground) = self.render_foreground(scale, ctx)? else {
            return Ok(None);
        };
        image.composite_over(&foreground)?;
        Ok(Some(image))
    }
}

/// Pixel replication by an integer factor
fn enlarge(image: &ArgbImage, scale: usize) -> Result<ArgbImage> {
    if scale == 0 {
        return Err(Error::invalid_parameter("scale", scale, "must be at least 1"));
    }
    if scale == 1 {
        return Ok(image.clone());
    }
    let width = image.width() * scale;
    let height = image.height() * scale;
    let src = image.pixels();
    let pixels = (0..height)
        .flat_map(|row| {
            let src_row = row / scale * image.width();
            (0..width).map(move |col| src[src_row + col / scale])
        })
        .collect();
    ArgbImage::from_pixels(width, height, pixels)
}
