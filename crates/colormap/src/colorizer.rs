//! Grid-to-image colorizer.
//!
//! Each [`ColorVisualization`] picks a value source per vertex (elevation,
//! shaded gray, slope, aspect, profile curvature or a bivariate lookup) and
//! maps it through a [`ColorRamp`]. Void vertices become transparent pixels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use terrashade_algorithms::terrain::{profile_curvature_at, Shader, ShadingParams, COLORIZER_SPACING};
use terrashade_core::raster::pack_gray;
use terrashade_core::{ArgbImage, Error, Grid, Result, VOID_COLOR};
use terrashade_parallel::{apply_rows, TaskContext};
use tracing::debug;

use crate::bivariate::BivariateColorRenderer;
use crate::ramp::{ColorRamp, Rgb};

/// How grid values are turned into colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColorVisualization {
    /// Shaded relief in gray
    #[default]
    GrayShading,
    /// Shaded gray values mapped through the ramp
    Exposition,
    /// Elevation through the ramp
    Hypsometric,
    /// Elevation through the ramp, darkened by shading
    HypsometricShading,
    /// Locally filtered elevation through the ramp
    LocalHypsometric,
    /// Locally filtered elevation through the ramp, darkened by shading
    LocalHypsometricShading,
    /// Slope (rise over run) in `[0, 1]` through the ramp
    Slope,
    /// Aspect in `[-π, π]` through the ramp
    Aspect,
    /// Profile curvature in `[0, 1]` through the ramp
    ProfileCurvature,
    /// Two attribute grids through a bivariate color table
    Bivariate,
    /// A single solid color
    Continuous,
}

impl ColorVisualization {
    pub const ALL: &[ColorVisualization] = &[
        Self::GrayShading,
        Self::Exposition,
        Self::Hypsometric,
        Self::HypsometricShading,
        Self::LocalHypsometric,
        Self::LocalHypsometricShading,
        Self::Slope,
        Self::Aspect,
        Self::ProfileCurvature,
        Self::Bivariate,
        Self::Continuous,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::GrayShading => "GRAY_SHADING",
            Self::Exposition => "EXPOSITION",
            Self::Hypsometric => "HYPSOMETRIC",
            Self::HypsometricShading => "HYPSOMETRIC_SHADING",
            Self::LocalHypsometric => "LOCAL_HYPSOMETRIC",
            Self::LocalHypsometricShading => "LOCAL_HYPSOMETRIC_SHADING",
            Self::Slope => "SLOPE",
            Self::Aspect => "ASPECT",
            Self::ProfileCurvature => "PROFILE_CURVATURE",
            Self::Bivariate => "BIVARIATE",
            Self::Continuous => "CONTINUOUS",
        }
    }

    /// Renders the locally filtered grid
    pub fn is_local(&self) -> bool {
        matches!(self, Self::LocalHypsometric | Self::LocalHypsometricShading)
    }

    /// Depends on the light direction
    pub fn is_shading(&self) -> bool {
        matches!(
            self,
            Self::GrayShading
                | Self::Exposition
                | Self::HypsometricShading
                | Self::LocalHypsometricShading
        )
    }

    /// Uses a color ramp or a color table
    pub fn is_colored(&self) -> bool {
        matches!(
            self,
            Self::Exposition
                | Self::Bivariate
                | Self::Hypsometric
                | Self::HypsometricShading
                | Self::LocalHypsometric
                | Self::LocalHypsometricShading
                | Self::Slope
                | Self::Aspect
        )
    }
}

impl fmt::Display for ColorVisualization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorVisualization {
    type Err = Error;

    /// Parses names like `HYPSOMETRIC_SHADING` or `hypsometric-shading`
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.name() == normalized)
            .ok_or_else(|| Error::invalid_parameter("visualization", s, "unknown visualization"))
    }
}

/// Parameters for colorizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorizerParams {
    pub visualization: ColorVisualization,
    pub ramp: ColorRamp,
    pub shading: ShadingParams,
    /// Fill color of [`ColorVisualization::Continuous`]
    pub solid_color: Rgb,
}

impl Default for ColorizerParams {
    fn default() -> Self {
        Self {
            visualization: ColorVisualization::default(),
            ramp: ColorRamp::default(),
            shading: ShadingParams::default(),
            solid_color: Rgb::new(192, 192, 192),
        }
    }
}

struct PixelColorizer<'a> {
    grid: &'a Grid,
    ramp: &'a ColorRamp,
    shader: Shader,
    min: f32,
    max: f32,
}

impl PixelColorizer<'_> {
    fn gray(&self, row: usize, col: usize) -> Option<f64> {
        let gray = self.shader.gray(self.grid, row, col);
        (!gray.is_nan()).then_some(gray)
    }

    fn ramp_or_void(&self, value: f64, min: f32, max: f32) -> u32 {
        if value.is_nan() {
            VOID_COLOR
        } else {
            self.ramp.linear_rgb(value as f32, min, max, 1.0)
        }
    }

    fn pixel(&self, visualization: ColorVisualization, row: usize, col: usize) -> u32 {
        use ColorVisualization::*;
        let grid = self.grid;
        // derivatives skip the center vertex, so check it here
        if grid.value(row, col).is_nan() {
            return VOID_COLOR;
        }
        match visualization {
            GrayShading => self.gray(row, col).map_or(VOID_COLOR, |g| pack_gray(g as u8)),
            Exposition => self
                .gray(row, col)
                .map_or(VOID_COLOR, |g| self.ramp.linear_rgb(g as f32, 0.0, 255.0, 1.0)),
            HypsometricShading | LocalHypsometricShading => {
                self.gray(row, col).map_or(VOID_COLOR, |g| {
                    let v = grid.value(row, col);
                    self.ramp.linear_rgb(v, self.min, self.max, (g / 255.0) as f32)
                })
            }
            Hypsometric | LocalHypsometric => {
                self.ramp_or_void(grid.value(row, col) as f64, self.min, self.max)
            }
            Slope => self.ramp_or_void(grid.slope(row, col), 0.0, 1.0),
            Aspect => self.ramp_or_void(
                grid.aspect(row, col),
                -std::f32::consts::PI,
                std::f32::consts::PI,
            ),
            ProfileCurvature => {
                self.ramp_or_void(profile_curvature_at(grid, row, col, COLORIZER_SPACING), 0.0, 1.0)
            }
            // handled by the caller
            Bivariate | Continuous => VOID_COLOR,
        }
    }
}

/// Colorize `grid` into an image of the same size.
///
/// `min_max` is the elevation range mapped onto the ramp by the hypsometric
/// visualizations. [`ColorVisualization::Bivariate`] renders the attribute
/// grids of `bivariate` instead of `grid`; they must have the shape of
/// `grid`, and the image is void when either is missing. Returns `None` if
/// cancelled through `ctx`.
pub fn colorize(
    grid: &Grid,
    min_max: (f32, f32),
    params: &ColorizerParams,
    bivariate: &BivariateColorRenderer,
    ctx: &TaskContext,
) -> Result<Option<ArgbImage>> {
    let (rows, cols) = grid.shape();
    let visualization = params.visualization;
    debug!("colorize {}x{} as {}", cols, rows, visualization);

    if visualization == ColorVisualization::Continuous {
        return Ok(Some(ArgbImage::filled(cols, rows, params.solid_color.to_argb())));
    }

    let mut image = ArgbImage::new(cols, rows);
    let completion = if visualization == ColorVisualization::Bivariate {
        if !bivariate.has_grids() {
            return Ok(Some(image));
        }
        for attribute in [bivariate.attribute1_grid(), bivariate.attribute2_grid()]
            .into_iter()
            .flatten()
        {
            grid.check_same_shape(attribute)?;
        }
        // build the table once, before workers share it
        bivariate.lut();
        apply_rows(image.pixels_mut(), cols, ctx, |row, out| {
            for (col, px) in out.iter_mut().enumerate() {
                *px = bivariate.render_pixel(row, col);
            }
        })
    } else {
        let colorizer = PixelColorizer {
            grid,
            ramp: &params.ramp,
            shader: Shader::new(grid, &params.shading)?,
            min: min_max.0,
            max: min_max.1,
        };
        apply_rows(image.pixels_mut(), cols, ctx, |row, out| {
            for (col, px) in out.iter_mut().enumerate() {
                *px = colorizer.pixel(visualization, row, col);
            }
        })
    };
    Ok(completion.is_finished().then_some(image))
}
