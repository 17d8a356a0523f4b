//! Shaded relief
//!
//! Normals are estimated at each vertex from its four axis-aligned
//! neighbors: `n = (w - e, s - n, 2·cellSize / exaggeration)`. On the grid
//! border a missing neighbor is replaced by reflecting the opposite one
//! through the center (`n' = 2c - s`), which keeps the gradient instead of
//! flattening it.

use serde::{Deserialize, Serialize};
use terrashade_core::{Algorithm, Error, Grid, Result};
use terrashade_parallel::TaskContext;

use crate::rowwise::map_rows;

/// Parameters for shading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingParams {
    /// Light azimuth in degrees (0 = north, clockwise)
    pub azimuth: f64,
    /// Light zenith angle in degrees (0 = overhead)
    pub zenith: f64,
    /// Constant added to the cosine term, in `[-0.5, 0.5]`
    pub ambient: f64,
    /// Vertical exaggeration
    pub vertical_exaggeration: f64,
}

impl Default for ShadingParams {
    fn default() -> Self {
        Self {
            azimuth: 315.0,
            zenith: 45.0,
            ambient: 0.0,
            vertical_exaggeration: 1.0,
        }
    }
}

impl ShadingParams {
    pub fn validate(&self) -> Result<()> {
        if !self.azimuth.is_finite() {
            return Err(Error::invalid_parameter("azimuth", self.azimuth, "must be finite"));
        }
        if !(0.0..=90.0).contains(&self.zenith) {
            return Err(Error::invalid_parameter(
                "zenith",
                self.zenith,
                "must be in [0, 90] degrees",
            ));
        }
        if !(-0.5..=0.5).contains(&self.ambient) {
            return Err(Error::invalid_parameter(
                "ambient",
                self.ambient,
                "must be in [-0.5, 0.5]",
            ));
        }
        if !(self.vertical_exaggeration > 0.0 && self.vertical_exaggeration.is_finite()) {
            return Err(Error::invalid_parameter(
                "vertical_exaggeration",
                self.vertical_exaggeration,
                "must be a positive number",
            ));
        }
        Ok(())
    }
}

/// Unit vector pointing towards the light.
///
/// x is east, y is north, z is up.
pub fn light_vector(azimuth: f64, zenith: f64) -> [f64; 3] {
    let (az, zen) = (azimuth.to_radians(), zenith.to_radians());
    [az.sin() * zen.sin(), az.cos() * zen.sin(), zen.cos()]
}

/// Unnormalized normal at (row, col) with vertical component `nz`
pub fn terrain_normal(grid: &Grid, row: usize, col: usize, nz: f64) -> [f64; 3] {
    let (rows, cols) = grid.shape();
    let z = |r: usize, c: usize| grid.value(r, c) as f64;
    let center = z(row, col);

    let (north, south) = if row == 0 {
        let s = z(1, col);
        (2.0 * center - s, s)
    } else if row == rows - 1 {
        let n = z(row - 1, col);
        (n, 2.0 * center - n)
    } else {
        (z(row - 1, col), z(row + 1, col))
    };
    let (west, east) = if col == 0 {
        let e = z(row, 1);
        (2.0 * center - e, e)
    } else if col == cols - 1 {
        let w = z(row, col - 1);
        (w, 2.0 * center - w)
    } else {
        (z(row, col - 1), z(row, col + 1))
    };

    [west - east, south - north, nz]
}

/// Gray values from normals and a light direction
#[derive(Debug, Clone, Copy)]
pub struct Shader {
    light: [f64; 3],
    nz: f64,
    ambient: f64,
}

impl Shader {
    /// Shader for `grid`; degree-based cell sizes are converted to meters
    pub fn new(grid: &Grid, params: &ShadingParams) -> Result<Self> {
        params.validate()?;
        let cell_size = grid.georef().metric_cell_size();
        Ok(Self {
            light: light_vector(params.azimuth, params.zenith),
            nz: 2.0 * cell_size / params.vertical_exaggeration,
            ambient: params.ambient,
        })
    }

    /// Vertical normal component used for this grid
    pub fn nz(&self) -> f64 {
        self.nz
    }

    /// Gray value in `[0, 255]` for a normal `(nx, ny)`, `NaN` if void
    #[inline]
    pub fn shade_normal(&self, nx: f64, ny: f64) -> f64 {
        let [lx, ly, lz] = self.light;
        let length = (nx * nx + ny * ny + self.nz * self.nz).sqrt();
        let dot = (nx * lx + ny * ly + self.nz * lz) / length;
        if dot.is_nan() {
            return f64::NAN;
        }
        ((dot + 1.0 + self.ambient) * 127.5).clamp(0.0, 255.0)
    }

    /// Gray value of vertex (row, col), `NaN` if it or a neighbor is void
    #[inline]
    pub fn gray(&self, grid: &Grid, row: usize, col: usize) -> f64 {
        let [nx, ny, _] = terrain_normal(grid, row, col, self.nz);
        self.shade_normal(nx, ny)
    }
}

/// Shaded relief algorithm
#[derive(Debug, Clone, Default)]
pub struct Shading;

impl Algorithm for Shading {
    type Input = Grid;
    type Output = Grid;
    type Params = ShadingParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Shading"
    }

    fn description(&self) -> &'static str {
        "Gray values of a directionally lit terrain"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        shade_grid(&input, &params, &TaskContext::default())?
            .ok_or_else(|| Error::Algorithm("shading was cancelled".into()))
    }
}

/// Gray-value grid in `[0, 255]`, void where a normal cannot be computed.
///
/// `None` if cancelled through `ctx`.
pub fn shade_grid(grid: &Grid, params: &ShadingParams, ctx: &TaskContext) -> Result<Option<Grid>> {
    let shader = Shader::new(grid, params)?;
    Ok(map_rows(grid, ctx, |row, out| {
        for (col, o) in out.iter_mut().enumerate() {
            *o = shader.gray(grid, row, col) as f32;
        }
    }))
}
