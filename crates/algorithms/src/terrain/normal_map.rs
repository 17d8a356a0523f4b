//! Normal maps
//!
//! Encodes the shading normal of every vertex as an RGB color, for use as a
//! bump map by 3D renderers.

use serde::{Deserialize, Serialize};
use terrashade_core::{ArgbImage, Error, Grid, Result};
use terrashade_parallel::{apply_rows, TaskContext};

use super::shading::terrain_normal;

/// Color channel receiving a normal component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    R,
    G,
    B,
}

impl Channel {
    fn shift(self, value: u32) -> u32 {
        match self {
            Channel::R => value << 16,
            Channel::G => value << 8,
            Channel::B => value,
        }
    }
}

/// Parameters for normal map encoding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalMapParams {
    pub x_channel: Channel,
    pub y_channel: Channel,
    pub z_channel: Channel,
    pub invert_x: bool,
    pub invert_y: bool,
    pub invert_z: bool,
    pub vertical_exaggeration: f64,
}

impl Default for NormalMapParams {
    fn default() -> Self {
        Self {
            x_channel: Channel::R,
            y_channel: Channel::G,
            z_channel: Channel::B,
            invert_x: false,
            invert_y: false,
            invert_z: false,
            vertical_exaggeration: 1.0,
        }
    }
}

/// Pixel of a normal with a non-finite length
pub const INVALID_NORMAL_COLOR: u32 = 0xFF00_00FF;

impl NormalMapParams {
    /// Opaque pixel encoding the unnormalized normal `n`
    pub fn encode(&self, [nx, ny, nz]: [f64; 3]) -> u32 {
        let length = (nx * nx + ny * ny + nz * nz).sqrt();
        if !length.is_finite() {
            return INVALID_NORMAL_COLOR;
        }
        let sign = |invert: bool| if invert { -1.0 } else { 1.0 };
        let component = |n: f64, invert: bool| {
            ((sign(invert) * n / length + 1.0) / 2.0 * 255.0).round() as u32
        };
        0xFF00_0000
            | self.x_channel.shift(component(nx, self.invert_x))
            | self.y_channel.shift(component(ny, self.invert_y))
            | self.z_channel.shift(component(nz, self.invert_z))
    }
}

/// Normal map of `grid`, one pixel per vertex.
///
/// `None` if cancelled through `ctx`.
pub fn normal_map(
    grid: &Grid,
    params: &NormalMapParams,
    ctx: &TaskContext,
) -> Result<Option<ArgbImage>> {
    let ve = params.vertical_exaggeration;
    if !(ve > 0.0 && ve.is_finite()) {
        return Err(Error::invalid_parameter(
            "vertical_exaggeration",
            ve,
            "must be a positive number",
        ));
    }
    let nz = 2.0 * grid.georef().metric_cell_size() / ve;
    let (rows, cols) = grid.shape();
    let mut image = ArgbImage::new(cols, rows);
    let completion = apply_rows(image.pixels_mut(), cols, ctx, |row, out| {
        for (col, px) in out.iter_mut().enumerate() {
            *px = params.encode(terrain_normal(grid, row, col, nz));
        }
    });
    Ok(completion.is_finished().then_some(image))
}
