//! # terrashade colormap
//!
//! Turns grids into ARGB images.
//!
//! - [`ColorRamp`]: ordered color stops with piecewise-linear lookup, and
//!   the predefined ramps
//! - [`colorize`]: renders a grid in one of the [`ColorVisualization`] modes
//! - [`BivariateColorRenderer`]: colors from two attribute grids through a
//!   256×256 table interpolated from control points
//!
//! ## Usage
//!
//! ```ignore
//! use terrashade_colormap::{colorize, BivariateColorRenderer, ColorizerParams};
//!
//! let params = ColorizerParams::default();
//! let image = colorize(&grid, min_max, &params, &BivariateColorRenderer::default(), &ctx)?;
//! ```

mod bivariate;
mod colorizer;
mod lab;
mod ramp;

pub use bivariate::{
    BivariateColorPoint, BivariateColorRenderer, BivariateParams, ColorSpace, Weighting, LUT_SIZE,
};
pub use colorizer::{colorize, ColorVisualization, ColorizerParams};
pub use lab::{lab_to_rgb, rgb_to_lab};
pub use ramp::{ColorRamp, ColorStop, Rgb};
