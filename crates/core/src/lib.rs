//! # terrashade core
//!
//! Core types and I/O for the terrashade terrain visualization engine.
//!
//! This crate provides:
//! - `Grid`: a georeferenced `f32` elevation grid where `NaN` marks void cells
//! - `Georef`: cell size and south-west origin of a vertex-registered grid
//! - Point sampling (nearest, bilinear, bicubic) and local slope/aspect
//! - `ArgbImage`: the packed ARGB pixel buffer produced by renderers
//! - GeoTIFF reading and writing

pub mod error;
pub mod io;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{ArgbImage, Georef, Grid, VOID_COLOR};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{ArgbImage, Georef, Grid, VOID_COLOR};
    pub use crate::Algorithm;
}

/// Common interface of named grid operators.
///
/// Operators are pure: they read their input and return a new output.
pub trait Algorithm {
    /// Input type for the operator
    type Input;
    /// Output type for the operator
    type Output;
    /// Parameters controlling operator behavior
    type Params: Default;
    /// Error type for operator execution
    type Error: std::error::Error;

    /// Returns the operator name
    fn name(&self) -> &'static str;

    /// Returns a description of what the operator does
    fn description(&self) -> &'static str;

    /// Execute the operator
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
