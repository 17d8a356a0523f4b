//! # terrashade algorithms
//!
//! Numeric raster pipeline of the terrashade terrain visualization engine.
//!
//! ## Modules
//!
//! - **pyramid**: Gaussian and Laplacian pyramids, generalization weights
//! - **filters**: Gaussian low-pass, local high-pass and standard deviation
//! - **ops**: cell-wise grid arithmetic, masking and rescaling
//! - **terrain**: shading, normal maps, profile curvature, plan oblique
//!   relief and illuminated contours

mod rowwise;

pub mod filters;
pub mod ops;
pub mod pyramid;
pub mod terrain;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::filters::{
        gauss_low_pass, high_pass, local_filter, local_std_dev, GaussLowPass, LocalFilterParams,
    };
    pub use crate::ops::{scale_to_range, slope_grid};
    pub use crate::pyramid::{
        generalize, level_weights, GaussianPyramid, GeneralizationParams, LaplacianPyramid,
    };
    pub use crate::terrain::{
        illuminated_contours, light_vector, normal_map, plan_oblique, profile_curvature,
        shade_grid, ContourParams, ContourStyle, NormalMapParams, ShadingParams,
    };
    pub use terrashade_core::prelude::*;
}
