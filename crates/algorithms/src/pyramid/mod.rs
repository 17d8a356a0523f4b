//! Multiresolution decomposition and terrain generalization

mod gaussian;
mod generalization;
mod laplacian;

pub use gaussian::{GaussianPyramid, MIN_LEVEL_SIZE};
pub use generalization::{
    generalize, level_weights, pyramid_level_weight, GeneralizationParams,
};
pub use laplacian::LaplacianPyramid;
