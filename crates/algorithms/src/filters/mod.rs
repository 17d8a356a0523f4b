//! Neighborhood filters

mod gaussian;
mod local;

pub use gaussian::{gauss_low_pass, gaussian_kernel, GaussLowPass, GaussLowPassParams};
pub use local::{divide_and_rescale, high_pass, local_filter, local_std_dev, LocalFilterParams};
