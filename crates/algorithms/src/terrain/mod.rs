//! Terrain rendering operators
//!
//! - Shading: gray values from vertex normals and a light direction
//! - Normal map: vertex normals encoded as colors
//! - Profile curvature
//! - Plan oblique relief: elevation-dependent shearing of grid columns
//! - Illuminated contours

mod curvature;
mod illuminated_contours;
mod normal_map;
mod plan_oblique;
mod shading;

pub use curvature::{profile_curvature, profile_curvature_at, COLORIZER_SPACING};
pub use illuminated_contours::{illuminated_contours, ContourParams, ContourStyle};
pub use normal_map::{normal_map, Channel, NormalMapParams, INVALID_NORMAL_COLOR};
pub use plan_oblique::plan_oblique;
pub use shading::{light_vector, shade_grid, terrain_normal, Shader, Shading, ShadingParams};
