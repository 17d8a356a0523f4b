//! Grid data structures, sampling and pixel buffers

mod derivatives;
mod georef;
mod grid;
mod image;
mod sampling;

pub use georef::{Georef, EARTH_RADIUS, GEOGRAPHIC_CELL_SIZE_THRESHOLD};
pub use grid::{Grid, MIN_GRID_SIZE};
pub use image::{pack_argb, pack_gray, unpack_argb, ArgbImage, VOID_COLOR};
pub use sampling::interp_cubic;
