//! # terrashade render
//!
//! The terrain visualization model: a source grid with its pyramids, the
//! settings of every rendering stage, and memoized derived grids.
//!
//! ## Usage
//!
//! ```ignore
//! use terrashade_render::{Model, ForegroundVisualization};
//! use terrashade_parallel::TaskContext;
//!
//! let mut model = Model::new();
//! model.set_grid(grid)?;
//! model.set_generalization_details(0.3)?;
//! model.set_foreground(ForegroundVisualization::IlluminatedContours);
//! let image = model.render(2, &TaskContext::default())?;
//! ```

mod local;
mod model;
mod settings;

pub use local::LocalGridModel;
pub use model::Model;
pub use settings::{ForegroundVisualization, Settings};
