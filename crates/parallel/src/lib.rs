//! # terrashade parallel
//!
//! Row-chunked operator framework shared by every terrashade raster operator.
//!
//! This crate provides:
//! - `RowChunks`: contiguous, non-overlapping half-open row ranges
//! - `ProcessingMode`: sequential or rayon-backed execution
//! - `TaskContext`: cancellation token plus progress sink handed to operators
//! - `apply_rows`: the single "apply over row ranges" higher-order function
//!
//! Without the `parallel` feature every chunk runs on the calling thread.

pub mod chunks;
pub mod context;
pub mod strategy;

pub use chunks::RowChunks;
pub use context::{CancelToken, ProgressSink, TaskContext};
pub use strategy::{apply_rows, num_threads, Completion, ProcessingMode};
