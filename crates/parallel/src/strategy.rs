//! Execution strategies for row-chunked operators

use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "parallel")]
use tracing::warn;

use crate::chunks::RowChunks;
use crate::context::TaskContext;

/// Processing mode for operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing on the calling thread
    Sequential,
    /// One chunk per worker of the global rayon pool
    #[default]
    Parallel,
    /// Parallel with a dedicated pool of the given number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Number of workers the rows are partitioned for
    pub fn workers(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => num_threads(),
            ProcessingMode::ParallelWith(n) => (*n).max(1),
        }
    }
}

/// Outcome of a cancellable operation.
///
/// A cancelled destination buffer holds undefined values and must be
/// discarded by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Completion {
    Finished,
    Cancelled,
}

impl Completion {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Completion::Cancelled)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Completion::Finished)
    }
}

/// Number of worker threads available to parallel operators
pub fn num_threads() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}

/// Apply `op` to every row of a row-major destination buffer.
///
/// `dst` holds `dst.len() / cols` rows of `cols` values. The rows are
/// partitioned into `min(workers, rows)` contiguous chunks that run
/// concurrently; the call returns once every chunk has finished. `op`
/// receives the row index and that row's slice of `dst`, and may only write
/// to the slice it was given.
///
/// The cancellation flag is polled before each row. Once it is set, workers
/// stop writing and the call returns [`Completion::Cancelled`].
pub fn apply_rows<T, F>(dst: &mut [T], cols: usize, ctx: &TaskContext, op: F) -> Completion
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    if cols == 0 || dst.is_empty() {
        return Completion::Finished;
    }
    let rows = dst.len() / cols;
    let chunks = RowChunks::new(rows, ctx.mode().workers());
    let done = AtomicUsize::new(0);

    let run_chunk = |index: usize, chunk: &mut [T]| {
        let start = chunks.range(index).start;
        for (offset, row_slice) in chunk.chunks_mut(cols).enumerate() {
            if ctx.is_cancelled() {
                return;
            }
            op(start + offset, row_slice);
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            let percent = finished * 100 / rows;
            if percent != (finished - 1) * 100 / rows {
                ctx.report(percent as u32);
            }
        }
    };

    let chunk_len = chunks.chunk_rows() * cols;
    let dst = &mut dst[..rows * cols];

    match ctx.mode() {
        ProcessingMode::Sequential => {
            dst.chunks_mut(chunk_len)
                .enumerate()
                .for_each(|(i, chunk)| run_chunk(i, chunk));
        }
        #[cfg(feature = "parallel")]
        ProcessingMode::Parallel => {
            dst.par_chunks_mut(chunk_len)
                .enumerate()
                .for_each(|(i, chunk)| run_chunk(i, chunk));
        }
        #[cfg(feature = "parallel")]
        ProcessingMode::ParallelWith(threads) => {
            match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => pool.install(|| {
                    dst.par_chunks_mut(chunk_len)
                        .enumerate()
                        .for_each(|(i, chunk)| run_chunk(i, chunk));
                }),
                Err(e) => {
                    warn!("cannot build a {threads}-thread pool ({e}), using the global pool");
                    dst.par_chunks_mut(chunk_len)
                        .enumerate()
                        .for_each(|(i, chunk)| run_chunk(i, chunk));
                }
            }
        }
        #[cfg(not(feature = "parallel"))]
        _ => {
            dst.chunks_mut(chunk_len)
                .enumerate()
                .for_each(|(i, chunk)| run_chunk(i, chunk));
        }
    }

    if ctx.is_cancelled() {
        Completion::Cancelled
    } else {
        Completion::Finished
    }
}
