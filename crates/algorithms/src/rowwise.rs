//! Grid-producing wrappers around the row-chunk framework

use terrashade_core::Grid;
use terrashade_parallel::{apply_rows, TaskContext};

/// New grid shaped like `like`, each row written by `op`.
///
/// Runs in the mode of `ctx` and stops at its cancellation flag, returning
/// `None`. Intermediate passes do not report progress.
pub(crate) fn map_rows<F>(like: &Grid, ctx: &TaskContext, op: F) -> Option<Grid>
where
    F: Fn(usize, &mut [f32]) + Sync + Send,
{
    let mut out = like.like(f32::NAN);
    let cols = out.cols();
    apply_rows(out.as_slice_mut(), cols, &ctx.without_progress(), op)
        .is_finished()
        .then_some(out)
}
