//! Cell-wise grid operators
//!
//! Every binary operator requires inputs of identical shape and returns
//! [`Error::SizeMismatch`] otherwise. Voids propagate through arithmetic.
//! Operators run in the mode of the given [`TaskContext`] and return `None`
//! once it is cancelled.

use terrashade_core::{Error, Grid, Result};
use terrashade_parallel::TaskContext;
use tracing::warn;

use crate::rowwise::map_rows;

/// Copy the voids of `src` into `dst`; other cells of `dst` are untouched.
pub fn mask_voids(src: &Grid, dst: &mut Grid) -> Result<()> {
    src.check_same_shape(dst)?;
    for (d, s) in dst.as_slice_mut().iter_mut().zip(src.as_slice()) {
        if s.is_nan() {
            *d = f32::NAN;
        }
    }
    Ok(())
}

/// Turn every cell equal to `value` into a void
pub fn void_value(grid: &Grid, value: f32, ctx: &TaskContext) -> Option<Grid> {
    map_rows(grid, ctx, |row, out| {
        for (o, &v) in out.iter_mut().zip(grid.row_slice(row)) {
            *o = if v == value { f32::NAN } else { v };
        }
    })
}

/// `a - b`
pub fn diff(a: &Grid, b: &Grid, ctx: &TaskContext) -> Result<Option<Grid>> {
    a.check_same_shape(b)?;
    Ok(map_rows(a, ctx, |row, out| {
        let (ra, rb) = (a.row_slice(row), b.row_slice(row));
        for (o, (&va, &vb)) in out.iter_mut().zip(ra.iter().zip(rb)) {
            *o = va - vb;
        }
    }))
}

/// `a / (b + k)`; infinite quotients become voids
pub fn div(a: &Grid, b: &Grid, k: f32, ctx: &TaskContext) -> Result<Option<Grid>> {
    a.check_same_shape(b)?;
    Ok(map_rows(a, ctx, |row, out| {
        let (ra, rb) = (a.row_slice(row), b.row_slice(row));
        for (o, (&va, &vb)) in out.iter_mut().zip(ra.iter().zip(rb)) {
            *o = finite_or_void(va / (vb + k));
        }
    }))
}

/// `(a - b) / (c + k)`; infinite quotients become voids
pub fn diff_div(a: &Grid, b: &Grid, c: &Grid, k: f32, ctx: &TaskContext) -> Result<Option<Grid>> {
    a.check_same_shape(b)?;
    a.check_same_shape(c)?;
    Ok(map_rows(a, ctx, |row, out| {
        let (ra, rb, rc) = (a.row_slice(row), b.row_slice(row), c.row_slice(row));
        for (col, o) in out.iter_mut().enumerate() {
            *o = finite_or_void((ra[col] - rb[col]) / (rc[col] + k));
        }
    }))
}

/// `v * factor`
pub fn scale(grid: &Grid, factor: f32, ctx: &TaskContext) -> Option<Grid> {
    map_rows(grid, ctx, |row, out| {
        for (o, &v) in out.iter_mut().zip(grid.row_slice(row)) {
            *o = v * factor;
        }
    })
}

/// `v + offset`
pub fn add(grid: &Grid, offset: f32, ctx: &TaskContext) -> Option<Grid> {
    map_rows(grid, ctx, |row, out| {
        for (o, &v) in out.iter_mut().zip(grid.row_slice(row)) {
            *o = v + offset;
        }
    })
}

/// Linearly map the grid's own value range onto `[min, max]`.
///
/// Voids stay void. A grid without range (constant or all void) maps to the
/// midpoint of the target range.
pub fn scale_to_range(grid: &Grid, min: f32, max: f32, ctx: &TaskContext) -> Result<Option<Grid>> {
    if min.is_nan() || max.is_nan() || min > max {
        return Err(Error::invalid_parameter(
            "range",
            format!("[{}, {}]", min, max),
            "must be an ordered pair of numbers",
        ));
    }
    let Some((src_min, src_max)) = grid.min_max() else {
        return Ok(Some(grid.clone()));
    };
    let src_range = src_max as f64 - src_min as f64;
    if src_range <= 0.0 {
        warn!("scaling a constant grid to [{}, {}]", min, max);
        let mid = ((min as f64 + max as f64) / 2.0) as f32;
        return Ok(map_rows(grid, ctx, |row, out| {
            for (o, &v) in out.iter_mut().zip(grid.row_slice(row)) {
                *o = if v.is_nan() { f32::NAN } else { mid };
            }
        }));
    }
    let m = (max as f64 - min as f64) / src_range;
    Ok(map_rows(grid, ctx, |row, out| {
        for (o, &v) in out.iter_mut().zip(grid.row_slice(row)) {
            *o = ((v as f64 - src_min as f64) * m + min as f64) as f32;
        }
    }))
}

/// Per-vertex slope (rise over run), see [`Grid::slope`]
pub fn slope_grid(grid: &Grid, ctx: &TaskContext) -> Option<Grid> {
    map_rows(grid, ctx, |row, out| {
        for (col, o) in out.iter_mut().enumerate() {
            *o = grid.slope(row, col) as f32;
        }
    })
}

#[inline]
fn finite_or_void(v: f32) -> f32 {
    if v.is_infinite() {
        f32::NAN
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use terrashade_core::Georef;
    use terrashade_parallel::CancelToken;

    fn ctx() -> TaskContext {
        TaskContext::default()
    }

    fn grid(values: &[f32]) -> Grid {
        Grid::from_vec(values.to_vec(), 3, 3, Georef::default()).unwrap()
    }

    fn seq() -> Grid {
        grid(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0])
    }

    #[test]
    fn test_mask_voids_only_copies_nan() {
        let mut src = seq();
        src.set(1, 1, f32::NAN).unwrap();
        let mut dst = grid(&[0.0; 9]);
        mask_voids(&src, &mut dst).unwrap();
        assert!(dst.value(1, 1).is_nan());
        assert_eq!(dst.void_count(), 1);
        assert_eq!(dst.value(0, 0), 0.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let a = seq();
        let b = Grid::new(4, 3, Georef::default()).unwrap();
        assert!(matches!(diff(&a, &b, &ctx()), Err(Error::SizeMismatch { .. })));
        let mut b = b;
        assert!(mask_voids(&a, &mut b).is_err());
    }

    #[test]
    fn test_void_value() {
        let g = void_value(&seq(), 5.0, &ctx()).unwrap();
        assert!(g.value(1, 1).is_nan());
        assert_eq!(g.void_count(), 1);
    }

    #[test]
    fn test_div_infinite_becomes_void() {
        let a = seq();
        let b = grid(&[-1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let q = div(&a, &b, 1.0, &ctx()).unwrap().unwrap();
        assert!(q.value(0, 0).is_nan());
        assert_relative_eq!(q.value(2, 2), 9.0);
    }

    #[test]
    fn test_diff_div() {
        let a = seq();
        let b = grid(&[1.0; 9]);
        let c = grid(&[1.0; 9]);
        let q = diff_div(&a, &b, &c, 1.0, &ctx()).unwrap().unwrap();
        assert_relative_eq!(q.value(2, 2), 4.0);
        assert_relative_eq!(q.value(0, 0), 0.0);
    }

    #[test]
    fn test_scale_and_add() {
        assert_relative_eq!(scale(&seq(), 2.0, &ctx()).unwrap().value(2, 1), 16.0);
        assert_relative_eq!(add(&seq(), -1.0, &ctx()).unwrap().value(0, 0), 0.0);
    }

    #[test]
    fn test_scale_to_range() {
        let mut g = seq();
        g.set(0, 1, f32::NAN).unwrap();
        let s = scale_to_range(&g, 100.0, 200.0, &ctx()).unwrap().unwrap();
        assert_relative_eq!(s.value(0, 0), 100.0);
        assert_relative_eq!(s.value(2, 2), 200.0);
        assert_relative_eq!(s.value(1, 1), 150.0);
        assert!(s.value(0, 1).is_nan());
    }

    #[test]
    fn test_scale_to_range_constant() {
        let s = scale_to_range(&grid(&[7.0; 9]), 0.0, 10.0, &ctx()).unwrap().unwrap();
        assert!(s.as_slice().iter().all(|&v| v == 5.0));
    }

    #[test]
    fn test_scale_to_range_rejects_reversed() {
        assert!(scale_to_range(&seq(), 2.0, 1.0, &ctx()).is_err());
    }

    #[test]
    fn test_slope_grid_matches_pointwise() {
        let g = seq();
        let s = slope_grid(&g, &ctx()).unwrap();
        for row in 0..3 {
            for col in 0..3 {
                assert_relative_eq!(s.value(row, col), g.slope(row, col) as f32);
            }
        }
    }

    #[test]
    fn test_cancelled_ops_return_none() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let cancelled = TaskContext::new().with_cancel(cancel);
        assert!(scale(&seq(), 2.0, &cancelled).is_none());
        assert!(diff(&seq(), &seq(), &cancelled).unwrap().is_none());
        assert!(scale_to_range(&seq(), 0.0, 1.0, &cancelled).unwrap().is_none());
        // shape errors win over cancellation
        let b = Grid::new(4, 3, Georef::default()).unwrap();
        assert!(diff(&seq(), &b, &cancelled).is_err());
    }
}
