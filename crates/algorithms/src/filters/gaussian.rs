//! Gaussian low-pass filter
//!
//! Separable convolution with a kernel truncated at 3σ. Void neighbors are
//! skipped and the remaining weights renormalized; a void center stays void.

use terrashade_core::{Algorithm, Error, Grid, Result};
use terrashade_parallel::TaskContext;

use crate::rowwise::map_rows;

/// Gaussian low-pass operator
#[derive(Debug, Clone, Default)]
pub struct GaussLowPass;

/// Parameters for [`GaussLowPass`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussLowPassParams {
    /// Standard deviation in cells
    pub sigma: f64,
}

impl Default for GaussLowPassParams {
    fn default() -> Self {
        Self { sigma: 1.0 }
    }
}

impl Algorithm for GaussLowPass {
    type Input = Grid;
    type Output = Grid;
    type Params = GaussLowPassParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Gaussian Low-Pass"
    }

    fn description(&self) -> &'static str {
        "Smooth a grid with a separable Gaussian kernel"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        gauss_low_pass(&input, params.sigma, &TaskContext::default())
            .ok_or_else(|| Error::Algorithm("Gaussian low-pass was cancelled".into()))
    }
}

/// Normalized 1D Gaussian kernel of radius `ceil(3σ)`
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (3.0 * sigma).ceil().max(1.0) as usize;
    let two_s2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-x * x / two_s2).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Blur `grid` with standard deviation `sigma` (in cells).
///
/// `sigma <= 0` returns a copy. `None` if cancelled through `ctx`.
pub fn gauss_low_pass(grid: &Grid, sigma: f64, ctx: &TaskContext) -> Option<Grid> {
    if !(sigma > 0.0) {
        return Some(grid.clone());
    }
    let kernel = gaussian_kernel(sigma);
    let half = kernel.len() / 2;
    let (rows, cols) = grid.shape();

    // Row pass
    let row_smoothed = map_rows(grid, ctx, |row, out| {
        let src = grid.row_slice(row);
        for (col, o) in out.iter_mut().enumerate() {
            if src[col].is_nan() {
                continue;
            }
            *o = weighted(&kernel, col, half, cols, |c| src[c]);
        }
    })?;

    // Column pass
    map_rows(grid, ctx, |row, out| {
        for (col, o) in out.iter_mut().enumerate() {
            if grid.value(row, col).is_nan() {
                continue;
            }
            *o = weighted(&kernel, row, half, rows, |r| row_smoothed.value(r, col));
        }
    })
}

fn weighted(kernel: &[f64], center: usize, half: usize, n: usize, value: impl Fn(usize) -> f32) -> f32 {
    let mut sum = 0.0;
    let mut wsum = 0.0;
    for (ki, &kw) in kernel.iter().enumerate() {
        let Some(i) = (center + ki).checked_sub(half).filter(|&i| i < n) else {
            continue;
        };
        let v = value(i);
        if !v.is_nan() {
            sum += kw * v as f64;
            wsum += kw;
        }
    }
    if wsum > 0.0 {
        (sum / wsum) as f32
    } else {
        f32::NAN
    }
}
