//! Integration tests chaining I/O, pyramids, filters and terrain operators on
//! a synthetic DEM.
//!
//! The DEM is a 97×113 tilted landscape of ridges and valleys at 25 m
//! resolution with a void patch in one corner.

use approx::assert_relative_eq;
use terrashade_algorithms::filters::{local_filter, LocalFilterParams};
use terrashade_algorithms::ops::slope_grid;
use terrashade_algorithms::pyramid::{generalize, GeneralizationParams, LaplacianPyramid};
use terrashade_algorithms::terrain::{
    illuminated_contours, normal_map, plan_oblique, shade_grid, ContourParams, NormalMapParams,
    ShadingParams,
};
use terrashade_core::io::{read_geotiff_from_buffer, write_geotiff_to_buffer};
use terrashade_core::{Georef, Grid};
use terrashade_parallel::{CancelToken, ProcessingMode, TaskContext};

fn synthetic_dem() -> Grid {
    let (rows, cols) = (97, 113);
    let data = (0..rows * cols)
        .map(|i| {
            let (r, c) = (i / cols, i % cols);
            if r < 6 && c < 9 {
                return f32::NAN;
            }
            let (y, x) = (r as f32, c as f32);
            1200.0 + 3.0 * y - 1.5 * x + 90.0 * (x * 0.11).sin() * (y * 0.07).cos()
                + 12.0 * ((x + y) * 0.6).sin()
        })
        .collect();
    Grid::from_vec(data, rows, cols, Georef::new(25.0, 480_000.0, 5_200_000.0)).unwrap()
}

fn ctx() -> TaskContext {
    TaskContext::default()
}

fn decompose(grid: &Grid) -> LaplacianPyramid {
    LaplacianPyramid::from_grid(grid, &ctx()).unwrap().unwrap()
}

fn slope(grid: &Grid) -> Grid {
    slope_grid(grid, &ctx()).unwrap()
}

fn same_voids(a: &Grid, b: &Grid) -> bool {
    a.as_slice()
        .iter()
        .zip(b.as_slice())
        .all(|(x, y)| x.is_nan() == y.is_nan())
}

// ---------------------------------------------------------------------------
// I/O roundtrip
// ---------------------------------------------------------------------------

#[test]
fn geotiff_roundtrip_keeps_voids_and_georef() {
    let dem = synthetic_dem();
    let bytes = write_geotiff_to_buffer(&dem).unwrap();
    let read = read_geotiff_from_buffer(&bytes).unwrap();
    assert_eq!(read.shape(), dem.shape());
    assert_eq!(read.georef(), dem.georef());
    assert!(same_voids(&read, &dem));
    assert_eq!(read.min_max(), dem.min_max());
}

// ---------------------------------------------------------------------------
// Pyramid and generalization
// ---------------------------------------------------------------------------

#[test]
fn generalization_keeps_range_and_voids() {
    let dem = synthetic_dem();
    let pyramid = decompose(&dem);
    let (min, max) = dem.min_max().unwrap();

    for details in [-0.5, 0.0, 0.5, 1.0] {
        let params = GeneralizationParams {
            max_levels: 3,
            details,
        };
        let generalized = generalize(&dem, &pyramid, &params, &ctx()).unwrap().unwrap();
        assert!(same_voids(&generalized, &dem), "details {}", details);
        let (gmin, gmax) = generalized.min_max().unwrap();
        assert_relative_eq!(gmin, min, max_relative = 1e-5);
        assert_relative_eq!(gmax, max, max_relative = 1e-5);
    }
}

#[test]
fn generalization_smooths_slopes() {
    let dem = synthetic_dem();
    let pyramid = decompose(&dem);
    let params = GeneralizationParams {
        max_levels: 2,
        details: 0.0,
    };
    let generalized = generalize(&dem, &pyramid, &params, &ctx()).unwrap().unwrap();

    let mean_slope = |grid: &Grid| {
        let slope = slope(grid);
        let valid: Vec<f32> = slope.as_slice().iter().copied().filter(|v| !v.is_nan()).collect();
        valid.iter().sum::<f32>() / valid.len() as f32
    };
    assert!(mean_slope(&generalized) < mean_slope(&dem));
}

#[test]
fn local_filter_keeps_range() {
    let dem = synthetic_dem();
    let pyramid = decompose(&dem);
    let filtered = local_filter(&dem, &pyramid, &LocalFilterParams::default(), &ctx())
        .unwrap()
        .unwrap();
    let (min, max) = dem.min_max().unwrap();
    let (fmin, fmax) = filtered.min_max().unwrap();
    assert_relative_eq!(fmin, min, max_relative = 1e-5);
    assert_relative_eq!(fmax, max, max_relative = 1e-5);
    assert!(same_voids(&filtered, &dem));
}

// ---------------------------------------------------------------------------
// Terrain operators
// ---------------------------------------------------------------------------

#[test]
fn shading_in_gray_range() {
    let dem = synthetic_dem();
    let gray = shade_grid(&dem, &ShadingParams::default(), &ctx()).unwrap().unwrap();
    assert!(gray.value(0, 0).is_nan());
    let (min, max) = gray.min_max().unwrap();
    assert!(min >= 0.0 && max <= 255.0, "{} {}", min, max);
    assert!(max - min > 50.0, "relief should produce contrast");
}

#[test]
fn normal_map_is_opaque() {
    let dem = synthetic_dem();
    let image = normal_map(&dem, &NormalMapParams::default(), &ctx())
        .unwrap()
        .unwrap();
    assert_eq!((image.width(), image.height()), (dem.cols(), dem.rows()));
    assert!(image.pixels().iter().all(|p| p >> 24 == 0xFF));
}

#[test]
fn plan_oblique_keeps_shape() {
    let dem = synthetic_dem();
    let sheared = plan_oblique(&dem, 40.0, &ctx()).unwrap().unwrap();
    assert_eq!(sheared.shape(), dem.shape());
    assert!(plan_oblique(&dem, 0.0, &ctx()).is_err());
    assert_eq!(plan_oblique(&dem, 90.0, &ctx()).unwrap(), Some(dem));
}

#[test]
fn contours_draw_partial_coverage() {
    let dem = synthetic_dem();
    let slope = slope(&dem);
    let params = ContourParams {
        interval: 50.0,
        ..Default::default()
    };
    let image = illuminated_contours(
        &dem,
        &slope,
        &params,
        dem.min_max().unwrap(),
        2,
        &ctx(),
    )
    .unwrap()
    .unwrap();
    assert_eq!((image.width(), image.height()), (2 * dem.cols(), 2 * dem.rows()));

    let drawn = image.pixels().iter().filter(|&&p| p != 0).count();
    assert!(drawn > 0);
    assert!(drawn < image.pixels().len() / 2);
    // nothing is drawn over the void corner
    assert_eq!(image.get(4, 4), Some(0));
}

// ---------------------------------------------------------------------------
// Processing mode and cancellation
// ---------------------------------------------------------------------------

#[test]
fn pipeline_is_identical_in_every_mode() {
    let dem = synthetic_dem();
    let params = GeneralizationParams {
        max_levels: 3,
        details: 0.3,
    };
    let run = |ctx: &TaskContext| {
        let pyramid = LaplacianPyramid::from_grid(&dem, ctx).unwrap().unwrap();
        let generalized = generalize(&dem, &pyramid, &params, ctx).unwrap().unwrap();
        local_filter(&generalized, &pyramid, &LocalFilterParams::default(), ctx)
            .unwrap()
            .unwrap()
    };
    let sequential = run(&TaskContext::new().with_mode(ProcessingMode::Sequential));
    let parallel = run(&TaskContext::new().with_mode(ProcessingMode::ParallelWith(4)));
    assert_eq!(sequential, parallel);
}

#[test]
fn cancelled_context_stops_every_operator() {
    let dem = synthetic_dem();
    let pyramid = decompose(&dem);
    let cancel = CancelToken::new();
    cancel.cancel();
    let cancelled = TaskContext::new().with_cancel(cancel);

    let params = GeneralizationParams {
        max_levels: 3,
        details: 0.5,
    };
    assert!(LaplacianPyramid::from_grid(&dem, &cancelled).unwrap().is_none());
    assert!(generalize(&dem, &pyramid, &params, &cancelled).unwrap().is_none());
    assert!(local_filter(&dem, &pyramid, &LocalFilterParams::default(), &cancelled)
        .unwrap()
        .is_none());
    assert!(shade_grid(&dem, &ShadingParams::default(), &cancelled)
        .unwrap()
        .is_none());
    assert!(plan_oblique(&dem, 40.0, &cancelled).unwrap().is_none());

    let contours = ContourParams {
        interval: 50.0,
        despeckle: 2.0,
        ..Default::default()
    };
    let min_max = dem.min_max().unwrap();
    let image = illuminated_contours(&dem, &slope(&dem), &contours, min_max, 2, &cancelled);
    assert!(image.unwrap().is_none());
}
