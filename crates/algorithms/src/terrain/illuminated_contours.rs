//! Illuminated contours
//!
//! Contour lines whose width and tone follow the orientation of the terrain
//! relative to the light (Tanaka's method). Lines on slopes facing the light
//! are drawn in a light gray, lines on slopes facing away are black, and line
//! width varies with the angle between slope aspect and light direction.
//!
//! Lines are rendered per pixel: the vertical distance to the nearest
//! contour level divided by the slope gives the horizontal distance to the
//! line, which is compared with half the line width. A smoothstep over half a
//! pixel anti-aliases the line edges.

use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};
use terrashade_core::raster::pack_argb;
use terrashade_core::{ArgbImage, Error, Grid, Result, VOID_COLOR};
use terrashade_parallel::{apply_rows, TaskContext};
use tracing::debug;

use crate::filters::gauss_low_pass;

/// Which contour families are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContourStyle {
    /// Illuminated and shadowed contours
    #[default]
    Illuminated,
    /// Shadowed contours only
    Shaded,
}

/// Parameters for illuminated contours. Widths are in cell-size units,
/// angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourParams {
    pub style: ContourStyle,
    /// Elevation difference between contour levels
    pub interval: f64,
    /// Width of shadowed lines at the lowest elevation
    pub shadow_width_low: f64,
    /// Width of shadowed lines at the highest elevation
    pub shadow_width_high: f64,
    /// Width of illuminated lines at the lowest elevation
    pub illuminated_width_low: f64,
    /// Width of illuminated lines at the highest elevation
    pub illuminated_width_high: f64,
    pub min_width: f64,
    /// Minimum gap between adjacent lines
    pub min_line_distance: f64,
    /// Light azimuth (0 = north, clockwise)
    pub azimuth: f64,
    /// Half width of the gray gradient around the transition angle
    pub gradient_angle: f64,
    /// Gray of illuminated lines
    pub illuminated_gray: u8,
    /// Standard deviation in cells of the blur applied before computing aspect
    pub despeckle: f64,
    /// Angle between light and aspect where lines switch from illuminated
    /// to shadowed
    pub transition_angle: f64,
}

impl Default for ContourParams {
    fn default() -> Self {
        Self {
            style: ContourStyle::Illuminated,
            interval: 200.0,
            shadow_width_low: 1.0,
            shadow_width_high: 1.0,
            illuminated_width_low: 1.0,
            illuminated_width_high: 1.0,
            min_width: 0.2,
            min_line_distance: 0.0,
            azimuth: 315.0,
            gradient_angle: 0.0,
            illuminated_gray: 255,
            despeckle: 0.0,
            transition_angle: 90.0,
        }
    }
}

impl ContourParams {
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &'static str, v: f64| {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(Error::invalid_parameter(name, v, "must be a positive number"))
            }
        };
        let non_negative = |name: &'static str, v: f64| {
            if v >= 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(Error::invalid_parameter(name, v, "must be a number >= 0"))
            }
        };
        positive("interval", self.interval)?;
        non_negative("shadow_width_low", self.shadow_width_low)?;
        non_negative("shadow_width_high", self.shadow_width_high)?;
        non_negative("illuminated_width_low", self.illuminated_width_low)?;
        non_negative("illuminated_width_high", self.illuminated_width_high)?;
        non_negative("min_width", self.min_width)?;
        non_negative("min_line_distance", self.min_line_distance)?;
        non_negative("gradient_angle", self.gradient_angle)?;
        non_negative("despeckle", self.despeckle)?;
        if !self.azimuth.is_finite() {
            return Err(Error::invalid_parameter("azimuth", self.azimuth, "must be finite"));
        }
        if !(self.transition_angle > 0.0 && self.transition_angle < 180.0) {
            return Err(Error::invalid_parameter(
                "transition_angle",
                self.transition_angle,
                "must be in (0, 180) degrees",
            ));
        }
        Ok(())
    }
}

/// Smallest angle between two directions in degrees, in `[0, 180]`
fn smallest_angle_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 360.0;
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Per-pixel contour color from elevation, aspect and slope
#[derive(Debug, Clone, Copy)]
struct ContourPainter {
    params: ContourParams,
    grid_min: f64,
    grid_max: f64,
    /// Light direction, counter-clockwise from east, degrees
    illumination: f64,
    cell_size: f64,
    /// Width of the anti-aliasing transition
    band: f64,
}

impl ContourPainter {
    fn new(params: &ContourParams, (min, max): (f32, f32), cell_size: f64, scale: usize) -> Self {
        Self {
            params: *params,
            grid_min: min as f64,
            grid_max: max as f64,
            illumination: 90.0 - params.azimuth,
            cell_size,
            band: cell_size / scale as f64 / 2.0,
        }
    }

    /// Line width in cell-size units for a light/aspect angle difference
    fn line_width(&self, elevation: f64, angle_diff: f64) -> f64 {
        let p = &self.params;
        let range = self.grid_max - self.grid_min;
        let w = if range > 0.0 {
            (self.grid_max - elevation) / range
        } else {
            0.0
        };
        let shadow_width = w * (p.shadow_width_low - p.shadow_width_high) + p.shadow_width_high;
        let angle = angle_diff.to_radians();

        match p.style {
            ContourStyle::Illuminated => {
                let transition = p.transition_angle.to_radians();
                if angle_diff > p.transition_angle {
                    // map (transition, 180] onto (90, 180]
                    let m = FRAC_PI_2 / (PI - transition);
                    let c = FRAC_PI_2 - m * transition;
                    shadow_width * (angle * m + c).cos().abs()
                } else {
                    let illuminated_width = w
                        * (p.illuminated_width_low - p.illuminated_width_high)
                        + p.illuminated_width_high;
                    illuminated_width * (angle / transition * FRAC_PI_2).cos().abs()
                }
            }
            ContourStyle::Shaded => shadow_width * (angle / 2.0).sin().abs(),
        }
    }

    fn gray(&self, angle_diff: f64) -> u8 {
        let p = &self.params;
        let (transition, gradient) = (p.transition_angle, p.gradient_angle);
        if p.style == ContourStyle::Shaded || angle_diff >= transition + gradient {
            0
        } else if angle_diff <= transition - gradient {
            p.illuminated_gray
        } else {
            let d = transition + gradient - angle_diff;
            (d / (2.0 * gradient) * p.illuminated_gray as f64) as u8
        }
    }

    /// ARGB pixel; `aspect` in radians as returned by [`Grid::aspect`]
    fn pixel(&self, elevation: f64, aspect: f64, slope: f64) -> u32 {
        if !(slope > 0.0) || elevation.is_nan() || aspect.is_nan() {
            return VOID_COLOR;
        }
        let p = &self.params;
        let aspect_deg = (aspect + PI).to_degrees();
        let angle_diff = smallest_angle_diff(self.illumination, aspect_deg);

        let max_width =
            p.interval / slope - p.min_line_distance * self.cell_size / 2.0;
        if max_width <= 0.0 {
            return VOID_COLOR;
        }
        let line_width = (self.line_width(elevation, angle_diff).max(p.min_width)
            * self.cell_size)
            .min(max_width);

        // vertical distance to the nearest contour level
        let mut z_dist = elevation.abs() % p.interval;
        if z_dist > p.interval / 2.0 {
            z_dist = p.interval - z_dist;
        }
        let t = z_dist / slope;

        let half = line_width / 2.0;
        let coverage = 1.0 - smoothstep(half - self.band / 2.0, half + self.band / 2.0, t);
        let alpha = (255.0 * coverage).round() as u8;
        if alpha == 0 {
            return VOID_COLOR;
        }
        let g = self.gray(angle_diff);
        pack_argb(alpha, g, g, g)
    }
}

/// Render illuminated contours of `grid` into an image `scale` times larger.
///
/// `slope` is the slope grid of `grid` and `min_max` the elevation range that
/// maps to the low and high line widths. Border vertices are not rendered.
/// Returns `None` if cancelled through `ctx`.
pub fn illuminated_contours(
    grid: &Grid,
    slope: &Grid,
    params: &ContourParams,
    min_max: (f32, f32),
    scale: usize,
    ctx: &TaskContext,
) -> Result<Option<ArgbImage>> {
    params.validate()?;
    grid.check_same_shape(slope)?;
    if scale == 0 {
        return Err(Error::invalid_parameter("scale", scale, "must be at least 1"));
    }
    let (rows, cols) = grid.shape();
    let Some(smooth) = gauss_low_pass(grid, params.despeckle, ctx) else {
        return Ok(None);
    };
    let painter = ContourPainter::new(params, min_max, grid.cell_size(), scale);
    debug!(
        "illuminated contours: interval {}, scale {}, despeckle {}",
        params.interval, scale, params.despeckle
    );

    let width = cols * scale;
    let mut image = ArgbImage::new(width, rows * scale);
    let interior = 1..rows - 1;
    let completion = apply_rows(image.pixels_mut(), width, ctx, |image_row, out| {
        let row = image_row / scale;
        if !interior.contains(&row) {
            return;
        }
        if scale == 1 {
            for col in 1..cols - 1 {
                out[col] = painter.pixel(
                    grid.value(row, col) as f64,
                    smooth.aspect(row, col),
                    slope.value(row, col) as f64,
                );
            }
            return;
        }
        let sampling_dist = grid.cell_size() / scale as f64;
        let sub_row = (image_row % scale) as f64 / scale as f64;
        let y = grid.north() - (row as f64 + sub_row) * grid.cell_size();
        for (image_col, px) in out.iter_mut().enumerate() {
            let col = image_col / scale;
            if col == 0 || col >= cols - 1 {
                continue;
            }
            let sub_col = (image_col % scale) as f64 / scale as f64;
            let x = grid.west() + (col as f64 + sub_col) * grid.cell_size();
            *px = painter.pixel(
                grid.bilinear(x, y),
                smooth.aspect_at(x, y, sampling_dist),
                slope.bilinear(x, y),
            );
        }
    });
    Ok(completion.is_finished().then_some(image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use terrashade_core::raster::unpack_argb;
    use terrashade_core::Georef;
    use terrashade_parallel::{CancelToken, ProcessingMode};

    use crate::ops::slope_grid;

    fn slope(grid: &Grid) -> Grid {
        slope_grid(grid, &TaskContext::default()).unwrap()
    }

    /// Elevation rises 10 per column towards the east
    fn east_ramp(n: usize) -> Grid {
        let data = (0..n * n).map(|i| (i % n) as f32 * 10.0).collect();
        Grid::from_vec(data, n, n, Georef::new(1.0, 0.0, 0.0)).unwrap()
    }

    fn render(grid: &Grid, params: &ContourParams, scale: usize) -> ArgbImage {
        let slope = slope(grid);
        let min_max = grid.min_max().unwrap();
        illuminated_contours(grid, &slope, params, min_max, scale, &TaskContext::default())
            .unwrap()
            .unwrap()
    }

    fn ramp_params() -> ContourParams {
        ContourParams {
            interval: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_smallest_angle_diff() {
        assert_relative_eq!(smallest_angle_diff(10.0, 350.0), 20.0);
        assert_relative_eq!(smallest_angle_diff(-225.0, 180.0), 45.0);
        assert_relative_eq!(smallest_angle_diff(0.0, 180.0), 180.0);
    }

    #[test]
    fn test_ramp_contours_on_column_boundaries() {
        let grid = east_ramp(10);
        let image = render(&grid, &ramp_params(), 4);
        let row = 4 * 4;
        // on a contour level
        let on = unpack_argb(image.get(row, 3 * 4).unwrap());
        assert_eq!(on[0], 255);
        // slope faces west, towards the north-west light
        assert_eq!(on[1], 255);
        // halfway between two levels
        assert_eq!(image.get(row, 3 * 4 + 2), Some(VOID_COLOR));
    }

    #[test]
    fn test_border_is_transparent() {
        let image = render(&east_ramp(10), &ramp_params(), 1);
        for col in 0..10 {
            assert_eq!(image.get(0, col), Some(VOID_COLOR));
            assert_eq!(image.get(9, col), Some(VOID_COLOR));
        }
        assert_ne!(image.get(5, 5), Some(VOID_COLOR));
    }

    #[test]
    fn test_flat_is_transparent() {
        let grid = Grid::filled(8, 8, 200.0, Georef::default()).unwrap();
        let image = render(&grid, &ramp_params(), 2);
        assert!(image.pixels().iter().all(|&p| p == VOID_COLOR));
    }

    #[test]
    fn test_shadowed_side_is_black() {
        // rises towards the west, so faces the east, away from the light
        let mut grid = east_ramp(10);
        for v in grid.as_slice_mut() {
            *v = 90.0 - *v;
        }
        let image = render(&grid, &ramp_params(), 1);
        let px = unpack_argb(image.get(5, 5).unwrap());
        assert_eq!(px[0], 255);
        assert_eq!(&px[1..], &[0, 0, 0]);
    }

    #[test]
    fn test_width_capped_by_line_spacing() {
        let params = ContourParams {
            interval: 10.0,
            min_width: 50.0,
            min_line_distance: 1.0,
            ..Default::default()
        };
        let painter = ContourPainter::new(&params, (0.0, 90.0), 1.0, 1);
        // lines 1 m apart with a 0.5 m gap: a huge minimum width is capped
        let between = painter.pixel(45.0, 0.0, 10.0);
        let on_line = painter.pixel(40.0, 0.0, 10.0);
        assert_eq!(between, VOID_COLOR);
        assert_ne!(on_line, VOID_COLOR);
    }

    #[test]
    fn test_min_line_distance_can_suppress_lines() {
        let params = ContourParams {
            interval: 10.0,
            min_line_distance: 2.0,
            ..Default::default()
        };
        let painter = ContourPainter::new(&params, (0.0, 90.0), 1.0, 1);
        assert_eq!(painter.pixel(40.0, 0.0, 10.0), VOID_COLOR);
    }

    #[test]
    fn test_gradient_blends_gray() {
        let params = ContourParams {
            gradient_angle: 10.0,
            ..Default::default()
        };
        let painter = ContourPainter::new(&params, (0.0, 1.0), 1.0, 1);
        assert_eq!(painter.gray(70.0), 255);
        assert_eq!(painter.gray(90.0), 127);
        assert_eq!(painter.gray(100.0), 0);
    }

    #[test]
    fn test_gradient_blends_towards_illuminated_gray() {
        let params = ContourParams {
            gradient_angle: 10.0,
            illuminated_gray: 200,
            ..Default::default()
        };
        let painter = ContourPainter::new(&params, (0.0, 1.0), 1.0, 1);
        assert_eq!(painter.gray(70.0), 200);
        assert_eq!(painter.gray(90.0), 100);
        assert_eq!(painter.gray(100.0), 0);
    }

    #[test]
    fn test_shaded_style_widths_and_gray() {
        let params = ContourParams {
            style: ContourStyle::Shaded,
            ..Default::default()
        };
        let painter = ContourPainter::new(&params, (0.0, 1.0), 1.0, 1);
        assert_relative_eq!(painter.line_width(0.5, 180.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(painter.line_width(0.5, 0.0), 0.0, epsilon = 1e-12);
        assert_eq!(painter.gray(10.0), 0);
    }

    #[test]
    fn test_cancelled_returns_none() {
        let grid = east_ramp(10);
        let cancel = CancelToken::new();
        cancel.cancel();
        let ctx = TaskContext::new().with_cancel(cancel);
        for despeckle in [0.0, 1.5] {
            let params = ContourParams {
                despeckle,
                ..ramp_params()
            };
            let result =
                illuminated_contours(&grid, &slope(&grid), &params, (0.0, 90.0), 2, &ctx).unwrap();
            assert!(result.is_none(), "despeckle {}", despeckle);
        }
    }

    #[test]
    fn test_despeckled_render_follows_processing_mode() {
        let grid = Grid::from_vec(
            (0..20 * 20)
                .map(|i| ((i % 20) as f32 * 0.7).sin() * 30.0 + (i / 20) as f32 * 4.0)
                .collect(),
            20,
            20,
            Georef::new(1.0, 0.0, 0.0),
        )
        .unwrap();
        let params = ContourParams {
            despeckle: 1.5,
            ..ramp_params()
        };
        let slope = slope(&grid);
        let min_max = grid.min_max().unwrap();
        let sequential = TaskContext::new().with_mode(ProcessingMode::Sequential);
        let parallel = TaskContext::new().with_mode(ProcessingMode::ParallelWith(3));
        let a = illuminated_contours(&grid, &slope, &params, min_max, 2, &sequential).unwrap();
        let b = illuminated_contours(&grid, &slope, &params, min_max, 2, &parallel).unwrap();
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_bad_params() {
        let grid = east_ramp(10);
        let params = ContourParams {
            interval: 0.0,
            ..Default::default()
        };
        let result = illuminated_contours(
            &grid,
            &slope(&grid),
            &params,
            (0.0, 90.0),
            1,
            &TaskContext::default(),
        );
        assert!(result.is_err());
    }
}
