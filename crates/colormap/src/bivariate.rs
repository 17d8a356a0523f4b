//! Bivariate color mapping
//!
//! Two attribute grids are normalized to `[0, 1]` and looked up in a
//! 256×256 color table. The table is interpolated from scattered control
//! points placed in attribute space, each carrying a color:
//!
//! ```text
//! color(x, y) = Σ wᵢ·colorᵢ / Σ wᵢ,  dᵢ = |(x, y) - pᵢ|
//!
//! Gaussian:          wᵢ = exp(-K·dᵢ²),  K = p / 10000 · 255² / 3
//! Inverse distance:  wᵢ = 1 / dᵢ^p
//! ```
//!
//! Colors are blended either in sRGB or in CIELAB.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use terrashade_core::{ArgbImage, Error, Grid, Result, VOID_COLOR};
use tracing::debug;

use crate::lab::{lab_to_rgb, rgb_to_lab};
use crate::ramp::Rgb;

/// Rows and columns of the lookup table
pub const LUT_SIZE: usize = 256;

/// A color anchored at a position in attribute space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BivariateColorPoint {
    /// Normalized value of the first (horizontal) attribute
    pub attribute1: f64,
    /// Normalized value of the second (vertical) attribute
    pub attribute2: f64,
    pub color: Rgb,
}

impl BivariateColorPoint {
    pub const fn new(attribute1: f64, attribute2: f64, color: Rgb) -> Self {
        Self {
            attribute1,
            attribute2,
            color,
        }
    }
}

/// Weighting of control points by distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    #[default]
    Gaussian,
    InverseDistance,
}

/// Color space in which control point colors are blended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    #[default]
    Rgb,
    Lab,
}

/// Control points and interpolation settings of a bivariate color table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BivariateParams {
    pub points: Vec<BivariateColorPoint>,
    /// Exponent `p` of the weighting function
    pub exponent: f64,
    pub weighting: Weighting,
    pub color_space: ColorSpace,
}

impl Default for BivariateParams {
    fn default() -> Self {
        Self {
            points: vec![
                BivariateColorPoint::new(0.0, 0.0, Rgb::new(131, 116, 96)),
                BivariateColorPoint::new(1.0, 0.0, Rgb::new(0, 100, 0)),
                BivariateColorPoint::new(1.0, 1.0, Rgb::WHITE),
                BivariateColorPoint::new(0.0, 1.0, Rgb::new(0, 0, 255)),
            ],
            exponent: 1.3,
            weighting: Weighting::Gaussian,
            color_space: ColorSpace::Rgb,
        }
    }
}

impl BivariateParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.exponent > 0.0 && self.exponent.is_finite()) {
            return Err(Error::invalid_parameter(
                "exponent",
                self.exponent,
                "must be a positive number",
            ));
        }
        for p in &self.points {
            if !(p.attribute1.is_finite() && p.attribute2.is_finite()) {
                return Err(Error::invalid_parameter(
                    "points",
                    format!("({}, {})", p.attribute1, p.attribute2),
                    "control point coordinates must be finite",
                ));
            }
        }
        Ok(())
    }

    fn weight(&self, d: f64) -> f64 {
        match self.weighting {
            Weighting::Gaussian => {
                let k = self.exponent / 10000.0 * 255.0 * 255.0 / 3.0;
                (-k * d * d).exp()
            }
            Weighting::InverseDistance => 1.0 / d.powf(self.exponent),
        }
    }

    /// Opaque color interpolated at normalized attribute values (x, y).
    ///
    /// Without control points the color is opaque black.
    pub fn interpolate(&self, x: f64, y: f64) -> u32 {
        let mut sum = [0.0f64; 3];
        let mut weight_sum = 0.0;
        for p in &self.points {
            let d = (p.attribute1 - x).hypot(p.attribute2 - y);
            if d == 0.0 && self.weighting == Weighting::InverseDistance {
                return p.color.to_argb();
            }
            let w = self.weight(d);
            let c = match self.color_space {
                ColorSpace::Rgb => [p.color.r as f64, p.color.g as f64, p.color.b as f64],
                ColorSpace::Lab => rgb_to_lab([p.color.r, p.color.g, p.color.b]),
            };
            for (s, c) in sum.iter_mut().zip(c) {
                *s += w * c;
            }
            weight_sum += w;
        }
        if weight_sum == 0.0 {
            return Rgb::BLACK.to_argb();
        }
        let blended = sum.map(|s| s / weight_sum);
        let rgb = match self.color_space {
            ColorSpace::Rgb => blended,
            ColorSpace::Lab => lab_to_rgb(blended).map(f64::round),
        };
        let [r, g, b] = rgb.map(|c| c.clamp(0.0, 255.0) as u8);
        Rgb::new(r, g, b).to_argb()
    }
}

/// An attribute grid and the value range captured when it was assigned
#[derive(Debug, Clone)]
struct Attribute {
    grid: Grid,
    min: f32,
    max: f32,
}

impl Attribute {
    fn new(grid: Grid) -> Self {
        let (min, max) = grid.min_max().unwrap_or((f32::NAN, f32::NAN));
        Self { grid, min, max }
    }

    /// Value at (row, col) normalized to `[0, 1]`; a constant grid maps to 0
    fn normalized(&self, row: usize, col: usize) -> f64 {
        let v = self.grid.value(row, col) as f64;
        let range = (self.max - self.min) as f64;
        if range == 0.0 {
            return if v.is_nan() { f64::NAN } else { 0.0 };
        }
        (v - self.min as f64) / range
    }
}

/// Renders pixels from two attribute grids through a lazily built color table.
#[derive(Debug, Clone, Default)]
pub struct BivariateColorRenderer {
    params: BivariateParams,
    attribute1: Option<Attribute>,
    attribute2: Option<Attribute>,
    lut: OnceLock<Vec<u32>>,
}

impl BivariateColorRenderer {
    pub fn new(params: BivariateParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            ..Default::default()
        })
    }

    pub fn params(&self) -> &BivariateParams {
        &self.params
    }

    /// Replace all interpolation settings at once
    pub fn set_params(&mut self, params: BivariateParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        self.invalidate();
        Ok(())
    }

    pub fn points(&self) -> &[BivariateColorPoint] {
        &self.params.points
    }

    pub fn add_point(&mut self, point: BivariateColorPoint) -> Result<()> {
        let mut params = self.params.clone();
        params.points.push(point);
        self.set_params(params)
    }

    /// Remove and return the point at `index`
    pub fn remove_point(&mut self, index: usize) -> Result<BivariateColorPoint> {
        if index >= self.params.points.len() {
            return Err(Error::invalid_parameter(
                "index",
                index,
                format!("only {} control points", self.params.points.len()),
            ));
        }
        let point = self.params.points.remove(index);
        self.invalidate();
        Ok(point)
    }

    pub fn replace_point(&mut self, index: usize, point: BivariateColorPoint) -> Result<()> {
        if index >= self.params.points.len() {
            return Err(Error::invalid_parameter(
                "index",
                index,
                format!("only {} control points", self.params.points.len()),
            ));
        }
        let mut params = self.params.clone();
        params.points[index] = point;
        self.set_params(params)
    }

    pub fn set_exponent(&mut self, exponent: f64) -> Result<()> {
        let params = BivariateParams {
            exponent,
            ..self.params.clone()
        };
        self.set_params(params)
    }

    pub fn set_weighting(&mut self, weighting: Weighting) {
        self.params.weighting = weighting;
        self.invalidate();
    }

    pub fn set_color_space(&mut self, color_space: ColorSpace) {
        self.params.color_space = color_space;
        self.invalidate();
    }

    /// Horizontal attribute; its min/max are captured now
    pub fn set_attribute1_grid(&mut self, grid: Grid) {
        self.attribute1 = Some(Attribute::new(grid));
    }

    /// Vertical attribute; its min/max are captured now
    pub fn set_attribute2_grid(&mut self, grid: Grid) {
        self.attribute2 = Some(Attribute::new(grid));
    }

    pub fn attribute1_grid(&self) -> Option<&Grid> {
        self.attribute1.as_ref().map(|a| &a.grid)
    }

    pub fn attribute2_grid(&self) -> Option<&Grid> {
        self.attribute2.as_ref().map(|a| &a.grid)
    }

    pub fn attribute1_min_max(&self) -> Option<(f32, f32)> {
        self.attribute1.as_ref().map(|a| (a.min, a.max))
    }

    pub fn attribute2_min_max(&self) -> Option<(f32, f32)> {
        self.attribute2.as_ref().map(|a| (a.min, a.max))
    }

    pub fn has_grids(&self) -> bool {
        self.attribute1.is_some() && self.attribute2.is_some()
    }

    /// Hint for a user interface when an attribute grid is missing
    pub fn warning(&self) -> Option<&'static str> {
        match (&self.attribute1, &self.attribute2) {
            (None, None) => Some("Select two grids."),
            (None, Some(_)) => Some("Horizontal grid missing."),
            (Some(_), None) => Some("Vertical grid missing."),
            (Some(_), Some(_)) => None,
        }
    }

    fn invalidate(&mut self) {
        self.lut.take();
    }

    /// The color table, row-major with attribute 2 along rows; built on
    /// first access after a change.
    pub fn lut(&self) -> &[u32] {
        self.lut.get_or_init(|| {
            debug!(
                "building {}x{} bivariate LUT from {} points",
                LUT_SIZE,
                LUT_SIZE,
                self.params.points.len()
            );
            let step = 1.0 / (LUT_SIZE - 1) as f64;
            let mut lut = Vec::with_capacity(LUT_SIZE * LUT_SIZE);
            for r in 0..LUT_SIZE {
                for c in 0..LUT_SIZE {
                    lut.push(self.params.interpolate(c as f64 * step, r as f64 * step));
                }
            }
            lut
        })
    }

    fn lookup(&self, x: f64, y: f64) -> u32 {
        let index = |v: f64| ((v * (LUT_SIZE - 1) as f64).round() as usize).min(LUT_SIZE - 1);
        self.lut()[index(y) * LUT_SIZE + index(x)]
    }

    /// Table color with row 0 at the top, i.e. attribute 2 increasing upward
    pub fn lut_color(&self, lut_col: usize, lut_row: usize) -> Option<u32> {
        if lut_col >= LUT_SIZE || lut_row >= LUT_SIZE {
            return None;
        }
        Some(self.lut()[(LUT_SIZE - 1 - lut_row) * LUT_SIZE + lut_col])
    }

    /// Pixel for vertex (row, col) of the attribute grids.
    ///
    /// `VOID_COLOR` if a grid is missing or either attribute is void there.
    pub fn render_pixel(&self, row: usize, col: usize) -> u32 {
        let (Some(a1), Some(a2)) = (&self.attribute1, &self.attribute2) else {
            return VOID_COLOR;
        };
        let x = a1.normalized(row, col);
        let y = a2.normalized(row, col);
        if x.is_nan() || y.is_nan() {
            return VOID_COLOR;
        }
        self.lookup(x.max(0.0), y.max(0.0))
    }

    /// Image of the color table, attribute 1 increasing to the right and
    /// attribute 2 increasing upward.
    pub fn diagram(&self, width: usize, height: usize) -> Result<ArgbImage> {
        if width < 2 || height < 2 {
            return Err(Error::invalid_parameter(
                "diagram size",
                format!("{}x{}", width, height),
                "must be at least 2x2",
            ));
        }
        let mut image = ArgbImage::new(width, height);
        for r in 0..height {
            let y = 1.0 - r as f64 / (height - 1) as f64;
            for c in 0..width {
                let x = c as f64 / (width - 1) as f64;
                image.pixels_mut()[r * width + c] = self.lookup(x, y);
            }
        }
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrashade_core::Georef;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    fn red_blue(weighting: Weighting) -> BivariateParams {
        BivariateParams {
            points: vec![
                BivariateColorPoint::new(0.0, 0.0, RED),
                BivariateColorPoint::new(1.0, 1.0, BLUE),
            ],
            weighting,
            ..Default::default()
        }
    }

    fn ramp_grid() -> Grid {
        let data = (0..9).map(|i| (i % 3) as f32).collect();
        Grid::from_vec(data, 3, 3, Georef::default()).unwrap()
    }

    #[test]
    fn test_idw_is_exact_at_points() {
        let params = red_blue(Weighting::InverseDistance);
        assert_eq!(params.interpolate(0.0, 0.0), RED.to_argb());
        assert_eq!(params.interpolate(1.0, 1.0), BLUE.to_argb());
        // equidistant blend, truncated
        assert_eq!(params.interpolate(0.5, 0.5), Rgb::new(127, 0, 127).to_argb());
    }

    #[test]
    fn test_gaussian_is_dominated_by_nearest_point() {
        let params = red_blue(Weighting::Gaussian);
        let near_red = Rgb::from_argb(params.interpolate(0.0, 0.0));
        assert!(near_red.r >= 250 && near_red.b <= 5, "{:?}", near_red);
        let near_blue = Rgb::from_argb(params.interpolate(1.0, 1.0));
        assert!(near_blue.b >= 250 && near_blue.r <= 5, "{:?}", near_blue);
    }

    #[test]
    fn test_no_points_is_black() {
        let params = BivariateParams {
            points: vec![],
            ..Default::default()
        };
        assert_eq!(params.interpolate(0.3, 0.3), Rgb::BLACK.to_argb());
    }

    #[test]
    fn test_lab_blend_keeps_endpoints() {
        let params = BivariateParams {
            color_space: ColorSpace::Lab,
            ..red_blue(Weighting::InverseDistance)
        };
        assert_eq!(params.interpolate(0.0, 0.0), RED.to_argb());
        let mid = Rgb::from_argb(params.interpolate(0.5, 0.5));
        let rgb_mid = Rgb::from_argb(red_blue(Weighting::InverseDistance).interpolate(0.5, 0.5));
        assert_ne!(mid, rgb_mid);
    }

    #[test]
    fn test_render_identical_attributes() {
        let mut renderer = BivariateColorRenderer::new(red_blue(Weighting::InverseDistance)).unwrap();
        assert_eq!(renderer.render_pixel(0, 0), VOID_COLOR);
        renderer.set_attribute1_grid(ramp_grid());
        assert_eq!(renderer.warning(), Some("Vertical grid missing."));
        renderer.set_attribute2_grid(ramp_grid());
        assert!(renderer.has_grids());
        assert_eq!(renderer.render_pixel(1, 0), RED.to_argb());
        assert_eq!(renderer.render_pixel(1, 2), BLUE.to_argb());
        let mid = Rgb::from_argb(renderer.render_pixel(1, 1));
        assert!(mid.r > 0 && mid.b > 0 && mid.g == 0);
    }

    #[test]
    fn test_void_attribute_renders_transparent() {
        let mut renderer = BivariateColorRenderer::default();
        let mut g = ramp_grid();
        g.set(2, 2, f32::NAN).unwrap();
        renderer.set_attribute1_grid(g);
        renderer.set_attribute2_grid(ramp_grid());
        assert_eq!(renderer.render_pixel(2, 2), VOID_COLOR);
        assert_ne!(renderer.render_pixel(2, 1), VOID_COLOR);
    }

    #[test]
    fn test_mutators_rebuild_lut() {
        let mut renderer = BivariateColorRenderer::new(red_blue(Weighting::InverseDistance)).unwrap();
        // bottom-left of the table is (0, 0)
        assert_eq!(renderer.lut_color(0, LUT_SIZE - 1), Some(RED.to_argb()));
        renderer
            .replace_point(0, BivariateColorPoint::new(0.0, 0.0, Rgb::WHITE))
            .unwrap();
        assert_eq!(renderer.lut_color(0, LUT_SIZE - 1), Some(Rgb::WHITE.to_argb()));
        renderer.remove_point(0).unwrap();
        assert_eq!(renderer.lut_color(0, 0), Some(BLUE.to_argb()));
        assert!(renderer.remove_point(5).is_err());
        assert!(renderer.set_exponent(-1.0).is_err());
        assert_eq!(renderer.lut_color(LUT_SIZE, 0), None);
    }

    #[test]
    fn test_diagram_orientation() {
        let renderer = BivariateColorRenderer::new(red_blue(Weighting::InverseDistance)).unwrap();
        let image = renderer.diagram(10, 8).unwrap();
        // attribute 2 grows upward: bottom-left is (0, 0), top-right is (1, 1)
        assert_eq!(image.get(7, 0), Some(RED.to_argb()));
        assert_eq!(image.get(0, 9), Some(BLUE.to_argb()));
        assert!(renderer.diagram(1, 8).is_err());
    }

    #[test]
    fn test_default_points() {
        let params = BivariateParams::default();
        assert_eq!(params.points.len(), 4);
        assert_eq!(params.exponent, 1.3);
        assert_eq!(params.weighting, Weighting::Gaussian);
    }
}
