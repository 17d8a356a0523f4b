//! User-facing rendering parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use terrashade_algorithms::filters::LocalFilterParams;
use terrashade_algorithms::pyramid::GeneralizationParams;
use terrashade_algorithms::terrain::{ContourParams, ContourStyle, ShadingParams};
use terrashade_colormap::{BivariateParams, ColorRamp, ColorVisualization, Rgb};
use terrashade_core::{Error, Result};

/// What is drawn on top of the background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForegroundVisualization {
    #[default]
    None,
    IlluminatedContours,
    ShadedContours,
}

impl ForegroundVisualization {
    pub const ALL: &[ForegroundVisualization] =
        &[Self::None, Self::IlluminatedContours, Self::ShadedContours];

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::IlluminatedContours => "ILLUMINATED_CONTOURS",
            Self::ShadedContours => "SHADED_CONTOURS",
        }
    }

    /// Contour families drawn, `None` when nothing is drawn
    pub fn contour_style(&self) -> Option<ContourStyle> {
        match self {
            Self::None => None,
            Self::IlluminatedContours => Some(ContourStyle::Illuminated),
            Self::ShadedContours => Some(ContourStyle::Shaded),
        }
    }
}

impl fmt::Display for ForegroundVisualization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ForegroundVisualization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.name() == normalized)
            .ok_or_else(|| Error::invalid_parameter("foreground", s, "unknown visualization"))
    }
}

/// Every parameter of a [`crate::Model`].
///
/// Missing fields take their defaults when deserialized, so a partial JSON
/// document is valid:
///
/// ```json
/// { "background": "HYPSOMETRIC_SHADING", "shading": { "azimuth": 300 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub generalization: GeneralizationParams,
    pub shading: ShadingParams,
    pub background: ColorVisualization,
    pub foreground: ForegroundVisualization,
    pub ramp: ColorRamp,
    /// Fill color of the `CONTINUOUS` background
    pub solid_color: Rgb,
    /// Contour parameters; style and azimuth follow `foreground` and
    /// `shading.azimuth` when rendering
    pub contours: ContourParams,
    /// Inclination of the plan oblique projection in degrees; 90 disables it
    pub plan_oblique_angle: f64,
    pub local_filter: LocalFilterParams,
    pub bivariate: BivariateParams,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            generalization: GeneralizationParams::default(),
            shading: ShadingParams::default(),
            background: ColorVisualization::GrayShading,
            foreground: ForegroundVisualization::None,
            ramp: ColorRamp::default(),
            solid_color: Rgb::new(192, 192, 192),
            contours: ContourParams::default(),
            plan_oblique_angle: 90.0,
            local_filter: LocalFilterParams::default(),
            bivariate: BivariateParams::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.generalization.validate()?;
        self.shading.validate()?;
        self.contours.validate()?;
        self.local_filter.validate()?;
        self.bivariate.validate()?;
        validate_plan_oblique_angle(self.plan_oblique_angle)
    }

    /// Contour parameters as rendered for the current foreground
    pub fn effective_contours(&self) -> Option<ContourParams> {
        self.foreground.contour_style().map(|style| ContourParams {
            style,
            azimuth: self.shading.azimuth,
            ..self.contours
        })
    }
}

pub(crate) fn validate_plan_oblique_angle(angle: f64) -> Result<()> {
    if angle > 0.0 && angle <= 90.0 {
        Ok(())
    } else {
        Err(Error::invalid_parameter(
            "plan_oblique_angle",
            angle,
            "must be in (0, 90] degrees",
        ))
    }
}
