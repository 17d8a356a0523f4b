//! Color ramps and piecewise-linear interpolation.

use serde::{Deserialize, Serialize};
use terrashade_core::{Error, Result};

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Opaque `0xAARRGGBB` pixel
    pub const fn to_argb(self) -> u32 {
        0xFF00_0000 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// Color channels of a packed pixel, ignoring alpha
    pub const fn from_argb(argb: u32) -> Self {
        Self::new((argb >> 16) as u8, (argb >> 8) as u8, argb as u8)
    }
}

/// A color stop: position in [0, 1] mapped to an RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub position: f32,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(position: f32, r: u8, g: u8, b: u8) -> Self {
        Self {
            position,
            color: Rgb::new(r, g, b),
        }
    }
}

/// A named, ordered list of color stops.
///
/// Stop positions are strictly increasing and lie in `[0, 1]`. Values are
/// normalized against a min/max range before lookup; anything below the
/// first stop takes its color, anything above the last stop takes the last
/// color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RampDef")]
pub struct ColorRamp {
    name: String,
    stops: Vec<ColorStop>,
}

#[derive(Deserialize)]
struct RampDef {
    name: String,
    stops: Vec<ColorStop>,
}

impl TryFrom<RampDef> for ColorRamp {
    type Error = Error;

    fn try_from(def: RampDef) -> Result<Self> {
        ColorRamp::new(def.name, def.stops)
    }
}

impl ColorRamp {
    pub fn new(name: impl Into<String>, stops: Vec<ColorStop>) -> Result<Self> {
        if stops.is_empty() {
            return Err(Error::invalid_parameter("stops", 0, "a ramp needs at least one stop"));
        }
        for stop in &stops {
            if !(0.0..=1.0).contains(&stop.position) {
                return Err(Error::invalid_parameter(
                    "stops",
                    stop.position,
                    "stop positions must be in [0, 1]",
                ));
            }
        }
        if let Some(pair) = stops.windows(2).find(|w| w[1].position <= w[0].position) {
            return Err(Error::invalid_parameter(
                "stops",
                pair[1].position,
                "stop positions must be strictly increasing",
            ));
        }
        Ok(Self {
            name: name.into(),
            stops,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// All predefined ramps, the default ramp first.
    pub fn predefined() -> Vec<ColorRamp> {
        PREDEFINED
            .iter()
            .map(|(name, stops)| ColorRamp {
                name: (*name).to_string(),
                stops: stops.to_vec(),
            })
            .collect()
    }

    /// Predefined ramp with the given name, ignoring ASCII case
    pub fn by_name(name: &str) -> Option<ColorRamp> {
        Self::predefined()
            .into_iter()
            .find(|ramp| ramp.name.eq_ignore_ascii_case(name))
    }

    /// Opaque color of `value` normalized to `[min, max]`, with every
    /// channel multiplied by `mult` and truncated.
    ///
    /// A `NaN` normalized value takes the color of the first stop; callers
    /// map void cells to transparent pixels before looking them up.
    pub fn linear_rgb(&self, value: f32, min: f32, max: f32, mult: f32) -> u32 {
        let t = (value - min) / (max - min);
        let last = self.stops.len() - 1;

        if t >= self.stops[last].position {
            return scaled(self.stops[last].color, mult);
        }
        for i in (0..last).rev() {
            let lower = self.stops[i];
            if t >= lower.position {
                let upper = self.stops[i + 1];
                let tu = (t - lower.position) / (upper.position - lower.position);
                let tl = 1.0 - tu;
                let channel = |l: u8, u: u8| (mult * (tl * l as f32 + tu * u as f32)) as u8;
                return Rgb::new(
                    channel(lower.color.r, upper.color.r),
                    channel(lower.color.g, upper.color.g),
                    channel(lower.color.b, upper.color.b),
                )
                .to_argb();
            }
        }
        scaled(self.stops[0].color, mult)
    }
}

impl Default for ColorRamp {
    fn default() -> Self {
        let (name, stops) = PREDEFINED[0];
        ColorRamp {
            name: name.to_string(),
            stops: stops.to_vec(),
        }
    }
}

fn scaled(color: Rgb, mult: f32) -> u32 {
    let channel = |c: u8| (mult * c as f32) as u8;
    Rgb::new(channel(color.r), channel(color.g), channel(color.b)).to_argb()
}

// ─── Predefined ramps ──────────────────────────────────────────────────

const BLACK_WHITE: &[ColorStop] = &[ColorStop::new(0.0, 0, 0, 0), ColorStop::new(1.0, 255, 255, 255)];

const SOFT_GRAY: &[ColorStop] = &[
    ColorStop::new(0.0, 128, 128, 128),
    ColorStop::new(1.0, 255, 255, 255),
];

const HARD_GRAY: &[ColorStop] = &[ColorStop::new(0.5, 0, 0, 0), ColorStop::new(1.0, 255, 255, 255)];

const NATURAL_LIGHT: &[ColorStop] = &[
    ColorStop::new(0.00, 109, 126, 161),
    ColorStop::new(0.56, 151, 163, 186),
    ColorStop::new(0.81, 188, 188, 188),
    ColorStop::new(0.93, 222, 218, 206),
    ColorStop::new(1.00, 232, 232, 232),
];

const SWISS_STYLE: &[ColorStop] = &[
    ColorStop::new(0.00, 82, 107, 117),
    ColorStop::new(0.42, 106, 142, 130),
    ColorStop::new(0.73, 166, 180, 169),
    ColorStop::new(0.88, 226, 212, 172),
    ColorStop::new(1.00, 247, 243, 177),
];

const HYPSOMETRIC: &[ColorStop] = &[
    ColorStop::new(0.00, 120, 181, 141),
    ColorStop::new(0.08, 124, 172, 104),
    ColorStop::new(0.24, 190, 194, 107),
    ColorStop::new(0.43, 212, 218, 170),
    ColorStop::new(0.69, 225, 246, 244),
    ColorStop::new(0.89, 255, 255, 255),
];

const PREDEFINED: &[(&str, &[ColorStop])] = &[
    ("Black-White", BLACK_WHITE),
    ("Soft Gray", SOFT_GRAY),
    ("Hard Gray", HARD_GRAY),
    ("Natural Light (Exposition)", NATURAL_LIGHT),
    ("Swiss Style (Exposition)", SWISS_STYLE),
    ("Hypsometric", HYPSOMETRIC),
];
