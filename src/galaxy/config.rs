use std::fmt;
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, GalaxyResult};

pub const COUNT_RANGE: RangeInclusive<u32> = 100..=1_000_000;
pub const COUNT_STEP: u32 = 100;
pub const SIZE_RANGE: RangeInclusive<f32> = 0.001..=0.1;
pub const RADIUS_RANGE: RangeInclusive<f32> = 0.01..=20.0;
pub const BRANCHES_RANGE: RangeInclusive<u32> = 2..=20;
pub const SPIN_RANGE: RangeInclusive<f32> = -5.0..=5.0;
pub const RANDOMNESS_RANGE: RangeInclusive<f32> = 0.0..=2.0;
pub const RANDOMNESS_POWER_RANGE: RangeInclusive<f32> = 1.0..=10.0;

/// RGB triple with channels in `[0, 1]`, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: &str) -> Result<Self, ConfigError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ConfigError::InvalidColor(hex.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| ConfigError::InvalidColor(hex.to_string()))
        };
        Ok(Self::from_srgb8([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
    }

    pub fn from_srgb8(rgb: [u8; 3]) -> Self {
        Self {
            r: rgb[0] as f32 / 255.0,
            g: rgb[1] as f32 / 255.0,
            b: rgb[2] as f32 / 255.0,
        }
    }

    pub fn to_srgb8(self) -> [u8; 3] {
        let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [quantize(self.r), quantize(self.g), quantize(self.b)]
    }

    /// Mix toward `other`; `t = 0` yields `self` and `t = 1` yields `other` exactly.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let mix = |a: f32, b: f32| a * (1.0 - t) + b * t;
        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.to_srgb8();
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl TryFrom<String> for Rgb {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalaxyParams {
    pub count: u32,
    /// Point diameter in world units before distance attenuation.
    pub size: f32,
    pub radius: f32,
    pub branches: u32,
    pub spin: f32,
    pub randomness: f32,
    /// Higher values pull the jitter toward zero.
    pub randomness_power: f32,
    pub inside_color: Rgb,
    pub outside_color: Rgb,
}

impl Default for GalaxyParams {
    fn default() -> Self {
        Self {
            count: 100_000,
            size: 0.01,
            radius: 5.0,
            branches: 3,
            spin: 1.0,
            randomness: 0.02,
            randomness_power: 3.0,
            inside_color: Rgb::new(1.0, 96.0 / 255.0, 48.0 / 255.0),
            outside_color: Rgb::new(27.0 / 255.0, 57.0 / 255.0, 132.0 / 255.0),
        }
    }
}

impl GalaxyParams {
    /// Rejects only what the generator cannot compute. Values outside the
    /// panel bounds are accepted here.
    pub fn check_generatable(&self) -> Result<(), ConfigError> {
        if self.branches == 0 {
            return Err(ConfigError::NoBranches);
        }
        for (name, value) in self.float_fields() {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { name });
            }
        }
        if self.radius < 0.0 {
            return Err(ConfigError::Negative { name: "radius" });
        }
        if self.randomness < 0.0 {
            return Err(ConfigError::Negative { name: "randomness" });
        }
        Ok(())
    }

    pub fn validate_bounds(&self) -> Result<(), ConfigError> {
        self.check_generatable()?;
        check_range("count", self.count, &COUNT_RANGE)?;
        check_range("size", self.size, &SIZE_RANGE)?;
        check_range("radius", self.radius, &RADIUS_RANGE)?;
        check_range("branches", self.branches, &BRANCHES_RANGE)?;
        check_range("spin", self.spin, &SPIN_RANGE)?;
        check_range("randomness", self.randomness, &RANDOMNESS_RANGE)?;
        check_range("randomness_power", self.randomness_power, &RANDOMNESS_POWER_RANGE)?;
        Ok(())
    }

    /// Non-finite floats fall back to the default value.
    pub fn clamped(self) -> Self {
        let defaults = Self::default();
        let clamp_f = |value: f32, fallback: f32, range: &RangeInclusive<f32>| {
            if value.is_finite() {
                value.clamp(*range.start(), *range.end())
            } else {
                fallback
            }
        };
        Self {
            count: self.count.clamp(*COUNT_RANGE.start(), *COUNT_RANGE.end()),
            size: clamp_f(self.size, defaults.size, &SIZE_RANGE),
            radius: clamp_f(self.radius, defaults.radius, &RADIUS_RANGE),
            branches: self.branches.clamp(*BRANCHES_RANGE.start(), *BRANCHES_RANGE.end()),
            spin: clamp_f(self.spin, defaults.spin, &SPIN_RANGE),
            randomness: clamp_f(self.randomness, defaults.randomness, &RANDOMNESS_RANGE),
            randomness_power: clamp_f(
                self.randomness_power,
                defaults.randomness_power,
                &RANDOMNESS_POWER_RANGE,
            ),
            ..self
        }
    }

    pub fn from_json(text: &str) -> GalaxyResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: &Path) -> GalaxyResult<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    fn float_fields(&self) -> [(&'static str, f32); 5] {
        [
            ("size", self.size),
            ("radius", self.radius),
            ("spin", self.spin),
            ("randomness", self.randomness),
            ("randomness_power", self.randomness_power),
        ]
    }
}

fn check_range<T>(
    name: &'static str,
    value: T,
    range: &RangeInclusive<T>,
) -> Result<(), ConfigError>
where
    T: PartialOrd + Copy + Into<f64>,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value: value.into(),
            min: (*range.start()).into(),
            max: (*range.end()).into(),
        })
    }
}
