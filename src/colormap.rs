//! Color gradients for edge-length coloring and color parsing.

use crate::error::{Result, VisError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Linear interpolation between two colors, t in [0, 1]
    pub fn lerp(&self, other: &Rgba, t: f64) -> Rgba {
        let mix = |a: u8, b: u8| -> u8 {
            (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8
        };
        Rgba {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }
}

impl FromStr for Rgba {
    type Err = VisError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            let byte = |i: usize| -> Result<u8> {
                hex.get(i..i + 2)
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| VisError::Config(format!("invalid hex color `{s}`")))
            };
            return match hex.len() {
                6 => Ok(Rgba::rgb(byte(0)?, byte(2)?, byte(4)?)),
                8 => Ok(Rgba {
                    r: byte(0)?,
                    g: byte(2)?,
                    b: byte(4)?,
                    a: byte(6)?,
                }),
                _ => Err(VisError::Config(format!("invalid hex color `{s}`"))),
            };
        }
        match s.to_ascii_lowercase().as_str() {
            "black" => Ok(Rgba::BLACK),
            "white" => Ok(Rgba::WHITE),
            "gray" | "grey" => Ok(Rgba::rgb(128, 128, 128)),
            "red" => Ok(Rgba::rgb(255, 0, 0)),
            "green" => Ok(Rgba::rgb(0, 128, 0)),
            "blue" => Ok(Rgba::rgb(0, 0, 255)),
            "navy" => Ok(Rgba::rgb(0, 0, 128)),
            "transparent" | "none" => Ok(Rgba::TRANSPARENT),
            _ => Err(VisError::Config(format!("unknown color `{s}`"))),
        }
    }
}

impl TryFrom<String> for Rgba {
    type Error = VisError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Rgba> for String {
    fn from(c: Rgba) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Named color gradients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gradient {
    #[default]
    Turbo,
    Viridis,
    Plasma,
    Inferno,
    Grayscale,
}

const TURBO: &[u32] = &[
    0x30123b, 0x4145ab, 0x4675ed, 0x39a2fc, 0x1bcfd4, 0x24eca6, 0x61fc6c, 0xa4fc3b, 0xd1e834,
    0xf3c63a, 0xfe9b2d, 0xf36315, 0xd93806, 0xb11901, 0x7a0402,
];

const VIRIDIS: &[u32] = &[
    0x440154, 0x482878, 0x3e4989, 0x31688e, 0x26828e, 0x1f9e89, 0x35b779, 0x6ece58, 0xb5de2b,
    0xfde725,
];

const PLASMA: &[u32] = &[
    0x0d0887, 0x46039f, 0x7201a8, 0x9c179e, 0xbd3786, 0xd8576b, 0xed7953, 0xfb9f3a, 0xfdca26,
    0xf0f921,
];

const INFERNO: &[u32] = &[
    0x000004, 0x1b0c41, 0x4a0c6b, 0x781c6d, 0xa52c60, 0xcf4446, 0xed6925, 0xfb9b06, 0xf7d13d,
    0xfcffa4,
];

const GRAYSCALE: &[u32] = &[0x000000, 0xffffff];

impl Gradient {
    fn stops(&self) -> &'static [u32] {
        match self {
            Gradient::Turbo => TURBO,
            Gradient::Viridis => VIRIDIS,
            Gradient::Plasma => PLASMA,
            Gradient::Inferno => INFERNO,
            Gradient::Grayscale => GRAYSCALE,
        }
    }

    /// Sample the full gradient at t (clamped to [0, 1]).
    pub fn sample(&self, t: f64) -> Rgba {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let scaled = t * (stops.len() - 1) as f64;
        let i = (scaled.floor() as usize).min(stops.len() - 2);
        let frac = scaled - i as f64;
        hex(stops[i]).lerp(&hex(stops[i + 1]), frac)
    }
}

fn hex(v: u32) -> Rgba {
    Rgba::rgb((v >> 16) as u8, (v >> 8) as u8, v as u8)
}

impl FromStr for Gradient {
    type Err = VisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "turbo" => Ok(Gradient::Turbo),
            "viridis" => Ok(Gradient::Viridis),
            "plasma" => Ok(Gradient::Plasma),
            "inferno" => Ok(Gradient::Inferno),
            "grayscale" | "greyscale" | "gray" => Ok(Gradient::Grayscale),
            other => Err(VisError::Config(format!("unknown colormap `{other}`"))),
        }
    }
}

/// A gradient restricted to the sub-range [lo, hi].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Colormap {
    pub gradient: Gradient,
    pub lo: f64,
    pub hi: f64,
}

impl Default for Colormap {
    fn default() -> Self {
        Self::new(Gradient::default())
    }
}

impl Colormap {
    pub fn new(gradient: Gradient) -> Self {
        Self {
            gradient,
            lo: 0.0,
            hi: 1.0,
        }
    }

    /// Restrict the colormap to [lo, hi] of the underlying gradient.
    pub fn sub(gradient: Gradient, lo: f64, hi: f64) -> Result<Self> {
        let cm = Self { gradient, lo, hi };
        cm.validate()?;
        Ok(cm)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.lo) || !(0.0..=1.0).contains(&self.hi) || self.lo >= self.hi
        {
            return Err(VisError::Config(format!(
                "colormap range [{}, {}] must satisfy 0 <= lo < hi <= 1",
                self.lo, self.hi
            )));
        }
        Ok(())
    }

    /// Color for a normalized value t in [0, 1]
    pub fn sample(&self, t: f64) -> Rgba {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        self.gradient.sample(self.lo + t * (self.hi - self.lo))
    }
}
