//! Link colours
//!
//! Every source with at least one listener gets a colour that is perceptually
//! distinct from the other sources in its layout. Distance is CIE76 delta E in
//! CIELAB space; the required distance shrinks as more colours are in use.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::FlexingError;

/// Sampling gives up after this many draws and keeps the best candidate
const MAX_ATTEMPTS: usize = 10_000;

/// sRGB colour of a link marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LinkColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl LinkColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from hue in degrees, saturation and lightness in `0.0..=1.0`
    pub fn from_hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
        let h = hue.rem_euclid(360.0) / 360.0;
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);

        if s == 0.0 {
            let v = channel_to_u8(l);
            return Self::rgb(v, v, v);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        Self::rgb(
            channel_to_u8(hue_to_rgb(p, q, h + 1.0 / 3.0)),
            channel_to_u8(hue_to_rgb(p, q, h)),
            channel_to_u8(hue_to_rgb(p, q, h - 1.0 / 3.0)),
        )
    }

    /// Parse from "#RRGGBB" (the leading '#' is optional)
    pub fn from_hex(s: &str) -> Result<Self, FlexingError> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || FlexingError::InvalidColor(s.to_string());
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::rgb(byte(0)?, byte(2)?, byte(4)?))
    }

    /// Lowercase "#rrggbb"
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// CIELAB coordinates (D65 white point)
    pub fn to_lab(&self) -> (f64, f64, f64) {
        let r = srgb_to_linear(self.r);
        let g = srgb_to_linear(self.g);
        let b = srgb_to_linear(self.b);

        let x = (0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b) / 0.950_47;
        let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175_0 * b;
        let z = (0.019_333_9 * r + 0.119_192_0 * g + 0.950_304_1 * b) / 1.088_83;

        let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
        (116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
    }

    /// Perceptual distance (CIE76 delta E)
    pub fn delta_e(&self, other: &LinkColor) -> f64 {
        let (l1, a1, b1) = self.to_lab();
        let (l2, a2, b2) = other.to_lab();
        ((l1 - l2).powi(2) + (a1 - a2).powi(2) + (b1 - b2).powi(2)).sqrt()
    }
}

impl fmt::Display for LinkColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for LinkColor {
    type Error = FlexingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<LinkColor> for String {
    fn from(color: LinkColor) -> Self {
        color.to_hex()
    }
}

fn hue_to_rgb(p: f64, q: f64, t: f64) -> f64 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn channel_to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn srgb_to_linear(c: u8) -> f64 {
    let c = f64::from(c) / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn lab_f(t: f64) -> f64 {
    const EPSILON: f64 = 216.0 / 24_389.0;
    const KAPPA: f64 = 24_389.0 / 27.0;
    if t > EPSILON {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

/// Minimum delta E a new colour needs against `in_use` existing colours
pub fn min_distance_for(in_use: usize) -> f64 {
    100.0 / (in_use as f64 + 1.0)
}

/// Samples link colours from a bright, saturated HSL band
#[derive(Debug)]
pub struct ColorAllocator {
    rng: StdRng,
}

impl ColorAllocator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic allocator for tests and reproducible sessions
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn sample(&mut self) -> LinkColor {
        let hue = f64::from(self.rng.gen_range(0..=360_u16));
        let lightness = 0.65 + self.rng.gen::<f64>() * 0.35;
        LinkColor::from_hsl(hue, 1.0, lightness)
    }

    /// Draw a colour far enough from every colour in `in_use`
    pub fn allocate(&mut self, in_use: &[LinkColor]) -> LinkColor {
        let threshold = min_distance_for(in_use.len());
        let mut best: Option<(LinkColor, f64)> = None;

        for _ in 0..MAX_ATTEMPTS {
            let candidate = self.sample();
            let distance = in_use
                .iter()
                .map(|c| candidate.delta_e(c))
                .fold(f64::INFINITY, f64::min);
            if distance >= threshold {
                return candidate;
            }
            if best.map_or(true, |(_, d)| distance > d) {
                best = Some((candidate, distance));
            }
        }

        let (color, distance) = best.unwrap_or_else(|| (self.sample(), 0.0));
        tracing::warn!(
            in_use = in_use.len(),
            threshold,
            distance,
            "no link colour met the distance threshold, using the farthest sample"
        );
        color
    }
}

impl Default for ColorAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip_and_case() {
        let color = LinkColor::from_hex("#FF8000").unwrap();
        assert_eq!(color, LinkColor::rgb(255, 128, 0));
        assert_eq!(color.to_hex(), "#ff8000");
        assert_eq!(LinkColor::from_hex("00ff00").unwrap(), LinkColor::rgb(0, 255, 0));
    }

    #[test]
    fn test_invalid_hex_rejected() {
        for bad in ["", "#fff", "#gg0000", "#12345678", "#ééé"] {
            assert!(LinkColor::from_hex(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_hsl_primaries() {
        assert_eq!(LinkColor::from_hsl(0.0, 1.0, 0.5), LinkColor::rgb(255, 0, 0));
        assert_eq!(LinkColor::from_hsl(120.0, 1.0, 0.5), LinkColor::rgb(0, 255, 0));
        assert_eq!(LinkColor::from_hsl(240.0, 1.0, 0.5), LinkColor::rgb(0, 0, 255));
        assert_eq!(LinkColor::from_hsl(0.0, 0.0, 1.0), LinkColor::rgb(255, 255, 255));
    }

    #[test]
    fn test_delta_e_reference_values() {
        let white = LinkColor::rgb(255, 255, 255);
        let black = LinkColor::rgb(0, 0, 0);
        assert!((white.delta_e(&black) - 100.0).abs() < 0.5);
        assert_eq!(white.delta_e(&white), 0.0);
    }

    #[test]
    fn test_threshold_tightens_with_more_colours() {
        assert_eq!(min_distance_for(0), 100.0);
        assert_eq!(min_distance_for(1), 50.0);
        assert!(min_distance_for(9) < min_distance_for(3));
    }

    #[test]
    fn test_allocations_keep_their_distance() {
        let mut allocator = ColorAllocator::seeded(42);
        let mut in_use = Vec::new();
        for _ in 0..6 {
            let color = allocator.allocate(&in_use);
            let threshold = min_distance_for(in_use.len());
            assert!(in_use.iter().all(|c| color.delta_e(c) >= threshold));
            in_use.push(color);
        }
    }

    #[test]
    fn test_serde_as_hex_string() {
        let color = LinkColor::rgb(18, 52, 86);
        let json = serde_json::to_string(&color).unwrap();
        assert_eq!(json, "\"#123456\"");
        let back: LinkColor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, color);
        assert!(serde_json::from_str::<LinkColor>("\"red\"").is_err());
    }
}
