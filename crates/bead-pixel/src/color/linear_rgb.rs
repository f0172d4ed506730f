//! Linear RGB color type
//!
//! Linear RGB encodes physical light intensity without the sRGB gamma curve.
//! Averaging and clustering colors must happen here: the arithmetic mean of
//! two gamma-encoded values is not the color halfway between them.

use super::srgb::Rgb8;

/// A color in linear RGB, channels in `0.0..=1.0` for in-gamut colors.
///
/// Use this type for any arithmetic on colors (means, K-means centroids).
/// Convert back to [`Rgb8`] for storage; the conversion rounds and clamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRgb {
    /// Red channel (linear intensity)
    pub r: f32,
    /// Green channel (linear intensity)
    pub g: f32,
    /// Blue channel (linear intensity)
    pub b: f32,
}

impl LinearRgb {
    /// Create a new linear RGB color from float components.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Return the channels as an array, convenient for clustering code.
    #[inline]
    pub const fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Build from an array produced by [`to_array`](Self::to_array).
    #[inline]
    pub const fn from_array(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Decode one 8-bit sRGB channel to linear intensity (IEC 61966-2-1).
#[inline]
pub fn srgb_to_linear(c8: u8) -> f32 {
    let v = c8 as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Encode one linear channel back to 8-bit sRGB, rounding and clamping.
#[inline]
pub fn linear_to_srgb(v: f32) -> u8 {
    let v = v.clamp(0.0, 1.0);
    let s = if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    };
    (s * 255.0).round() as u8
}

impl From<Rgb8> for LinearRgb {
    fn from(rgb: Rgb8) -> Self {
        Self {
            r: srgb_to_linear(rgb.r),
            g: srgb_to_linear(rgb.g),
            b: srgb_to_linear(rgb.b),
        }
    }
}

impl From<LinearRgb> for Rgb8 {
    fn from(linear: LinearRgb) -> Self {
        Self {
            r: linear_to_srgb(linear.r),
            g: linear_to_srgb(linear.g),
            b: linear_to_srgb(linear.b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Round-trip u8 -> linear -> u8 must be exact for every channel value.
    #[test]
    fn test_round_trip_exact() {
        for i in 0..=255u8 {
            let rgb = Rgb8::new(i, i, i);
            let back = Rgb8::from(LinearRgb::from(rgb));
            assert_eq!(back, rgb, "round trip failed for channel value {i}");
        }
    }

    #[test]
    fn test_known_gamma_values() {
        // Channel 0 -> 0.0, channel 255 -> 1.0
        assert!(srgb_to_linear(0).abs() < 1e-7);
        assert!((srgb_to_linear(255) - 1.0).abs() < 1e-6);

        // sRGB 128 (0.502) -> linear ~0.2158
        // Exact: ((128/255 + 0.055) / 1.055)^2.4 = 0.21586...
        let mid = srgb_to_linear(128);
        assert!(
            (mid - 0.2159).abs() < 0.001,
            "sRGB 128 -> linear expected ~0.2159, got {mid}"
        );

        // Low end uses the linear segment: 10/255/12.92
        let low = srgb_to_linear(10);
        assert!((low - 10.0 / 255.0 / 12.92).abs() < 1e-7);
    }

    #[test]
    fn test_encode_clamps_out_of_gamut() {
        assert_eq!(linear_to_srgb(-0.5), 0);
        assert_eq!(linear_to_srgb(1.5), 255);
    }

    #[test]
    fn test_mean_in_linear_space_differs_from_srgb_mean() {
        // Averaging black and white in linear space gives a lighter sRGB
        // value than 127 because of gamma.
        let black = LinearRgb::from(Rgb8::new(0, 0, 0));
        let white = LinearRgb::from(Rgb8::new(255, 255, 255));
        let mid = LinearRgb::new(
            (black.r + white.r) / 2.0,
            (black.g + white.g) / 2.0,
            (black.b + white.b) / 2.0,
        );
        let srgb = Rgb8::from(mid);
        assert!(srgb.r > 180, "linear mid-gray should encode near 188, got {}", srgb.r);
    }
}
