//! CIE XYZ tristimulus values (D65)
//!
//! XYZ is the device-independent hub between linear RGB and Lab. The matrix
//! below is the standard sRGB-to-XYZ matrix for the D65 white point.

use super::linear_rgb::LinearRgb;

/// CIE XYZ color, D65 reference white.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Xyz {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// D65 reference white tristimulus values.
pub(crate) const D65_WHITE: (f32, f32, f32) = (0.95047, 1.0, 1.08883);

impl Xyz {
    /// Create a new XYZ color.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<LinearRgb> for Xyz {
    fn from(rgb: LinearRgb) -> Self {
        Xyz {
            x: 0.4124564 * rgb.r + 0.3575761 * rgb.g + 0.1804375 * rgb.b,
            y: 0.2126729 * rgb.r + 0.7151522 * rgb.g + 0.0721750 * rgb.b,
            z: 0.0193339 * rgb.r + 0.1191920 * rgb.g + 0.9503041 * rgb.b,
        }
    }
}

impl From<Xyz> for LinearRgb {
    /// Inverse of the D65 sRGB matrix. The result is not clamped;
    /// out-of-gamut XYZ values produce channels outside `0.0..=1.0`.
    fn from(xyz: Xyz) -> Self {
        LinearRgb {
            r: 3.2404542 * xyz.x - 1.5371385 * xyz.y - 0.4985314 * xyz.z,
            g: -0.9692660 * xyz.x + 1.8760108 * xyz.y + 0.0415560 * xyz.z,
            b: 0.0556434 * xyz.x - 0.2040259 * xyz.y + 1.0572252 * xyz.z,
        }
    }
}
