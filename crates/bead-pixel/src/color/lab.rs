//! CIE L*a*b* perceptual color space (D65)
//!
//! Lab is the matching space of the pipeline: palette lookups and bead color
//! matching measure distance here with the CIEDE2000 formula.
//!
//! # References
//!
//! Sharma, Wu, Dalal, "The CIEDE2000 color-difference formula: Implementation
//! notes, supplementary test data, and mathematical observations" (2005).

use super::linear_rgb::LinearRgb;
use super::srgb::Rgb8;
use super::xyz::{Xyz, D65_WHITE};

/// A color in CIE L*a*b* with D65 white point.
///
/// # Components
///
/// - `l`: lightness, 0.0 (black) to 100.0 (white)
/// - `a`: green-red axis (negative = green, positive = red)
/// - `b`: blue-yellow axis (negative = blue, positive = yellow)
///
/// Components are stored as `f32`; [`delta_e_2000`](Self::delta_e_2000)
/// computes internally in `f64` to reproduce the reference tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    /// Lightness, 0.0..=100.0 for in-gamut colors
    pub l: f32,
    /// Green-red axis
    pub a: f32,
    /// Blue-yellow axis
    pub b: f32,
}

impl Lab {
    /// Create a new Lab color.
    #[inline]
    pub const fn new(l: f32, a: f32, b: f32) -> Self {
        Self { l, a, b }
    }

    /// Perceptual color difference by the CIEDE2000 formula.
    ///
    /// Symmetric, non-negative, zero for identical colors. A difference
    /// below ~2.0 is generally imperceptible; bead matching treats it as
    /// an exact match.
    ///
    /// # Example
    ///
    /// ```
    /// use bead_pixel::{Lab, Rgb8};
    ///
    /// let red = Lab::from(Rgb8::new(255, 0, 0));
    /// let blue = Lab::from(Rgb8::new(0, 0, 255));
    /// assert!(red.delta_e_2000(blue) > 20.0);
    /// assert!(red.delta_e_2000(red) < 1e-6);
    /// ```
    pub fn delta_e_2000(self, other: Lab) -> f32 {
        delta_e_2000_f64(
            self.l as f64,
            self.a as f64,
            self.b as f64,
            other.l as f64,
            other.a as f64,
            other.b as f64,
        ) as f32
    }
}

/// CIEDE2000 in double precision (Sharma et al. 2005 formulation).
fn delta_e_2000_f64(l1: f64, a1: f64, b1: f64, l2: f64, a2: f64, b2: f64) -> f64 {
    const POW25_7: f64 = 6_103_515_625.0; // 25^7

    let c1 = (a1 * a1 + b1 * b1).sqrt();
    let c2 = (a2 * a2 + b2 * b2).sqrt();
    let c_bar = (c1 + c2) / 2.0;

    let c_bar7 = c_bar.powi(7);
    let g = 0.5 * (1.0 - (c_bar7 / (c_bar7 + POW25_7)).sqrt());

    let a1p = (1.0 + g) * a1;
    let a2p = (1.0 + g) * a2;
    let c1p = (a1p * a1p + b1 * b1).sqrt();
    let c2p = (a2p * a2p + b2 * b2).sqrt();

    let h1p = hue_angle(a1p, b1);
    let h2p = hue_angle(a2p, b2);

    let dl = l2 - l1;
    let dc = c2p - c1p;

    // Hue difference h'2 - h'1, wrapped into (-180, 180]
    let dh = if c1p * c2p == 0.0 {
        0.0
    } else {
        let d = h2p - h1p;
        if d > 180.0 {
            d - 360.0
        } else if d < -180.0 {
            d + 360.0
        } else {
            d
        }
    };
    let dh_big = 2.0 * (c1p * c2p).sqrt() * (dh / 2.0).to_radians().sin();

    let l_bar = (l1 + l2) / 2.0;
    let c_bar_p = (c1p + c2p) / 2.0;

    // Mean hue, accounting for the circular wrap
    let h_bar = if c1p * c2p == 0.0 {
        h1p + h2p
    } else {
        let sum = h1p + h2p;
        if (h1p - h2p).abs() <= 180.0 {
            sum / 2.0
        } else if sum < 360.0 {
            (sum + 360.0) / 2.0
        } else {
            (sum - 360.0) / 2.0
        }
    };

    let t = 1.0 - 0.17 * (h_bar - 30.0).to_radians().cos()
        + 0.24 * (2.0 * h_bar).to_radians().cos()
        + 0.32 * (3.0 * h_bar + 6.0).to_radians().cos()
        - 0.20 * (4.0 * h_bar - 63.0).to_radians().cos();

    let d_theta = 30.0 * (-((h_bar - 275.0) / 25.0).powi(2)).exp();
    let c_bar_p7 = c_bar_p.powi(7);
    let rc = 2.0 * (c_bar_p7 / (c_bar_p7 + POW25_7)).sqrt();
    let rt = -(2.0 * d_theta).to_radians().sin() * rc;

    let l50 = (l_bar - 50.0).powi(2);
    let sl = 1.0 + 0.015 * l50 / (20.0 + l50).sqrt();
    let sc = 1.0 + 0.045 * c_bar_p;
    let sh = 1.0 + 0.015 * c_bar_p * t;

    let dl = dl / sl;
    let dc = dc / sc;
    let dh_big = dh_big / sh;

    (dl * dl + dc * dc + dh_big * dh_big + rt * dc * dh_big).sqrt()
}

/// Hue angle in degrees, 0..360, zero for achromatic colors.
#[inline]
fn hue_angle(ap: f64, b: f64) -> f64 {
    if ap == 0.0 && b == 0.0 {
        return 0.0;
    }
    let h = b.atan2(ap).to_degrees();
    if h < 0.0 {
        h + 360.0
    } else {
        h
    }
}

/// The CIE Lab nonlinearity threshold (6/29)^3.
const LAB_EPSILON: f32 = 0.008856;

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

#[inline]
fn lab_f_inv(f: f32) -> f32 {
    let f3 = f * f * f;
    if f3 > LAB_EPSILON {
        f3
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

impl From<Xyz> for Lab {
    fn from(xyz: Xyz) -> Self {
        let fx = lab_f(xyz.x / D65_WHITE.0);
        let fy = lab_f(xyz.y / D65_WHITE.1);
        let fz = lab_f(xyz.z / D65_WHITE.2);
        Lab {
            l: 116.0 * fy - 16.0,
            a: 500.0 * (fx - fy),
            b: 200.0 * (fy - fz),
        }
    }
}

impl From<Lab> for Xyz {
    fn from(lab: Lab) -> Self {
        let fy = (lab.l + 16.0) / 116.0;
        let fx = fy + lab.a / 500.0;
        let fz = fy - lab.b / 200.0;
        Xyz {
            x: lab_f_inv(fx) * D65_WHITE.0,
            y: lab_f_inv(fy) * D65_WHITE.1,
            z: lab_f_inv(fz) * D65_WHITE.2,
        }
    }
}

impl From<LinearRgb> for Lab {
    fn from(rgb: LinearRgb) -> Self {
        Lab::from(Xyz::from(rgb))
    }
}

impl From<Rgb8> for Lab {
    /// Full chain sRGB -> linear -> XYZ -> Lab.
    fn from(rgb: Rgb8) -> Self {
        Lab::from(Xyz::from(LinearRgb::from(rgb)))
    }
}
