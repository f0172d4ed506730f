//! Color types and conversions
//!
//! The pipeline uses a chain of typed color spaces:
//!
//! - [`Rgb8`]: 8-bit sRGB for input/output (image pixels, palette colors)
//! - [`LinearRgb`]: linear light intensity for averaging and clustering
//! - [`Xyz`]: CIE XYZ tristimulus values (D65), the hub between RGB and Lab
//! - [`Lab`]: CIE L*a*b* for perceptual distance ([`Lab::delta_e_2000`])

mod lab;
mod linear_rgb;
mod srgb;
mod xyz;

pub use lab::Lab;
pub use linear_rgb::LinearRgb;
pub use srgb::{ParseColorError, Rgb8};
pub use xyz::Xyz;
