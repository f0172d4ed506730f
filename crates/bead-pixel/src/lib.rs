//! bead-pixel: pixel-grid synthesis and bead-board recognition
//!
//! The imaging core of a bead-craft design tool. Two workflows share one
//! data model, a rows x cols grid of palette colors ([`PixelGrid`]):
//!
//! - **Synthesis** ([`Quantizer`]): turn a raster image into a grid of
//!   cells, each matched to the nearest color of a [`Palette`].
//! - **Recognition** ([`Recognizer`]): from a photograph of a populated
//!   board, locate the lattice ([`GridDetector`]), classify each cell as
//!   occupied or empty ([`CellAnalyzer`]), extract the dominant color of
//!   occupied cells ([`ColorExtractor`]), and match it back to the palette.
//!
//! # Quick start
//!
//! ```
//! use bead_pixel::{ImageView, Palette, Quantizer, SampleMode};
//!
//! let palette = Palette::from_hex([
//!     ("Hama", "Black", "#000000"),
//!     ("Hama", "White", "#FFFFFF"),
//! ]).unwrap();
//!
//! let pixels = vec![255u8; 16 * 16 * 4]; // decoded RGBA8, row-major
//! let img = ImageView::new(&pixels, 16, 16).unwrap();
//!
//! let grid = Quantizer::new()
//!     .mode(SampleMode::Average)
//!     .quantize(&img, 8, 8, &palette)
//!     .unwrap();
//! assert_eq!((grid.rows(), grid.cols()), (8, 8));
//! ```
//!
//! # Color handling
//!
//! All perceptual decisions run in CIE Lab (D65) with the CIEDE2000
//! distance; arithmetic on colors (averages, K-means centroids) runs in
//! linear RGB. See the [`color`] module.
//!
//! # Determinism
//!
//! Every pipeline is deterministic: identical inputs produce identical
//! grids. The K-means extractor seeds its RNG from the cell index.

pub mod analyze;
pub mod color;
pub mod detect;
pub mod extract;
pub mod grid;
pub mod palette;
pub mod pipeline;
pub mod quantize;
pub mod raster;
pub mod sample;

#[cfg(test)]
mod domain_tests;
#[cfg(test)]
mod testutil;

pub use analyze::{AnalyzerThresholds, CellAnalysis, CellAnalyzer};
pub use color::{Lab, LinearRgb, ParseColorError, Rgb8, Xyz};
pub use detect::{DetectError, GridDebug, GridDetector, GridModel};
pub use extract::{ColorExtractor, ExtractedColor};
pub use grid::{PixelCell, PixelGrid};
pub use palette::{match_confidence, Palette, PaletteEntry, PaletteError, PaletteId};
pub use pipeline::{CancelToken, Phase, Recognition, RecognizeError, Recognizer};
pub use quantize::{QuantizeError, Quantizer};
pub use raster::{GrayBuffer, ImageView, InvalidImageError};
pub use sample::{Block, SampleMode};
