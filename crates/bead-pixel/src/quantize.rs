//! Quantizer: project a raster image onto a palette-color grid
//!
//! Synthesis direction of the tool. The image is divided into `rows x cols`
//! blocks (or resampled to exactly that size for
//! [`SampleMode::Original`]), each block reduced to one RGB value, and that
//! value matched to the nearest palette entry in Lab space.

use std::fmt;

use crate::color::{Lab, Rgb8};
use crate::grid::{PixelCell, PixelGrid};
use crate::palette::{match_confidence, Palette, PaletteError};
use crate::raster::{ImageView, InvalidImageError};
use crate::sample::{sample_block, Block, SampleMode};

/// Configuration for one quantization run.
///
/// Builder-style: configure mode and edge trimming, then call
/// [`quantize`](Self::quantize). The builder is reusable across images.
///
/// # Example
///
/// ```
/// use bead_pixel::{ImageView, Palette, Quantizer, SampleMode};
///
/// let palette = Palette::from_hex([
///     ("Test", "Black", "#000000"),
///     ("Test", "White", "#FFFFFF"),
/// ]).unwrap();
///
/// let data = vec![255u8; 8 * 8 * 4]; // 8x8 white image
/// let img = ImageView::new(&data, 8, 8).unwrap();
///
/// let grid = Quantizer::new()
///     .mode(SampleMode::Average)
///     .edge_trim(false)
///     .quantize(&img, 4, 4, &palette)
///     .unwrap();
///
/// assert_eq!((grid.rows(), grid.cols()), (4, 4));
/// ```
#[derive(Debug, Clone)]
pub struct Quantizer {
    mode: SampleMode,
    edge_trim: bool,
}

impl Default for Quantizer {
    fn default() -> Self {
        Self {
            mode: SampleMode::Dominant,
            edge_trim: true,
        }
    }
}

impl Quantizer {
    /// Create a quantizer with the default configuration
    /// (dominant sampling, edge trimming on).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the block sampling mode.
    #[inline]
    pub fn mode(mut self, mode: SampleMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable 15% edge trimming of sampled blocks.
    /// Ignored for [`SampleMode::Original`], which has no blocks.
    #[inline]
    pub fn edge_trim(mut self, enabled: bool) -> Self {
        self.edge_trim = enabled;
        self
    }

    /// Quantize `img` to a `rows x cols` grid of palette colors.
    ///
    /// Every cell receives exactly one palette assignment; the output is
    /// bitwise deterministic for identical inputs and palette order.
    ///
    /// # Errors
    ///
    /// - [`QuantizeError::BadGridSize`] when `rows` or `cols` is zero
    /// - [`QuantizeError::EmptyPalette`] when the palette has no entries
    pub fn quantize(
        &self,
        img: &ImageView<'_>,
        rows: usize,
        cols: usize,
        palette: &Palette,
    ) -> Result<PixelGrid, QuantizeError> {
        if rows == 0 || cols == 0 {
            return Err(QuantizeError::BadGridSize { rows, cols });
        }
        if palette.is_empty() {
            return Err(QuantizeError::EmptyPalette);
        }

        let mut grid = PixelGrid::new(rows, cols);

        if self.mode == SampleMode::Original {
            // One resampling pass; each cell reads its single pixel.
            let resampled = img.resample_bilinear(cols, rows);
            for r in 0..rows {
                for c in 0..cols {
                    let i = (r * cols + c) * 4;
                    let rgb = Rgb8::new(resampled[i], resampled[i + 1], resampled[i + 2]);
                    grid.set(r, c, self.match_cell(rgb, palette)?);
                }
            }
            return Ok(grid);
        }

        for r in 0..rows {
            for c in 0..cols {
                let mut block = cell_block(img, r, c, rows, cols);
                if self.edge_trim {
                    block = block.trimmed();
                }
                let rgb = sample_block(img, block, self.mode);
                grid.set(r, c, self.match_cell(rgb, palette)?);
            }
        }
        Ok(grid)
    }

    fn match_cell(&self, rgb: Rgb8, palette: &Palette) -> Result<PixelCell, QuantizeError> {
        let (entry, delta_e) = palette.nearest(Lab::from(rgb))?;
        Ok(PixelCell::Bead {
            rgb: entry.rgb,
            id: entry.id.clone(),
            confidence: match_confidence(delta_e),
        })
    }
}

/// The source block for cell `(r, c)` of a `rows x cols` grid.
///
/// Span edges are `round(i * dim / n)`; a span is forced to at least one
/// pixel and clamped into the image, so blocks are never empty and always
/// fully contained.
fn cell_block(img: &ImageView<'_>, r: usize, c: usize, rows: usize, cols: usize) -> Block {
    let (x0, x1) = cell_span(c, cols, img.width());
    let (y0, y1) = cell_span(r, rows, img.height());
    Block::new(x0, y0, x1, y1)
}

fn cell_span(i: usize, n: usize, dim: usize) -> (usize, usize) {
    let step = dim as f64 / n as f64;
    let lo = (i as f64 * step).round() as usize;
    let hi = ((i + 1) as f64 * step).round() as usize;
    let lo = lo.min(dim - 1);
    let hi = hi.max(lo + 1).min(dim);
    (lo, hi.max(lo + 1))
}

/// Error type for quantization.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantizeError {
    /// Rows or cols was zero
    BadGridSize { rows: usize, cols: usize },
    /// The palette has no entries
    EmptyPalette,
    /// The input pixel buffer was malformed
    InvalidImage(InvalidImageError),
}

impl From<PaletteError> for QuantizeError {
    fn from(_: PaletteError) -> Self {
        // nearest() only fails on an empty palette
        QuantizeError::EmptyPalette
    }
}

impl From<InvalidImageError> for QuantizeError {
    fn from(err: InvalidImageError) -> Self {
        QuantizeError::InvalidImage(err)
    }
}

impl fmt::Display for QuantizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantizeError::BadGridSize { rows, cols } => {
                write!(f, "invalid grid size {rows}x{cols}")
            }
            QuantizeError::EmptyPalette => write!(f, "palette has no entries"),
            QuantizeError::InvalidImage(err) => write!(f, "invalid image: {}", err),
        }
    }
}

impl std::error::Error for QuantizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QuantizeError::InvalidImage(err) => Some(err),
            _ => None,
        }
    }
}
