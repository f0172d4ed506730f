//! Block sampling: pick one representative color for an image region
//!
//! The quantizer divides the source image into rectangular blocks, one per
//! output cell, and asks this module for a single RGB value per block. The
//! sampling strategy is a closed set of modes; screenshots of printed
//! patterns additionally benefit from trimming the block edges to avoid
//! grid-line artifacts.

use std::collections::HashMap;

use crate::color::Rgb8;
use crate::raster::ImageView;

/// Strategy for reducing a block of pixels to one color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleMode {
    /// The exact (R,G,B) value occurring most often in the block;
    /// ties go to the value seen first in scan order
    #[default]
    Dominant,
    /// Channel-wise integer mean of every pixel in the block
    Average,
    /// The single pixel at the geometric center of the block
    Center,
    /// The single pixel at fractional offset (4/5, 4/5) into the block
    Diagonal45,
    /// No block sampling: the image is resampled to the grid size first and
    /// each cell reads its one resampled pixel (resolved by the quantizer)
    Original,
}

impl SampleMode {
    /// True for the modes that sample a block of the source image;
    /// false for [`Original`](SampleMode::Original), which resamples the
    /// whole image instead.
    #[inline]
    pub fn samples_blocks(self) -> bool {
        !matches!(self, SampleMode::Original)
    }
}

/// A half-open pixel rectangle `[x0, x1) x [y0, y1)` within the source image.
///
/// The `trimmed` flag records whether edge trimming has been applied, which
/// makes [`trimmed()`](Self::trimmed) idempotent: trimming twice equals
/// trimming once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
    trimmed: bool,
}

impl Block {
    /// Create an untrimmed block. Callers guarantee `x1 > x0` and `y1 > y0`;
    /// the quantizer's span computation never produces an empty block.
    pub fn new(x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        debug_assert!(x1 > x0 && y1 > y0, "block must be non-empty");
        Self {
            x0,
            y0,
            x1,
            y1,
            trimmed: false,
        }
    }

    /// Block width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.x1 - self.x0
    }

    /// Block height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.y1 - self.y0
    }

    /// Edge-trim the block by 15% on each side (at least 1 px), keeping at
    /// least one pixel per axis. Already-trimmed blocks are returned
    /// unchanged.
    pub fn trimmed(self) -> Self {
        if self.trimmed {
            return self;
        }
        let (x0, x1) = trim_span(self.x0, self.x1);
        let (y0, y1) = trim_span(self.y0, self.y1);
        Self {
            x0,
            y0,
            x1,
            y1,
            trimmed: true,
        }
    }
}

/// Trim one axis span by 15% per side, min 1 px, degrading to the central
/// pixel when the span is too narrow to inset.
fn trim_span(lo: usize, hi: usize) -> (usize, usize) {
    let len = hi - lo;
    let inset = ((len as f32 * 0.15).round() as usize).max(1);
    if len > 2 * inset {
        (lo + inset, hi - inset)
    } else {
        let mid = lo + (len - 1) / 2;
        (mid, mid + 1)
    }
}

/// Reduce a block to one RGB value under the given mode.
///
/// [`SampleMode::Original`] is resolved by the quantizer (the whole image is
/// resampled before any block exists); if it reaches this function the block
/// center is returned.
pub fn sample_block(img: &ImageView<'_>, block: Block, mode: SampleMode) -> Rgb8 {
    match mode {
        SampleMode::Dominant => dominant(img, block),
        SampleMode::Average => average(img, block),
        SampleMode::Center | SampleMode::Original => center(img, block),
        SampleMode::Diagonal45 => diagonal45(img, block),
    }
}

/// The most frequent exact color in the block; ties break to the color whose
/// first occurrence comes earliest in scan order.
fn dominant(img: &ImageView<'_>, block: Block) -> Rgb8 {
    let mut counts: HashMap<[u8; 3], (usize, usize)> = HashMap::new();
    let mut index = 0usize;
    for y in block.y0..block.y1 {
        for x in block.x0..block.x1 {
            let key = img.rgb(x, y).to_bytes();
            let slot = counts.entry(key).or_insert((0, index));
            slot.0 += 1;
            index += 1;
        }
    }
    let (key, _) = counts
        .iter()
        .min_by_key(|(_, &(count, first))| (std::cmp::Reverse(count), first))
        .map(|(k, v)| (*k, *v))
        .unwrap_or(([0, 0, 0], (0, 0)));
    Rgb8::from_bytes(key)
}

/// Channel-wise integer mean over the block.
fn average(img: &ImageView<'_>, block: Block) -> Rgb8 {
    let mut sum = [0u64; 3];
    let mut n = 0u64;
    for y in block.y0..block.y1 {
        for x in block.x0..block.x1 {
            let p = img.rgb(x, y);
            sum[0] += p.r as u64;
            sum[1] += p.g as u64;
            sum[2] += p.b as u64;
            n += 1;
        }
    }
    if n == 0 {
        return Rgb8::new(0, 0, 0);
    }
    Rgb8::new(
        (sum[0] / n) as u8,
        (sum[1] / n) as u8,
        (sum[2] / n) as u8,
    )
}

/// The pixel at the geometric center of the block.
fn center(img: &ImageView<'_>, block: Block) -> Rgb8 {
    let x = block.x0 + block.width() / 2;
    let y = block.y0 + block.height() / 2;
    img.rgb(x.min(block.x1 - 1), y.min(block.y1 - 1))
}

/// The pixel at fractional offset (4/5, 4/5) into the block span.
fn diagonal45(img: &ImageView<'_>, block: Block) -> Rgb8 {
    let x = block.x0 + block.width() * 4 / 5;
    let y = block.y0 + block.height() * 4 / 5;
    img.rgb(x.min(block.x1 - 1), y.min(block.y1 - 1))
}
