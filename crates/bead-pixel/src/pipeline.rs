//! Recognition pipeline: photograph -> palette-matched pixel grid
//!
//! Composes detection, occupancy analysis, and color extraction into one
//! synchronous routine. The caller observes progress through a callback and
//! may abort through a [`CancelToken`]; both are polled between phases and
//! between per-cell work items, never mid-computation.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::analyze::{CellAnalysis, CellAnalyzer};
use crate::detect::{DetectError, GridDebug, GridDetector, GridModel};
use crate::extract::ColorExtractor;
use crate::grid::{PixelCell, PixelGrid};
use crate::palette::Palette;
use crate::raster::{ImageView, InvalidImageError};

/// Pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Input validation and grayscale conversion (ends at 20%)
    Load,
    /// Grid detection (ends at 45%)
    Detect,
    /// Occupancy analysis (ends at 55%)
    Analyze,
    /// Per-cell color extraction (55%..95%)
    Colors,
    /// Grid normalization (100%)
    Finalize,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Load => "load",
            Phase::Detect => "detect",
            Phase::Analyze => "analyze",
            Phase::Colors => "colors",
            Phase::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// Cooperative cancellation flag shared between the caller and the
/// pipeline.
///
/// Cloning is cheap and all clones observe the same flag. Once cancelled,
/// a token stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The pipeline aborts at its next poll point.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// True once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Result of a successful recognition run.
#[derive(Debug, Clone)]
pub struct Recognition {
    /// The normalized pixel grid: occupied cells start at row 0 / col 0
    pub grid: PixelGrid,
    /// The detected lattice geometry (unnormalized image coordinates)
    pub model: GridModel,
    /// Per-cell analyses in lattice coordinates, row-major
    pub analyses: Vec<CellAnalysis>,
}

/// Error type of the recognition pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizeError {
    /// The input buffer was empty, zero-sized, or mis-sized
    InvalidImage(InvalidImageError),
    /// The palette has no entries
    EmptyPalette,
    /// Neither detection method found a lattice
    GridNotFound(GridDebug),
    /// The cancel token fired
    Cancelled,
}

impl From<InvalidImageError> for RecognizeError {
    fn from(err: InvalidImageError) -> Self {
        RecognizeError::InvalidImage(err)
    }
}

impl From<DetectError> for RecognizeError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::GridNotFound(debug) => RecognizeError::GridNotFound(debug),
        }
    }
}

impl fmt::Display for RecognizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognizeError::InvalidImage(err) => write!(f, "invalid image: {}", err),
            RecognizeError::EmptyPalette => write!(f, "palette has no entries"),
            RecognizeError::GridNotFound(debug) => write!(
                f,
                "no bead grid found ({} candidates, pitch candidates {:?})",
                debug.candidate_count, debug.pitch_candidates
            ),
            RecognizeError::Cancelled => write!(f, "recognition cancelled"),
        }
    }
}

impl std::error::Error for RecognizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecognizeError::InvalidImage(err) => Some(err),
            _ => None,
        }
    }
}

/// The photograph-to-grid pipeline.
///
/// # Example
///
/// ```no_run
/// use bead_pixel::{CancelToken, Palette, Recognizer};
///
/// let palette = Palette::from_hex([("Hama", "Red", "#FF0000")]).unwrap();
/// let (pixels, width, height) = (vec![0u8; 400 * 300 * 4], 400, 300);
///
/// let recognizer = Recognizer::new();
/// let cancel = CancelToken::new();
/// let result = recognizer.recognize(
///     &pixels,
///     width,
///     height,
///     &palette,
///     |phase, fraction| eprintln!("{phase}: {:.0}%", fraction * 100.0),
///     &cancel,
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Recognizer {
    detector: GridDetector,
    analyzer: CellAnalyzer,
    extractor: ColorExtractor,
}

impl Recognizer {
    /// Create a pipeline with the standard component configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run recognition over a decoded RGBA8 buffer.
    ///
    /// `progress` receives `(phase, fraction)` pairs with fractions in
    /// `[0, 1]`, monotonically non-decreasing. `cancel` is polled between
    /// phases and between cells; a fired token aborts with
    /// [`RecognizeError::Cancelled`] and no partial grid escapes.
    ///
    /// # Errors
    ///
    /// See [`RecognizeError`]. Per-cell extraction failures do not abort:
    /// the affected cell degrades to neutral gray with zero confidence.
    pub fn recognize(
        &self,
        pixels: &[u8],
        width: usize,
        height: usize,
        palette: &Palette,
        mut progress: impl FnMut(Phase, f32),
        cancel: &CancelToken,
    ) -> Result<Recognition, RecognizeError> {
        if palette.is_empty() {
            return Err(RecognizeError::EmptyPalette);
        }

        // Load: validate the buffer, derive the grayscale raster
        let img = ImageView::new(pixels, width, height)?;
        let gray = img.to_gray();
        progress(Phase::Load, 0.20);
        self.check(cancel)?;

        // Detect
        let model = self.detector.detect(&img, &gray)?;
        progress(Phase::Detect, 0.45);
        self.check(cancel)?;

        // Analyze
        let (analyses, _thresholds) = self.analyzer.analyze(&img, &gray, &model);
        progress(Phase::Analyze, 0.55);
        self.check(cancel)?;

        // Per-cell color extraction
        let occupied: Vec<&CellAnalysis> = analyses.iter().filter(|c| c.occupied).collect();
        let radius = (model.pitch_x + model.pitch_y) / 4.0;
        let total = occupied.len();

        let mut extracted = Vec::with_capacity(total);
        for (done, cell) in occupied.iter().enumerate() {
            self.check(cancel)?;
            let seed = (cell.row * model.cols + cell.col) as u64;
            let color = self
                .extractor
                .extract(&img, cell.center.0, cell.center.1, radius, palette, seed)
                .map_err(|_| RecognizeError::EmptyPalette)?;
            extracted.push((cell.row, cell.col, cell.confidence, color));
            progress(
                Phase::Colors,
                0.55 + 0.40 * (done + 1) as f32 / total.max(1) as f32,
            );
        }
        self.check(cancel)?;

        // Finalize: shift the occupied bounding box to (0, 0)
        let grid = normalize(&extracted);
        progress(Phase::Finalize, 1.0);

        Ok(Recognition {
            grid,
            model,
            analyses,
        })
    }

    fn check(&self, cancel: &CancelToken) -> Result<(), RecognizeError> {
        if cancel.is_cancelled() {
            Err(RecognizeError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Build the output grid with the minimum occupied row and column mapped
/// to zero. With no occupied cells the result is a single empty cell.
fn normalize(
    extracted: &[(usize, usize, f32, crate::extract::ExtractedColor)],
) -> PixelGrid {
    if extracted.is_empty() {
        return PixelGrid::new(1, 1);
    }

    let min_row = extracted.iter().map(|e| e.0).min().unwrap_or(0);
    let max_row = extracted.iter().map(|e| e.0).max().unwrap_or(0);
    let min_col = extracted.iter().map(|e| e.1).min().unwrap_or(0);
    let max_col = extracted.iter().map(|e| e.1).max().unwrap_or(0);

    let mut grid = PixelGrid::new(max_row - min_row + 1, max_col - min_col + 1);
    for (row, col, cell_confidence, color) in extracted {
        // Combine occupancy and color-match evidence
        let confidence = (cell_confidence * color.confidence).clamp(0.0, 1.0);
        grid.set(
            row - min_row,
            col - min_col,
            PixelCell::Bead {
                rgb: color.rgb,
                id: color.id.clone(),
                confidence,
            },
        );
    }
    grid
}
