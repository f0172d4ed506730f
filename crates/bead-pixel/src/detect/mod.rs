//! Grid detection: recover the bead lattice from a photograph
//!
//! Input is an approximately axis-aligned photo of a square-lattice bead
//! board; output is a [`GridModel`] (pitch, origin, rows, cols). Two methods
//! run in order:
//!
//! 1. [`candidates`]: gather probable bead centers with three independent
//!    detectors, then estimate pitch and bounds from the candidate cloud.
//! 2. [`projection`]: when too few candidates survive, fall back to
//!    autocorrelation of the row/column projections.
//!
//! Perspective rectification is the caller's job; the detector never warps.

mod candidates;
mod projection;

use std::fmt;

use crate::raster::{GrayBuffer, ImageView};

/// The recovered lattice geometry of a photographed board.
#[derive(Debug, Clone, PartialEq)]
pub struct GridModel {
    /// Horizontal center-to-center spacing in pixels
    pub pitch_x: f32,
    /// Vertical center-to-center spacing in pixels
    pub pitch_y: f32,
    /// Image x of the (0,0) cell center
    pub origin_x: f32,
    /// Image y of the (0,0) cell center
    pub origin_y: f32,
    /// Lattice rows
    pub rows: usize,
    /// Lattice columns
    pub cols: usize,
    /// Detection confidence in `[0, 1]`
    pub confidence: f32,
}

impl GridModel {
    /// Image coordinates of the center of cell `(row, col)`.
    #[inline]
    pub fn cell_center(&self, row: usize, col: usize) -> (f32, f32) {
        (
            self.origin_x + col as f32 * self.pitch_x,
            self.origin_y + row as f32 * self.pitch_y,
        )
    }

    /// Shrink `rows`/`cols` until the last cell's sampling disk
    /// (center plus half a pitch) fits inside `width x height`.
    fn clamp_to_image(mut self, width: usize, height: usize) -> Self {
        while self.cols > 1
            && self.origin_x + (self.cols - 1) as f32 * self.pitch_x + self.pitch_x / 2.0
                > width as f32
        {
            self.cols -= 1;
        }
        while self.rows > 1
            && self.origin_y + (self.rows - 1) as f32 * self.pitch_y + self.pitch_y / 2.0
                > height as f32
        {
            self.rows -= 1;
        }
        self
    }
}

/// Diagnostic record attached to a failed detection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridDebug {
    /// Bead-center candidates that survived non-maximum suppression
    pub candidate_count: usize,
    /// Pitch values each stage considered, in order
    pub pitch_candidates: Vec<f32>,
}

/// Error type for grid detection.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectError {
    /// Neither detection method produced a plausible lattice
    GridNotFound(GridDebug),
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectError::GridNotFound(debug) => write!(
                f,
                "no bead grid found ({} candidates, pitch candidates {:?})",
                debug.candidate_count, debug.pitch_candidates
            ),
        }
    }
}

impl std::error::Error for DetectError {}

/// Minimum surviving candidates for the candidate-cloud method.
const MIN_CANDIDATES: usize = 50;

/// Pitch bounds for the candidate-cloud estimate (clamp range).
const CLOUD_PITCH_RANGE: (f32, f32) = (10.0, 40.0);

/// Pitch bounds for the projection fallback.
const PROJECTION_PITCH_RANGE: (f32, f32) = (12.0, 50.0);

/// Detects the bead lattice of a board photograph.
///
/// Stateless; construct once and reuse. See the module docs for the method
/// selection rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridDetector;

impl GridDetector {
    /// Create a detector with the standard pitch ranges.
    pub fn new() -> Self {
        Self
    }

    /// Detect the lattice in `img`. `gray` must be the grayscale rendering
    /// of the same image (the pipeline computes it once and shares it).
    ///
    /// # Errors
    ///
    /// [`DetectError::GridNotFound`] with a diagnostic record when neither
    /// method yields a pitch inside its accepted range.
    pub fn detect(
        &self,
        img: &ImageView<'_>,
        gray: &GrayBuffer,
    ) -> Result<GridModel, DetectError> {
        let mut debug = GridDebug::default();

        let candidates = candidates::collect(img, gray);
        debug.candidate_count = candidates.len();

        if candidates.len() >= MIN_CANDIDATES {
            match candidates::model_from_cloud(&candidates, CLOUD_PITCH_RANGE) {
                Ok(model) => {
                    return Ok(model.clamp_to_image(gray.width(), gray.height()));
                }
                Err(pitch) => {
                    if let Some(p) = pitch {
                        debug.pitch_candidates.push(p);
                    }
                }
            }
        }

        match projection::model_from_projections(gray, PROJECTION_PITCH_RANGE) {
            Ok(model) => Ok(model.clamp_to_image(gray.width(), gray.height())),
            Err(pitches) => {
                debug.pitch_candidates.extend(pitches);
                Err(DetectError::GridNotFound(debug))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb8;
    use crate::testutil::{synth_bead_board, synth_lattice, synth_rgba};

    fn view_and_gray(data: &[u8], w: usize, h: usize) -> (ImageView<'_>, GrayBuffer) {
        let img = ImageView::new(data, w, h).unwrap();
        let gray = img.to_gray();
        (img, gray)
    }

    /// Synthetic solid-disk lattice: no bead signature (no bright ring), so
    /// the candidate cloud stays empty and the projection fallback recovers
    /// the full-image lattice by division.
    #[test]
    fn test_solid_disk_lattice_uses_projection_fallback() {
        let data = synth_lattice(400, 400, 20, 6.0, 16.0, 8.0, |_, _| true);
        let (img, gray) = view_and_gray(&data, 400, 400);

        let model = GridDetector::new().detect(&img, &gray).unwrap();

        assert!(
            model.pitch_x >= 15.5 && model.pitch_x <= 16.5,
            "pitch_x = {}",
            model.pitch_x
        );
        assert!(
            model.pitch_y >= 15.5 && model.pitch_y <= 16.5,
            "pitch_y = {}",
            model.pitch_y
        );
        assert_eq!(model.rows, 25);
        assert_eq!(model.cols, 25);
        assert!((model.confidence - 0.5).abs() < 1e-6);

        // Origin aligns with the disk lattice
        assert!((model.origin_x - 8.0).abs() <= 2.0, "origin_x = {}", model.origin_x);
        assert!((model.origin_y - 8.0).abs() <= 2.0, "origin_y = {}", model.origin_y);
    }

    /// A colored bead board (bright ring, dark hole) drives the
    /// candidate-cloud method: candidate count is high, the pitch matches,
    /// and rows/cols cover the populated area.
    #[test]
    fn test_bead_board_uses_candidate_cloud() {
        let red = Rgb8::new(220, 40, 40);
        let data = synth_bead_board(340, 340, 20, 16.0, 14.0, |_, _| Some(red));
        let (img, gray) = view_and_gray(&data, 340, 340);

        let model = GridDetector::new().detect(&img, &gray).unwrap();

        assert!(
            model.pitch_x >= 14.5 && model.pitch_x <= 17.5,
            "pitch_x = {}",
            model.pitch_x
        );
        assert!(
            model.rows >= 19 && model.rows <= 21,
            "rows = {}",
            model.rows
        );
        assert!(
            model.cols >= 19 && model.cols <= 21,
            "cols = {}",
            model.cols
        );
        assert!(model.confidence > 0.5, "confidence = {}", model.confidence);

        // Origin near the first bead center
        assert!(
            (model.origin_x - 14.0).abs() <= 3.0,
            "origin_x = {}",
            model.origin_x
        );
    }

    /// The model invariant: the last cell's sampling disk fits the image.
    #[test]
    fn test_model_fits_image() {
        let red = Rgb8::new(220, 40, 40);
        let data = synth_bead_board(330, 330, 20, 16.0, 10.0, |_, _| Some(red));
        let (img, gray) = view_and_gray(&data, 330, 330);

        let model = GridDetector::new().detect(&img, &gray).unwrap();
        let (last_x, last_y) = model.cell_center(model.rows - 1, model.cols - 1);
        assert!(last_x + model.pitch_x / 2.0 <= 330.0);
        assert!(last_y + model.pitch_y / 2.0 <= 330.0);
    }

    /// Featureless images fail with a diagnostic record instead of
    /// inventing dimensions.
    #[test]
    fn test_flat_image_fails_with_debug_record() {
        let data = synth_rgba(200, 200, |_, _| Rgb8::new(128, 128, 128));
        let (img, gray) = view_and_gray(&data, 200, 200);

        match GridDetector::new().detect(&img, &gray) {
            Err(DetectError::GridNotFound(debug)) => {
                assert_eq!(debug.candidate_count, 0);
            }
            Ok(model) => panic!("flat image produced a model: {model:?}"),
        }
    }

    /// Noise without lattice structure also fails.
    #[test]
    fn test_gradient_image_fails() {
        let data = synth_rgba(160, 160, |x, _| {
            let v = (x * 255 / 160) as u8;
            Rgb8::new(v, v, v)
        });
        let (img, gray) = view_and_gray(&data, 160, 160);
        assert!(GridDetector::new().detect(&img, &gray).is_err());
    }

    #[test]
    fn test_cell_center() {
        let model = GridModel {
            pitch_x: 16.0,
            pitch_y: 15.0,
            origin_x: 8.0,
            origin_y: 9.0,
            rows: 10,
            cols: 10,
            confidence: 1.0,
        };
        assert_eq!(model.cell_center(0, 0), (8.0, 9.0));
        assert_eq!(model.cell_center(2, 3), (8.0 + 48.0, 9.0 + 30.0));
    }
}
