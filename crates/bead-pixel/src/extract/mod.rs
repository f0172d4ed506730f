//! Dominant bead color extraction
//!
//! For each occupied cell, gather the color samples on the bead body (an
//! annulus around the cell center, skipping the dark hole), cluster them in
//! linear RGB, and take the centroid of the largest cluster as the bead
//! color. Clustering beats plain averaging here: the ring samples include
//! shadow pixels and neighboring-bead bleed that an average would smear in.

mod kmeans;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::color::{Lab, LinearRgb, Rgb8};
use crate::palette::{match_confidence, Palette, PaletteError, PaletteId};
use crate::raster::{for_each_in_annulus, ImageView};

/// The extracted and palette-matched color of one occupied cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedColor {
    /// Dominant sRGB color of the bead body
    pub rgb: Rgb8,
    /// Nearest palette entry
    pub id: PaletteId,
    /// Match confidence in `[0, 1]`; zero when extraction degraded to
    /// neutral gray
    pub confidence: f32,
}

/// Sampling annulus of the bead body, as fractions of the cell radius.
const RING_INNER: f32 = 0.4;
const RING_OUTER: f32 = 0.95;

/// Neutral color reported when a cell yields no usable samples.
const NEUTRAL_GRAY: Rgb8 = Rgb8::new(128, 128, 128);

/// K-means configuration of the extractor.
const KMEANS_K: usize = 3;
const KMEANS_MAX_ITER: usize = 50;
const KMEANS_EPSILON: f32 = 0.001;
const KMEANS_RESTARTS: usize = 3;
const KMEANS_REPEATS: usize = 5;

/// Extracts the dominant color of occupied cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorExtractor;

impl ColorExtractor {
    /// Create an extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract the dominant color around `(cx, cy)` with cell radius `r`
    /// and match it to `palette`.
    ///
    /// `seed` fixes the clustering RNG; the pipeline derives it from the
    /// cell index so recognition is reproducible run to run.
    ///
    /// Degraded cells (no samples, failed clustering) report
    /// [`NEUTRAL_GRAY`] with zero confidence and the palette entry nearest
    /// to that gray; they never fail the call.
    ///
    /// # Errors
    ///
    /// [`PaletteError::EmptyPalette`] when the palette has no entries.
    pub fn extract(
        &self,
        img: &ImageView<'_>,
        cx: f32,
        cy: f32,
        r: f32,
        palette: &Palette,
        seed: u64,
    ) -> Result<ExtractedColor, PaletteError> {
        let mut samples = ring_samples(img, cx, cy, RING_INNER * r, RING_OUTER * r);
        if samples.is_empty() {
            samples = square_samples(img, cx, cy, r);
        }
        if samples.is_empty() {
            return neutral(palette);
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut best: Option<kmeans::KmeansOutcome> = None;
        for _ in 0..KMEANS_REPEATS {
            let outcome = kmeans::cluster(
                &samples,
                KMEANS_K,
                KMEANS_MAX_ITER,
                KMEANS_EPSILON,
                KMEANS_RESTARTS,
                &mut rng,
            );
            if let Some(o) = outcome {
                let better = match &best {
                    None => true,
                    Some(b) => o.largest_size > b.largest_size,
                };
                if better {
                    best = Some(o);
                }
            }
        }

        let Some(outcome) = best else {
            return neutral(palette);
        };

        let linear = LinearRgb::new(
            outcome.largest_center[0].clamp(0.0, 1.0),
            outcome.largest_center[1].clamp(0.0, 1.0),
            outcome.largest_center[2].clamp(0.0, 1.0),
        );
        let rgb = Rgb8::from(linear);
        let (entry, delta_e) = palette.nearest(Lab::from(rgb))?;
        Ok(ExtractedColor {
            rgb,
            id: entry.id.clone(),
            confidence: match_confidence(delta_e),
        })
    }
}

fn neutral(palette: &Palette) -> Result<ExtractedColor, PaletteError> {
    let (entry, _) = palette.nearest(Lab::from(NEUTRAL_GRAY))?;
    Ok(ExtractedColor {
        rgb: NEUTRAL_GRAY,
        id: entry.id.clone(),
        confidence: 0.0,
    })
}

/// Linear-RGB samples of the annulus around `(cx, cy)`.
fn ring_samples(
    img: &ImageView<'_>,
    cx: f32,
    cy: f32,
    r_inner: f32,
    r_outer: f32,
) -> Vec<[f32; 3]> {
    let mut samples = Vec::new();
    for_each_in_annulus(
        img.width(),
        img.height(),
        cx,
        cy,
        r_inner,
        r_outer,
        &mut |x, y| {
            samples.push(LinearRgb::from(img.rgb(x, y)).to_array());
        },
    );
    samples
}

/// Fallback: the full bounding square of the cell, clipped to the image.
fn square_samples(img: &ImageView<'_>, cx: f32, cy: f32, r: f32) -> Vec<[f32; 3]> {
    let x0 = (cx - r).floor().max(0.0) as usize;
    let y0 = (cy - r).floor().max(0.0) as usize;
    let x1 = ((cx + r).ceil().max(0.0) as usize).min(img.width());
    let y1 = ((cy + r).ceil().max(0.0) as usize).min(img.height());
    if (cx + r) < 0.0 || (cy + r) < 0.0 {
        return Vec::new();
    }

    let mut samples = Vec::new();
    for y in y0..y1 {
        for x in x0..x1 {
            samples.push(LinearRgb::from(img.rgb(x, y)).to_array());
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{synth_bead_board, synth_rgba};

    fn test_palette() -> Palette {
        Palette::from_hex([
            ("Test", "Red", "#DC2828"),
            ("Test", "Green", "#28B428"),
            ("Test", "Blue", "#2828DC"),
            ("Test", "Gray", "#808080"),
        ])
        .unwrap()
    }

    #[test]
    fn test_extract_uniform_bead() {
        let red = Rgb8::new(220, 40, 40);
        let data = synth_bead_board(64, 64, 1, 32.0, 32.0, |_, _| Some(red));
        let img = ImageView::new(&data, 64, 64).unwrap();

        let got = ColorExtractor::new()
            .extract(&img, 32.0, 32.0, 14.0, &test_palette(), 0)
            .unwrap();

        assert_eq!(got.id.name, "Red");
        assert!(got.confidence > 0.8, "confidence = {}", got.confidence);
        // Dominant sample close to the bead color
        assert!((got.rgb.r as i32 - 220).abs() < 12, "rgb = {:?}", got.rgb);
    }

    #[test]
    fn test_extract_ignores_minority_contamination() {
        // Bead body green, with a dark shadow wedge covering a minority of
        // the ring; clustering must report green, not a muddy average.
        let data = synth_rgba(64, 64, |x, y| {
            let dx = x as f32 - 32.0;
            let dy = y as f32 - 32.0;
            let d = (dx * dx + dy * dy).sqrt();
            if d < 5.0 {
                Rgb8::new(40, 40, 40) // hole
            } else if d <= 14.0 && dx < -8.0 {
                Rgb8::new(20, 30, 20) // shadow
            } else if d <= 14.0 {
                Rgb8::new(40, 180, 40) // bead
            } else {
                Rgb8::new(120, 120, 120)
            }
        });
        let img = ImageView::new(&data, 64, 64).unwrap();

        let got = ColorExtractor::new()
            .extract(&img, 32.0, 32.0, 14.0, &test_palette(), 5)
            .unwrap();
        assert_eq!(got.id.name, "Green");
        assert!(got.rgb.g > 120, "dominant color too dark: {:?}", got.rgb);
    }

    #[test]
    fn test_extract_deterministic_per_seed() {
        let data = synth_rgba(48, 48, |x, y| {
            Rgb8::new((x * 5 % 256) as u8, (y * 3 % 256) as u8, 90)
        });
        let img = ImageView::new(&data, 48, 48).unwrap();
        let palette = test_palette();

        let a = ColorExtractor::new()
            .extract(&img, 24.0, 24.0, 10.0, &palette, 77)
            .unwrap();
        let b = ColorExtractor::new()
            .extract(&img, 24.0, 24.0, 10.0, &palette, 77)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_extract_off_image_degrades_to_gray() {
        let data = synth_rgba(16, 16, |_, _| Rgb8::new(255, 0, 0));
        let img = ImageView::new(&data, 16, 16).unwrap();

        let got = ColorExtractor::new()
            .extract(&img, -100.0, -100.0, 5.0, &test_palette(), 0)
            .unwrap();
        assert_eq!(got.rgb, NEUTRAL_GRAY);
        assert_eq!(got.confidence, 0.0);
        assert_eq!(got.id.name, "Gray");
    }

    #[test]
    fn test_extract_empty_palette_fails() {
        let data = synth_rgba(16, 16, |_, _| Rgb8::new(255, 0, 0));
        let img = ImageView::new(&data, 16, 16).unwrap();
        let empty = Palette::new(std::iter::empty()).unwrap();

        let result = ColorExtractor::new().extract(&img, 8.0, 8.0, 5.0, &empty, 0);
        assert!(matches!(result, Err(PaletteError::EmptyPalette)));
    }

    #[test]
    fn test_tiny_ring_falls_back_to_square() {
        // Radius so small the annulus contains no pixel centers, but the
        // bounding square does
        let data = synth_rgba(8, 8, |_, _| Rgb8::new(40, 180, 40));
        let img = ImageView::new(&data, 8, 8).unwrap();

        let got = ColorExtractor::new()
            .extract(&img, 4.3, 4.3, 0.3, &test_palette(), 0)
            .unwrap();
        assert_eq!(got.id.name, "Green");
        assert!(got.confidence > 0.0);
    }
}
