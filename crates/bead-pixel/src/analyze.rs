//! Per-cell occupancy analysis
//!
//! Given a photograph and its [`GridModel`], decide for every lattice cell
//! whether it holds a bead. Cells are scored from three concentric sampling
//! regions around the cell center (radius `r = pitch / 2`):
//!
//! - center disk, radius `0.35 r`: the bead's dark hole
//! - ring, `0.45 r .. 0.9 r`: the bead's bright body
//!
//! A bead shows a bright ring around a dark hole, so the contrast
//! `ring_mean - center_mean` is positive for occupied cells. Saturation and
//! edge density add color and texture evidence. Thresholds adapt to the
//! photo via Otsu's method over the whole-cell population, and two
//! morphological passes clean up isolated decisions.

use crate::detect::GridModel;
use crate::raster::{hsv_saturation, GrayBuffer, ImageView};

/// Per-cell analysis record.
#[derive(Debug, Clone, PartialEq)]
pub struct CellAnalysis {
    /// Lattice row
    pub row: usize,
    /// Lattice column
    pub col: usize,
    /// Cell center in image coordinates
    pub center: (f32, f32),
    /// Mean grayscale of the center disk
    pub center_mean: f32,
    /// Mean grayscale of the ring
    pub ring_mean: f32,
    /// `ring_mean - center_mean`; positive for a bead
    pub contrast: f32,
    /// Mean HSV saturation over the ring (0..=255 scale)
    pub saturation: f32,
    /// Fraction of ring pixels with strong gradient
    pub edge_density: f32,
    /// Occupancy decision after post-processing
    pub occupied: bool,
    /// Decision confidence in `[0, 1]`
    pub confidence: f32,
}

/// The adaptive thresholds computed for one photo, exposed for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerThresholds {
    /// Effective contrast threshold `T_c`
    pub contrast: f32,
    /// Effective saturation threshold `T_s`
    pub saturation: f32,
}

/// Occupancy classifier over a detected lattice.
///
/// Stateless; all adaptivity comes from the per-photo feature populations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellAnalyzer;

/// Gradient magnitude above which a ring pixel counts as an edge.
const EDGE_GRADIENT: f32 = 30.0;

/// Morphological passes run after classification.
const MORPHOLOGY_PASSES: usize = 2;

impl CellAnalyzer {
    /// Create an analyzer.
    pub fn new() -> Self {
        Self
    }

    /// Analyze every cell of `model`, returning records in row-major order
    /// (`rows * cols` entries). Cells whose sampling disk does not lie fully
    /// inside the image are reported empty with zeroed features.
    pub fn analyze(
        &self,
        img: &ImageView<'_>,
        gray: &GrayBuffer,
        model: &GridModel,
    ) -> (Vec<CellAnalysis>, AnalyzerThresholds) {
        let r = (model.pitch_x + model.pitch_y) / 4.0;
        let mut cells = Vec::with_capacity(model.rows * model.cols);
        let mut in_bounds = Vec::with_capacity(model.rows * model.cols);

        for row in 0..model.rows {
            for col in 0..model.cols {
                let (cx, cy) = model.cell_center(row, col);
                let inside = cx - r >= 0.0
                    && cy - r >= 0.0
                    && cx + r <= img.width() as f32
                    && cy + r <= img.height() as f32;
                in_bounds.push(inside);

                if !inside {
                    cells.push(CellAnalysis {
                        row,
                        col,
                        center: (cx, cy),
                        center_mean: 0.0,
                        ring_mean: 0.0,
                        contrast: 0.0,
                        saturation: 0.0,
                        edge_density: 0.0,
                        occupied: false,
                        confidence: 1.0,
                    });
                    continue;
                }

                cells.push(measure_cell(img, gray, row, col, cx, cy, r));
            }
        }

        // Adaptive thresholds from the in-bounds population
        let contrasts: Vec<f32> = cells
            .iter()
            .zip(&in_bounds)
            .filter(|(_, &ok)| ok)
            .map(|(c, _)| c.contrast)
            .collect();
        let saturations: Vec<f32> = cells
            .iter()
            .zip(&in_bounds)
            .filter(|(_, &ok)| ok)
            .map(|(c, _)| c.saturation)
            .collect();

        let thresholds = AnalyzerThresholds {
            contrast: effective_threshold(&contrasts),
            saturation: effective_threshold(&saturations),
        };

        // Initial classification and score
        let mut scores = vec![0.0f32; cells.len()];
        for (i, cell) in cells.iter_mut().enumerate() {
            if !in_bounds[i] {
                continue;
            }
            let occupied = cell.contrast > thresholds.contrast
                || (cell.contrast > 0.6 * thresholds.contrast
                    && cell.saturation > 0.8 * thresholds.saturation);

            let score = occupancy_score(cell, &thresholds);
            scores[i] = score;
            cell.occupied = occupied;
            cell.confidence = if occupied { score } else { (1.0 - score).max(0.0) };
        }

        for _ in 0..MORPHOLOGY_PASSES {
            despeckle(&mut cells, model.rows, model.cols, &scores);
            hole_fill(&mut cells, model.rows, model.cols);
        }

        (cells, thresholds)
    }
}

fn measure_cell(
    img: &ImageView<'_>,
    gray: &GrayBuffer,
    row: usize,
    col: usize,
    cx: f32,
    cy: f32,
    r: f32,
) -> CellAnalysis {
    let center_mean = gray.disk_mean(cx, cy, 0.35 * r);
    let ring_mean = gray.ring_mean(cx, cy, 0.45 * r, 0.9 * r);

    let mut sat_sum = 0.0f32;
    let mut edge_count = 0usize;
    let mut ring_n = 0usize;
    gray.for_each_in_annulus(cx, cy, 0.45 * r, 0.9 * r, |x, y| {
        sat_sum += hsv_saturation(img.rgb(x, y));
        if gray.gradient_magnitude(x, y) > EDGE_GRADIENT {
            edge_count += 1;
        }
        ring_n += 1;
    });

    let (saturation, edge_density) = if ring_n == 0 {
        (0.0, 0.0)
    } else {
        (sat_sum / ring_n as f32, edge_count as f32 / ring_n as f32)
    };

    CellAnalysis {
        row,
        col,
        center: (cx, cy),
        center_mean,
        ring_mean,
        contrast: ring_mean - center_mean,
        saturation,
        edge_density,
        occupied: false,
        confidence: 0.0,
    }
}

/// Weighted evidence score for one cell against the photo's thresholds.
fn occupancy_score(cell: &CellAnalysis, thresholds: &AnalyzerThresholds) -> f32 {
    let contrast_part = if thresholds.contrast > f32::EPSILON {
        (cell.contrast / (1.5 * thresholds.contrast)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let saturation_part = if thresholds.saturation > f32::EPSILON {
        (cell.saturation / (1.5 * thresholds.saturation)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let edge_part = (8.0 * cell.edge_density).min(1.0);
    0.6 * contrast_part + 0.25 * saturation_part + 0.15 * edge_part
}

/// The effective threshold over a feature population:
/// `max(otsu, mean + 0.5 * stddev)`.
fn effective_threshold(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    otsu_threshold(values).max(mean + 0.5 * var.sqrt())
}

/// Otsu's threshold over a float population, using a 64-bin histogram
/// spanning the population range. Returns the population minimum when the
/// population is degenerate.
pub(crate) fn otsu_threshold(values: &[f32]) -> f32 {
    const BINS: usize = 64;
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if values.is_empty() || !(max > min) {
        return if min.is_finite() { min } else { 0.0 };
    }

    let scale = BINS as f32 / (max - min);
    let mut hist = [0usize; BINS];
    for &v in values {
        let bin = (((v - min) * scale) as usize).min(BINS - 1);
        hist[bin] += 1;
    }

    let total = values.len() as f64;
    let bin_value = |b: usize| min as f64 + (b as f64 + 0.5) / scale as f64;
    let total_sum: f64 = hist
        .iter()
        .enumerate()
        .map(|(b, &c)| bin_value(b) * c as f64)
        .sum();

    let mut best_bin = 0usize;
    let mut best_var = f64::NEG_INFINITY;
    let mut w0 = 0.0f64;
    let mut sum0 = 0.0f64;
    for b in 0..BINS - 1 {
        w0 += hist[b] as f64;
        sum0 += bin_value(b) * hist[b] as f64;
        let w1 = total - w0;
        if w0 == 0.0 || w1 == 0.0 {
            continue;
        }
        let mu0 = sum0 / w0;
        let mu1 = (total_sum - sum0) / w1;
        let between = w0 * w1 * (mu0 - mu1) * (mu0 - mu1);
        if between > best_var {
            best_var = between;
            best_bin = b;
        }
    }
    // Threshold at the upper edge of the chosen bin
    min + (best_bin as f32 + 1.0) / scale
}

fn idx(row: usize, col: usize, cols: usize) -> usize {
    row * cols + col
}

#[cfg(test)]
fn occupied_at(cells: &[CellAnalysis], rows: usize, cols: usize, r: isize, c: isize) -> bool {
    if r < 0 || c < 0 || r as usize >= rows || c as usize >= cols {
        return false;
    }
    cells[idx(r as usize, c as usize, cols)].occupied
}

#[cfg(test)]
fn neighbor_counts(
    cells: &[CellAnalysis],
    rows: usize,
    cols: usize,
    row: usize,
    col: usize,
) -> (usize, usize) {
    let r = row as isize;
    let c = col as isize;
    let four = [(r - 1, c), (r + 1, c), (r, c - 1), (r, c + 1)]
        .iter()
        .filter(|&&(nr, nc)| occupied_at(cells, rows, cols, nr, nc))
        .count();
    let mut eight = four;
    for (nr, nc) in [(r - 1, c - 1), (r - 1, c + 1), (r + 1, c - 1), (r + 1, c + 1)] {
        if occupied_at(cells, rows, cols, nr, nc) {
            eight += 1;
        }
    }
    (four, eight)
}

/// Remove isolated occupied cells. Decisions are computed against a
/// snapshot so a pass is order-independent.
fn despeckle(cells: &mut [CellAnalysis], rows: usize, cols: usize, scores: &[f32]) {
    let snapshot: Vec<bool> = cells.iter().map(|c| c.occupied).collect();
    let occupied_snap = |r: isize, c: isize| -> bool {
        if r < 0 || c < 0 || r as usize >= rows || c as usize >= cols {
            return false;
        }
        snapshot[idx(r as usize, c as usize, cols)]
    };

    for row in 0..rows {
        for col in 0..cols {
            let i = idx(row, col, cols);
            if !snapshot[i] {
                continue;
            }
            let r = row as isize;
            let c = col as isize;
            let four = [(r - 1, c), (r + 1, c), (r, c - 1), (r, c + 1)]
                .iter()
                .filter(|&&(nr, nc)| occupied_snap(nr, nc))
                .count();
            let mut eight = four;
            for (nr, nc) in [(r - 1, c - 1), (r - 1, c + 1), (r + 1, c - 1), (r + 1, c + 1)] {
                if occupied_snap(nr, nc) {
                    eight += 1;
                }
            }

            let isolated = four == 0 && eight <= 1;
            let weak = four <= 1 && cells[i].confidence < 0.4;
            if isolated || weak {
                cells[i].occupied = false;
                cells[i].confidence = (1.0 - scores[i]).max(0.0);
            }
        }
    }
}

/// Fill single-cell holes that have bead contrast.
fn hole_fill(cells: &mut [CellAnalysis], rows: usize, cols: usize) {
    let snapshot: Vec<bool> = cells.iter().map(|c| c.occupied).collect();

    for row in 0..rows {
        for col in 0..cols {
            let i = idx(row, col, cols);
            if snapshot[i] {
                continue;
            }
            let r = row as isize;
            let c = col as isize;
            let all_four = [(r - 1, c), (r + 1, c), (r, c - 1), (r, c + 1)]
                .iter()
                .all(|&(nr, nc)| {
                    nr >= 0
                        && nc >= 0
                        && (nr as usize) < rows
                        && (nc as usize) < cols
                        && snapshot[idx(nr as usize, nc as usize, cols)]
                });
            if all_four && cells[i].contrast > 3.0 {
                cells[i].occupied = true;
                cells[i].confidence = 0.5;
            }
        }
    }
}

/// Check the post-processing invariants; used by tests.
#[cfg(test)]
pub(crate) fn morphology_invariants_hold(cells: &[CellAnalysis], rows: usize, cols: usize) -> bool {
    for row in 0..rows {
        for col in 0..cols {
            let i = idx(row, col, cols);
            let (four, eight) = neighbor_counts(cells, rows, cols, row, col);
            if cells[i].occupied && four == 0 && eight <= 1 {
                return false;
            }
            if !cells[i].occupied && four == 4 && cells[i].contrast > 3.0 {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::GridDetector;
    use crate::raster::ImageView;
    use crate::testutil::synth_lattice;

    fn analyze_lattice(
        keep: impl Fn(usize, usize) -> bool,
    ) -> (Vec<CellAnalysis>, AnalyzerThresholds, GridModel) {
        let data = synth_lattice(400, 400, 20, 6.0, 16.0, 8.0, &keep);
        let img = ImageView::new(&data, 400, 400).unwrap();
        let gray = img.to_gray();
        let model = GridDetector::new().detect(&img, &gray).unwrap();
        let (cells, thresholds) = CellAnalyzer::new().analyze(&img, &gray, &model);
        (cells, thresholds, model)
    }

    #[test]
    fn test_otsu_bimodal_population() {
        let mut values = vec![5.0f32; 60];
        values.extend(vec![80.0f32; 40]);
        let t = otsu_threshold(&values);
        assert!(t > 5.0 && t < 80.0, "threshold {t} must separate the modes");
    }

    #[test]
    fn test_otsu_degenerate_population() {
        assert_eq!(otsu_threshold(&[7.0, 7.0, 7.0]), 7.0);
        assert_eq!(otsu_threshold(&[]), 0.0);
    }

    #[test]
    fn test_effective_threshold_uses_mean_guard() {
        // Unimodal population: otsu lands mid-range, the mean + 0.5 sigma
        // guard keeps the threshold above the bulk
        let values: Vec<f32> = (0..100).map(|i| (i % 10) as f32).collect();
        let t = effective_threshold(&values);
        let mean = values.iter().sum::<f32>() / 100.0;
        assert!(t >= mean);
    }

    /// Full lattice: every disk cell occupied, all analyses row-major.
    #[test]
    fn test_full_lattice_occupancy() {
        let (cells, _, model) = analyze_lattice(|_, _| true);
        assert_eq!(cells.len(), model.rows * model.cols);

        // Row-major ordering
        for (i, cell) in cells.iter().enumerate() {
            assert_eq!(cell.row, i / model.cols);
            assert_eq!(cell.col, i % model.cols);
        }

        // Every cell centered on a disk is occupied; cells beyond the
        // populated 20x20 area are empty
        let mut on_disk = 0;
        for cell in &cells {
            let grid_r = ((cell.center.1 - 8.0) / 16.0).round() as i64;
            let grid_c = ((cell.center.0 - 8.0) / 16.0).round() as i64;
            let is_disk_site = (0..20).contains(&grid_r)
                && (0..20).contains(&grid_c)
                && (cell.center.0 - (8.0 + grid_c as f32 * 16.0)).abs() < 2.0
                && (cell.center.1 - (8.0 + grid_r as f32 * 16.0)).abs() < 2.0;
            if is_disk_site {
                on_disk += 1;
                assert!(
                    cell.occupied,
                    "disk cell ({}, {}) not occupied (contrast {})",
                    cell.row, cell.col, cell.contrast
                );
            }
        }
        assert_eq!(on_disk, 400);
    }

    /// Every third cell blank: occupancy matches the drawn pattern exactly,
    /// and the morphological passes change nothing.
    #[test]
    fn test_partial_lattice_occupancy() {
        let keep = |r: usize, c: usize| (r + c) % 3 != 0;
        let (cells, _, model) = analyze_lattice(keep);

        let drawn: usize = (0..20)
            .flat_map(|r| (0..20).map(move |c| (r, c)))
            .filter(|&(r, c)| keep(r, c))
            .count();

        let occupied = cells.iter().filter(|c| c.occupied).count();
        assert_eq!(occupied, drawn, "occupied cells must match drawn disks");

        assert!(morphology_invariants_hold(&cells, model.rows, model.cols));
    }

    /// Occupied confidences are meaningful: strong disks well above the
    /// empty cells' scores.
    #[test]
    fn test_confidence_separation() {
        let (cells, _, _) = analyze_lattice(|r, c| (r + c) % 3 != 0);
        let occ: Vec<f32> = cells
            .iter()
            .filter(|c| c.occupied)
            .map(|c| c.confidence)
            .collect();
        let avg = occ.iter().sum::<f32>() / occ.len() as f32;
        assert!(avg > 0.4, "mean occupied confidence {avg} too low");
        for c in &cells {
            assert!((0.0..=1.0).contains(&c.confidence));
        }
    }

    /// An isolated false positive is removed by de-speckle.
    #[test]
    fn test_despeckle_removes_isolated_cell() {
        let mut cells: Vec<CellAnalysis> = (0..25)
            .map(|i| CellAnalysis {
                row: i / 5,
                col: i % 5,
                center: (0.0, 0.0),
                center_mean: 0.0,
                ring_mean: 0.0,
                contrast: 0.0,
                saturation: 0.0,
                edge_density: 0.0,
                occupied: false,
                confidence: 1.0,
            })
            .collect();
        // Lone occupied cell in the middle
        cells[12].occupied = true;
        cells[12].confidence = 0.9;
        let scores = vec![0.9f32; 25];

        despeckle(&mut cells, 5, 5, &scores);
        assert!(!cells[12].occupied, "isolated cell must be de-speckled");
    }

    /// A hole surrounded by four beads with bead contrast is filled.
    #[test]
    fn test_hole_fill() {
        let mut cells: Vec<CellAnalysis> = (0..9)
            .map(|i| CellAnalysis {
                row: i / 3,
                col: i % 3,
                center: (0.0, 0.0),
                center_mean: 0.0,
                ring_mean: 0.0,
                contrast: 50.0,
                saturation: 0.0,
                edge_density: 0.0,
                occupied: true,
                confidence: 0.8,
            })
            .collect();
        cells[4].occupied = false; // center hole, contrast 50 > 3

        hole_fill(&mut cells, 3, 3);
        assert!(cells[4].occupied);
        assert_eq!(cells[4].confidence, 0.5);

        // A hole without contrast stays empty
        cells[4].occupied = false;
        cells[4].contrast = 1.0;
        hole_fill(&mut cells, 3, 3);
        assert!(!cells[4].occupied);
    }
}
