//! Candidate-cloud lattice estimation
//!
//! Three independent detectors propose bead centers; the union is
//! non-maximum-suppressed and the lattice (pitch, bounds, origin) is
//! estimated from the surviving cloud. All three detectors key on the bead
//! signature: a bright ring around a dark hole. Solid blobs without that
//! signature produce no candidates, which routes plain printed patterns to
//! the projection fallback.

use super::GridModel;
use crate::raster::{hsv_saturation, GrayBuffer, ImageView};

/// A probable bead center in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub x: f32,
    pub y: f32,
}

/// Internal candidate with its detector score, used for suppression order.
#[derive(Debug, Clone, Copy)]
struct Scored {
    x: f32,
    y: f32,
    weight: f32,
}

/// Non-maximum suppression radius over the unioned candidates.
const NMS_RADIUS: f32 = 8.0;

/// Minimum ring-minus-center contrast of a bead signature.
const BEAD_CONTRAST: f32 = 15.0;

/// Maximum grayscale standard deviation inside the ring. A bead ring is a
/// single color; a window straddling a blob edge is bimodal and noisy.
const RING_STD_MAX: f32 = 45.0;

/// Circle detector presets: (minimum peak distance, accumulator threshold).
const CIRCLE_PRESETS: [(f32, u32); 3] = [(15.0, 25), (12.0, 20), (18.0, 30)];

/// Candidate bead radius range for the circle detector.
const RADIUS_RANGE: (usize, usize) = (5, 25);

/// Gather candidate bead centers from all three detectors and suppress
/// duplicates within [`NMS_RADIUS`].
///
/// Detector order matters for suppression: circle-detector peaks are the
/// most precisely localized and are kept preferentially, then ring-contrast
/// hits, then saturation hits.
pub(super) fn collect(img: &ImageView<'_>, gray: &GrayBuffer) -> Vec<Candidate> {
    let mut ordered = circle_candidates(gray);
    ordered.extend(ring_contrast_candidates(gray));
    ordered.extend(saturation_candidates(img, gray));

    let mut kept: Vec<Candidate> = Vec::new();
    for c in ordered {
        let suppressed = kept
            .iter()
            .any(|k| (k.x - c.x).hypot(k.y - c.y) < NMS_RADIUS);
        if !suppressed {
            kept.push(Candidate { x: c.x, y: c.y });
        }
    }
    kept
}

/// True when `(cx, cy)` looks like a bead center on the grayscale raster:
/// the ring is brighter than the hole and reasonably uniform.
fn bead_signature(gray: &GrayBuffer, cx: f32, cy: f32) -> bool {
    let center = gray.disk_mean(cx, cy, 2.4);
    let (ring_mean, ring_std) = ring_stats(gray, cx, cy, 2.4, 4.8);
    ring_mean - center > BEAD_CONTRAST && ring_std < RING_STD_MAX
}

/// Refine a candidate to the local ring-contrast peak.
///
/// Sliding-window detectors localize no better than their step; the pitch
/// estimate needs candidates at true bead centers. An integer search within
/// +-4 px relocates the point to where the hole/ring contrast peaks, which
/// for a bead is its center. Ties resolve in scan order.
fn refine_candidate(gray: &GrayBuffer, x: f32, y: f32) -> (f32, f32) {
    let mut best = (x, y);
    let mut best_contrast = f32::NEG_INFINITY;
    for dy in -4i32..=4 {
        for dx in -4i32..=4 {
            let cx = x + dx as f32;
            let cy = y + dy as f32;
            if cx < 0.0 || cy < 0.0 || cx >= gray.width() as f32 || cy >= gray.height() as f32 {
                continue;
            }
            let contrast = gray.ring_mean(cx, cy, 2.4, 4.8) - gray.disk_mean(cx, cy, 2.4);
            if contrast > best_contrast {
                best_contrast = contrast;
                best = (cx, cy);
            }
        }
    }
    best
}

fn ring_stats(gray: &GrayBuffer, cx: f32, cy: f32, r_inner: f32, r_outer: f32) -> (f32, f32) {
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut n = 0usize;
    gray.for_each_in_annulus(cx, cy, r_inner, r_outer, |x, y| {
        let v = gray.get(x, y) as f64;
        sum += v;
        sum_sq += v * v;
        n += 1;
    });
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / n as f64;
    let var = (sum_sq / n as f64 - mean * mean).max(0.0);
    (mean as f32, var.sqrt() as f32)
}

/// Gradient-vote circle detector ("Hough-like").
///
/// Edge pixels vote along both gradient directions at every radius in
/// [`RADIUS_RANGE`]; the accumulator peaks at circle centers. Each preset
/// extracts peaks at its own threshold and spacing; peaks must pass the
/// bead-signature check.
fn circle_candidates(gray: &GrayBuffer) -> Vec<Scored> {
    let w = gray.width();
    let h = gray.height();
    let mut acc = vec![0u32; w * h];

    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let gx = (gray.get(x + 1, y) - gray.get(x - 1, y)) / 2.0;
            let gy = (gray.get(x, y + 1) - gray.get(x, y - 1)) / 2.0;
            let mag = (gx * gx + gy * gy).sqrt();
            if mag < 20.0 {
                continue;
            }
            let ux = gx / mag;
            let uy = gy / mag;
            for r in RADIUS_RANGE.0..=RADIUS_RANGE.1 {
                let rf = r as f32;
                for dir in [1.0f32, -1.0] {
                    let vx = (x as f32 + dir * ux * rf).round();
                    let vy = (y as f32 + dir * uy * rf).round();
                    if vx >= 0.0 && vy >= 0.0 && (vx as usize) < w && (vy as usize) < h {
                        acc[vy as usize * w + vx as usize] += 1;
                    }
                }
            }
        }
    }

    let mut peaks: Vec<Scored> = Vec::new();
    for (min_dist, threshold) in CIRCLE_PRESETS {
        // Cells over threshold, strongest first; ties resolve in scan order
        let mut cells: Vec<(u32, usize, usize)> = Vec::new();
        for y in 0..h {
            for x in 0..w {
                let v = acc[y * w + x];
                if v >= threshold {
                    cells.push((v, y, x));
                }
            }
        }
        cells.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

        let mut kept: Vec<(f32, f32)> = Vec::new();
        for (v, y, x) in cells {
            let (fx, fy) = (x as f32, y as f32);
            if kept
                .iter()
                .any(|&(kx, ky)| (kx - fx).hypot(ky - fy) < min_dist)
            {
                continue;
            }
            kept.push((fx, fy));
            if bead_signature(gray, fx, fy) {
                let (rx, ry) = refine_candidate(gray, fx, fy);
                peaks.push(Scored {
                    x: rx,
                    y: ry,
                    weight: v as f32,
                });
            }
        }
    }

    peaks.sort_by(|a, b| {
        b.weight
            .total_cmp(&a.weight)
            .then(a.y.total_cmp(&b.y))
            .then(a.x.total_cmp(&b.x))
    });
    peaks
}

/// Ring-contrast sliding window: a 12 px window stepped by 6 px, emitting
/// positions where the ring (40%..80% of the half-window) is more than
/// [`BEAD_CONTRAST`] brighter than the center disk.
fn ring_contrast_candidates(gray: &GrayBuffer) -> Vec<Scored> {
    const WINDOW: usize = 12;
    const STEP: usize = 6;
    let half = (WINDOW / 2) as f32;

    let mut out = Vec::new();
    let mut cy = half as usize;
    while cy + WINDOW / 2 <= gray.height() {
        let mut cx = half as usize;
        while cx + WINDOW / 2 <= gray.width() {
            let (fx, fy) = (cx as f32, cy as f32);
            let center = gray.disk_mean(fx, fy, half * 0.4);
            let (ring_mean, ring_std) = ring_stats(gray, fx, fy, half * 0.4, half * 0.8);
            let contrast = ring_mean - center;
            if contrast > BEAD_CONTRAST && ring_std < RING_STD_MAX {
                let (rx, ry) = refine_candidate(gray, fx, fy);
                out.push(Scored {
                    x: rx,
                    y: ry,
                    weight: contrast,
                });
            }
            cx += STEP;
        }
        cy += STEP;
    }

    out.sort_by(|a, b| {
        b.weight
            .total_cmp(&a.weight)
            .then(a.y.total_cmp(&b.y))
            .then(a.x.total_cmp(&b.x))
    });
    out
}

/// Saturation sliding window: a 10 px window stepped by 8 px, emitting
/// positions whose 7x7 neighborhood mean HSV saturation exceeds 50.
fn saturation_candidates(img: &ImageView<'_>, gray: &GrayBuffer) -> Vec<Scored> {
    const WINDOW: usize = 10;
    const STEP: usize = 8;

    let mut out = Vec::new();
    let mut cy = WINDOW / 2;
    while cy + WINDOW / 2 <= img.height() {
        let mut cx = WINDOW / 2;
        while cx + WINDOW / 2 <= img.width() {
            let mut sum = 0.0f32;
            let mut n = 0usize;
            for dy in -3i32..=3 {
                for dx in -3i32..=3 {
                    let x = cx as i32 + dx;
                    let y = cy as i32 + dy;
                    if x >= 0 && y >= 0 && (x as usize) < img.width() && (y as usize) < img.height()
                    {
                        sum += hsv_saturation(img.rgb(x as usize, y as usize));
                        n += 1;
                    }
                }
            }
            let mean_s = if n == 0 { 0.0 } else { sum / n as f32 };
            if mean_s > 50.0 {
                let (rx, ry) = refine_candidate(gray, cx as f32, cy as f32);
                out.push(Scored {
                    x: rx,
                    y: ry,
                    weight: mean_s,
                });
            }
            cx += STEP;
        }
        cy += STEP;
    }

    out.sort_by(|a, b| {
        b.weight
            .total_cmp(&a.weight)
            .then(a.y.total_cmp(&b.y))
            .then(a.x.total_cmp(&b.x))
    });
    out
}

/// Estimate the lattice from the suppressed candidate cloud.
///
/// On failure returns the rejected pitch estimate (if one was computed) for
/// the caller's diagnostic record.
pub(super) fn model_from_cloud(
    candidates: &[Candidate],
    pitch_range: (f32, f32),
) -> Result<GridModel, Option<f32>> {
    if candidates.len() < 2 {
        return Err(None);
    }

    // Pitch: median nearest-neighbor distance, clamped
    let mut nn: Vec<f32> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            candidates
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, o)| (c.x - o.x).hypot(c.y - o.y))
                .fold(f32::INFINITY, f32::min)
        })
        .collect();
    nn.sort_by(f32::total_cmp);
    let pitch = nn[nn.len() / 2].clamp(pitch_range.0, pitch_range.1);

    // Active bounds: drop sparse outliers, take the 3rd..97th percentile
    // envelope, inflate by 0.3 pitch
    let neighbor_radius = 1.8 * pitch;
    let survivors: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| {
            let neighbors = candidates
                .iter()
                .filter(|o| {
                    let d = (c.x - o.x).hypot(c.y - o.y);
                    d > 0.0 && d <= neighbor_radius
                })
                .count();
            neighbors >= 3
        })
        .collect();
    if survivors.is_empty() {
        return Err(Some(pitch));
    }

    let mut xs: Vec<f32> = survivors.iter().map(|c| c.x).collect();
    let mut ys: Vec<f32> = survivors.iter().map(|c| c.y).collect();
    xs.sort_by(f32::total_cmp);
    ys.sort_by(f32::total_cmp);

    let inflate = 0.3 * pitch;
    let min_x = percentile(&xs, 0.03) - inflate;
    let max_x = percentile(&xs, 0.97) + inflate;
    let min_y = percentile(&ys, 0.03) - inflate;
    let max_y = percentile(&ys, 0.97) + inflate;

    // Origin: the surviving candidate nearest the top-left bound corner
    let Some(origin) = survivors.iter().min_by(|a, b| {
        let da = (a.x - min_x).abs() + (a.y - min_y).abs();
        let db = (b.x - min_x).abs() + (b.y - min_y).abs();
        da.total_cmp(&db)
            .then(a.y.total_cmp(&b.y))
            .then(a.x.total_cmp(&b.x))
    }) else {
        return Err(Some(pitch));
    };

    let rows = ((max_y - origin.y) / pitch).round() as usize + 1;
    let cols = ((max_x - origin.x) / pitch).round() as usize + 1;

    let confidence = (survivors.len() as f32 / (0.5 * rows as f32 * cols as f32)).min(1.0);

    Ok(GridModel {
        pitch_x: pitch,
        pitch_y: pitch,
        origin_x: origin.x,
        origin_y: origin.y,
        rows,
        cols,
        confidence,
    })
}

/// Nearest-rank percentile over a sorted slice.
fn percentile(sorted: &[f32], q: f32) -> f32 {
    let idx = ((sorted.len() - 1) as f32 * q).round() as usize;
    sorted[idx]
}
