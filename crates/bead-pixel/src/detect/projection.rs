//! Projection-autocorrelation fallback
//!
//! When the candidate cloud is too sparse (printed patterns, monochrome
//! boards, heavy blur), the lattice period still shows up in the row and
//! column projections of the grayscale image. Autocorrelation of the
//! mean-subtracted projections recovers the pitch per axis; the origin is
//! found by an exhaustive phase scan.

use super::GridModel;
use crate::raster::GrayBuffer;

/// Origin scan step in pixels.
const ORIGIN_STEP: usize = 2;

/// Minimum autocorrelation peak height relative to the zero-lag value.
const PEAK_FLOOR: f64 = 0.1;

/// Estimate the lattice from projections.
///
/// On failure returns the pitch values that were considered and rejected,
/// for the caller's diagnostic record.
pub(super) fn model_from_projections(
    gray: &GrayBuffer,
    pitch_range: (f32, f32),
) -> Result<GridModel, Vec<f32>> {
    let cols_signal = projection(gray, true);
    let rows_signal = projection(gray, false);

    let mut rejected = Vec::new();
    let pitch_x = match pitch_from_signal(&cols_signal, pitch_range) {
        Ok(p) => p,
        Err(tried) => {
            rejected.extend(tried);
            return Err(rejected);
        }
    };
    let pitch_y = match pitch_from_signal(&rows_signal, pitch_range) {
        Ok(p) => p,
        Err(tried) => {
            rejected.extend(tried);
            rejected.push(pitch_x);
            return Err(rejected);
        }
    };

    let cols = (gray.width() as f32 / pitch_x).floor() as usize;
    let rows = (gray.height() as f32 / pitch_y).floor() as usize;
    if rows == 0 || cols == 0 {
        return Err(vec![pitch_x, pitch_y]);
    }

    let (origin_x, origin_y) = best_origin(gray, pitch_x, pitch_y, rows, cols);

    Ok(GridModel {
        pitch_x,
        pitch_y,
        origin_x,
        origin_y,
        rows,
        cols,
        confidence: 0.5,
    })
}

/// Mean-subtracted column (or row) sums of the grayscale image.
fn projection(gray: &GrayBuffer, columns: bool) -> Vec<f64> {
    let n = if columns { gray.width() } else { gray.height() };
    let m = if columns { gray.height() } else { gray.width() };

    let mut sums = vec![0.0f64; n];
    for i in 0..n {
        for j in 0..m {
            let v = if columns {
                gray.get(i, j)
            } else {
                gray.get(j, i)
            };
            sums[i] += v as f64;
        }
    }
    let mean = sums.iter().sum::<f64>() / n as f64;
    for s in &mut sums {
        *s -= mean;
    }
    sums
}

/// Autocorrelation of `signal` for lags `0..=max_lag`.
fn autocorrelation(signal: &[f64], max_lag: usize) -> Vec<f64> {
    let max_lag = max_lag.min(signal.len().saturating_sub(1));
    (0..=max_lag)
        .map(|lag| {
            signal[..signal.len() - lag]
                .iter()
                .zip(&signal[lag..])
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

/// Pitch of one axis from its projection signal.
///
/// Preferred: the first autocorrelation local maximum whose lag is inside
/// the pitch range and whose height clears [`PEAK_FLOOR`] of the zero-lag
/// value. Otherwise: the signal's first turnaround, i.e. the first local
/// maximum after the first trough, still required to lie inside the range.
fn pitch_from_signal(signal: &[f64], pitch_range: (f32, f32)) -> Result<f32, Vec<f32>> {
    let max_lag = (2.0 * pitch_range.1) as usize;
    let ac = autocorrelation(signal, max_lag);
    if ac.len() < 3 || ac[0] <= 0.0 {
        return Err(Vec::new());
    }

    let mut tried = Vec::new();
    let in_range = |lag: usize| lag as f32 >= pitch_range.0 && lag as f32 <= pitch_range.1;

    for lag in 1..ac.len() - 1 {
        if ac[lag] >= ac[lag - 1] && ac[lag] >= ac[lag + 1] && in_range(lag) {
            if ac[lag] > PEAK_FLOOR * ac[0] {
                return Ok(lag as f32);
            }
            tried.push(lag as f32);
        }
    }

    // No peak above the floor: take the first local maximum after the
    // first trough.
    let trough = (1..ac.len() - 1).find(|&l| ac[l] <= ac[l - 1] && ac[l] <= ac[l + 1]);
    if let Some(t) = trough {
        for lag in (t + 1)..ac.len() - 1 {
            if ac[lag] >= ac[lag - 1] && ac[lag] >= ac[lag + 1] {
                if in_range(lag) {
                    return Ok(lag as f32);
                }
                tried.push(lag as f32);
                break;
            }
        }
    }
    Err(tried)
}

/// Exhaustive phase scan: the offset pair whose induced cell centers
/// maximize the summed absolute ring contrast.
fn best_origin(
    gray: &GrayBuffer,
    pitch_x: f32,
    pitch_y: f32,
    rows: usize,
    cols: usize,
) -> (f32, f32) {
    let r = (pitch_x + pitch_y) / 4.0;
    let center_r = 0.35 * r;
    let ring_inner = 0.45 * r;
    let ring_outer = 0.9 * r;

    let mut best = (0.0f32, 0.0f32);
    let mut best_score = f64::NEG_INFINITY;

    let mut oy = 0usize;
    while (oy as f32) < pitch_y {
        let mut ox = 0usize;
        while (ox as f32) < pitch_x {
            let mut score = 0.0f64;
            for row in 0..rows {
                for col in 0..cols {
                    let cx = ox as f32 + col as f32 * pitch_x;
                    let cy = oy as f32 + row as f32 * pitch_y;
                    if cx - ring_outer < 0.0
                        || cy - ring_outer < 0.0
                        || cx + ring_outer > gray.width() as f32
                        || cy + ring_outer > gray.height() as f32
                    {
                        continue;
                    }
                    let contrast =
                        gray.ring_mean(cx, cy, ring_inner, ring_outer) - gray.disk_mean(cx, cy, center_r);
                    score += contrast.abs() as f64;
                }
            }
            if score > best_score {
                best_score = score;
                best = (ox as f32, oy as f32);
            }
            ox += ORIGIN_STEP;
        }
        oy += ORIGIN_STEP;
    }
    best
}
