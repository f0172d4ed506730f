//! Seeded K-means over 3D color samples
//!
//! Small-k Lloyd iteration with K-means++ initialization and restarts.
//! All randomness comes from the caller's seeded RNG so extraction is
//! deterministic for a given seed.

use rand::rngs::StdRng;
use rand::Rng;

/// Result of one clustering run.
#[derive(Debug, Clone)]
pub(crate) struct KmeansOutcome {
    /// Centroid of the most populated cluster
    pub largest_center: [f32; 3],
    /// Sample count of that cluster
    pub largest_size: usize,
    /// Total within-cluster squared distance
    pub inertia: f64,
}

/// Cluster `samples` into `k` groups, keeping the best of `restarts`
/// restarts by inertia. Returns `None` for an empty sample set.
pub(crate) fn cluster(
    samples: &[[f32; 3]],
    k: usize,
    max_iter: usize,
    epsilon: f32,
    restarts: usize,
    rng: &mut StdRng,
) -> Option<KmeansOutcome> {
    if samples.is_empty() || k == 0 {
        return None;
    }
    let k = k.min(samples.len());

    let mut best: Option<KmeansOutcome> = None;
    for _ in 0..restarts.max(1) {
        let outcome = lloyd(samples, k, max_iter, epsilon, rng);
        let better = match &best {
            None => true,
            Some(b) => outcome.inertia < b.inertia,
        };
        if better {
            best = Some(outcome);
        }
    }
    best
}

fn lloyd(
    samples: &[[f32; 3]],
    k: usize,
    max_iter: usize,
    epsilon: f32,
    rng: &mut StdRng,
) -> KmeansOutcome {
    let mut centers = plus_plus_init(samples, k, rng);
    let mut assignment = vec![0usize; samples.len()];

    for _ in 0..max_iter {
        // Assignment step
        for (i, s) in samples.iter().enumerate() {
            assignment[i] = nearest_center(&centers, s).0;
        }

        // Update step; empty clusters keep their center
        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (i, s) in samples.iter().enumerate() {
            let c = assignment[i];
            counts[c] += 1;
            for d in 0..3 {
                sums[c][d] += s[d] as f64;
            }
        }

        let mut movement = 0.0f32;
        for c in 0..k {
            if counts[c] == 0 {
                continue;
            }
            let new_center = [
                (sums[c][0] / counts[c] as f64) as f32,
                (sums[c][1] / counts[c] as f64) as f32,
                (sums[c][2] / counts[c] as f64) as f32,
            ];
            movement = movement.max(dist_sq(&centers[c], &new_center).sqrt());
            centers[c] = new_center;
        }

        if movement < epsilon {
            break;
        }
    }

    // Final assignment for sizes and inertia
    let mut counts = vec![0usize; k];
    let mut inertia = 0.0f64;
    for s in samples {
        let (c, d) = nearest_center(&centers, s);
        counts[c] += 1;
        inertia += d as f64;
    }
    let largest = counts
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
        .map(|(c, _)| c)
        .unwrap_or(0);

    KmeansOutcome {
        largest_center: centers[largest],
        largest_size: counts[largest],
        inertia,
    }
}

/// K-means++ seeding: subsequent centers are drawn with probability
/// proportional to their squared distance from the chosen set. A fully
/// degenerate sample set (all identical) falls back to sequential picks.
fn plus_plus_init(samples: &[[f32; 3]], k: usize, rng: &mut StdRng) -> Vec<[f32; 3]> {
    let n = samples.len();
    let mut centers = Vec::with_capacity(k);
    let first = rng.gen_range(0..n);
    centers.push(samples[first]);

    let mut min_dists: Vec<f32> = samples
        .iter()
        .map(|s| dist_sq(s, &centers[0]))
        .collect();

    while centers.len() < k {
        let total: f64 = min_dists.iter().map(|&d| d as f64).sum();
        let next = if total <= f64::EPSILON {
            // All samples coincide with a center; spread deterministically
            (first + centers.len()) % n
        } else {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = n - 1;
            for (i, &d) in min_dists.iter().enumerate() {
                target -= d as f64;
                if target <= 0.0 {
                    chosen = i;
                    break;
                }
            }
            chosen
        };
        centers.push(samples[next]);
        for (i, s) in samples.iter().enumerate() {
            let d = dist_sq(s, &centers[centers.len() - 1]);
            if d < min_dists[i] {
                min_dists[i] = d;
            }
        }
    }
    centers
}

#[inline]
fn nearest_center(centers: &[[f32; 3]], s: &[f32; 3]) -> (usize, f32) {
    let mut best = (0usize, f32::MAX);
    for (i, c) in centers.iter().enumerate() {
        let d = dist_sq(c, s);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

#[inline]
fn dist_sq(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}
