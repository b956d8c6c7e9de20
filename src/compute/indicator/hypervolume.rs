//! Hypervolume and per-point hypervolume contributions.
//!
//! The exact variant computes the exclusive contribution of a point `p` as
//! the volume of the box `[p, r]` minus the hypervolume the other points
//! cover inside that box (each clipped to `max(q, p)`). The hypervolume
//! itself is computed by recursive slicing along the last objective.
//!
//! The approximated variant samples uniformly inside a tightened bounding
//! box of the exclusive region and counts the samples no other point
//! dominates.

use rand::Rng;

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

/// Fronts at least this large are scored on the rayon pool.
#[cfg(not(target_arch = "wasm32"))]
const PARALLEL_THRESHOLD: usize = 32;

/// Volume dominated by `points` and bounded by `reference` (minimization).
///
/// Points that do not strictly dominate the reference are ignored.
pub fn hypervolume(points: &[&[f64]], reference: &[f64]) -> f64 {
    let inside: Vec<Vec<f64>> = points
        .iter()
        .filter(|p| p.iter().zip(reference).all(|(x, r)| x < r))
        .map(|p| p.to_vec())
        .collect();
    slice_volume(inside, reference)
}

fn slice_volume(mut points: Vec<Vec<f64>>, reference: &[f64]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let d = reference.len();
    match d {
        0 => 0.0,
        1 => {
            let best = points.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
            reference[0] - best
        }
        2 => {
            points.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
            let mut volume = 0.0;
            let mut ceiling = reference[1];
            for p in &points {
                if p[1] < ceiling {
                    volume += (reference[0] - p[0]) * (ceiling - p[1]);
                    ceiling = p[1];
                }
            }
            volume
        }
        _ => {
            let last = d - 1;
            points.sort_by(|a, b| a[last].total_cmp(&b[last]));
            let mut volume = 0.0;
            for i in 0..points.len() {
                let top = points
                    .get(i + 1)
                    .map_or(reference[last], |next| next[last]);
                let depth = top - points[i][last];
                if depth > 0.0 {
                    let slice: Vec<Vec<f64>> =
                        points[..=i].iter().map(|p| p[..last].to_vec()).collect();
                    volume += depth * slice_volume(slice, &reference[..last]);
                }
            }
            volume
        }
    }
}

/// Exclusive hypervolume of `front[index]`.
fn exclusive_contribution(front: &[&[f64]], index: usize, reference: &[f64]) -> f64 {
    let p = front[index];
    let box_volume: f64 = p.iter().zip(reference).map(|(x, r)| (r - x).max(0.0)).product();
    if box_volume == 0.0 {
        return 0.0;
    }

    let clipped: Vec<Vec<f64>> = front
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != index)
        .map(|(_, q)| q.iter().zip(p).map(|(a, b)| a.max(*b)).collect::<Vec<f64>>())
        .filter(|q| q.iter().zip(reference).all(|(x, r)| x < r))
        .collect();

    (box_volume - slice_volume(clipped, reference)).max(0.0)
}

/// Exact hypervolume contribution of every front member.
///
/// Each score depends only on the fixed front, so large fronts are scored
/// in parallel without affecting the result.
#[cfg(not(target_arch = "wasm32"))]
pub fn exact_contributions(front: &[&[f64]], reference: &[f64]) -> Vec<f64> {
    if front.len() >= PARALLEL_THRESHOLD {
        (0..front.len())
            .into_par_iter()
            .map(|i| exclusive_contribution(front, i, reference))
            .collect()
    } else {
        (0..front.len())
            .map(|i| exclusive_contribution(front, i, reference))
            .collect()
    }
}

#[cfg(target_arch = "wasm32")]
pub fn exact_contributions(front: &[&[f64]], reference: &[f64]) -> Vec<f64> {
    (0..front.len())
        .map(|i| exclusive_contribution(front, i, reference))
        .collect()
}

/// Upper corner of a box containing the exclusive region of `front[index]`.
///
/// A point `q` that is no worse than `p` in every objective but `k` cuts the
/// box at `q[k]` along `k`.
fn exclusive_upper_corner(front: &[&[f64]], index: usize, reference: &[f64]) -> Vec<f64> {
    let p = front[index];
    let mut upper = reference.to_vec();
    for (j, q) in front.iter().enumerate() {
        if j == index {
            continue;
        }
        for k in 0..p.len() {
            let others_no_worse = (0..p.len()).all(|l| l == k || q[l] <= p[l]);
            if others_no_worse && q[k] < upper[k] {
                upper[k] = q[k];
            }
        }
    }
    upper
}

fn weakly_dominates(a: &[f64], b: &[f64]) -> bool {
    a.iter().zip(b).all(|(x, y)| x <= y)
}

/// Monte-Carlo estimate of every front member's contribution using
/// `samples` draws per member.
pub fn approximate_contributions<R: Rng + ?Sized>(
    front: &[&[f64]],
    reference: &[f64],
    samples: usize,
    rng: &mut R,
) -> Vec<f64> {
    let mut contributions = Vec::with_capacity(front.len());
    let mut sample = vec![0.0; reference.len()];

    for (i, p) in front.iter().enumerate() {
        let upper = exclusive_upper_corner(front, i, reference);
        let box_volume: f64 = p.iter().zip(&upper).map(|(lo, hi)| (hi - lo).max(0.0)).product();
        if box_volume == 0.0 || samples == 0 {
            contributions.push(0.0);
            continue;
        }

        let mut hits = 0usize;
        for _ in 0..samples {
            for (k, x) in sample.iter_mut().enumerate() {
                *x = p[k] + (upper[k] - p[k]) * rng.r#gen::<f64>();
            }
            let covered = front
                .iter()
                .enumerate()
                .any(|(j, q)| j != i && weakly_dominates(q, &sample));
            if !covered {
                hits += 1;
            }
        }
        contributions.push(box_volume * hits as f64 / samples as f64);
    }

    contributions
}
