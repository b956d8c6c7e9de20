//! Indicator-based ranking and environmental selection.
//!
//! # Overview
//!
//! Selection works in two stages:
//!
//! - **Non-dominated sorting** (`ranking`): the pool is split into fronts.
//! - **Indicator contributions**: fronts are taken whole while they fit;
//!   the first front that does not fit is cut by repeatedly removing its
//!   least contributor.
//!
//! # Indicators
//!
//! - `Hypervolume` exact: exclusive dominated volume (`hypervolume`)
//! - `Hypervolume` approximated: Monte-Carlo estimate of the same quantity
//! - `AdditiveEpsilon`: distance to the closest weakly dominating neighbour
//!   (`epsilon`)

mod epsilon;
mod hypervolume;
mod ranking;

use nalgebra::DVector;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub use epsilon::{additive_epsilon, epsilon_contributions};
pub use hypervolume::{approximate_contributions, exact_contributions, hypervolume};
pub use ranking::{dominates, non_dominated_sort};

/// Offset between the worst front member and the hypervolume reference point.
pub const REFERENCE_OFFSET: f64 = 1.0;

/// Errors raised during selection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectionError {
    /// The pool ran out of candidates before reaching the target size.
    /// Unreachable while the pool holds at least `mu` points.
    #[error("Selection is {missing} individuals short of the target size")]
    DegenerateFront { missing: usize },
}

/// Hypervolume indicator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypervolumeIndicator {
    /// Estimate contributions by sampling instead of computing them exactly.
    pub approximated: bool,
    /// Samples per front member when approximated.
    pub samples: usize,
}

impl Default for HypervolumeIndicator {
    fn default() -> Self {
        Self {
            approximated: true,
            samples: 1000,
        }
    }
}

/// Density indicator used to cut the critical front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Indicator {
    Hypervolume(HypervolumeIndicator),
    AdditiveEpsilon,
}

impl Default for Indicator {
    fn default() -> Self {
        Self::Hypervolume(HypervolumeIndicator::default())
    }
}

/// Fronts plus every point's contribution within its own front.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    /// Indices of the input values, one list per front, best front first.
    pub fronts: Vec<Vec<usize>>,
    /// Indexed like the input values.
    pub contributions: Vec<f64>,
}

/// Componentwise maximum of `front` shifted by [`REFERENCE_OFFSET`].
pub fn reference_point(front: &[&[f64]]) -> Vec<f64> {
    let m = front.first().map_or(0, |p| p.len());
    (0..m)
        .map(|k| {
            front
                .iter()
                .map(|p| p[k])
                .fold(f64::NEG_INFINITY, f64::max)
                + REFERENCE_OFFSET
        })
        .collect()
}

impl Indicator {
    /// Contribution of every member of `front`; larger is more valuable.
    pub fn contributions<R: Rng + ?Sized>(&self, front: &[&[f64]], rng: &mut R) -> Vec<f64> {
        match self {
            Indicator::Hypervolume(hv) => {
                let reference = reference_point(front);
                if hv.approximated {
                    approximate_contributions(front, &reference, hv.samples, rng)
                } else {
                    exact_contributions(front, &reference)
                }
            }
            Indicator::AdditiveEpsilon => epsilon_contributions(front),
        }
    }

    /// Sort `values` into fronts and score every front.
    pub fn rank<R: Rng + ?Sized>(&self, values: &[DVector<f64>], rng: &mut R) -> Ranking {
        let fronts = non_dominated_sort(values);
        let mut contributions = vec![0.0; values.len()];
        for front in &fronts {
            let scores = self.contributions(&slices(values, front), rng);
            for (&i, score) in front.iter().zip(scores) {
                contributions[i] = score;
            }
        }
        Ranking {
            fronts,
            contributions,
        }
    }

    /// Pick `mu` survivors from `values`.
    ///
    /// Returns pool indices in ranking order: front by front, and within a
    /// front by descending contribution (ties by ascending index).
    pub fn select<R: Rng + ?Sized>(
        &self,
        values: &[DVector<f64>],
        mu: usize,
        rng: &mut R,
    ) -> Result<Vec<usize>, SelectionError> {
        let mut survivors = Vec::with_capacity(mu);

        for front in non_dominated_sort(values) {
            if survivors.len() >= mu {
                break;
            }
            let room = mu - survivors.len();
            let mut members = front;

            while members.len() > room {
                let scores = self.contributions(&slices(values, &members), rng);
                // `members` is non-empty while it exceeds `room`.
                let (worst, _) = scores
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1.total_cmp(b.1))
                    .ok_or_else(|| SelectionError::DegenerateFront {
                        missing: members.len() - room,
                    })?;
                members.remove(worst);
            }

            let scores = self.contributions(&slices(values, &members), rng);
            let mut order: Vec<usize> = (0..members.len()).collect();
            order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
            survivors.extend(order.into_iter().map(|k| members[k]));
        }

        if survivors.len() < mu {
            return Err(SelectionError::DegenerateFront {
                missing: mu - survivors.len(),
            });
        }
        Ok(survivors)
    }
}

fn slices<'a>(values: &'a [DVector<f64>], indices: &[usize]) -> Vec<&'a [f64]> {
    indices.iter().map(|&i| values[i].as_slice()).collect()
}
