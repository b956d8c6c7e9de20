//! Result types handed back after every generation.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// A search point together with its objective vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionPoint {
    /// Point in search space.
    pub point: DVector<f64>,
    /// Objective vector (minimized).
    pub value: DVector<f64>,
}

/// Current population in ranking order: front by front, and within a front
/// by descending indicator contribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolutionSet {
    /// One entry per population member.
    pub solutions: Vec<SolutionPoint>,
}

impl SolutionSet {
    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SolutionPoint> {
        self.solutions.iter()
    }

    /// Get a solution by rank.
    pub fn at(&self, index: usize) -> Option<&SolutionPoint> {
        self.solutions.get(index)
    }

    /// Largest per-component difference between two sets of equal size.
    ///
    /// Returns `None` if the sets differ in length or in vector dimensions.
    pub fn max_abs_difference(&self, other: &SolutionSet) -> Option<f64> {
        if self.len() != other.len() {
            return None;
        }
        let mut max = 0.0f64;
        for (a, b) in self.solutions.iter().zip(&other.solutions) {
            if a.point.len() != b.point.len() || a.value.len() != b.value.len() {
                return None;
            }
            for (x, y) in a.point.iter().zip(b.point.iter()) {
                max = max.max((x - y).abs());
            }
            for (x, y) in a.value.iter().zip(b.value.iter()) {
                max = max.max((x - y).abs());
            }
        }
        Some(max)
    }
}

impl<'a> IntoIterator for &'a SolutionSet {
    type Item = &'a SolutionPoint;
    type IntoIter = std::slice::Iter<'a, SolutionPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.solutions.iter()
    }
}
