//! Box constraints for real-valued search spaces.

use nalgebra::DVector;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Axis-aligned box `[lower, upper]` in search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxConstraintHandler {
    lower: DVector<f64>,
    upper: DVector<f64>,
}

impl BoxConstraintHandler {
    /// Create a handler from per-coordinate bounds.
    ///
    /// # Panics
    /// Panics if the bound vectors differ in length.
    pub fn new(lower: DVector<f64>, upper: DVector<f64>) -> Self {
        assert_eq!(
            lower.len(),
            upper.len(),
            "lower bound length ({}) must match upper bound length ({})",
            lower.len(),
            upper.len()
        );
        Self { lower, upper }
    }

    /// The same interval in every coordinate.
    pub fn uniform(dimensions: usize, lower: f64, upper: f64) -> Self {
        Self {
            lower: DVector::from_element(dimensions, lower),
            upper: DVector::from_element(dimensions, upper),
        }
    }

    /// Replace the bounds, possibly changing the dimension.
    pub fn set_bounds(&mut self, lower: DVector<f64>, upper: DVector<f64>) {
        *self = Self::new(lower, upper);
    }

    #[inline]
    pub fn dimensions(&self) -> usize {
        self.lower.len()
    }

    #[inline]
    pub fn lower_bound(&self, i: usize) -> f64 {
        self.lower[i]
    }

    #[inline]
    pub fn upper_bound(&self, i: usize) -> f64 {
        self.upper[i]
    }

    /// Whether every bound is a finite number.
    pub fn is_bounded(&self) -> bool {
        self.lower.iter().chain(self.upper.iter()).all(|v| v.is_finite())
    }

    pub fn is_feasible(&self, point: &DVector<f64>) -> bool {
        point.len() == self.dimensions()
            && point
                .iter()
                .enumerate()
                .all(|(i, &x)| x >= self.lower[i] && x <= self.upper[i])
    }

    /// Clamp `point` onto the box in place.
    pub fn closest_feasible(&self, point: &mut DVector<f64>) {
        for (i, x) in point.iter_mut().enumerate() {
            *x = x.clamp(self.lower[i], self.upper[i]);
        }
    }

    /// Squared Euclidean distance from `point` to the box (0 when feasible).
    pub fn violation(&self, point: &DVector<f64>) -> f64 {
        point
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let d = if x < self.lower[i] {
                    self.lower[i] - x
                } else if x > self.upper[i] {
                    x - self.upper[i]
                } else {
                    0.0
                };
                d * d
            })
            .sum()
    }

    /// Draw a point uniformly from the box.
    pub fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        DVector::from_iterator(
            self.dimensions(),
            (0..self.dimensions()).map(|i| {
                let (lo, hi) = (self.lower[i], self.upper[i]);
                if hi > lo { rng.gen_range(lo..hi) } else { lo }
            }),
        )
    }
}
