//! LZ8 benchmark (Li & Zhang, 2009): two objectives, complicated Pareto set.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::DVector;

use super::{BoxConstraintHandler, MultiObjectiveFunction};

/// LZ8 on `[0, 1]^n`. The Pareto set is the curve
/// `x_j = x_1^(0.5 (1 + 3 (j - 2) / (n - 2)))`, the front is `f_2 = 1 - sqrt(f_1)`.
#[derive(Debug)]
pub struct Lz8 {
    handler: BoxConstraintHandler,
    evaluations: AtomicU64,
}

impl Lz8 {
    pub fn new(variables: usize) -> Self {
        Self {
            handler: BoxConstraintHandler::uniform(variables, 0.0, 1.0),
            evaluations: AtomicU64::new(0),
        }
    }

    pub fn set_number_of_variables(&mut self, variables: usize) {
        self.handler = BoxConstraintHandler::uniform(variables, 0.0, 1.0);
    }

    /// Distance of coordinate `j` (1-based) from the Pareto set.
    fn offset(x: &DVector<f64>, j: usize) -> f64 {
        let n = x.len();
        let exponent = if n > 2 {
            0.5 * (1.0 + 3.0 * (j as f64 - 2.0) / (n as f64 - 2.0))
        } else {
            0.5
        };
        x[j - 1] - x[0].powf(exponent)
    }

    /// `2 / |J| * (4 Σ y_j² - 2 Π cos(20 y_j π / sqrt(j)) + 2)` over one index class.
    fn penalty(x: &DVector<f64>, odd: bool) -> f64 {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut product = 1.0;
        for j in (2..=x.len()).filter(|j| (j % 2 == 1) == odd) {
            let y = Self::offset(x, j);
            sum += y * y;
            product *= (20.0 * y * PI / (j as f64).sqrt()).cos();
            count += 1;
        }
        if count == 0 {
            return 0.0;
        }
        2.0 / count as f64 * (4.0 * sum - 2.0 * product + 2.0)
    }
}

impl Default for Lz8 {
    fn default() -> Self {
        Self::new(0)
    }
}

impl MultiObjectiveFunction for Lz8 {
    fn name(&self) -> &str {
        "LZ8"
    }

    fn number_of_variables(&self) -> usize {
        self.handler.dimensions()
    }

    fn number_of_objectives(&self) -> usize {
        2
    }

    fn has_scalable_dimensionality(&self) -> bool {
        true
    }

    fn constraint_handler(&self) -> &BoxConstraintHandler {
        &self.handler
    }

    fn eval(&self, x: &DVector<f64>) -> DVector<f64> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        if x.is_empty() {
            return DVector::zeros(2);
        }
        let f1 = x[0] + Self::penalty(x, true);
        let f2 = 1.0 - x[0].sqrt() + Self::penalty(x, false);
        DVector::from_column_slice(&[f1, f2])
    }

    fn evaluation_counter(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }
}
