//! DTLZ benchmark family (Deb, Thiele, Laumanns, Zitzler).
//!
//! All three problems are scalable in both the number of variables and the
//! number of objectives and live on the unit cube. The first `m - 1`
//! variables place a point on the front, the remaining `k = n - m + 1`
//! variables feed the distance function `g`.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::DVector;

use super::{BoxConstraintHandler, MultiObjectiveFunction};

/// Shared size bookkeeping for the DTLZ problems.
#[derive(Debug)]
struct DtlzCore {
    objectives: usize,
    handler: BoxConstraintHandler,
    evaluations: AtomicU64,
}

impl DtlzCore {
    fn new(variables: usize, objectives: usize) -> Self {
        Self {
            objectives,
            handler: BoxConstraintHandler::uniform(variables, 0.0, 1.0),
            evaluations: AtomicU64::new(0),
        }
    }

    fn variables(&self) -> usize {
        self.handler.dimensions()
    }

    /// Index of the first distance variable.
    fn distance_start(&self) -> usize {
        (self.objectives - 1).min(self.variables())
    }

    fn count(&self) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
    }

    /// Spherical front shape shared by DTLZ3 and DTLZ4, with `angle` mapping a
    /// position variable onto `[0, π/2]`.
    fn spherical(&self, x: &DVector<f64>, g: f64, angle: impl Fn(f64) -> f64) -> DVector<f64> {
        let m = self.objectives;
        let position = |j: usize| x.get(j).copied().unwrap_or(0.0);
        DVector::from_iterator(
            m,
            (0..m).map(|i| {
                let mut f = 1.0 + g;
                for j in 0..m - (i + 1) {
                    f *= angle(position(j)).cos();
                }
                if i != 0 {
                    f *= angle(position(m - (i + 1))).sin();
                }
                f
            }),
        )
    }
}

macro_rules! dtlz_common {
    ($ty:ident, $name:literal) => {
        impl $ty {
            /// Create the problem with `variables` inputs and `objectives` outputs.
            pub fn new(variables: usize, objectives: usize) -> Self {
                Self {
                    core: DtlzCore::new(variables, objectives.max(1)),
                }
            }

            pub fn set_number_of_objectives(&mut self, objectives: usize) {
                self.core.objectives = objectives.max(1);
            }

            pub fn set_number_of_variables(&mut self, variables: usize) {
                self.core.handler = BoxConstraintHandler::uniform(variables, 0.0, 1.0);
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new(0, 2)
            }
        }

        impl MultiObjectiveFunction for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn number_of_variables(&self) -> usize {
                self.core.variables()
            }

            fn number_of_objectives(&self) -> usize {
                self.core.objectives
            }

            fn has_scalable_objectives(&self) -> bool {
                true
            }

            fn has_scalable_dimensionality(&self) -> bool {
                true
            }

            fn constraint_handler(&self) -> &BoxConstraintHandler {
                &self.core.handler
            }

            fn eval(&self, point: &DVector<f64>) -> DVector<f64> {
                self.core.count();
                self.evaluate(point)
            }

            fn evaluation_counter(&self) -> u64 {
                self.core.evaluations.load(Ordering::Relaxed)
            }
        }
    };
}

/// DTLZ1: linear front `Σ f_i = 0.5` behind a highly multi-modal `g`.
#[derive(Debug)]
pub struct Dtlz1 {
    core: DtlzCore,
}

dtlz_common!(Dtlz1, "DTLZ1");

impl Dtlz1 {
    fn evaluate(&self, x: &DVector<f64>) -> DVector<f64> {
        let m = self.core.objectives;
        let start = self.core.distance_start();
        let k = x.len().saturating_sub(start) as f64;

        let g: f64 = x
            .iter()
            .skip(start)
            .map(|&xi| (xi - 0.5).powi(2) - (20.0 * PI * (xi - 0.5)).cos())
            .sum();
        let g = 100.0 * (k + g);

        let position = |j: usize| x.get(j).copied().unwrap_or(0.0);
        DVector::from_iterator(
            m,
            (0..m).map(|i| {
                let mut f = 0.5 * (1.0 + g);
                for j in 0..m - (i + 1) {
                    f *= position(j);
                }
                if i != 0 {
                    f *= 1.0 - position(m - (i + 1));
                }
                f
            }),
        )
    }
}

/// DTLZ3: spherical front with the multi-modal `g` of DTLZ1.
#[derive(Debug)]
pub struct Dtlz3 {
    core: DtlzCore,
}

dtlz_common!(Dtlz3, "DTLZ3");

impl Dtlz3 {
    fn evaluate(&self, x: &DVector<f64>) -> DVector<f64> {
        let start = self.core.distance_start();
        let k = x.len().saturating_sub(start) as f64;

        let g: f64 = x
            .iter()
            .skip(start)
            .map(|&xi| (xi - 0.5).powi(2) - (20.0 * PI * (xi - 0.5)).cos())
            .sum();
        let g = 100.0 * (k + g);

        self.core.spherical(x, g, |xi| xi * 0.5 * PI)
    }
}

/// Exponent biasing DTLZ4 position variables towards the front's edges.
const DTLZ4_ALPHA: i32 = 10;

/// DTLZ4: spherical front with a biased density of solutions.
#[derive(Debug)]
pub struct Dtlz4 {
    core: DtlzCore,
}

dtlz_common!(Dtlz4, "DTLZ4");

impl Dtlz4 {
    fn evaluate(&self, x: &DVector<f64>) -> DVector<f64> {
        let start = self.core.distance_start();
        let g: f64 = x.iter().skip(start).map(|&xi| (xi - 0.5).powi(2)).sum();

        self.core
            .spherical(x, g, |xi| xi.powi(DTLZ4_ALPHA) * 0.5 * PI)
    }
}
