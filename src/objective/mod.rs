//! Objective functions consumed by the optimizer.
//!
//! The engine only talks to problems through [`MultiObjectiveFunction`].
//! The benchmark problems here exist so the optimizer can be exercised
//! end to end; they carry no state besides an evaluation counter.

mod constraint;
mod dtlz;
mod lz8;

use nalgebra::DVector;

use crate::schema::{BenchmarkKind, ConfigError, ProblemConfig};

pub use constraint::BoxConstraintHandler;
pub use dtlz::{Dtlz1, Dtlz3, Dtlz4};
pub use lz8::Lz8;

/// A vector-valued objective function over a box-constrained real space.
///
/// All objectives are minimized. `eval` must be deterministic in `point`;
/// implementations count evaluations through interior mutability so the
/// function can be shared across threads.
pub trait MultiObjectiveFunction: Send + Sync {
    /// Human-readable problem name.
    fn name(&self) -> &str;

    fn number_of_variables(&self) -> usize;

    fn number_of_objectives(&self) -> usize;

    fn has_scalable_objectives(&self) -> bool {
        false
    }

    fn has_scalable_dimensionality(&self) -> bool {
        false
    }

    /// Feasible region of the search space.
    fn constraint_handler(&self) -> &BoxConstraintHandler;

    /// Evaluate the objective vector at `point`.
    fn eval(&self, point: &DVector<f64>) -> DVector<f64>;

    /// Number of `eval` calls so far.
    fn evaluation_counter(&self) -> u64;
}

/// Instantiate the benchmark named by `config`.
pub fn build_problem(
    config: &ProblemConfig,
) -> Result<Box<dyn MultiObjectiveFunction>, ConfigError> {
    if config.variables == 0 {
        return Err(ConfigError::InvalidSearchSpaceDimension);
    }
    let objectives = match config.kind {
        BenchmarkKind::Lz8 => 2,
        _ => config.objectives,
    };
    if objectives == 0 {
        return Err(ConfigError::InvalidObjectiveCount);
    }
    // DTLZ position variables occupy the first `objectives - 1` coordinates.
    if config.variables < objectives {
        return Err(ConfigError::InvalidSearchSpaceDimension);
    }

    let problem: Box<dyn MultiObjectiveFunction> = match config.kind {
        BenchmarkKind::Dtlz1 => Box::new(Dtlz1::new(config.variables, objectives)),
        BenchmarkKind::Dtlz3 => Box::new(Dtlz3::new(config.variables, objectives)),
        BenchmarkKind::Dtlz4 => Box::new(Dtlz4::new(config.variables, objectives)),
        BenchmarkKind::Lz8 => Box::new(Lz8::new(config.variables)),
    };
    Ok(problem)
}
