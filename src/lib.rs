//! MOCMA - Multi-objective covariance matrix adaptation evolution strategy.
//!
//! This crate provides a seeded, fully serializable implementation of the
//! multi-objective CMA-ES. Every individual carries its own Gaussian
//! mutation distribution and step size, adapted by a success rule, and
//! survivors are chosen by non-dominated sorting plus a hypervolume or
//! additive-epsilon indicator.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Configuration types and the solution set handed back per generation
//! - `objective`: The objective function contract, box constraints and benchmarks
//! - `compute`: Mutation distributions, chromosomes, indicators and the engine
//!
//! # Example
//!
//! ```rust,no_run
//! use mocma::{
//!     compute::Mocma,
//!     objective::Dtlz1,
//!     schema::MocmaConfig,
//! };
//!
//! let problem = Dtlz1::new(10, 3);
//!
//! let mut engine = Mocma::default();
//! engine.configure(MocmaConfig {
//!     population_size: 50,
//!     random_seed: Some(1),
//!     ..Default::default()
//! })?;
//! engine.init_with(&problem)?;
//!
//! for _ in 0..100 {
//!     engine.step(&problem)?;
//! }
//!
//! for solution in engine.solution_set().iter() {
//!     println!("{:?}", solution.value.as_slice());
//! }
//! # Ok::<(), mocma::compute::MocmaError>(())
//! ```

pub mod compute;
pub mod objective;
pub mod schema;

// Re-export commonly used types
pub use compute::{Indicator, Mocma, MocmaError};
pub use objective::MultiObjectiveFunction;
pub use schema::{MocmaConfig, SolutionSet};
