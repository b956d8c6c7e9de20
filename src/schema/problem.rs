//! Problem and run configuration for driving the optimizer from JSON.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::MocmaConfig;

/// Benchmark problem families shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BenchmarkKind {
    Dtlz1,
    Dtlz3,
    Dtlz4,
    /// Fixed at two objectives.
    Lz8,
}

/// Which problem to optimize and at what size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemConfig {
    /// Benchmark family.
    pub kind: BenchmarkKind,
    /// Search space dimension.
    #[serde(default = "default_variables")]
    pub variables: usize,
    /// Objective space dimension (ignored by fixed-objective problems).
    #[serde(default = "default_objectives")]
    pub objectives: usize,
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self {
            kind: BenchmarkKind::Dtlz1,
            variables: default_variables(),
            objectives: default_objectives(),
        }
    }
}

fn default_variables() -> usize {
    10
}
fn default_objectives() -> usize {
    3
}

/// Top-level document read by the `mocma` binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Optimizer options.
    #[serde(default)]
    pub optimizer: MocmaConfig,
    /// Problem to solve.
    #[serde(default)]
    pub problem: ProblemConfig,
    /// Number of generations to run.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Where to write the engine state after the run.
    #[serde(default)]
    pub checkpoint: Option<PathBuf>,
}

fn default_generations() -> usize {
    100
}
