//! Configuration types for the MOCMA optimizer.

use serde::{Deserialize, Serialize};

/// Recognized engine options.
///
/// Every field has a serde default so partial JSON documents are accepted;
/// the result still has to pass [`MocmaConfig::validate`] before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MocmaConfig {
    /// Number of parents kept after each generation (μ).
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Offspring generated per parent and generation (λ/μ).
    #[serde(default = "default_offspring_per_parent")]
    pub offspring_per_parent: usize,
    /// Initial global step size (σ₀) of every individual.
    #[serde(default = "default_initial_sigma")]
    pub initial_sigma: f64,
    /// Use the Monte-Carlo estimate instead of exact hypervolume contributions.
    /// Ignored when the engine ranks with the additive-epsilon indicator.
    #[serde(default = "default_use_approximated_hypervolume")]
    pub use_approximated_hypervolume: bool,
    /// Samples drawn per front member by the approximated hypervolume.
    #[serde(default = "default_approximation_samples")]
    pub approximation_samples: usize,
    /// Take constraint violation into account when judging offspring success.
    #[serde(default)]
    pub constrained_fitness_function: bool,
    /// Blend the last step into the covariance update (rank-one + rank-μ style).
    #[serde(default)]
    pub use_new_update: bool,
    /// Evaluate offspring on the rayon thread pool.
    #[serde(default)]
    pub parallel_evaluation: bool,
    /// Seed for the engine's random stream. `None` draws a fresh seed.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for MocmaConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            offspring_per_parent: default_offspring_per_parent(),
            initial_sigma: default_initial_sigma(),
            use_approximated_hypervolume: default_use_approximated_hypervolume(),
            approximation_samples: default_approximation_samples(),
            constrained_fitness_function: false,
            use_new_update: false,
            parallel_evaluation: false,
            random_seed: None,
        }
    }
}

fn default_population_size() -> usize {
    100
}
fn default_offspring_per_parent() -> usize {
    1
}
fn default_initial_sigma() -> f64 {
    1.0
}
fn default_use_approximated_hypervolume() -> bool {
    true
}
fn default_approximation_samples() -> usize {
    1000
}

impl MocmaConfig {
    /// Total offspring per generation (λ).
    #[inline]
    pub fn offspring_count(&self) -> usize {
        self.population_size * self.offspring_per_parent
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::InvalidPopulationSize);
        }
        if self.offspring_per_parent == 0 {
            return Err(ConfigError::InvalidOffspringCount);
        }
        if !self.initial_sigma.is_finite() || self.initial_sigma <= 0.0 {
            return Err(ConfigError::InvalidInitialSigma(self.initial_sigma));
        }
        if self.use_approximated_hypervolume && self.approximation_samples == 0 {
            return Err(ConfigError::InvalidApproximationSamples);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be non-zero")]
    InvalidPopulationSize,
    #[error("Offspring per parent must be non-zero")]
    InvalidOffspringCount,
    #[error("Initial sigma must be positive and finite, got {0}")]
    InvalidInitialSigma(f64),
    #[error("Approximated hypervolume needs at least one sample per point")]
    InvalidApproximationSamples,
    #[error("Search space dimension must be non-zero")]
    InvalidSearchSpaceDimension,
    #[error("Number of objectives must be non-zero")]
    InvalidObjectiveCount,
}
