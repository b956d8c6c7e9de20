//! Per-individual strategy parameters and their initialization.
//!
//! Every individual owns a [`Chromosome`]: its mutation distribution, step
//! size, evolution path and the learning rates driving the 1/5th-style
//! success rule. Step sizes adapt from binary success (offspring beats
//! parent), not from path length as in single-objective CMA-ES.

use nalgebra::DVector;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::distribution::{DistributionError, LearningRates, MutationDistribution};
use crate::schema::{ConfigError, MocmaConfig};

/// Above this smoothed success probability the evolution path is only
/// decayed, not extended.
pub const SUCCESS_THRESHOLD: f64 = 0.44;

/// Adaptive state of one individual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chromosome {
    /// Covariance matrix and its cached decomposition.
    pub mutation_distribution: MutationDistribution,
    /// Smoothed sum of successful steps.
    pub evolution_path: DVector<f64>,
    /// Most recent sample from the mutation distribution (before σ scaling).
    pub last_step: DVector<f64>,
    /// Offspring produced per generation.
    pub lambda: usize,
    /// Offspring that succeeded this generation.
    pub no_successful_offspring: f64,
    /// Global step size σ.
    pub step_size: f64,
    /// Step size damping `d`.
    pub step_size_damping_factor: f64,
    /// Smoothing rate `c_p` of the success probability.
    pub step_size_learning_rate: f64,
    /// Smoothed success probability `p̄`, in `[0, 1]`.
    pub success_probability: f64,
    /// Success probability at which σ stays constant.
    pub target_success_probability: f64,
    /// Evolution path learning rate `c_c`.
    pub evolution_path_learning_rate: f64,
    /// Covariance learning rate `c_cov`.
    pub covariance_matrix_learning_rate: f64,
    /// Set by [`Chromosome::mutate`]; the last step still has to be folded
    /// into the covariance if it turns out successful.
    pub needs_covariance_update: bool,
    /// Blend the last step into the covariance update.
    pub use_new_update: bool,
    /// Population slot of the individual this chromosome was copied from.
    pub parent: Option<usize>,
}

impl Default for Chromosome {
    fn default() -> Self {
        Self {
            mutation_distribution: MutationDistribution::default(),
            evolution_path: DVector::zeros(0),
            last_step: DVector::zeros(0),
            lambda: 0,
            no_successful_offspring: 0.0,
            step_size: 0.0,
            step_size_damping_factor: 0.0,
            step_size_learning_rate: 0.0,
            success_probability: 0.0,
            target_success_probability: 0.0,
            evolution_path_learning_rate: 0.0,
            covariance_matrix_learning_rate: 0.0,
            needs_covariance_update: false,
            use_new_update: false,
            parent: None,
        }
    }
}

impl Chromosome {
    /// Search space dimension, 0 while uninitialized.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.mutation_distribution.dimension()
    }

    /// Sample an offspring of `point`: `point + σ · y` with `y ~ N(0, C)`.
    ///
    /// Records `y` as the last step and marks the covariance as pending.
    pub fn mutate<R: Rng + ?Sized>(
        &mut self,
        point: &DVector<f64>,
        rng: &mut R,
    ) -> Result<DVector<f64>, DistributionError> {
        let step = self.mutation_distribution.sample(rng)?;
        let offspring = point + &step * self.step_size;
        self.last_step = step;
        self.needs_covariance_update = true;
        Ok(offspring)
    }

    /// Offspring-side update after its success has been decided.
    ///
    /// Adapts the step size from a single success sample and, on success,
    /// folds the last step into the evolution path and covariance matrix.
    pub fn update_strategy_parameters(&mut self, was_successful: bool) {
        self.update_step_size(if was_successful { 1.0 } else { 0.0 });
        if was_successful && self.needs_covariance_update {
            self.update_covariance();
        }
        self.needs_covariance_update = false;
    }

    /// Parent-side update from the success rate of its offspring.
    pub fn update_from_offspring(&mut self) {
        if self.lambda > 0 {
            self.update_step_size(self.no_successful_offspring / self.lambda as f64);
        }
        self.no_successful_offspring = 0.0;
    }

    /// Smooth the success probability and rescale σ:
    /// `σ ← σ · exp((p̄ - p_target) / (d (1 - p_target)))`.
    fn update_step_size(&mut self, success_rate: f64) {
        let c_p = self.step_size_learning_rate;
        self.success_probability = (1.0 - c_p) * self.success_probability + c_p * success_rate;
        self.step_size *= ((self.success_probability - self.target_success_probability)
            / (self.step_size_damping_factor * (1.0 - self.target_success_probability)))
            .exp();
    }

    fn update_covariance(&mut self) {
        let c_c = self.evolution_path_learning_rate;
        let path_stalled = self.success_probability >= SUCCESS_THRESHOLD;

        self.evolution_path *= 1.0 - c_c;
        if !path_stalled {
            self.evolution_path += &self.last_step * (c_c * (2.0 - c_c)).sqrt();
        }

        let rates = LearningRates {
            evolution_path: c_c,
            covariance: self.covariance_matrix_learning_rate,
            path_stalled,
        };
        self.mutation_distribution.update_covariance(
            &self.evolution_path,
            &self.last_step,
            rates,
            self.use_new_update,
        );
    }
}

/// Default strategy parameters stamped onto fresh chromosomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Initializer {
    /// Search space dimension `n`.
    pub search_space_dimension: usize,
    /// Number of objectives.
    pub no_objectives: usize,
    /// Initial step size σ₀.
    pub initial_sigma: f64,
    /// Copied into every chromosome.
    pub use_new_update: bool,
    /// Judge offspring success with the constraint violation taken into account.
    pub constrained_fitness_function: bool,
    /// Offspring per parent; 0 is treated as 1.
    #[serde(default)]
    pub offspring_per_parent: usize,
}

impl Initializer {
    /// Build an initializer for a problem of the given size.
    pub fn from_config(config: &MocmaConfig, dimension: usize, objectives: usize) -> Self {
        Self {
            search_space_dimension: dimension,
            no_objectives: objectives,
            initial_sigma: config.initial_sigma,
            use_new_update: config.use_new_update,
            constrained_fitness_function: config.constrained_fitness_function,
            offspring_per_parent: config.offspring_per_parent,
        }
    }

    /// Overwrite every field of `chromosome` with fresh defaults.
    pub fn apply(&self, chromosome: &mut Chromosome) -> Result<(), ConfigError> {
        if self.search_space_dimension == 0 {
            return Err(ConfigError::InvalidSearchSpaceDimension);
        }
        if self.no_objectives == 0 {
            return Err(ConfigError::InvalidObjectiveCount);
        }

        let n = self.search_space_dimension;
        let lambda = self.offspring_per_parent.max(1);
        let lambda_f = lambda as f64;
        let target = 1.0 / (5.0 + lambda_f.sqrt() / 2.0);

        chromosome.mutation_distribution.resize(n);
        chromosome.mutation_distribution.set_identity();
        chromosome.evolution_path = DVector::zeros(n);
        chromosome.last_step = DVector::zeros(n);
        chromosome.lambda = lambda;
        chromosome.no_successful_offspring = 0.0;
        chromosome.step_size = self.initial_sigma;
        chromosome.step_size_damping_factor = 1.0 + n as f64 / (2.0 * lambda_f);
        chromosome.step_size_learning_rate = target * lambda_f / (2.0 + target * lambda_f);
        chromosome.success_probability = target;
        chromosome.target_success_probability = target;
        chromosome.evolution_path_learning_rate = 2.0 / (n as f64 + 2.0);
        chromosome.covariance_matrix_learning_rate = 2.0 / ((n * n) as f64 + 6.0);
        chromosome.needs_covariance_update = false;
        chromosome.use_new_update = self.use_new_update;
        chromosome.parent = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn initialized(n: usize, sigma: f64) -> Chromosome {
        let initializer = Initializer {
            search_space_dimension: n,
            no_objectives: 2,
            initial_sigma: sigma,
            ..Default::default()
        };
        let mut chromosome = Chromosome::default();
        initializer.apply(&mut chromosome).unwrap();
        chromosome
    }

    #[test]
    fn test_empty_chromosome() {
        let chromosome = Chromosome::default();
        let distribution = &chromosome.mutation_distribution;
        assert_eq!(distribution.covariance_matrix().shape(), (0, 0));
        assert_eq!(distribution.eigen_values().len(), 0);
        assert_eq!(distribution.eigen_vectors().shape(), (0, 0));
        assert_eq!(chromosome.evolution_path.len(), 0);
        assert_eq!(chromosome.last_step.len(), 0);
        assert_eq!(chromosome.lambda, 0);
        assert_eq!(chromosome.no_successful_offspring, 0.0);
        assert_eq!(chromosome.step_size, 0.0);
        assert_eq!(chromosome.step_size_damping_factor, 0.0);
        assert_eq!(chromosome.step_size_learning_rate, 0.0);
        assert_eq!(chromosome.success_probability, 0.0);
        assert_eq!(chromosome.target_success_probability, 0.0);
        assert_eq!(chromosome.evolution_path_learning_rate, 0.0);
        assert_eq!(chromosome.covariance_matrix_learning_rate, 0.0);
        assert!(!chromosome.needs_covariance_update);
        assert!(chromosome.parent.is_none());
    }

    #[test]
    fn test_initializer_validation() {
        let mut chromosome = Chromosome::default();
        let mut initializer = Initializer::default();
        assert_eq!(initializer.search_space_dimension, 0);
        assert_eq!(initializer.no_objectives, 0);
        assert_eq!(initializer.initial_sigma, 0.0);
        assert!(!initializer.use_new_update);
        assert!(!initializer.constrained_fitness_function);

        assert_eq!(
            initializer.apply(&mut chromosome),
            Err(ConfigError::InvalidSearchSpaceDimension)
        );
        initializer.search_space_dimension = 5;
        assert_eq!(
            initializer.apply(&mut chromosome),
            Err(ConfigError::InvalidObjectiveCount)
        );
        initializer.no_objectives = 5;
        assert!(initializer.apply(&mut chromosome).is_ok());
        assert_eq!(chromosome.dimension(), 5);
    }

    #[test]
    fn test_initializer_values_and_idempotence() {
        let chromosome = initialized(4, 0.3);
        assert_eq!(chromosome.lambda, 1);
        assert_eq!(chromosome.step_size, 0.3);
        assert_eq!(
            chromosome.mutation_distribution.covariance_matrix(),
            &nalgebra::DMatrix::identity(4, 4)
        );
        assert!((chromosome.target_success_probability - 1.0 / 5.5).abs() < 1e-15);
        assert!((chromosome.step_size_damping_factor - 3.0).abs() < 1e-15);
        assert!((chromosome.evolution_path_learning_rate - 2.0 / 6.0).abs() < 1e-15);
        assert!((chromosome.covariance_matrix_learning_rate - 2.0 / 22.0).abs() < 1e-15);

        let initializer = Initializer {
            search_space_dimension: 4,
            no_objectives: 2,
            initial_sigma: 0.3,
            ..Default::default()
        };
        let mut again = chromosome.clone();
        again.step_size = 9.0;
        initializer.apply(&mut again).unwrap();
        initializer.apply(&mut again).unwrap();
        assert_eq!(again, chromosome);
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut chromosome = Chromosome::default();
        chromosome.mutation_distribution.resize(10);
        chromosome.evolution_path = DVector::zeros(10);
        chromosome.last_step = DVector::zeros(10);
        chromosome.lambda = 5;
        chromosome.no_successful_offspring = 5.0;
        chromosome.step_size = 5.0;
        chromosome.step_size_damping_factor = 5.0;
        chromosome.step_size_learning_rate = 5.0;
        chromosome.success_probability = 5.0;
        chromosome.target_success_probability = 5.0;
        chromosome.evolution_path_learning_rate = 5.0;
        chromosome.covariance_matrix_learning_rate = 5.0;
        chromosome.needs_covariance_update = true;
        chromosome.parent = Some(3);

        let json = serde_json::to_string(&chromosome).unwrap();
        let restored: Chromosome = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, chromosome);

        let initializer = Initializer {
            search_space_dimension: 5,
            no_objectives: 5,
            initial_sigma: 5.0,
            use_new_update: true,
            constrained_fitness_function: true,
            offspring_per_parent: 1,
        };
        let json = serde_json::to_string(&initializer).unwrap();
        let restored: Initializer = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, initializer);
    }

    #[test]
    fn test_adapted_state_round_trips_bit_exact() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut chromosome = initialized(3, 0.7);
        let point = DVector::from_element(3, 0.5);
        for i in 0..5 {
            chromosome.mutate(&point, &mut rng).unwrap();
            chromosome.update_strategy_parameters(i % 2 == 0);
            chromosome.mutation_distribution.refresh_decomposition().unwrap();
        }

        let json = serde_json::to_string(&chromosome).unwrap();
        let restored: Chromosome = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, chromosome);
        assert_eq!(restored.step_size.to_bits(), chromosome.step_size.to_bits());
    }

    #[test]
    fn test_mutate_records_step() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut chromosome = initialized(3, 0.5);
        let point = DVector::from_column_slice(&[1.0, 2.0, 3.0]);

        let offspring = chromosome.mutate(&point, &mut rng).unwrap();
        assert!(chromosome.needs_covariance_update);
        let expected = &point + &chromosome.last_step * 0.5;
        assert!((offspring - expected).norm() < 1e-15);
        assert!(chromosome.last_step.norm() > 0.0);
    }

    #[test]
    fn test_mutate_uninitialized_fails() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut chromosome = Chromosome::default();
        let result = chromosome.mutate(&DVector::zeros(0), &mut rng);
        assert_eq!(result, Err(DistributionError::InvalidDimension));
    }

    #[test]
    fn test_success_grows_and_failure_shrinks_step_size() {
        let mut success = initialized(2, 1.0);
        success.update_strategy_parameters(true);
        assert!(success.success_probability > success.target_success_probability);
        assert!(success.step_size > 1.0);

        let mut failure = initialized(2, 1.0);
        failure.update_strategy_parameters(false);
        assert!(failure.success_probability < failure.target_success_probability);
        assert!(failure.step_size < 1.0);
    }

    #[test]
    fn test_covariance_update_only_after_successful_mutation() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let point = DVector::zeros(2);

        let mut failed = initialized(2, 1.0);
        failed.mutate(&point, &mut rng).unwrap();
        failed.update_strategy_parameters(false);
        assert!(!failed.mutation_distribution.is_stale());
        assert!(!failed.needs_covariance_update);

        let mut succeeded = initialized(2, 1.0);
        succeeded.mutate(&point, &mut rng).unwrap();
        succeeded.update_strategy_parameters(true);
        assert!(succeeded.mutation_distribution.is_stale());
        assert!(succeeded.evolution_path.norm() > 0.0);
        assert!(!succeeded.needs_covariance_update);
    }

    #[test]
    fn test_parent_update_from_offspring_resets_counter() {
        let mut parent = initialized(2, 1.0);
        parent.no_successful_offspring = 1.0;
        parent.update_from_offspring();
        assert_eq!(parent.no_successful_offspring, 0.0);
        assert!(parent.step_size > 1.0);
    }
}
