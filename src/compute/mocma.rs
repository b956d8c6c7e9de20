//! The MOCMA engine: generational loop over self-adapting individuals.

use std::fs;
use std::path::Path;

use nalgebra::DVector;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

use super::chromosome::{Chromosome, Initializer};
use super::error::MocmaError;
use super::indicator::{HypervolumeIndicator, Indicator, dominates};
use crate::objective::MultiObjectiveFunction;
use crate::schema::{MocmaConfig, SolutionPoint, SolutionSet};

/// A member of the population or an offspring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    /// Feasible point in search space.
    pub point: DVector<f64>,
    /// Objective vector at `point`.
    pub value: DVector<f64>,
    /// Squared distance of the sampled point to the box before clamping.
    pub constraint_violation: f64,
    /// Strategy parameters adapted along this individual's lineage.
    pub chromosome: Chromosome,
}

impl Individual {
    #[inline]
    pub fn is_feasible(&self) -> bool {
        self.constraint_violation == 0.0
    }
}

/// Multi-objective CMA-ES with one adaptive distribution per individual.
///
/// The whole optimizer state, random stream included, is serializable;
/// a deserialized engine continues exactly where the saved one left off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mocma {
    config: MocmaConfig,
    indicator: Indicator,
    initializer: Initializer,
    population: Vec<Individual>,
    generation: usize,
    rng: ChaCha8Rng,
}

impl Default for Mocma {
    /// Approximated hypervolume selection with the default configuration.
    fn default() -> Self {
        Self::new(Indicator::default())
    }
}

impl Mocma {
    /// Create an engine ranking with `indicator`.
    pub fn new(indicator: Indicator) -> Self {
        let config = MocmaConfig::default();
        let seed = config.random_seed.unwrap_or_else(rand::random);
        Self {
            config,
            indicator,
            initializer: Initializer::default(),
            population: Vec::new(),
            generation: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Engine ranking with exact hypervolume contributions.
    pub fn exact_hypervolume() -> Self {
        Self::new(Indicator::Hypervolume(HypervolumeIndicator {
            approximated: false,
            samples: 0,
        }))
    }

    /// Engine ranking with the additive-epsilon indicator.
    pub fn additive_epsilon() -> Self {
        Self::new(Indicator::AdditiveEpsilon)
    }

    /// Validate the current configuration.
    pub fn init(&mut self) -> Result<(), MocmaError> {
        self.config.validate()?;
        Ok(())
    }

    /// Replace the configuration.
    ///
    /// Hypervolume settings carry over into the indicator and a configured
    /// seed restarts the random stream, both immediately. Population size,
    /// offspring count and strategy settings are fixed by `init_with`; a
    /// running population keeps the values it was initialized with.
    pub fn configure(&mut self, config: MocmaConfig) -> Result<(), MocmaError> {
        config.validate()?;
        if let Indicator::Hypervolume(hv) = &mut self.indicator {
            hv.approximated = config.use_approximated_hypervolume;
            hv.samples = config.approximation_samples;
        }
        if let Some(seed) = config.random_seed {
            self.rng = ChaCha8Rng::seed_from_u64(seed);
        }
        self.config = config;
        Ok(())
    }

    /// Sample an initial population uniformly within the problem's bounds.
    pub fn init_with<F: MultiObjectiveFunction + ?Sized>(
        &mut self,
        problem: &F,
    ) -> Result<(), MocmaError> {
        self.config.validate()?;

        let n = problem.number_of_variables();
        let m = problem.number_of_objectives();
        let handler = problem.constraint_handler();
        if n == 0 || m == 0 || !handler.is_bounded() {
            return Err(MocmaError::UnboundedProblem {
                name: problem.name().to_string(),
            });
        }
        if handler.dimensions() != n {
            return Err(MocmaError::DimensionMismatch {
                expected: n,
                found: handler.dimensions(),
            });
        }

        let initializer = Initializer::from_config(&self.config, n, m);
        let points: Vec<DVector<f64>> = (0..self.config.population_size)
            .map(|_| handler.sample_uniform(&mut self.rng))
            .collect();
        let values = evaluate(problem, &points, self.config.parallel_evaluation);
        check_objectives(&values, m)?;

        let mut population = Vec::with_capacity(points.len());
        for (slot, (point, value)) in points.into_iter().zip(values).enumerate() {
            let mut chromosome = Chromosome::default();
            initializer.apply(&mut chromosome)?;
            chromosome.parent = Some(slot);
            population.push(Individual {
                point,
                value,
                constraint_violation: 0.0,
                chromosome,
            });
        }

        log::info!(
            "Initialized {} individuals on {} ({} variables, {} objectives)",
            population.len(),
            problem.name(),
            n,
            m
        );

        self.population = population;
        self.initializer = initializer;
        self.generation = 0;
        Ok(())
    }

    /// Run one generation and return the new population in ranking order.
    pub fn step<F: MultiObjectiveFunction + ?Sized>(
        &mut self,
        problem: &F,
    ) -> Result<SolutionSet, MocmaError> {
        if self.population.is_empty() {
            return Err(MocmaError::NotInitialized);
        }
        let n = self.initializer.search_space_dimension;
        let m = self.initializer.no_objectives;
        if problem.number_of_variables() != n {
            return Err(MocmaError::DimensionMismatch {
                expected: n,
                found: problem.number_of_variables(),
            });
        }
        if problem.number_of_objectives() != m {
            return Err(MocmaError::DimensionMismatch {
                expected: m,
                found: problem.number_of_objectives(),
            });
        }
        let generation = self.generation;

        for (individual, parent) in self.population.iter_mut().enumerate() {
            let distribution = &mut parent.chromosome.mutation_distribution;
            if distribution.is_stale() {
                distribution.refresh_decomposition().map_err(|err| {
                    log::warn!("Individual {}: {}", individual, err);
                    MocmaError::Numerical {
                        generation,
                        individual,
                    }
                })?;
            }
        }

        // Draw every offspring from the engine stream before evaluating any.
        let handler = problem.constraint_handler();
        let lambda = self.initializer.offspring_per_parent.max(1);
        let mu = self.population.len();
        let mut drawn = Vec::with_capacity(mu * lambda);
        let mut points = Vec::with_capacity(mu * lambda);
        for (individual, parent) in self.population.iter().enumerate() {
            for _ in 0..lambda {
                let mut chromosome = parent.chromosome.clone();
                chromosome.parent = Some(individual);
                let mut point = chromosome
                    .mutate(&parent.point, &mut self.rng)
                    .map_err(|_| MocmaError::Numerical {
                        generation,
                        individual,
                    })?;
                let violation = handler.violation(&point);
                handler.closest_feasible(&mut point);
                points.push(point);
                drawn.push((individual, chromosome, violation));
            }
        }

        let values = evaluate(problem, &points, self.config.parallel_evaluation);
        check_objectives(&values, m)?;

        let constrained = self.initializer.constrained_fitness_function;
        let mut successes = 0usize;
        let mut offspring = Vec::with_capacity(points.len());
        for ((point, value), (parent_index, chromosome, constraint_violation)) in
            points.into_iter().zip(values).zip(drawn)
        {
            let mut child = Individual {
                point,
                value,
                constraint_violation,
                chromosome,
            };
            let parent = &mut self.population[parent_index];
            let successful = is_successful(&child, parent, constrained);
            child.chromosome.update_strategy_parameters(successful);
            if successful {
                parent.chromosome.no_successful_offspring += 1.0;
                successes += 1;
            }
            offspring.push(child);
        }
        for parent in &mut self.population {
            parent.chromosome.update_from_offspring();
        }

        let values: Vec<DVector<f64>> = self
            .population
            .iter()
            .chain(&offspring)
            .map(|individual| individual.value.clone())
            .collect();
        let survivors = self
            .indicator
            .select(&values, mu, &mut self.rng)?;

        let mut pool: Vec<Option<Individual>> = std::mem::take(&mut self.population)
            .into_iter()
            .chain(offspring)
            .map(Some)
            .collect();
        self.population = survivors
            .into_iter()
            .filter_map(|index| pool[index].take())
            .enumerate()
            .map(|(slot, mut individual)| {
                individual.chromosome.parent = Some(slot);
                individual
            })
            .collect();
        self.generation += 1;

        log::debug!(
            "Generation {}: {}/{} offspring successful, {} evaluations total",
            self.generation,
            successes,
            values.len() - self.population.len(),
            problem.evaluation_counter()
        );

        Ok(self.solution_set())
    }

    /// Restart the random stream from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Generations completed since the last `init_with`.
    #[inline]
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn config(&self) -> &MocmaConfig {
        &self.config
    }

    pub fn indicator(&self) -> &Indicator {
        &self.indicator
    }

    pub fn initializer(&self) -> &Initializer {
        &self.initializer
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// Current population as points and objective vectors.
    pub fn solution_set(&self) -> SolutionSet {
        SolutionSet {
            solutions: self
                .population
                .iter()
                .map(|individual| SolutionPoint {
                    point: individual.point.clone(),
                    value: individual.value.clone(),
                })
                .collect(),
        }
    }

    /// Write the full engine state to `path` as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), MocmaError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Restore an engine written by [`Mocma::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MocmaError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Offspring success against its parent.
///
/// Unconstrained: the offspring dominates the parent. Constrained: both are
/// feasible and the offspring dominates, or the parent is infeasible and the
/// offspring violates the bounds strictly less.
fn is_successful(offspring: &Individual, parent: &Individual, constrained: bool) -> bool {
    let dominating = dominates(offspring.value.as_slice(), parent.value.as_slice());
    if !constrained {
        return dominating;
    }
    match (parent.is_feasible(), offspring.is_feasible()) {
        (true, true) => dominating,
        (true, false) => false,
        (false, _) => offspring.constraint_violation < parent.constraint_violation,
    }
}

fn check_objectives(values: &[DVector<f64>], objectives: usize) -> Result<(), MocmaError> {
    match values.iter().find(|value| value.len() != objectives) {
        Some(value) => Err(MocmaError::DimensionMismatch {
            expected: objectives,
            found: value.len(),
        }),
        None => Ok(()),
    }
}

/// Evaluate `points` in order. Evaluation is pure, so the parallel path
/// yields the same values as the sequential one.
#[cfg(not(target_arch = "wasm32"))]
fn evaluate<F: MultiObjectiveFunction + ?Sized>(
    problem: &F,
    points: &[DVector<f64>],
    parallel: bool,
) -> Vec<DVector<f64>> {
    if parallel {
        points.par_iter().map(|point| problem.eval(point)).collect()
    } else {
        points.iter().map(|point| problem.eval(point)).collect()
    }
}

#[cfg(target_arch = "wasm32")]
fn evaluate<F: MultiObjectiveFunction + ?Sized>(
    problem: &F,
    points: &[DVector<f64>],
    _parallel: bool,
) -> Vec<DVector<f64>> {
    points.iter().map(|point| problem.eval(point)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::{BoxConstraintHandler, Dtlz1, Dtlz4, Lz8};
    use crate::schema::ConfigError;

    fn small_config(seed: u64) -> MocmaConfig {
        MocmaConfig {
            population_size: 12,
            approximation_samples: 200,
            random_seed: Some(seed),
            ..Default::default()
        }
    }

    fn individual(value: &[f64], violation: f64) -> Individual {
        Individual {
            point: DVector::zeros(1),
            value: DVector::from_column_slice(value),
            constraint_violation: violation,
            chromosome: Chromosome::default(),
        }
    }

    #[test]
    fn test_dtlz1_step_and_serialized_replay() {
        let problem = Dtlz1::new(10, 3);
        let mut engine = Mocma::default();
        engine.init().unwrap();
        engine.init_with(&problem).unwrap();

        let solutions = engine.step(&problem).unwrap();
        assert_eq!(solutions.len(), engine.config().population_size);
        assert!(solutions.iter().all(|s| s.value.len() == 3));

        engine.reseed(1);
        let json = serde_json::to_string(&engine).unwrap();
        let mut restored: Mocma = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, engine);

        engine.reseed(1);
        restored.reseed(1);
        let a = engine.step(&problem).unwrap();
        let b = restored.step(&problem).unwrap();
        assert!(a.max_abs_difference(&b).unwrap() <= 1e-20);
    }

    #[test]
    fn test_same_seed_same_run() {
        let problem = Dtlz4::new(6, 2);
        let run = || {
            let mut engine = Mocma::exact_hypervolume();
            engine
                .configure(MocmaConfig {
                    use_approximated_hypervolume: false,
                    ..small_config(3)
                })
                .unwrap();
            engine.init_with(&problem).unwrap();
            for _ in 0..4 {
                engine.step(&problem).unwrap();
            }
            engine.solution_set()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_parallel_evaluation_matches_sequential() {
        let problem = Dtlz1::new(5, 2);
        let run = |parallel: bool| {
            let mut engine = Mocma::default();
            engine
                .configure(MocmaConfig {
                    parallel_evaluation: parallel,
                    ..small_config(8)
                })
                .unwrap();
            engine.init_with(&problem).unwrap();
            for _ in 0..3 {
                engine.step(&problem).unwrap();
            }
            engine.solution_set()
        };
        assert_eq!(run(true), run(false));
    }

    #[test]
    fn test_population_size_is_invariant() {
        let problem = Lz8::new(5);
        let indicators = [
            Mocma::default(),
            Mocma::exact_hypervolume(),
            Mocma::additive_epsilon(),
        ];
        for mut engine in indicators {
            let exact = matches!(
                engine.indicator(),
                Indicator::Hypervolume(HypervolumeIndicator {
                    approximated: false,
                    ..
                })
            );
            engine
                .configure(MocmaConfig {
                    offspring_per_parent: 2,
                    use_approximated_hypervolume: !exact,
                    ..small_config(21)
                })
                .unwrap();
            engine.init_with(&problem).unwrap();
            for generation in 1..=5 {
                let solutions = engine.step(&problem).unwrap();
                assert_eq!(solutions.len(), 12);
                assert_eq!(engine.generation(), generation);
                for (slot, individual) in engine.population().iter().enumerate() {
                    assert_eq!(individual.chromosome.parent, Some(slot));
                    assert!(problem.constraint_handler().is_feasible(&individual.point));
                }
            }
        }
    }

    #[test]
    fn test_survivors_are_not_dominated_by_discarded_points() {
        let problem = Dtlz1::new(4, 2);
        let mut engine = Mocma::additive_epsilon();
        engine.configure(small_config(5)).unwrap();
        engine.init_with(&problem).unwrap();
        let before: Vec<DVector<f64>> = engine
            .population()
            .iter()
            .map(|individual| individual.value.clone())
            .collect();

        let after = engine.step(&problem).unwrap();
        for old in &before {
            if after.iter().any(|s| &s.value == old) {
                continue;
            }
            for survivor in after.iter() {
                assert!(!dominates(old.as_slice(), survivor.value.as_slice()));
            }
        }
    }

    #[test]
    fn test_configuration_errors() {
        let mut engine = Mocma::default();
        let err = engine
            .configure(MocmaConfig {
                population_size: 0,
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            MocmaError::Configuration(ConfigError::InvalidPopulationSize)
        ));

        let err = engine
            .configure(MocmaConfig {
                initial_sigma: -1.0,
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            MocmaError::Configuration(ConfigError::InvalidInitialSigma(_))
        ));

        // A rejected configuration leaves the previous one in place.
        assert!(engine.init().is_ok());
    }

    #[test]
    fn test_step_before_init_fails() {
        let mut engine = Mocma::default();
        let problem = Dtlz1::new(4, 2);
        assert!(matches!(
            engine.step(&problem),
            Err(MocmaError::NotInitialized)
        ));
    }

    #[test]
    fn test_step_rejects_other_problem_size() {
        let mut engine = Mocma::default();
        engine.configure(small_config(1)).unwrap();
        engine.init_with(&Dtlz1::new(4, 2)).unwrap();
        assert!(matches!(
            engine.step(&Dtlz1::new(5, 2)),
            Err(MocmaError::DimensionMismatch {
                expected: 4,
                found: 5
            })
        ));
    }

    #[test]
    fn test_configure_after_init_keeps_population_shape() {
        let problem = Dtlz1::new(4, 2);
        let mut engine = Mocma::default();
        engine
            .configure(MocmaConfig {
                population_size: 6,
                ..small_config(2)
            })
            .unwrap();
        engine.init_with(&problem).unwrap();

        engine
            .configure(MocmaConfig {
                population_size: 20,
                offspring_per_parent: 3,
                ..small_config(2)
            })
            .unwrap();
        for _ in 0..3 {
            let solutions = engine.step(&problem).unwrap();
            assert_eq!(solutions.len(), 6);
        }
        for individual in engine.population() {
            let chromosome = &individual.chromosome;
            assert_eq!(chromosome.lambda, 1);
            assert!((0.0..=1.0).contains(&chromosome.success_probability));
        }

        // A fresh initialization picks the new shape up.
        engine.init_with(&problem).unwrap();
        assert_eq!(engine.step(&problem).unwrap().len(), 20);
        assert!(engine.population().iter().all(|i| i.chromosome.lambda == 3));
    }

    #[test]
    fn test_constrained_run_tracks_violation() {
        let problem = Dtlz1::new(4, 2);
        let config = MocmaConfig {
            // Wide steps relative to the unit box push most offspring outside.
            initial_sigma: 2.0,
            constrained_fitness_function: true,
            ..small_config(13)
        };
        let run = || {
            let mut engine = Mocma::default();
            engine.configure(config.clone()).unwrap();
            engine.init_with(&problem).unwrap();
            let mut saw_infeasible = false;
            for _ in 0..3 {
                let solutions = engine.step(&problem).unwrap();
                assert_eq!(solutions.len(), 12);
                for individual in engine.population() {
                    assert!(problem.constraint_handler().is_feasible(&individual.point));
                    assert!(individual.constraint_violation >= 0.0);
                    let p = individual.chromosome.success_probability;
                    assert!((0.0..=1.0).contains(&p));
                }
                saw_infeasible |= engine.population().iter().any(|i| !i.is_feasible());
            }
            assert!(saw_infeasible);
            engine
        };

        let first = run();
        let second = run();
        assert_eq!(first, second);

        let json = serde_json::to_string(&first).unwrap();
        let restored: Mocma = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, first);
    }

    struct Unbounded {
        handler: BoxConstraintHandler,
    }

    impl MultiObjectiveFunction for Unbounded {
        fn name(&self) -> &str {
            "Unbounded"
        }
        fn number_of_variables(&self) -> usize {
            self.handler.dimensions()
        }
        fn number_of_objectives(&self) -> usize {
            2
        }
        fn constraint_handler(&self) -> &BoxConstraintHandler {
            &self.handler
        }
        fn eval(&self, point: &DVector<f64>) -> DVector<f64> {
            DVector::from_column_slice(&[point.sum(), -point.sum()])
        }
        fn evaluation_counter(&self) -> u64 {
            0
        }
    }

    #[test]
    fn test_unbounded_problem_is_rejected() {
        let mut engine = Mocma::default();
        let infinite = Unbounded {
            handler: BoxConstraintHandler::uniform(2, f64::NEG_INFINITY, f64::INFINITY),
        };
        assert!(matches!(
            engine.init_with(&infinite),
            Err(MocmaError::UnboundedProblem { .. })
        ));

        let empty = Unbounded {
            handler: BoxConstraintHandler::uniform(0, 0.0, 1.0),
        };
        assert!(matches!(
            engine.init_with(&empty),
            Err(MocmaError::UnboundedProblem { .. })
        ));
    }

    #[test]
    fn test_success_rules() {
        let parent = individual(&[1.0, 1.0], 0.0);
        let better = individual(&[0.5, 0.5], 0.0);
        let worse = individual(&[0.5, 1.5], 0.0);
        assert!(is_successful(&better, &parent, false));
        assert!(!is_successful(&worse, &parent, false));

        let better_infeasible = individual(&[0.5, 0.5], 0.1);
        assert!(is_successful(&better_infeasible, &parent, false));
        assert!(!is_successful(&better_infeasible, &parent, true));

        let infeasible_parent = individual(&[0.1, 0.1], 0.5);
        let closer = individual(&[2.0, 2.0], 0.2);
        let farther = individual(&[0.0, 0.0], 0.7);
        assert!(is_successful(&closer, &infeasible_parent, true));
        assert!(!is_successful(&farther, &infeasible_parent, true));
    }

    #[test]
    fn test_save_and_load_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let problem = Dtlz1::new(5, 3);

        let mut engine = Mocma::default();
        engine
            .configure(MocmaConfig {
                use_new_update: true,
                ..small_config(17)
            })
            .unwrap();
        engine.init_with(&problem).unwrap();
        engine.step(&problem).unwrap();
        engine.save(&path).unwrap();

        let mut restored = Mocma::load(&path).unwrap();
        assert_eq!(restored, engine);
        assert_eq!(engine.step(&problem).unwrap(), restored.step(&problem).unwrap());
        assert_eq!(restored.generation(), 2);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Mocma::load(dir.path().join("missing.json")),
            Err(MocmaError::Io(_))
        ));
    }
}
