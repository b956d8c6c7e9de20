//! Adaptive multivariate normal mutation distribution.
//!
//! Holds the covariance matrix `C` of one individual together with a cached
//! eigendecomposition `C = B · diag(λ) · Bᵀ`. Sampling reads only the cache,
//! so the cache has to be refreshed explicitly after covariance updates.
//! The engine does this once per generation at a fixed point, which keeps
//! replays from the same seed bit-identical.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Relative diagonal jitter added before the second decomposition attempt.
const REGULARIZATION: f64 = 1e-10;

/// Errors raised by the mutation distribution.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DistributionError {
    #[error("Cannot sample from a zero-dimensional distribution")]
    InvalidDimension,
    #[error("Eigendecomposition is stale, refresh it before sampling")]
    StaleDecomposition,
    #[error("Eigendecomposition of {dimension}x{dimension} covariance matrix did not converge")]
    Numerical { dimension: usize },
    #[error("Covariance matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
}

/// Learning rates and path state fed to [`MutationDistribution::update_covariance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningRates {
    /// Evolution path learning rate `c_c`.
    pub evolution_path: f64,
    /// Covariance learning rate `c_cov`.
    pub covariance: f64,
    /// The path was only decayed, not extended by the last step. The lost
    /// variance is compensated by a `c_c (2 - c_c) C` term.
    pub path_stalled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationDistribution {
    covariance_matrix: DMatrix<f64>,
    eigen_values: DVector<f64>,
    eigen_vectors: DMatrix<f64>,
    stale: bool,
}

impl Default for MutationDistribution {
    fn default() -> Self {
        Self {
            covariance_matrix: DMatrix::zeros(0, 0),
            eigen_values: DVector::zeros(0),
            eigen_vectors: DMatrix::zeros(0, 0),
            stale: false,
        }
    }
}

impl MutationDistribution {
    /// Create an `n`-dimensional distribution with zero covariance.
    pub fn new(n: usize) -> Self {
        let mut distribution = Self::default();
        distribution.resize(n);
        distribution
    }

    /// Reallocate to an `n×n` zero covariance matrix.
    ///
    /// The cache is reset to the (exact) decomposition of the zero matrix.
    pub fn resize(&mut self, n: usize) {
        self.covariance_matrix = DMatrix::zeros(n, n);
        self.eigen_values = DVector::zeros(n);
        self.eigen_vectors = DMatrix::identity(n, n);
        self.stale = false;
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.covariance_matrix.nrows()
    }

    pub fn covariance_matrix(&self) -> &DMatrix<f64> {
        &self.covariance_matrix
    }

    pub fn eigen_values(&self) -> &DVector<f64> {
        &self.eigen_values
    }

    pub fn eigen_vectors(&self) -> &DMatrix<f64> {
        &self.eigen_vectors
    }

    /// Whether the cached decomposition lags the covariance matrix.
    #[inline]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Set `C = I` at the current dimension, with its exact decomposition.
    pub fn set_identity(&mut self) {
        let n = self.dimension();
        self.covariance_matrix = DMatrix::identity(n, n);
        self.eigen_values = DVector::from_element(n, 1.0);
        self.eigen_vectors = DMatrix::identity(n, n);
        self.stale = false;
    }

    /// Replace the covariance matrix. The dimension follows the new matrix.
    pub fn set_covariance_matrix(
        &mut self,
        covariance: DMatrix<f64>,
    ) -> Result<(), DistributionError> {
        if !covariance.is_square() {
            return Err(DistributionError::NotSquare {
                rows: covariance.nrows(),
                cols: covariance.ncols(),
            });
        }
        let n = covariance.nrows();
        if n != self.dimension() {
            self.eigen_values = DVector::zeros(n);
            self.eigen_vectors = DMatrix::identity(n, n);
        }
        self.covariance_matrix = covariance;
        self.stale = true;
        Ok(())
    }

    /// Draw `y ~ N(0, C)` as `B · diag(sqrt(λ)) · z`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<DVector<f64>, DistributionError> {
        let n = self.dimension();
        if n == 0 {
            return Err(DistributionError::InvalidDimension);
        }
        if self.stale {
            return Err(DistributionError::StaleDecomposition);
        }

        let scaled = DVector::from_iterator(
            n,
            self.eigen_values.iter().map(|&lambda| {
                let z: f64 = rng.sample(StandardNormal);
                lambda.sqrt() * z
            }),
        );
        Ok(&self.eigen_vectors * scaled)
    }

    /// Apply a rank-one covariance update from the evolution path.
    ///
    /// With `use_new_update` the rank-one term is averaged with the outer
    /// product of the last step, in the manner of a rank-μ update with a
    /// single selected step.
    pub fn update_covariance(
        &mut self,
        evolution_path: &DVector<f64>,
        last_step: &DVector<f64>,
        rates: LearningRates,
        use_new_update: bool,
    ) {
        let c_cov = rates.covariance;
        let c_c = rates.evolution_path;

        let mut rank_one = evolution_path * evolution_path.transpose();
        if rates.path_stalled {
            rank_one += &self.covariance_matrix * (c_c * (2.0 - c_c));
        }

        let target = if use_new_update {
            rank_one * 0.5 + (last_step * last_step.transpose()) * 0.5
        } else {
            rank_one
        };

        self.covariance_matrix = &self.covariance_matrix * (1.0 - c_cov) + target * c_cov;
        self.stale = true;
    }

    /// Recompute the eigendecomposition from the covariance matrix.
    ///
    /// Negative eigenvalues from round-off are clamped to zero. If the
    /// decomposition fails it is retried once on the symmetrized matrix with
    /// a small diagonal regularization.
    pub fn refresh_decomposition(&mut self) -> Result<(), DistributionError> {
        self.refresh_with_budget(max_iterations(self.dimension()))
    }

    /// Refresh with an iteration cap on the first attempt only.
    fn refresh_with_budget(&mut self, first_attempt: usize) -> Result<(), DistributionError> {
        let n = self.dimension();
        if n == 0 {
            self.stale = false;
            return Ok(());
        }

        let (values, vectors) = match decompose(self.covariance_matrix.clone(), first_attempt) {
            Some(decomposition) => decomposition,
            None => {
                log::debug!(
                    "Eigendecomposition of {}x{} covariance failed, retrying regularized",
                    n,
                    n
                );
                let symmetric =
                    (&self.covariance_matrix + self.covariance_matrix.transpose()) * 0.5;
                let scale = (symmetric.trace().abs() / n as f64).max(f64::MIN_POSITIVE);
                let regularized = symmetric + DMatrix::identity(n, n) * (REGULARIZATION * scale);
                decompose(regularized, max_iterations(n))
                    .ok_or(DistributionError::Numerical { dimension: n })?
            }
        };

        self.eigen_values = values.map(|v| v.max(0.0));
        self.eigen_vectors = vectors;
        self.stale = false;
        Ok(())
    }
}

fn max_iterations(n: usize) -> usize {
    1000 * n.max(1)
}

/// Symmetric eigendecomposition, `None` on non-convergence or non-finite output.
fn decompose(
    matrix: DMatrix<f64>,
    max_iterations: usize,
) -> Option<(DVector<f64>, DMatrix<f64>)> {
    if matrix.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let eigen = SymmetricEigen::try_new(matrix, f64::EPSILON, max_iterations)?;
    let finite = eigen.eigenvalues.iter().all(|v| v.is_finite())
        && eigen.eigenvectors.iter().all(|v| v.is_finite());
    finite.then_some((eigen.eigenvalues, eigen.eigenvectors))
}
