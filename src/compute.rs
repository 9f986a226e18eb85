//! Long-running numeric work that honours the cancellation flag.

use log::{debug, warn};
use serde::Serialize;

use crate::cancel::CancelToken;
use crate::matrix::Matrix;
use crate::progress::Progress;

/// Errors from numeric routines
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error("Matrix is empty")]
    Empty,
    #[error("Matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    #[error("Iteration collapsed to the zero vector after {iterations} iterations")]
    Degenerate { iterations: usize },
}

/// Result of a computation that may be cancelled at a checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Completed(T),
    Cancelled { iterations: usize },
}

impl<T> Outcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Eigenpair {
    pub value: f64,
    pub vector: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// Dominant eigenvalue by power iteration with a Rayleigh quotient estimate.
#[derive(Debug, Clone, Copy)]
pub struct PowerIteration {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for PowerIteration {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: 1e-10,
        }
    }
}

impl PowerIteration {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
        }
    }

    /// Iterate until convergence, `max_iterations`, or cancellation.
    /// The token is checked once per iteration.
    pub fn run(
        &self,
        matrix: &Matrix<f64>,
        token: CancelToken,
    ) -> Result<Outcome<Eigenpair>, ComputeError> {
        if matrix.is_empty() {
            return Err(ComputeError::Empty);
        }
        if !matrix.is_square() {
            return Err(ComputeError::NotSquare {
                rows: matrix.rows(),
                cols: matrix.cols(),
            });
        }

        let n = matrix.rows();
        let mut vector = vec![1.0 / (n as f64).sqrt(); n];
        let mut value = f64::NAN;
        let mut progress = Progress::new("power iteration", 0.0, self.max_iterations as f64);

        for iteration in 1..=self.max_iterations {
            if token.is_cancelled() {
                warn!("Cancellation requested, stopping after {} iterations", iteration - 1);
                return Ok(Outcome::Cancelled {
                    iterations: iteration - 1,
                });
            }

            let product = matrix.mul_vec(&vector);
            let estimate = dot(&vector, &product);
            let norm = dot(&product, &product).sqrt();
            if norm == 0.0 {
                return Err(ComputeError::Degenerate { iterations: iteration });
            }

            let converged = (estimate - value).abs() <= self.tolerance * estimate.abs().max(1.0);
            vector = product.into_iter().map(|x| x / norm).collect();
            value = estimate;
            progress.update(iteration as f64);

            if converged {
                debug!("Converged after {} iterations", iteration);
                return Ok(Outcome::Completed(Eigenpair {
                    value,
                    vector,
                    iterations: iteration,
                    converged: true,
                }));
            }
        }

        Ok(Outcome::Completed(Eigenpair {
            value,
            vector,
            iterations: self.max_iterations,
            converged: false,
        }))
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
