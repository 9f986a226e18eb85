use std::fmt;

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::compute::Eigenpair;
use crate::matrix::{DataOrder, Matrix};

/// Where a job was when it observed cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Compute,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Compute => write!(f, "compute"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSummary {
    pub rows: usize,
    pub cols: usize,
    pub order: DataOrder,
    pub column_means: Vec<f64>,
}

impl From<&Matrix<f64>> for LoadSummary {
    fn from(matrix: &Matrix<f64>) -> Self {
        Self {
            rows: matrix.rows(),
            cols: matrix.cols(),
            order: matrix.order(),
            column_means: matrix.column_means(),
        }
    }
}

/// What a job produced: a result, or the point at which it was cancelled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Report {
    Loaded(LoadSummary),
    Eigen(Eigenpair),
    Cancelled { stage: Stage, iterations: usize },
}

impl Report {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Text => Ok(self.to_string()),
            OutputFormat::Json => serde_json::to_string_pretty(self),
        }
    }
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{:.6}", v))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded(summary) => {
                writeln!(f, "Loaded {}x{} matrix", summary.rows, summary.cols)?;
                write!(f, "Column means: {}", join(&summary.column_means))
            }
            Self::Eigen(pair) => {
                writeln!(f, "Dominant eigenvalue: {:.10}", pair.value)?;
                writeln!(
                    f,
                    "Iterations: {} ({})",
                    pair.iterations,
                    if pair.converged { "converged" } else { "not converged" }
                )?;
                write!(f, "Eigenvector: {}", join(&pair.vector))
            }
            Self::Cancelled { stage, iterations } => write!(
                f,
                "Cancelled during {} after {} iterations",
                stage, iterations
            ),
        }
    }
}
