mod report;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use log::{info, warn};

use crate::cancel::CancelToken;
use crate::cli::{Command, InputArgs};
use crate::compute::{ComputeError, Outcome, PowerIteration};
use crate::delimited::{DelimitedReader, LoadError};
use crate::guard::{GuardError, InterruptGuard};
use crate::matrix::Matrix;
use crate::signal::SignalOps;

pub use report::{LoadSummary, Report, Stage};

/// Exit status for a run that was cancelled from the interrupt prompt.
pub const EXIT_CANCELLED: i32 = 130;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Compute(#[from] ComputeError),
    #[error(transparent)]
    Guard(#[from] GuardError),
}

/// Runs jobs with the interrupt guard held for their whole duration.
pub struct App<S: SignalOps> {
    guard: InterruptGuard<S>,
}

impl<S: SignalOps> App<S> {
    pub fn new(guard: InterruptGuard<S>) -> Self {
        Self { guard }
    }

    pub fn guard(&self) -> &InterruptGuard<S> {
        &self.guard
    }

    pub fn run(&mut self, command: &Command) -> Result<Report, AppError> {
        info!("Ctrl+C policy: {}", self.guard.policy());
        let report = self.guard.run(|token| execute(command, token))??;
        if report.is_cancelled() {
            warn!("Job cancelled, no result produced");
        }
        Ok(report)
    }
}

fn execute(command: &Command, token: CancelToken) -> Result<Report, AppError> {
    match command {
        Command::Load(args) => match load_matrix(&args.input, token)? {
            Some(matrix) => Ok(Report::Loaded(LoadSummary::from(&matrix))),
            None => Ok(cancelled_load()),
        },
        Command::Eigen(args) => {
            let Some(matrix) = load_matrix(&args.input, token)? else {
                return Ok(cancelled_load());
            };
            let solver = PowerIteration::new(args.max_iterations, args.tolerance);
            match solver.run(&matrix, token)? {
                Outcome::Completed(pair) => Ok(Report::Eigen(pair)),
                Outcome::Cancelled { iterations } => Ok(Report::Cancelled {
                    stage: Stage::Compute,
                    iterations,
                }),
            }
        }
    }
}

fn cancelled_load() -> Report {
    Report::Cancelled {
        stage: Stage::Load,
        iterations: 0,
    }
}

/// `Ok(None)` when the load was cancelled.
fn load_matrix(input: &InputArgs, token: CancelToken) -> Result<Option<Matrix<f64>>, AppError> {
    let file = File::open(&input.path).map_err(|source| AppError::Open {
        path: input.path.clone(),
        source,
    })?;
    let mut reader = DelimitedReader::new(BufReader::new(file))
        .with_delimiter(input.delimiter)
        .with_order(input.order)
        .with_cancel_token(token);

    let loaded = reader
        .skip_lines(input.skip_lines)
        .and_then(|_| reader.read_matrix());
    match loaded {
        Ok(matrix) => {
            info!(
                "Loaded {}x{} matrix from {}",
                matrix.rows(),
                matrix.cols(),
                input.path.display()
            );
            Ok(Some(matrix))
        }
        Err(LoadError::Cancelled(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
