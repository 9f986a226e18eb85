use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::handler::InterruptPolicy;
use crate::matrix::DataOrder;

/// Command line interface definition for cancelguard.
#[derive(Parser, Debug)]
#[command(name = "cancelguard")]
#[command(about = "Run numeric jobs that stop cleanly on Ctrl+C")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// What Ctrl+C does while a job runs (prompt needs a terminal)
    #[arg(long, value_enum, global = true)]
    pub interrupt: Option<InterruptPolicy>,

    /// Output format for the job report
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbosity")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Load a delimited file and summarize it
    Load(LoadArgs),
    /// Estimate the dominant eigenvalue of a square matrix file
    Eigen(EigenArgs),
}

/// Options shared by every command that reads a matrix file.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Delimited text file, one matrix row per line
    #[arg(value_name = "FILE")]
    pub path: PathBuf,

    /// Field delimiter
    #[arg(short, long, default_value_t = ',')]
    pub delimiter: char,

    /// Storage order for the loaded matrix
    #[arg(long, value_enum, default_value = "row-major")]
    pub order: DataOrder,

    /// Lines to skip before the data (headers)
    #[arg(long, default_value_t = 0)]
    pub skip_lines: usize,
}

#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Args, Debug, Clone)]
pub struct EigenArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Stop after this many iterations
    #[arg(long, default_value_t = 10_000)]
    pub max_iterations: usize,

    /// Relative change in the estimate that counts as converged
    #[arg(long, default_value_t = 1e-10)]
    pub tolerance: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
