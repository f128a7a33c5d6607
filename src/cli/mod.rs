//! Command-line parsing for the best-subset regression search.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! search and math code. `app` maps these structs onto `SearchConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "subset", version, about = "Best-subset regression search (OLS + principal-component regression)")]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search a CSV file for the best regression models.
    Search(SearchArgs),
    /// Run the search on a generated sample with known coefficients.
    Demo(DemoArgs),
}

#[derive(Debug, Args, Clone)]
pub struct SearchArgs {
    /// CSV file with a header row.
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Dependent column (default: the first column).
    #[arg(short = 'y', long)]
    pub dependent: Option<String>,

    /// Candidate columns, comma separated (default: every other column).
    #[arg(long, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,

    /// Column with per-row weights (weighted least squares).
    #[arg(long)]
    pub weight: Option<String>,

    /// Values meaning "missing", comma separated (empty cells always are).
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub missing: Vec<f64>,

    #[command(flatten)]
    pub settings: SearchSettings,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Number of generated rows.
    #[arg(short = 'n', long, default_value_t = 120)]
    pub rows: usize,

    /// Number of candidate variables.
    #[arg(long, default_value_t = 8)]
    pub candidates: usize,

    /// Leading candidates that actually drive Y.
    #[arg(long, default_value_t = 3)]
    pub informative: usize,

    /// Standard deviation of the noise on Y.
    #[arg(long, default_value_t = 0.5)]
    pub noise: f64,

    /// Probability that a candidate cell is missing.
    #[arg(long, default_value_t = 0.0)]
    pub missing_rate: f64,

    /// Random seed for sample generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub settings: SearchSettings,
}

/// Options shared by every command that runs a search.
#[derive(Debug, Args, Clone)]
pub struct SearchSettings {
    /// Number of best models to keep.
    #[arg(short = 'k', long, default_value_t = 10)]
    pub keep: usize,

    /// Two-sided confidence level for coefficient t-tests.
    #[arg(long, default_value_t = 0.95)]
    pub confidence: f64,

    /// Fixed critical |t| (overrides --confidence).
    #[arg(long)]
    pub critical_t: Option<f64>,

    /// Minimum usable rows per combination.
    #[arg(long, default_value_t = 6)]
    pub min_obs: usize,

    /// Maximum principal components per combination.
    #[arg(long)]
    pub max_components: Option<usize>,

    /// Largest combination size to try.
    #[arg(long)]
    pub max_size: Option<usize>,

    /// Stop after this many combination evaluations.
    #[arg(long)]
    pub max_evaluations: Option<usize>,

    /// Stop after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub time_limit: Option<f64>,

    /// Evaluate combinations on one thread.
    #[arg(long)]
    pub sequential: bool,

    /// Ranked models to print.
    #[arg(long, default_value_t = 10)]
    pub show: usize,

    /// Largest residuals of the best model to print (0 to skip).
    #[arg(long, default_value_t = 5)]
    pub residuals: usize,

    /// Export ranked models to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,

    /// Export observed/fitted/residual rows of the best model to CSV.
    #[arg(long = "export-residuals")]
    pub export_residuals: Option<PathBuf>,
}
