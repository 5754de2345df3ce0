//! Command-line parsing for the growth-stage analyzer.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting/extraction code. Flags here only override `AnalysisConfig`; they
//! never carry analysis logic.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::domain::{AnalysisConfig, DEFAULT_X_KEY, FailurePolicy, GridSpec};
use crate::error::AppError;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "gs", version, about = "Growth stages (t1..t5) from five-parameter logistic fits")]
pub struct Cli {
    /// Log progress to stderr (`-v` debug, `-vv` trace; default warnings only).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit every entity of a dataset and print parameters and milestones.
    Analyze(AnalyzeArgs),
    /// Write one result table (inferred values, t-values or parameters) to a file.
    Export(ExportArgs),
    /// Run the analysis on a seeded synthetic dataset.
    Demo(DemoArgs),
}

/// Which batch table to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TableKind {
    /// Modeled values on the evaluation grid.
    Inferred,
    /// t1..t5 days and growth rates.
    TValues,
    /// Fitted a, b, c, d, g.
    Parameters,
}

impl TableKind {
    pub fn file_stem(self) -> &'static str {
        match self {
            TableKind::Inferred => "inferred_values",
            TableKind::TValues => "t_values",
            TableKind::Parameters => "parameters_values",
        }
    }
}

/// Dataset location.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Dataset file: CSV with a header row, or a JSON object of key -> numbers.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Name of the independent-variable column.
    #[arg(long, default_value = DEFAULT_X_KEY)]
    pub x_column: String,
}

/// Overrides for `AnalysisConfig` (defaults, then `GS_*` environment, then these).
#[derive(Debug, Args, Clone, Default)]
pub struct AnalysisArgs {
    /// Second-derivative threshold for t1 and t5.
    #[arg(long)]
    pub threshold: Option<f64>,

    /// What to do when one entity fails.
    #[arg(long, value_enum)]
    pub policy: Option<FailurePolicy>,

    /// First x of the evaluation grid.
    #[arg(long)]
    pub grid_start: Option<f64>,

    /// Number of evaluation grid points.
    #[arg(long)]
    pub grid_count: Option<usize>,

    /// Spacing of the evaluation grid.
    #[arg(long)]
    pub grid_step: Option<f64>,

    /// Model evaluation budget per start point.
    #[arg(long)]
    pub max_evaluations: Option<usize>,
}

impl AnalysisArgs {
    /// Apply the flags that were given on top of `base`.
    pub fn apply(&self, base: AnalysisConfig) -> Result<AnalysisConfig, AppError> {
        let mut config = base;
        if let Some(t) = self.threshold {
            config.threshold = t;
        }
        if let Some(p) = self.policy {
            config.policy = p;
        }
        if let Some(n) = self.max_evaluations {
            if n == 0 {
                return Err(AppError::new(crate::error::EXIT_INPUT, "--max-evaluations must be >= 1"));
            }
            config.fit.max_evaluations = n;
        }
        config.grid = GridSpec::new(
            self.grid_start.unwrap_or(config.grid.start),
            self.grid_count.unwrap_or(config.grid.count),
            self.grid_step.unwrap_or(config.grid.step),
        )?;
        Ok(config)
    }
}

#[derive(Debug, Args, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Table to export.
    #[arg(long, value_enum)]
    pub table: TableKind,

    /// Output path (`.json` writes JSON, anything else CSV).
    #[arg(long, value_name = "PATH")]
    pub out: PathBuf,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Number of synthetic entities.
    #[arg(long, default_value_t = 6)]
    pub entities: usize,

    /// Random seed for the synthetic dataset.
    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    /// Table printed after the per-entity summaries.
    #[arg(long, value_enum, default_value_t = TableKind::TValues)]
    pub table: TableKind,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}
