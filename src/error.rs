//! Error types.
//!
//! - `AnalysisError` is the library's per-entity failure taxonomy.
//! - `AppError` is what the binary reports: a message plus a process exit code.

use thiserror::Error;

use crate::domain::MilestoneKind;

/// Exit code for input, configuration and I/O problems.
pub const EXIT_INPUT: u8 = 2;
/// Exit code for datasets that cannot be analyzed.
pub const EXIT_DATASET: u8 = 3;
/// Exit code for fitting / extraction failures.
pub const EXIT_ANALYSIS: u8 = 4;

/// Failure of one analysis step for one entity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("fit did not converge within {evaluations} model evaluations")]
    FitDidNotConverge { evaluations: usize },

    #[error("{milestone} not found: no second-derivative value crosses the threshold")]
    MilestoneNotFound { milestone: MilestoneKind },

    #[error("invalid threshold {0}: must be positive and finite")]
    InvalidThreshold(f64),

    #[error("invalid evaluation grid: {0}")]
    InvalidGrid(String),

    #[error("batch aborted at entity '{entity}': {source}")]
    BatchAborted {
        entity: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Process exit code used when this error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            AnalysisError::InvalidDataset(_) => EXIT_DATASET,
            AnalysisError::InvalidThreshold(_) | AnalysisError::InvalidGrid(_) => EXIT_INPUT,
            AnalysisError::FitDidNotConverge { .. }
            | AnalysisError::MilestoneNotFound { .. }
            | AnalysisError::BatchAborted { .. } => EXIT_ANALYSIS,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
