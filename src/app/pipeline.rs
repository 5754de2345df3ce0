//! Shared analysis pipeline used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! dataset -> config -> batch operation -> table
//!
//! The command handlers can then focus on presentation (printing vs files).

use crate::batch::{self, BatchOutput};
use crate::cli::{AnalysisArgs, InputArgs, TableKind};
use crate::domain::{AnalysisConfig, Dataset};
use crate::error::AppError;
use crate::io::ingest::{IngestedData, load_dataset};

/// Defaults, then `GS_*` environment variables, then command-line flags.
pub fn resolve_config(args: &AnalysisArgs) -> Result<AnalysisConfig, AppError> {
    let base = AnalysisConfig::from_env()?;
    args.apply(base)
}

/// Load the dataset and log every skipped cell.
pub fn load_input(input: &InputArgs) -> Result<IngestedData, AppError> {
    let ingest = load_dataset(&input.file, &input.x_column)?;
    for e in &ingest.row_errors {
        tracing::warn!(
            line = e.line,
            column = e.column.as_deref().unwrap_or("-"),
            "{}",
            e.message
        );
    }
    if ingest.dataset.is_empty() {
        return Err(AppError::new(
            crate::error::EXIT_DATASET,
            format!("'{}' has no entity columns besides '{}'", input.file.display(), input.x_column),
        ));
    }
    Ok(ingest)
}

/// Run the batch operation behind `kind`.
pub fn build_table(dataset: &Dataset, config: &AnalysisConfig, kind: TableKind) -> Result<BatchOutput, AppError> {
    let out = match kind {
        TableKind::Inferred => batch::inferred_values(dataset, config)?,
        TableKind::TValues => batch::t_values(dataset, config)?,
        TableKind::Parameters => batch::parameter_values(dataset, config)?,
    };
    Ok(out)
}
