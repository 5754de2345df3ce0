//! Dataset-wide aggregation: inferred values, t-values and parameters tables.
//!
//! Entities are independent, so each operation fans out over entities with
//! rayon and collects results back in input order. What happens to a failing
//! entity is decided by `FailurePolicy`:
//!
//! - `Skip`: leave it out of the table and list it in `failures`
//! - `Abort`: fail the whole operation with the first failure in input order

use rayon::prelude::*;

use crate::domain::{
    AnalysisConfig, Dataset, EntitySeries, FailurePolicy, FitOptions, LogisticFit, MilestoneSet, SeriesTriple,
};
use crate::error::AnalysisError;
use crate::fit::fit_logistic;
use crate::milestones::extract_milestones;
use crate::report::{Table, t_value_cells};
use crate::series::{evaluate_series, evaluate_values};

/// One entity that could not be analyzed, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityFailure {
    pub entity: String,
    pub error: AnalysisError,
}

/// A result table plus the entities left out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput {
    pub table: Table,
    pub failures: Vec<EntityFailure>,
}

/// Per-entity results plus the entities that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResults<T> {
    pub results: Vec<(String, T)>,
    pub failures: Vec<EntityFailure>,
}

/// Everything computed for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityAnalysis {
    pub entity: String,
    pub fit: LogisticFit,
    pub series: SeriesTriple,
    pub milestones: MilestoneSet,
}

/// Fit one entity of `dataset`.
pub fn fit_entity(dataset: &Dataset, entity: &EntitySeries, opts: &FitOptions) -> Result<LogisticFit, AnalysisError> {
    fit_logistic(dataset.x(), &entity.values, opts)
}

/// Full pipeline for one entity: fit -> evaluate -> extract.
pub fn analyze_entity(
    dataset: &Dataset,
    entity: &EntitySeries,
    config: &AnalysisConfig,
) -> Result<EntityAnalysis, AnalysisError> {
    let fit = fit_entity(dataset, entity, &config.fit)?;
    let series = evaluate_series(&fit.params, &config.grid)?;
    let milestones = extract_milestones(&series.first, &series.second, config.threshold, &config.grid)?;
    Ok(EntityAnalysis {
        entity: entity.key.clone(),
        fit,
        series,
        milestones,
    })
}

/// Run `op` on every entity in parallel and apply `policy` to the failures.
fn run_batch<T, F>(
    dataset: &Dataset,
    policy: FailurePolicy,
    op: F,
) -> Result<BatchResults<T>, AnalysisError>
where
    T: Send,
    F: Fn(&EntitySeries) -> Result<T, AnalysisError> + Sync,
{
    let outcomes: Vec<(String, Result<T, AnalysisError>)> = dataset
        .entities()
        .par_iter()
        .map(|entity| (entity.key.clone(), op(entity)))
        .collect();

    let mut results = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for (entity, outcome) in outcomes {
        match outcome {
            Ok(value) => results.push((entity, value)),
            Err(error) => {
                tracing::warn!(entity = %entity, error = %error, "entity analysis failed");
                if policy == FailurePolicy::Abort {
                    return Err(AnalysisError::BatchAborted {
                        entity,
                        source: Box::new(error),
                    });
                }
                failures.push(EntityFailure { entity, error });
            }
        }
    }

    tracing::info!(
        entities = dataset.len(),
        succeeded = results.len(),
        failed = failures.len(),
        "batch finished"
    );
    Ok(BatchResults { results, failures })
}

/// Checks that would fail every entity the same way; reported once, up front.
fn check_config(config: &AnalysisConfig) -> Result<(), AnalysisError> {
    config.grid.validate()?;
    if !(config.threshold.is_finite() && config.threshold > 0.0) {
        return Err(AnalysisError::InvalidThreshold(config.threshold));
    }
    Ok(())
}

/// Full per-entity analysis for every entity.
pub fn analyze_all(dataset: &Dataset, config: &AnalysisConfig) -> Result<BatchResults<EntityAnalysis>, AnalysisError> {
    check_config(config)?;
    run_batch(dataset, config.policy, |entity| analyze_entity(dataset, entity, config))
}

/// Clamped model values on the grid, one column per entity.
pub fn inferred_values(dataset: &Dataset, config: &AnalysisConfig) -> Result<BatchOutput, AnalysisError> {
    config.grid.validate()?;
    let batch = run_batch(dataset, config.policy, |entity| {
        let fit = fit_entity(dataset, entity, &config.fit)?;
        evaluate_values(&fit.params, &config.grid)
    })?;

    let mut table = Table::for_grid(&config.grid);
    for (entity, values) in batch.results {
        table.push_column(entity, values)?;
    }
    Ok(BatchOutput {
        table,
        failures: batch.failures,
    })
}

/// t1..t5 day/value pairs at `config.threshold`, one column per entity.
pub fn t_values(dataset: &Dataset, config: &AnalysisConfig) -> Result<BatchOutput, AnalysisError> {
    check_config(config)?;
    let batch = run_batch(dataset, config.policy, |entity| {
        analyze_entity(dataset, entity, config).map(|a| a.milestones)
    })?;

    let mut table = Table::for_t_values();
    for (entity, milestones) in batch.results {
        table.push_column(entity, t_value_cells(&milestones))?;
    }
    Ok(BatchOutput {
        table,
        failures: batch.failures,
    })
}

/// Fitted `a, b, c, d, g`, one column per entity.
pub fn parameter_values(dataset: &Dataset, config: &AnalysisConfig) -> Result<BatchOutput, AnalysisError> {
    let batch = run_batch(dataset, config.policy, |entity| fit_entity(dataset, entity, &config.fit))?;

    let mut table = Table::for_parameters();
    for (entity, fit) in batch.results {
        table.push_column(entity, fit.params.to_array().to_vec())?;
    }
    Ok(BatchOutput {
        table,
        failures: batch.failures,
    })
}
