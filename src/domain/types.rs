//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and extraction
//! - exported to CSV/JSON
//! - handed to a presentation layer as plain data

use std::collections::HashSet;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Default name of the independent-variable column.
pub const DEFAULT_X_KEY: &str = "x";

/// Minimum number of observations needed to identify five parameters.
pub const MIN_POINTS: usize = 5;

/// One measured entity (e.g. one plant): its key and its measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySeries {
    pub key: String,
    pub values: Vec<f64>,
}

/// A set of entity series sharing one independent-variable sequence.
///
/// Construction only checks structure (unique keys, an `x` column). Per-entity
/// problems such as a length mismatch are reported when that entity is
/// analyzed, so one bad column does not take the others down with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x_key: String,
    x: Vec<f64>,
    entities: Vec<EntitySeries>,
}

impl Dataset {
    pub fn new(
        x_key: impl Into<String>,
        x: Vec<f64>,
        entities: Vec<EntitySeries>,
    ) -> Result<Self, AnalysisError> {
        let x_key = x_key.into();
        let mut seen = HashSet::new();
        for entity in &entities {
            if entity.key == x_key {
                return Err(AnalysisError::InvalidDataset(format!(
                    "entity key '{}' collides with the x column",
                    entity.key
                )));
            }
            if !seen.insert(entity.key.as_str()) {
                return Err(AnalysisError::InvalidDataset(format!(
                    "duplicate entity key '{}'",
                    entity.key
                )));
            }
        }
        Ok(Self { x_key, x, entities })
    }

    /// Build a dataset from named columns, picking out `x_key` as the x column.
    ///
    /// Column order is preserved for the remaining entities.
    pub fn from_columns(
        columns: Vec<(String, Vec<f64>)>,
        x_key: &str,
    ) -> Result<Self, AnalysisError> {
        let mut x = None;
        let mut entities = Vec::with_capacity(columns.len().saturating_sub(1));
        for (key, values) in columns {
            if key == x_key {
                if x.is_some() {
                    return Err(AnalysisError::InvalidDataset(format!(
                        "duplicate x column '{x_key}'"
                    )));
                }
                x = Some(values);
            } else {
                entities.push(EntitySeries { key, values });
            }
        }
        let x = x.ok_or_else(|| {
            AnalysisError::InvalidDataset(format!("missing x column '{x_key}'"))
        })?;
        Self::new(x_key, x, entities)
    }

    pub fn x_key(&self) -> &str {
        &self.x_key
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn entities(&self) -> &[EntitySeries] {
        &self.entities
    }

    pub fn entity(&self, key: &str) -> Option<&EntitySeries> {
        self.entities.iter().find(|e| e.key == key)
    }

    pub fn entity_keys(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }
}

/// Largest slope factor the fitter may return.
pub const B_MAX: f64 = 200.0;

/// Largest asymmetry factor the fitter may return.
///
/// Growth series that stop before their inflection is fully resolved have no
/// finite least-squares optimum: `g` and `c` run off to infinity together
/// (the Weibull limit of the curve). Capping `g` turns that valley into a
/// boundary optimum the optimizer can settle on.
pub const G_MAX: f64 = 100.0;

/// Relative distance from `B_MAX`/`G_MAX` within which a fit is flagged as at its bound.
pub const BOUND_RTOL: f64 = 1e-4;

/// The five parameters of `f(x) = d + (a - d) / (1 + (x/c)^b)^g`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Response at `x = 0` (lower asymptote for growth curves).
    pub a: f64,
    /// Slope factor.
    pub b: f64,
    /// Location of the transition (`x` scale); must be positive.
    pub c: f64,
    /// Response as `x → ∞` (upper asymptote for growth curves).
    pub d: f64,
    /// Asymmetry factor.
    pub g: f64,
}

impl LogisticParams {
    pub const NAMES: [&'static str; 5] = ["a", "b", "c", "d", "g"];

    pub fn new(a: f64, b: f64, c: f64, d: f64, g: f64) -> Self {
        Self { a, b, c, d, g }
    }

    pub fn to_array(self) -> [f64; 5] {
        [self.a, self.b, self.c, self.d, self.g]
    }

    pub fn from_array(p: [f64; 5]) -> Self {
        Self::new(p[0], p[1], p[2], p[3], p[4])
    }

    /// True when the parameters lie in the region the fitter is allowed to return.
    ///
    /// `b` in `(0, B_MAX]`, `c > 0`, `g` in `(0, G_MAX]`; everything finite.
    pub fn is_admissible(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
            && self.b > 0.0
            && self.b <= B_MAX
            && self.c > 0.0
            && self.g > 0.0
            && self.g <= G_MAX
    }

    /// True when `b` or `g` sits on its cap, i.e. the optimum was clipped by the
    /// admissible region rather than found in its interior.
    pub fn at_bound(&self) -> bool {
        self.b >= B_MAX * (1.0 - BOUND_RTOL) || self.g >= G_MAX * (1.0 - BOUND_RTOL)
    }
}

/// Fit output for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticFit {
    pub params: LogisticParams,
    pub sse: f64,
    pub rmse: f64,
    /// Model evaluations spent by the winning start.
    pub evaluations: usize,
    /// Accepted optimizer steps of the winning start.
    pub iterations: usize,
    /// `b` or `g` ended on its cap (see `LogisticParams::at_bound`).
    #[serde(default)]
    pub at_bound: bool,
}

/// Options for the nonlinear least-squares fitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    /// Evaluation budget per start point.
    pub max_evaluations: usize,
    /// Relative SSE reduction below which an accepted step counts as converged.
    pub ftol: f64,
    /// Relative step size below which the iteration counts as converged.
    pub xtol: f64,
    /// Scaled-gradient size below which the iteration counts as converged.
    pub gtol: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_evaluations: 5000,
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-8,
        }
    }
}

/// Evaluation grid: `count` points `start, start + step, ...`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub start: f64,
    pub count: usize,
    pub step: f64,
}

impl Default for GridSpec {
    /// 130 points spanning 0..=129 with unit step.
    fn default() -> Self {
        Self {
            start: 0.0,
            count: 130,
            step: 1.0,
        }
    }
}

impl GridSpec {
    pub fn new(start: f64, count: usize, step: f64) -> Result<Self, AnalysisError> {
        let grid = Self { start, count, step };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.count == 0 {
            return Err(AnalysisError::InvalidGrid("count must be >= 1".into()));
        }
        if !(self.start.is_finite() && self.start >= 0.0) {
            return Err(AnalysisError::InvalidGrid(format!(
                "start must be finite and >= 0, got {}",
                self.start
            )));
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(AnalysisError::InvalidGrid(format!(
                "step must be finite and > 0, got {}",
                self.step
            )));
        }
        Ok(())
    }

    /// The x-value of grid point `index`.
    pub fn x_at(&self, index: usize) -> f64 {
        self.start + self.step * index as f64
    }

    pub fn points(&self) -> Vec<f64> {
        (0..self.count).map(|i| self.x_at(i)).collect()
    }
}

/// Model value and derivatives over an evaluation grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesTriple {
    pub x: Vec<f64>,
    /// Model values, clamped at zero.
    pub values: Vec<f64>,
    pub first: Vec<f64>,
    pub second: Vec<f64>,
}

impl SeriesTriple {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneKind {
    T1,
    T2,
    T3,
    T4,
    T5,
}

impl MilestoneKind {
    pub const ALL: [MilestoneKind; 5] = [
        MilestoneKind::T1,
        MilestoneKind::T2,
        MilestoneKind::T3,
        MilestoneKind::T4,
        MilestoneKind::T5,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MilestoneKind::T1 => "t1",
            MilestoneKind::T2 => "t2",
            MilestoneKind::T3 => "t3",
            MilestoneKind::T4 => "t4",
            MilestoneKind::T5 => "t5",
        }
    }
}

impl std::fmt::Display for MilestoneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One growth-stage timepoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Index into the evaluation grid.
    pub index: usize,
    /// Grid x-value at `index`.
    pub day: f64,
    /// First-derivative value reported for this milestone.
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MilestoneSet {
    pub t1: Milestone,
    pub t2: Milestone,
    pub t3: Milestone,
    pub t4: Milestone,
    pub t5: Milestone,
}

impl MilestoneSet {
    pub fn get(&self, kind: MilestoneKind) -> &Milestone {
        match kind {
            MilestoneKind::T1 => &self.t1,
            MilestoneKind::T2 => &self.t2,
            MilestoneKind::T3 => &self.t3,
            MilestoneKind::T4 => &self.t4,
            MilestoneKind::T5 => &self.t5,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MilestoneKind, &Milestone)> {
        MilestoneKind::ALL.into_iter().map(move |k| (k, self.get(k)))
    }

    pub fn indices(&self) -> [usize; 5] {
        [self.t1.index, self.t2.index, self.t3.index, self.t4.index, self.t5.index]
    }
}

/// What the batch operations do when one entity fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Leave the entity out of the table and report it.
    #[default]
    Skip,
    /// Fail the whole batch at the first failing entity.
    Abort,
}

/// Everything the batch pipeline needs besides the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub grid: GridSpec,
    pub threshold: f64,
    pub policy: FailurePolicy,
    pub fit: FitOptions,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            grid: GridSpec::default(),
            threshold: 0.005,
            policy: FailurePolicy::Skip,
            fit: FitOptions::default(),
        }
    }
}
