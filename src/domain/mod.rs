//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the input dataset (`Dataset`, `EntitySeries`)
//! - fit outputs (`LogisticParams`, `LogisticFit`)
//! - evaluation and extraction outputs (`GridSpec`, `SeriesTriple`, `MilestoneSet`)
//! - run configuration (`AnalysisConfig`, `FitOptions`, `FailurePolicy`)

pub mod config;
pub mod types;

pub use types::*;
