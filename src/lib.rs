//! `growth-stages` library crate.
//!
//! Fits a five-parameter logistic curve per entity, evaluates it and its
//! derivatives over a grid, and extracts the t1..t5 growth milestones.
//!
//! The binary (`gs`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the batch operations are reusable from other front ends

pub mod app;
pub mod batch;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod milestones;
pub mod models;
pub mod report;
pub mod series;
