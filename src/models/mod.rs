//! Five-parameter logistic growth model.
//!
//! The model is implemented as small, pure functions so that fitting, series
//! evaluation and tests can share them.

pub mod model;

pub use model::*;
