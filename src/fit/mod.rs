//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - derive a deterministic grid of start points from the data
//! - run Levenberg-Marquardt from each start (parallel)
//! - keep the best converged run, or report non-convergence

pub mod fitter;
pub mod starts;

pub use fitter::*;
pub use starts::*;
