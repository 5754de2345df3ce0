//! Linear least squares solver.
//!
//! Every Levenberg-Marquardt step solves a small linear problem of the form:
//!
//! ```text
//! minimize ‖J δ + r‖² + λ ‖D δ‖²
//! ```
//!
//! which we rewrite as one ordinary least squares problem on the stacked matrix
//! `[J; √λ D]`, so this module only needs a tall-matrix solver.
//!
//! Implementation choices:
//! - SVD instead of normal equations: the Jacobian of the five-parameter
//!   logistic is badly conditioned (`c` and `g` trade off against each other),
//!   and forming `JᵀJ` would square that condition number.
//! - Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices, so it is not an option here.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-14, 1e-10, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}
