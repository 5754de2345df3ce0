//! Levenberg-Marquardt for small nonlinear least-squares problems.
//!
//! Each iteration linearizes the residuals around the current point and solves
//!
//! ```text
//! minimize ‖J δ + r‖² + λ ‖D δ‖²
//! ```
//!
//! where `D` holds the running maximum of the Jacobian column norms (Marquardt
//! scaling, as in MINPACK). Successful steps shrink `λ` (towards Gauss-Newton),
//! rejected steps grow it (towards short gradient steps), so `λ` plays the role
//! of an inverse trust-region radius.
//!
//! The solver counts model evaluations (one per residual vector, one per
//! Jacobian) and stops hard when the budget is spent.
//!
//! When `λ` reaches its ceiling the run ends at the current point. That point
//! counts as converged (`Stalled`) only if the gradient cosine there is within
//! `STALL_GRAD_COS`; otherwise it is `NoProgress`. A Jacobian that turns
//! non-finite after the first iteration ends the run as `NonFiniteJacobian`.
//! Neither of those is converged.

use nalgebra::{DMatrix, DVector};

use crate::math::solve_least_squares;

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-15;
const LAMBDA_MAX: f64 = 1e16;
const LAMBDA_FACTOR: f64 = 10.0;
const DIAG_FLOOR: f64 = 1e-12;
/// Largest gradient cosine at which a `λ`-ceiling stop still counts as converged.
pub const STALL_GRAD_COS: f64 = 1e-4;

/// A residual function `r(θ)` and its Jacobian `∂r/∂θ`.
///
/// Returning `None` marks `θ` as outside the admissible region (or producing
/// non-finite output); the solver then treats the step as rejected.
pub trait LeastSquaresProblem {
    fn residuals(&self, params: &DVector<f64>) -> Option<DVector<f64>>;
    fn jacobian(&self, params: &DVector<f64>) -> Option<DMatrix<f64>>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmOptions {
    pub max_evaluations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Relative SSE reduction (actual and predicted) fell below `ftol`.
    SseConverged,
    /// Scaled step length fell below `xtol`.
    StepConverged,
    /// Residuals are orthogonal to the Jacobian columns (within `gtol`).
    GradientConverged,
    /// Residuals are exactly zero.
    ExactFit,
    /// `λ` hit its ceiling at a near-stationary point (see `STALL_GRAD_COS`).
    Stalled,
    /// `λ` hit its ceiling while the gradient was still clearly non-zero.
    NoProgress,
    /// The Jacobian became non-finite or inadmissible mid-run.
    NonFiniteJacobian,
    /// Evaluation budget spent before any convergence test passed.
    BudgetExhausted,
    /// The starting point is inadmissible or its Jacobian is not finite.
    InvalidStart,
}

impl Termination {
    pub fn is_converged(self) -> bool {
        matches!(
            self,
            Termination::SseConverged
                | Termination::StepConverged
                | Termination::GradientConverged
                | Termination::ExactFit
                | Termination::Stalled
        )
    }

    fn at_lambda_ceiling(grad_cos: f64) -> Self {
        if grad_cos <= STALL_GRAD_COS {
            Termination::Stalled
        } else {
            Termination::NoProgress
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LmReport {
    pub params: DVector<f64>,
    pub sse: f64,
    pub evaluations: usize,
    pub iterations: usize,
    pub termination: Termination,
}

/// Minimize `‖r(θ)‖²` starting from `start`.
pub fn levenberg_marquardt<P: LeastSquaresProblem>(
    problem: &P,
    start: DVector<f64>,
    opts: &LmOptions,
) -> LmReport {
    let n = start.len();
    let mut params = start;
    let mut evaluations = 1usize;
    let mut iterations = 0usize;

    let finish = |params: DVector<f64>, sse: f64, evaluations, iterations, termination| LmReport {
        params,
        sse,
        evaluations,
        iterations,
        termination,
    };

    let Some(mut residuals) = problem.residuals(&params) else {
        return finish(params, f64::INFINITY, evaluations, iterations, Termination::InvalidStart);
    };
    let mut sse = residuals.norm_squared();

    let mut lambda = LAMBDA_INIT;
    let mut diag = DVector::<f64>::zeros(n);

    loop {
        if sse == 0.0 {
            return finish(params, sse, evaluations, iterations, Termination::ExactFit);
        }
        if evaluations >= opts.max_evaluations {
            return finish(params, sse, evaluations, iterations, Termination::BudgetExhausted);
        }

        let Some(jac) = problem.jacobian(&params) else {
            let termination = if iterations == 0 {
                Termination::InvalidStart
            } else {
                Termination::NonFiniteJacobian
            };
            return finish(params, sse, evaluations, iterations, termination);
        };
        evaluations += 1;

        // Cosine between the residual vector and each Jacobian column.
        let grad = jac.transpose() * &residuals;
        let r_norm = sse.sqrt();
        let mut grad_cos = 0.0_f64;
        for j in 0..n {
            let col_norm = jac.column(j).norm();
            diag[j] = diag[j].max(col_norm).max(DIAG_FLOOR);
            if col_norm > 0.0 {
                grad_cos = grad_cos.max(grad[j].abs() / (col_norm * r_norm));
            }
        }
        if grad_cos <= opts.gtol {
            return finish(params, sse, evaluations, iterations, Termination::GradientConverged);
        }

        // Inner loop: adjust λ until a step reduces the SSE.
        loop {
            if evaluations >= opts.max_evaluations {
                return finish(params, sse, evaluations, iterations, Termination::BudgetExhausted);
            }

            let m = jac.nrows();
            let mut a = DMatrix::<f64>::zeros(m + n, n);
            let mut rhs = DVector::<f64>::zeros(m + n);
            a.view_mut((0, 0), (m, n)).copy_from(&jac);
            for i in 0..m {
                rhs[i] = -residuals[i];
            }
            let damping = lambda.sqrt();
            for j in 0..n {
                a[(m + j, j)] = damping * diag[j];
            }

            let Some(step) = solve_least_squares(&a, &rhs) else {
                lambda *= LAMBDA_FACTOR;
                if lambda > LAMBDA_MAX {
                    let termination = Termination::at_lambda_ceiling(grad_cos);
                    return finish(params, sse, evaluations, iterations, termination);
                }
                continue;
            };

            let scaled_step = diag.component_mul(&step).norm();
            let scaled_params = diag.component_mul(&params).norm();
            let step_small = scaled_step <= opts.xtol * (scaled_params + opts.xtol);

            let trial = &params + &step;
            evaluations += 1;
            let trial_residuals = problem.residuals(&trial);
            let trial_sse = trial_residuals
                .as_ref()
                .map(|r| r.norm_squared())
                .unwrap_or(f64::INFINITY);

            if let (Some(trial_residuals), true) = (trial_residuals, trial_sse < sse) {
                let actual = (sse - trial_sse) / sse;
                let linearized = (&residuals + &jac * &step).norm_squared();
                let predicted = (sse - linearized) / sse;

                params = trial;
                residuals = trial_residuals;
                sse = trial_sse;
                iterations += 1;
                lambda = (lambda / LAMBDA_FACTOR).max(LAMBDA_MIN);

                if actual <= opts.ftol && predicted.abs() <= opts.ftol {
                    return finish(params, sse, evaluations, iterations, Termination::SseConverged);
                }
                if step_small {
                    return finish(params, sse, evaluations, iterations, Termination::StepConverged);
                }
                break;
            }

            if step_small {
                return finish(params, sse, evaluations, iterations, Termination::StepConverged);
            }
            lambda *= LAMBDA_FACTOR;
            if lambda > LAMBDA_MAX {
                let termination = Termination::at_lambda_ceiling(grad_cos);
                return finish(params, sse, evaluations, iterations, termination);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `y = p0 * exp(p1 * x)`, residuals `model - y`.
    struct ExpDecay {
        x: Vec<f64>,
        y: Vec<f64>,
    }

    impl LeastSquaresProblem for ExpDecay {
        fn residuals(&self, p: &DVector<f64>) -> Option<DVector<f64>> {
            Some(DVector::from_iterator(
                self.x.len(),
                self.x.iter().zip(&self.y).map(|(&x, &y)| p[0] * (p[1] * x).exp() - y),
            ))
        }

        fn jacobian(&self, p: &DVector<f64>) -> Option<DMatrix<f64>> {
            let mut j = DMatrix::zeros(self.x.len(), 2);
            for (i, &x) in self.x.iter().enumerate() {
                let e = (p[1] * x).exp();
                j[(i, 0)] = e;
                j[(i, 1)] = p[0] * x * e;
            }
            Some(j)
        }
    }

    fn options() -> LmOptions {
        LmOptions {
            max_evaluations: 2000,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-12,
        }
    }

    fn problem() -> ExpDecay {
        let x: Vec<f64> = (0..12).map(|i| i as f64 * 0.5).collect();
        let y = x.iter().map(|&x| 3.0 * (-0.7 * x).exp()).collect();
        ExpDecay { x, y }
    }

    #[test]
    fn recovers_exponential_decay() {
        let report = levenberg_marquardt(&problem(), DVector::from_row_slice(&[1.0, -0.1]), &options());
        assert!(report.termination.is_converged(), "{:?}", report.termination);
        assert!((report.params[0] - 3.0).abs() < 1e-6);
        assert!((report.params[1] + 0.7).abs() < 1e-6);
        assert!(report.sse < 1e-12);
    }

    #[test]
    fn stops_when_budget_is_spent() {
        let mut opts = options();
        opts.max_evaluations = 3;
        let report = levenberg_marquardt(&problem(), DVector::from_row_slice(&[1.0, -0.1]), &opts);
        assert_eq!(report.termination, Termination::BudgetExhausted);
        assert!(report.evaluations <= 3);
    }

    #[test]
    fn reports_invalid_start() {
        struct Never;
        impl LeastSquaresProblem for Never {
            fn residuals(&self, _: &DVector<f64>) -> Option<DVector<f64>> {
                None
            }
            fn jacobian(&self, _: &DVector<f64>) -> Option<DMatrix<f64>> {
                None
            }
        }
        let report = levenberg_marquardt(&Never, DVector::from_row_slice(&[1.0]), &options());
        assert_eq!(report.termination, Termination::InvalidStart);
        assert!(!report.termination.is_converged());
    }

    #[test]
    fn jacobian_failing_mid_run_is_not_converged() {
        struct FlakyJacobian {
            inner: ExpDecay,
            calls: std::cell::Cell<usize>,
        }
        impl LeastSquaresProblem for FlakyJacobian {
            fn residuals(&self, p: &DVector<f64>) -> Option<DVector<f64>> {
                self.inner.residuals(p)
            }
            fn jacobian(&self, p: &DVector<f64>) -> Option<DMatrix<f64>> {
                self.calls.set(self.calls.get() + 1);
                if self.calls.get() > 1 { None } else { self.inner.jacobian(p) }
            }
        }

        let flaky = FlakyJacobian {
            inner: problem(),
            calls: std::cell::Cell::new(0),
        };
        let report = levenberg_marquardt(&flaky, DVector::from_row_slice(&[1.0, -0.1]), &options());
        assert_eq!(report.termination, Termination::NonFiniteJacobian);
        assert!(report.iterations >= 1);
        assert!(!report.termination.is_converged());
    }

    /// One parameter, fixed residuals `r` and Jacobian column `j`; every move
    /// away from the start is inadmissible, so `λ` climbs to its ceiling.
    struct Pinned {
        r: Vec<f64>,
        j: Vec<f64>,
    }

    impl LeastSquaresProblem for Pinned {
        fn residuals(&self, p: &DVector<f64>) -> Option<DVector<f64>> {
            (p[0] == 1.0).then(|| DVector::from_row_slice(&self.r))
        }
        fn jacobian(&self, _: &DVector<f64>) -> Option<DMatrix<f64>> {
            Some(DMatrix::from_column_slice(self.j.len(), 1, &self.j))
        }
    }

    #[test]
    fn lambda_ceiling_counts_only_near_a_stationary_point() {
        let opts = LmOptions {
            max_evaluations: 1000,
            ftol: 0.0,
            xtol: 0.0,
            gtol: 0.0,
        };
        let start = || DVector::from_row_slice(&[1.0]);

        // Residuals along the Jacobian column: a clear descent direction.
        let steep = Pinned {
            r: vec![1.0, 1.0],
            j: vec![1.0, 0.0],
        };
        let report = levenberg_marquardt(&steep, start(), &opts);
        assert_eq!(report.termination, Termination::NoProgress);
        assert!(!report.termination.is_converged());

        // Residuals almost orthogonal to the column: gradient cosine 1e-6.
        let flat = Pinned {
            r: vec![1e-6, 1.0],
            j: vec![1.0, 0.0],
        };
        let report = levenberg_marquardt(&flat, start(), &opts);
        assert_eq!(report.termination, Termination::Stalled);
        assert!(report.termination.is_converged());
        assert_eq!(report.params[0], 1.0);
    }
}
