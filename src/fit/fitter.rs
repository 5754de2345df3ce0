//! Nonlinear least-squares fit of the five-parameter logistic to one series.
//!
//! Given:
//! - day indices `x_i`
//! - observed values `y_i`
//! - a deterministic grid of start points
//!
//! we run Levenberg-Marquardt from every start (in parallel) and keep the
//! converged run with the lowest SSE. A run that ends with the damping at its
//! ceiling only counts when the gradient there is near zero (see
//! `math::lm`). A winner with `b` or `g` on its cap is flagged `at_bound`.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::domain::{FitOptions, LogisticFit, LogisticParams, MIN_POINTS};
use crate::error::AnalysisError;
use crate::fit::start_points;
use crate::math::{LeastSquaresProblem, LmOptions, LmReport, levenberg_marquardt};
use crate::models::{gradient, predict};

/// Residuals `f(x_i; θ) - y_i` for one series.
struct LogisticProblem<'a> {
    x: &'a [f64],
    y: &'a [f64],
}

fn params_from(v: &DVector<f64>) -> LogisticParams {
    LogisticParams::from_array([v[0], v[1], v[2], v[3], v[4]])
}

impl LeastSquaresProblem for LogisticProblem<'_> {
    fn residuals(&self, v: &DVector<f64>) -> Option<DVector<f64>> {
        let params = params_from(v);
        if !params.is_admissible() {
            return None;
        }
        let r = DVector::from_iterator(
            self.x.len(),
            self.x.iter().zip(self.y).map(|(&x, &y)| predict(&params, x) - y),
        );
        r.iter().all(|v| v.is_finite()).then_some(r)
    }

    fn jacobian(&self, v: &DVector<f64>) -> Option<DMatrix<f64>> {
        let params = params_from(v);
        if !params.is_admissible() {
            return None;
        }
        let mut j = DMatrix::<f64>::zeros(self.x.len(), 5);
        for (i, &x) in self.x.iter().enumerate() {
            let row = gradient(&params, x);
            for (k, value) in row.into_iter().enumerate() {
                if !value.is_finite() {
                    return None;
                }
                j[(i, k)] = value;
            }
        }
        Some(j)
    }
}

/// Check that `(x, y)` can be fitted at all.
pub fn validate_series(x: &[f64], y: &[f64]) -> Result<(), AnalysisError> {
    if x.len() != y.len() {
        return Err(AnalysisError::InvalidDataset(format!(
            "series has {} values but x has {}",
            y.len(),
            x.len()
        )));
    }
    if x.len() < MIN_POINTS {
        return Err(AnalysisError::InvalidDataset(format!(
            "need at least {MIN_POINTS} points to fit five parameters, got {}",
            x.len()
        )));
    }
    if let Some(i) = x.iter().position(|v| !(v.is_finite() && *v >= 0.0)) {
        return Err(AnalysisError::InvalidDataset(format!(
            "x[{i}] = {} is not a finite non-negative number",
            x[i]
        )));
    }
    if let Some(i) = y.iter().position(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidDataset(format!("value[{i}] = {} is not finite", y[i])));
    }
    Ok(())
}

/// Fit the five-parameter logistic to `(x, y)`.
///
/// Fails with `InvalidDataset` for unusable input and with `FitDidNotConverge`
/// when no start point converges within `opts.max_evaluations`.
pub fn fit_logistic(x: &[f64], y: &[f64], opts: &FitOptions) -> Result<LogisticFit, AnalysisError> {
    validate_series(x, y)?;

    let problem = LogisticProblem { x, y };
    let lm_opts = LmOptions {
        max_evaluations: opts.max_evaluations,
        ftol: opts.ftol,
        xtol: opts.xtol,
        gtol: opts.gtol,
    };
    let starts = start_points(x, y);

    // Evaluate each start independently (parallel).
    let runs: Vec<(usize, LmReport)> = starts
        .par_iter()
        .enumerate()
        .map(|(idx, start)| {
            let v = DVector::from_row_slice(&start.to_array());
            (idx, levenberg_marquardt(&problem, v, &lm_opts))
        })
        .collect();

    // Deterministic selection: pick the minimum SSE; break ties by start index.
    let mut best: Option<&(usize, LmReport)> = None;
    for run in &runs {
        let (idx, report) = run;
        tracing::debug!(
            start = idx,
            termination = ?report.termination,
            sse = report.sse,
            evaluations = report.evaluations,
            "logistic start finished"
        );
        if !report.termination.is_converged() || !report.sse.is_finite() {
            continue;
        }
        match best {
            Some((best_idx, best_report))
                if report.sse > best_report.sse || (report.sse == best_report.sse && idx > best_idx) => {}
            _ => best = Some(run),
        }
    }

    let Some((_, report)) = best else {
        return Err(AnalysisError::FitDidNotConverge {
            evaluations: opts.max_evaluations,
        });
    };

    let params = params_from(&report.params);
    let rmse = (report.sse / x.len() as f64).sqrt();
    let at_bound = params.at_bound();
    if at_bound {
        tracing::debug!(b = params.b, g = params.g, sse = report.sse, "logistic fit settled on a parameter cap");
    }
    Ok(LogisticFit {
        params,
        sse: report.sse,
        rmse,
        evaluations: report.evaluations,
        iterations: report.iterations,
        at_bound,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant_a() -> (Vec<f64>, Vec<f64>) {
        let x = (0..10).map(f64::from).collect();
        let y = vec![1.0, 2.0, 4.0, 8.0, 15.0, 25.0, 33.0, 38.0, 40.0, 41.0];
        (x, y)
    }

    #[test]
    fn recovers_known_parameters_from_noiseless_samples() {
        let truth = LogisticParams::new(2.0, 4.0, 45.0, 120.0, 1.3);
        let x: Vec<f64> = (0..=26).map(|i| f64::from(i) * 5.0).collect();
        let y: Vec<f64> = x.iter().map(|&x| predict(&truth, x)).collect();

        let fit = fit_logistic(&x, &y, &FitOptions::default()).unwrap();
        let p = fit.params;
        assert!(fit.rmse < 1e-6, "rmse={}", fit.rmse);
        assert!((p.a - truth.a).abs() < 1e-3, "a={}", p.a);
        assert!((p.d - truth.d).abs() < 1e-3, "d={}", p.d);
        assert!((p.b - truth.b).abs() / truth.b < 1e-2, "b={}", p.b);
        assert!((p.c - truth.c).abs() / truth.c < 1e-2, "c={}", p.c);
        assert!((p.g - truth.g).abs() / truth.g < 1e-2, "g={}", p.g);
        assert!(!fit.at_bound);
    }

    #[test]
    fn fits_small_plant_series() {
        let (x, y) = plant_a();
        let fit = fit_logistic(&x, &y, &FitOptions::default()).unwrap();
        assert!(fit.params.is_admissible());
        assert!(fit.rmse < 1.5, "rmse={}", fit.rmse);
        assert!(fit.params.d > 38.0 && fit.params.d < 46.0, "d={}", fit.params.d);
        // Ten plateauing points pull g onto its cap.
        assert!(fit.at_bound, "g={}", fit.params.g);
        assert!((fit.params.g - crate::domain::G_MAX).abs() < 1e-2, "g={}", fit.params.g);
    }

    #[test]
    fn fit_is_deterministic() {
        let (x, y) = plant_a();
        let first = fit_logistic(&x, &y, &FitOptions::default()).unwrap();
        let second = fit_logistic(&x, &y, &FitOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_short_and_mismatched_series() {
        let err = fit_logistic(&[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0], &FitOptions::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidDataset(_)));

        let (x, y) = plant_a();
        let err = fit_logistic(&x, &y[..9], &FitOptions::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidDataset(_)));

        let mut bad = y.clone();
        bad[3] = f64::NAN;
        let err = fit_logistic(&x, &bad, &FitOptions::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidDataset(_)));
    }

    #[test]
    fn tiny_budget_reports_non_convergence() {
        let (x, y) = plant_a();
        let opts = FitOptions {
            max_evaluations: 2,
            ..FitOptions::default()
        };
        let err = fit_logistic(&x, &y, &opts).unwrap_err();
        assert_eq!(err, AnalysisError::FitDidNotConverge { evaluations: 2 });
    }
}
