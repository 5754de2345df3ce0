//! Model and derivative series over an evaluation grid.

use crate::domain::{GridSpec, LogisticParams, SeriesTriple};
use crate::error::AnalysisError;
use crate::models::{first_derivative, predict, second_derivative};

/// Clamp a modeled value at zero: growth cannot be negative.
///
/// Every producer of modeled values goes through this, so tables and series agree.
pub fn clamp_value(v: f64) -> f64 {
    if v > 0.0 { v } else { 0.0 }
}

/// Clamped model values at every grid point.
pub fn evaluate_values(params: &LogisticParams, grid: &GridSpec) -> Result<Vec<f64>, AnalysisError> {
    grid.validate()?;
    Ok(grid.points().into_iter().map(|x| clamp_value(predict(params, x))).collect())
}

/// Model values (clamped) and both derivatives (unclamped) over `grid`.
pub fn evaluate_series(params: &LogisticParams, grid: &GridSpec) -> Result<SeriesTriple, AnalysisError> {
    grid.validate()?;
    let x = grid.points();
    let mut values = Vec::with_capacity(x.len());
    let mut first = Vec::with_capacity(x.len());
    let mut second = Vec::with_capacity(x.len());
    for &xi in &x {
        values.push(clamp_value(predict(params, xi)));
        first.push(first_derivative(params, xi));
        second.push(second_derivative(params, xi));
    }
    Ok(SeriesTriple {
        x,
        values,
        first,
        second,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_has_grid_length_and_finite_endpoints() {
        let p = LogisticParams::new(1.0, 3.0, 50.0, 100.0, 1.5);
        let s = evaluate_series(&p, &GridSpec::default()).unwrap();
        assert_eq!(s.len(), 130);
        assert_eq!(s.values.len(), 130);
        assert_eq!(s.first.len(), 130);
        assert_eq!(s.second.len(), 130);
        for i in [0, 129] {
            assert!(s.values[i].is_finite());
            assert!(s.first[i].is_finite());
            assert!(s.second[i].is_finite());
        }
        assert!((s.values[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn negative_values_clamp_to_zero_but_derivatives_do_not() {
        // Starts at -5, crosses zero around x ≈ 13.
        let p = LogisticParams::new(-5.0, 3.0, 40.0, 50.0, 1.0);
        let s = evaluate_series(&p, &GridSpec::default()).unwrap();
        assert_eq!(s.values[0], 0.0);
        assert!(s.values.iter().all(|v| *v >= 0.0));
        assert!(s.values[129] > 40.0);

        // Decreasing curve: first derivative is negative everywhere and stays so.
        let falling = LogisticParams::new(10.0, 3.0, 40.0, -20.0, 1.0);
        let s = evaluate_series(&falling, &GridSpec::default()).unwrap();
        assert!(s.first[60] < 0.0);
        assert_eq!(s.values[129], 0.0);
    }

    #[test]
    fn values_match_series_values() {
        let p = LogisticParams::new(-5.0, 3.0, 40.0, 50.0, 1.0);
        let grid = GridSpec::new(0.0, 65, 2.0).unwrap();
        let values = evaluate_values(&p, &grid).unwrap();
        let series = evaluate_series(&p, &grid).unwrap();
        assert_eq!(values, series.values);
        assert_eq!(series.x[64], 128.0);
    }

    #[test]
    fn invalid_grid_is_rejected() {
        let p = LogisticParams::new(1.0, 3.0, 50.0, 100.0, 1.5);
        let grid = GridSpec {
            start: 0.0,
            count: 0,
            step: 1.0,
        };
        assert!(matches!(evaluate_series(&p, &grid), Err(AnalysisError::InvalidGrid(_))));
    }
}
