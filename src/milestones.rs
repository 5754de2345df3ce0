//! Growth-stage milestones (t1..t5) from derivative series.
//!
//! | Name | Index rule                                        | Reported value       |
//! |------|---------------------------------------------------|----------------------|
//! | t1   | first index where `f'' > +threshold`              | `f'` at that index   |
//! | t2   | argmax of `f''`                                   | `f'` at that index   |
//! | t3   | argmax of `f'`                                    | max `f'`             |
//! | t4   | argmin of `f''`                                   | `f'` at that index   |
//! | t5   | last index where `f'' < -threshold`               | `f'` at that index   |
//!
//! Extrema take the first occurrence and skip NaN entries. For a sigmoid the
//! indices come out ordered t1 <= t2 <= t3 <= t4 <= t5, but nothing here
//! enforces it.

use crate::domain::{GridSpec, Milestone, MilestoneKind, MilestoneSet};
use crate::error::AnalysisError;

/// Index of the first largest non-NaN entry.
fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some(j) if values[j] >= v => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Index of the first smallest non-NaN entry.
fn argmin(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some(j) if values[j] <= v => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Extract t1..t5 from first/second derivative series sampled on `grid`.
///
/// `grid` only supplies the `day` of each milestone; indices refer to positions
/// in the series.
pub fn extract_milestones(
    first: &[f64],
    second: &[f64],
    threshold: f64,
    grid: &GridSpec,
) -> Result<MilestoneSet, AnalysisError> {
    if !(threshold.is_finite() && threshold > 0.0) {
        return Err(AnalysisError::InvalidThreshold(threshold));
    }
    if first.is_empty() || first.len() != second.len() {
        return Err(AnalysisError::InvalidDataset(format!(
            "derivative series must be non-empty and of equal length (got {} and {})",
            first.len(),
            second.len()
        )));
    }

    let at = |index: usize| Milestone {
        index,
        day: grid.x_at(index),
        value: first[index],
    };
    let not_found = |milestone| AnalysisError::MilestoneNotFound { milestone };

    let t1 = second
        .iter()
        .position(|&v| v > threshold)
        .ok_or_else(|| not_found(MilestoneKind::T1))?;
    let t2 = argmax(second).ok_or_else(|| not_found(MilestoneKind::T2))?;
    let t3 = argmax(first).ok_or_else(|| not_found(MilestoneKind::T3))?;
    let t4 = argmin(second).ok_or_else(|| not_found(MilestoneKind::T4))?;
    let t5 = second
        .iter()
        .rposition(|&v| v < -threshold)
        .ok_or_else(|| not_found(MilestoneKind::T5))?;

    Ok(MilestoneSet {
        t1: at(t1),
        t2: at(t2),
        t3: at(t3),
        t4: at(t4),
        t5: at(t5),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LogisticParams;
    use crate::series::evaluate_series;

    fn milestones_for(params: LogisticParams, threshold: f64) -> Result<MilestoneSet, AnalysisError> {
        let grid = GridSpec::default();
        let s = evaluate_series(&params, &grid).unwrap();
        extract_milestones(&s.first, &s.second, threshold, &grid)
    }

    #[test]
    fn picks_thresholds_and_extrema() {
        let first = [0.0, 1.0, 3.0, 6.0, 4.0, 2.0, 1.0];
        let second = [0.001, 0.5, 2.0, 0.1, -2.5, -0.4, -0.001];
        let grid = GridSpec::new(10.0, 7, 2.0).unwrap();
        let m = extract_milestones(&first, &second, 0.01, &grid).unwrap();

        assert_eq!(m.indices(), [1, 2, 3, 4, 5]);
        assert_eq!(m.t1.value, 1.0);
        assert_eq!(m.t3.value, 6.0);
        assert_eq!(m.t5.value, 2.0);
        assert_eq!(m.t1.day, 12.0);
        assert_eq!(m.t5.day, 20.0);
    }

    #[test]
    fn extrema_take_first_occurrence_and_skip_nan() {
        let first = [f64::NAN, 2.0, 2.0, 1.0];
        let second = [0.5, f64::NAN, 0.5, -0.5];
        let m = extract_milestones(&first, &second, 0.1, &GridSpec::default()).unwrap();
        assert_eq!(m.t2.index, 0);
        assert_eq!(m.t3.index, 1);
        assert_eq!(m.t4.index, 3);
    }

    #[test]
    fn indices_are_ordered_for_sigmoids() {
        for params in [
            LogisticParams::new(0.0, 5.0, 60.0, 100.0, 1.0),
            LogisticParams::new(1.0, 3.0, 40.0, 80.0, 0.7),
            LogisticParams::new(2.0, 8.0, 70.0, 150.0, 2.0),
            LogisticParams::new(0.5, 4.0, 30.0, 50.0, 1.5),
        ] {
            let m = milestones_for(params, 0.005).unwrap();
            let idx = m.indices();
            assert!(idx.windows(2).all(|w| w[0] <= w[1]), "{params:?}: {idx:?}");
            assert!(m.t3.value > 0.0);
        }
    }

    #[test]
    fn t3_reports_peak_growth_rate() {
        let params = LogisticParams::new(0.0, 5.0, 60.0, 100.0, 1.0);
        let grid = GridSpec::default();
        let s = evaluate_series(&params, &grid).unwrap();
        let m = extract_milestones(&s.first, &s.second, 0.005, &grid).unwrap();
        let max = s.first.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(m.t3.value, max);
        assert_eq!(m.t2.value, s.first[m.t2.index]);
    }

    #[test]
    fn huge_threshold_reports_missing_milestone() {
        let err = milestones_for(LogisticParams::new(0.0, 5.0, 60.0, 100.0, 1.0), 1e6).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MilestoneNotFound {
                milestone: MilestoneKind::T1
            }
        );
    }

    #[test]
    fn missing_t5_is_reported() {
        let first = [0.0, 1.0, 2.0];
        let second = [0.5, 0.2, -0.01];
        let err = extract_milestones(&first, &second, 0.1, &GridSpec::default()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MilestoneNotFound {
                milestone: MilestoneKind::T5
            }
        );
    }

    #[test]
    fn rejects_bad_threshold_and_lengths() {
        let grid = GridSpec::default();
        for t in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                extract_milestones(&[1.0], &[1.0], t, &grid),
                Err(AnalysisError::InvalidThreshold(_))
            ));
        }
        assert!(matches!(
            extract_milestones(&[1.0, 2.0], &[1.0], 0.1, &grid),
            Err(AnalysisError::InvalidDataset(_))
        ));
    }
}
