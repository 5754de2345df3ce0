//! Start points for the nonlinear fit.
//!
//! The five-parameter logistic has flat directions (`c` and `g` trade off, and
//! `b` is barely identified on short series), so a single start can wander off.
//! We seed the levels from the data and sweep a small, fixed grid of shapes.
//! The grid is deterministic, so repeated fits of the same data agree exactly.

use crate::domain::LogisticParams;

/// Slope factors tried for every data-derived level/location estimate.
pub const B_STARTS: [f64; 4] = [1.0, 2.0, 4.0, 8.0];

/// Asymmetry factors tried for every data-derived level/location estimate.
pub const G_STARTS: [f64; 3] = [0.5, 1.0, 2.0];

/// Smallest location start, relative to the largest `|x|`.
const C_FLOOR_REL: f64 = 1e-3;

/// Build the start grid for one `(x, y)` series.
///
/// Callers must pass equal-length, non-empty, finite series.
pub fn start_points(x: &[f64], y: &[f64]) -> Vec<LogisticParams> {
    let (a0, d0) = level_estimates(x, y);
    let c0 = location_estimate(x, y, a0, d0);

    let mut out = Vec::with_capacity(B_STARTS.len() * G_STARTS.len());
    for &b in &B_STARTS {
        for &g in &G_STARTS {
            out.push(LogisticParams::new(a0, b, c0, d0, g));
        }
    }
    out
}

/// `(a0, d0)`: the responses at the smallest and largest `x`.
///
/// Falls back to `(min y, max y)` when the endpoints coincide, which keeps the
/// amplitude non-zero for series that rise and come back down.
fn level_estimates(x: &[f64], y: &[f64]) -> (f64, f64) {
    let mut lo = 0;
    let mut hi = 0;
    for i in 1..x.len() {
        if x[i] < x[lo] {
            lo = i;
        }
        if x[i] > x[hi] {
            hi = i;
        }
    }
    let (a0, d0) = (y[lo], y[hi]);
    if (d0 - a0).abs() > f64::EPSILON * (a0.abs() + d0.abs()).max(1.0) {
        return (a0, d0);
    }
    let y_min = y.iter().copied().fold(f64::INFINITY, f64::min);
    let y_max = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (y_min, y_max)
}

/// `c0`: the `x` where the series first crosses the midpoint of `a0` and `d0`.
fn location_estimate(x: &[f64], y: &[f64], a0: f64, d0: f64) -> f64 {
    let mut pairs: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
    pairs.sort_by(|p, q| p.0.partial_cmp(&q.0).unwrap_or(std::cmp::Ordering::Equal));

    let x_max = pairs.iter().map(|p| p.0.abs()).fold(0.0, f64::max);
    let floor = if x_max > 0.0 { x_max * C_FLOOR_REL } else { 1.0 };

    let mid = 0.5 * (a0 + d0);
    let rising = d0 >= a0;
    let reached = |v: f64| if rising { v >= mid } else { v <= mid };

    let mut crossing = None;
    for w in pairs.windows(2) {
        let ((x0, y0), (x1, y1)) = (w[0], w[1]);
        if !reached(y0) && reached(y1) {
            let t = if y1 != y0 { (mid - y0) / (y1 - y0) } else { 0.5 };
            crossing = Some(x0 + t * (x1 - x0));
            break;
        }
    }

    let c0 = crossing.unwrap_or_else(|| {
        let m = pairs.len() / 2;
        pairs[m].0
    });
    c0.max(floor)
}
