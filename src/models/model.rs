//! Model evaluation for the five-parameter logistic.
//!
//! ```text
//! f(x) = d + (a - d) / (1 + (x/c)^b)^g
//! ```
//!
//! With `u = (x/c)^b`, `w = u / (1 + u)` and `P = (1 + u)^(-g)` the derivatives in
//! `x` are:
//!
//! ```text
//! f'(x)  = -g b (a - d) P w / x
//! f''(x) = -g b (a - d) P w (b (1 - w) - g b w - 1) / x^2
//! ```
//!
//! and the partial derivatives used by the fitter are:
//!
//! ```text
//! ∂f/∂a = P
//! ∂f/∂b = -(a - d) g P w ln(x/c)
//! ∂f/∂c =  (a - d) g b P w / c
//! ∂f/∂d = 1 - P
//! ∂f/∂g = -(a - d) P ln(1 + u)
//! ```
//!
//! Numerical notes:
//! - `u` overflows quickly for steep curves (`(129/5)^40`), so everything is
//!   computed from `ln u`: `ln(1 + u)` via a stable softplus and `w` via a stable
//!   logistic.
//! - `x` is floored at a tiny positive value so `x = 0` yields finite values and
//!   derivatives whenever `c > 0`.

use crate::domain::LogisticParams;

/// Floor applied to `x` before taking `ln(x/c)`.
const X_FLOOR: f64 = 1e-12;

/// Shared intermediate terms at one `x`.
#[derive(Debug, Clone, Copy)]
struct Terms {
    x: f64,
    /// `ln(x/c)`
    ln_ratio: f64,
    /// `ln(1 + u)`
    ln_s: f64,
    /// `u / (1 + u)`
    w: f64,
    /// `1 / (1 + u)`, kept separately to avoid `1 - w` cancellation.
    w_c: f64,
    /// `(1 + u)^(-g)`
    p: f64,
}

fn terms(params: &LogisticParams, x: f64) -> Terms {
    let x = x.max(X_FLOOR);
    let ln_ratio = (x / params.c).ln();
    let ln_u = params.b * ln_ratio;
    let ln_s = softplus(ln_u);
    Terms {
        x,
        ln_ratio,
        ln_s,
        w: logistic(ln_u),
        w_c: logistic(-ln_u),
        p: (-params.g * ln_s).exp(),
    }
}

/// `ln(1 + e^z)` without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// `1 / (1 + e^-z)` without overflow.
fn logistic(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Model value `f(x)`.
pub fn predict(params: &LogisticParams, x: f64) -> f64 {
    let t = terms(params, x);
    params.d + (params.a - params.d) * t.p
}

/// First derivative `f'(x)`.
pub fn first_derivative(params: &LogisticParams, x: f64) -> f64 {
    let t = terms(params, x);
    -params.g * params.b * (params.a - params.d) * t.p * t.w / t.x
}

/// Second derivative `f''(x)`.
pub fn second_derivative(params: &LogisticParams, x: f64) -> f64 {
    let t = terms(params, x);
    let (b, g) = (params.b, params.g);
    let shape = b * t.w_c - g * b * t.w - 1.0;
    -g * b * (params.a - params.d) * t.p * t.w * shape / (t.x * t.x)
}

/// Partial derivatives of `f(x)` with respect to `[a, b, c, d, g]`.
pub fn gradient(params: &LogisticParams, x: f64) -> [f64; 5] {
    let t = terms(params, x);
    let amp = params.a - params.d;
    let pw = t.p * t.w;
    [
        t.p,
        -amp * params.g * pw * t.ln_ratio,
        amp * params.g * params.b * pw / params.c,
        -(-params.g * t.ln_s).exp_m1(),
        -amp * t.p * t.ln_s,
    ]
}

/// Evaluate `f` at every point of `xs`.
pub fn predict_all(params: &LogisticParams, xs: &[f64]) -> Vec<f64> {
    xs.iter().map(|&x| predict(params, x)).collect()
}
