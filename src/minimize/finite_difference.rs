//! Finite difference methods for numerical differentiation.
//!
//! Central-difference gradient and Hessian of a scalar objective, used by the
//! iterative minimizers. Step sizes are supplied per parameter; the
//! minimizers scale them as `(|x| + 1) / scale` so parameters near zero still
//! get a usable step.

use crate::minimize::Objective;
use ndarray::{Array1, Array2};

/// Per-parameter finite-difference steps: `(|x[i]| + 1) / scale`.
pub fn step_sizes(params: &[f64], scale: f64) -> Vec<f64> {
    params.iter().map(|p| (p.abs() + 1.0) / scale).collect()
}

/// Compute the gradient of the objective using central finite differences.
///
/// `grad[i] = (f(x + dx_i e_i) - f(x - dx_i e_i)) / (2 dx_i)`
pub fn gradient(objective: &dyn Objective, params: &[f64], dx: &[f64]) -> Array1<f64> {
    let m = params.len();
    let mut grad = Array1::zeros(m);
    let mut xp = params.to_vec();
    let mut xm = params.to_vec();

    for i in 0..m {
        xp[i] = params[i] + dx[i];
        xm[i] = params[i] - dx[i];
        grad[i] = (objective.evaluate(&xp) - objective.evaluate(&xm)) / (2.0 * dx[i]);
        xp[i] = params[i];
        xm[i] = params[i];
    }

    grad
}

/// Compute the Hessian of the objective using central finite differences.
///
/// Diagonal entries use the three-point second-difference formula; off-
/// diagonal entries use the four-point mixed-partial formula and are filled
/// symmetrically.
pub fn hessian(objective: &dyn Objective, params: &[f64], dx: &[f64]) -> Array2<f64> {
    let m = params.len();
    let mut hess = Array2::zeros((m, m));
    let f0 = objective.evaluate(params);

    let mut x = params.to_vec();
    for i in 0..m {
        for j in 0..=i {
            if i == j {
                x[i] = params[i] + dx[i];
                let f_p = objective.evaluate(&x);
                x[i] = params[i] - dx[i];
                let f_m = objective.evaluate(&x);
                x[i] = params[i];
                hess[[i, i]] = (f_p - 2.0 * f0 + f_m) / (dx[i] * dx[i]);
            } else {
                x[i] = params[i] + dx[i];
                x[j] = params[j] + dx[j];
                let f_pp = objective.evaluate(&x);
                x[j] = params[j] - dx[j];
                let f_pm = objective.evaluate(&x);
                x[i] = params[i] - dx[i];
                x[j] = params[j] + dx[j];
                let f_mp = objective.evaluate(&x);
                x[j] = params[j] - dx[j];
                let f_mm = objective.evaluate(&x);
                x[i] = params[i];
                x[j] = params[j];

                let mixed = (f_pp - f_pm - f_mp + f_mm) / (4.0 * dx[i] * dx[j]);
                hess[[i, j]] = mixed;
                hess[[j, i]] = mixed;
            }
        }
    }

    hess
}
