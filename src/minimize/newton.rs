//! Newton ("Hessian") minimizer
//!
//! Minimizes a scalar objective by solving `H δ = -∇f` on finite-difference
//! derivatives, after a crude per-axis warmup pass that improves poor
//! starting guesses. The best-seen parameter vector is restored before
//! returning, so the caller's vector never ends up worse than it started.

use nalgebra::{DMatrix, DVector};

use crate::minimize::finite_difference::{gradient, hessian, step_sizes};
use crate::minimize::{keep_better, Minimizer, Objective};

/// Newton-style minimizer over finite-difference Hessians.
#[derive(Debug, Default, Clone, Copy)]
pub struct HessianMinimizer;

/// Cycles of the crude warmup pass.
const CRUDE_CYCLES: usize = 5;
/// Moderates the warmup step size.
const CRUDE_STEP_FACTOR: f64 = 0.35;

impl Minimizer for HessianMinimizer {
    fn minimize(
        &self,
        objective: &dyn Objective,
        params: &mut [f64],
        max_iterations: usize,
        tolerance: f64,
    ) -> f64 {
        let m = params.len();
        if m == 0 {
            return objective.evaluate(params);
        }

        let mut best = params.to_vec();
        let mut best_cost = objective.evaluate(params);

        crude_guess(objective, params);
        keep_better(objective, &mut best, &mut best_cost, params);

        let dx = step_sizes(params, 1e5);
        let mut err = f64::MAX;
        let mut relerr = f64::MAX;
        let mut iterations = 0;

        while err > tolerance * 1e-6 && relerr > tolerance * 1e-6 && iterations < max_iterations {
            iterations += 1;

            let h = hessian(objective, params, &dx);
            let g = gradient(objective, params, &dx);

            let h_mat = DMatrix::from_fn(m, m, |i, j| h[[i, j]]);
            // corrections solve H δ = -∇f
            let d_vec = DVector::from_fn(m, |i, _| -g[i]);
            let delta = match h_mat.lu().solve(&d_vec) {
                Some(delta) => delta,
                None => break,
            };

            let mut err_sq = 0.0;
            let mut norm_sq = 0.0;
            for i in 0..m {
                err_sq += delta[i] * delta[i];
                norm_sq += params[i] * params[i];
                params[i] += delta[i];
            }
            err = err_sq.sqrt();
            relerr = err / (norm_sq + tolerance);
        }

        keep_better(objective, &mut best, &mut best_cost, params);
        best_cost
    }
}

/// Crude starting-guess improvement: a few cycles of a per-axis secant
/// Newton step with a shrinking derivative step size.
fn crude_guess(objective: &dyn Objective, params: &mut [f64]) {
    let m = params.len();
    let mut dx: Vec<f64> = step_sizes(params, 1e3);
    let mut xp = vec![0.0; m];
    let mut xm = vec![0.0; m];

    for _ in 0..CRUDE_CYCLES {
        for i in 0..m {
            xp.copy_from_slice(params);
            xm.copy_from_slice(params);
            xp[i] = params[i] + dx[i];
            xm[i] = params[i] - dx[i];

            let sp = objective.evaluate(&xp);
            let s0 = objective.evaluate(params);
            let sm = objective.evaluate(&xm);

            let curvature = sp - 2.0 * s0 + sm;
            let step = CRUDE_STEP_FACTOR * 0.5 * dx[i] * (sp - sm) / curvature;
            if step.is_finite() {
                params[i] -= step;
            }
            dx[i] *= 0.5;
        }
    }
}
