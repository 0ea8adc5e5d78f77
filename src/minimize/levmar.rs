//! Levenberg-Marquardt minimizer
//!
//! Damped least squares on the scalar objective: each step solves
//! `(H + λ·diag(H)) δ = -∇f` and the damping λ moves down on accepted steps
//! and up on rejected ones. Like the Newton minimizer, the best-seen vector
//! is restored before returning.

use nalgebra::{DMatrix, DVector};

use crate::minimize::finite_difference::{gradient, hessian, step_sizes};
use crate::minimize::{keep_better, Minimizer, Objective};

/// Damped least-squares minimizer with a multiplicative damping schedule.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardt {
    /// Initial value for the damping parameter.
    pub initial_lambda: f64,
    /// Factor by which to increase lambda on a rejected step.
    pub lambda_up_factor: f64,
    /// Factor by which to decrease lambda on an accepted step.
    pub lambda_down_factor: f64,
    /// Minimum value for lambda.
    pub min_lambda: f64,
    /// Maximum value for lambda.
    pub max_lambda: f64,
}

impl LevenbergMarquardt {
    pub fn new() -> Self {
        Self {
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-10,
            max_lambda: 1e10,
        }
    }
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self::new()
    }
}

impl Minimizer for LevenbergMarquardt {
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

        let mut cost = best_cost;
        let mut lambda = self.initial_lambda;

        'outer: for _ in 0..max_iterations {
            let dx = step_sizes(params, 1e5);
            let h = hessian(objective, params, &dx);
            let g = gradient(objective, params, &dx);

            let g_vec = DVector::from_fn(m, |i, _| -g[i]);

            // retry the step with increasing damping until it improves
            loop {
                let a = DMatrix::from_fn(m, m, |i, j| {
                    let damping = if i == j {
                        lambda * h[[i, i]].abs().max(1e-12)
                    } else {
                        0.0
                    };
                    h[[i, j]] + damping
                });

                let delta = match a.lu().solve(&g_vec) {
                    Some(delta) => delta,
                    None => {
                        lambda *= self.lambda_up_factor;
                        if lambda > self.max_lambda {
                            break 'outer;
                        }
                        continue;
                    }
                };

                let candidate: Vec<f64> =
                    params.iter().zip(delta.iter()).map(|(p, d)| p + d).collect();
                let candidate_cost = objective.evaluate(&candidate);

                if candidate_cost < cost {
                    let cost_change = (cost - candidate_cost) / cost.max(1e-10);
                    params.copy_from_slice(&candidate);
                    cost = candidate_cost;
                    lambda = (lambda * self.lambda_down_factor).max(self.min_lambda);
                    if cost_change < tolerance {
                        break 'outer;
                    }
                    break;
                }

                lambda *= self.lambda_up_factor;
                if lambda > self.max_lambda {
                    break 'outer;
                }
            }
        }

        keep_better(objective, &mut best, &mut best_cost, params);
        best_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_converges_on_bowl() {
        let f = |p: &[f64]| (p[0] - 1.0).powi(2) + (p[1] - 2.0).powi(2) + 0.5;
        let mut params = [5.0, -5.0];
        let cost = LevenbergMarquardt::new().minimize(&f, &mut params, 20, 1e-6);
        assert_relative_eq!(params[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(params[1], 2.0, epsilon = 1e-3);
        assert_relative_eq!(cost, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_damping_handles_indefinite_start() {
        // concave at the start; pure Newton would climb
        let f = |p: &[f64]| p[0].powi(4) - 2.0 * p[0].powi(2) + 0.1 * p[0];
        let mut params = [0.1];
        let start = f(&params);
        let cost = LevenbergMarquardt::new().minimize(&f, &mut params, 20, 1e-6);
        assert!(cost < start);
    }

    #[test]
    fn test_empty_parameters() {
        let f = |_: &[f64]| 3.0;
        let mut params: [f64; 0] = [];
        assert_eq!(LevenbergMarquardt::new().minimize(&f, &mut params, 20, 1e-6), 3.0);
    }
}
