//! Fit orchestration
//!
//! [`FitEngine::fit`] drives one fit pass: polynomials go through the
//! closed-form least-squares path; expression models go through a two-tier
//! minimizer sequence (Hessian first, Levenberg-Marquardt as fallback) where
//! a candidate that is not strictly better than the starting point is
//! rejected and the previous parameter vector is restored bit-for-bit.
//! Every pass finishes with a linear-regression refresh of the correlation
//! and standard-error statistics.

use std::cell::RefCell;

use crate::events::ChangeEvent;
use crate::fit::config::FitConfig;
use crate::minimize::{HessianMinimizer, LevenbergMarquardt, Minimizer, Objective};
use crate::model::{ExpressionModel, FitModel};
use crate::stats::RegressionStats;

/// The three distinguishable results of a fit pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitOutcome {
    /// No samples were supplied; autofit is switched off.
    NoData,
    /// The deviation is non-finite (the model evaluated to NaN somewhere).
    Undefined,
    /// Root-mean-square deviation of the fitted model.
    Rms(f64),
}

impl FitOutcome {
    /// Collapse to a scalar: the RMS deviation, or NaN for the two failure
    /// states.
    pub fn rms(&self) -> f64 {
        match self {
            FitOutcome::Rms(v) => *v,
            FitOutcome::NoData | FitOutcome::Undefined => f64::NAN,
        }
    }
}

/// Which fitting path produced a candidate parameter vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MinimizerKind {
    ClosedForm,
    Hessian,
    LevenbergMarquardt,
}

/// Whether a fit attempt's candidate was kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttemptOutcome {
    Accepted,
    RevertedToOriginal,
}

/// Audit record of the most recent autofit attempt (not persisted).
#[derive(Debug, Clone, PartialEq)]
pub struct FitAttempt {
    pub previous_params: Vec<f64>,
    pub previous_deviation_squared: f64,
    pub candidate_params: Vec<f64>,
    pub candidate_deviation_squared: f64,
    pub minimizer: MinimizerKind,
    pub outcome: AttemptOutcome,
}

/// Orchestrates fitting of a [`FitModel`] to raw sample arrays.
#[derive(Debug)]
pub struct FitEngine {
    config: FitConfig,
    hessian: HessianMinimizer,
    levmar: LevenbergMarquardt,
    correlation: f64,
    uncertainties: [f64; 2],
    last_attempt: Option<FitAttempt>,
    events: Vec<ChangeEvent>,
}

impl Default for FitEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FitEngine {
    pub fn new() -> Self {
        Self::with_config(FitConfig::default())
    }

    pub fn with_config(config: FitConfig) -> Self {
        Self {
            config,
            hessian: HessianMinimizer,
            levmar: LevenbergMarquardt::new(),
            correlation: f64::NAN,
            uncertainties: [f64::NAN; 2],
            last_attempt: None,
            events: Vec::new(),
        }
    }

    /// Whether automatic fitting is currently enabled. Switched off by the
    /// engine itself when an autofit attempt fails to improve the fit.
    pub fn autofit(&self) -> bool {
        self.config.autofit
    }

    /// Enable or disable automatic fitting.
    pub fn set_autofit(&mut self, autofit: bool) {
        self.config.autofit = autofit;
    }

    /// Squared Pearson correlation from the last fit pass (NaN before any).
    pub fn correlation(&self) -> f64 {
        self.correlation
    }

    /// Standard error of linear-fit parameter `index` (0 = slope,
    /// 1 = intercept). NaN unless autofit is active and the index is within
    /// the uncertainty array.
    pub fn uncertainty(&self, index: usize) -> f64 {
        if index < self.uncertainties.len() && self.config.autofit {
            self.uncertainties[index]
        } else {
            f64::NAN
        }
    }

    /// Audit record of the most recent autofit attempt.
    pub fn last_attempt(&self) -> Option<&FitAttempt> {
        self.last_attempt.as_ref()
    }

    /// Drain queued change notifications.
    pub fn take_events(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Fits the model to the samples.
    ///
    /// Reports one of three outcomes: [`FitOutcome::NoData`] for empty
    /// samples, [`FitOutcome::Undefined`] when the deviation is non-finite,
    /// and the RMS deviation otherwise. On the iterative path the deviation
    /// never increases: a candidate that fails to improve is rolled back and
    /// autofit is switched off for the caller to notice.
    pub fn fit(&mut self, model: &mut FitModel, x: &[f64], y: &[f64]) -> FitOutcome {
        self.last_attempt = None;
        if x.is_empty() || y.is_empty() {
            self.config.autofit = false;
            return FitOutcome::NoData;
        }

        let n_params = model.parameter_count();
        let mut dev_sq = 0.0;
        // deviation before fitting, at the model's current parameters
        let prev_dev_sq = deviation_squared(model, x, y);
        let mut is_linear_fit = false;
        let mut closed_form_prev: Option<Vec<f64>> = None;

        if self.config.autofit && !prev_dev_sq.is_nan() {
            match model {
                FitModel::Polynomial(poly) => {
                    let prev_params: Vec<f64> =
                        (0..n_params).map(|i| poly.parameter_value(i)).collect();
                    if poly.fit_data(x, y).is_ok() {
                        is_linear_fit = poly.degree() == 1;
                        closed_form_prev = Some(prev_params);
                    }
                }
                FitModel::Expression(f) => {
                    // autofit needs at least one free parameter and no more
                    // parameters than samples
                    if n_params > 0 && n_params <= x.len() && n_params <= y.len() {
                        dev_sq = self.autofit_expression(f, x, y, prev_dev_sq);
                    }
                }
            }
        }

        // always refresh the regression statistics on the raw samples
        let stats = RegressionStats::compute(x, y, is_linear_fit);
        self.correlation = stats.correlation_squared;
        self.uncertainties = [stats.slope_se, stats.intercept_se];

        if dev_sq == 0.0 {
            dev_sq = deviation_squared(model, x, y);
        }
        if let Some(previous_params) = closed_form_prev {
            self.last_attempt = Some(FitAttempt {
                previous_params,
                previous_deviation_squared: prev_dev_sq,
                candidate_params: model.parameter_values(),
                candidate_deviation_squared: dev_sq,
                minimizer: MinimizerKind::ClosedForm,
                outcome: AttemptOutcome::Accepted,
            });
        }

        let rms_dev = (dev_sq / x.len() as f64).sqrt();
        self.events.push(ChangeEvent::Fit);
        if rms_dev.is_nan() {
            FitOutcome::Undefined
        } else {
            FitOutcome::Rms(rms_dev)
        }
    }

    /// The two-tier minimizer sequence with rollback. Returns the deviation
    /// squared at the parameters left on the model.
    fn autofit_expression(
        &mut self,
        f: &mut ExpressionModel,
        x: &[f64],
        y: &[f64],
        prev_dev_sq: f64,
    ) -> f64 {
        let n_params = f.parameter_count();
        let prev_params: Vec<f64> = (0..n_params).map(|i| f.parameter_value(i)).collect();
        let objective = ResidualObjective {
            model: RefCell::new(f.clone()),
            x,
            y,
        };

        let mut params = prev_params.clone();
        self.hessian.minimize(
            &objective,
            &mut params,
            self.config.max_iterations,
            self.config.tolerance,
        );
        apply_params(f, &params);
        let mut dev_sq = objective.evaluate(&params);
        let mut minimizer = MinimizerKind::Hessian;

        // restore and try Levenberg-Marquardt from the original parameters
        // if the Hessian result is not strictly better
        if !(dev_sq < prev_dev_sq) {
            apply_params(f, &prev_params);
            params.copy_from_slice(&prev_params);
            self.levmar.minimize(
                &objective,
                &mut params,
                self.config.max_iterations,
                self.config.tolerance,
            );
            apply_params(f, &params);
            dev_sq = objective.evaluate(&params);
            minimizer = MinimizerKind::LevenbergMarquardt;
        }

        if !(dev_sq < prev_dev_sq) {
            // reject: restore the previous vector bit-for-bit and signal the
            // caller by switching autofit off
            let candidate_deviation_squared = dev_sq;
            apply_params(f, &prev_params);
            self.config.autofit = false;
            self.last_attempt = Some(FitAttempt {
                previous_params: prev_params,
                previous_deviation_squared: prev_dev_sq,
                candidate_params: params,
                candidate_deviation_squared,
                minimizer,
                outcome: AttemptOutcome::RevertedToOriginal,
            });
            prev_dev_sq
        } else {
            self.last_attempt = Some(FitAttempt {
                previous_params: prev_params,
                previous_deviation_squared: prev_dev_sq,
                candidate_params: params,
                candidate_deviation_squared: dev_sq,
                minimizer,
                outcome: AttemptOutcome::Accepted,
            });
            dev_sq
        }
    }
}

/// Total deviation squared between model and samples. NaN when any
/// evaluation produced a non-finite value (IEEE poisoning, not skipping).
fn deviation_squared(model: &FitModel, x: &[f64], y: &[f64]) -> f64 {
    let mut evaluated_to_nan = false;
    let mut total = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        let next = model.evaluate(*xi);
        evaluated_to_nan = evaluated_to_nan || model.evaluated_to_nan();
        let dev = next - yi;
        total += dev * dev;
    }
    if evaluated_to_nan || !total.is_finite() {
        f64::NAN
    } else {
        total
    }
}

fn apply_params(f: &mut ExpressionModel, params: &[f64]) {
    for (i, &v) in params.iter().enumerate() {
        f.set_parameter_value(i, v);
    }
}

/// Sum of squared residuals as a function of the parameter vector, evaluated
/// on a working copy of the model.
struct ResidualObjective<'a> {
    model: RefCell<ExpressionModel>,
    x: &'a [f64],
    y: &'a [f64],
}

impl Objective for ResidualObjective<'_> {
    fn evaluate(&self, params: &[f64]) -> f64 {
        let mut model = self.model.borrow_mut();
        for (i, &v) in params.iter().enumerate() {
            model.set_parameter_value(i, v);
        }
        let mut evaluated_to_nan = false;
        let mut total = 0.0;
        for (xi, yi) in self.x.iter().zip(self.y.iter()) {
            let next = model.evaluate(*xi);
            evaluated_to_nan = evaluated_to_nan || model.evaluated_to_nan();
            let dev = next - yi;
            total += dev * dev;
        }
        if evaluated_to_nan || !total.is_finite() {
            f64::NAN
        } else {
            total
        }
    }
}
