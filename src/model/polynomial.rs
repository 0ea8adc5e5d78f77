//! Polynomial fit models
//!
//! A polynomial with named coefficients that can be fitted in closed form.
//! Limited to degree 5 or less; the leading parameter maps to the
//! highest-degree coefficient, so `A*x^2 + B*x + C` has parameters
//! `A`, `B`, `C` in that order.

use crate::error::{FitError, Result};
use crate::minimize::fit_polynomial;
use serde::{Deserialize, Serialize};

/// Default parameter names, highest degree first.
const DEFAULT_PARAM_NAMES: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

/// Maximum supported polynomial degree.
pub const MAX_DEGREE: usize = 5;

/// A polynomial model fitted by ordinary least squares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolynomialModel {
    name: Option<String>,
    description: Option<String>,
    /// Coefficients in ascending degree order: c\[0\] + c\[1\]x + c\[2\]x² ...
    coefficients: Vec<f64>,
    param_names: Vec<String>,
    param_descriptions: Vec<Option<String>>,
}

impl PolynomialModel {
    /// Create a zero polynomial of the given degree (at most [`MAX_DEGREE`]).
    pub fn new(degree: usize) -> Result<Self> {
        if degree > MAX_DEGREE {
            return Err(FitError::InvalidInput(format!(
                "polynomial degree {} exceeds maximum {}",
                degree, MAX_DEGREE
            )));
        }
        let n = degree + 1;
        Ok(Self {
            name: None,
            description: None,
            coefficients: vec![0.0; n],
            param_names: DEFAULT_PARAM_NAMES[..n].iter().map(|s| s.to_string()).collect(),
            param_descriptions: vec![None; n],
        })
    }

    /// Create a polynomial from ascending-degree coefficients.
    pub fn from_coefficients(coefficients: &[f64]) -> Result<Self> {
        if coefficients.is_empty() || coefficients.len() > MAX_DEGREE + 1 {
            return Err(FitError::InvalidInput(format!(
                "need 1 to {} coefficients, got {}",
                MAX_DEGREE + 1,
                coefficients.len()
            )));
        }
        let mut poly = Self::new(coefficients.len() - 1)?;
        poly.coefficients.copy_from_slice(coefficients);
        Ok(poly)
    }

    /// Create a polynomial of the given degree fitted to the samples.
    pub fn from_data(x: &[f64], y: &[f64], degree: usize) -> Result<Self> {
        let mut poly = Self::new(degree)?;
        poly.fit_data(x, y)?;
        Ok(poly)
    }

    /// The polynomial degree.
    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Coefficients in ascending degree order.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// The model name; defaults to `Poly<degree>`.
    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Poly{}", self.degree()),
        }
    }

    /// Set the model name. Blank names are ignored.
    pub fn set_name(&mut self, name: &str) {
        if !name.trim().is_empty() {
            self.name = Some(name.to_string());
        }
    }

    /// The model description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Set the model description.
    pub fn set_description(&mut self, description: Option<&str>) {
        self.description = description.map(|s| s.to_string());
    }

    /// Number of parameters (coefficients).
    pub fn parameter_count(&self) -> usize {
        self.coefficients.len()
    }

    /// Name of parameter `i` (parameter 0 is the leading coefficient).
    pub fn parameter_name(&self, i: usize) -> &str {
        &self.param_names[i]
    }

    /// Value of parameter `i`.
    pub fn parameter_value(&self, i: usize) -> f64 {
        self.coefficients[self.coefficients.len() - i - 1]
    }

    /// Set parameter `i`. NaN values are ignored.
    pub fn set_parameter_value(&mut self, i: usize, value: f64) {
        if value.is_nan() {
            return;
        }
        let n = self.coefficients.len();
        self.coefficients[n - i - 1] = value;
    }

    /// Description of parameter `i`, if any.
    pub fn parameter_description(&self, i: usize) -> Option<&str> {
        self.param_descriptions.get(i).and_then(|d| d.as_deref())
    }

    /// Replace parameter names, values and descriptions. Any argument may be
    /// `None` to leave that aspect unchanged; blank names are skipped.
    pub fn set_parameters(
        &mut self,
        names: Option<&[String]>,
        values: Option<&[f64]>,
        descriptions: Option<&[Option<String>]>,
    ) {
        if let Some(names) = names {
            for (i, name) in names.iter().take(self.parameter_count()).enumerate() {
                if name.trim().is_empty() {
                    continue;
                }
                self.param_names[i] = name.clone();
            }
        }
        if let Some(descriptions) = descriptions {
            for (i, d) in descriptions.iter().take(self.parameter_count()).enumerate() {
                self.param_descriptions[i] = d.clone();
            }
        }
        if let Some(values) = values {
            for (i, &v) in values.iter().take(self.parameter_count()).enumerate() {
                self.set_parameter_value(i, v);
            }
        }
    }

    /// Render the expression with the given independent-variable name,
    /// e.g. `A*x^2 + B*x + C`.
    pub fn expression(&self, var: &str) -> String {
        let mut eqn = String::new();
        let end = self.coefficients.len() - 1;
        for i in 0..=end {
            eqn.push_str(self.parameter_name(i));
            if end - i > 0 {
                eqn.push('*');
                eqn.push_str(var);
                if end - i > 1 {
                    eqn.push('^');
                    eqn.push_str(&(end - i).to_string());
                }
                eqn.push_str(" + ");
            }
        }
        eqn
    }

    /// Evaluate the polynomial at `x`.
    pub fn evaluate(&self, x: f64) -> f64 {
        let mut y = 0.0;
        for &c in self.coefficients.iter().rev() {
            y = y * x + c;
        }
        y
    }

    /// Replace the coefficients with the closed-form least-squares solution
    /// for the samples. Leaves the model unchanged on failure.
    pub fn fit_data(&mut self, x: &[f64], y: &[f64]) -> Result<()> {
        let mut coeffs = self.coefficients.clone();
        fit_polynomial(&mut coeffs, x, y)?;
        self.coefficients = coeffs;
        Ok(())
    }
}

impl PartialEq for PolynomialModel {
    /// Parameter-name lists must agree; values and descriptions are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.param_names == other.param_names
    }
}
