//! Parameter definition and implementation
//!
//! A parameter is a named expression evaluated as a function of the other
//! parameters in its graph. Its numeric value is a cache, refreshed by the
//! graph's evaluation passes, and is `NaN` until a pass succeeds.

use crate::expr::ParsedFunction;
use serde::{Deserialize, Serialize};

fn nan() -> f64 {
    f64::NAN
}

fn editable() -> bool {
    true
}

/// A named expression over the other parameters of a [`ParameterGraph`].
///
/// [`ParameterGraph`]: crate::params::ParameterGraph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    expression: String,
    /// Cached value; not persisted, re-evaluated after load.
    #[serde(skip, default = "nan")]
    value: f64,
    description: Option<String>,
    #[serde(default = "editable")]
    name_editable: bool,
    #[serde(default = "editable")]
    expression_editable: bool,
}

impl Parameter {
    /// Create a parameter with a name and an expression.
    pub fn new(name: &str, expression: &str) -> Self {
        Self {
            name: name.to_string(),
            expression: expression.to_string(),
            value: f64::NAN,
            description: None,
            name_editable: true,
            expression_editable: true,
        }
    }

    /// Create a parameter with a name, expression and description.
    pub fn with_description(name: &str, expression: &str, description: &str) -> Self {
        let mut p = Self::new(name, expression);
        p.description = Some(description.to_string());
        p
    }

    /// Gets the name of this parameter.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Gets the expression for this parameter.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub(crate) fn set_expression(&mut self, expression: &str) {
        self.expression = expression.to_string();
    }

    /// Gets the current cached value of this parameter (may be NaN).
    pub fn value(&self) -> f64 {
        self.value
    }

    pub(crate) fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// Gets the description of this parameter, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Sets the description of this parameter.
    pub fn set_description(&mut self, description: Option<&str>) {
        self.description = description.map(|s| s.to_string());
    }

    /// Returns true if this parameter's name is user-editable.
    pub fn is_name_editable(&self) -> bool {
        self.name_editable
    }

    /// Sets the name editable property.
    pub fn set_name_editable(&mut self, editable: bool) {
        self.name_editable = editable;
    }

    /// Returns true if this parameter's expression is user-editable.
    pub fn is_expression_editable(&self) -> bool {
        self.expression_editable
    }

    /// Sets the expression editable property.
    pub fn set_expression_editable(&mut self, editable: bool) {
        self.expression_editable = editable;
    }

    /// Determines the value of this parameter from the other parameters'
    /// cached values, caching and returning the result.
    ///
    /// A parse failure or unresolved reference yields NaN; non-finite inputs
    /// propagate through IEEE arithmetic.
    pub fn evaluate(&mut self, parameters: &[Parameter]) -> f64 {
        self.value = eval_against(&self.expression, &self.name, parameters);
        self.value
    }
}

/// Evaluates `expression` against every parameter in `parameters` except the
/// one named `exclude`. `Err` means the expression did not parse or references
/// a name outside the list; non-finite arithmetic results come back as `Ok`.
pub(crate) fn try_eval_against(
    expression: &str,
    exclude: &str,
    parameters: &[Parameter],
) -> Result<f64, crate::expr::ExpressionError> {
    let mut names = Vec::with_capacity(parameters.len());
    let mut values = Vec::with_capacity(parameters.len());
    for p in parameters {
        if p.name == exclude {
            continue;
        }
        names.push(p.name.clone());
        values.push(p.value);
    }
    let f = ParsedFunction::parse(expression, &names)?;
    Ok(f.evaluate(&values))
}

/// Like [`try_eval_against`], collapsing failures to NaN.
pub(crate) fn eval_against(expression: &str, exclude: &str, parameters: &[Parameter]) -> f64 {
    try_eval_against(expression, exclude, parameters).unwrap_or(f64::NAN)
}

impl PartialEq for Parameter {
    /// Name, expression and editability must agree; descriptions and cached
    /// values are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.expression == other.expression
            && self.name_editable == other.name_editable
            && self.expression_editable == other.expression_editable
    }
}
