//! User-editable expression models
//!
//! An [`ExpressionModel`] holds a textual expression over independent
//! variables, named parameters and referenced sub-models. Canonical storage
//! replaces each variable name with a fixed single-character placeholder
//! token, so user-chosen variable names can never collide with parameter
//! names or the reserved function vocabulary during substitution.

use std::cell::Cell;

use crate::expr::{self, ParsedFunction, DUMMY_VARS, FUNCTION_NAMES};
use crate::model::polynomial::PolynomialModel;

/// A function whose expression and parameters are user-editable.
#[derive(Debug, Clone)]
pub struct ExpressionModel {
    name: String,
    description: Option<String>,
    name_editable: bool,
    /// Current independent-variable names, one per placeholder token.
    vars: Vec<String>,
    param_names: Vec<String>,
    param_values: Vec<f64>,
    param_descriptions: Vec<Option<String>>,
    /// Canonical expression text; variables appear as placeholder tokens.
    expression: String,
    /// Last text given to `set_expression`, kept for redisplay even when it
    /// failed to parse.
    input_string: String,
    function: Option<ParsedFunction>,
    references: Vec<ExpressionModel>,
    polynomial: Option<PolynomialModel>,
    last_eval_non_finite: Cell<bool>,
}

impl ExpressionModel {
    /// Create a model with the constant expression `0` over variable `x`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            name_editable: true,
            vars: vec!["x".to_string()],
            param_names: Vec::new(),
            param_values: Vec::new(),
            param_descriptions: Vec::new(),
            expression: "0".to_string(),
            input_string: "0".to_string(),
            function: ParsedFunction::parse("0", &[]).ok(),
            references: Vec::new(),
            polynomial: None,
            last_eval_non_finite: Cell::new(false),
        }
    }

    /// Create a model mirroring a polynomial: same name and description,
    /// parameters seeded from the coefficients, expression rendered from the
    /// polynomial. The polynomial stays attached so the closed-form fit path
    /// applies (see [`sync_polynomial`](Self::sync_polynomial)).
    pub fn from_polynomial(poly: &PolynomialModel) -> Self {
        let mut model = Self::new(&poly.name());
        model.set_description(poly.description());

        let names: Vec<String> = (0..poly.parameter_count())
            .map(|i| poly.parameter_name(i).to_string())
            .collect();
        let values: Vec<f64> = (0..poly.parameter_count())
            .map(|i| poly.parameter_value(i))
            .collect();
        let descriptions: Vec<Option<String>> = (0..poly.parameter_count())
            .map(|i| poly.parameter_description(i).map(|s| s.to_string()))
            .collect();
        model.set_parameters(&names, &values, Some(&descriptions));

        model.set_expression(&poly.expression("x"), &["x"]);
        model.polynomial = Some(poly.clone());
        model
    }

    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the name. Ignored when the name is not editable.
    pub fn set_name(&mut self, name: &str) {
        if !self.name_editable {
            return;
        }
        self.name = name.to_string();
    }

    /// Returns true if the name is user-editable.
    pub fn is_name_editable(&self) -> bool {
        self.name_editable
    }

    /// Sets the name editable property.
    pub fn set_name_editable(&mut self, editable: bool) {
        self.name_editable = editable;
    }

    /// Gets the description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Sets the description.
    pub fn set_description(&mut self, description: Option<&str>) {
        self.description = description.map(|s| s.to_string());
    }

    /// Gets the current independent-variable names.
    pub fn independent_variables(&self) -> &[String] {
        &self.vars
    }

    /// Gets the first independent-variable name.
    pub fn independent_variable(&self) -> &str {
        &self.vars[0]
    }

    /// The last text handed to `set_expression`, with variables shown under
    /// their current names. Preserved even when parsing failed, so the user
    /// can re-edit it.
    pub fn input_string(&self) -> String {
        self.replace_dummies(&self.input_string)
    }

    /// The parseable expression with variables shown under their current
    /// names (the constant `0` after a failed `set_expression`).
    pub fn expression(&self) -> String {
        self.replace_dummies(&self.expression)
    }

    /// The expression with the variables renamed to `var_names`.
    pub fn expression_with(&mut self, var_names: &[&str]) -> String {
        self.vars = var_names.iter().map(|s| s.to_string()).collect();
        self.expression()
    }

    /// The expression with every referenced sub-model's name replaced by its
    /// own fully expanded expression in parentheses, recursively.
    pub fn full_expression(&mut self, var_names: &[&str]) -> String {
        let mut s = self.expression_with(var_names);
        for r in &mut self.references {
            let name = r.name().to_string();
            let expanded = format!("({})", r.full_expression(var_names));
            s = s.replace(&name, &expanded);
        }
        s
    }

    fn replace_dummies(&self, text: &str) -> String {
        let mut s = text.to_string();
        for (dummy, var) in DUMMY_VARS.iter().zip(self.vars.iter()) {
            s = s.replace(dummy, var);
        }
        s
    }

    /// Sets the expression over the given independent variables.
    ///
    /// Variable names are substituted with placeholder tokens in descending
    /// length order, in both the expression text and every parameter or
    /// sub-model name; names other than the variables are then restored, so
    /// only the canonical expression keeps placeholders. Returns true if the
    /// text parsed; on failure the model falls back to the constant `0` and
    /// the input text is retained for redisplay.
    pub fn set_expression(&mut self, expression: &str, var_names: &[&str]) -> bool {
        // one placeholder token per variable
        if var_names.is_empty() || var_names.len() > DUMMY_VARS.len() {
            return false;
        }
        self.vars = var_names.iter().map(|s| s.to_string()).collect();
        let n_vars = self.vars.len();
        let mut exp = expression.to_string();

        let mut names: Vec<String> =
            Vec::with_capacity(n_vars + self.param_names.len() + self.references.len());
        names.extend(self.vars.iter().cloned());
        names.extend(self.param_names.iter().cloned());
        names.extend(self.references.iter().map(|r| r.name().to_string()));

        // substitute variables longest-first so a short name cannot clobber a
        // longer one that contains it
        let mut order: Vec<usize> = (0..n_vars).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(self.vars[i].len()));
        for &i in &order {
            let var = self.vars[i].clone();
            exp = exp.replace(&var, DUMMY_VARS[i]);
            names[i] = DUMMY_VARS[i].to_string();
            for name in names.iter_mut().skip(n_vars) {
                *name = name.replace(&var, DUMMY_VARS[i]);
            }
            // un-substitute reserved function names the variable occurred in
            for func in FUNCTION_NAMES {
                let modified = func.replace(&var, DUMMY_VARS[i]);
                if modified != func {
                    exp = exp.replace(&modified, func);
                }
            }
        }

        // restore parameter and sub-model names that a pass modified
        for i in 0..self.param_names.len() {
            let j = n_vars + i;
            if names[j] != self.param_names[i] {
                exp = exp.replace(&names[j], &self.param_names[i]);
                names[j] = self.param_names[i].clone();
            }
        }
        for i in 0..self.references.len() {
            let j = n_vars + self.param_names.len() + i;
            let ref_name = self.references[i].name().to_string();
            if names[j] != ref_name {
                exp = exp.replace(&names[j], &ref_name);
                names[j] = ref_name;
            }
        }

        self.input_string = exp.clone();
        match ParsedFunction::parse(&exp, &names) {
            Ok(f) => {
                self.function = Some(f);
                if !exp.contains('=') {
                    self.expression = exp;
                    return true;
                }
                false
            }
            Err(_) => {
                self.function = ParsedFunction::parse("0", &names).ok();
                self.expression = "0".to_string();
                false
            }
        }
    }

    /// Gets the parameter count.
    pub fn parameter_count(&self) -> usize {
        self.param_names.len()
    }

    /// Gets a parameter name.
    pub fn parameter_name(&self, i: usize) -> &str {
        &self.param_names[i]
    }

    /// Gets a parameter value.
    pub fn parameter_value(&self, i: usize) -> f64 {
        self.param_values[i]
    }

    /// Sets a parameter value.
    pub fn set_parameter_value(&mut self, i: usize, value: f64) {
        self.param_values[i] = value;
    }

    /// Gets a parameter description, if any.
    pub fn parameter_description(&self, i: usize) -> Option<&str> {
        self.param_descriptions.get(i).and_then(|d| d.as_deref())
    }

    /// Replaces the parameter set. Descriptions may be omitted to keep the
    /// existing ones. The expression is not reparsed; call `set_expression`
    /// after changing parameter names.
    pub fn set_parameters(
        &mut self,
        names: &[String],
        values: &[f64],
        descriptions: Option<&[Option<String>]>,
    ) {
        self.param_names = names.to_vec();
        self.param_values = values.to_vec();
        if let Some(descriptions) = descriptions {
            self.param_descriptions = descriptions.to_vec();
        } else {
            self.param_descriptions.resize(names.len(), None);
        }
    }

    /// The referenced sub-models.
    pub fn references(&self) -> &[ExpressionModel] {
        &self.references
    }

    /// Sets the referenced sub-models.
    pub fn set_references(&mut self, references: Vec<ExpressionModel>) {
        self.references = references;
    }

    /// Copies this model's parameter set into every referenced sub-model,
    /// recursively.
    pub fn update_reference_parameters(&mut self) {
        let names = self.param_names.clone();
        let values = self.param_values.clone();
        let descriptions = self.param_descriptions.clone();
        for r in &mut self.references {
            r.set_parameters(&names, &values, Some(&descriptions));
            r.update_reference_parameters();
        }
    }

    /// The attached polynomial, if this model mirrors one.
    pub fn polynomial(&self) -> Option<&PolynomialModel> {
        self.polynomial.as_ref()
    }

    /// Pushes the current name, description and parameters into the attached
    /// polynomial. Returns false when no polynomial is attached.
    pub fn sync_polynomial(&mut self) -> bool {
        let Some(poly) = self.polynomial.as_mut() else {
            return false;
        };
        poly.set_name(&self.name);
        poly.set_description(self.description.as_deref());
        poly.set_parameters(
            Some(&self.param_names),
            Some(&self.param_values),
            Some(&self.param_descriptions),
        );
        true
    }

    /// Replaces a parameter name with a new one in the parameter list and in
    /// the expression, placeholder-izing any third name that collides with
    /// the new name before the rename. Returns the rewritten user-facing
    /// expression, or None if the rename could not be applied.
    pub fn replace_parameter_name(&mut self, old_name: &str, new_name: &str) -> Option<String> {
        let expression = self.input_string();
        let rewritten =
            expr::replace_name(&expression, old_name, new_name, &self.param_names)?;

        if let Some(i) = self.param_names.iter().position(|n| n == old_name) {
            self.param_names[i] = new_name.to_string();
        }
        let vars: Vec<String> = self.vars.clone();
        let var_refs: Vec<&str> = vars.iter().map(|s| s.as_str()).collect();
        if self.set_expression(&rewritten, &var_refs) {
            Some(rewritten)
        } else {
            None
        }
    }

    /// Evaluates the model for a single variable value.
    pub fn evaluate(&self, x: f64) -> f64 {
        let Some(function) = &self.function else {
            self.last_eval_non_finite.set(false);
            return f64::NAN;
        };
        let mut values = Vec::with_capacity(1 + self.param_values.len() + self.references.len());
        values.push(x);
        values.extend_from_slice(&self.param_values);
        for r in &self.references {
            values.push(r.evaluate(x));
        }
        let result = function.evaluate(&values);
        self.last_eval_non_finite.set(!result.is_finite());
        result
    }

    /// Evaluates the model for a variables array.
    pub fn evaluate_multi(&self, x: &[f64]) -> f64 {
        let Some(function) = &self.function else {
            self.last_eval_non_finite.set(false);
            return f64::NAN;
        };
        let mut values =
            Vec::with_capacity(x.len() + self.param_values.len() + self.references.len());
        values.extend_from_slice(x);
        values.extend_from_slice(&self.param_values);
        for r in &self.references {
            values.push(r.evaluate_multi(x));
        }
        let result = function.evaluate(&values);
        self.last_eval_non_finite.set(!result.is_finite());
        result
    }

    /// True if the most recent evaluation produced a non-finite value.
    /// Recomputed on every evaluation.
    pub fn evaluated_to_nan(&self) -> bool {
        self.last_eval_non_finite.get()
    }
}

impl PartialEq for ExpressionModel {
    /// Name, input string and parameter-name list must agree; descriptions
    /// and parameter values are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.input_string() == other.input_string()
            && self.param_names == other.param_names
    }
}
