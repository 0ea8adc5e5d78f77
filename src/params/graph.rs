//! Parameter graph: an ordered collection of interdependent parameters
//!
//! Parameters evaluate in declaration order against the other parameters'
//! most-recently-cached values. A dependent declared *after* what it depends
//! on reads the value computed earlier in the same pass; one declared
//! *before* reads the previous pass's value. This first-declared-first-
//! evaluated rule is the documented contract, not a topological sort.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{FitError, Result};
use crate::events::ChangeEvent;
use crate::expr::{self, Expression};
use crate::params::parameter::{eval_against, try_eval_against, Parameter};

/// An ordered, named collection of parameters whose expressions may refer to
/// each other.
///
/// The graph tracks which parameters sit in a circular-dependency cycle (or
/// fail to parse); those evaluate to NaN without blocking the rest.
#[derive(Debug, Default)]
pub struct ParameterGraph {
    params: Vec<Parameter>,
    forbidden_names: HashSet<String>,
    circular_errors: HashSet<String>,
    events: Vec<ChangeEvent>,
}

impl ParameterGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph with a set of reserved tokens that may not be
    /// used as parameter names (variable names, function names of the owning
    /// tool, and so on).
    pub fn with_forbidden_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            forbidden_names: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add a reserved token to the forbidden-name set.
    pub fn add_forbidden_name(&mut self, name: &str) {
        self.forbidden_names.insert(name.to_string());
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// True when the graph holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The parameters in declaration order.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Parameter names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name().to_string()).collect()
    }

    /// Cached parameter values in declaration order.
    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value()).collect()
    }

    /// Parameter descriptions in declaration order.
    pub fn descriptions(&self) -> Vec<Option<String>> {
        self.params
            .iter()
            .map(|p| p.description().map(|s| s.to_string()))
            .collect()
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name() == name)
    }

    /// True if a parameter with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// True if `name` may not be given to a (possibly existing) parameter:
    /// empty, reserved, or already taken by a parameter other than `current`.
    pub fn is_disallowed_name(&self, current: Option<&str>, name: &str) -> bool {
        if name.trim().is_empty() || self.forbidden_names.contains(name) {
            return true;
        }
        self.params
            .iter()
            .any(|p| p.name() == name && current != Some(p.name()))
    }

    /// Append a parameter and re-evaluate the graph.
    pub fn add(&mut self, param: Parameter) -> Result<()> {
        if self.is_disallowed_name(None, param.name()) {
            return Err(FitError::InvalidInput(format!(
                "parameter name '{}' is reserved or already in use",
                param.name()
            )));
        }
        self.events.push(ChangeEvent::Function {
            old: None,
            new: Some(param.name().to_string()),
        });
        self.params.push(param);
        self.evaluate_all();
        Ok(())
    }

    /// Remove a parameter by name and re-evaluate the graph.
    pub fn remove(&mut self, name: &str) -> Option<Parameter> {
        let idx = self.params.iter().position(|p| p.name() == name)?;
        let removed = self.params.remove(idx);
        self.events.push(ChangeEvent::Function {
            old: Some(name.to_string()),
            new: None,
        });
        self.evaluate_all();
        Some(removed)
    }

    /// Set a parameter to a literal value (the table-cell edit operation).
    /// The expression becomes the literal, so later passes reproduce it.
    pub fn set_value(&mut self, name: &str, value: f64) -> Result<()> {
        let idx = self
            .params
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| FitError::ParameterNotFound(name.to_string()))?;
        if !self.params[idx].is_expression_editable() {
            return Err(FitError::ParameterError(format!(
                "expression of '{}' is not editable",
                name
            )));
        }
        let old = self.params[idx].value();
        self.params[idx].set_expression(&format!("{}", value));
        self.params[idx].set_value(value);
        self.events.push(ChangeEvent::Edit {
            name: name.to_string(),
            old,
            new: value,
        });
        Ok(())
    }

    /// Replace a parameter's expression and re-evaluate the graph.
    pub fn set_expression(&mut self, name: &str, expression: &str) -> Result<()> {
        let idx = self
            .params
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| FitError::ParameterNotFound(name.to_string()))?;
        if !self.params[idx].is_expression_editable() {
            return Err(FitError::ParameterError(format!(
                "expression of '{}' is not editable",
                name
            )));
        }
        self.params[idx].set_expression(expression);
        self.events.push(ChangeEvent::Function {
            old: Some(name.to_string()),
            new: Some(name.to_string()),
        });
        self.evaluate_all();
        Ok(())
    }

    /// Rename a parameter, rewriting every other parameter's expression that
    /// references the old name. Rewriting placeholder-izes any third name
    /// that collides with the new name before the rename, then restores it.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let idx = self
            .params
            .iter()
            .position(|p| p.name() == old_name)
            .ok_or_else(|| FitError::ParameterNotFound(old_name.to_string()))?;
        if !self.params[idx].is_name_editable() {
            return Err(FitError::ParameterError(format!(
                "name of '{}' is not editable",
                old_name
            )));
        }
        if self.is_disallowed_name(Some(old_name), new_name) {
            return Err(FitError::InvalidInput(format!(
                "parameter name '{}' is reserved or already in use",
                new_name
            )));
        }
        let names = self.names();
        for i in 0..self.params.len() {
            if i == idx || !self.params[i].expression().contains(old_name) {
                continue;
            }
            if let Some(rewritten) =
                expr::replace_name(self.params[i].expression(), old_name, new_name, &names)
            {
                self.params[i].set_expression(&rewritten);
            }
        }
        self.params[idx].set_name(new_name);
        self.events.push(ChangeEvent::Function {
            old: Some(old_name.to_string()),
            new: Some(new_name.to_string()),
        });
        self.evaluate_all();
        Ok(())
    }

    /// Names this parameter's expression depends on, directly or transitively.
    pub fn references(&self, name: &str) -> HashSet<String> {
        let mut refs = HashSet::new();
        let mut stack: Vec<String> = self.direct_references(name).into_iter().collect();
        while let Some(next) = stack.pop() {
            if refs.insert(next.clone()) {
                stack.extend(self.direct_references(&next));
            }
        }
        refs
    }

    fn direct_references(&self, name: &str) -> HashSet<String> {
        let Some(p) = self.get(name) else {
            return HashSet::new();
        };
        match Expression::parse(p.expression()) {
            Ok(ast) => ast
                .variables()
                .into_iter()
                .filter(|v| self.params.iter().any(|q| q.name() == v.as_str()))
                .collect(),
            Err(_) => HashSet::new(),
        }
    }

    /// Evaluate every parameter in declaration order.
    ///
    /// Cycle members and unparseable parameters are pinned to NaN and
    /// recorded in the circular-errors set; everything else evaluates against
    /// the current name→value map, so a dependency declared later still holds
    /// its previous-pass value when read.
    pub fn evaluate_all(&mut self) {
        self.circular_errors.clear();
        let names = self.names();
        let mut circular = HashSet::new();
        for name in &names {
            if self.references(name).contains(name) {
                circular.insert(name.clone());
            }
        }
        for i in 0..self.params.len() {
            let name = self.params[i].name().to_string();
            if circular.contains(&name) {
                self.params[i].set_value(f64::NAN);
                self.circular_errors.insert(name);
                continue;
            }
            let result = try_eval_against(self.params[i].expression(), &name, &self.params);
            match result {
                Ok(v) => self.params[i].set_value(v),
                Err(_) => {
                    self.params[i].set_value(f64::NAN);
                    self.circular_errors.insert(name);
                }
            }
        }
    }

    /// Re-evaluate the parameters declared after `seed` against a working
    /// copy that begins with the seed's new value.
    ///
    /// Returns the evaluated dependents in declaration order. The seed itself
    /// and parameters whose expressions reference nothing are pruned from the
    /// result.
    pub fn evaluate_dependents(&self, seed: &Parameter) -> Vec<Parameter> {
        let Some(start) = self.params.iter().position(|p| p.name() == seed.name()) else {
            return Vec::new();
        };
        let mut temp = vec![seed.clone()];
        for p in &self.params[start + 1..] {
            temp.push(Parameter::new(p.name(), p.expression()));
        }
        for j in 0..temp.len() {
            let v = eval_against(temp[j].expression(), temp[j].name(), &temp);
            temp[j].set_value(v);
        }
        temp.retain(|p| p.name() != seed.name() && !self.references(p.name()).is_empty());
        temp
    }

    /// Parameter names currently detected as cycle members or parse failures.
    pub fn circular_errors(&self) -> &HashSet<String> {
        &self.circular_errors
    }

    /// True if `expression` evaluates to a finite value against the current
    /// parameters (probed with a scratch parameter).
    pub fn is_valid_expression(&self, expression: &str) -> bool {
        eval_against(expression, "xxzz", &self.params).is_finite()
    }

    /// Drain queued change notifications.
    pub fn take_events(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Serialize the parameter list (names, expressions, descriptions,
    /// editability) to JSON. Cached values are not persisted.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.params)?)
    }

    /// Rebuild a graph from [`to_json`](Self::to_json) output and evaluate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Vec<Parameter> = serde_json::from_str(json)?;
        let mut graph = Self::new();
        for p in params {
            if graph.contains(p.name()) {
                return Err(FitError::InvalidInput(format!(
                    "duplicate parameter name '{}'",
                    p.name()
                )));
            }
            graph.params.push(p);
        }
        graph.evaluate_all();
        graph.events.clear();
        Ok(graph)
    }

    /// Write the JSON form to a file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load a graph from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_abc() -> ParameterGraph {
        let mut g = ParameterGraph::new();
        g.add(Parameter::new("a", "2.0")).unwrap();
        g.add(Parameter::new("b", "a*3")).unwrap();
        g.add(Parameter::new("c", "b+a")).unwrap();
        g
    }

    #[test]
    fn test_declaration_order_evaluation() {
        let g = graph_abc();
        assert_eq!(g.get("a").unwrap().value(), 2.0);
        assert_eq!(g.get("b").unwrap().value(), 6.0);
        assert_eq!(g.get("c").unwrap().value(), 8.0);
    }

    #[test]
    fn test_stale_read_of_later_declared_parameter() {
        let mut g = ParameterGraph::new();
        // early references late: on the first pass "late" is still NaN
        g.add(Parameter::new("early", "late+1")).unwrap();
        g.add(Parameter::new("late", "5")).unwrap();

        assert!(g.get("early").unwrap().value().is_nan());
        assert_eq!(g.get("late").unwrap().value(), 5.0);

        // the next pass reads the value cached by the previous one
        g.evaluate_all();
        assert_eq!(g.get("early").unwrap().value(), 6.0);
    }

    #[test]
    fn test_circular_reference() {
        let mut g = ParameterGraph::new();
        g.add(Parameter::new("p", "q+1")).unwrap();
        g.add(Parameter::new("q", "p+1")).unwrap();
        g.add(Parameter::new("r", "3")).unwrap();

        assert!(g.get("p").unwrap().value().is_nan());
        assert!(g.get("q").unwrap().value().is_nan());
        assert!(g.circular_errors().contains("p"));
        assert!(g.circular_errors().contains("q"));
        // unrelated parameters still evaluate
        assert_eq!(g.get("r").unwrap().value(), 3.0);
        assert!(!g.circular_errors().contains("r"));
    }

    #[test]
    fn test_self_reference_is_circular() {
        let mut g = ParameterGraph::new();
        g.add(Parameter::new("a", "a+1")).unwrap();
        assert!(g.get("a").unwrap().value().is_nan());
        assert!(g.circular_errors().contains("a"));
    }

    #[test]
    fn test_parse_failure_surfaces_as_error() {
        let mut g = ParameterGraph::new();
        g.add(Parameter::new("ok", "1")).unwrap();
        g.add(Parameter::new("bad", "2 +* 3")).unwrap();
        assert!(g.get("bad").unwrap().value().is_nan());
        assert!(g.circular_errors().contains("bad"));
        assert_eq!(g.get("ok").unwrap().value(), 1.0);
    }

    #[test]
    fn test_evaluate_dependents() {
        let g = graph_abc();
        let changed = g.evaluate_dependents(&Parameter::new("a", "10"));
        assert_eq!(changed.len(), 2);
        assert_eq!(changed[0].name(), "b");
        assert_eq!(changed[0].value(), 30.0);
        assert_eq!(changed[1].name(), "c");
        assert_eq!(changed[1].value(), 40.0);
        // the graph itself is untouched
        assert_eq!(g.get("b").unwrap().value(), 6.0);
    }

    #[test]
    fn test_evaluate_dependents_prunes_constants() {
        let mut g = ParameterGraph::new();
        g.add(Parameter::new("a", "1")).unwrap();
        g.add(Parameter::new("k", "42")).unwrap();
        g.add(Parameter::new("d", "a*2")).unwrap();

        let changed = g.evaluate_dependents(&Parameter::new("a", "3"));
        // "k" references nothing and is pruned; seed is never returned
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].name(), "d");
        assert_eq!(changed[0].value(), 6.0);
    }

    #[test]
    fn test_rename_rewrites_references() {
        let mut g = graph_abc();
        g.rename("a", "base").unwrap();
        assert!(g.contains("base"));
        assert_eq!(g.get("b").unwrap().expression(), "base*3");
        assert_eq!(g.get("c").unwrap().expression(), "b+base");
        assert_eq!(g.get("c").unwrap().value(), 8.0);
    }

    #[test]
    fn test_rename_collision_with_longer_sibling() {
        let mut g = ParameterGraph::new();
        g.add(Parameter::new("a", "1")).unwrap();
        g.add(Parameter::new("ab", "2")).unwrap();
        g.add(Parameter::new("sum", "a+ab")).unwrap();

        // renaming "a" must not corrupt the reference to "ab"
        g.rename("a", "z").unwrap();
        assert_eq!(g.get("sum").unwrap().expression(), "z+ab");
        assert_eq!(g.get("sum").unwrap().value(), 3.0);
    }

    #[test]
    fn test_disallowed_names() {
        let mut g = ParameterGraph::with_forbidden_names(["x", "t"]);
        assert!(g.add(Parameter::new("x", "1")).is_err());
        g.add(Parameter::new("a", "1")).unwrap();
        assert!(g.add(Parameter::new("a", "2")).is_err());
        assert!(g.is_disallowed_name(None, ""));
        // keeping a parameter's own name is allowed
        assert!(!g.is_disallowed_name(Some("a"), "a"));
    }

    #[test]
    fn test_editability_flags() {
        let mut g = ParameterGraph::new();
        let mut p = Parameter::new("fixed", "1");
        p.set_name_editable(false);
        p.set_expression_editable(false);
        g.add(p).unwrap();

        assert!(g.rename("fixed", "other").is_err());
        assert!(g.set_expression("fixed", "2").is_err());
        assert!(g.set_value("fixed", 2.0).is_err());
    }

    #[test]
    fn test_set_value_emits_edit_event() {
        let mut g = graph_abc();
        g.take_events();
        g.set_value("a", 7.0).unwrap();
        let events = g.take_events();
        assert_eq!(
            events,
            vec![ChangeEvent::Edit {
                name: "a".to_string(),
                old: 2.0,
                new: 7.0,
            }]
        );
        assert_eq!(g.get("a").unwrap().expression(), "7");
    }

    #[test]
    fn test_is_valid_expression() {
        let g = graph_abc();
        assert!(g.is_valid_expression("a+b"));
        assert!(!g.is_valid_expression("a+undefined"));
        assert!(!g.is_valid_expression("2 +* 3"));
    }

    #[test]
    fn test_json_round_trip() {
        let g = graph_abc();
        let json = g.to_json().unwrap();
        let loaded = ParameterGraph::from_json(&json).unwrap();
        assert_eq!(loaded.names(), g.names());
        assert_eq!(loaded.values(), g.values());
    }
}
