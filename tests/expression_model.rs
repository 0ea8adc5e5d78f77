//! Integration tests for the expression model: round trips, collision
//! safety, sub-model references and parse-failure recovery.

use approx::assert_relative_eq;
use curvefit::model::{ExpressionModel, PolynomialModel};

fn model_with(params: &[(&str, f64)], expression: &str, vars: &[&str]) -> ExpressionModel {
    let mut f = ExpressionModel::new("test");
    let names: Vec<String> = params.iter().map(|(n, _)| n.to_string()).collect();
    let values: Vec<f64> = params.iter().map(|(_, v)| *v).collect();
    f.set_parameters(&names, &values, None);
    assert!(f.set_expression(expression, vars), "failed to parse {expression}");
    f
}

#[test]
fn round_trip_preserves_text() {
    for expression in [
        "a*x+b",
        "a*exp(-(x-b)^2/(2*c^2))",
        "sin(x)*cos(x)",
        "x^2 - 2*x + 1",
    ] {
        let f = model_with(
            &[("a", 1.0), ("b", 2.0), ("c", 3.0)],
            expression,
            &["x"],
        );
        assert_eq!(f.expression(), expression);
        assert_eq!(f.input_string(), expression);
    }
}

#[test]
fn round_trip_with_renamed_variable() {
    let mut f = model_with(&[("k", 2.0)], "k*theta", &["theta"]);
    assert_eq!(f.expression(), "k*theta");
    assert_eq!(f.expression_with(&["angle"]), "k*angle");
    assert_relative_eq!(f.evaluate(1.5), 3.0);
}

#[test]
fn parameter_named_like_reserved_function() {
    // parameter "sin" with expression x*sin must not be corrupted by the
    // reserved function of the same name
    let f = model_with(&[("sin", 4.0)], "x*sin", &["x"]);
    assert_relative_eq!(f.evaluate(2.5), 10.0);
    assert_eq!(f.expression(), "x*sin");
}

#[test]
fn variable_name_inside_function_and_parameter_names() {
    // variable "e" appears inside "exp", "ceil", ... and parameter "height"
    let mut f = ExpressionModel::new("tricky");
    f.set_parameters(&["height".to_string()], &[3.0], None);
    assert!(f.set_expression("height*exp(e)", &["e"]));
    assert_eq!(f.expression(), "height*exp(e)");
    assert_eq!(f.parameter_name(0), "height");
    assert_relative_eq!(f.evaluate(1.0), 3.0 * 1.0_f64.exp(), epsilon = 1e-12);
}

#[test]
fn multi_variable_longest_name_first() {
    let mut f = ExpressionModel::new("kinematics");
    f.set_parameters(&["g".to_string()], &[9.8], None);
    // "t" is a substring of "t0"
    assert!(f.set_expression("g*(t-t0)^2/2", &["t", "t0"]));
    assert_eq!(f.expression(), "g*(t-t0)^2/2");
    assert_relative_eq!(f.evaluate_multi(&[3.0, 1.0]), 9.8 * 2.0, epsilon = 1e-12);
}

#[test]
fn malformed_expression_falls_back_to_zero() {
    let mut f = model_with(&[("a", 1.0)], "a*x", &["x"]);
    assert!(!f.set_expression("a*(x", &["x"]));
    assert_relative_eq!(f.evaluate(7.0), 0.0);
    // the bad input is preserved for re-editing, never auto-corrected
    assert_eq!(f.input_string(), "a*(x");
    assert_eq!(f.expression(), "0");

    // a later valid edit recovers
    assert!(f.set_expression("a*x*2", &["x"]));
    assert_relative_eq!(f.evaluate(7.0), 14.0);
}

#[test]
fn unknown_identifier_falls_back_to_zero() {
    let mut f = model_with(&[("a", 1.0)], "a*x", &["x"]);
    assert!(!f.set_expression("a*x + missing", &["x"]));
    assert_relative_eq!(f.evaluate(1.0), 0.0);
}

#[test]
fn non_finite_flag_recomputed_every_evaluation() {
    let f = model_with(&[("a", 1.0)], "sqrt(x)*a", &["x"]);
    assert!(f.evaluate(-1.0).is_nan());
    assert!(f.evaluated_to_nan());
    assert_relative_eq!(f.evaluate(4.0), 2.0);
    assert!(!f.evaluated_to_nan());
}

#[test]
fn references_evaluate_and_expand() {
    let mut background = ExpressionModel::new("background");
    background.set_parameters(&["b0".to_string(), "b1".to_string()], &[0.5, 0.1], None);
    assert!(background.set_expression("b0 + b1*x", &["x"]));

    let mut peak = ExpressionModel::new("peak");
    peak.set_parameters(&["amp".to_string()], &[2.0], None);
    peak.set_references(vec![background]);
    assert!(peak.set_expression("amp*exp(-x^2) + background", &["x"]));

    let expected = 2.0 * (-1.0_f64).exp() + 0.5 + 0.1;
    assert_relative_eq!(peak.evaluate(1.0), expected, epsilon = 1e-12);
    assert_eq!(
        peak.full_expression(&["x"]),
        "amp*exp(-x^2) + (b0 + b1*x)"
    );
}

#[test]
fn clone_survives_mutation_of_the_original() {
    let mut original = model_with(&[("a", 2.0)], "a*x", &["x"]);
    let snapshot = original.clone();
    original.set_parameter_value(0, 99.0);
    assert!(original.set_expression("a*x+1", &["x"]));

    assert_eq!(snapshot.parameter_value(0), 2.0);
    assert_eq!(snapshot.expression(), "a*x");
    assert_relative_eq!(snapshot.evaluate(3.0), 6.0);
}

#[test]
fn equality_ignores_values() {
    let f = model_with(&[("a", 1.0)], "a*x", &["x"]);
    let mut g = model_with(&[("a", 5.0)], "a*x", &["x"]);
    assert_eq!(f, g);
    g.set_parameters(&["b".to_string()], &[1.0], None);
    assert!(g.set_expression("b*x", &["x"]));
    assert_ne!(f, g);
}

#[test]
fn polynomial_bridge_round_trip() {
    let poly = PolynomialModel::from_coefficients(&[1.0, -2.0, 0.5]).unwrap();
    let mut f = ExpressionModel::from_polynomial(&poly);
    assert_eq!(f.expression(), "A*x^2 + B*x + C");
    for x in [-1.0, 0.0, 2.0] {
        assert_relative_eq!(f.evaluate(x), poly.evaluate(x), epsilon = 1e-12);
    }

    // renaming and editing parameters flows back into the polynomial
    f.replace_parameter_name("A", "curvature").unwrap();
    f.set_parameter_value(0, 1.5);
    assert!(f.sync_polynomial());
    let synced = f.polynomial().unwrap();
    assert_eq!(synced.parameter_name(0), "curvature");
    assert_eq!(synced.parameter_value(0), 1.5);
}
