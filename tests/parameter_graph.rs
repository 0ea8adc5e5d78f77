//! Integration tests for the parameter graph: declaration-order evaluation,
//! circular detection, dependent propagation, renames and persistence.

use curvefit::events::ChangeEvent;
use curvefit::params::{Parameter, ParameterGraph};

#[test]
fn chain_evaluates_in_declaration_order() {
    let mut g = ParameterGraph::new();
    g.add(Parameter::new("m", "0.35")).unwrap();
    g.add(Parameter::new("g", "9.8")).unwrap();
    g.add(Parameter::new("weight", "m*g")).unwrap();
    g.add(Parameter::new("double_weight", "2*weight")).unwrap();

    assert_eq!(g.values(), vec![0.35, 9.8, 0.35 * 9.8, 2.0 * 0.35 * 9.8]);
}

#[test]
fn forward_reference_reads_stale_value() {
    // dependents must be declared after what they depend on; declared-before
    // dependents read the previous pass's value by design
    let mut g = ParameterGraph::new();
    g.add(Parameter::new("early", "late*2")).unwrap();
    g.add(Parameter::new("late", "4")).unwrap();

    // first full pass: "late" was NaN when "early" evaluated
    assert!(g.get("early").unwrap().value().is_nan());

    g.evaluate_all();
    assert_eq!(g.get("early").unwrap().value(), 8.0);

    // an edit shows up in "early" only on the next pass
    g.set_value("late", 10.0).unwrap();
    assert_eq!(g.get("early").unwrap().value(), 8.0);
    g.evaluate_all();
    assert_eq!(g.get("early").unwrap().value(), 20.0);
}

#[test]
fn mutual_cycle_reports_both_members() {
    let mut g = ParameterGraph::new();
    g.add(Parameter::new("alpha", "beta/2")).unwrap();
    g.add(Parameter::new("beta", "alpha*2")).unwrap();
    g.add(Parameter::new("stable", "7")).unwrap();

    assert!(g.circular_errors().contains("alpha"));
    assert!(g.circular_errors().contains("beta"));
    assert_eq!(g.circular_errors().len(), 2);
    assert!(g.get("alpha").unwrap().value().is_nan());
    assert!(g.get("beta").unwrap().value().is_nan());
    assert_eq!(g.get("stable").unwrap().value(), 7.0);

    // breaking the cycle clears the error set
    g.set_expression("beta", "5").unwrap();
    assert!(g.circular_errors().is_empty());
    assert_eq!(g.get("beta").unwrap().value(), 5.0);
    // alpha reads beta's fresh value on the next pass
    g.evaluate_all();
    assert_eq!(g.get("alpha").unwrap().value(), 2.5);
}

#[test]
fn cycle_member_does_not_block_downstream_constant() {
    let mut g = ParameterGraph::new();
    g.add(Parameter::new("a", "b")).unwrap();
    g.add(Parameter::new("b", "a")).unwrap();
    g.add(Parameter::new("c", "1+1")).unwrap();
    g.add(Parameter::new("d", "c*3")).unwrap();

    assert_eq!(g.get("c").unwrap().value(), 2.0);
    assert_eq!(g.get("d").unwrap().value(), 6.0);
}

#[test]
fn dependents_of_an_edit() {
    let mut g = ParameterGraph::new();
    g.add(Parameter::new("radius", "2")).unwrap();
    g.add(Parameter::new("unrelated", "11")).unwrap();
    g.add(Parameter::new("area", "3.14159*radius^2")).unwrap();
    g.add(Parameter::new("volume", "area*radius")).unwrap();

    let changed = g.evaluate_dependents(&Parameter::new("radius", "3"));
    let names: Vec<&str> = changed.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["area", "volume"]);
    assert!((changed[0].value() - 3.14159 * 9.0).abs() < 1e-9);
    assert!((changed[1].value() - 3.14159 * 27.0).abs() < 1e-9);

    // the stored graph keeps its old values until the edit is applied
    assert_eq!(g.get("radius").unwrap().value(), 2.0);
}

#[test]
fn transitive_references_query() {
    let mut g = ParameterGraph::new();
    g.add(Parameter::new("a", "1")).unwrap();
    g.add(Parameter::new("b", "a+1")).unwrap();
    g.add(Parameter::new("c", "b+1")).unwrap();

    let refs = g.references("c");
    assert!(refs.contains("a"));
    assert!(refs.contains("b"));
    assert!(!refs.contains("c"));
    assert!(g.references("a").is_empty());
}

#[test]
fn rename_updates_dependent_expressions() {
    let mut g = ParameterGraph::new();
    g.add(Parameter::new("L", "0.5")).unwrap();
    g.add(Parameter::new("L0", "0.4")).unwrap();
    g.add(Parameter::new("strain", "(L-L0)/L0")).unwrap();

    // renaming "L" must leave "L0" references intact
    g.rename("L", "length").unwrap();
    assert_eq!(g.get("strain").unwrap().expression(), "(length-L0)/L0");
    let expected = (0.5 - 0.4) / 0.4;
    assert!((g.get("strain").unwrap().value() - expected).abs() < 1e-12);
}

#[test]
fn rename_to_reserved_name_is_rejected() {
    let mut g = ParameterGraph::with_forbidden_names(["x"]);
    g.add(Parameter::new("a", "1")).unwrap();
    assert!(g.rename("a", "x").is_err());
    assert!(g.contains("a"));
}

#[test]
fn events_track_graph_edits() {
    let mut g = ParameterGraph::new();
    g.add(Parameter::new("a", "1")).unwrap();
    g.add(Parameter::new("b", "a*2")).unwrap();
    g.take_events();

    g.set_value("a", 3.0).unwrap();
    g.rename("b", "scaled").unwrap();
    g.remove("a").unwrap();

    let events = g.take_events();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], ChangeEvent::Edit { .. }));
    assert_eq!(
        events[1],
        ChangeEvent::Function {
            old: Some("b".to_string()),
            new: Some("scaled".to_string()),
        }
    );
    assert_eq!(
        events[2],
        ChangeEvent::Function {
            old: Some("a".to_string()),
            new: None,
        }
    );
}

#[test]
fn json_persistence_round_trip() {
    let mut g = ParameterGraph::new();
    g.add(Parameter::with_description("tau", "2.5", "time constant"))
        .unwrap();
    let mut fixed = Parameter::new("rate", "1/tau");
    fixed.set_expression_editable(false);
    g.add(fixed).unwrap();

    let json = g.to_json().unwrap();
    let loaded = ParameterGraph::from_json(&json).unwrap();

    assert_eq!(loaded.names(), vec!["tau".to_string(), "rate".to_string()]);
    assert_eq!(loaded.get("tau").unwrap().description(), Some("time constant"));
    assert!(!loaded.get("rate").unwrap().is_expression_editable());
    // values are re-evaluated, not persisted
    assert_eq!(loaded.get("rate").unwrap().value(), 0.4);
}

#[test]
fn removing_a_dependency_turns_dependent_invalid() {
    let mut g = ParameterGraph::new();
    g.add(Parameter::new("base", "10")).unwrap();
    g.add(Parameter::new("derived", "base+1")).unwrap();
    assert_eq!(g.get("derived").unwrap().value(), 11.0);

    g.remove("base");
    assert!(g.get("derived").unwrap().value().is_nan());
    assert!(g.circular_errors().contains("derived"));
}
