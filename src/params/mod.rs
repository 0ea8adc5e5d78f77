//! # Parameter System
//!
//! Named parameters whose values are expressions of the other parameters.
//!
//! - [`Parameter`]: one named expression with a cached numeric value,
//!   description and editability flags
//! - [`ParameterGraph`]: an ordered collection evaluated in declaration
//!   order, with circular-reference tracking, dependent propagation and
//!   collision-safe renames
//!
//! ## Example Usage
//!
//! ```rust
//! use curvefit::params::{Parameter, ParameterGraph};
//!
//! let mut graph = ParameterGraph::new();
//! graph.add(Parameter::new("m", "0.5")).unwrap();
//! graph.add(Parameter::new("g", "9.8")).unwrap();
//! graph.add(Parameter::new("weight", "m*g")).unwrap();
//!
//! assert_eq!(graph.get("weight").unwrap().value(), 4.9);
//!
//! // push a single edit forward into its dependents
//! let changed = graph.evaluate_dependents(&Parameter::new("m", "2.0"));
//! assert_eq!(changed[0].name(), "weight");
//! assert_eq!(changed[0].value(), 19.6);
//! ```

pub mod graph;
pub mod parameter;

// Re-export key types
pub use graph::ParameterGraph;
pub use parameter::Parameter;
