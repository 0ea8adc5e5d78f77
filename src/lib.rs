//! # curvefit
//!
//! `curvefit` is a parametric-function evaluation and curve-fitting engine:
//! user-editable mathematical expressions with named parameters, a dependency
//! graph of parameters defined in terms of each other, and a two-tier
//! nonlinear least-squares autofit with deterministic rollback plus
//! closed-form linear-regression statistics.
//!
//! The library provides:
//! - [`model::ExpressionModel`]: a parsed expression over independent
//!   variables, parameters and referenced sub-models, with collision-safe
//!   name substitution
//! - [`params::ParameterGraph`]: parameters evaluated in declaration order
//!   with circular-reference detection and dependent propagation
//! - [`fit::FitEngine`]: autofit orchestration with a closed-form polynomial
//!   path and a Hessian → Levenberg-Marquardt fallback sequence
//! - [`stats::RegressionStats`]: Pearson correlation and linear-fit
//!   standard errors
//!
//! ## Basic Usage
//!
//! ```
//! use curvefit::fit::{FitEngine, FitOutcome};
//! use curvefit::model::{ExpressionModel, FitModel};
//!
//! let mut f = ExpressionModel::new("line");
//! f.set_parameters(&["a".to_string(), "b".to_string()], &[1.0, 0.5], None);
//! assert!(f.set_expression("a*x+b", &["x"]));
//!
//! let mut engine = FitEngine::new();
//! let mut model = FitModel::Expression(f);
//! let x = [0.0, 1.0, 2.0, 3.0, 4.0];
//! let y = [0.1, 0.9, 2.05, 2.95, 4.1];
//! match engine.fit(&mut model, &x, &y) {
//!     FitOutcome::Rms(rms) => assert!(rms < 0.2),
//!     other => panic!("unexpected outcome {:?}", other),
//! }
//! ```

// Public modules
pub mod error;

pub mod events;

pub mod expr;

// Parameter system
pub mod params;

pub mod minimize;

pub mod model;

pub mod fit;

pub mod stats;

// Re-exports for convenience
pub use error::{FitError, Result};

pub use fit::{FitEngine, FitOutcome};

pub use model::{ExpressionModel, FitModel, PolynomialModel};

pub use params::{Parameter, ParameterGraph};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
