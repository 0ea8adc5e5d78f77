//! Fit engine: two-tier autofit orchestration with rollback.
//!
//! See [`FitEngine::fit`] for the pass structure: closed-form path for
//! polynomials, Hessian then Levenberg-Marquardt for expression models, a
//! linear-regression statistics refresh on every pass, and three
//! distinguishable outcomes (`NoData`, `Undefined`, `Rms`).

pub mod config;
pub mod engine;

// Re-export key types
pub use config::FitConfig;
pub use engine::{AttemptOutcome, FitAttempt, FitEngine, FitOutcome, MinimizerKind};
