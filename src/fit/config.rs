//! Configuration options for the fit engine.

/// Configuration for [`FitEngine`](crate::fit::FitEngine).
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Iteration budget handed to each minimizer per fit call. Default: 20
    pub max_iterations: usize,

    /// Convergence tolerance handed to each minimizer. Default: 1e-6
    pub tolerance: f64,

    /// Whether automatic fitting starts enabled. Default: true
    pub autofit: bool,
}

impl FitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-minimizer iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the minimizer convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the initial autofit state.
    pub fn with_autofit(mut self, autofit: bool) -> Self {
        self.autofit = autofit;
        self
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            tolerance: 1e-6,
            autofit: true,
        }
    }
}
