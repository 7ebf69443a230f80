pub mod gneb;
pub mod llg;
pub mod optimizer;

use serde::{Deserialize, Serialize};

/// Bounds of one solver run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverParams {
    /// The loop performs at most this many iteration steps.
    pub max_iterations: usize,
    /// Every this many iterations the task publishes intermediate state
    /// (fresh energies, a progress event) without stopping.
    pub checkpoint_interval: usize,
    /// Norm above which an un-normalized spin update is declared diverged.
    /// The optimizer applies it before renormalization; see
    /// [`optimizer::Optimizer::step`]. Tunable; the useful range depends on
    /// the Hamiltonian scale.
    pub divergence_threshold: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            checkpoint_interval: 100,
            divergence_threshold: 1e8,
        }
    }
}
