use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{what} index {index} out of range (count: {count})")]
    IndexOutOfRange {
        what: &'static str,
        index: i32,
        count: usize,
    },

    #[error("spin count mismatch: chain expects {expected}, image has {found}")]
    SizeMismatch { expected: usize, found: usize },

    #[error("structural conflict: {0}")]
    StructuralConflict(String),

    #[error("simulation diverged at iteration {iteration}: non-finite spin state")]
    DivergedSimulation { iteration: usize },

    #[error("internal logic error: {0}")]
    Internal(String),
}
