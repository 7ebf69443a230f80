use super::error::CoreError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Final state of a completed solver run.
#[derive(Debug, Clone, Copy)]
pub struct SolverReport {
    /// Iteration steps actually performed.
    pub iterations: usize,
    /// Energy of the target at the end of the run.
    pub energy: f64,
}

/// Owns the background task of one image (LLG) or one chain (GNEB).
///
/// A controller lives alongside the entity it drives, so there is exactly one
/// per key and its lifetime ends with the entity's. Cancellation is
/// cooperative: the task polls `iteration_allowed` at iteration boundaries
/// and is never terminated forcibly. Both [`SolverController::start`] and
/// [`SolverController::stop`] join the previous task before returning, so two
/// tasks never write the same spin array.
#[derive(Debug, Default)]
pub struct SolverController {
    iteration_allowed: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<SolverReport, CoreError>>>,
}

impl SolverController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the driven entity may currently be iterated.
    pub fn iteration_allowed(&self) -> bool {
        self.iteration_allowed.load(Ordering::Acquire)
    }

    /// Whether a task is registered and has not finished its loop yet.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Launches `task` on a background thread.
    ///
    /// Any previous task for this controller is stopped and joined first; a
    /// divergence it reports is logged and discarded, since it concerns the
    /// run that is being replaced.
    pub fn start<F>(&mut self, task: F) -> Result<(), CoreError>
    where
        F: FnOnce(Arc<AtomicBool>) -> Result<SolverReport, CoreError> + Send + 'static,
    {
        if let Err(err) = self.stop() {
            warn!(%err, "previous solver task ended abnormally, starting anyway");
        }
        self.iteration_allowed.store(true, Ordering::Release);
        let flag = self.iteration_allowed.clone();
        self.handle = Some(std::thread::spawn(move || task(flag)));
        Ok(())
    }

    /// Requests a cooperative stop and joins the task.
    ///
    /// Returns the report of the joined run, `None` when no task was
    /// registered, or the error the run ended with (divergence included).
    pub fn stop(&mut self) -> Result<Option<SolverReport>, CoreError> {
        self.iteration_allowed.store(false, Ordering::Release);
        self.join()
    }

    /// Joins the task without requesting a stop, waiting for it to finish its
    /// iteration budget naturally.
    pub fn wait(&mut self) -> Result<Option<SolverReport>, CoreError> {
        self.join()
    }

    fn join(&mut self) -> Result<Option<SolverReport>, CoreError> {
        match self.handle.take() {
            None => Ok(None),
            Some(handle) => {
                let joined = handle
                    .join()
                    .map_err(|_| CoreError::Internal("solver thread panicked".into()))?;
                debug!(ok = joined.is_ok(), "solver task joined");
                joined.map(Some)
            }
        }
    }
}

impl Drop for SolverController {
    fn drop(&mut self) {
        // No task may outlive the entity it writes to.
        self.iteration_allowed.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
