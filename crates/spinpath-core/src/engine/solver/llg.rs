use super::SolverParams;
use super::optimizer::{Optimizer, OptimizerKind};
use crate::core::system::SharedSystem;
use crate::engine::chain::{read_system, write_system};
use crate::engine::controller::SolverReport;
use crate::engine::error::CoreError;
use crate::engine::progress::{Progress, ProgressReporter};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Body of an LLG background task: iterates one image until the iteration
/// budget is exhausted or `iteration_allowed` is cleared.
///
/// The flag is polled at iteration boundaries only; the loop never blocks
/// mid-step. The write lock is held for exactly one step at a time so
/// readers can interleave snapshots.
pub(crate) fn run(
    system: SharedSystem,
    iteration_allowed: Arc<AtomicBool>,
    kind: OptimizerKind,
    params: SolverParams,
    reporter: ProgressReporter,
) -> Result<SolverReport, CoreError> {
    let nos = read_system(&system)?.nos();
    let mut optimizer = Optimizer::new(kind, nos, params.divergence_threshold);
    let mut rng = StdRng::from_entropy();
    info!(?kind, nos, max_iterations = params.max_iterations, "LLG run starting");
    reporter.report(Progress::Started {
        max_iterations: params.max_iterations,
    });

    let mut iterations = 0;
    for it in 0..params.max_iterations {
        if !iteration_allowed.load(Ordering::Acquire) {
            debug!(iteration = it, "LLG run stopped cooperatively");
            break;
        }
        let healthy = {
            let mut guard = write_system(&system)?;
            optimizer.step(&mut guard, &mut rng)
        };
        if !healthy {
            iteration_allowed.store(false, Ordering::Release);
            return Err(CoreError::DivergedSimulation { iteration: it });
        }
        iterations = it + 1;
        if params.checkpoint_interval > 0 && iterations % params.checkpoint_interval == 0 {
            let energy = write_system(&system)?.update_energy();
            reporter.report(Progress::IterationCheckpoint {
                iteration: iterations,
                max_iterations: params.max_iterations,
                energy,
            });
        }
    }

    iteration_allowed.store(false, Ordering::Release);
    let energy = write_system(&system)?.update_energy();
    info!(iterations, energy, "LLG run finished");
    reporter.report(Progress::Finished { iterations, energy });
    Ok(SolverReport { iterations, energy })
}
