use crate::engine::controller::SolverReport;
use crate::engine::error::CoreError;
use crate::engine::progress::ProgressReporter;
use crate::engine::solver::optimizer::OptimizerKind;
use crate::engine::solver::{SolverParams, gneb, llg};
use crate::engine::state::State;
use tracing::{info, instrument, warn};

/// Launches an LLG dynamics task on the selected image.
///
/// The task runs on a background thread and iterates until its budget is
/// exhausted, [`stop`] is called, or the state diverges. A task already
/// running on the same image is stopped and joined first, as is a GNEB task
/// on the owning chain: that task writes every image of the chain, so the
/// two would otherwise iterate the same spin array concurrently.
#[instrument(skip(state, params, reporter))]
pub fn start_llg(
    state: &mut State,
    idx_image: i32,
    idx_chain: i32,
    kind: OptimizerKind,
    params: SolverParams,
    reporter: ProgressReporter,
) -> Result<(), CoreError> {
    let (image_idx, chain_idx) = state.resolve(idx_image, idx_chain)?;
    let chain = state.chain_mut(chain_idx)?;
    if let Err(err) = chain.solver_mut().stop() {
        warn!(%err, chain_idx, "GNEB task ended abnormally while stopping for an LLG start");
    }
    let image = chain
        .image_mut(image_idx)
        .ok_or_else(|| CoreError::Internal(format!("resolved image index {image_idx} vanished")))?;
    let system = image.system().clone();
    info!(image_idx, chain_idx, ?kind, "starting LLG task");
    image
        .solver_mut()
        .start(move |flag| llg::run(system, flag, kind, params, reporter))
}

/// Launches a GNEB relaxation task on the selected chain.
///
/// The task iterates every interior image of the chain; each image's own LLG
/// task must not run concurrently, so they are stopped first.
#[instrument(skip(state, params, reporter))]
pub fn start_gneb(
    state: &mut State,
    idx_chain: i32,
    kind: OptimizerKind,
    params: SolverParams,
    reporter: ProgressReporter,
) -> Result<(), CoreError> {
    let (_, chain_idx) = state.resolve(-1, idx_chain)?;
    let chain = state.chain_mut(chain_idx)?;
    chain.stop_all();
    let images: Vec<_> = chain.images().iter().map(|i| i.system().clone()).collect();
    let gneb_params = chain.gneb().clone();
    info!(chain_idx, noi = images.len(), ?kind, "starting GNEB task");
    chain
        .solver_mut()
        .start(move |flag| gneb::run(images, flag, kind, params, gneb_params, reporter))
}

/// Stops the LLG task of the selected image and joins it.
pub fn stop(
    state: &mut State,
    idx_image: i32,
    idx_chain: i32,
) -> Result<Option<SolverReport>, CoreError> {
    let (image_idx, chain_idx) = state.resolve(idx_image, idx_chain)?;
    state
        .chain_mut(chain_idx)?
        .image_mut(image_idx)
        .ok_or_else(|| CoreError::Internal(format!("resolved image index {image_idx} vanished")))?
        .solver_mut()
        .stop()
}

/// Stops the GNEB task of the selected chain and joins it.
pub fn stop_gneb(state: &mut State, idx_chain: i32) -> Result<Option<SolverReport>, CoreError> {
    let (_, chain_idx) = state.resolve(-1, idx_chain)?;
    state.chain_mut(chain_idx)?.solver_mut().stop()
}

/// Stops every solver task in every chain.
#[instrument(skip_all)]
pub fn stop_all(state: &mut State) {
    for chain in state.chains_mut() {
        chain.stop_all();
    }
    info!("all solver tasks stopped");
}

/// Blocks until the selected image's LLG task finishes its iteration budget.
pub fn wait(
    state: &mut State,
    idx_image: i32,
    idx_chain: i32,
) -> Result<Option<SolverReport>, CoreError> {
    let (image_idx, chain_idx) = state.resolve(idx_image, idx_chain)?;
    state
        .chain_mut(chain_idx)?
        .image_mut(image_idx)
        .ok_or_else(|| CoreError::Internal(format!("resolved image index {image_idx} vanished")))?
        .solver_mut()
        .wait()
}

/// Blocks until the selected chain's GNEB task finishes its iteration budget.
pub fn wait_gneb(state: &mut State, idx_chain: i32) -> Result<Option<SolverReport>, CoreError> {
    let (_, chain_idx) = state.resolve(-1, idx_chain)?;
    state.chain_mut(chain_idx)?.solver_mut().wait()
}

/// Whether an LLG task is currently iterating the selected image.
pub fn is_running(state: &State, idx_image: i32, idx_chain: i32) -> Result<bool, CoreError> {
    let (image_idx, chain_idx) = state.resolve(idx_image, idx_chain)?;
    Ok(state
        .chain(chain_idx)?
        .image(image_idx)
        .is_some_and(|i| i.solver().is_running()))
}

/// Whether a GNEB task is currently iterating the selected chain.
pub fn is_gneb_running(state: &State, idx_chain: i32) -> Result<bool, CoreError> {
    let (_, chain_idx) = state.resolve(-1, idx_chain)?;
    Ok(state.chain(chain_idx)?.solver().is_running())
}
