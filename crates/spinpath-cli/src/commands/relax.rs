use crate::cli::RelaxArgs;
use crate::error::Result;
use crate::ui;
use indicatif::ProgressBar;
use nalgebra::Vector3;
use spinpath::core::system::LlgParams;
use spinpath::engine::chain::{Chain, GnebParams};
use spinpath::engine::solver::SolverParams;
use spinpath::engine::state::State;
use spinpath::workflows::simulation;
use tracing::info;

/// Relaxes one image with LLG dynamics and prints the final energy.
pub fn run(args: RelaxArgs) -> Result<()> {
    let llg = LlgParams {
        damping: args.damping,
        temperature: args.temperature,
        time_step: args.time_step,
        ..Default::default()
    };
    let mut system = crate::commands::build_system(&args.lattice, llg)?;
    // A uniform tilted start breaks the symmetry so the dynamics have
    // somewhere to go.
    for s in system.spins_mut() {
        *s = Vector3::new(1.0, 0.0, 0.5).normalize();
    }
    let nos = system.nos();
    let initial_energy = system.update_energy();

    let mut state = State::new(Chain::new(vec![system], GnebParams::default())?);
    let params = SolverParams {
        max_iterations: args.max_iterations,
        ..Default::default()
    };
    let reporter = ui::bar_reporter(ProgressBar::new(args.max_iterations as u64));

    info!(nos, solver = ?args.solver, "relaxing a single image");
    simulation::start_llg(&mut state, -1, -1, args.solver.into(), params, reporter)?;
    let report = simulation::wait(&mut state, -1, -1)?;

    if let Some(report) = report {
        println!(
            "relaxed {} spins in {} iterations: E {:.6} -> {:.6}",
            nos, report.iterations, initial_energy, report.energy
        );
    }
    Ok(())
}
