use crate::cli::PathArgs;
use crate::error::{CliError, Result};
use crate::ui;
use indicatif::ProgressBar;
use nalgebra::{Rotation3, Vector3};
use spinpath::core::system::LlgParams;
use spinpath::engine::chain::{Chain, GnebParams};
use spinpath::engine::solver::SolverParams;
use spinpath::engine::state::State;
use spinpath::workflows::{chain as chain_ops, simulation};
use std::fmt::Write as _;
use tracing::info;

/// Relaxes a chain of images between the uniform up and down states toward
/// the minimum-energy path and reports the barrier.
pub fn run(args: PathArgs) -> Result<()> {
    if args.images < 3 {
        return Err(CliError::Argument(
            "--images must be at least 3 so the path has an interior".into(),
        ));
    }

    let llg = LlgParams {
        time_step: args.time_step,
        ..Default::default()
    };

    // Initial path: every spin rotates in lockstep from +z to -z about the
    // x axis, image by image.
    let mut images = Vec::with_capacity(args.images);
    for i in 0..args.images {
        let angle = std::f64::consts::PI * i as f64 / (args.images - 1) as f64;
        let direction = Rotation3::from_axis_angle(&Vector3::x_axis(), angle) * Vector3::z();
        let mut system = crate::commands::build_system(&args.lattice, llg.clone())?;
        for s in system.spins_mut() {
            *s = direction;
        }
        system.update_energy();
        images.push(system);
    }
    let nos = images[0].nos();

    let gneb = GnebParams {
        spring_constant: args.spring_constant,
        climbing_image: args.climbing,
        time_step: args.time_step,
        ..Default::default()
    };
    let mut state = State::new(Chain::new(images, gneb)?);
    let params = SolverParams {
        max_iterations: args.max_iterations,
        ..Default::default()
    };
    let reporter = ui::bar_reporter(ProgressBar::new(args.max_iterations as u64));

    info!(noi = args.images, nos, solver = ?args.solver, "relaxing the path");
    simulation::start_gneb(&mut state, -1, args.solver.into(), params, reporter)?;
    simulation::wait_gneb(&mut state, -1)?;

    chain_ops::update_data(&mut state, -1)?;
    let rx = chain_ops::get_rx(&mut state, -1)?;
    let energies = {
        let (_, chain_idx) = state.resolve(-1, -1)?;
        state.chain(chain_idx)?.energies()?
    };

    let endpoint = energies[0];
    let barrier = energies
        .iter()
        .fold(f64::NEG_INFINITY, |acc, &e| acc.max(e))
        - endpoint;
    println!("images: {}", energies.len());
    println!("barrier relative to the first image: {barrier:.6}");
    for (x, e) in rx.iter().zip(&energies) {
        println!("  rx {x:>10.4}  E {e:>12.6}");
    }

    if let Some(path) = &args.profile {
        let xs = chain_ops::get_rx_interpolated(&mut state, -1)?;
        let ys = chain_ops::get_energy_interpolated(&mut state, -1)?;
        let mut out = String::with_capacity(xs.len() * 24);
        for (x, y) in xs.iter().zip(&ys) {
            let _ = writeln!(out, "{x}\t{y}");
        }
        std::fs::write(path, out)?;
        println!("interpolated profile written to {}", path.display());
    }
    Ok(())
}
