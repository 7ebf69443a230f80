pub mod path;
pub mod relax;

use crate::cli::LatticeArgs;
use crate::error::{CliError, Result};
use nalgebra::Vector3;
use spinpath::core::geometry::Geometry;
use spinpath::core::hamiltonian::HamiltonianParams;
use spinpath::core::system::{LlgParams, SpinSystem};
use std::sync::Arc;

/// Builds a simple cubic lattice system from the shared lattice arguments.
pub(crate) fn build_system(lattice: &LatticeArgs, llg: LlgParams) -> Result<SpinSystem> {
    let n_cells: [i32; 3] = lattice
        .n_cells
        .as_slice()
        .try_into()
        .map_err(|_| CliError::Argument("--n-cells takes exactly three values".into()))?;
    let field: [f64; 3] = lattice
        .field
        .as_slice()
        .try_into()
        .map_err(|_| CliError::Argument("--field takes exactly three values".into()))?;

    let geometry = Geometry::build(
        [Vector3::x(), Vector3::y(), Vector3::z()],
        [Vector3::x(), Vector3::y(), Vector3::z()],
        n_cells,
        vec![Vector3::zeros()],
        1.0,
    );
    if geometry.nos() == 0 {
        return Err(CliError::Argument(format!(
            "lattice {n_cells:?} contains no spins"
        )));
    }

    let params = HamiltonianParams {
        exchange: lattice.exchange,
        anisotropy: lattice.anisotropy,
        external_field: Vector3::new(field[0], field[1], field[2]),
        boundary_conditions: [lattice.periodic; 3],
        ..Default::default()
    };
    Ok(SpinSystem::new(Arc::new(geometry), params, llg))
}
