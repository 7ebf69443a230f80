use crate::engine::error::CoreError;
use crate::engine::state::State;
use nalgebra::Vector3;
use std::sync::Arc;
use tracing::{info, instrument};

/// Number of spins in the selected image.
pub fn get_nos(state: &State, idx_image: i32, idx_chain: i32) -> Result<usize, CoreError> {
    with_system(state, idx_image, idx_chain, |s| s.nos())
}

/// Axis-aligned bounding box of the selected image's lattice.
pub fn get_bounds(
    state: &State,
    idx_image: i32,
    idx_chain: i32,
) -> Result<(Vector3<f64>, Vector3<f64>), CoreError> {
    with_system(state, idx_image, idx_chain, |s| s.geometry().bounds())
}

/// Geometric center of the lattice.
pub fn get_center(
    state: &State,
    idx_image: i32,
    idx_chain: i32,
) -> Result<Vector3<f64>, CoreError> {
    with_system(state, idx_image, idx_chain, |s| s.geometry().center())
}

/// Bounding box of a single unit cell.
pub fn get_cell_bounds(
    state: &State,
    idx_image: i32,
    idx_chain: i32,
) -> Result<(Vector3<f64>, Vector3<f64>), CoreError> {
    with_system(state, idx_image, idx_chain, |s| s.geometry().cell_bounds())
}

/// Number of lattice directions with more than one cell.
pub fn get_dimensionality(
    state: &State,
    idx_image: i32,
    idx_chain: i32,
) -> Result<usize, CoreError> {
    with_system(state, idx_image, idx_chain, |s| s.geometry().dimensionality())
}

/// Cell counts along the three lattice directions.
pub fn get_n_cells(
    state: &State,
    idx_image: i32,
    idx_chain: i32,
) -> Result<[usize; 3], CoreError> {
    with_system(state, idx_image, idx_chain, |s| s.geometry().n_cells())
}

/// Snapshot of every spin position.
pub fn get_spin_positions(
    state: &State,
    idx_image: i32,
    idx_chain: i32,
) -> Result<Vec<Vector3<f64>>, CoreError> {
    with_system(state, idx_image, idx_chain, |s| s.geometry().spin_pos().to_vec())
}

/// Snapshot of every spin direction.
pub fn get_spin_directions(
    state: &State,
    idx_image: i32,
    idx_chain: i32,
) -> Result<Vec<Vector3<f64>>, CoreError> {
    with_system(state, idx_image, idx_chain, |s| s.spins().to_vec())
}

/// Basis-atom type of every lattice site.
pub fn get_atom_types(
    state: &State,
    idx_image: i32,
    idx_chain: i32,
) -> Result<Vec<i32>, CoreError> {
    with_system(state, idx_image, idx_chain, |s| s.geometry().atom_types().to_vec())
}

/// Surface triangulation of a two-dimensional lattice, decimated by
/// `n_cell_step`. Empty for other dimensionalities.
pub fn get_triangulation(
    state: &State,
    idx_image: i32,
    idx_chain: i32,
    n_cell_step: usize,
) -> Result<Arc<Vec<[usize; 3]>>, CoreError> {
    with_system(state, idx_image, idx_chain, |s| {
        s.geometry().triangulation(n_cell_step)
    })
}

/// Tetrahedralization of a three-dimensional lattice, decimated by
/// `n_cell_step`. Empty for other dimensionalities.
pub fn get_tetrahedra(
    state: &State,
    idx_image: i32,
    idx_chain: i32,
    n_cell_step: usize,
) -> Result<Arc<Vec<[usize; 4]>>, CoreError> {
    with_system(state, idx_image, idx_chain, |s| {
        s.geometry().tetrahedra(n_cell_step)
    })
}

/// Resizes the lattice of every image in every chain, and of the clipboard.
///
/// All solver tasks are stopped first. Spins at sites that survive the resize
/// keep their direction; newly created sites start in the default direction.
/// Zero or negative counts empty the lattice.
#[instrument(skip(state))]
pub fn set_n_cells(state: &mut State, n_cells: [i32; 3]) -> Result<(), CoreError> {
    info!(?n_cells, "resizing every lattice");
    for chain in state.chains_mut() {
        chain.stop_all();
        for image in chain.images() {
            image.write()?.resize(n_cells);
        }
        chain.update_energies()?;
        chain.update_rx()?;
    }
    if let Some(clipboard) = state.clipboard_mut() {
        clipboard.resize(n_cells);
    }
    Ok(())
}

fn with_system<T>(
    state: &State,
    idx_image: i32,
    idx_chain: i32,
    f: impl FnOnce(&crate::core::system::SpinSystem) -> T,
) -> Result<T, CoreError> {
    let (image_idx, chain_idx) = state.resolve(idx_image, idx_chain)?;
    let guard = state
        .chain(chain_idx)?
        .image(image_idx)
        .ok_or_else(|| CoreError::Internal(format!("resolved image index {image_idx} vanished")))?
        .read()?;
    Ok(f(&guard))
}
