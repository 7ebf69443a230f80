use crate::core::hamiltonian::EnergyContributions;
use crate::engine::error::CoreError;
use crate::engine::interpolation::interpolate_energy;
use crate::engine::solver::gneb::compute_tangents;
use crate::engine::state::State;
use nalgebra::Vector3;
use tracing::{info, instrument};

/// Index of the chain's active image.
pub fn get_index(state: &State, idx_chain: i32) -> Result<usize, CoreError> {
    let (image_idx, _) = state.resolve(-1, idx_chain)?;
    Ok(image_idx)
}

/// Number of images in the chain.
pub fn get_noi(state: &State, idx_chain: i32) -> Result<usize, CoreError> {
    let (_, chain_idx) = state.resolve(-1, idx_chain)?;
    Ok(state.chain(chain_idx)?.noi())
}

/// Moves the chain's active image forward by one; returns whether it moved.
pub fn next_image(state: &mut State, idx_chain: i32) -> Result<bool, CoreError> {
    let (_, chain_idx) = state.resolve(-1, idx_chain)?;
    Ok(state.chain_mut(chain_idx)?.next_image())
}

/// Moves the chain's active image back by one; returns whether it moved.
pub fn prev_image(state: &mut State, idx_chain: i32) -> Result<bool, CoreError> {
    let (_, chain_idx) = state.resolve(-1, idx_chain)?;
    Ok(state.chain_mut(chain_idx)?.prev_image())
}

/// Copies the selected image into the clipboard, overwriting its previous
/// content.
pub fn image_to_clipboard(
    state: &mut State,
    idx_image: i32,
    idx_chain: i32,
) -> Result<(), CoreError> {
    let (image_idx, chain_idx) = state.resolve(idx_image, idx_chain)?;
    let copy = state
        .chain(chain_idx)?
        .image(image_idx)
        .ok_or_else(|| CoreError::Internal(format!("resolved image index {image_idx} vanished")))?
        .read()?
        .clone();
    state.set_clipboard(copy);
    Ok(())
}

/// Inserts a copy of the clipboard directly before the selected image.
#[instrument(skip(state))]
pub fn insert_image_before(
    state: &mut State,
    idx_image: i32,
    idx_chain: i32,
) -> Result<(), CoreError> {
    let (image_idx, chain_idx) = state.resolve(idx_image, idx_chain)?;
    let system = clipboard_copy(state)?;
    state
        .chain_mut(chain_idx)?
        .insert_image_before(image_idx, system)?;
    info!(image_idx, chain_idx, "inserted clipboard image before");
    Ok(())
}

/// Inserts a copy of the clipboard directly after the selected image.
#[instrument(skip(state))]
pub fn insert_image_after(
    state: &mut State,
    idx_image: i32,
    idx_chain: i32,
) -> Result<(), CoreError> {
    let (image_idx, chain_idx) = state.resolve(idx_image, idx_chain)?;
    let system = clipboard_copy(state)?;
    state
        .chain_mut(chain_idx)?
        .insert_image_after(image_idx, system)?;
    info!(image_idx, chain_idx, "inserted clipboard image after");
    Ok(())
}

/// Replaces the selected image's configuration with the clipboard content.
#[instrument(skip(state))]
pub fn replace_image(state: &mut State, idx_image: i32, idx_chain: i32) -> Result<(), CoreError> {
    let (image_idx, chain_idx) = state.resolve(idx_image, idx_chain)?;
    let system = clipboard_copy(state)?;
    state.chain_mut(chain_idx)?.replace_image(image_idx, system)
}

/// Deletes the selected image. Fails when it is the chain's sole image.
#[instrument(skip(state))]
pub fn delete_image(state: &mut State, idx_image: i32, idx_chain: i32) -> Result<(), CoreError> {
    let (image_idx, chain_idx) = state.resolve(idx_image, idx_chain)?;
    state.chain_mut(chain_idx)?.delete_image(image_idx)?;
    info!(image_idx, chain_idx, "deleted image");
    Ok(())
}

/// Reaction coordinate of each image: cumulative geodesic distance along the
/// chain, refreshed before returning.
pub fn get_rx(state: &mut State, idx_chain: i32) -> Result<Vec<f64>, CoreError> {
    let (_, chain_idx) = state.resolve(-1, idx_chain)?;
    let chain = state.chain_mut(chain_idx)?;
    chain.update_rx()?;
    Ok(chain.rx().to_vec())
}

/// Interpolated reaction coordinates of the densified energy profile.
pub fn get_rx_interpolated(state: &mut State, idx_chain: i32) -> Result<Vec<f64>, CoreError> {
    Ok(energy_profile(state, idx_chain)?.0)
}

/// Densified energy profile along the chain: cubic interpolation through the
/// per-image energies with path-derivative slopes, suitable for plotting the
/// barrier shape.
pub fn get_energy_interpolated(state: &mut State, idx_chain: i32) -> Result<Vec<f64>, CoreError> {
    Ok(energy_profile(state, idx_chain)?.1)
}

/// Per-interaction energy decomposition of every image along the chain,
/// computed fresh from the current spin configurations. The terms of each
/// entry sum to that image's total energy.
pub fn get_energy_contributions(
    state: &State,
    idx_chain: i32,
) -> Result<Vec<EnergyContributions>, CoreError> {
    let (_, chain_idx) = state.resolve(-1, idx_chain)?;
    state
        .chain(chain_idx)?
        .images()
        .iter()
        .map(|image| {
            let guard = image.read()?;
            Ok(guard.hamiltonian().energy_contributions(guard.spins()))
        })
        .collect()
}

/// Recomputes the chain's derived data: reaction coordinates and per-image
/// energies.
pub fn update_data(state: &mut State, idx_chain: i32) -> Result<(), CoreError> {
    let (_, chain_idx) = state.resolve(-1, idx_chain)?;
    let chain = state.chain_mut(chain_idx)?;
    chain.update_energies()?;
    chain.update_rx()
}

/// Rebuilds derived data from scratch after the images were mutated from
/// outside the chain's own operations.
pub fn setup_data(state: &mut State, idx_chain: i32) -> Result<(), CoreError> {
    update_data(state, idx_chain)
}

fn clipboard_copy(state: &State) -> Result<crate::core::system::SpinSystem, CoreError> {
    state
        .clipboard()
        .cloned()
        .ok_or_else(|| CoreError::StructuralConflict("clipboard holds no image".into()))
}

fn energy_profile(
    state: &mut State,
    idx_chain: i32,
) -> Result<(Vec<f64>, Vec<f64>), CoreError> {
    let (_, chain_idx) = state.resolve(-1, idx_chain)?;
    let chain = state.chain_mut(chain_idx)?;
    let energies = chain.update_energies()?;
    chain.update_rx()?;
    let rx = chain.rx().to_vec();

    let mut spins: Vec<Vec<Vector3<f64>>> = Vec::with_capacity(chain.noi());
    for image in chain.images() {
        spins.push(image.read()?.spins().to_vec());
    }
    let tangents = compute_tangents(&spins, &energies);

    // The effective field is the negative energy gradient, so the energy
    // slope along the path is minus the field projected on the tangent.
    let mut slopes = Vec::with_capacity(chain.noi());
    let mut field = Vec::new();
    for (i, image) in chain.images().iter().enumerate() {
        image.read()?.hamiltonian().effective_field_into(&spins[i], &mut field);
        let slope: f64 = field
            .iter()
            .zip(&tangents[i])
            .map(|(h, t)| -h.dot(t))
            .sum();
        slopes.push(slope);
    }

    interpolate_energy(&rx, &energies, &slopes, chain.gneb().n_energy_interpolations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Geometry;
    use crate::core::hamiltonian::HamiltonianParams;
    use crate::core::system::{LlgParams, SpinSystem};
    use crate::engine::chain::{Chain, GnebParams};
    use std::sync::Arc;

    fn test_image(direction: Vector3<f64>) -> SpinSystem {
        let geometry = Geometry::build(
            [Vector3::x(), Vector3::y(), Vector3::z()],
            [Vector3::x(), Vector3::y(), Vector3::z()],
            [2, 1, 1],
            vec![Vector3::zeros()],
            1.0,
        );
        let mut system = SpinSystem::new(
            Arc::new(geometry),
            HamiltonianParams::default(),
            LlgParams::default(),
        );
        for s in system.spins_mut() {
            *s = direction.normalize();
        }
        system.update_energy();
        system
    }

    fn test_state(noi: usize) -> State {
        let images = (0..noi).map(|_| test_image(Vector3::z())).collect();
        State::new(Chain::new(images, GnebParams::default()).unwrap())
    }

    #[test]
    fn insert_from_clipboard_grows_the_chain() {
        let mut state = test_state(2);
        image_to_clipboard(&mut state, 0, -1).unwrap();
        insert_image_after(&mut state, 0, -1).unwrap();
        assert_eq!(get_noi(&state, -1).unwrap(), 3);
    }

    #[test]
    fn insert_with_empty_clipboard_is_rejected() {
        let mut state = test_state(2);
        let result = insert_image_before(&mut state, 0, -1);
        assert!(matches!(result, Err(CoreError::StructuralConflict(_))));
        assert_eq!(get_noi(&state, -1).unwrap(), 2);
    }

    #[test]
    fn replace_copies_the_clipboard_configuration() {
        let mut state = test_state(2);
        state.set_clipboard(test_image(Vector3::x()));
        replace_image(&mut state, 1, -1).unwrap();
        let (image_idx, chain_idx) = state.resolve(1, -1).unwrap();
        let spin = state.chain(chain_idx).unwrap().image(image_idx).unwrap().read().unwrap().spins()[0];
        assert!((spin - Vector3::x()).norm() < 1e-12);
    }

    #[test]
    fn delete_through_the_selector_respects_the_active_image() {
        let mut state = test_state(3);
        next_image(&mut state, -1).unwrap();
        delete_image(&mut state, -1, -1).unwrap();
        assert_eq!(get_noi(&state, -1).unwrap(), 2);
        assert_eq!(get_index(&state, -1).unwrap(), 0);
    }

    #[test]
    fn out_of_range_selector_does_not_mutate() {
        let mut state = test_state(2);
        state.set_clipboard(test_image(Vector3::z()));
        let result = insert_image_before(&mut state, 5, -1);
        assert!(matches!(result, Err(CoreError::IndexOutOfRange { .. })));
        assert_eq!(get_noi(&state, -1).unwrap(), 2);
    }

    #[test]
    fn rx_is_cumulative_and_starts_at_zero() {
        let mut state = test_state(2);
        state.set_clipboard(test_image(Vector3::x()));
        replace_image(&mut state, 1, -1).unwrap();
        let rx = get_rx(&mut state, -1).unwrap();
        assert_eq!(rx.len(), 2);
        assert!(rx[0].abs() < 1e-12);
        assert!(rx[1] > 0.0);
    }

    #[test]
    fn energy_contributions_cover_every_image_and_sum_to_the_totals() {
        let mut state = test_state(2);
        state.set_clipboard(test_image(Vector3::x()));
        replace_image(&mut state, 1, -1).unwrap();
        update_data(&mut state, -1).unwrap();

        let contributions = get_energy_contributions(&state, -1).unwrap();
        assert_eq!(contributions.len(), 2);

        let (_, chain_idx) = state.resolve(-1, -1).unwrap();
        let energies = state.chain(chain_idx).unwrap().energies().unwrap();
        for (terms, total) in contributions.iter().zip(&energies) {
            assert!((terms.total() - total).abs() < 1e-9);
        }
    }

    #[test]
    fn interpolated_profile_reproduces_the_node_energies() {
        let mut state = test_state(3);
        state.set_clipboard(test_image(Vector3::x()));
        replace_image(&mut state, 1, -1).unwrap();
        state.set_clipboard(test_image(-Vector3::z()));
        replace_image(&mut state, 2, -1).unwrap();

        let rx = get_rx(&mut state, -1).unwrap();
        let xs = get_rx_interpolated(&mut state, -1).unwrap();
        let ys = get_energy_interpolated(&mut state, -1).unwrap();
        let resolution = GnebParams::default().n_energy_interpolations;
        assert_eq!(xs.len(), 2 * resolution + 1);
        assert_eq!(ys.len(), xs.len());

        let energies = {
            let (_, chain_idx) = state.resolve(-1, -1).unwrap();
            state.chain(chain_idx).unwrap().energies().unwrap()
        };
        for (node_rx, node_e) in rx.iter().zip(&energies) {
            let i = xs.iter().position(|x| (x - node_rx).abs() < 1e-9).unwrap();
            assert!((ys[i] - node_e).abs() < 1e-9);
        }
    }
}
