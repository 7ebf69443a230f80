use super::controller::SolverController;
use super::error::CoreError;
use crate::core::system::{SharedSystem, SpinSystem, distance_geodesic};
use serde::{Deserialize, Serialize};
use std::sync::{RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

/// Parameters of the geodesic nudged elastic band relaxation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GnebParams {
    /// Spring constant coupling neighboring images along the path.
    pub spring_constant: f64,
    /// Promote the highest-energy interior image to a climbing-image step.
    pub climbing_image: bool,
    /// Descent step size for the projected force.
    pub time_step: f64,
    /// Samples per path segment for the interpolated energy profile.
    pub n_energy_interpolations: usize,
}

impl Default for GnebParams {
    fn default() -> Self {
        Self {
            spring_constant: 1.0,
            climbing_image: false,
            time_step: 1e-2,
            n_energy_interpolations: 20,
        }
    }
}

/// One image of a chain: the shared spin system plus the controller of its
/// single-image (LLG) solver task.
#[derive(Debug)]
pub struct Image {
    system: SharedSystem,
    solver: SolverController,
}

impl Image {
    pub fn new(system: SpinSystem) -> Self {
        Self {
            system: system.into_shared(),
            solver: SolverController::new(),
        }
    }

    pub fn system(&self) -> &SharedSystem {
        &self.system
    }

    pub fn solver(&self) -> &SolverController {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut SolverController {
        &mut self.solver
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, SpinSystem>, CoreError> {
        read_system(&self.system)
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, SpinSystem>, CoreError> {
        write_system(&self.system)
    }
}

pub(crate) fn read_system(system: &SharedSystem) -> Result<RwLockReadGuard<'_, SpinSystem>, CoreError> {
    system
        .read()
        .map_err(|_| CoreError::Internal("spin system lock poisoned".into()))
}

pub(crate) fn write_system(system: &SharedSystem) -> Result<RwLockWriteGuard<'_, SpinSystem>, CoreError> {
    system
        .write()
        .map_err(|_| CoreError::Internal("spin system lock poisoned".into()))
}

/// An ordered, mutable sequence of images sharing one lattice size, plus the
/// chain-level path data and the controller of the GNEB solver task.
///
/// Structural mutations follow the stop-before-mutate protocol: they stop and
/// join every solver task that could be iterating the affected images before
/// touching the sequence, so a task never outlives or overlaps its target.
/// After every mutation `noi() >= 1` and `active_image() < noi()` hold.
#[derive(Debug)]
pub struct Chain {
    images: Vec<Image>,
    active_image: usize,
    gneb: GnebParams,
    solver: SolverController,
    rx: Vec<f64>,
}

impl Chain {
    pub fn new(images: Vec<SpinSystem>, gneb: GnebParams) -> Result<Self, CoreError> {
        if images.is_empty() {
            return Err(CoreError::StructuralConflict(
                "a chain needs at least one image".into(),
            ));
        }
        let nos = images[0].nos();
        for image in &images[1..] {
            if image.nos() != nos {
                return Err(CoreError::SizeMismatch {
                    expected: nos,
                    found: image.nos(),
                });
            }
        }
        let mut chain = Self {
            images: images.into_iter().map(Image::new).collect(),
            active_image: 0,
            gneb,
            solver: SolverController::new(),
            rx: Vec::new(),
        };
        chain.update_rx()?;
        Ok(chain)
    }

    /// Number of images.
    pub fn noi(&self) -> usize {
        self.images.len()
    }

    /// Number of spins shared by every image.
    pub fn nos(&self) -> Result<usize, CoreError> {
        Ok(self.images[0].read()?.nos())
    }

    pub fn active_image(&self) -> usize {
        self.active_image
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn image(&self, idx: usize) -> Option<&Image> {
        self.images.get(idx)
    }

    pub fn image_mut(&mut self, idx: usize) -> Option<&mut Image> {
        self.images.get_mut(idx)
    }

    pub fn gneb(&self) -> &GnebParams {
        &self.gneb
    }

    pub fn gneb_mut(&mut self) -> &mut GnebParams {
        &mut self.gneb
    }

    /// Controller of the chain-level GNEB task.
    pub fn solver(&self) -> &SolverController {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut SolverController {
        &mut self.solver
    }

    /// Moves the active image forward by one, clamped at the chain end.
    /// Returns whether the move occurred.
    pub fn next_image(&mut self) -> bool {
        if self.active_image + 1 < self.images.len() {
            self.active_image += 1;
            true
        } else {
            false
        }
    }

    /// Moves the active image back by one, clamped at the chain start.
    /// Returns whether the move occurred.
    pub fn prev_image(&mut self) -> bool {
        if self.active_image > 0 {
            self.active_image -= 1;
            true
        } else {
            false
        }
    }

    /// Inserts a copy of `system` directly before image `idx`.
    pub fn insert_image_before(&mut self, idx: usize, system: SpinSystem) -> Result<(), CoreError> {
        self.insert_at(idx, system)
    }

    /// Inserts a copy of `system` directly after image `idx`.
    pub fn insert_image_after(&mut self, idx: usize, system: SpinSystem) -> Result<(), CoreError> {
        self.insert_at(idx + 1, system)
    }

    fn insert_at(&mut self, pos: usize, system: SpinSystem) -> Result<(), CoreError> {
        self.check_nos(&system)?;
        // The chain-level task iterates over the image sequence itself.
        stop_logged(&mut self.solver, "chain");
        self.images.insert(pos, Image::new(system));
        if self.active_image >= pos {
            self.active_image += 1;
        }
        self.update_rx()
    }

    /// Replaces the spin configuration of image `idx`.
    pub fn replace_image(&mut self, idx: usize, system: SpinSystem) -> Result<(), CoreError> {
        self.check_nos(&system)?;
        stop_logged(&mut self.solver, "chain");
        let image = self
            .images
            .get_mut(idx)
            .ok_or_else(|| internal_index(idx))?;
        stop_logged(&mut image.solver, "image");
        *image.write()? = system;
        self.update_rx()
    }

    /// Deletes image `idx`. Rejected when it is the sole remaining image.
    pub fn delete_image(&mut self, idx: usize) -> Result<(), CoreError> {
        if self.images.len() == 1 {
            return Err(CoreError::StructuralConflict(
                "cannot delete the last image of a chain".into(),
            ));
        }
        stop_logged(&mut self.solver, "chain");
        {
            let image = self
                .images
                .get_mut(idx)
                .ok_or_else(|| internal_index(idx))?;
            stop_logged(&mut image.solver, "image");
        }
        self.images.remove(idx);
        // Deleting the active image promotes the previous one, or the next
        // if none precedes.
        if idx < self.active_image || (idx == self.active_image && self.active_image > 0) {
            self.active_image -= 1;
        }
        debug_assert!(self.active_image < self.images.len());
        self.update_rx()
    }

    /// Stops and joins every solver task attached to this chain.
    pub fn stop_all(&mut self) {
        stop_logged(&mut self.solver, "chain");
        for image in &mut self.images {
            stop_logged(&mut image.solver, "image");
        }
    }

    /// Recomputes the reaction coordinate: cumulative geodesic distance
    /// between consecutive spin configurations.
    pub fn update_rx(&mut self) -> Result<(), CoreError> {
        let mut rx = Vec::with_capacity(self.images.len());
        rx.push(0.0);
        for pair in self.images.windows(2) {
            let a = pair[0].read()?;
            let b = pair[1].read()?;
            let last = *rx.last().unwrap_or(&0.0);
            rx.push(last + distance_geodesic(a.spins(), b.spins()));
        }
        self.rx = rx;
        Ok(())
    }

    /// Reaction coordinate of each image, as of the last [`Chain::update_rx`].
    pub fn rx(&self) -> &[f64] {
        &self.rx
    }

    /// Cached energy of each image.
    pub fn energies(&self) -> Result<Vec<f64>, CoreError> {
        self.images.iter().map(|i| Ok(i.read()?.energy())).collect()
    }

    /// Recomputes and caches the energy of every image.
    pub fn update_energies(&mut self) -> Result<Vec<f64>, CoreError> {
        self.images
            .iter()
            .map(|i| Ok(i.write()?.update_energy()))
            .collect()
    }

    fn check_nos(&self, system: &SpinSystem) -> Result<(), CoreError> {
        let expected = self.nos()?;
        if system.nos() != expected {
            return Err(CoreError::SizeMismatch {
                expected,
                found: system.nos(),
            });
        }
        Ok(())
    }
}

fn internal_index(idx: usize) -> CoreError {
    CoreError::Internal(format!("resolved image index {idx} vanished mid-operation"))
}

/// Structural edits discard the run they interrupt, so a failure reported by
/// the dying task is logged rather than propagated.
fn stop_logged(controller: &mut SolverController, what: &'static str) {
    if let Err(err) = controller.stop() {
        warn!(%err, what, "solver task ended abnormally while stopping for a structural edit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Geometry;
    use crate::core::hamiltonian::HamiltonianParams;
    use crate::core::system::LlgParams;
    use nalgebra::Vector3;
    use std::sync::Arc;

    fn test_image(n_cells: [i32; 3]) -> SpinSystem {
        let geometry = Geometry::build(
            [Vector3::x(), Vector3::y(), Vector3::z()],
            [Vector3::x(), Vector3::y(), Vector3::z()],
            n_cells,
            vec![Vector3::zeros()],
            1.0,
        );
        SpinSystem::new(
            Arc::new(geometry),
            HamiltonianParams::default(),
            LlgParams::default(),
        )
    }

    fn test_chain(noi: usize) -> Chain {
        let images = (0..noi).map(|_| test_image([2, 2, 1])).collect();
        Chain::new(images, GnebParams::default()).unwrap()
    }

    #[test]
    fn chain_requires_at_least_one_image() {
        let result = Chain::new(vec![], GnebParams::default());
        assert!(matches!(result, Err(CoreError::StructuralConflict(_))));
    }

    #[test]
    fn chain_rejects_mixed_image_sizes() {
        let result = Chain::new(
            vec![test_image([2, 2, 1]), test_image([3, 2, 1])],
            GnebParams::default(),
        );
        assert!(matches!(
            result,
            Err(CoreError::SizeMismatch {
                expected: 4,
                found: 6
            })
        ));
    }

    #[test]
    fn next_and_prev_clamp_at_the_boundaries() {
        let mut chain = test_chain(3);
        assert!(!chain.prev_image());
        assert!(chain.next_image());
        assert!(chain.next_image());
        assert!(!chain.next_image());
        assert_eq!(chain.active_image(), 2);
        assert!(chain.prev_image());
        assert_eq!(chain.active_image(), 1);
    }

    #[test]
    fn insert_before_active_shifts_the_active_index() {
        let mut chain = test_chain(2);
        chain.next_image();
        chain.insert_image_before(0, test_image([2, 2, 1])).unwrap();
        assert_eq!(chain.noi(), 3);
        assert_eq!(chain.active_image(), 2);
    }

    #[test]
    fn insert_after_active_keeps_the_active_index() {
        let mut chain = test_chain(2);
        chain.insert_image_after(0, test_image([2, 2, 1])).unwrap();
        assert_eq!(chain.noi(), 3);
        assert_eq!(chain.active_image(), 0);
    }

    #[test]
    fn insert_rejects_wrong_spin_count() {
        let mut chain = test_chain(2);
        let result = chain.insert_image_before(0, test_image([3, 3, 1]));
        assert!(matches!(result, Err(CoreError::SizeMismatch { .. })));
        assert_eq!(chain.noi(), 2);
    }

    #[test]
    fn replace_rejects_wrong_spin_count() {
        let mut chain = test_chain(2);
        let result = chain.replace_image(1, test_image([4, 2, 1]));
        assert!(matches!(result, Err(CoreError::SizeMismatch { .. })));
    }

    #[test]
    fn replace_swaps_the_configuration_in_place() {
        let mut chain = test_chain(2);
        let mut replacement = test_image([2, 2, 1]);
        for s in replacement.spins_mut() {
            *s = Vector3::x();
        }
        chain.replace_image(1, replacement).unwrap();
        let spins_x = chain.image(1).unwrap().read().unwrap().spins()[0];
        assert!((spins_x - Vector3::x()).norm() < 1e-12);
    }

    #[test]
    fn delete_sole_image_is_rejected() {
        let mut chain = test_chain(1);
        let result = chain.delete_image(0);
        assert!(matches!(result, Err(CoreError::StructuralConflict(_))));
        assert_eq!(chain.noi(), 1);
    }

    #[test]
    fn deleting_the_active_image_promotes_the_previous_one() {
        let mut chain = test_chain(3);
        chain.next_image();
        assert_eq!(chain.active_image(), 1);

        chain.delete_image(1).unwrap();

        assert_eq!(chain.noi(), 2);
        assert_eq!(chain.active_image(), 0);
    }

    #[test]
    fn deleting_the_first_image_while_active_keeps_index_zero() {
        let mut chain = test_chain(3);
        chain.delete_image(0).unwrap();
        assert_eq!(chain.noi(), 2);
        assert_eq!(chain.active_image(), 0);
    }

    #[test]
    fn deleting_before_the_active_image_shifts_it_down() {
        let mut chain = test_chain(3);
        chain.next_image();
        chain.next_image();
        assert_eq!(chain.active_image(), 2);

        chain.delete_image(0).unwrap();

        assert_eq!(chain.active_image(), 1);
    }

    #[test]
    fn active_image_stays_in_range_under_mutation_sequences() {
        let mut chain = test_chain(4);
        chain.next_image();
        chain.next_image();
        chain.delete_image(3).unwrap();
        chain.delete_image(2).unwrap();
        chain.insert_image_after(0, test_image([2, 2, 1])).unwrap();
        chain.delete_image(1).unwrap();
        assert!(chain.noi() >= 1);
        assert!(chain.active_image() < chain.noi());
    }

    #[test]
    fn rx_starts_at_zero_and_is_non_decreasing() {
        let mut chain = test_chain(3);
        let mut rotated = test_image([2, 2, 1]);
        for s in rotated.spins_mut() {
            *s = Vector3::x();
        }
        chain.replace_image(1, rotated).unwrap();
        let rx = chain.rx();
        assert_eq!(rx.len(), 3);
        assert!(rx[0].abs() < 1e-12);
        assert!(rx.windows(2).all(|w| w[1] >= w[0]));
        assert!(rx[1] > 0.0);
    }
}
