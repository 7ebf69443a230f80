use super::geometry::Geometry;
use super::hamiltonian::{Hamiltonian, HamiltonianParams};
use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Canonical "up" direction assigned to newly created spins.
#[inline]
pub fn spin_up() -> Vector3<f64> {
    Vector3::z()
}

/// Parameters of the Landau-Lifshitz-Gilbert equation, in reduced units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlgParams {
    /// Gyromagnetic ratio.
    pub gamma: f64,
    /// Gilbert damping constant.
    pub damping: f64,
    /// Temperature driving the stochastic thermal field; zero disables it.
    pub temperature: f64,
    /// Integration time step.
    pub time_step: f64,
}

impl Default for LlgParams {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            damping: 0.3,
            temperature: 0.0,
            time_step: 1e-2,
        }
    }
}

/// One simulated spin configuration ("image"): a mutable array of unit spin
/// directions together with the geometry and parameters it lives on.
///
/// The spin array and the geometry are replaced together on
/// [`SpinSystem::resize`], so `spins().len() == geometry().nos()` holds at
/// all times.
#[derive(Debug, Clone)]
pub struct SpinSystem {
    spins: Vec<Vector3<f64>>,
    geometry: Arc<Geometry>,
    hamiltonian: Hamiltonian,
    llg: LlgParams,
    energy: f64,
}

/// Shared handle to an image. At most one solver task writes through it at a
/// time; visualization and IO consumers take brief read locks and tolerate
/// consistent-but-stale snapshots.
pub type SharedSystem = Arc<RwLock<SpinSystem>>;

impl SpinSystem {
    /// Creates a system with every spin pointing up.
    pub fn new(geometry: Arc<Geometry>, params: HamiltonianParams, llg: LlgParams) -> Self {
        let spins = vec![spin_up(); geometry.nos()];
        let hamiltonian = Hamiltonian::new(params, &geometry);
        let energy = hamiltonian.energy(&spins);
        Self {
            spins,
            geometry,
            hamiltonian,
            llg,
            energy,
        }
    }

    pub fn into_shared(self) -> SharedSystem {
        Arc::new(RwLock::new(self))
    }

    /// Number of spins.
    pub fn nos(&self) -> usize {
        self.spins.len()
    }

    pub fn spins(&self) -> &[Vector3<f64>] {
        &self.spins
    }

    pub fn spins_mut(&mut self) -> &mut [Vector3<f64>] {
        &mut self.spins
    }

    pub fn geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }

    pub fn hamiltonian(&self) -> &Hamiltonian {
        &self.hamiltonian
    }

    pub fn llg(&self) -> &LlgParams {
        &self.llg
    }

    pub fn llg_mut(&mut self) -> &mut LlgParams {
        &mut self.llg
    }

    /// Energy of the configuration as of the last [`SpinSystem::update_energy`].
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Recomputes and caches the configuration energy.
    pub fn update_energy(&mut self) -> f64 {
        self.energy = self.hamiltonian.energy(&self.spins);
        self.energy
    }

    /// Renormalizes every spin to unit length; zero vectors become [`spin_up`].
    pub fn normalize_spins(&mut self) {
        self.spins.par_iter_mut().for_each(|s| *s = normalize(*s));
    }

    /// Replaces the geometry for a new tiling extent and resizes the spin
    /// array in the same step. Spins whose index existed before keep their
    /// direction; new spins default to [`spin_up`]. The Hamiltonian neighbor
    /// list is rebuilt for the new extent.
    pub fn resize(&mut self, n_cells: [i32; 3]) {
        let geometry = Arc::new(self.geometry.resized(n_cells));
        self.spins.resize(geometry.nos(), spin_up());
        self.hamiltonian = Hamiltonian::new(self.hamiltonian.params().clone(), &geometry);
        self.geometry = geometry;
        self.update_energy();
    }
}

#[inline]
fn normalize(v: Vector3<f64>) -> Vector3<f64> {
    let n2 = v.norm_squared();
    if n2 == 0.0 {
        return spin_up();
    }
    v / n2.sqrt()
}

/// Geodesic distance between two spin configurations of equal length:
/// the Euclidean norm of the per-spin great-circle angles.
pub fn distance_geodesic(a: &[Vector3<f64>], b: &[Vector3<f64>]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(u, v)| {
            let angle = u.dot(v).clamp(-1.0, 1.0).acos();
            angle * angle
        })
        .sum::<f64>()
        .sqrt()
}
