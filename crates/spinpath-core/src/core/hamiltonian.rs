use super::geometry::Geometry;
use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Interaction parameters of the Heisenberg Hamiltonian, in reduced units.
///
/// `H = -J * sum_<ij> s_i . s_j - K * sum_i (s_i . e)^2 - sum_i B . s_i`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HamiltonianParams {
    /// Nearest-neighbor exchange coupling `J`. Positive favors alignment.
    pub exchange: f64,
    /// Uniaxial anisotropy strength `K`.
    pub anisotropy: f64,
    /// Uniaxial anisotropy axis `e` (unit vector).
    pub anisotropy_axis: Vector3<f64>,
    /// Uniform external field `B`.
    pub external_field: Vector3<f64>,
    /// Periodic boundary conditions along each translation direction.
    pub boundary_conditions: [bool; 3],
}

impl Default for HamiltonianParams {
    fn default() -> Self {
        Self {
            exchange: 1.0,
            anisotropy: 0.0,
            anisotropy_axis: Vector3::z(),
            external_field: Vector3::zeros(),
            boundary_conditions: [false; 3],
        }
    }
}

/// Energy of one spin configuration split by interaction term.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EnergyContributions {
    pub exchange: f64,
    pub anisotropy: f64,
    pub zeeman: f64,
}

impl EnergyContributions {
    pub fn total(&self) -> f64 {
        self.exchange + self.anisotropy + self.zeeman
    }
}

/// The Hamiltonian bound to one lattice: parameters plus the precomputed
/// nearest-neighbor list.
///
/// The neighbor list depends on the tiling extent, so the owner must rebuild
/// the Hamiltonian whenever the geometry is replaced (resize).
#[derive(Debug, Clone)]
pub struct Hamiltonian {
    params: HamiltonianParams,
    neighbors: Vec<Vec<usize>>,
}

impl Hamiltonian {
    pub fn new(params: HamiltonianParams, geometry: &Geometry) -> Self {
        let neighbors = build_neighbor_list(geometry, params.boundary_conditions);
        Self { params, neighbors }
    }

    pub fn params(&self) -> &HamiltonianParams {
        &self.params
    }

    /// Neighbor spin indices of spin `i`.
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.neighbors[i]
    }

    /// Effective field `-dE/ds_i` for every spin, written into `out`.
    pub fn effective_field_into(&self, spins: &[Vector3<f64>], out: &mut Vec<Vector3<f64>>) {
        debug_assert_eq!(spins.len(), self.neighbors.len());
        out.resize(spins.len(), Vector3::zeros());
        let p = &self.params;
        out.par_iter_mut().enumerate().for_each(|(i, field)| {
            let mut h = p.external_field;
            for &j in &self.neighbors[i] {
                h += p.exchange * spins[j];
            }
            h += 2.0 * p.anisotropy * spins[i].dot(&p.anisotropy_axis) * p.anisotropy_axis;
            *field = h;
        });
    }

    /// Total energy of a spin configuration.
    pub fn energy(&self, spins: &[Vector3<f64>]) -> f64 {
        debug_assert_eq!(spins.len(), self.neighbors.len());
        let p = &self.params;
        spins
            .par_iter()
            .enumerate()
            .map(|(i, s)| {
                // Each exchange pair is visited from both ends.
                let exchange: f64 = self.neighbors[i].iter().map(|&j| s.dot(&spins[j])).sum();
                let anisotropy = s.dot(&p.anisotropy_axis).powi(2);
                -0.5 * p.exchange * exchange - p.anisotropy * anisotropy - p.external_field.dot(s)
            })
            .sum()
    }

    /// Energy of a spin configuration split by interaction term. The terms
    /// sum to [`Hamiltonian::energy`].
    pub fn energy_contributions(&self, spins: &[Vector3<f64>]) -> EnergyContributions {
        debug_assert_eq!(spins.len(), self.neighbors.len());
        let p = &self.params;
        let (exchange, anisotropy, zeeman) = spins
            .par_iter()
            .enumerate()
            .map(|(i, s)| {
                let pair_sum: f64 = self.neighbors[i].iter().map(|&j| s.dot(&spins[j])).sum();
                (
                    -0.5 * p.exchange * pair_sum,
                    -p.anisotropy * s.dot(&p.anisotropy_axis).powi(2),
                    -p.external_field.dot(s),
                )
            })
            .reduce(
                || (0.0, 0.0, 0.0),
                |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2),
            );
        EnergyContributions {
            exchange,
            anisotropy,
            zeeman,
        }
    }
}

/// Nearest neighbors along each tiling direction, one hop on the same
/// sublattice, honoring per-direction periodic boundary conditions.
fn build_neighbor_list(geometry: &Geometry, boundary_conditions: [bool; 3]) -> Vec<Vec<usize>> {
    let n_cells = geometry.n_cells();
    let n_basis = geometry.basis_atoms().len();
    let nos = geometry.nos();
    let mut neighbors = vec![Vec::new(); nos];
    if nos == 0 {
        return neighbors;
    }

    let index_of = |coords: [usize; 3], atom: usize| {
        atom + n_basis * (coords[0] + n_cells[0] * (coords[1] + n_cells[1] * coords[2]))
    };

    for (i, list) in neighbors.iter_mut().enumerate() {
        let atom = i % n_basis;
        let cell = i / n_basis;
        let coords = [
            cell % n_cells[0],
            (cell / n_cells[0]) % n_cells[1],
            cell / (n_cells[0] * n_cells[1]),
        ];
        for dim in 0..3 {
            if n_cells[dim] < 2 {
                continue;
            }
            for delta in [-1isize, 1] {
                let along = coords[dim] as isize + delta;
                let wrapped = if along < 0 || along >= n_cells[dim] as isize {
                    if !boundary_conditions[dim] {
                        continue;
                    }
                    along.rem_euclid(n_cells[dim] as isize) as usize
                } else {
                    along as usize
                };
                let mut neighbor = coords;
                neighbor[dim] = wrapped;
                let j = index_of(neighbor, atom);
                if j != i {
                    list.push(j);
                }
            }
        }
    }
    neighbors
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn chain_geometry(n: i32) -> Geometry {
        Geometry::build(
            [Vector3::x(), Vector3::y(), Vector3::z()],
            [Vector3::x(), Vector3::y(), Vector3::z()],
            [n, 1, 1],
            vec![Vector3::zeros()],
            1.0,
        )
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn open_chain_has_fewer_neighbors_at_the_edges() {
        let geometry = chain_geometry(4);
        let hamiltonian = Hamiltonian::new(HamiltonianParams::default(), &geometry);
        assert_eq!(hamiltonian.neighbors(0), &[1]);
        assert_eq!(hamiltonian.neighbors(1), &[0, 2]);
        assert_eq!(hamiltonian.neighbors(3), &[2]);
    }

    #[test]
    fn periodic_chain_wraps_around() {
        let geometry = chain_geometry(4);
        let params = HamiltonianParams {
            boundary_conditions: [true, false, false],
            ..Default::default()
        };
        let hamiltonian = Hamiltonian::new(params, &geometry);
        let mut first = hamiltonian.neighbors(0).to_vec();
        first.sort_unstable();
        assert_eq!(first, vec![1, 3]);
    }

    #[test]
    fn parallel_spins_minimize_exchange_energy() {
        let geometry = chain_geometry(2);
        let hamiltonian = Hamiltonian::new(HamiltonianParams::default(), &geometry);
        let parallel = vec![Vector3::z(), Vector3::z()];
        let antiparallel = vec![Vector3::z(), -Vector3::z()];
        assert!(approx_eq(hamiltonian.energy(&parallel), -1.0));
        assert!(approx_eq(hamiltonian.energy(&antiparallel), 1.0));
    }

    #[test]
    fn anisotropy_energy_favors_the_easy_axis() {
        let geometry = chain_geometry(1);
        let params = HamiltonianParams {
            exchange: 0.0,
            anisotropy: 0.5,
            ..Default::default()
        };
        let hamiltonian = Hamiltonian::new(params, &geometry);
        assert!(approx_eq(hamiltonian.energy(&[Vector3::z()]), -0.5));
        assert!(approx_eq(hamiltonian.energy(&[Vector3::x()]), 0.0));
    }

    #[test]
    fn effective_field_is_negative_energy_gradient() {
        let geometry = chain_geometry(2);
        let params = HamiltonianParams {
            external_field: Vector3::new(0.0, 0.0, 0.25),
            ..Default::default()
        };
        let hamiltonian = Hamiltonian::new(params, &geometry);
        let spins = vec![Vector3::z(), Vector3::x()];
        let mut field = Vec::new();
        hamiltonian.effective_field_into(&spins, &mut field);
        // Spin 0 sees the exchange pull of spin 1 plus the external field.
        assert!((field[0] - Vector3::new(1.0, 0.0, 0.25)).norm() < TOLERANCE);
        assert!((field[1] - Vector3::new(0.0, 0.0, 1.25)).norm() < TOLERANCE);
    }

    #[test]
    fn energy_decomposes_into_interaction_terms() {
        let geometry = chain_geometry(2);
        let params = HamiltonianParams {
            anisotropy: 0.5,
            external_field: Vector3::new(0.0, 0.0, 0.25),
            ..Default::default()
        };
        let hamiltonian = Hamiltonian::new(params, &geometry);
        let spins = vec![Vector3::z(), Vector3::x()];

        let contributions = hamiltonian.energy_contributions(&spins);

        assert!(approx_eq(contributions.exchange, 0.0));
        assert!(approx_eq(contributions.anisotropy, -0.5));
        assert!(approx_eq(contributions.zeeman, -0.25));
        assert!(approx_eq(contributions.total(), hamiltonian.energy(&spins)));
    }

    #[test]
    fn empty_geometry_produces_no_neighbors() {
        let geometry = chain_geometry(0);
        let hamiltonian = Hamiltonian::new(HamiltonianParams::default(), &geometry);
        assert!(hamiltonian.energy(&[]).abs() < TOLERANCE);
    }
}
