use super::mesh;
use nalgebra::Vector3;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Real-space description of the simulated crystal lattice.
///
/// A geometry is built once from a crystallographic basis, three translation
/// vectors and the number of cells to tile along each translation direction.
/// It is immutable after construction; resizing produces a fresh instance via
/// [`Geometry::resized`] so that position arrays can never be observed
/// half-updated.
///
/// The position ordering produced by [`Geometry::build`] is the canonical
/// spin index ordering used by every per-spin array in the library:
/// `i = atom + n_basis * (a + n_a * (b + n_b * c))`, with the basis atom
/// index varying fastest.
#[derive(Debug)]
pub struct Geometry {
    /// Basis vectors of the unit cell (units of the lattice constant).
    basis: [Vector3<f64>; 3],
    /// Fractional atom positions within the unit cell.
    basis_atoms: Vec<Vector3<f64>>,
    /// Translation vectors along which the cell is tiled.
    translation_vectors: [Vector3<f64>; 3],
    /// Number of cells along each translation direction.
    n_cells: [usize; 3],
    /// Scalar length unit applied to all positions.
    lattice_constant: f64,
    /// Absolute position of every spin, in canonical ordering.
    spin_pos: Vec<Vector3<f64>>,
    /// Sublattice tag of every spin (basis atom index).
    atom_types: Vec<i32>,
    bounds_min: Vector3<f64>,
    bounds_max: Vector3<f64>,
    center: Vector3<f64>,
    cell_bounds_min: Vector3<f64>,
    cell_bounds_max: Vector3<f64>,
    /// Number of tiling directions with more than one cell (0-3).
    dimensionality: usize,
    triangulation_cache: Mutex<HashMap<usize, Arc<Vec<[usize; 3]>>>>,
    tetrahedra_cache: Mutex<HashMap<usize, Arc<Vec<[usize; 4]>>>>,
}

impl Geometry {
    /// Builds the lattice by emitting one absolute position per cell
    /// translation and basis atom.
    ///
    /// Malformed input (a zero or negative cell count, or an empty basis)
    /// yields an empty geometry with `nos() == 0` rather than an error;
    /// callers must check `nos()` before indexing.
    pub fn build(
        basis: [Vector3<f64>; 3],
        translation_vectors: [Vector3<f64>; 3],
        n_cells: [i32; 3],
        basis_atoms: Vec<Vector3<f64>>,
        lattice_constant: f64,
    ) -> Self {
        if n_cells.iter().any(|&n| n <= 0) || basis_atoms.is_empty() {
            warn!(?n_cells, n_basis = basis_atoms.len(), "degenerate lattice input, building empty geometry");
            return Self::assemble(basis, translation_vectors, [0, 0, 0], basis_atoms, lattice_constant, Vec::new(), Vec::new());
        }
        let n_cells = [n_cells[0] as usize, n_cells[1] as usize, n_cells[2] as usize];
        let nos = n_cells[0] * n_cells[1] * n_cells[2] * basis_atoms.len();

        let mut spin_pos = Vec::with_capacity(nos);
        let mut atom_types = Vec::with_capacity(nos);
        let [ta, tb, tc] = translation_vectors;
        for c in 0..n_cells[2] {
            for b in 0..n_cells[1] {
                for a in 0..n_cells[0] {
                    let translation = ta * a as f64 + tb * b as f64 + tc * c as f64;
                    for (atom, frac) in basis_atoms.iter().enumerate() {
                        let offset = basis[0] * frac.x + basis[1] * frac.y + basis[2] * frac.z;
                        spin_pos.push((translation + offset) * lattice_constant);
                        atom_types.push(atom as i32);
                    }
                }
            }
        }

        Self::assemble(basis, translation_vectors, n_cells, basis_atoms, lattice_constant, spin_pos, atom_types)
    }

    fn assemble(
        basis: [Vector3<f64>; 3],
        translation_vectors: [Vector3<f64>; 3],
        n_cells: [usize; 3],
        basis_atoms: Vec<Vector3<f64>>,
        lattice_constant: f64,
        spin_pos: Vec<Vector3<f64>>,
        atom_types: Vec<i32>,
    ) -> Self {
        let (bounds_min, bounds_max) = component_bounds(&spin_pos);
        let center = (bounds_min + bounds_max) * 0.5;
        let (cell_bounds_min, cell_bounds_max) = cell_corner_bounds(&basis, lattice_constant);
        let dimensionality = n_cells.iter().filter(|&&n| n > 1).count();
        Self {
            basis,
            basis_atoms,
            translation_vectors,
            n_cells,
            lattice_constant,
            spin_pos,
            atom_types,
            bounds_min,
            bounds_max,
            center,
            cell_bounds_min,
            cell_bounds_max,
            dimensionality,
            triangulation_cache: Mutex::new(HashMap::new()),
            tetrahedra_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Rebuilds the same lattice with a new tiling extent.
    pub fn resized(&self, n_cells: [i32; 3]) -> Self {
        Self::build(
            self.basis,
            self.translation_vectors,
            n_cells,
            self.basis_atoms.clone(),
            self.lattice_constant,
        )
    }

    /// Number of spins in the lattice.
    pub fn nos(&self) -> usize {
        self.spin_pos.len()
    }

    /// Absolute spin positions in canonical ordering.
    pub fn spin_pos(&self) -> &[Vector3<f64>] {
        &self.spin_pos
    }

    /// Sublattice tag of every spin; parallel to [`Geometry::spin_pos`].
    pub fn atom_types(&self) -> &[i32] {
        &self.atom_types
    }

    pub fn basis(&self) -> &[Vector3<f64>; 3] {
        &self.basis
    }

    pub fn basis_atoms(&self) -> &[Vector3<f64>] {
        &self.basis_atoms
    }

    pub fn translation_vectors(&self) -> &[Vector3<f64>; 3] {
        &self.translation_vectors
    }

    pub fn n_cells(&self) -> [usize; 3] {
        self.n_cells
    }

    pub fn lattice_constant(&self) -> f64 {
        self.lattice_constant
    }

    /// Axis-aligned bounds over all spin positions.
    pub fn bounds(&self) -> (Vector3<f64>, Vector3<f64>) {
        (self.bounds_min, self.bounds_max)
    }

    pub fn center(&self) -> Vector3<f64> {
        self.center
    }

    /// Axis-aligned bounds of a single unit cell.
    pub fn cell_bounds(&self) -> (Vector3<f64>, Vector3<f64>) {
        (self.cell_bounds_min, self.cell_bounds_max)
    }

    /// Number of non-trivial tiling directions (0-3).
    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    /// Triangulation over the lattice points selected at `n_cell_step`
    /// granularity, for two-dimensional lattices. Empty for any other
    /// dimensionality. Results are cached per step.
    pub fn triangulation(&self, n_cell_step: usize) -> Arc<Vec<[usize; 3]>> {
        let step = n_cell_step.max(1);
        let mut cache = match self.triangulation_cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache
            .entry(step)
            .or_insert_with(|| {
                let triangles = if self.dimensionality == 2 {
                    mesh::triangulate_lattice(self.n_cells, self.basis_atoms.len(), step)
                } else {
                    Vec::new()
                };
                Arc::new(triangles)
            })
            .clone()
    }

    /// Tetrahedralization over the lattice points selected at `n_cell_step`
    /// granularity, for three-dimensional lattices. Empty for any other
    /// dimensionality. Results are cached per step.
    pub fn tetrahedra(&self, n_cell_step: usize) -> Arc<Vec<[usize; 4]>> {
        let step = n_cell_step.max(1);
        let mut cache = match self.tetrahedra_cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache
            .entry(step)
            .or_insert_with(|| {
                let tetrahedra = if self.dimensionality == 3 {
                    mesh::tetrahedralize_lattice(self.n_cells, self.basis_atoms.len(), step)
                } else {
                    Vec::new()
                };
                Arc::new(tetrahedra)
            })
            .clone()
    }
}

fn component_bounds(positions: &[Vector3<f64>]) -> (Vector3<f64>, Vector3<f64>) {
    if positions.is_empty() {
        return (Vector3::zeros(), Vector3::zeros());
    }
    let mut min = positions[0];
    let mut max = positions[0];
    for p in positions.iter().skip(1) {
        for dim in 0..3 {
            min[dim] = min[dim].min(p[dim]);
            max[dim] = max[dim].max(p[dim]);
        }
    }
    (min, max)
}

fn cell_corner_bounds(basis: &[Vector3<f64>; 3], lattice_constant: f64) -> (Vector3<f64>, Vector3<f64>) {
    let mut min: Vector3<f64> = Vector3::zeros();
    let mut max: Vector3<f64> = Vector3::zeros();
    for i in 0..2 {
        for j in 0..2 {
            for k in 0..2 {
                let corner =
                    (basis[0] * i as f64 + basis[1] * j as f64 + basis[2] * k as f64) * lattice_constant;
                for dim in 0..3 {
                    min[dim] = min[dim].min(corner[dim]);
                    max[dim] = max[dim].max(corner[dim]);
                }
            }
        }
    }
    (min, max)
}
