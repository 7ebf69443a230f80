//! Structured-grid simplicial meshes over the lattice point set.
//!
//! A Bravais tiling admits a direct decomposition of each (down-sampled)
//! cell into simplices: two triangles per quad in two dimensions, six
//! tetrahedra per hexahedron in three. Mesh indices refer to the canonical
//! spin index of the first basis atom of each selected cell, so consumers
//! can feed them straight into position/direction buffers.

/// Canonical spin index of the first basis atom of cell `(a, b, c)`.
#[inline]
fn site_index(n_cells: [usize; 3], n_basis: usize, coords: [usize; 3]) -> usize {
    n_basis * (coords[0] + n_cells[0] * (coords[1] + n_cells[1] * coords[2]))
}

/// Indices selected along one axis at `step`-cell granularity.
fn selected(extent: usize, step: usize) -> Vec<usize> {
    (0..extent).step_by(step).collect()
}

/// Triangulates a two-dimensional lattice selection.
///
/// Expects exactly two tiling directions with more than one cell; any other
/// arrangement produces an empty mesh.
pub fn triangulate_lattice(n_cells: [usize; 3], n_basis: usize, step: usize) -> Vec<[usize; 3]> {
    let axes: Vec<usize> = (0..3).filter(|&d| n_cells[d] > 1).collect();
    if axes.len() != 2 {
        return Vec::new();
    }
    let (u, v) = (axes[0], axes[1]);
    let su = selected(n_cells[u], step);
    let sv = selected(n_cells[v], step);
    if su.len() < 2 || sv.len() < 2 {
        return Vec::new();
    }

    let corner = |i: usize, j: usize| {
        let mut coords = [0usize; 3];
        coords[u] = su[i];
        coords[v] = sv[j];
        site_index(n_cells, n_basis, coords)
    };

    let mut triangles = Vec::with_capacity(2 * (su.len() - 1) * (sv.len() - 1));
    for j in 0..sv.len() - 1 {
        for i in 0..su.len() - 1 {
            let p00 = corner(i, j);
            let p10 = corner(i + 1, j);
            let p01 = corner(i, j + 1);
            let p11 = corner(i + 1, j + 1);
            triangles.push([p00, p10, p11]);
            triangles.push([p00, p11, p01]);
        }
    }
    triangles
}

/// Tetrahedralizes a three-dimensional lattice selection.
///
/// Each hexahedral cell is split into six tetrahedra sharing the main
/// diagonal, so adjacent cells always agree on their shared faces.
pub fn tetrahedralize_lattice(n_cells: [usize; 3], n_basis: usize, step: usize) -> Vec<[usize; 4]> {
    if n_cells.iter().any(|&n| n < 2) {
        return Vec::new();
    }
    let sa = selected(n_cells[0], step);
    let sb = selected(n_cells[1], step);
    let sc = selected(n_cells[2], step);
    if sa.len() < 2 || sb.len() < 2 || sc.len() < 2 {
        return Vec::new();
    }

    // Corner bit layout: x | y << 1 | z << 2.
    const CUBE_TETRAHEDRA: [[usize; 4]; 6] = [
        [0, 1, 3, 7],
        [0, 3, 2, 7],
        [0, 2, 6, 7],
        [0, 6, 4, 7],
        [0, 4, 5, 7],
        [0, 5, 1, 7],
    ];

    let mut tetrahedra = Vec::with_capacity(6 * (sa.len() - 1) * (sb.len() - 1) * (sc.len() - 1));
    for k in 0..sc.len() - 1 {
        for j in 0..sb.len() - 1 {
            for i in 0..sa.len() - 1 {
                let mut corners = [0usize; 8];
                for (bit, corner) in corners.iter_mut().enumerate() {
                    let coords = [
                        sa[i + (bit & 1)],
                        sb[j + ((bit >> 1) & 1)],
                        sc[k + ((bit >> 2) & 1)],
                    ];
                    *corner = site_index(n_cells, n_basis, coords);
                }
                for tet in &CUBE_TETRAHEDRA {
                    tetrahedra.push([
                        corners[tet[0]],
                        corners[tet[1]],
                        corners[tet[2]],
                        corners[tet[3]],
                    ]);
                }
            }
        }
    }
    tetrahedra
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_quad_becomes_two_triangles() {
        let triangles = triangulate_lattice([2, 2, 1], 1, 1);
        assert_eq!(triangles, vec![[0, 1, 3], [0, 3, 2]]);
    }

    #[test]
    fn triangle_count_scales_with_grid() {
        let triangles = triangulate_lattice([4, 3, 1], 1, 1);
        assert_eq!(triangles.len(), 2 * 3 * 2);
    }

    #[test]
    fn triangulation_respects_cell_step() {
        let fine = triangulate_lattice([5, 5, 1], 1, 1);
        let coarse = triangulate_lattice([5, 5, 1], 1, 2);
        assert_eq!(fine.len(), 2 * 4 * 4);
        assert_eq!(coarse.len(), 2 * 2 * 2);
    }

    #[test]
    fn triangulation_skips_basis_atoms_beyond_the_first() {
        let triangles = triangulate_lattice([2, 2, 1], 3, 1);
        assert_eq!(triangles, vec![[0, 3, 9], [0, 9, 6]]);
    }

    #[test]
    fn triangulation_of_degenerate_selection_is_empty() {
        assert!(triangulate_lattice([7, 1, 1], 1, 1).is_empty());
        assert!(triangulate_lattice([2, 2, 2], 1, 1).is_empty());
        // Step larger than the extent leaves a single selected row.
        assert!(triangulate_lattice([3, 3, 1], 1, 5).is_empty());
    }

    #[test]
    fn single_cube_becomes_six_tetrahedra() {
        let tetrahedra = tetrahedralize_lattice([2, 2, 2], 1, 1);
        assert_eq!(tetrahedra.len(), 6);
        for tet in &tetrahedra {
            assert!(tet.contains(&0));
            assert!(tet.contains(&7));
        }
    }

    #[test]
    fn tetrahedralization_of_flat_lattice_is_empty() {
        assert!(tetrahedralize_lattice([4, 4, 1], 1, 1).is_empty());
    }
}
