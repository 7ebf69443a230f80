pub mod geometry;
pub mod hamiltonian;
pub mod mesh;
pub mod system;
