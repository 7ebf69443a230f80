//! # spinpath Core Library
//!
//! A library for simulating classical magnetic spin lattices: single-image
//! Landau-Lifshitz-Gilbert (LLG) time evolution and chain-wide geodesic
//! nudged elastic band (GNEB) relaxation toward minimum-energy transition
//! paths.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a
//! clear separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains the stateless data models
//!   (`Geometry`, `SpinSystem`), the Hamiltonian (effective field and energy)
//!   and the lattice/mesh algorithms backing visualization consumers.
//!
//! - **[`engine`]: The Logic Core.** This stateful layer orchestrates
//!   simulation runs. It owns the image chain (`Chain`), the per-entity
//!   solver controllers with their cooperative-cancellation protocol, the
//!   iterative solvers (LLG dynamics, GNEB relaxation) and the energy-path
//!   interpolation used for plotting.
//!
//! - **[`workflows`]: The Public API.** The highest-level, user-facing layer.
//!   Every operation accepts the `(idx_image, idx_chain)` convention where
//!   negative indices select the active image/chain, and reports failure
//!   through [`engine::error::CoreError`].

pub mod core;
pub mod engine;
pub mod workflows;
