//! Stateful orchestration: chains of images, solver tasks and the root
//! simulation state the workflow layer operates on.

pub mod chain;
pub mod controller;
pub mod error;
pub mod interpolation;
pub mod progress;
pub mod solver;
pub mod state;
