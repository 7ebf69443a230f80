//! High-level operations over a [`State`](crate::engine::state::State).
//!
//! Every function takes the state plus an `(idx_image, idx_chain)` selector
//! pair; negative selector values address the active chain or image. The
//! selector is resolved exactly once per call, so out-of-range indices fail
//! uniformly instead of being clamped somewhere down the stack.

pub mod chain;
pub mod geometry;
pub mod simulation;
