use super::chain::Chain;
use super::error::CoreError;
use crate::core::system::SpinSystem;

/// The root of the simulation state: every chain, the active-chain selection
/// and the detached clipboard image used for cut/copy/paste between chains.
#[derive(Debug)]
pub struct State {
    chains: Vec<Chain>,
    active_chain: usize,
    clipboard: Option<SpinSystem>,
}

impl State {
    pub fn new(chain: Chain) -> Self {
        Self {
            chains: vec![chain],
            active_chain: 0,
            clipboard: None,
        }
    }

    /// Number of chains.
    pub fn noc(&self) -> usize {
        self.chains.len()
    }

    pub fn active_chain(&self) -> usize {
        self.active_chain
    }

    pub fn add_chain(&mut self, chain: Chain) {
        self.chains.push(chain);
    }

    /// Resolves an `(idx_image, idx_chain)` pair into concrete indices.
    ///
    /// Negative values select the active chain or that chain's active image.
    /// Non-negative values outside `[0, count)` are an error; indices are
    /// never clamped. Every public operation routes through this resolver
    /// exactly once, so error semantics are uniform everywhere.
    pub fn resolve(&self, idx_image: i32, idx_chain: i32) -> Result<(usize, usize), CoreError> {
        let chain_idx = if idx_chain < 0 {
            self.active_chain
        } else if (idx_chain as usize) < self.chains.len() {
            idx_chain as usize
        } else {
            return Err(CoreError::IndexOutOfRange {
                what: "chain",
                index: idx_chain,
                count: self.chains.len(),
            });
        };
        let chain = &self.chains[chain_idx];
        let image_idx = if idx_image < 0 {
            chain.active_image()
        } else if (idx_image as usize) < chain.noi() {
            idx_image as usize
        } else {
            return Err(CoreError::IndexOutOfRange {
                what: "image",
                index: idx_image,
                count: chain.noi(),
            });
        };
        Ok((image_idx, chain_idx))
    }

    pub fn chain(&self, idx: usize) -> Result<&Chain, CoreError> {
        self.chains
            .get(idx)
            .ok_or_else(|| CoreError::Internal(format!("resolved chain index {idx} vanished")))
    }

    pub fn chain_mut(&mut self, idx: usize) -> Result<&mut Chain, CoreError> {
        self.chains
            .get_mut(idx)
            .ok_or_else(|| CoreError::Internal(format!("resolved chain index {idx} vanished")))
    }

    pub fn chains_mut(&mut self) -> &mut [Chain] {
        &mut self.chains
    }

    pub fn clipboard(&self) -> Option<&SpinSystem> {
        self.clipboard.as_ref()
    }

    pub fn clipboard_mut(&mut self) -> Option<&mut SpinSystem> {
        self.clipboard.as_mut()
    }

    /// Overwrites the clipboard; the previous content is discarded.
    pub fn set_clipboard(&mut self, system: SpinSystem) {
        self.clipboard = Some(system);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Geometry;
    use crate::core::hamiltonian::HamiltonianParams;
    use crate::core::system::LlgParams;
    use crate::engine::chain::GnebParams;
    use nalgebra::Vector3;
    use std::sync::Arc;

    fn test_state(noi: usize) -> State {
        let geometry = Arc::new(Geometry::build(
            [Vector3::x(), Vector3::y(), Vector3::z()],
            [Vector3::x(), Vector3::y(), Vector3::z()],
            [2, 1, 1],
            vec![Vector3::zeros()],
            1.0,
        ));
        let images = (0..noi)
            .map(|_| {
                SpinSystem::new(
                    geometry.clone(),
                    HamiltonianParams::default(),
                    LlgParams::default(),
                )
            })
            .collect();
        State::new(Chain::new(images, GnebParams::default()).unwrap())
    }

    #[test]
    fn negative_indices_resolve_to_the_active_selection() {
        let mut state = test_state(3);
        state.chain_mut(0).unwrap().next_image();
        let (image, chain) = state.resolve(-1, -1).unwrap();
        assert_eq!((image, chain), (1, 0));
    }

    #[test]
    fn explicit_indices_pass_through() {
        let state = test_state(3);
        let (image, chain) = state.resolve(2, 0).unwrap();
        assert_eq!((image, chain), (2, 0));
    }

    #[test]
    fn out_of_range_image_index_is_an_error_not_a_clamp() {
        let state = test_state(3);
        let result = state.resolve(3, -1);
        assert!(matches!(
            result,
            Err(CoreError::IndexOutOfRange {
                what: "image",
                index: 3,
                count: 3
            })
        ));
    }

    #[test]
    fn out_of_range_chain_index_is_an_error() {
        let state = test_state(1);
        let result = state.resolve(-1, 1);
        assert!(matches!(
            result,
            Err(CoreError::IndexOutOfRange { what: "chain", .. })
        ));
    }

    #[test]
    fn clipboard_is_overwritten_not_merged() {
        let mut state = test_state(1);
        let (image_idx, chain_idx) = state.resolve(-1, -1).unwrap();
        let copy = state
            .chain(chain_idx)
            .unwrap()
            .image(image_idx)
            .unwrap()
            .read()
            .unwrap()
            .clone();
        state.set_clipboard(copy.clone());
        let mut second = copy;
        second.spins_mut()[0] = -Vector3::z();
        state.set_clipboard(second);
        assert!((state.clipboard().unwrap().spins()[0] + Vector3::z()).norm() < 1e-12);
    }
}
