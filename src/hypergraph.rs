use crate::state::{DpState, StateId};
use crate::vocab::WordId;

/// Accumulated cost of the source-lattice path a derivation covers.
///
/// Plain sentences have a single path of cost zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SourcePath {
    path_cost: f64,
}

impl SourcePath {
    /// Creates an empty path.
    #[inline(always)]
    pub const fn new() -> Self {
        Self { path_cost: 0.0 }
    }

    /// Returns the path extended by one lattice arc.
    #[inline(always)]
    #[must_use]
    pub fn extend(self, arc_cost: f64) -> Self {
        Self {
            path_cost: self.path_cost + arc_cost,
        }
    }

    /// Gets the accumulated cost.
    #[inline(always)]
    pub const fn path_cost(&self) -> f64 {
        self.path_cost
    }
}

/// Represents a node in the hypergraph.
///
/// A node covers the span `[i, j)` of the input with a given left-hand side and carries at most
/// one DP state per stateful feature, stored under the feature's [`StateId`]. States never change
/// once the node is built.
#[derive(Clone, Debug)]
pub struct HgNode {
    i: usize,
    j: usize,
    lhs: WordId,
    states: Vec<Option<DpState>>,
}

impl HgNode {
    /// Creates a node without states.
    #[inline(always)]
    pub const fn new(i: usize, j: usize, lhs: WordId) -> Self {
        Self {
            i,
            j,
            lhs,
            states: vec![],
        }
    }

    /// Creates a node holding the given states.
    pub fn with_states<I>(i: usize, j: usize, lhs: WordId, states: I) -> Self
    where
        I: IntoIterator<Item = (StateId, DpState)>,
    {
        let mut node = Self::new(i, j, lhs);
        for (id, state) in states {
            if node.states.len() <= id.get() {
                node.states.resize(id.get() + 1, None);
            }
            node.states[id.get()] = Some(state);
        }
        node
    }

    /// Gets the start of the span.
    #[inline(always)]
    pub const fn i(&self) -> usize {
        self.i
    }

    /// Gets the end of the span.
    #[inline(always)]
    pub const fn j(&self) -> usize {
        self.j
    }

    /// Gets the left-hand side label.
    #[inline(always)]
    pub const fn lhs(&self) -> WordId {
        self.lhs
    }

    /// Gets the state stored under `id`.
    #[inline(always)]
    pub fn dp_state(&self, id: StateId) -> Option<&DpState> {
        self.states.get(id.get()).and_then(Option::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::state::NgramState;

    #[test]
    fn test_state_slots() {
        let s0 = DpState::from(NgramState::new(vec![1], vec![1]).unwrap());
        let s2 = DpState::from(NgramState::new(vec![2], vec![3]).unwrap());
        let node = HgNode::with_states(
            0,
            3,
            5,
            [(StateId::new(0), s0.clone()), (StateId::new(2), s2.clone())],
        );
        assert_eq!(Some(&s0), node.dp_state(StateId::new(0)));
        assert_eq!(None, node.dp_state(StateId::new(1)));
        assert_eq!(Some(&s2), node.dp_state(StateId::new(2)));
        assert_eq!(None, node.dp_state(StateId::new(3)));
        assert_eq!((0, 3, 5), (node.i(), node.j(), node.lhs()));
    }

    #[test]
    fn test_source_path() {
        let path = SourcePath::new().extend(0.5).extend(0.25);
        assert!((path.path_cost() - 0.75).abs() < f64::EPSILON);
    }
}
