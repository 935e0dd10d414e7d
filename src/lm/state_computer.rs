use crate::hypergraph::HgNode;
use crate::state::{DpState, NgramState, StateId};
use crate::vocab::{self, WordId};

/// Builds the equivalence states of an n-gram language model.
///
/// The left context of a derivation is its first `min(order - 1, |yield|)` words and the right
/// context its last `min(order - 1, |yield|)` words, so both always have the same length.
/// Nonterminals contribute their tail's contexts: the left context fills the window, and the
/// right context then replaces the window's trailing words, as in the transition.
#[derive(Clone, Copy, Debug)]
pub struct NgramStateComputer {
    order: usize,
    state_id: StateId,
}

impl NgramStateComputer {
    /// Creates a state computer for models of the given order.
    #[inline(always)]
    pub const fn new(order: usize, state_id: StateId) -> Self {
        Self { order, state_id }
    }

    /// Gets the slot the states are stored under.
    #[inline(always)]
    pub const fn state_id(&self) -> StateId {
        self.state_id
    }

    /// Sets the slot the states are stored under.
    #[inline(always)]
    pub fn set_state_id(&mut self, state_id: StateId) {
        self.state_id = state_id;
    }

    /// Returns the n-gram state of the `index`-th tail node.
    ///
    /// # Panics
    ///
    /// Panics if the tail does not exist or carries no n-gram state in this slot; either means
    /// the search assembled an inconsistent hyperedge.
    pub fn tail_state<'a>(&self, tails: &[&'a HgNode], index: usize) -> &'a NgramState {
        let Some(tail) = tails.get(index) else {
            panic!(
                "rule refers to tail {index}, but only {} tails were given",
                tails.len()
            );
        };
        match tail.dp_state(self.state_id).and_then(DpState::as_ngram) {
            Some(state) => state,
            None => panic!(
                "tail node [{}, {}) has no n-gram state in slot {}",
                tail.i(),
                tail.j(),
                self.state_id.get()
            ),
        }
    }

    /// Computes the state of the derivation built by applying a rule with `target` to `tails`.
    ///
    /// # Panics
    ///
    /// See [`Self::tail_state`].
    pub fn compute_state(&self, target: &[WordId], tails: &[&HgNode]) -> NgramState {
        let keep = self.order.saturating_sub(1);
        let mut left = Vec::with_capacity(keep);
        let mut right: Vec<WordId> = Vec::with_capacity(keep + 1);
        let push = |left: &mut Vec<WordId>, right: &mut Vec<WordId>, id: WordId| {
            if left.len() < keep {
                left.push(id);
            }
            right.push(id);
            if right.len() > keep {
                right.remove(0);
            }
        };
        for &id in target {
            if let Some(index) = vocab::nonterminal_index(id) {
                let (tail_left, tail_right) = self.tail_state(tails, index).contexts();
                for &t in tail_left {
                    push(&mut left, &mut right, t);
                }
                let k = tail_right.len().min(right.len());
                let n = right.len();
                right[n - k..].copy_from_slice(&tail_right[tail_right.len() - k..]);
            } else {
                push(&mut left, &mut right, id);
            }
        }
        // Both contexts hold min(keep, number of pushed words).
        NgramState::new(left, right).expect("computed contexts have equal lengths")
    }
}
