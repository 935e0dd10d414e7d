//! Dynamic-programming states carried on hypergraph nodes.

use crate::errors::{HgscoreError, Result};
use crate::vocab::WordId;

/// Identity of a state slot on a hypergraph node.
///
/// Every stateful feature owns exactly one slot, so a node can carry the states of several
/// stateful features side by side.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct StateId(usize);

impl StateId {
    /// Creates a new slot identity.
    #[inline(always)]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Gets the slot index.
    #[inline(always)]
    pub const fn get(self) -> usize {
        self.0
    }
}

/// Equivalence state of the n-gram language model.
///
/// The left context holds the boundary words at the start of a derivation whose n-grams still
/// lack history; the right context holds the last words that a derivation attached on its right
/// will see as history. Both always have the same length.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct NgramState {
    left: Vec<WordId>,
    right: Vec<WordId>,
}

impl NgramState {
    /// Creates a new state.
    ///
    /// # Errors
    ///
    /// [`HgscoreError`] is returned when the contexts differ in length.
    pub fn new(left: Vec<WordId>, right: Vec<WordId>) -> Result<Self> {
        if left.len() != right.len() {
            return Err(HgscoreError::invalid_argument(format!(
                "left and right contexts have unequal lengths ({} != {})",
                left.len(),
                right.len()
            )));
        }
        Ok(Self { left, right })
    }

    /// Gets the left context.
    #[inline(always)]
    pub fn left(&self) -> &[WordId] {
        &self.left
    }

    /// Gets the right context.
    #[inline(always)]
    pub fn right(&self) -> &[WordId] {
        &self.right
    }

    /// Returns both contexts.
    ///
    /// # Panics
    ///
    /// Panics if the contexts have unequal lengths, which means the state was corrupted.
    #[inline(always)]
    pub fn contexts(&self) -> (&[WordId], &[WordId]) {
        assert_eq!(
            self.left.len(),
            self.right.len(),
            "left and right contexts have unequal lengths"
        );
        (&self.left, &self.right)
    }

    /// Returns the common length of the contexts.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Returns `true` if both contexts are empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// A feature-owned summary attached to a hypergraph node.
///
/// Two derivations with equal states are interchangeable for every future score of the feature
/// that owns the slot, so states also serve as recombination keys.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum DpState {
    /// State of an n-gram language model feature.
    Ngram(NgramState),
}

impl DpState {
    /// Returns the n-gram state, if this is one.
    #[inline(always)]
    pub fn as_ngram(&self) -> Option<&NgramState> {
        match self {
            Self::Ngram(state) => Some(state),
        }
    }
}

impl From<NgramState> for DpState {
    fn from(state: NgramState) -> Self {
        Self::Ngram(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unequal_contexts_rejected() {
        let e = NgramState::new(vec![1, 2], vec![2]).unwrap_err();
        assert!(e.is_invalid_argument());
    }

    #[test]
    fn test_state_accessors() {
        let state = NgramState::new(vec![1, 2], vec![3, 4]).unwrap();
        assert_eq!((&[1, 2][..], &[3, 4][..]), state.contexts());
        assert_eq!(2, state.len());
        assert!(NgramState::default().is_empty());
    }

    #[test]
    fn test_states_as_keys() {
        let a = DpState::from(NgramState::new(vec![1], vec![1]).unwrap());
        let b = DpState::from(NgramState::new(vec![1], vec![1]).unwrap());
        let c = DpState::from(NgramState::new(vec![2], vec![1]).unwrap());
        let mut set = hashbrown::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(!set.contains(&c));
    }
}
