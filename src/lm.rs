//! N-gram language model feature.
//!
//! The feature scores the n-grams a rule application completes, carrying the boundary words of
//! each derivation in an [`NgramState`](crate::NgramState) so that no sentence is ever rescanned.

mod feature;
mod model;
mod state_computer;

use log::debug;

use crate::vocab::{Vocabulary, WordId};

pub use feature::LanguageModelFF;
pub use model::{BackoffModel, NgramLanguageModel};
pub use state_computer::NgramStateComputer;

/// Sentence start marker.
pub const START_SYM: &str = "<s>";

/// Sentence end marker.
pub const STOP_SYM: &str = "</s>";

/// Marker standing in a left context for words absorbed under a single backoff weight.
pub const BACKOFF_LEFT_SYM: &str = "<lzfbo>";

/// Marker reserved for a minimized, empty right context.
pub const NULL_RIGHT_SYM: &str = "<lzfrnull>";

/// Reserved symbol IDs shared by every language model feature of a run.
///
/// Register them once on the run's vocabulary and hand the same value to each feature.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LmSymbols {
    /// ID of [`START_SYM`].
    pub start: WordId,

    /// ID of [`STOP_SYM`].
    pub stop: WordId,

    /// ID of [`BACKOFF_LEFT_SYM`].
    pub backoff_left: WordId,

    /// ID of [`NULL_RIGHT_SYM`].
    pub null_right: WordId,
}

impl LmSymbols {
    /// Interns the reserved symbols.
    pub fn register(vocab: &mut Vocabulary) -> Self {
        let symbols = Self {
            start: vocab.id(START_SYM),
            stop: vocab.id(STOP_SYM),
            backoff_left: vocab.id(BACKOFF_LEFT_SYM),
            null_right: vocab.id(NULL_RIGHT_SYM),
        };
        debug!("registered LM symbols: {symbols:?}");
        symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let mut vocab = Vocabulary::new();
        let the = vocab.id("the");
        let a = LmSymbols::register(&mut vocab);
        let b = LmSymbols::register(&mut vocab);
        assert_eq!(a, b);
        let ids = [a.start, a.stop, a.backoff_left, a.null_right, the];
        for (i, x) in ids.iter().enumerate() {
            for y in &ids[i + 1..] {
                assert_ne!(x, y);
            }
        }
        assert_eq!(Some(a.backoff_left), vocab.get_id(BACKOFF_LEFT_SYM));
    }
}
