use crate::errors::{HgscoreError, Result};
use crate::vocab::{self, WordId};

/// Represents a synchronous CFG production.
///
/// Both sides are token sequences in which nonterminal slots are negative back-references
/// (see [`vocab::nonterminal`]). The source side is carried for the search and never read by the
/// scoring core.
#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    lhs: WordId,
    source: Vec<WordId>,
    target: Vec<WordId>,
    arity: usize,
    scores: Vec<f64>,
}

impl Rule {
    /// Creates a new rule.
    ///
    /// # Arguments
    ///
    /// * `lhs` - Label of the left-hand side.
    /// * `source` - Source-side tokens.
    /// * `target` - Target-side tokens.
    /// * `scores` - Dense translation-model scores read by [`PhraseModel`](crate::PhraseModel).
    ///
    /// # Errors
    ///
    /// [`HgscoreError`] is returned when the target side refers to a nonterminal slot the source
    /// side does not have.
    pub fn new(lhs: WordId, source: &[WordId], target: &[WordId], scores: &[f64]) -> Result<Self> {
        let arity = source.iter().filter(|&&id| vocab::is_nonterminal(id)).count();
        for &id in target {
            if let Some(index) = vocab::nonterminal_index(id) {
                if index >= arity {
                    return Err(HgscoreError::invalid_argument(format!(
                        "target refers to nonterminal slot {index} of a rule with arity {arity}"
                    )));
                }
            }
        }
        Ok(Self {
            lhs,
            source: source.to_vec(),
            target: target.to_vec(),
            arity,
            scores: scores.to_vec(),
        })
    }

    /// Creates a rule whose source side mirrors the nonterminals of its target side.
    ///
    /// Used where only the target side matters, such as glue rules and tests.
    pub fn from_target(lhs: WordId, target: &[WordId]) -> Self {
        let source: Vec<WordId> = target
            .iter()
            .copied()
            .filter(|&id| vocab::is_nonterminal(id))
            .collect();
        Self {
            lhs,
            arity: source.len(),
            source,
            target: target.to_vec(),
            scores: vec![],
        }
    }

    /// Gets the left-hand side label.
    #[inline(always)]
    pub const fn lhs(&self) -> WordId {
        self.lhs
    }

    /// Gets the source-side tokens.
    #[inline(always)]
    pub fn source(&self) -> &[WordId] {
        &self.source
    }

    /// Gets the target-side tokens.
    #[inline(always)]
    pub fn target(&self) -> &[WordId] {
        &self.target
    }

    /// Gets the number of nonterminal slots.
    #[inline(always)]
    pub const fn arity(&self) -> usize {
        self.arity
    }

    /// Gets the dense rule scores.
    #[inline(always)]
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Returns the number of terminal words on the target side.
    #[inline(always)]
    pub fn num_target_terminals(&self) -> usize {
        self.target
            .iter()
            .filter(|&&id| !vocab::is_nonterminal(id))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::vocab::Vocabulary;

    #[test]
    fn test_rule_arity() {
        let mut vocab = Vocabulary::new();
        let lhs = vocab.id("[X]");
        let source = vocab.phrase("[X,1] de [X,2]").unwrap();
        let target = vocab.phrase("[X,2] of [X,1]").unwrap();
        let rule = Rule::new(lhs, &source, &target, &[0.5]).unwrap();
        assert_eq!(2, rule.arity());
        assert_eq!(1, rule.num_target_terminals());
        assert_eq!(&[0.5], rule.scores());
    }

    #[test]
    fn test_rule_dangling_slot() {
        let mut vocab = Vocabulary::new();
        let lhs = vocab.id("[X]");
        let source = vocab.phrase("[X,1] de").unwrap();
        let target = vocab.phrase("[X,2] of").unwrap();
        assert!(Rule::new(lhs, &source, &target, &[]).is_err());
    }

    #[test]
    fn test_from_target() {
        let mut vocab = Vocabulary::new();
        let lhs = vocab.id("[S]");
        let target = vocab.phrase("[X,1] [X,2] .").unwrap();
        let rule = Rule::from_target(lhs, &target);
        assert_eq!(2, rule.arity());
        assert_eq!(1, rule.num_target_terminals());
    }
}
