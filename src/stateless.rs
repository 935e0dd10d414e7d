//! Stateless features.

use crate::ff::StatelessFeature;
use crate::rule::Rule;

/// Penalizes every target terminal word by a constant.
#[derive(Clone, Copy, Debug, Default)]
pub struct WordPenalty;

impl WordPenalty {
    /// Feature name.
    pub const NAME: &'static str = "WordPenalty";

    /// Per-word value: `-log10(e)`, so that the penalty is on the same scale as base-10 LM scores.
    pub const OMEGA: f64 = -core::f64::consts::LOG10_E;

    /// Creates a new word penalty.
    #[inline(always)]
    pub const fn new() -> Self {
        Self
    }
}

impl StatelessFeature for WordPenalty {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[allow(clippy::cast_precision_loss)]
    fn estimate(&self, rule: &Rule) -> f64 {
        Self::OMEGA * rule.num_target_terminals() as f64
    }
}

/// Reads one column of the dense translation-model scores of a rule.
#[derive(Clone, Debug)]
pub struct PhraseModel {
    column: usize,
    name: String,
}

impl PhraseModel {
    /// Creates a feature reading `column`, named `tm_{column}`.
    pub fn new(column: usize) -> Self {
        Self {
            column,
            name: format!("tm_{column}"),
        }
    }

    /// Gets the column index.
    #[inline(always)]
    pub const fn column(&self) -> usize {
        self.column
    }
}

impl StatelessFeature for PhraseModel {
    fn name(&self) -> &str {
        &self.name
    }

    /// Rules with fewer columns score 0.
    fn estimate(&self, rule: &Rule) -> f64 {
        rule.scores().get(self.column).copied().unwrap_or(0.0)
    }
}
