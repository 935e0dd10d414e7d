use std::sync::Arc;

use crate::ff::{StatefulBase, StatefulFeature};
use crate::hypergraph::{HgNode, SourcePath};
use crate::lm::model::NgramLanguageModel;
use crate::lm::state_computer::NgramStateComputer;
use crate::lm::LmSymbols;
use crate::rule::Rule;
use crate::state::{DpState, NgramState, StateId};
use crate::vector::FeatureVector;
use crate::vocab::{self, WordId};
use crate::weights::Weights;

/// The n-gram language model feature.
///
/// Each rule application scores exactly the n-grams it completes. Words whose n-grams still
/// lack history are kept in the left context of the new node's state and scored later, either
/// by a transition that supplies the history or by the final transition at the sentence
/// boundary. Summed over a whole derivation, the incremental costs and the final cost equal the
/// model's score of the complete sentence between `<s>` and `</s>`.
pub struct LanguageModelFF<M: ?Sized> {
    base: StatefulBase,
    lm: Arc<M>,
    order: usize,
    symbols: LmSymbols,
    state_computer: NgramStateComputer,
}

impl<M> LanguageModelFF<M>
where
    M: NgramLanguageModel + ?Sized,
{
    /// Creates a new language model feature.
    ///
    /// # Arguments
    ///
    /// * `name` - Feature name, also the key of its weight.
    /// * `lm` - The model, shared with other features and threads.
    /// * `symbols` - Reserved symbols registered on the run's vocabulary.
    /// * `weights` - Configuration to take the weight from. A missing weight defaults to 0 with
    ///   a warning.
    pub fn new(name: &str, lm: Arc<M>, symbols: LmSymbols, weights: &Weights) -> Self {
        let order = lm.order();
        Self {
            base: StatefulBase::new(name, weights),
            lm,
            order,
            symbols,
            state_computer: NgramStateComputer::new(order, StateId::new(0)),
        }
    }

    /// Gets the n-gram order.
    #[inline(always)]
    pub const fn order(&self) -> usize {
        self.order
    }

    /// Gets the reserved symbols.
    #[inline(always)]
    pub const fn symbols(&self) -> LmSymbols {
        self.symbols
    }

    fn ngram_state<'a>(&self, state: &'a DpState) -> &'a NgramState {
        match state.as_ngram() {
            Some(state) => state,
            None => panic!("{}: not an n-gram state", self.base.name()),
        }
    }

    /// Scores the n-grams completed by a rule with `target` applied to `tails`.
    ///
    /// Terminals and the left contexts of the tails are pushed through a window of at most
    /// `order` words; a full window is scored and shifted. A backoff marker in a left context
    /// adds its backoff weight instead of an n-gram score. After a tail's left context, the
    /// window's trailing words are replaced by the tail's right context without scoring: those
    /// n-grams were scored inside the tail or are still incomplete.
    ///
    /// # Panics
    ///
    /// Panics if a referenced tail has no n-gram state in this feature's slot.
    pub fn compute_transition(&self, target: &[WordId], tails: &[&HgNode]) -> f64 {
        let mut ngram = Vec::with_capacity(self.order + 1);
        let mut log_p = 0.0;
        for &id in target {
            if let Some(index) = vocab::nonterminal_index(id) {
                let (left, right) = self.state_computer.tail_state(tails, index).contexts();
                for (i, &t) in left.iter().enumerate() {
                    ngram.push(t);
                    if t == self.symbols.backoff_left {
                        let n_additional = ngram.len().saturating_sub(i + 1);
                        log_p +=
                            self.lm
                                .log_prob_of_backoff_state(&ngram, ngram.len(), n_additional);
                        if ngram.len() == self.order {
                            ngram.remove(0);
                        }
                    } else if ngram.len() == self.order {
                        log_p += self.lm.ngram_log_probability(&ngram, self.order);
                        ngram.remove(0);
                    }
                }
                replace_suffix(&mut ngram, right);
            } else {
                ngram.push(id);
                if ngram.len() == self.order {
                    log_p += self.lm.ngram_log_probability(&ngram, self.order);
                    ngram.remove(0);
                }
            }
        }
        log_p
    }

    /// Scores what the transitions of a complete derivation deferred to the sentence boundary.
    ///
    /// Every partial n-gram of the left context is scored against `<s>`, and the right context
    /// is closed with `</s>`.
    pub fn compute_final_transition_log_p(&self, state: &NgramState) -> f64 {
        let (left, right) = state.contexts();
        let mut ngram = Vec::with_capacity(self.order + 1);
        let mut log_p = 0.0;

        ngram.push(self.symbols.start);
        for (i, &t) in left.iter().enumerate() {
            ngram.push(t);
            if t == self.symbols.backoff_left {
                let n_additional = ngram.len().saturating_sub(i + 1);
                log_p += self
                    .lm
                    .log_prob_of_backoff_state(&ngram, ngram.len(), n_additional);
            } else if ngram.len() >= 2 {
                log_p += self.lm.ngram_log_probability(&ngram, ngram.len());
            }
            if ngram.len() == self.order {
                ngram.remove(0);
            }
        }

        replace_suffix(&mut ngram, right);
        ngram.push(self.symbols.stop);
        log_p += self.lm.ngram_log_probability(&ngram, ngram.len());
        log_p
    }

    /// Estimates the score of a rule from its target side alone.
    ///
    /// Each run of terminals between nonterminals is scored as a chunk, partial n-grams
    /// included, since a tail will later supply their history. A leading `<s>` is not scored.
    pub fn estimate_rule_log_prob(&self, target: &[WordId]) -> f64 {
        let mut estimate = 0.0;
        let mut words = vec![];
        let mut skip_start = target.first() == Some(&self.symbols.start);
        for &id in target {
            if vocab::is_nonterminal(id) {
                estimate += self.score_chunk_log_p(&words, true, skip_start);
                words.clear();
                skip_start = false;
            } else {
                words.push(id);
            }
        }
        estimate += self.score_chunk_log_p(&words, true, skip_start);
        estimate
    }

    /// Estimates the score still owed by a derivation summarized by `state`.
    ///
    /// # Arguments
    ///
    /// * `add_start` - Prefixes the left context with `<s>`.
    /// * `add_end` - Also scores the right context closed with `</s>`, for derivations known to
    ///   end the sentence.
    pub fn estimate_state_log_prob(&self, state: &NgramState, add_start: bool, add_end: bool) -> f64 {
        let mut log_p = 0.0;

        let mut words = Vec::with_capacity(state.len() + 1);
        if add_start {
            words.push(self.symbols.start);
        }
        words.extend_from_slice(state.left());
        if let Some(&first) = words.first() {
            log_p += self.score_chunk_log_p(&words, true, first == self.symbols.start);
        }

        if add_end {
            let mut words = Vec::with_capacity(state.len() + 1);
            words.extend_from_slice(state.right());
            words.push(self.symbols.stop);
            log_p += self.score_chunk_log_p(&words, false, false);
        }
        log_p
    }

    /// Unweighted future-cost estimate of a state inside the sentence.
    #[inline(always)]
    pub fn estimate_future_log_p(&self, _rule: &Rule, state: &NgramState, _sentence_id: usize) -> f64 {
        self.estimate_state_log_prob(state, false, false)
    }

    /// Scores a chunk of words.
    ///
    /// Without `consider_incomplete`, only complete n-grams are scored. Otherwise every growing
    /// prefix is scored as well, starting from the bigram when `skip_start` is set and from the
    /// unigram when not. An empty chunk scores 0.
    pub fn score_chunk_log_p(&self, words: &[WordId], consider_incomplete: bool, skip_start: bool) -> f64 {
        if words.is_empty() {
            return 0.0;
        }
        let start_index = if !consider_incomplete {
            self.order
        } else if skip_start {
            2
        } else {
            1
        };
        self.lm
            .sentence_log_probability(words, self.order, start_index)
    }
}

/// Overwrites the trailing words of the window with `context`.
#[inline(always)]
fn replace_suffix(ngram: &mut [WordId], context: &[WordId]) {
    let k = context.len().min(ngram.len());
    let n = ngram.len();
    ngram[n - k..].copy_from_slice(&context[context.len() - k..]);
}

impl<M> StatefulFeature for LanguageModelFF<M>
where
    M: NgramLanguageModel + ?Sized + 'static,
{
    fn base(&self) -> &StatefulBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StatefulBase {
        &mut self.base
    }

    fn state_id(&self) -> StateId {
        self.state_computer.state_id()
    }

    fn set_state_id(&mut self, id: StateId) {
        self.state_computer.set_state_id(id);
    }

    fn compute_state(
        &self,
        rule: &Rule,
        tails: &[&HgNode],
        _i: usize,
        _j: usize,
        _source_path: &SourcePath,
        _sentence_id: usize,
    ) -> DpState {
        self.state_computer
            .compute_state(rule.target(), tails)
            .into()
    }

    fn compute_cost(
        &self,
        rule: &Rule,
        tails: &[&HgNode],
        _i: usize,
        _j: usize,
        _source_path: &SourcePath,
        _sentence_id: usize,
    ) -> f64 {
        self.weight() * self.compute_transition(rule.target(), tails)
    }

    fn compute_features(
        &self,
        rule: Option<&Rule>,
        tails: &[&HgNode],
        _i: usize,
        _j: usize,
        _source_path: &SourcePath,
        _sentence_id: usize,
    ) -> FeatureVector {
        rule.map_or_else(FeatureVector::new, |rule| {
            FeatureVector::with_value(self.name(), self.compute_transition(rule.target(), tails))
        })
    }

    fn final_transition(&self, state: &DpState) -> f64 {
        self.compute_final_transition_log_p(self.ngram_state(state))
    }

    fn compute_final_cost(
        &self,
        tail: &HgNode,
        _i: usize,
        _j: usize,
        _source_path: &SourcePath,
        _sentence_id: usize,
    ) -> f64 {
        let state = self.state_computer.tail_state(&[tail], 0);
        self.weight() * self.compute_final_transition_log_p(state)
    }

    fn compute_final_features(
        &self,
        tail: &HgNode,
        _i: usize,
        _j: usize,
        _source_path: &SourcePath,
        _sentence_id: usize,
    ) -> FeatureVector {
        let state = self.state_computer.tail_state(&[tail], 0);
        FeatureVector::with_value(self.name(), self.compute_final_transition_log_p(state))
    }

    fn estimate_cost(&self, rule: &Rule, _sentence_id: usize) -> f64 {
        self.weight() * self.estimate_rule_log_prob(rule.target())
    }

    fn estimate_future_cost(&self, rule: &Rule, state: &DpState, sentence_id: usize) -> f64 {
        self.weight() * self.estimate_future_log_p(rule, self.ngram_state(state), sentence_id)
    }
}
