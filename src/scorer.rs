//! Aggregation of all feature functions of a decoding run.

use crate::errors::Result;
use crate::ff::FeatureFunction;
use crate::hypergraph::{HgNode, SourcePath};
use crate::rule::Rule;
use crate::state::{DpState, StateId};
use crate::vector::FeatureVector;
use crate::weights::Weights;

/// The feature functions of a decoding run and the weights version they carry.
///
/// Registration assigns each feature its ID and each stateful feature its own state slot.
/// Scoring methods take `&self`, so one scorer can be shared by every search thread; weights
/// change only through [`Scorer::reweight`], between runs.
pub struct Scorer {
    features: Vec<FeatureFunction>,
    num_states: usize,
    weights_version: u64,
}

impl Scorer {
    /// Creates an empty scorer configured from `weights`.
    pub fn new(weights: &Weights) -> Self {
        Self {
            features: vec![],
            num_states: 0,
            weights_version: weights.version(),
        }
    }

    /// Registers a feature function and returns its feature ID.
    pub fn push<F>(&mut self, ff: F) -> usize
    where
        F: Into<FeatureFunction>,
    {
        let mut ff = ff.into();
        let id = self.features.len();
        ff.set_feature_id(id);
        if let FeatureFunction::Stateful(ff) = &mut ff {
            ff.set_state_id(StateId::new(self.num_states));
            self.num_states += 1;
        }
        self.features.push(ff);
        id
    }

    /// Gets the registered feature functions.
    #[inline(always)]
    pub fn features(&self) -> &[FeatureFunction] {
        &self.features
    }

    /// Gets the number of state slots in use.
    #[inline(always)]
    pub const fn num_states(&self) -> usize {
        self.num_states
    }

    /// Gets the version of the weights last applied.
    #[inline(always)]
    pub const fn weights_version(&self) -> u64 {
        self.weights_version
    }

    /// Applies a new weights configuration to every feature.
    ///
    /// Features missing from `weights` get 0 with a warning.
    pub fn reweight(&mut self, weights: &Weights) {
        for ff in &mut self.features {
            let weight = weights.get_or_warn(ff.name());
            ff.set_weight(weight);
        }
        self.weights_version = weights.version();
    }

    /// Computes the weighted incremental cost of applying `rule` to `tails`.
    pub fn compute_cost(
        &self,
        rule: &Rule,
        tails: &[&HgNode],
        i: usize,
        j: usize,
        source_path: &SourcePath,
        sentence_id: usize,
    ) -> f64 {
        self.features
            .iter()
            .map(|ff| ff.compute_cost(rule, tails, i, j, source_path, sentence_id))
            .sum()
    }

    /// Computes the states of every stateful feature for the node built by applying `rule`.
    pub fn compute_states(
        &self,
        rule: &Rule,
        tails: &[&HgNode],
        i: usize,
        j: usize,
        source_path: &SourcePath,
        sentence_id: usize,
    ) -> Vec<(StateId, DpState)> {
        self.features
            .iter()
            .filter_map(|ff| match ff {
                FeatureFunction::Stateful(ff) => Some((
                    ff.state_id(),
                    ff.compute_state(rule, tails, i, j, source_path, sentence_id),
                )),
                FeatureFunction::Stateless(_) => None,
            })
            .collect()
    }

    /// Builds the node resulting from applying `rule` to `tails` over `[i, j)`.
    pub fn build_node(
        &self,
        rule: &Rule,
        tails: &[&HgNode],
        i: usize,
        j: usize,
        source_path: &SourcePath,
        sentence_id: usize,
    ) -> HgNode {
        HgNode::with_states(
            i,
            j,
            rule.lhs(),
            self.compute_states(rule, tails, i, j, source_path, sentence_id),
        )
    }

    /// Computes the unweighted feature values of applying `rule` to `tails`.
    pub fn compute_features(
        &self,
        rule: Option<&Rule>,
        tails: &[&HgNode],
        i: usize,
        j: usize,
        source_path: &SourcePath,
        sentence_id: usize,
    ) -> FeatureVector {
        let mut features = FeatureVector::new();
        for ff in &self.features {
            features.add(&ff.compute_features(rule, tails, i, j, source_path, sentence_id));
        }
        features
    }

    /// Computes the weighted sentence-boundary cost of the top node.
    pub fn compute_final_cost(
        &self,
        tail: &HgNode,
        i: usize,
        j: usize,
        source_path: &SourcePath,
        sentence_id: usize,
    ) -> f64 {
        self.features
            .iter()
            .map(|ff| ff.compute_final_cost(tail, i, j, source_path, sentence_id))
            .sum()
    }

    /// Computes the unweighted sentence-boundary feature values of the top node.
    pub fn compute_final_features(
        &self,
        tail: &HgNode,
        i: usize,
        j: usize,
        source_path: &SourcePath,
        sentence_id: usize,
    ) -> FeatureVector {
        let mut features = FeatureVector::new();
        for ff in &self.features {
            features.add(&ff.compute_final_features(tail, i, j, source_path, sentence_id));
        }
        features
    }

    /// Estimates the weighted cost of `rule` before any tail is known.
    pub fn estimate_cost(&self, rule: &Rule, sentence_id: usize) -> f64 {
        self.features
            .iter()
            .map(|ff| ff.estimate_cost(rule, sentence_id))
            .sum()
    }

    /// Estimates the weighted future cost of `node`, built by `rule`.
    ///
    /// # Errors
    ///
    /// [`HgscoreError`](crate::HgscoreError) is returned when the node lacks the state of a
    /// stateful feature.
    pub fn estimate_future_cost(&self, rule: &Rule, node: &HgNode, sentence_id: usize) -> Result<f64> {
        let mut cost = 0.0;
        for ff in &self.features {
            let state = ff.state_id().and_then(|id| node.dp_state(id));
            cost += ff.estimate_future_cost(rule, state, sentence_id)?;
        }
        Ok(cost)
    }
}
