//! The feature-function contract.
//!
//! A feature function is either *stateless*, when its value depends only on the rule being
//! applied, or *stateful*, when it also depends on DP states carried by the tail nodes. Stateless
//! features never see a state: their own methods take none. The uniform [`FeatureFunction`]
//! dispatch accepts an optional state for both kinds and rejects one given to a stateless feature.

use crate::errors::{HgscoreError, Result};
use crate::hypergraph::{HgNode, SourcePath};
use crate::rule::Rule;
use crate::state::{DpState, StateId};
use crate::vector::FeatureVector;
use crate::weights::Weights;

/// A scoring unit whose value depends only on the rule.
pub trait StatelessFeature: Send + Sync {
    /// Gets the feature name used as key in weights and feature vectors.
    fn name(&self) -> &str;

    /// Computes the unweighted value of the feature for `rule`.
    fn estimate(&self, rule: &Rule) -> f64;
}

/// Configured stateless feature: the scorer plus its weight and feature ID.
pub struct StatelessFF {
    weight: f64,
    feature_id: usize,
    feature: Box<dyn StatelessFeature>,
}

impl StatelessFF {
    /// Creates a new stateless feature, taking its weight from `weights`.
    ///
    /// A missing weight defaults to 0 with a warning.
    pub fn new<F>(feature: F, weights: &Weights) -> Self
    where
        F: StatelessFeature + 'static,
    {
        Self {
            weight: weights.get_or_warn(feature.name()),
            feature_id: 0,
            feature: Box::new(feature),
        }
    }

    /// Always `false`.
    #[inline(always)]
    pub const fn is_stateful(&self) -> bool {
        false
    }

    /// Gets the feature name.
    #[inline(always)]
    pub fn name(&self) -> &str {
        self.feature.name()
    }

    /// Gets the weight.
    #[inline(always)]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    /// Sets the weight.
    #[inline(always)]
    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    /// Gets the feature ID.
    #[inline(always)]
    pub const fn feature_id(&self) -> usize {
        self.feature_id
    }

    /// Sets the feature ID.
    #[inline(always)]
    pub fn set_feature_id(&mut self, id: usize) {
        self.feature_id = id;
    }

    /// Always [`None`]; stateless features own no state slot.
    #[inline(always)]
    pub const fn state_id(&self) -> Option<StateId> {
        None
    }

    /// Computes the unweighted value for `rule`.
    #[inline(always)]
    pub fn estimate(&self, rule: &Rule) -> f64 {
        self.feature.estimate(rule)
    }

    /// Computes the unweighted transition value, which equals [`Self::estimate`].
    #[inline(always)]
    pub fn transition(&self, rule: &Rule) -> f64 {
        self.estimate(rule)
    }

    /// Always 0: the rule cost is already final.
    #[inline(always)]
    pub fn estimate_future_cost(&self, _rule: &Rule) -> f64 {
        0.0
    }

    /// Always 0: nothing is left to score at the sentence boundary.
    #[inline(always)]
    pub fn final_transition(&self) -> f64 {
        0.0
    }

    /// Computes the weighted cost of applying `rule`.
    #[inline(always)]
    pub fn cost(&self, rule: &Rule) -> f64 {
        self.weight * self.transition(rule)
    }

    /// Computes the unweighted feature vector of applying `rule`.
    pub fn features(&self, rule: Option<&Rule>) -> FeatureVector {
        rule.map_or_else(FeatureVector::new, |rule| {
            FeatureVector::with_value(self.name(), self.transition(rule))
        })
    }
}

/// Name, weight, and slot bookkeeping shared by stateful features.
#[derive(Clone, Debug)]
pub struct StatefulBase {
    name: String,
    weight: f64,
    feature_id: usize,
    state_id: StateId,
}

impl StatefulBase {
    /// Creates the bookkeeping of a feature called `name`, taking its weight from `weights`.
    ///
    /// A missing weight defaults to 0 with a warning. The state slot starts at 0 and is
    /// reassigned when the feature is registered in a [`Scorer`](crate::Scorer).
    pub fn new(name: &str, weights: &Weights) -> Self {
        Self {
            name: name.to_string(),
            weight: weights.get_or_warn(name),
            feature_id: 0,
            state_id: StateId::new(0),
        }
    }

    /// Gets the feature name.
    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A scoring unit whose value depends on the DP states of the tail nodes.
///
/// Implementations are shared by every search thread, so every method takes `&self` and must
/// leave the tail nodes untouched. Only the configuration methods take `&mut self`.
pub trait StatefulFeature: Send + Sync {
    /// Gets the shared bookkeeping.
    fn base(&self) -> &StatefulBase;

    /// Gets the shared bookkeeping mutably.
    fn base_mut(&mut self) -> &mut StatefulBase;

    /// Gets the feature name.
    fn name(&self) -> &str {
        &self.base().name
    }

    /// Gets the weight.
    fn weight(&self) -> f64 {
        self.base().weight
    }

    /// Sets the weight.
    fn set_weight(&mut self, weight: f64) {
        self.base_mut().weight = weight;
    }

    /// Gets the feature ID.
    fn feature_id(&self) -> usize {
        self.base().feature_id
    }

    /// Sets the feature ID.
    fn set_feature_id(&mut self, id: usize) {
        self.base_mut().feature_id = id;
    }

    /// Gets the slot under which this feature stores its state on nodes.
    fn state_id(&self) -> StateId {
        self.base().state_id
    }

    /// Sets the state slot.
    fn set_state_id(&mut self, id: StateId) {
        self.base_mut().state_id = id;
    }

    /// Computes the state to attach to the node built by applying `rule` to `tails`.
    fn compute_state(
        &self,
        rule: &Rule,
        tails: &[&HgNode],
        i: usize,
        j: usize,
        source_path: &SourcePath,
        sentence_id: usize,
    ) -> DpState;

    /// Computes the weighted incremental cost of applying `rule` to `tails`.
    fn compute_cost(
        &self,
        rule: &Rule,
        tails: &[&HgNode],
        i: usize,
        j: usize,
        source_path: &SourcePath,
        sentence_id: usize,
    ) -> f64;

    /// Computes the unweighted counterpart of [`Self::compute_cost`].
    ///
    /// Returns an empty vector when there is no rule.
    fn compute_features(
        &self,
        rule: Option<&Rule>,
        tails: &[&HgNode],
        i: usize,
        j: usize,
        source_path: &SourcePath,
        sentence_id: usize,
    ) -> FeatureVector;

    /// Computes the unweighted sentence-boundary value from a state.
    fn final_transition(&self, state: &DpState) -> f64;

    /// Computes the weighted sentence-boundary cost of the top node.
    fn compute_final_cost(
        &self,
        tail: &HgNode,
        i: usize,
        j: usize,
        source_path: &SourcePath,
        sentence_id: usize,
    ) -> f64;

    /// Computes the unweighted counterpart of [`Self::compute_final_cost`].
    fn compute_final_features(
        &self,
        tail: &HgNode,
        i: usize,
        j: usize,
        source_path: &SourcePath,
        sentence_id: usize,
    ) -> FeatureVector;

    /// Estimates the weighted cost of `rule` before any tail state is known.
    fn estimate_cost(&self, rule: &Rule, sentence_id: usize) -> f64;

    /// Estimates the weighted future cost of a derivation summarized by `state`.
    fn estimate_future_cost(&self, rule: &Rule, state: &DpState, sentence_id: usize) -> f64;
}

/// Uniform handle over both kinds of feature functions.
pub enum FeatureFunction {
    /// A stateless feature.
    Stateless(StatelessFF),

    /// A stateful feature.
    Stateful(Box<dyn StatefulFeature>),
}

impl FeatureFunction {
    /// Returns `true` for stateful features.
    #[inline(always)]
    pub const fn is_stateful(&self) -> bool {
        matches!(self, Self::Stateful(_))
    }

    /// Gets the feature name.
    pub fn name(&self) -> &str {
        match self {
            Self::Stateless(ff) => ff.name(),
            Self::Stateful(ff) => ff.name(),
        }
    }

    /// Gets the weight.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Stateless(ff) => ff.weight(),
            Self::Stateful(ff) => ff.weight(),
        }
    }

    /// Sets the weight.
    pub fn set_weight(&mut self, weight: f64) {
        match self {
            Self::Stateless(ff) => ff.set_weight(weight),
            Self::Stateful(ff) => ff.set_weight(weight),
        }
    }

    /// Gets the feature ID.
    pub fn feature_id(&self) -> usize {
        match self {
            Self::Stateless(ff) => ff.feature_id(),
            Self::Stateful(ff) => ff.feature_id(),
        }
    }

    /// Sets the feature ID.
    pub fn set_feature_id(&mut self, id: usize) {
        match self {
            Self::Stateless(ff) => ff.set_feature_id(id),
            Self::Stateful(ff) => ff.set_feature_id(id),
        }
    }

    /// Gets the state slot, or [`None`] for stateless features.
    pub fn state_id(&self) -> Option<StateId> {
        match self {
            Self::Stateless(ff) => ff.state_id(),
            Self::Stateful(ff) => Some(ff.state_id()),
        }
    }

    /// Computes the unweighted transition value of a stateless feature.
    ///
    /// # Errors
    ///
    /// [`HgscoreError`] is returned when a state is given to a stateless feature, or when the
    /// feature is stateful, since stateful transitions need the tail nodes
    /// (see [`Self::compute_cost`]).
    pub fn transition(&self, rule: &Rule, state: Option<&DpState>) -> Result<f64> {
        match (self, state) {
            (Self::Stateless(ff), None) => Ok(ff.transition(rule)),
            (Self::Stateless(_), Some(_)) => Err(HgscoreError::invalid_argument(
                "transition: state given to a stateless feature",
            )),
            (Self::Stateful(_), _) => Err(HgscoreError::invalid_argument(
                "transition: stateful features transition over tail nodes",
            )),
        }
    }

    /// Estimates the weighted future cost.
    ///
    /// # Errors
    ///
    /// [`HgscoreError`] is returned when a state is given to a stateless feature, or none to a
    /// stateful one.
    pub fn estimate_future_cost(
        &self,
        rule: &Rule,
        state: Option<&DpState>,
        sentence_id: usize,
    ) -> Result<f64> {
        match (self, state) {
            (Self::Stateless(ff), None) => Ok(ff.estimate_future_cost(rule)),
            (Self::Stateless(_), Some(_)) => Err(HgscoreError::invalid_argument(
                "estimate_future_cost: state given to a stateless feature",
            )),
            (Self::Stateful(ff), Some(state)) => {
                Ok(ff.estimate_future_cost(rule, state, sentence_id))
            }
            (Self::Stateful(_), None) => Err(HgscoreError::invalid_argument(
                "estimate_future_cost: stateful feature needs a state",
            )),
        }
    }

    /// Computes the unweighted sentence-boundary value.
    ///
    /// # Errors
    ///
    /// [`HgscoreError`] is returned when a state is given to a stateless feature, or none to a
    /// stateful one.
    pub fn final_transition(&self, state: Option<&DpState>) -> Result<f64> {
        match (self, state) {
            (Self::Stateless(ff), None) => Ok(ff.final_transition()),
            (Self::Stateless(_), Some(_)) => Err(HgscoreError::invalid_argument(
                "final_transition: state given to a stateless feature",
            )),
            (Self::Stateful(ff), Some(state)) => Ok(ff.final_transition(state)),
            (Self::Stateful(_), None) => Err(HgscoreError::invalid_argument(
                "final_transition: stateful feature needs a state",
            )),
        }
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
        match self {
            Self::Stateless(ff) => ff.cost(rule),
            Self::Stateful(ff) => ff.compute_cost(rule, tails, i, j, source_path, sentence_id),
        }
    }

    /// Computes the unweighted counterpart of [`Self::compute_cost`].
    pub fn compute_features(
        &self,
        rule: Option<&Rule>,
        tails: &[&HgNode],
        i: usize,
        j: usize,
        source_path: &SourcePath,
        sentence_id: usize,
    ) -> FeatureVector {
        match self {
            Self::Stateless(ff) => ff.features(rule),
            Self::Stateful(ff) => {
                ff.compute_features(rule, tails, i, j, source_path, sentence_id)
            }
        }
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
        match self {
            Self::Stateless(ff) => ff.weight() * ff.final_transition(),
            Self::Stateful(ff) => ff.compute_final_cost(tail, i, j, source_path, sentence_id),
        }
    }

    /// Computes the unweighted counterpart of [`Self::compute_final_cost`].
    ///
    /// Stateless features report nothing.
    pub fn compute_final_features(
        &self,
        tail: &HgNode,
        i: usize,
        j: usize,
        source_path: &SourcePath,
        sentence_id: usize,
    ) -> FeatureVector {
        match self {
            Self::Stateless(_) => FeatureVector::new(),
            Self::Stateful(ff) => {
                ff.compute_final_features(tail, i, j, source_path, sentence_id)
            }
        }
    }

    /// Estimates the weighted cost of `rule` before any tail state is known.
    pub fn estimate_cost(&self, rule: &Rule, sentence_id: usize) -> f64 {
        match self {
            Self::Stateless(ff) => ff.cost(rule),
            Self::Stateful(ff) => ff.estimate_cost(rule, sentence_id),
        }
    }
}

impl From<StatelessFF> for FeatureFunction {
    fn from(ff: StatelessFF) -> Self {
        Self::Stateless(ff)
    }
}

impl<F> From<Box<F>> for FeatureFunction
where
    F: StatefulFeature + 'static,
{
    fn from(ff: Box<F>) -> Self {
        Self::Stateful(ff)
    }
}
