//! # hgscore
//!
//! Feature-function scoring core for hypergraph (SCFG) translation decoders.
//!
//! Feature functions are either stateless, depending only on the rule, or stateful, carrying a
//! DP state on every hypergraph node. The n-gram [`LanguageModelFF`] keeps the boundary words
//! of each derivation in an [`NgramState`], so that every rule application scores only the
//! n-grams it completes and the sentence boundary is scored once at the top node.
//!
//! ## Examples
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//!
//! use hgscore::{
//!     BackoffModel, LanguageModelFF, LmSymbols, Rule, Scorer, SourcePath, StatelessFF,
//!     Vocabulary, Weights, WordPenalty,
//! };
//!
//! let mut vocab = Vocabulary::new();
//! let symbols = LmSymbols::register(&mut vocab);
//!
//! // A bigram model
//! let mut lm = BackoffModel::new(2)?;
//! for (ngram, log_prob) in [("<s> hello", -0.2), ("hello world", -0.3), ("world </s>", -0.1)] {
//!     lm.insert(&vocab.phrase(ngram)?, log_prob, 0.0)?;
//! }
//!
//! let weights = Weights::read("lm 1.0\nWordPenalty -0.5\n".as_bytes())?;
//! let mut scorer = Scorer::new(&weights);
//! scorer.push(Box::new(LanguageModelFF::new("lm", Arc::new(lm), symbols, &weights)));
//! scorer.push(StatelessFF::new(WordPenalty::new(), &weights));
//!
//! // [X] -> hello
//! let lhs = vocab.id("[X]");
//! let path = SourcePath::new();
//! let r0 = Rule::from_target(lhs, &vocab.phrase("hello")?);
//! let n0 = scorer.build_node(&r0, &[], 0, 1, &path, 0);
//!
//! // [X] -> [X,1] world
//! let r1 = Rule::from_target(lhs, &vocab.phrase("[X,1] world")?);
//! let n1 = scorer.build_node(&r1, &[&n0], 0, 2, &path, 0);
//!
//! let mut features = scorer.compute_features(Some(&r0), &[], 0, 1, &path, 0);
//! features.add(&scorer.compute_features(Some(&r1), &[&n0], 0, 2, &path, 0));
//! features.add(&scorer.compute_final_features(&n1, 0, 2, &path, 0));
//!
//! // log P(hello | <s>) + log P(world | hello) + log P(</s> | world)
//! assert!((features.get("lm") + 0.6).abs() < 1e-9);
//! # Ok(())
//! # }
//! ```
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod errors;
pub mod lm;
pub mod vocab;

mod ff;
mod hypergraph;
mod rule;
mod scorer;
mod state;
mod stateless;
mod vector;
mod weights;

#[cfg(feature = "train")]
mod math;
#[cfg(feature = "train")]
mod model;
#[cfg(feature = "train")]
mod predictor;
#[cfg(feature = "train")]
mod trainer;

#[cfg(test)]
mod test_utils;

pub use errors::HgscoreError;
pub use ff::{FeatureFunction, StatefulBase, StatefulFeature, StatelessFF, StatelessFeature};
pub use hypergraph::{HgNode, SourcePath};
pub use lm::{BackoffModel, LanguageModelFF, LmSymbols, NgramLanguageModel, NgramStateComputer};
pub use rule::Rule;
pub use scorer::Scorer;
pub use state::{DpState, NgramState, StateId};
pub use stateless::{PhraseModel, WordPenalty};
pub use vector::FeatureVector;
pub use vocab::{Vocabulary, WordId};
pub use weights::Weights;

#[cfg(feature = "train")]
pub use model::{Classification, MaxEntModel};
#[cfg(feature = "train")]
pub use predictor::{parse_features, read_examples, MaxEntPredictor};
#[cfg(feature = "train")]
pub use trainer::{Dataset, Regularization, Trainer};

/// A specialized Result type.
pub type Result<T, E = HgscoreError> = core::result::Result<T, E>;
