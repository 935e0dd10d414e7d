use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};
use hashbrown::HashMap;

use crate::errors::{HgscoreError, Result};
use crate::math;

/// Result of classifying one instance.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    outcome: String,
    labeling: Vec<(String, f64)>,
}

impl Classification {
    /// Gets the outcome given with the instance.
    #[inline(always)]
    pub fn outcome(&self) -> &str {
        &self.outcome
    }

    /// Gets all labels with their probabilities, most probable first.
    #[inline(always)]
    pub fn labeling(&self) -> &[(String, f64)] {
        &self.labeling
    }

    /// Gets the most probable label.
    #[inline(always)]
    pub fn best_label(&self) -> &str {
        &self.labeling[0].0
    }

    /// Gets the probability of the most probable label.
    #[inline(always)]
    pub fn best_value(&self) -> f64 {
        self.labeling[0].1
    }

    /// Gets the probability of `label`, or [`None`] if the model does not know it.
    pub fn value(&self, label: &str) -> Option<f64> {
        self.labeling
            .iter()
            .find_map(|(l, p)| (l == label).then_some(*p))
    }

    /// Returns `true` if the best label equals the outcome given with the instance.
    #[inline(always)]
    pub fn best_label_is_correct(&self) -> bool {
        self.best_label() == self.outcome
    }
}

/// Represents a trained maximum-entropy classifier.
///
/// Each label owns one weight per known feature plus a bias; the weights of label `k` occupy
/// `weights[k * (n_features + 1)..(k + 1) * (n_features + 1)]` with the bias last.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[derive(Clone, Debug, PartialEq)]
pub struct MaxEntModel {
    labels: Vec<String>,
    features: HashMap<String, usize>,
    weights: Vec<f64>,
}

impl MaxEntModel {
    /// Creates a model.
    ///
    /// # Errors
    ///
    /// [`HgscoreError`] is returned when
    ///
    /// - `labels` is empty,
    /// - the feature indices are not exactly `0..features.len()`, or
    /// - the number of weights does not match.
    pub fn new(
        labels: Vec<String>,
        features: HashMap<String, usize>,
        weights: Vec<f64>,
    ) -> Result<Self> {
        if labels.is_empty() {
            return Err(HgscoreError::invalid_argument("a model needs at least one label"));
        }
        let mut seen = vec![false; features.len()];
        for &i in features.values() {
            match seen.get_mut(i) {
                Some(s) if !*s => *s = true,
                _ => {
                    return Err(HgscoreError::invalid_argument(
                        "feature indices must be a permutation of 0..n_features",
                    ))
                }
            }
        }
        let n_weights = (features.len() + 1)
            .checked_mul(labels.len())
            .ok_or_else(|| HgscoreError::model_scale("too many weights"))?;
        if weights.len() != n_weights {
            return Err(HgscoreError::invalid_argument(format!(
                "expected {n_weights} weights, got {}",
                weights.len()
            )));
        }
        Ok(Self {
            labels,
            features,
            weights,
        })
    }

    /// Gets the labels.
    #[inline(always)]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Gets the number of labels.
    #[inline(always)]
    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    /// Gets the number of known features.
    #[inline(always)]
    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    /// Gets the weight vector.
    #[inline(always)]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Computes the unnormalized log-potential of every label. Unknown features are ignored.
    pub fn potentials<'a, I>(&self, features: I) -> Vec<f64>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let stride = self.features.len() + 1;
        let mut scores: Vec<f64> = (0..self.labels.len())
            .map(|k| self.weights[k * stride + stride - 1])
            .collect();
        for (name, value) in features {
            if let Some(&f) = self.features.get(name) {
                for (k, s) in scores.iter_mut().enumerate() {
                    *s += self.weights[k * stride + f] * value;
                }
            }
        }
        scores
    }

    /// Classifies an instance, reporting `outcome` alongside the labeling.
    pub fn classify<'a, I>(&self, outcome: &str, features: I) -> Classification
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut probs = self.potentials(features);
        math::softmax(&mut probs);
        let mut labeling: Vec<_> = self.labels.iter().cloned().zip(probs).collect();
        labeling.sort_by(|a, b| b.1.total_cmp(&a.1));
        Classification {
            outcome: outcome.to_string(),
            labeling,
        }
    }

    fn sorted_features(&self) -> Vec<&str> {
        let mut names = vec![""; self.features.len()];
        for (name, &i) in &self.features {
            names[i] = name;
        }
        names
    }
}

impl<Context> Decode<Context> for MaxEntModel {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let labels: Vec<String> = Decode::decode(decoder)?;
        let names: Vec<String> = Decode::decode(decoder)?;
        let weights: Vec<f64> = Decode::decode(decoder)?;
        let features = names.into_iter().enumerate().map(|(i, n)| (n, i)).collect();
        Self::new(labels, features, weights)
            .map_err(|_| DecodeError::Other("inconsistent maxent model"))
    }
}

bincode::impl_borrow_decode!(MaxEntModel);

impl Encode for MaxEntModel {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.labels, encoder)?;
        Encode::encode(&self.sorted_features(), encoder)?;
        Encode::encode(&self.weights, encoder)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils::hashmap;

    fn model() -> MaxEntModel {
        // labels: yes, no; features: a, b
        MaxEntModel::new(
            vec!["yes".into(), "no".into()],
            hashmap!["a".to_string() => 0, "b".to_string() => 1],
            vec![
                2.0, -1.0, 0.0, // yes
                -1.0, 2.0, 0.0, // no
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_potentials() {
        let model = model();
        assert_eq!(vec![2.0, -1.0], model.potentials([("a", 1.0)]));
        assert_eq!(vec![-0.5, 2.5], model.potentials([("a", 0.5), ("b", 1.5)]));
        assert_eq!(vec![0.0, 0.0], model.potentials([("unknown", 1.0)]));
    }

    #[test]
    fn test_classify() {
        let model = model();
        let c = model.classify("no", [("b", 1.0)]);
        assert_eq!("no", c.best_label());
        assert!(c.best_label_is_correct());
        let expected = 1.0 / (1.0 + (-3f64).exp());
        assert!((c.best_value() - expected).abs() < 1e-12);
        assert!((c.value("yes").unwrap() + c.value("no").unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(None, c.value("maybe"));

        let c = model.classify("no", [("a", 1.0)]);
        assert_eq!("yes", c.best_label());
        assert!(!c.best_label_is_correct());
        assert_eq!("no", c.outcome());
    }

    #[test]
    fn test_new_rejects_inconsistent() {
        assert!(MaxEntModel::new(vec![], HashMap::new(), vec![]).is_err());
        assert!(MaxEntModel::new(vec!["x".into()], HashMap::new(), vec![0.0, 0.0]).is_err());
        assert!(MaxEntModel::new(
            vec!["x".into()],
            hashmap!["a".to_string() => 1],
            vec![0.0, 0.0]
        )
        .is_err());
    }

    #[test]
    fn test_bincode() {
        let model = model();
        let config = bincode::config::standard();
        let bytes = bincode::encode_to_vec(&model, config).unwrap();
        let (decoded, _): (MaxEntModel, _) = bincode::decode_from_slice(&bytes, config).unwrap();
        assert_eq!(model, decoded);
    }
}
