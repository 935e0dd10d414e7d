use std::fmt;

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};
use hashbrown::HashMap;

/// Sparse map from feature names to values.
///
/// Scoring calls report the *unweighted* contributions of each feature in a fresh vector; the
/// same type holds the weights of a configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureVector {
    values: HashMap<String, f64>,
}

impl FeatureVector {
    /// Creates an empty vector.
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a vector holding a single feature.
    pub fn with_value<S>(name: S, value: f64) -> Self
    where
        S: Into<String>,
    {
        let mut v = Self::new();
        v.values.insert(name.into(), value);
        v
    }

    /// Gets the value of a feature, or 0 if it is absent.
    #[inline(always)]
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    /// Gets the value of a feature, or [`None`] if it is absent.
    #[inline(always)]
    pub fn get_checked(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Returns `true` if the feature is present.
    #[inline(always)]
    pub fn contains_key(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Overwrites the value of a feature.
    pub fn set<S>(&mut self, name: S, value: f64)
    where
        S: Into<String>,
    {
        self.values.insert(name.into(), value);
    }

    /// Adds `value` to a feature, inserting it if absent.
    pub fn increment(&mut self, name: &str, value: f64) {
        if let Some(v) = self.values.get_mut(name) {
            *v += value;
        } else {
            self.values.insert(name.to_string(), value);
        }
    }

    /// Accumulates every feature of `other` into `self`.
    pub fn add(&mut self, other: &Self) {
        for (name, &value) in &other.values {
            self.increment(name, value);
        }
    }

    /// Computes the inner product with `weights`.
    ///
    /// Features missing from either side contribute nothing.
    pub fn inner_product(&self, weights: &Self) -> f64 {
        let (small, large) = if self.len() <= weights.len() {
            (self, weights)
        } else {
            (weights, self)
        };
        small
            .values
            .iter()
            .filter_map(|(name, &v)| large.values.get(name).map(|&w| v * w))
            .sum()
    }

    /// Returns the number of features.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the vector has no feature.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(name, value)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }

    fn sorted_pairs(&self) -> Vec<(String, f64)> {
        let mut pairs: Vec<(String, f64)> =
            self.values.iter().map(|(k, &v)| (k.clone(), v)).collect();
        pairs.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        pairs
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, (name, value)) in self.sorted_pairs().into_iter().enumerate() {
            if i != 0 {
                write!(f, " ")?;
            }
            write!(f, "{name}={value:.3}")?;
        }
        Ok(())
    }
}

impl FromIterator<(String, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<Context> Decode<Context> for FeatureVector {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let pairs: Vec<(String, f64)> = Decode::decode(decoder)?;
        Ok(pairs.into_iter().collect())
    }
}

bincode::impl_borrow_decode!(FeatureVector);

impl Encode for FeatureVector {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.sorted_pairs(), encoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate() {
        let mut v = FeatureVector::with_value("lm", -1.5);
        v.increment("lm", -0.5);
        v.increment("wp", -0.4);
        let mut other = FeatureVector::with_value("wp", -0.1);
        other.set("tm_0", 2.0);
        v.add(&other);
        assert_eq!(3, v.len());
        assert!((v.get("lm") + 2.0).abs() < 1e-12);
        assert!((v.get("wp") + 0.5).abs() < 1e-12);
        assert!((v.get("tm_0") - 2.0).abs() < 1e-12);
        assert_eq!(0.0, v.get("missing"));
        assert_eq!(None, v.get_checked("missing"));
    }

    #[test]
    fn test_inner_product() {
        let mut features = FeatureVector::with_value("lm", -2.0);
        features.set("wp", -1.0);
        let mut weights = FeatureVector::with_value("lm", 0.5);
        weights.set("tm_0", 3.0);
        assert!((features.inner_product(&weights) + 1.0).abs() < 1e-12);
        assert!((weights.inner_product(&features) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_display_sorted() {
        let mut v = FeatureVector::with_value("wp", 1.0);
        v.set("lm", -0.25);
        assert_eq!("lm=-0.250 wp=1.000", v.to_string());
    }

    #[test]
    fn test_bincode() {
        let mut v = FeatureVector::with_value("lm", 0.5);
        v.set("wp", -1.0);
        let config = bincode::config::standard();
        let bytes = bincode::encode_to_vec(&v, config).unwrap();
        let (decoded, _): (FeatureVector, usize) =
            bincode::decode_from_slice(&bytes, config).unwrap();
        assert_eq!(v, decoded);
    }
}
