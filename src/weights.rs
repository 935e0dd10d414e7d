use std::io::BufRead;

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};
use log::warn;

use crate::errors::{HgscoreError, Result};
use crate::vector::FeatureVector;

/// Versioned weight configuration of a decoding run.
///
/// Feature functions copy their weight out of this structure when they are configured or
/// reweighted. Tuning produces a new version between runs; nothing mutates it during decoding.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Weights {
    values: FeatureVector,
    version: u64,
}

impl Weights {
    /// Creates an empty configuration at version 0.
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration from a vector at version 0.
    #[inline(always)]
    pub fn from_vector(values: FeatureVector) -> Self {
        Self { values, version: 0 }
    }

    /// Reads `name value` lines.
    ///
    /// Empty lines and lines starting with `#` are skipped. A later line for the same name
    /// overrides an earlier one.
    ///
    /// # Errors
    ///
    /// [`HgscoreError`] is returned when a line does not hold exactly a name and a number, or
    /// when reading fails.
    pub fn read<R>(rdr: R) -> Result<Self>
    where
        R: BufRead,
    {
        let mut values = FeatureVector::new();
        for (i, line) in rdr.lines().enumerate() {
            let line = line.map_err(|e| HgscoreError::invalid_format(i + 1, e.to_string()))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut cols = line.split_whitespace();
            let (Some(name), Some(value), None) = (cols.next(), cols.next(), cols.next()) else {
                return Err(HgscoreError::invalid_format(
                    i + 1,
                    "expected `name value`",
                ));
            };
            let value: f64 = value
                .parse()
                .map_err(|_| HgscoreError::invalid_format(i + 1, format!("bad weight: {value}")))?;
            values.set(name, value);
        }
        Ok(Self::from_vector(values))
    }

    /// Gets the version.
    #[inline(always)]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Gets the weight of a feature, or [`None`] if it is not configured.
    #[inline(always)]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get_checked(name)
    }

    /// Gets the weight of a feature, defaulting to 0 with a warning if it is not configured.
    ///
    /// The feature stays active but contributes nothing.
    pub fn get_or_warn(&self, name: &str) -> f64 {
        if let Some(w) = self.get(name) {
            w
        } else {
            warn!("no weight found for feature '{name}'; using 0");
            0.0
        }
    }

    /// Returns a copy with `name` set to `value` and the version advanced.
    #[must_use]
    pub fn with_weight(&self, name: &str, value: f64) -> Self {
        let mut values = self.values.clone();
        values.set(name, value);
        Self {
            values,
            version: self.version + 1,
        }
    }

    /// Gets the underlying vector.
    #[inline(always)]
    pub const fn as_vector(&self) -> &FeatureVector {
        &self.values
    }

    /// Serializes the configuration.
    ///
    /// # Errors
    ///
    /// [`HgscoreError`] is returned when encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| HgscoreError::invalid_format(0, e.to_string()))
    }

    /// Deserializes a configuration produced by [`Weights::to_bytes`].
    ///
    /// # Errors
    ///
    /// [`HgscoreError`] is returned when the bytes are not a valid configuration.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (weights, _) = bincode::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| HgscoreError::invalid_format(0, e.to_string()))?;
        Ok(weights)
    }
}

impl<Context> Decode<Context> for Weights {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let values = Decode::decode(decoder)?;
        let version = Decode::decode(decoder)?;
        Ok(Self { values, version })
    }
}

bincode::impl_borrow_decode!(Weights);

impl Encode for Weights {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.values, encoder)?;
        Encode::encode(&self.version, encoder)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read() {
        let text = "# weights\nlm 1.0\n\nwp -2.5\ntm_0 0.3\nlm 0.5\n";
        let weights = Weights::read(text.as_bytes()).unwrap();
        assert_eq!(Some(0.5), weights.get("lm"));
        assert_eq!(Some(-2.5), weights.get("wp"));
        assert_eq!(None, weights.get("missing"));
        assert_eq!(0, weights.version());
    }

    #[test]
    fn test_read_malformed() {
        assert!(Weights::read("lm\n".as_bytes()).is_err());
        assert!(Weights::read("lm 1.0 2.0\n".as_bytes()).is_err());
        assert!(Weights::read("lm one\n".as_bytes()).is_err());
    }

    #[test]
    fn test_missing_weight_defaults_to_zero() {
        let weights = Weights::read("lm 1.0\n".as_bytes()).unwrap();
        assert_eq!(0.0, weights.get_or_warn("wp"));
        assert_eq!(1.0, weights.get_or_warn("lm"));
    }

    #[test]
    fn test_with_weight_advances_version() {
        let weights = Weights::new().with_weight("lm", 1.0).with_weight("wp", -1.0);
        assert_eq!(2, weights.version());
        assert_eq!(Some(-1.0), weights.get("wp"));
    }

    #[test]
    fn test_bytes() {
        let weights = Weights::new().with_weight("lm", 0.75);
        let decoded = Weights::from_bytes(&weights.to_bytes().unwrap()).unwrap();
        assert_eq!(weights, decoded);
    }
}
