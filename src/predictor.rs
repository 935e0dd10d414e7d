//! Lazily trained per-word classifier.

use std::sync::OnceLock;

use log::info;

use crate::errors::{HgscoreError, Result};
use crate::model::{Classification, MaxEntModel};
use crate::trainer::{Dataset, Trainer};

/// Parses whitespace-separated `name[:value]` features; a bare name has value 1.
///
/// # Errors
///
/// [`HgscoreError`] is returned when a value is not a number. The error reports `line`.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
pub fn parse_features(text: &str, line: usize) -> Result<Vec<(&str, f64)>> {
    text.split_whitespace()
        .map(|token| match token.rsplit_once(':') {
            Some((name, value)) if !name.is_empty() => value
                .parse()
                .map(|value| (name, value))
                .map_err(|_| HgscoreError::invalid_format(line, format!("bad feature: {token}"))),
            _ => Ok((token, 1.0)),
        })
        .collect()
}

/// Reads training lines of the form `<name> <label> <feature>[:<value>] ...`.
///
/// The first column names the instance and is not used for training. Blank lines are skipped.
///
/// # Errors
///
/// [`HgscoreError`] is returned when a line has no label or a feature value is malformed.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
pub fn read_examples(examples: &str) -> Result<Dataset> {
    let mut dataset = Dataset::new();
    for (i, line) in examples.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((_name, rest)) = line.split_once(char::is_whitespace) else {
            return Err(HgscoreError::invalid_format(i + 1, "expected `name label features`"));
        };
        let rest = rest.trim_start();
        let (label, features) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let features = parse_features(features, i + 1)?;
        dataset.push(label, features);
    }
    Ok(dataset)
}

/// Maximum-entropy classifier for one source word, trained from its examples on first use.
///
/// Training runs at most once even under concurrent first use; the other callers wait for it
/// and then share the same model. A failed training is remembered and reported to every caller.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[derive(Debug)]
pub struct MaxEntPredictor {
    source_word: String,
    examples: String,
    trainer: Trainer,
    model: OnceLock<Result<MaxEntModel>>,
}

impl MaxEntPredictor {
    /// Creates a predictor for `source_word` from newline-separated training lines.
    ///
    /// See [`read_examples`] for the line format.
    pub fn new<S, T>(source_word: S, examples: T) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            source_word: source_word.into(),
            examples: examples.into(),
            trainer: Trainer::new(),
            model: OnceLock::new(),
        }
    }

    /// Replaces the trainer settings; only effective before training.
    #[must_use]
    pub fn trainer(mut self, trainer: Trainer) -> Self {
        self.trainer = trainer;
        self
    }

    /// Gets the source word.
    #[inline(always)]
    pub fn source_word(&self) -> &str {
        &self.source_word
    }

    /// Returns `true` once training has run, successfully or not.
    #[inline(always)]
    pub fn is_trained(&self) -> bool {
        self.model.get().is_some()
    }

    /// Trains the classifier unless already trained, and returns it.
    ///
    /// # Errors
    ///
    /// [`HgscoreError`] is returned when the examples are malformed or training fails.
    pub fn train(&self) -> Result<&MaxEntModel> {
        self.model
            .get_or_init(|| {
                info!(
                    "word {}: training model from {} examples",
                    self.source_word,
                    self.examples.lines().count()
                );
                let dataset = read_examples(&self.examples)?;
                let model = self.trainer.train(&dataset)?;
                info!(
                    "word {}: trained a model with {} outcomes",
                    self.source_word,
                    model.num_labels()
                );
                Ok(model)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Classifies a feature string, training first if needed.
    ///
    /// `outcome` is the label the caller expects, reported back in the [`Classification`]; it
    /// does not influence the prediction.
    ///
    /// # Errors
    ///
    /// [`HgscoreError`] is returned when training fails or `features` is malformed.
    pub fn predict(&self, outcome: &str, features: &str) -> Result<Classification> {
        let model = self.train()?;
        let features = parse_features(features, 1)?;
        Ok(model.classify(outcome, features))
    }

    /// Gets the number of distinct labels seen in the training data, training first if needed.
    ///
    /// # Errors
    ///
    /// [`HgscoreError`] is returned when training fails.
    pub fn num_outcomes(&self) -> Result<usize> {
        Ok(self.train()?.num_labels())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    const EXAMPLES: &str = "\
house maison prev=the next=is
house maisons prev=the:1 next=are plural
house maison prev=a
house maisons prev=many plural:1.0
house maison prev=this next=was

house maisons prev=these plural
";

    #[test]
    fn test_parse_features() {
        assert_eq!(
            vec![("a", 1.0), ("b", 0.5), ("c:d", 2.0)],
            parse_features("a b:0.5 c:d:2", 1).unwrap()
        );
        assert!(parse_features("a b:x", 4).is_err());
        assert!(parse_features("", 1).unwrap().is_empty());
    }

    #[test]
    fn test_read_examples() {
        let dataset = read_examples(EXAMPLES).unwrap();
        assert_eq!(6, dataset.len());
        assert_eq!(&["maison".to_string(), "maisons".to_string()], dataset.labels());
        assert!(read_examples("lonely").is_err());
    }

    #[test]
    fn test_lazy_training() {
        let predictor = MaxEntPredictor::new("house", EXAMPLES);
        assert!(!predictor.is_trained());
        assert_eq!(2, predictor.num_outcomes().unwrap());
        assert!(predictor.is_trained());

        let c = predictor.predict("maisons", "prev=these plural").unwrap();
        assert_eq!("maisons", c.best_label());
        assert!(c.best_label_is_correct());
        assert_eq!(2, c.labeling().len());
    }

    #[test]
    fn test_concurrent_first_use() {
        let predictor = MaxEntPredictor::new("house", EXAMPLES);
        let models: Vec<usize> = thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| predictor.train().unwrap() as *const MaxEntModel as usize))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(models.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_failure_is_remembered() {
        let predictor = MaxEntPredictor::new("house", "");
        assert!(predictor.num_outcomes().is_err());
        assert!(predictor.is_trained());
        assert!(predictor.predict("x", "a").is_err());
    }
}
