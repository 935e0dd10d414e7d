use hashbrown::HashMap;

use crate::errors::{HgscoreError, Result};
use crate::vocab::WordId;

/// Query interface of an n-gram language model.
///
/// All probabilities are log10. Implementations are shared by every search thread.
pub trait NgramLanguageModel: Send + Sync {
    /// Gets the order of the model.
    fn order(&self) -> usize;

    /// Returns the log-probability of the last word of `ngram` given the words before it.
    ///
    /// Only the last `order` words are used.
    fn ngram_log_probability(&self, ngram: &[WordId], order: usize) -> f64;

    /// Returns the additional backoff weight for a window ending in the left-backoff marker.
    ///
    /// # Arguments
    ///
    /// * `ngram` - The window; its last word is the marker.
    /// * `order` - Length of the window.
    /// * `n_additional_backoff` - Number of window words preceding the context the marker
    ///   stands for.
    fn log_prob_of_backoff_state(
        &self,
        ngram: &[WordId],
        order: usize,
        n_additional_backoff: usize,
    ) -> f64;

    /// Sums the log-probabilities of the growing prefixes of `sentence` with length in
    /// `start_index..order`, and then of every full window of length `order`.
    ///
    /// A `start_index` of `order` or more scores complete n-grams only.
    fn sentence_log_probability(
        &self,
        sentence: &[WordId],
        order: usize,
        start_index: usize,
    ) -> f64 {
        if sentence.is_empty() || order == 0 {
            return 0.0;
        }
        let mut log_prob = 0.0;
        for j in start_index.max(1)..order.min(sentence.len() + 1) {
            log_prob += self.ngram_log_probability(&sentence[..j], order);
        }
        for ngram in sentence.windows(order) {
            log_prob += self.ngram_log_probability(ngram, order);
        }
        log_prob
    }
}

/// In-memory ARPA-style backoff model.
///
/// Each stored n-gram carries a log-probability and a backoff weight. Unseen n-grams back off
/// to shorter histories, paying the backoff weight of each dropped context.
#[derive(Debug)]
pub struct BackoffModel {
    order: usize,
    entries: HashMap<Vec<WordId>, (f64, f64)>,
    unk_log_prob: f64,
}

impl BackoffModel {
    /// Log-probability of a word missing from the unigram table, unless overridden.
    pub const DEFAULT_UNK_LOG_PROB: f64 = -100.0;

    /// Creates an empty model.
    ///
    /// # Errors
    ///
    /// [`HgscoreError`] is returned when `order` is 0.
    pub fn new(order: usize) -> Result<Self> {
        if order == 0 {
            return Err(HgscoreError::invalid_argument("order must not be 0"));
        }
        Ok(Self {
            order,
            entries: HashMap::new(),
            unk_log_prob: Self::DEFAULT_UNK_LOG_PROB,
        })
    }

    /// Sets the log-probability of unknown words.
    #[must_use]
    pub const fn unk_log_prob(mut self, log_prob: f64) -> Self {
        self.unk_log_prob = log_prob;
        self
    }

    /// Adds an n-gram.
    ///
    /// # Errors
    ///
    /// [`HgscoreError`] is returned when the n-gram is empty or longer than the order.
    pub fn insert(&mut self, ngram: &[WordId], log_prob: f64, backoff: f64) -> Result<()> {
        if ngram.is_empty() || ngram.len() > self.order {
            return Err(HgscoreError::invalid_argument(format!(
                "n-gram length must be in 1..={}",
                self.order
            )));
        }
        self.entries.insert(ngram.to_vec(), (log_prob, backoff));
        Ok(())
    }

    /// Returns the number of stored n-grams.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no n-gram is stored.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline(always)]
    fn backoff(&self, context: &[WordId]) -> Option<f64> {
        self.entries.get(context).map(|&(_, b)| b)
    }
}

impl NgramLanguageModel for BackoffModel {
    fn order(&self) -> usize {
        self.order
    }

    fn ngram_log_probability(&self, ngram: &[WordId], order: usize) -> f64 {
        let n = ngram.len().min(order).min(self.order);
        if n == 0 {
            return 0.0;
        }
        let mut ngram = &ngram[ngram.len() - n..];
        let mut backoff = 0.0;
        loop {
            if let Some(&(log_prob, _)) = self.entries.get(ngram) {
                return backoff + log_prob;
            }
            if ngram.len() == 1 {
                return backoff + self.unk_log_prob;
            }
            backoff += self.backoff(&ngram[..ngram.len() - 1]).unwrap_or(0.0);
            ngram = &ngram[1..];
        }
    }

    fn log_prob_of_backoff_state(
        &self,
        ngram: &[WordId],
        order: usize,
        n_additional_backoff: usize,
    ) -> f64 {
        let n = ngram.len().min(order);
        if n == 0 {
            return 0.0;
        }
        let context = &ngram[ngram.len() - n..ngram.len() - 1];
        let mut log_prob = 0.0;
        for start in 0..n_additional_backoff.min(context.len()) {
            match self.backoff(&context[start..]) {
                Some(b) => log_prob += b,
                None => break,
            }
        }
        log_prob
    }
}
