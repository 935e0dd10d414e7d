use std::sync::Arc;

use crate::lm::{BackoffModel, LmSymbols};
use crate::vocab::{Vocabulary, WordId};

#[allow(unused_macros)]
macro_rules! hashmap {
    ( $($k:expr => $v:expr,)* ) => {
        {
            #[allow(unused_mut)]
            let mut h = HashMap::new();
            $(
                h.insert($k, $v);
            )*
            h
        }
    };
    ( $($k:expr => $v:expr),* ) => {
        hashmap![$( $k => $v, )*]
    };
}

/// log P(the|<s>) + log P(cat|<s> the) + log P(sat|the cat) + log P(</s>|cat sat)
pub const THE_CAT_SAT_LOG_PROB: f64 = -0.4 - 0.3 - 0.6 - 0.2;

pub struct Fixture {
    pub vocab: Vocabulary,
    pub lm: Arc<BackoffModel>,
    pub symbols: LmSymbols,
}

/// Trigram model knowing every n-gram of "<s> the cat sat </s>".
pub fn the_cat_sat() -> Fixture {
    let mut vocab = Vocabulary::new();
    let symbols = LmSymbols::register(&mut vocab);
    let mut lm = BackoffModel::new(3).unwrap();
    for (ngram, log_prob, backoff) in [
        ("<s>", -99.0, -0.5),
        ("the", -1.0, -0.3),
        ("cat", -1.5, -0.2),
        ("sat", -2.0, -0.1),
        ("</s>", -1.2, 0.0),
        ("<s> the", -0.4, -0.2),
        ("the cat", -0.7, -0.1),
        ("cat sat", -0.9, -0.15),
        ("sat </s>", -0.5, 0.0),
        ("<s> the cat", -0.3, 0.0),
        ("the cat sat", -0.6, 0.0),
        ("cat sat </s>", -0.2, 0.0),
    ] {
        let ngram = vocab.phrase(ngram).unwrap();
        lm.insert(&ngram, log_prob, backoff).unwrap();
    }
    Fixture {
        vocab,
        lm: Arc::new(lm),
        symbols,
    }
}

/// Looks up the IDs of known words.
pub fn ids(vocab: &Vocabulary, text: &str) -> Vec<WordId> {
    text.split_whitespace()
        .map(|w| {
            vocab
                .get_id(w)
                .unwrap_or_else(|| panic!("unknown word: {w}"))
        })
        .collect()
}

pub(crate) use hashmap;
