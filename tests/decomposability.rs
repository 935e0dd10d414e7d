use std::sync::Arc;

use hgscore::vocab::nonterminal;
use hgscore::{
    BackoffModel, HgNode, LanguageModelFF, LmSymbols, NgramLanguageModel, Rule, Scorer,
    SourcePath, StatefulFeature, StatelessFF, Vocabulary, Weights, WordId, WordPenalty,
};
use proptest::prelude::*;

const WORDS: [&str; 7] = ["w0", "w1", "w2", "w3", "w4", "<s>", "</s>"];

struct Deriver<'a> {
    ff: &'a LanguageModelFF<BackoffModel>,
    words: &'a [WordId],
    choices: &'a [u8],
    pos: usize,
    log_prob: f64,
}

impl Deriver<'_> {
    fn next(&mut self) -> usize {
        let c = self.choices.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        usize::from(c)
    }

    /// Builds a node over `[a, b)` whose rule mixes terminals and smaller child spans.
    fn derive(&mut self, a: usize, b: usize) -> HgNode {
        let mut target = vec![];
        let mut children = vec![];
        let mut i = a;
        while i < b {
            let mut k = 0;
            if self.next() % 2 == 1 {
                k = 1 + self.next() % (b - i);
                if i == a && i + k == b {
                    k -= 1;
                }
            }
            if k == 0 {
                target.push(self.words[i]);
                i += 1;
            } else {
                target.push(nonterminal(children.len()));
                children.push(self.derive(i, i + k));
                i += k;
            }
        }
        let rule = Rule::from_target(0, &target);
        let tails: Vec<&HgNode> = children.iter().collect();
        let path = SourcePath::new();
        self.log_prob += self.ff.compute_cost(&rule, &tails, a, b, &path, 0);
        let state = self.ff.compute_state(&rule, &tails, a, b, &path, 0);
        HgNode::with_states(a, b, 0, [(self.ff.state_id(), state)])
    }
}

fn build_model(
    vocab: &mut Vocabulary,
    order: usize,
    entries: &[(Vec<usize>, f64, f64)],
) -> BackoffModel {
    let mut lm = BackoffModel::new(order).unwrap();
    for word in WORDS {
        lm.insert(&[vocab.id(word)], -2.0, -0.5).unwrap();
    }
    for (ngram, log_prob, backoff) in entries {
        if ngram.len() <= order {
            let ngram: Vec<WordId> = ngram.iter().map(|&w| vocab.id(WORDS[w])).collect();
            lm.insert(&ngram, *log_prob, *backoff).unwrap();
        }
    }
    lm
}

proptest! {
    #[test]
    fn transitions_sum_to_sentence_score(
        order in 2usize..=4,
        sentence in prop::collection::vec(0usize..5, 1..10),
        entries in prop::collection::vec(
            (prop::collection::vec(0usize..7, 1..=4), -3.0f64..0.0, -1.0f64..0.0),
            0..60,
        ),
        choices in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let mut vocab = Vocabulary::new();
        let symbols = LmSymbols::register(&mut vocab);
        let lm = Arc::new(build_model(&mut vocab, order, &entries));
        let weights = Weights::new().with_weight("lm", 1.0);
        let ff = LanguageModelFF::new("lm", Arc::clone(&lm), symbols, &weights);

        let words: Vec<WordId> = sentence.iter().map(|&w| vocab.id(WORDS[w])).collect();
        let mut deriver = Deriver {
            ff: &ff,
            words: &words,
            choices: &choices,
            pos: 0,
            log_prob: 0.0,
        };
        let top = deriver.derive(0, words.len());
        let total = deriver.log_prob
            + ff.compute_final_cost(&top, 0, words.len(), &SourcePath::new(), 0);

        let mut full = vec![symbols.start];
        full.extend_from_slice(&words);
        full.push(symbols.stop);
        let direct = lm.sentence_log_probability(&full, order, 2);
        prop_assert!((total - direct).abs() < 1e-8, "{total} != {direct}");
    }

    #[test]
    fn states_have_equal_contexts(
        order in 1usize..=5,
        sentence in prop::collection::vec(0usize..5, 1..12),
        choices in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let mut vocab = Vocabulary::new();
        let symbols = LmSymbols::register(&mut vocab);
        let lm = Arc::new(build_model(&mut vocab, order, &[]));
        let ff = LanguageModelFF::new("lm", lm, symbols, &Weights::new());
        let words: Vec<WordId> = sentence.iter().map(|&w| vocab.id(WORDS[w])).collect();
        let mut deriver = Deriver {
            ff: &ff,
            words: &words,
            choices: &choices,
            pos: 0,
            log_prob: 0.0,
        };
        let top = deriver.derive(0, words.len());
        let state = top.dp_state(ff.state_id()).unwrap().as_ngram().unwrap();
        let (left, right) = state.contexts();
        let keep = (order - 1).min(words.len());
        prop_assert_eq!(&words[..keep], left);
        prop_assert_eq!(&words[words.len() - keep..], right);
    }
}

#[test]
fn the_cat_sat() {
    let mut vocab = Vocabulary::new();
    let symbols = LmSymbols::register(&mut vocab);
    let mut lm = BackoffModel::new(3).unwrap();
    for (ngram, log_prob) in [
        ("<s> the", -0.4),
        ("<s> the cat", -0.3),
        ("the cat sat", -0.6),
        ("cat sat </s>", -0.2),
    ] {
        lm.insert(&vocab.phrase(ngram).unwrap(), log_prob, 0.0).unwrap();
    }
    let lm = Arc::new(lm);

    let weights = Weights::read("lm 1.0\nWordPenalty 0.0\n".as_bytes()).unwrap();
    let mut scorer = Scorer::new(&weights);
    scorer.push(Box::new(LanguageModelFF::new(
        "lm",
        Arc::clone(&lm),
        symbols,
        &weights,
    )));
    scorer.push(StatelessFF::new(WordPenalty::new(), &weights));

    let x = vocab.id("[X]");
    let path = SourcePath::new();
    let r0 = Rule::from_target(x, &vocab.phrase("the cat").unwrap());
    let n0 = scorer.build_node(&r0, &[], 0, 2, &path, 0);
    let r1 = Rule::from_target(x, &vocab.phrase("[X,1] sat").unwrap());
    let n1 = scorer.build_node(&r1, &[&n0], 0, 3, &path, 0);

    let total = scorer.compute_cost(&r0, &[], 0, 2, &path, 0)
        + scorer.compute_cost(&r1, &[&n0], 0, 3, &path, 0)
        + scorer.compute_final_cost(&n1, 0, 3, &path, 0);
    let expected = -0.4 - 0.3 - 0.6 - 0.2;
    assert!((total - expected).abs() < 1e-9);

    let sentence = vocab.phrase("<s> the cat sat </s>").unwrap();
    assert!((lm.sentence_log_probability(&sentence, 3, 2) - expected).abs() < 1e-9);
}
