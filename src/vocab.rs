//! Word interning and nonterminal encoding.

use hashbrown::HashMap;

use crate::errors::{HgscoreError, Result};

/// Integer identity of a token.
///
/// Terminal words are non-negative. Negative values are back-references to the nonterminal
/// slots of a rule; slot `k` is encoded as `-(k + 1)`.
pub type WordId = i32;

/// Surface form of the unknown word, always interned at ID 0.
pub const UNKNOWN_WORD: &str = "<unk>";

/// Returns `true` if `id` is a nonterminal back-reference.
#[inline(always)]
pub const fn is_nonterminal(id: WordId) -> bool {
    id < 0
}

/// Encodes the nonterminal slot `index` as a token ID.
#[inline(always)]
pub fn nonterminal(index: usize) -> WordId {
    -WordId::try_from(index).unwrap_or(WordId::MAX) - 1
}

/// Decodes the slot index from a nonterminal token ID, or [`None`] for terminals.
#[inline(always)]
pub fn nonterminal_index(id: WordId) -> Option<usize> {
    if is_nonterminal(id) {
        usize::try_from(-(id + 1)).ok()
    } else {
        None
    }
}

/// Bidirectional mapping between surface tokens and [`WordId`]s.
///
/// IDs are stable for the lifetime of the vocabulary. The vocabulary is populated during
/// configuration and only read afterwards.
#[derive(Debug)]
pub struct Vocabulary {
    ids: HashMap<String, WordId>,
    words: Vec<String>,
}

impl Vocabulary {
    /// Creates a vocabulary holding only [`UNKNOWN_WORD`].
    pub fn new() -> Self {
        let mut vocab = Self {
            ids: HashMap::new(),
            words: vec![],
        };
        vocab.words.push(UNKNOWN_WORD.to_string());
        vocab.ids.insert(UNKNOWN_WORD.to_string(), 0);
        vocab
    }

    /// Returns the ID of `token`, interning it if it is new.
    ///
    /// # Panics
    ///
    /// Panics if the vocabulary outgrows the positive range of [`WordId`].
    pub fn id(&mut self, token: &str) -> WordId {
        if let Some(&id) = self.ids.get(token) {
            return id;
        }
        let id = WordId::try_from(self.words.len()).expect("vocabulary too large");
        self.words.push(token.to_string());
        self.ids.insert(token.to_string(), id);
        id
    }

    /// Returns the ID of `token` without interning it.
    #[inline(always)]
    pub fn get_id(&self, token: &str) -> Option<WordId> {
        self.ids.get(token).copied()
    }

    /// Returns the surface form of a terminal, or `[X,k]` for nonterminal slot `k`.
    pub fn word(&self, id: WordId) -> Option<String> {
        if let Some(index) = nonterminal_index(id) {
            return Some(format!("[X,{}]", index + 1));
        }
        usize::try_from(id)
            .ok()
            .and_then(|i| self.words.get(i))
            .cloned()
    }

    /// Renders a token sequence for diagnostics.
    pub fn words(&self, ids: &[WordId]) -> String {
        let mut result = String::new();
        for (i, &id) in ids.iter().enumerate() {
            if i != 0 {
                result.push(' ');
            }
            match self.word(id) {
                Some(w) => result.push_str(&w),
                None => result.push_str(UNKNOWN_WORD),
            }
        }
        result
    }

    /// Interns a whitespace-separated phrase.
    ///
    /// Tokens of the form `[X,k]` (1-origin) become nonterminal back-references to slot `k - 1`.
    ///
    /// # Errors
    ///
    /// [`HgscoreError`] is returned when a nonterminal index is not a positive integer.
    pub fn phrase(&mut self, text: &str) -> Result<Vec<WordId>> {
        let mut ids = vec![];
        for token in text.split_whitespace() {
            if let Some(inner) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
                if let Some((_, index)) = inner.split_once(',') {
                    let index: usize = index.parse().map_err(|_| {
                        HgscoreError::invalid_argument(format!("bad nonterminal: {token}"))
                    })?;
                    if index == 0 {
                        return Err(HgscoreError::invalid_argument(
                            "nonterminal indices are 1-origin",
                        ));
                    }
                    ids.push(nonterminal(index - 1));
                    continue;
                }
            }
            ids.push(self.id(token));
        }
        Ok(ids)
    }

    /// Returns the number of terminal entries.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always `false`, since [`UNKNOWN_WORD`] is interned at construction.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}
