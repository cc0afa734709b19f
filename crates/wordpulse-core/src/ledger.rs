//! Word ledger.
//!
//! A room's words are an append-only sequence of tokens. Order is meaningful:
//! it is the order participants submitted them, and repeated tokens are kept
//! as separate entries. Frequency counting happens downstream in
//! [`word_counts`], never in the ledger itself.

use std::collections::HashMap;

use serde::Serialize;

/// Split submitted text into tokens.
///
/// Splits on the ASCII space only and keeps the empty tokens produced by
/// leading, trailing or repeated spaces: `"a  b"` yields `["a", "", "b"]`.
/// Tabs, newlines and non-breaking spaces stay inside their token.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(' ')
}

/// Append-only ordered collection of word tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordLedger {
    words: Vec<String>,
}

impl WordLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize `text` and append every token in order.
    ///
    /// Returns the number of tokens appended. Never zero, since even empty
    /// text produces one empty token.
    pub fn append(&mut self, text: &str) -> usize {
        let before = self.words.len();
        self.words.extend(tokenize(text).map(str::to_owned));
        self.words.len() - before
    }

    /// All tokens in submission order.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Owned copy of the full sequence, for broadcasting.
    pub fn snapshot(&self) -> Vec<String> {
        self.words.clone()
    }

    /// Number of stored tokens.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True if nothing has been submitted yet.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Occurrence count for one distinct word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCount {
    /// The word
    pub word: String,
    /// How many times it appears in the ledger
    pub count: usize,
}

/// Aggregate tokens into distinct-word counts, in first-seen order.
///
/// Empty tokens are skipped: they are stored by the ledger but carry no
/// weight in a visualization.
pub fn word_counts(words: &[String]) -> Vec<WordCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<WordCount> = Vec::new();

    for word in words.iter().filter(|w| !w.is_empty()) {
        match index.get(word.as_str()) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(word.as_str(), counts.len());
                counts.push(WordCount { word: word.clone(), count: 1 });
            },
        }
    }

    counts
}
