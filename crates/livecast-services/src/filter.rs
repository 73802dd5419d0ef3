//! Banned-word content filter.

use std::collections::HashSet;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::ContentFilter;

/// Terms rejected in viewer prompts.
///
/// Alphanumeric terms match whole words; the symbol terms at the end match
/// anywhere in the text. Curly apostrophes are left out so that contractions
/// typed on phones ("I’m", "don’t") still pass.
pub const DEFAULT_BANNED_TERMS: &[&str] = &[
    "porn", "nude", "sexually", "shit", "damn", "hell", "kill", "murder", "hit", "fight",
    "cocaine", "weed", "meth", "idiot", "stupid", "dumb", "suicide", "abuse", "trauma", "rape",
    "ass", "fuck", "suck", "bitch", "crap", "puta", "caralho", "sex", "disability",
    "disabilities", "disorder", "disorders", "aprendizagem", "replace", "replaced", "replacing",
    "replaces", "substitua", "substituir", "substituindo", "\"", "“", "”", "''", "``",
    "\\", "!*",
];

/// Case- and diacritic-insensitive deny-list.
#[derive(Debug, Clone)]
pub struct BannedWords {
    words: HashSet<String>,
    fragments: Vec<String>,
}

impl BannedWords {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words = HashSet::new();
        let mut fragments = Vec::new();

        for term in terms {
            let term = fold(term.as_ref());
            if term.is_empty() {
                continue;
            }
            if term.chars().all(char::is_alphanumeric) {
                words.insert(term);
            } else {
                fragments.push(term);
            }
        }

        Self { words, fragments }
    }
}

impl Default for BannedWords {
    fn default() -> Self {
        Self::new(DEFAULT_BANNED_TERMS)
    }
}

impl ContentFilter for BannedWords {
    fn contains_banned_content(&self, text: &str) -> bool {
        let folded = fold(text);

        if self.fragments.iter().any(|f| folded.contains(f.as_str())) {
            return true;
        }

        folded
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .any(|word| self.words.contains(word))
    }
}

/// Lowercase and strip diacritics (NFD, then drop combining marks).
fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}
