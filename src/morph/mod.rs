//! Russian morphological lemmatizer
//!
//! Turns raw text into lemma occurrence counts: lowercase, strip everything
//! outside the Cyrillic alphabet, drop functional words (closed word classes
//! tagged by an embedded dictionary), and reduce the remaining tokens to a
//! normal form with the Snowball Russian stemmer. Pure and deterministic;
//! unanalyzable tokens are skipped per token, never aborting the batch.

use std::collections::{HashMap, HashSet};

use rust_stemmers::{Algorithm, Stemmer};
use thiserror::Error;
use tracing::debug;

/// Per-token analysis failure
#[derive(Debug, Error)]
pub enum MorphError {
    #[error("no analyzable form for token '{0}'")]
    Unanalyzable(String),
}

/// Part-of-speech tag of a closed word class. All four classes are excluded
/// from lemma counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartOfSpeech {
    Preposition,
    Conjunction,
    Particle,
    Interjection,
}

const PREPOSITIONS: &[&str] = &[
    "в", "во", "на", "за", "к", "ко", "с", "со", "по", "о", "об", "обо", "от", "ото", "до", "из",
    "изо", "у", "при", "над", "надо", "под", "подо", "про", "без", "безо", "для", "через",
    "между", "перед", "передо", "около", "вокруг", "среди", "против", "после", "кроме", "ради",
    "сквозь", "вдоль", "возле", "мимо", "из-за", "из-под",
];

const CONJUNCTIONS: &[&str] = &[
    "и", "а", "но", "да", "или", "либо", "что", "чтобы", "как", "когда", "если", "хотя", "пока",
    "будто", "словно", "зато", "однако", "тоже", "также", "ибо", "потому", "поэтому", "причем",
    "притом", "нежели", "чем",
];

const PARTICLES: &[&str] = &[
    "не", "ни", "же", "ж", "бы", "б", "ли", "ведь", "вот", "вон", "даже", "лишь", "только",
    "уже", "уж", "разве", "неужели", "именно", "почти", "пусть", "пускай", "мол", "дескать",
];

const INTERJECTIONS: &[&str] = &[
    "ах", "ох", "эх", "ух", "ой", "ай", "эй", "увы", "ура", "браво", "алло", "ну", "фу", "тьфу",
    "ба",
];

/// Lemmatizer with an embedded functional-word dictionary and a Snowball
/// Russian stemmer for normal forms.
pub struct Lemmatizer {
    stemmer: Stemmer,
    dictionary: HashMap<&'static str, PartOfSpeech>,
}

impl Lemmatizer {
    pub fn new() -> Self {
        let mut dictionary = HashMap::new();
        for word in PREPOSITIONS {
            dictionary.insert(*word, PartOfSpeech::Preposition);
        }
        for word in CONJUNCTIONS {
            dictionary.insert(*word, PartOfSpeech::Conjunction);
        }
        for word in PARTICLES {
            dictionary.entry(*word).or_insert(PartOfSpeech::Particle);
        }
        for word in INTERJECTIONS {
            dictionary.entry(*word).or_insert(PartOfSpeech::Interjection);
        }
        Self {
            stemmer: Stemmer::create(Algorithm::Russian),
            dictionary,
        }
    }

    /// Map `text` to lemma -> occurrence count.
    pub fn lemma_counts(&self, text: &str) -> HashMap<String, u32> {
        let mut counts = HashMap::new();
        for token in tokenize(text) {
            if self.is_functional(&token) {
                continue;
            }
            match self.normal_form(&token) {
                Ok(lemma) => *counts.entry(lemma).or_insert(0) += 1,
                Err(e) => debug!(token = %token, error = %e, "skipping unanalyzable token"),
            }
        }
        counts
    }

    /// The set of distinct lemmas in `text`, for callers that only need
    /// membership.
    pub fn lemma_set(&self, text: &str) -> HashSet<String> {
        self.lemma_counts(text).into_keys().collect()
    }

    /// Part-of-speech tag for a token found in the closed-class dictionary.
    pub fn tag(&self, token: &str) -> Option<PartOfSpeech> {
        self.dictionary.get(token).copied()
    }

    /// Whether the token belongs to an excluded functional word class.
    pub fn is_functional(&self, token: &str) -> bool {
        self.tag(token).is_some()
    }

    /// Reduce one token to its normal (dictionary) form.
    pub fn normal_form(&self, token: &str) -> Result<String, MorphError> {
        if !token.chars().any(is_cyrillic_letter) {
            return Err(MorphError::Unanalyzable(token.to_string()));
        }
        Ok(self.stemmer.stem(token).into_owned())
    }
}

impl Default for Lemmatizer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_cyrillic_letter(c: char) -> bool {
    matches!(c, 'а'..='я' | 'ё')
}

/// Lowercase, replace every character outside the target alphabet (keeping
/// whitespace and hyphens) with a space, and split on whitespace.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if is_cyrillic_letter(c) || c.is_whitespace() || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
