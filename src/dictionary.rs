//! Term dictionaries: the per-category phrase lists that context labels are
//! extracted from.
//!
//! Dictionaries are built once from configuration and never mutated while a
//! batch is being labeled. Every phrase is normalized (trimmed, lowercased,
//! deduplicated) and compiled into a case-insensitive matcher at build time.

use std::collections::{BTreeMap, BTreeSet};

use regex::{Regex, RegexBuilder};

use crate::errors::{ConfigError, ConfigResult};
use crate::text::{CharSpan, SentenceText};

/// Well-known category names used by the shipped configuration.
pub mod category {
    pub const COMPARATIVE: &str = "comparative";
    pub const RISK: &str = "risk";
    pub const RELATIONSHIP: &str = "relationship";
    pub const STUDY_CONTEXT: &str = "study_context";
    pub const INDICATION: &str = "indication";
}

/// A single matchable phrase.
#[derive(Debug, Clone)]
pub struct Phrase {
    text: String,
    matcher: Regex,
}

impl Phrase {
    /// Normalize and compile a phrase. `context` names the owner for errors.
    pub fn new(raw: &str, context: &str) -> ConfigResult<Self> {
        let text = normalize_phrase(raw);
        if text.is_empty() {
            return Err(ConfigError::EmptyPhrase {
                context: context.to_string(),
            });
        }
        let matcher = RegexBuilder::new(&regex::escape(&text))
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::InvalidPattern {
                category: context.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { text, matcher })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Byte ranges of every word-aligned occurrence in the sentence.
    pub fn find_in(&self, sentence: &SentenceText<'_>) -> Vec<(usize, usize)> {
        find_aligned(&self.matcher, sentence)
    }

    /// True if the phrase occurs at least once on word boundaries.
    pub fn occurs_in(&self, sentence: &SentenceText<'_>) -> bool {
        !self.find_in(sentence).is_empty()
    }
}

/// A normalized, sorted, deduplicated list of phrases.
#[derive(Debug, Clone, Default)]
pub struct PhraseSet {
    phrases: Vec<Phrase>,
}

impl PhraseSet {
    pub fn new<I, S>(raw: I, context: &str) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = BTreeSet::new();
        let mut phrases = Vec::new();
        for item in raw {
            let phrase = Phrase::new(item.as_ref(), context)?;
            if seen.insert(phrase.text.clone()) {
                phrases.push(phrase);
            }
        }
        phrases.sort_by(|a, b| a.text.cmp(&b.text));
        Ok(Self { phrases })
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Phrase> {
        self.phrases.iter()
    }

    /// The phrases of this set that occur in the sentence.
    pub fn matches_in(&self, sentence: &SentenceText<'_>) -> BTreeSet<String> {
        self.phrases
            .iter()
            .filter(|phrase| phrase.occurs_in(sentence))
            .map(|phrase| phrase.text.clone())
            .collect()
    }
}

/// A dictionary category.
///
/// In a flat category each phrase is its own label. In a labeled category
/// (e.g. `relationship`) several phrases share one label such as
/// `combination`, and the label is what rules match against.
#[derive(Debug, Clone)]
pub struct TermCategory {
    labeled: bool,
    entries: Vec<(String, PhraseSet)>,
}

impl TermCategory {
    pub fn flat<I, S>(phrases: I, name: &str) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = PhraseSet::new(phrases, name)?;
        let entries = set
            .phrases
            .into_iter()
            .map(|phrase| {
                let label = phrase.text.clone();
                (label, PhraseSet { phrases: vec![phrase] })
            })
            .collect();
        Ok(Self {
            labeled: false,
            entries,
        })
    }

    pub fn labeled<I, L, P, S>(labels: I, name: &str) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (L, P)>,
        L: AsRef<str>,
        P: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = Vec::new();
        for (label, phrases) in labels {
            let label = label.as_ref().trim().to_lowercase();
            if label.is_empty() {
                return Err(ConfigError::EmptyPhrase {
                    context: name.to_string(),
                });
            }
            let context = format!("{}.{}", name, label);
            entries.push((label, PhraseSet::new(phrases, &context)?));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Self {
            labeled: true,
            entries,
        })
    }

    pub fn is_labeled(&self) -> bool {
        self.labeled
    }

    /// True when `term` is one of the category's labels or phrases, i.e. a
    /// value a rule requirement can ever see.
    pub fn defines(&self, term: &str) -> bool {
        self.entries
            .iter()
            .any(|(label, set)| label == term || set.iter().any(|p| p.as_str() == term))
    }

    /// The first occurrence of each label in the sentence, in text order.
    pub fn locate(&self, sentence: &SentenceText<'_>) -> Vec<TermMention> {
        let mut found: Vec<TermMention> = self
            .entries
            .iter()
            .filter_map(|(label, set)| {
                set.iter()
                    .flat_map(|phrase| {
                        phrase
                            .find_in(sentence)
                            .into_iter()
                            .map(move |(start, end)| (start, end, phrase))
                    })
                    .min_by_key(|&(start, end, _)| (start, std::cmp::Reverse(end)))
                    .map(|(start, end, phrase)| TermMention {
                        label: label.clone(),
                        phrase: phrase.as_str().to_string(),
                        surface: sentence.as_str()[start..end].to_string(),
                        span: sentence.char_span(start, end),
                    })
            })
            .collect();
        found.sort_by(|a, b| (a.span, &a.label).cmp(&(b.span, &b.label)));
        found
    }

    /// Match the category against a sentence, returning `(labels, phrases)`.
    fn scan(&self, sentence: &SentenceText<'_>) -> (BTreeSet<String>, BTreeSet<String>) {
        let mut labels = BTreeSet::new();
        let mut phrases = BTreeSet::new();
        for (label, set) in &self.entries {
            let hits = set.matches_in(sentence);
            if !hits.is_empty() {
                labels.insert(label.clone());
                phrases.extend(hits);
            }
        }
        (labels, phrases)
    }
}

/// Where a dictionary label was found in a sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMention {
    pub label: String,
    /// The normalized dictionary phrase that matched.
    pub phrase: String,
    /// The text as written in the sentence.
    pub surface: String,
    pub span: CharSpan,
}

/// A category whose entries are regular expressions (e.g. trial phases).
#[derive(Debug, Clone)]
pub struct PatternCategory {
    patterns: Vec<Regex>,
}

impl PatternCategory {
    pub fn new<I, S>(patterns: I, name: &str) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                RegexBuilder::new(pattern.as_ref())
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ConfigError::InvalidPattern {
                        category: name.to_string(),
                        message: e.to_string(),
                    })
            })
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Lowercased surface text of every word-aligned match.
    fn scan(&self, sentence: &SentenceText<'_>) -> BTreeSet<String> {
        let text = sentence.as_str();
        self.patterns
            .iter()
            .flat_map(|pattern| find_aligned(pattern, sentence))
            .map(|(start, end)| text[start..end].to_lowercase())
            .collect()
    }
}

/// All term and pattern categories of a configuration.
#[derive(Debug, Clone, Default)]
pub struct TermDictionaries {
    terms: BTreeMap<String, TermCategory>,
    patterns: BTreeMap<String, PatternCategory>,
}

impl TermDictionaries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a flat category.
    pub fn with_terms<I, S>(mut self, name: &str, phrases: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert_terms(name, TermCategory::flat(phrases, name)?)?;
        Ok(self)
    }

    /// Add a labeled category.
    pub fn with_labeled<I, L, P, S>(mut self, name: &str, labels: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (L, P)>,
        L: AsRef<str>,
        P: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert_terms(name, TermCategory::labeled(labels, name)?)?;
        Ok(self)
    }

    /// Add a regular-expression category.
    pub fn with_patterns<I, S>(mut self, name: &str, patterns: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let category = PatternCategory::new(patterns, name)?;
        if self.terms.contains_key(name) {
            return Err(ConfigError::CategoryCollision {
                category: name.to_string(),
            });
        }
        self.patterns.insert(name.to_string(), category);
        Ok(self)
    }

    pub(crate) fn insert_terms(&mut self, name: &str, category: TermCategory) -> ConfigResult<()> {
        if self.patterns.contains_key(name) {
            return Err(ConfigError::CategoryCollision {
                category: name.to_string(),
            });
        }
        self.terms.insert(name.to_string(), category);
        Ok(())
    }

    pub fn has_category(&self, name: &str) -> bool {
        self.terms.contains_key(name) || self.patterns.contains_key(name)
    }

    /// Every category name, sorted.
    pub fn category_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .terms
            .keys()
            .chain(self.patterns.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    pub fn category(&self, name: &str) -> Option<&TermCategory> {
        self.terms.get(name)
    }

    /// First occurrence of each label of a term category. Empty for unknown
    /// and pattern categories.
    pub fn locate(&self, name: &str, sentence: &SentenceText<'_>) -> Vec<TermMention> {
        self.terms
            .get(name)
            .map(|category| category.locate(sentence))
            .unwrap_or_default()
    }

    /// Scan every category. Returns `category -> (labels, phrases)` for the
    /// categories with at least one match.
    pub(crate) fn scan(
        &self,
        sentence: &SentenceText<'_>,
    ) -> BTreeMap<String, (BTreeSet<String>, BTreeSet<String>)> {
        let mut found = BTreeMap::new();
        for (name, category) in &self.terms {
            let (labels, phrases) = category.scan(sentence);
            if !labels.is_empty() {
                found.insert(name.clone(), (labels, phrases));
            }
        }
        for (name, category) in &self.patterns {
            let hits = category.scan(sentence);
            if !hits.is_empty() {
                found.insert(name.clone(), (hits.clone(), hits));
            }
        }
        found
    }
}

pub(crate) fn normalize_phrase(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Every match of `matcher` whose ends fall on word boundaries.
///
/// A misaligned match does not hide an aligned one starting inside it: the
/// search resumes one character after the rejected match's start.
fn find_aligned(matcher: &Regex, sentence: &SentenceText<'_>) -> Vec<(usize, usize)> {
    let text = sentence.as_str();
    let mut spans = Vec::new();
    let mut pos = 0;
    while pos <= text.len() {
        let Some(found) = matcher.find_at(text, pos) else {
            break;
        };
        if found.start() == found.end() {
            // Empty matches carry no signal.
            pos = next_char_boundary(text, found.start());
            continue;
        }
        if sentence.is_word_aligned(found.start(), found.end()) {
            spans.push((found.start(), found.end()));
            pos = found.end();
        } else {
            pos = next_char_boundary(text, found.start());
        }
    }
    spans
}

fn next_char_boundary(text: &str, from: usize) -> usize {
    text[from..]
        .chars()
        .next()
        .map(|c| from + c.len_utf8())
        .unwrap_or(text.len() + 1)
}
