//! Context label extraction.
//!
//! Scans one sentence for every dictionary category and records which terms
//! matched. Extraction is a pure function of the text and the dictionaries:
//! no I/O, no shared state, and identical inputs always produce identical
//! (sorted) label sets.
//!
//! Overlapping matches are kept. A sentence containing "risk of" yields both
//! `risk` and `risk of` when both are dictionary terms; deduplication only
//! happens on exact string identity within a category.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::dictionary::{category, TermDictionaries};
use crate::text::SentenceText;

static EMPTY: BTreeSet<String> = BTreeSet::new();

/// Per-category matched terms for one sentence.
///
/// `labels` holds what rules match against: the phrase itself for flat
/// categories, the label (e.g. `combination`) for labeled ones. `phrases`
/// always holds the literal dictionary phrases that matched, so every label
/// can be traced back to text. Categories without a match are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextLabels {
    pub labels: BTreeMap<String, BTreeSet<String>>,
    pub phrases: BTreeMap<String, BTreeSet<String>>,
}

impl ContextLabels {
    /// Labels for a category; empty when nothing matched.
    pub fn get(&self, category: &str) -> &BTreeSet<String> {
        self.labels.get(category).unwrap_or(&EMPTY)
    }

    /// Literal phrases that matched for a category.
    pub fn phrases_for(&self, category: &str) -> &BTreeSet<String> {
        self.phrases.get(category).unwrap_or(&EMPTY)
    }

    pub fn comparative_terms(&self) -> &BTreeSet<String> {
        self.get(category::COMPARATIVE)
    }

    pub fn risk_terms(&self) -> &BTreeSet<String> {
        self.get(category::RISK)
    }

    pub fn relationship_types(&self) -> &BTreeSet<String> {
        self.get(category::RELATIONSHIP)
    }

    pub fn study_context(&self) -> &BTreeSet<String> {
        self.get(category::STUDY_CONTEXT)
    }

    /// Canonical indication names.
    pub fn indications(&self) -> &BTreeSet<String> {
        self.get(category::INDICATION)
    }

    /// Union of every matched phrase across categories.
    pub fn matched_terms(&self) -> BTreeSet<String> {
        self.phrases.values().flatten().cloned().collect()
    }

    /// True when no category matched.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Builder used by tests and callers that already hold labels.
    pub fn with<I, S>(mut self, category: &str, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let terms: BTreeSet<String> = terms.into_iter().map(Into::into).collect();
        if terms.is_empty() {
            return self;
        }
        self.phrases
            .entry(category.to_string())
            .or_default()
            .extend(terms.iter().cloned());
        self.labels
            .entry(category.to_string())
            .or_default()
            .extend(terms);
        self
    }
}

/// Extracts [`ContextLabels`] from sentence text.
#[derive(Debug, Clone, Copy)]
pub struct ContextLabelExtractor<'d> {
    dictionaries: &'d TermDictionaries,
}

impl<'d> ContextLabelExtractor<'d> {
    pub fn new(dictionaries: &'d TermDictionaries) -> Self {
        Self { dictionaries }
    }

    pub fn extract(&self, text: &str) -> ContextLabels {
        self.extract_from(&SentenceText::new(text))
    }

    pub fn extract_from(&self, sentence: &SentenceText<'_>) -> ContextLabels {
        let mut labels = ContextLabels::default();
        for (name, (matched_labels, matched_phrases)) in self.dictionaries.scan(sentence) {
            labels.labels.insert(name.clone(), matched_labels);
            labels.phrases.insert(name, matched_phrases);
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionaries() -> TermDictionaries {
        TermDictionaries::new()
            .with_terms(
                "comparative",
                ["compared with", "superior", "versus", "vs"],
            )
            .unwrap()
            .with_terms("risk", ["risk", "risk of", "increased risk"])
            .unwrap()
            .with_labeled(
                "relationship",
                [("combination", vec!["combined with", "plus"])],
            )
            .unwrap()
            .with_terms("study_context", ["trial", "randomized"])
            .unwrap()
            .with_terms("indication", Vec::<&str>::new())
            .unwrap()
    }

    #[test]
    fn detects_comparative_terms() {
        let dictionaries = dictionaries();
        let labels = ContextLabelExtractor::new(&dictionaries)
            .extract("Semaglutide was compared with insulin and found superior in outcomes.");
        let terms: Vec<_> = labels.comparative_terms().iter().collect();
        assert_eq!(terms, vec!["compared with", "superior"]);
        assert!(labels.risk_terms().is_empty());
    }

    #[test]
    fn overlapping_terms_both_count() {
        let dictionaries = dictionaries();
        let labels = ContextLabelExtractor::new(&dictionaries)
            .extract("There was an increased risk of hypoglycemia.");
        let terms: Vec<_> = labels.risk_terms().iter().collect();
        assert_eq!(terms, vec!["increased risk", "risk", "risk of"]);
    }

    #[test]
    fn empty_term_list_yields_empty_set() {
        let dictionaries = dictionaries();
        let labels = ContextLabelExtractor::new(&dictionaries).extract("Asthma versus COPD.");
        assert!(labels.get("indication").is_empty());
        assert!(!labels.labels.contains_key("indication"));
    }

    #[test]
    fn terms_do_not_match_inside_words() {
        let dictionaries = dictionaries();
        let labels =
            ContextLabelExtractor::new(&dictionaries).extract("The trialist used vsync tooling.");
        assert!(labels.is_empty());
    }

    #[test]
    fn matched_terms_is_the_union_of_phrases() {
        let dictionaries = dictionaries();
        let labels = ContextLabelExtractor::new(&dictionaries)
            .extract("In this randomized trial, metformin plus insulin vs insulin alone.");
        assert_eq!(
            labels.relationship_types().iter().collect::<Vec<_>>(),
            vec!["combination"]
        );
        assert_eq!(
            labels.matched_terms().into_iter().collect::<Vec<_>>(),
            vec!["plus", "randomized", "trial", "vs"]
        );
    }

    #[test]
    fn extraction_is_deterministic() {
        let dictionaries = dictionaries();
        let extractor = ContextLabelExtractor::new(&dictionaries);
        let text = "DrugX versus DrugY: risk of adverse events in a randomized trial.";
        assert_eq!(extractor.extract(text), extractor.extract(text));
    }
}
