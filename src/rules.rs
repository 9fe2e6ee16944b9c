//! Narrative rule engine.
//!
//! Rules are data: a list of descriptors loaded from configuration and
//! evaluated by one loop. The list is sorted by priority once, at load time,
//! and the first matching rule wins. Lower priority numbers are evaluated
//! first, and priorities are unique, so the winner never depends on
//! dictionary or map iteration order.
//!
//! # Example
//!
//! ```
//! use layered_narratives::{
//!     ContextLabels, NarrativeRule, RuleContext, RuleSet, TermDictionaries,
//! };
//!
//! let dictionaries = TermDictionaries::new().with_terms("risk", ["risk"]).unwrap();
//! let rules = RuleSet::new(
//!     vec![
//!         NarrativeRule::new("safety_ack", "safety", "risk_signal", 1, 0.9).requires_any("risk"),
//!     ],
//!     &dictionaries,
//! )
//! .unwrap();
//!
//! let labels = ContextLabels::default().with("risk", ["risk"]);
//! let outcome = rules.evaluate(&labels, &RuleContext::default());
//! assert_eq!(outcome.narrative_subtype(), "risk_signal");
//! assert_eq!(outcome.confidence(), 0.9);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::context::ContextLabels;
use crate::dictionary::{normalize_phrase, TermDictionaries};
use crate::errors::{ConfigError, ConfigResult};
use crate::mention::canonical_section;
use crate::scored::Scored;
use crate::sentiment::Sentiment;

/// Narrative type and subtype of sentences no rule matched.
pub const UNLABELED: &str = "unlabeled";

/// Wildcard term: the category only has to match something.
pub const ANY_TERM: &str = "*";

// ============================================================================
// Rule descriptors
// ============================================================================

/// One required context signal of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// The category must have at least one match.
    Any { category: String },
    /// At least one of `terms` must be among the category's matched labels
    /// or phrases.
    Terms {
        category: String,
        terms: BTreeSet<String>,
    },
}

impl Requirement {
    pub fn category(&self) -> &str {
        match self {
            Requirement::Any { category } | Requirement::Terms { category, .. } => category,
        }
    }

    fn is_met(&self, labels: &ContextLabels) -> bool {
        match self {
            Requirement::Any { category } => !labels.get(category).is_empty(),
            Requirement::Terms { category, terms } => {
                let found = labels.get(category);
                let phrases = labels.phrases_for(category);
                terms
                    .iter()
                    .any(|term| found.contains(term) || phrases.contains(term))
            }
        }
    }
}

/// A prioritized narrative rule.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeRule {
    pub name: String,
    pub narrative_type: String,
    pub narrative_subtype: String,
    /// Lower values are evaluated first.
    pub priority: i64,
    /// Fixed confidence attached to every sentence this rule labels.
    pub confidence: f64,
    /// Every requirement must be met.
    pub requires: Vec<Requirement>,
    /// When non-empty, the supplied sentiment must be one of these.
    pub sentiment: BTreeSet<Sentiment>,
    /// When non-empty, the sentence's canonical section must be listed.
    pub include_sections: BTreeSet<String>,
    /// The rule never matches sentences in these canonical sections.
    pub exclude_sections: BTreeSet<String>,
}

impl NarrativeRule {
    pub fn new(
        name: impl Into<String>,
        narrative_type: impl Into<String>,
        narrative_subtype: impl Into<String>,
        priority: i64,
        confidence: f64,
    ) -> Self {
        Self {
            name: name.into(),
            narrative_type: narrative_type.into(),
            narrative_subtype: narrative_subtype.into(),
            priority,
            confidence,
            requires: Vec::new(),
            sentiment: BTreeSet::new(),
            include_sections: BTreeSet::new(),
            exclude_sections: BTreeSet::new(),
        }
    }

    /// Require any match in `category`.
    pub fn requires_any(mut self, category: &str) -> Self {
        self.requires.push(Requirement::Any {
            category: category.to_string(),
        });
        self
    }

    /// Require one of `terms` in `category`. A `"*"` term turns the
    /// requirement into [`Requirement::Any`].
    pub fn requires_terms<I, S>(mut self, category: &str, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms: BTreeSet<String> = terms
            .into_iter()
            .map(|t| normalize_phrase(t.as_ref()))
            .collect();
        let requirement = if terms.is_empty() || terms.contains(ANY_TERM) {
            Requirement::Any {
                category: category.to_string(),
            }
        } else {
            Requirement::Terms {
                category: category.to_string(),
                terms,
            }
        };
        self.requires.push(requirement);
        self
    }

    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment.insert(sentiment);
        self
    }

    pub fn include_section(mut self, section: &str) -> Self {
        self.include_sections.insert(canonical_section(section));
        self
    }

    pub fn exclude_section(mut self, section: &str) -> Self {
        self.exclude_sections.insert(canonical_section(section));
        self
    }

    /// Whether the rule matches one sentence's labels and context.
    pub fn matches(&self, labels: &ContextLabels, context: &RuleContext<'_>) -> bool {
        if !self.section_allowed(context.section) {
            return false;
        }
        if !self.sentiment.is_empty() {
            match context.sentiment {
                Some(sentiment) if self.sentiment.contains(&sentiment) => {}
                _ => return false,
            }
        }
        self.requires.iter().all(|req| req.is_met(labels))
    }

    fn section_allowed(&self, section: Option<&str>) -> bool {
        if let Some(section) = section {
            if self.exclude_sections.contains(section) {
                return false;
            }
        }
        if self.include_sections.is_empty() {
            return true;
        }
        section.is_some_and(|s| self.include_sections.contains(s))
    }

    fn validate(&self, dictionaries: &TermDictionaries) -> ConfigResult<()> {
        for (field, value) in [
            ("name", &self.name),
            ("narrative_type", &self.narrative_type),
            ("narrative_subtype", &self.narrative_subtype),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    context: format!("rule with priority {}", self.priority),
                    field: field.to_string(),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ConfigError::ConfidenceOutOfRange {
                rule: self.name.clone(),
                confidence: self.confidence,
            });
        }
        if self.requires.is_empty() {
            return Err(ConfigError::MissingField {
                context: self.name.clone(),
                field: "requires".to_string(),
            });
        }
        for requirement in &self.requires {
            if !dictionaries.has_category(requirement.category()) {
                return Err(ConfigError::UnknownCategory {
                    rule: self.name.clone(),
                    category: requirement.category().to_string(),
                });
            }
            if let Requirement::Terms { category, terms } = requirement {
                if terms.iter().any(String::is_empty) {
                    return Err(ConfigError::EmptyPhrase {
                        context: self.name.clone(),
                    });
                }
                // pattern categories produce free text, so only dictionaries are checked
                if let Some(dictionary) = dictionaries.category(category) {
                    if let Some(term) = terms.iter().find(|term| !dictionary.defines(term)) {
                        return Err(ConfigError::UnknownTerm {
                            rule: self.name.clone(),
                            category: category.clone(),
                            term: term.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Per-sentence inputs besides the context labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleContext<'a> {
    pub sentiment: Option<Sentiment>,
    /// Canonical section name.
    pub section: Option<&'a str>,
}

impl<'a> RuleContext<'a> {
    pub fn new(sentiment: Option<Sentiment>, section: Option<&'a str>) -> Self {
        Self { sentiment, section }
    }
}

/// A narrative type/subtype pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    pub narrative_type: String,
    pub narrative_subtype: String,
}

/// Result of evaluating the rule set on one sentence.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrativeOutcome {
    /// A rule matched; confidence and rule name come from it.
    Labeled(Scored<Narrative>),
    /// No rule matched. Not an error.
    Unlabeled,
}

impl NarrativeOutcome {
    pub fn is_labeled(&self) -> bool {
        matches!(self, NarrativeOutcome::Labeled(_))
    }

    pub fn narrative_type(&self) -> &str {
        match self {
            NarrativeOutcome::Labeled(scored) => &scored.value.narrative_type,
            NarrativeOutcome::Unlabeled => UNLABELED,
        }
    }

    pub fn narrative_subtype(&self) -> &str {
        match self {
            NarrativeOutcome::Labeled(scored) => &scored.value.narrative_subtype,
            NarrativeOutcome::Unlabeled => UNLABELED,
        }
    }

    /// Rule confidence, or 0 when unlabeled.
    pub fn confidence(&self) -> f64 {
        match self {
            NarrativeOutcome::Labeled(scored) => scored.confidence,
            NarrativeOutcome::Unlabeled => 0.0,
        }
    }

    pub fn rule_name(&self) -> Option<&str> {
        match self {
            NarrativeOutcome::Labeled(scored) => scored.rule_name(),
            NarrativeOutcome::Unlabeled => None,
        }
    }

    /// Replace the subtype, keeping type, confidence and rule attribution.
    pub fn with_subtype(self, subtype: &str) -> Self {
        match self {
            NarrativeOutcome::Labeled(scored) => NarrativeOutcome::Labeled(scored.map(|n| {
                Narrative {
                    narrative_type: n.narrative_type,
                    narrative_subtype: subtype.to_string(),
                }
            })),
            NarrativeOutcome::Unlabeled => NarrativeOutcome::Unlabeled,
        }
    }
}

/// A validated rule list, sorted by ascending priority.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<NarrativeRule>,
}

impl RuleSet {
    /// Validate rules against the dictionaries and sort them by priority.
    ///
    /// Fails on an empty list, duplicate names or priorities, unknown
    /// categories, empty terms, and confidences outside `[0, 1]`.
    pub fn new(
        mut rules: Vec<NarrativeRule>,
        dictionaries: &TermDictionaries,
    ) -> ConfigResult<Self> {
        if rules.is_empty() {
            return Err(ConfigError::NoRules);
        }
        let mut names = BTreeSet::new();
        let mut priorities: BTreeMap<i64, &str> = BTreeMap::new();
        for rule in &rules {
            rule.validate(dictionaries)?;
            if !names.insert(rule.name.as_str()) {
                return Err(ConfigError::DuplicateRuleName {
                    name: rule.name.clone(),
                });
            }
            if let Some(first) = priorities.insert(rule.priority, &rule.name) {
                return Err(ConfigError::DuplicatePriority {
                    priority: rule.priority,
                    first: first.to_string(),
                    second: rule.name.clone(),
                });
            }
        }
        rules.sort_by_key(|rule| rule.priority);
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &NarrativeRule> {
        self.rules.iter()
    }

    pub fn get(&self, name: &str) -> Option<&NarrativeRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    /// The first matching rule's narrative, or [`NarrativeOutcome::Unlabeled`].
    pub fn evaluate(&self, labels: &ContextLabels, context: &RuleContext<'_>) -> NarrativeOutcome {
        self.rules
            .iter()
            .find(|rule| rule.matches(labels, context))
            .map(|rule| {
                NarrativeOutcome::Labeled(Scored::from_rule(
                    Narrative {
                        narrative_type: rule.narrative_type.clone(),
                        narrative_subtype: rule.narrative_subtype.clone(),
                    },
                    rule.confidence,
                    &rule.name,
                ))
            })
            .unwrap_or(NarrativeOutcome::Unlabeled)
    }
}
