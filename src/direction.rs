//! Directional roles for co-mentioned products.
//!
//! Directional patterns are asymmetric relationship phrases ("superior to",
//! "switched from", "added to") with a fixed subject polarity declared in
//! configuration. The product on the subject side of the phrase takes the
//! pattern's `subject_role`; the other product always takes the complement,
//! so one match can never leave both products favored.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dictionary::PhraseSet;
use crate::errors::{ConfigError, ConfigResult};
use crate::mention::{CoMentionPair, SentenceRecord};
use crate::sentiment::Sentiment;
use crate::text::{CharSpan, SentenceText};

/// Kind of directional relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionType {
    /// One product preferred over the other.
    Alternative,
    /// One product added to a backbone therapy.
    AddOn,
    /// Patients moved from one product to the other.
    Switch,
}

impl DirectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectionType::Alternative => "alternative",
            DirectionType::AddOn => "add_on",
            DirectionType::Switch => "switch",
        }
    }
}

impl fmt::Display for DirectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DirectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "alternative" => Ok(DirectionType::Alternative),
            "add_on" => Ok(DirectionType::AddOn),
            "switch" => Ok(DirectionType::Switch),
            other => Err(other.to_string()),
        }
    }
}

/// A product's semantic slot in a directional relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionalRole {
    Favored,
    Disfavored,
    AddOn,
    Backbone,
    SwitchSource,
    SwitchDestination,
}

impl DirectionalRole {
    /// The role the other product of the pair receives.
    pub fn complement(self) -> Self {
        match self {
            DirectionalRole::Favored => DirectionalRole::Disfavored,
            DirectionalRole::Disfavored => DirectionalRole::Favored,
            DirectionalRole::AddOn => DirectionalRole::Backbone,
            DirectionalRole::Backbone => DirectionalRole::AddOn,
            DirectionalRole::SwitchSource => DirectionalRole::SwitchDestination,
            DirectionalRole::SwitchDestination => DirectionalRole::SwitchSource,
        }
    }

    pub fn direction(self) -> DirectionType {
        match self {
            DirectionalRole::Favored | DirectionalRole::Disfavored => DirectionType::Alternative,
            DirectionalRole::AddOn | DirectionalRole::Backbone => DirectionType::AddOn,
            DirectionalRole::SwitchSource | DirectionalRole::SwitchDestination => {
                DirectionType::Switch
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectionalRole::Favored => "favored",
            DirectionalRole::Disfavored => "disfavored",
            DirectionalRole::AddOn => "add_on",
            DirectionalRole::Backbone => "backbone",
            DirectionalRole::SwitchSource => "switch_source",
            DirectionalRole::SwitchDestination => "switch_destination",
        }
    }
}

impl fmt::Display for DirectionalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DirectionalRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "favored" | "favoured" => Ok(DirectionalRole::Favored),
            "disfavored" | "disfavoured" => Ok(DirectionalRole::Disfavored),
            "add_on" => Ok(DirectionalRole::AddOn),
            "backbone" => Ok(DirectionalRole::Backbone),
            "switch_source" => Ok(DirectionalRole::SwitchSource),
            "switch_destination" => Ok(DirectionalRole::SwitchDestination),
            other => Err(other.to_string()),
        }
    }
}

/// Where the subject and object sit relative to the phrase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// `SUBJECT phrase OBJECT`: "A is superior to B".
    #[default]
    Between,
    /// `phrase SUBJECT ... OBJECT`: "switched to A from B".
    Following,
    /// `SUBJECT ... OBJECT phrase`: "A and B, the former preferred".
    Preceding,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "between" => Ok(MatchMode::Between),
            "following" => Ok(MatchMode::Following),
            "preceding" => Ok(MatchMode::Preceding),
            other => Err(other.to_string()),
        }
    }
}

/// A configured directional relationship phrase group.
#[derive(Debug, Clone)]
pub struct DirectionalPattern {
    pub name: String,
    pub direction: DirectionType,
    /// Role of the product on the subject side of the phrase.
    pub subject_role: DirectionalRole,
    pub priority: i64,
    pub phrases: PhraseSet,
    pub mode: MatchMode,
    /// When non-empty, only applies under one of these sentiments.
    pub sentiment: BTreeSet<Sentiment>,
    /// Lowercased text that voids a match when it directly precedes the
    /// phrase, e.g. "non-" before "inferior to".
    pub exclude_prefixes: Vec<String>,
}

impl DirectionalPattern {
    pub fn new<I, S>(
        name: &str,
        subject_role: DirectionalRole,
        priority: i64,
        phrases: I,
    ) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = PhraseSet::new(phrases, name)?;
        if phrases.is_empty() {
            return Err(ConfigError::MissingField {
                context: name.to_string(),
                field: "phrases".to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            direction: subject_role.direction(),
            subject_role,
            priority,
            phrases,
            mode: MatchMode::Between,
            sentiment: BTreeSet::new(),
            exclude_prefixes: Vec::new(),
        })
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment.insert(sentiment);
        self
    }

    pub fn with_exclude_prefixes<I, S>(mut self, prefixes: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for prefix in prefixes {
            // trailing spaces are significant: "non " differs from "non"
            let prefix = prefix.as_ref().trim_start().to_lowercase();
            if prefix.trim().is_empty() {
                return Err(ConfigError::EmptyPhrase {
                    context: format!("{} exclude_prefixes", self.name),
                });
            }
            if !self.exclude_prefixes.contains(&prefix) {
                self.exclude_prefixes.push(prefix);
            }
        }
        Ok(self)
    }

    /// True when an exclusion prefix ends right where the phrase starts and
    /// itself starts on a word boundary.
    fn is_excluded_at(&self, sentence: &SentenceText<'_>, phrase_start: usize) -> bool {
        let head = &sentence.as_str()[..phrase_start];
        self.exclude_prefixes.iter().any(|prefix| {
            let Some(start) = head.len().checked_sub(prefix.len()) else {
                return false;
            };
            head.is_char_boundary(start)
                && head[start..].to_lowercase() == *prefix
                && sentence.is_word_aligned(start, phrase_start)
        })
    }

    /// Ensure the subject role belongs to the declared direction.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.subject_role.direction() != self.direction {
            return Err(ConfigError::RoleMismatch {
                pattern: self.name.clone(),
                direction: self.direction.to_string(),
                role: self.subject_role.to_string(),
            });
        }
        Ok(())
    }

    fn applies_under(&self, sentiment: Option<Sentiment>) -> bool {
        self.sentiment.is_empty() || sentiment.is_some_and(|s| self.sentiment.contains(&s))
    }
}

/// The roles assigned to both products of a pair by one pattern match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionalAssignment {
    pub pattern: String,
    pub direction: DirectionType,
    pub product_a_role: DirectionalRole,
    pub product_b_role: DirectionalRole,
    /// The phrase that triggered the assignment.
    pub trigger: String,
}

impl DirectionalAssignment {
    pub fn role_of(&self, product_is_a: bool) -> DirectionalRole {
        if product_is_a {
            self.product_a_role
        } else {
            self.product_b_role
        }
    }
}

/// Validated directional patterns, sorted by ascending priority.
#[derive(Debug, Clone, Default)]
pub struct DirectionalRoleAssigner {
    patterns: Vec<DirectionalPattern>,
}

impl DirectionalRoleAssigner {
    pub fn new(mut patterns: Vec<DirectionalPattern>) -> ConfigResult<Self> {
        patterns.sort_by_key(|p| p.priority);
        for pattern in &patterns {
            pattern.validate()?;
        }
        for window in patterns.windows(2) {
            if window[0].priority == window[1].priority {
                return Err(ConfigError::DuplicateDirectionalPriority {
                    priority: window[0].priority,
                    first: window[0].name.clone(),
                    second: window[1].name.clone(),
                });
            }
        }
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[DirectionalPattern] {
        &self.patterns
    }

    /// Assign roles to a co-mentioned pair.
    ///
    /// Patterns are tried in priority order and each pattern's phrase
    /// occurrences in text order; the first occurrence that places one
    /// product on the subject side and the other on the object side wins.
    /// `None` when no directional phrase resolves.
    pub fn assign(
        &self,
        record: &SentenceRecord,
        pair: &CoMentionPair,
        sentence: &SentenceText<'_>,
        sentiment: Option<Sentiment>,
    ) -> Option<DirectionalAssignment> {
        let spans_a = mention_spans(record, &pair.product_a);
        let spans_b = mention_spans(record, &pair.product_b);
        if spans_a.is_empty() || spans_b.is_empty() {
            return None;
        }

        for pattern in &self.patterns {
            if !pattern.applies_under(sentiment) {
                continue;
            }
            let mut occurrences: Vec<(CharSpan, &str)> = pattern
                .phrases
                .iter()
                .flat_map(|phrase| {
                    phrase
                        .find_in(sentence)
                        .into_iter()
                        .filter(move |&(start, _)| !pattern.is_excluded_at(sentence, start))
                        .map(move |(start, end)| (sentence.char_span(start, end), phrase.as_str()))
                })
                .collect();
            occurrences.sort();

            for (span, trigger) in occurrences {
                let Some(subject_is_a) = resolve_subject(pattern.mode, span, &spans_a, &spans_b)
                else {
                    continue;
                };
                let subject = pattern.subject_role;
                let (product_a_role, product_b_role) = if subject_is_a {
                    (subject, subject.complement())
                } else {
                    (subject.complement(), subject)
                };
                return Some(DirectionalAssignment {
                    pattern: pattern.name.clone(),
                    direction: pattern.direction,
                    product_a_role,
                    product_b_role,
                    trigger: trigger.to_string(),
                });
            }
        }
        None
    }
}

fn mention_spans(record: &SentenceRecord, product: &str) -> Vec<CharSpan> {
    record
        .mentions_of(product)
        .map(|m| CharSpan {
            start: m.start_char,
            end: m.end_char,
        })
        .collect()
}

/// Decide which product is the subject for one phrase occurrence.
///
/// Returns `Some(true)` when product A is the subject. Mentions overlapping
/// the phrase are ignored.
fn resolve_subject(
    mode: MatchMode,
    phrase: CharSpan,
    spans_a: &[CharSpan],
    spans_b: &[CharSpan],
) -> Option<bool> {
    let before = |spans: &[CharSpan]| -> Option<usize> {
        spans.iter().filter(|s| s.end <= phrase.start).map(|s| s.end).max()
    };
    let earliest_before = |spans: &[CharSpan]| -> Option<usize> {
        spans.iter().filter(|s| s.end <= phrase.start).map(|s| s.start).min()
    };
    let after = |spans: &[CharSpan]| -> Option<usize> {
        spans.iter().filter(|s| s.start >= phrase.end).map(|s| s.start).min()
    };

    match mode {
        MatchMode::Between => {
            // (subject distance, object distance) for each orientation
            let a_subject = before(spans_a)
                .zip(after(spans_b))
                .map(|(s, o)| (phrase.start - s, o - phrase.end));
            let b_subject = before(spans_b)
                .zip(after(spans_a))
                .map(|(s, o)| (phrase.start - s, o - phrase.end));
            match (a_subject, b_subject) {
                (Some(a), Some(b)) => Some(a <= b),
                (Some(_), None) => Some(true),
                (None, Some(_)) => Some(false),
                (None, None) => None,
            }
        }
        MatchMode::Following => {
            let (a, b) = (after(spans_a)?, after(spans_b)?);
            Some(a <= b)
        }
        MatchMode::Preceding => {
            let (a, b) = (earliest_before(spans_a)?, earliest_before(spans_b)?);
            Some(a <= b)
        }
    }
}
