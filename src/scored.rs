//! Confidence-carrying values.
//!
//! A narrative label carries the fixed confidence of the rule that fired. An
//! evidence score rescales that confidence by a document weight and keeps
//! both the rule name and the weight, so every exported number can be traced
//! back to configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A value with a confidence in `[0, 1]` and its provenance.
///
/// # Example
/// ```
/// use layered_narratives::{Scored, ScoreSource};
///
/// let label = Scored::from_rule("safety", 0.9, "safety_ack");
/// assert_eq!(label.rule_name(), Some("safety_ack"));
///
/// let evidence = Scored::weighted("safety", label.confidence, label.rule_name(), 0.5);
/// assert_eq!(evidence.confidence, 0.45);
/// assert_eq!(evidence.rule_name(), Some("safety_ack"));
/// assert!(matches!(evidence.source, ScoreSource::Weighted { weight, .. } if weight == 0.5));
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct Scored<T> {
    pub value: T,
    pub confidence: f64,
    pub source: ScoreSource,
}

/// Where a confidence came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreSource {
    /// Fixed by a configured narrative rule.
    Rule { rule_name: String },
    /// A rule confidence multiplied by an evidence weight. `rule_name` is
    /// `None` for unlabeled sentences.
    Weighted {
        rule_name: Option<String>,
        weight: f64,
    },
}

impl<T> Scored<T> {
    pub fn from_rule(value: T, confidence: f64, rule_name: &str) -> Self {
        Self {
            value,
            confidence: confidence.clamp(0.0, 1.0),
            source: ScoreSource::Rule {
                rule_name: rule_name.to_string(),
            },
        }
    }

    /// `base * weight`, clamped to `[0, 1]`.
    pub fn weighted(value: T, base: f64, rule_name: Option<&str>, weight: f64) -> Self {
        Self {
            value,
            confidence: (base * weight).clamp(0.0, 1.0),
            source: ScoreSource::Weighted {
                rule_name: rule_name.map(str::to_string),
                weight,
            },
        }
    }

    /// The narrative rule behind this score, if any.
    pub fn rule_name(&self) -> Option<&str> {
        match &self.source {
            ScoreSource::Rule { rule_name } => Some(rule_name),
            ScoreSource::Weighted { rule_name, .. } => rule_name.as_deref(),
        }
    }

    /// Replace the value; confidence and provenance stay.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Scored<U> {
        Scored {
            value: f(self.value),
            confidence: self.confidence,
            source: self.source,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Scored<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Scored(value, conf: 0.85)
        write!(f, "Scored({:?}, conf: {:.2})", self.value, self.confidence)
    }
}

impl<T: PartialEq> PartialEq for Scored<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
            && (self.confidence - other.confidence).abs() < f64::EPSILON
            && self.source == other.source
    }
}
