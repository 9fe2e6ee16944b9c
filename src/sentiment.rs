//! Sentiment labels consumed from the external sentiment pass.
//!
//! The engine never infers sentiment. It only reads a label that a later pass
//! attached to the sentence, and accepts the short codes that pass writes
//! (`POS`, `NEG`, `NEU`) as well as the long forms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sentence-level sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not a recognised sentiment label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSentiment(pub String);

impl FromStr for Sentiment {
    type Err = UnknownSentiment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pos" | "positive" => Ok(Sentiment::Positive),
            "neg" | "negative" => Ok(Sentiment::Negative),
            "neu" | "neutral" => Ok(Sentiment::Neutral),
            _ => Err(UnknownSentiment(s.to_string())),
        }
    }
}

/// A sentiment label plus the score the sentiment pass assigned to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentInput {
    pub label: Sentiment,
    #[serde(default)]
    pub score: Option<f64>,
}

impl SentimentInput {
    pub fn new(label: Sentiment) -> Self {
        Self { label, score: None }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}
