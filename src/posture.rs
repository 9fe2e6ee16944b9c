//! Risk posture and claim strength.
//!
//! A secondary, deterministic layer over the narrative label. Posture only
//! applies to safety-family narratives; claim strength is computed for every
//! sentence from study-design phrases.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::ContextLabels;
use crate::dictionary::PhraseSet;
use crate::text::SentenceText;

/// How a safety-family sentence frames risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskPosture {
    /// Risk stated with neutral framing.
    Acknowledgment,
    /// Explicit reassurance about safety.
    Reassurance,
    /// Risk mentioned alongside softening language.
    Minimization,
    /// Not a safety-family sentence.
    Neutral,
}

impl RiskPosture {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskPosture::Acknowledgment => "acknowledgment",
            RiskPosture::Reassurance => "reassurance",
            RiskPosture::Minimization => "minimization",
            RiskPosture::Neutral => "neutral",
        }
    }
}

impl fmt::Display for RiskPosture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskPosture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "acknowledgment" | "acknowledgement" => Ok(RiskPosture::Acknowledgment),
            "reassurance" => Ok(RiskPosture::Reassurance),
            "minimization" | "minimisation" => Ok(RiskPosture::Minimization),
            "neutral" => Ok(RiskPosture::Neutral),
            other => Err(other.to_string()),
        }
    }
}

/// Evidentiary weight of a sentence's study context.
///
/// Ordered: `Exploratory < Suggestive < Confirmatory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStrength {
    Exploratory,
    Suggestive,
    Confirmatory,
}

impl ClaimStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStrength::Exploratory => "exploratory",
            ClaimStrength::Suggestive => "suggestive",
            ClaimStrength::Confirmatory => "confirmatory",
        }
    }
}

impl fmt::Display for ClaimStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Posture phrase lists and the safety-family narrative types.
#[derive(Debug, Clone, Default)]
pub struct PostureConfig {
    pub safety_types: BTreeSet<String>,
    pub minimization: PhraseSet,
    pub reassurance: PhraseSet,
    /// Narrative subtype to use for a sentence with a given posture.
    pub subtypes: BTreeMap<RiskPosture, String>,
}

impl PostureConfig {
    pub fn is_safety_family(&self, narrative_type: &str) -> bool {
        self.safety_types.contains(narrative_type)
    }

    /// Classify posture, returning the phrases that decided it.
    ///
    /// Precedence is fixed: minimization (risk terms plus a softening phrase,
    /// even when reassurance phrases are also present), then reassurance,
    /// then acknowledgment.
    pub fn classify(
        &self,
        narrative_type: &str,
        labels: &ContextLabels,
        sentence: &SentenceText<'_>,
    ) -> (RiskPosture, BTreeSet<String>) {
        if !self.is_safety_family(narrative_type) {
            return (RiskPosture::Neutral, BTreeSet::new());
        }
        let softening = self.minimization.matches_in(sentence);
        if !labels.risk_terms().is_empty() && !softening.is_empty() {
            return (RiskPosture::Minimization, softening);
        }
        let reassuring = self.reassurance.matches_in(sentence);
        if !reassuring.is_empty() {
            return (RiskPosture::Reassurance, reassuring);
        }
        (RiskPosture::Acknowledgment, BTreeSet::new())
    }

    pub fn subtype_for(&self, posture: RiskPosture) -> Option<&str> {
        self.subtypes.get(&posture).map(String::as_str)
    }
}

/// Study-design phrase lists for the claim strength tiers.
#[derive(Debug, Clone, Default)]
pub struct ClaimStrengthConfig {
    pub confirmatory: PhraseSet,
    pub exploratory: PhraseSet,
    pub suggestive: PhraseSet,
}

impl ClaimStrengthConfig {
    /// Confirmatory phrases are checked first, then exploratory, then
    /// explicit suggestive ones. No match defaults to suggestive.
    pub fn classify(&self, sentence: &SentenceText<'_>) -> (ClaimStrength, BTreeSet<String>) {
        for (strength, phrases) in [
            (ClaimStrength::Confirmatory, &self.confirmatory),
            (ClaimStrength::Exploratory, &self.exploratory),
            (ClaimStrength::Suggestive, &self.suggestive),
        ] {
            let hits = phrases.matches_in(sentence);
            if !hits.is_empty() {
                return (strength, hits);
            }
        }
        (ClaimStrength::Suggestive, BTreeSet::new())
    }
}

/// Posture and claim strength for one sentence, with the phrases behind them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostureAssessment {
    pub risk_posture: RiskPosture,
    pub claim_strength: ClaimStrength,
    pub posture_terms: BTreeSet<String>,
    pub claim_terms: BTreeSet<String>,
}

/// Runs both classifiers over one sentence.
#[derive(Debug, Clone, Copy)]
pub struct RiskClaimClassifier<'c> {
    posture: &'c PostureConfig,
    claim: &'c ClaimStrengthConfig,
}

impl<'c> RiskClaimClassifier<'c> {
    pub fn new(posture: &'c PostureConfig, claim: &'c ClaimStrengthConfig) -> Self {
        Self { posture, claim }
    }

    pub fn assess(
        &self,
        narrative_type: &str,
        labels: &ContextLabels,
        sentence: &SentenceText<'_>,
    ) -> PostureAssessment {
        let (risk_posture, posture_terms) = self.posture.classify(narrative_type, labels, sentence);
        let (claim_strength, claim_terms) = self.claim.classify(sentence);
        PostureAssessment {
            risk_posture,
            claim_strength,
            posture_terms,
            claim_terms,
        }
    }
}
