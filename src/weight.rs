//! Document weights and per-event evidence scores.
//!
//! A document's weight combines how recent it is (exponential decay with a
//! configurable half-life) with the weight of its study design. An event's
//! evidence weight scales that document weight by the pair's mention count,
//! which is what evidence lists are ranked by.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, ConfigResult};
use crate::event::SentenceEvent;
use crate::scored::Scored;

pub const DEFAULT_HALF_LIFE_DAYS: u32 = 365;

/// Study type used when no publication type has a configured weight.
pub const OTHER_STUDY_TYPE: &str = "other";

/// Publication-type spellings folded into one canonical study type.
const STUDY_TYPE_ALIASES: &[(&str, &str)] = &[
    ("randomised controlled trial", "randomized controlled trial"),
    ("controlled clinical trial", "clinical trial"),
    ("case reports", "case report"),
    ("systematic review", "review"),
    ("meta-analysis", "review"),
    ("cohort study", "observational study"),
    ("case-control study", "observational study"),
];

/// Lowercase, collapse whitespace and fold known aliases.
pub fn canonical_study_type(raw: &str) -> String {
    let normalized = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    STUDY_TYPE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(normalized)
}

/// Exponential-decay recency score.
///
/// 1.0 on or after the reference date and 0.5 one half-life before it. An
/// unknown publication date scores 0.0.
pub fn recency_weight(
    published: Option<NaiveDate>,
    reference: NaiveDate,
    half_life_days: u32,
) -> f64 {
    let Some(published) = published else {
        return 0.0;
    };
    let age_days = (reference - published).num_days();
    if age_days <= 0 {
        return 1.0;
    }
    let decay = std::f64::consts::LN_2 / f64::from(half_life_days.max(1));
    (-decay * age_days as f64).exp()
}

/// Configured weight per canonical study type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudyTypeWeights {
    weights: BTreeMap<String, f64>,
}

impl StudyTypeWeights {
    pub fn new<I, S>(entries: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut weights = BTreeMap::new();
        for (study_type, weight) in entries {
            let study_type = canonical_study_type(study_type.as_ref());
            if study_type.is_empty() {
                return Err(ConfigError::EmptyPhrase {
                    context: "weights.study_types".to_string(),
                });
            }
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    field: format!("weights.study_types.{}", study_type),
                    value: weight,
                });
            }
            weights.insert(study_type, weight);
        }
        Ok(Self { weights })
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn get(&self, study_type: &str) -> Option<f64> {
        self.weights.get(&canonical_study_type(study_type)).copied()
    }

    /// The highest-weighted study type among a document's publication types.
    ///
    /// Ties keep the type listed first. When no type is weighted the `other`
    /// entry is used, if configured.
    pub fn classify<I, S>(&self, publication_types: I) -> Option<(String, f64)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut best: Option<(String, f64)> = None;
        for raw in publication_types {
            let canonical = canonical_study_type(raw.as_ref());
            let Some(&weight) = self.weights.get(&canonical) else {
                continue;
            };
            if best.as_ref().map_or(true, |(_, current)| weight > *current) {
                best = Some((canonical, weight));
            }
        }
        best.or_else(|| {
            self.weights
                .get(OTHER_STUDY_TYPE)
                .map(|&weight| (OTHER_STUDY_TYPE.to_string(), weight))
        })
    }
}

/// Recency and study-type weighting settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightConfig {
    pub half_life_days: u32,
    pub study_types: StudyTypeWeights,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            half_life_days: DEFAULT_HALF_LIFE_DAYS,
            study_types: StudyTypeWeights::default(),
        }
    }
}

impl WeightConfig {
    pub fn new(half_life_days: u32, study_types: StudyTypeWeights) -> ConfigResult<Self> {
        if half_life_days == 0 {
            return Err(ConfigError::InvalidWeight {
                field: "half_life_days".to_string(),
                value: 0.0,
            });
        }
        Ok(Self {
            half_life_days,
            study_types,
        })
    }

    /// Weigh one document as of `reference`.
    pub fn document_weight(
        &self,
        document: &DocumentMetadata,
        reference: NaiveDate,
    ) -> DocumentWeight {
        let recency = recency_weight(document.publication_date, reference, self.half_life_days);
        if document.publication_date.is_none() {
            tracing::debug!(doc_id = %document.doc_id, "undated document; recency weight is 0");
        }
        let (study_type, study_type_weight) =
            match self.study_types.classify(&document.publication_types) {
                Some((study_type, weight)) => (Some(study_type), Some(weight)),
                None => (None, None),
            };
        DocumentWeight {
            doc_id: document.doc_id.clone(),
            recency_weight: recency,
            study_type,
            study_type_weight,
        }
    }
}

/// Bibliographic facts a document weight is computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub doc_id: String,
    #[serde(default)]
    pub publication_date: Option<NaiveDate>,
    /// Raw publication type labels, e.g. "Randomized Controlled Trial".
    #[serde(default)]
    pub publication_types: Vec<String>,
}

impl DocumentMetadata {
    pub fn new(doc_id: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            publication_date: None,
            publication_types: Vec::new(),
        }
    }

    pub fn published(mut self, date: NaiveDate) -> Self {
        self.publication_date = Some(date);
        self
    }

    pub fn with_publication_type(mut self, publication_type: impl Into<String>) -> Self {
        self.publication_types.push(publication_type.into());
        self
    }
}

/// Recency and study-type weight of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentWeight {
    pub doc_id: String,
    pub recency_weight: f64,
    pub study_type: Option<String>,
    pub study_type_weight: Option<f64>,
}

impl DocumentWeight {
    /// Recency scaled by the study-type weight, when there is one.
    pub fn combined_weight(&self) -> f64 {
        self.recency_weight * self.study_type_weight.unwrap_or(1.0)
    }
}

// ============================================================================
// Evidence scoring
// ============================================================================

/// How an event's evidence weight was put together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBreakdown {
    pub recency_weight: Option<f64>,
    pub study_type: Option<String>,
    pub study_type_weight: Option<f64>,
    pub mention_count: u32,
    pub combined_weight: f64,
    /// `combined_weight` times `mention_count`.
    pub evidence_weight: f64,
}

impl SentenceEvent {
    /// Score this event as evidence.
    ///
    /// Without a document weight the combined weight is 1.0. The returned
    /// confidence is the narrative confidence scaled by the combined weight
    /// (clamped to `[0, 1]`), attributed to the narrative rule.
    pub fn evidence(&self, document: Option<&DocumentWeight>) -> Scored<EvidenceBreakdown> {
        let mention_count = self.count.max(1);
        let combined_weight = document.map_or(1.0, DocumentWeight::combined_weight);
        let breakdown = EvidenceBreakdown {
            recency_weight: document.map(|d| d.recency_weight),
            study_type: document.and_then(|d| d.study_type.clone()),
            study_type_weight: document.and_then(|d| d.study_type_weight),
            mention_count,
            combined_weight,
            evidence_weight: combined_weight * f64::from(mention_count),
        };
        Scored::weighted(
            breakdown,
            self.narrative_confidence,
            self.narrative_rule.as_deref(),
            combined_weight,
        )
    }
}

/// The `limit` heaviest pieces of evidence, heaviest first.
///
/// Events are looked up in `weights` by document id. Equal weights keep
/// event key order. At least one event is returned when any are given.
pub fn rank_evidence<'e, I>(
    events: I,
    weights: &BTreeMap<String, DocumentWeight>,
    limit: usize,
) -> Vec<(&'e SentenceEvent, Scored<EvidenceBreakdown>)>
where
    I: IntoIterator<Item = &'e SentenceEvent>,
{
    let mut ranked: Vec<(&SentenceEvent, Scored<EvidenceBreakdown>)> = events
        .into_iter()
        .map(|event| (event, event.evidence(weights.get(&event.doc_id))))
        .collect();
    ranked.sort_by(|(a, a_score), (b, b_score)| {
        b_score
            .value
            .evidence_weight
            .total_cmp(&a_score.value.evidence_weight)
            .then_with(|| a.key().cmp(&b.key()))
    });
    ranked.truncate(limit.max(1));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NarrativeConfig, ScoreSource, SentenceLabeler, SentenceRecord};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weights() -> StudyTypeWeights {
        StudyTypeWeights::new([
            ("clinical trial", 1.4),
            ("Randomized Controlled Trial", 1.6),
            ("review", 0.9),
            ("other", 1.0),
        ])
        .unwrap()
    }

    fn events(doc_id: &str, text: &str) -> Vec<SentenceEvent> {
        let config = NarrativeConfig::bundled().unwrap();
        let sentence_id = format!("{}:sec:results:sent:0", doc_id);
        let record = SentenceRecord::new(doc_id, &sentence_id, text)
            .with_section("Results")
            .mentioning("drugx", "DrugX")
            .mentioning("drugy", "DrugY")
            .mentioning("drugx", "DrugX")
            .mentioning("drugy", "DrugY");
        SentenceLabeler::new(&config)
            .label(&record, None)
            .unwrap()
            .events
    }

    #[test]
    fn recency_halves_every_half_life() {
        let today = date(2024, 1, 1);
        assert_eq!(recency_weight(Some(today), today, 365), 1.0);
        assert_eq!(recency_weight(Some(date(2024, 6, 1)), today, 365), 1.0);
        let year_ago = recency_weight(Some(date(2023, 1, 1)), today, 365);
        assert!((year_ago - 0.5).abs() < 1e-9);
        let two_years = recency_weight(Some(date(2022, 1, 1)), today, 365);
        assert!((two_years - 0.25).abs() < 1e-3);
        assert_eq!(recency_weight(None, today, 365), 0.0);
    }

    #[test]
    fn highest_weighted_publication_type_wins() {
        let weights = weights();
        assert_eq!(
            weights.classify([
                "Journal Article",
                "Randomised Controlled Trial",
                "Systematic Review"
            ]),
            Some(("randomized controlled trial".to_string(), 1.6))
        );
        assert_eq!(
            weights.classify(["Editorial"]),
            Some(("other".to_string(), 1.0))
        );
        assert_eq!(weights.get("meta-analysis"), Some(0.9));

        let no_fallback = StudyTypeWeights::new([("review", 0.9)]).unwrap();
        assert_eq!(no_fallback.classify(["Editorial"]), None);
    }

    #[test]
    fn negative_weights_and_zero_half_life_are_rejected() {
        assert!(matches!(
            StudyTypeWeights::new([("review", -0.1)]),
            Err(ConfigError::InvalidWeight { ref field, .. })
                if field == "weights.study_types.review"
        ));
        assert!(matches!(
            WeightConfig::new(0, weights()),
            Err(ConfigError::InvalidWeight { ref field, .. }) if field == "half_life_days"
        ));
    }

    #[test]
    fn document_weight_combines_recency_and_study_type() {
        let config = WeightConfig::new(365, weights()).unwrap();
        let document = DocumentMetadata::new("doc-1")
            .published(date(2024, 1, 1))
            .with_publication_type("Randomized Controlled Trial");
        let weight = config.document_weight(&document, date(2024, 1, 1));
        assert_eq!(weight.study_type.as_deref(), Some("randomized controlled trial"));
        assert_eq!(weight.recency_weight, 1.0);
        assert!((weight.combined_weight() - 1.6).abs() < 1e-9);

        let undated = config.document_weight(&DocumentMetadata::new("doc-2"), date(2024, 1, 1));
        assert_eq!(undated.recency_weight, 0.0);
        assert_eq!(undated.study_type.as_deref(), Some("other"));
        assert_eq!(undated.combined_weight(), 0.0);
    }

    #[test]
    fn evidence_scales_by_mention_count_and_keeps_the_rule() {
        let events = events("doc-1", "DrugX was superior to DrugY, and DrugX beat DrugY again.");
        let event = &events[0];
        assert_eq!(event.count, 2);

        let document = DocumentWeight {
            doc_id: "doc-1".to_string(),
            recency_weight: 0.5,
            study_type: Some("clinical trial".to_string()),
            study_type_weight: Some(1.4),
        };
        let scored = event.evidence(Some(&document));
        let ScoreSource::Weighted { weight, .. } = &scored.source else {
            panic!("expected a weighted score, got {:?}", scored.source);
        };
        assert!((weight - 0.7).abs() < 1e-9);
        assert!(event.narrative_rule.is_some());
        assert_eq!(scored.rule_name(), event.narrative_rule.as_deref());
        assert_eq!(scored.value.mention_count, 2);
        assert!((scored.value.combined_weight - 0.7).abs() < 1e-9);
        assert!((scored.value.evidence_weight - 1.4).abs() < 1e-9);
        assert!((scored.confidence - event.narrative_confidence * 0.7).abs() < 1e-9);

        let unweighted = event.evidence(None);
        assert_eq!(unweighted.value.combined_weight, 1.0);
        assert_eq!(unweighted.value.recency_weight, None);
        assert_eq!(unweighted.value.evidence_weight, 2.0);
    }

    #[test]
    fn ranking_puts_heaviest_evidence_first() {
        let old = events("doc-old", "DrugX was superior to DrugY, and DrugX beat DrugY again.");
        let new = events("doc-new", "DrugX was superior to DrugY, and DrugX beat DrugY again.");
        let weights: BTreeMap<String, DocumentWeight> = [("doc-old", 0.25), ("doc-new", 0.9)]
            .into_iter()
            .map(|(doc_id, recency_weight)| {
                let weight = DocumentWeight {
                    doc_id: doc_id.to_string(),
                    recency_weight,
                    study_type: None,
                    study_type_weight: None,
                };
                (doc_id.to_string(), weight)
            })
            .collect();

        let ranked = rank_evidence(old.iter().chain(new.iter()), &weights, 5);
        let order: Vec<&str> = ranked.iter().map(|(e, _)| e.doc_id.as_str()).collect();
        assert_eq!(order, vec!["doc-new", "doc-old"]);
        assert_eq!(rank_evidence(old.iter().chain(new.iter()), &weights, 0).len(), 1);
    }
}
