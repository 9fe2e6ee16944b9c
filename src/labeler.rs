//! Per-sentence labeling pipeline and batch runner.
//!
//! For one sentence record: extract context labels, evaluate the rule set,
//! assess posture and claim strength, then emit one [`SentenceEvent`] per
//! co-mentioned product pair with directional roles attached. Every step is a
//! pure function of the record, the optional sentiment, and the
//! configuration, so relabeling the same input yields identical events.

use serde::Serialize;

use crate::config::NarrativeConfig;
use crate::context::{ContextLabelExtractor, ContextLabels};
use crate::dictionary::{category, TermMention};
use crate::errors::{RecordError, RecordResult};
use crate::event::{EventStore, SentenceEvent};
use crate::mention::{co_mention_pairs, CoMentionPair, PairProximity, SentenceRecord};
use crate::posture::{PostureAssessment, RiskClaimClassifier, RiskPosture};
use crate::rules::{NarrativeOutcome, RuleContext};
use crate::sentiment::SentimentInput;
use crate::text::SentenceText;

/// Everything derived from one sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSentence {
    pub labels: ContextLabels,
    pub narrative: NarrativeOutcome,
    pub assessment: PostureAssessment,
    /// Canonical indications with the span of their first mention.
    pub indications: Vec<TermMention>,
    /// One event per co-mentioned pair; empty for single-product sentences.
    pub events: Vec<SentenceEvent>,
}

/// Labels sentences against one configuration.
#[derive(Debug, Clone, Copy)]
pub struct SentenceLabeler<'c> {
    config: &'c NarrativeConfig,
}

impl<'c> SentenceLabeler<'c> {
    pub fn new(config: &'c NarrativeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &'c NarrativeConfig {
        self.config
    }

    /// Classify any valid sentence, whether or not it is a co-mention.
    pub fn classify(
        &self,
        record: &SentenceRecord,
        sentiment: Option<&SentimentInput>,
    ) -> RecordResult<LabeledSentence> {
        record.validate()?;
        let sentence = SentenceText::new(&record.text);
        let labels = ContextLabelExtractor::new(&self.config.dictionaries).extract_from(&sentence);
        let indications = self.config.dictionaries.locate(category::INDICATION, &sentence);

        let section = record.canonical_section();
        let context = RuleContext::new(sentiment.map(|s| s.label), section.as_deref());
        let mut narrative = self.config.rules.evaluate(&labels, &context);

        let assessment = RiskClaimClassifier::new(&self.config.posture, &self.config.claim_strength)
            .assess(narrative.narrative_type(), &labels, &sentence);
        if assessment.risk_posture != RiskPosture::Neutral {
            if let Some(subtype) = self.config.posture.subtype_for(assessment.risk_posture) {
                narrative = narrative.with_subtype(subtype);
            }
        }

        let events = if record.distinct_products().len() >= 2 {
            co_mention_pairs(record)?
                .into_iter()
                .map(|pair| {
                    self.build_event(
                        record, &pair, &sentence, &labels, &narrative, &assessment, sentiment,
                    )
                })
                .collect()
        } else {
            Vec::new()
        };

        Ok(LabeledSentence {
            labels,
            narrative,
            assessment,
            indications,
            events,
        })
    }

    /// Label a co-mention sentence, returning its events.
    ///
    /// Fails with [`RecordError::NotACoMention`] for sentences with fewer
    /// than two distinct products.
    pub fn label(
        &self,
        record: &SentenceRecord,
        sentiment: Option<&SentimentInput>,
    ) -> RecordResult<LabeledSentence> {
        record.validate()?;
        let found = record.distinct_products().len();
        if found < 2 {
            return Err(RecordError::NotACoMention {
                sentence_id: record.sentence_id.clone(),
                found,
            });
        }
        self.classify(record, sentiment)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_event(
        &self,
        record: &SentenceRecord,
        pair: &CoMentionPair,
        sentence: &SentenceText<'_>,
        labels: &ContextLabels,
        narrative: &NarrativeOutcome,
        assessment: &PostureAssessment,
        sentiment: Option<&SentimentInput>,
    ) -> SentenceEvent {
        let alias = |product: &str| {
            record
                .mentions_of(product)
                .next()
                .map(|m| m.alias_matched.clone())
                .unwrap_or_default()
        };
        let direction = self.config.directional.assign(
            record,
            pair,
            sentence,
            sentiment.map(|s| s.label),
        );

        SentenceEvent {
            doc_id: record.doc_id.clone(),
            sentence_id: record.sentence_id.clone(),
            section: record.canonical_section(),
            product_a: pair.product_a.clone(),
            product_b: pair.product_b.clone(),
            product_a_alias: alias(&pair.product_a),
            product_b_alias: alias(&pair.product_b),
            count: pair.count,
            proximity: PairProximity::measure(record, pair),
            context: labels.clone(),
            matched_terms: labels.matched_terms(),
            indications: labels.indications().clone(),
            narrative_type: narrative.narrative_type().to_string(),
            narrative_subtype: narrative.narrative_subtype().to_string(),
            narrative_confidence: narrative.confidence(),
            narrative_rule: narrative.rule_name().map(str::to_string),
            risk_posture: assessment.risk_posture,
            claim_strength: assessment.claim_strength,
            posture_terms: assessment.posture_terms.clone(),
            claim_terms: assessment.claim_terms.clone(),
            direction,
            sentiment_label: sentiment.map(|s| s.label),
            sentiment_score: sentiment.and_then(|s| s.score),
            config_version: self.config.version.clone(),
        }
    }

    /// Label a batch, upserting every event into `store`.
    ///
    /// Per-sentence failures are counted and reported in the summary; the
    /// batch always runs to the end.
    pub fn run_batch<'r, I, F, S>(&self, records: I, sentiment: F, store: &mut S) -> RunSummary
    where
        I: IntoIterator<Item = &'r SentenceRecord>,
        F: Fn(&SentenceRecord) -> Option<SentimentInput>,
        S: EventStore + ?Sized,
    {
        let mut summary = RunSummary::default();
        for record in records {
            summary.processed += 1;
            let input = sentiment(record);
            match self.label(record, input.as_ref()) {
                Ok(labeled) => {
                    if labeled.narrative.is_labeled() {
                        summary.labeled += 1;
                    } else {
                        summary.unlabeled += 1;
                    }
                    for event in labeled.events {
                        if store.upsert(event) {
                            summary.events_replaced += 1;
                        }
                        summary.events_written += 1;
                    }
                }
                Err(err) => {
                    tracing::debug!(
                        doc_id = %record.doc_id,
                        sentence_id = %record.sentence_id,
                        error = %err,
                        "skipping sentence"
                    );
                    summary.skipped += 1;
                    summary.errors.push(SkippedSentence {
                        doc_id: record.doc_id.clone(),
                        sentence_id: record.sentence_id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        tracing::info!(
            version = %self.config.version,
            processed = summary.processed,
            labeled = summary.labeled,
            unlabeled = summary.unlabeled,
            skipped = summary.skipped,
            events_written = summary.events_written,
            "narrative labeling run complete"
        );
        summary
    }
}

/// A sentence skipped with an input validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSentence {
    pub doc_id: String,
    pub sentence_id: String,
    pub reason: String,
}

/// Counts reported at the end of a labeling run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub labeled: usize,
    pub unlabeled: usize,
    pub skipped: usize,
    pub events_written: usize,
    pub events_replaced: usize,
    pub errors: Vec<SkippedSentence>,
}
