//! Sentence events: the evidence records this engine writes.
//!
//! One event per `(doc_id, sentence_id, product_a, product_b)`. Events are
//! written with upsert semantics, so relabeling a sentence after a rule
//! change replaces the earlier record rather than adding a second one.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::context::ContextLabels;
use crate::direction::DirectionalAssignment;
use crate::mention::PairProximity;
use crate::posture::{ClaimStrength, RiskPosture};
use crate::sentiment::Sentiment;

/// Composite key of a sentence event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventKey {
    pub doc_id: String,
    pub sentence_id: String,
    pub product_a: String,
    pub product_b: String,
}

/// The evidence record for one co-mentioned pair in one sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceEvent {
    pub doc_id: String,
    pub sentence_id: String,
    pub section: Option<String>,
    pub product_a: String,
    pub product_b: String,
    pub product_a_alias: String,
    pub product_b_alias: String,
    pub count: u32,
    pub proximity: Option<PairProximity>,
    pub context: ContextLabels,
    pub matched_terms: BTreeSet<String>,
    /// Canonical indications named in the sentence.
    pub indications: BTreeSet<String>,
    pub narrative_type: String,
    pub narrative_subtype: String,
    pub narrative_confidence: f64,
    pub narrative_rule: Option<String>,
    pub risk_posture: RiskPosture,
    pub claim_strength: ClaimStrength,
    pub posture_terms: BTreeSet<String>,
    pub claim_terms: BTreeSet<String>,
    pub direction: Option<DirectionalAssignment>,
    pub sentiment_label: Option<Sentiment>,
    pub sentiment_score: Option<f64>,
    /// Version of the configuration that produced the labels.
    pub config_version: String,
}

impl SentenceEvent {
    pub fn key(&self) -> EventKey {
        EventKey {
            doc_id: self.doc_id.clone(),
            sentence_id: self.sentence_id.clone(),
            product_a: self.product_a.clone(),
            product_b: self.product_b.clone(),
        }
    }

    pub fn is_labeled(&self) -> bool {
        self.narrative_rule.is_some()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Write events as JSON Lines, one event per line.
pub fn write_jsonl<'e, W, I>(mut writer: W, events: I) -> serde_json::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'e SentenceEvent>,
{
    for event in events {
        serde_json::to_writer(&mut writer, event)?;
        writer.write_all(b"\n").map_err(serde_json::Error::io)?;
    }
    Ok(())
}

/// Persistence contract for sentence events.
pub trait EventStore {
    /// Insert or replace the event under its key. Returns `true` when an
    /// existing event was replaced.
    fn upsert(&mut self, event: SentenceEvent) -> bool;

    fn get(&self, key: &EventKey) -> Option<&SentenceEvent>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventStore {
    events: BTreeMap<EventKey, SentenceEvent>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events in key order.
    pub fn iter(&self) -> impl Iterator<Item = &SentenceEvent> {
        self.events.values()
    }

    pub fn to_jsonl(&self) -> serde_json::Result<String> {
        let mut buf = Vec::new();
        write_jsonl(&mut buf, self.iter())?;
        String::from_utf8(buf).map_err(|e| {
            serde_json::Error::io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}

impl EventStore for MemoryEventStore {
    fn upsert(&mut self, event: SentenceEvent) -> bool {
        self.events.insert(event.key(), event).is_some()
    }

    fn get(&self, key: &EventKey) -> Option<&SentenceEvent> {
        self.events.get(key)
    }

    fn len(&self) -> usize {
        self.events.len()
    }
}
