//! Declarative sentence fixtures.
//!
//! A fixture is a TOML document holding sentences, the products they
//! mention, and the labels the pipeline is expected to produce:
//!
//! ```toml
//! title = "Comparative narratives"
//!
//! [[sentence]]
//! id = "superior"
//! text = "DrugX was superior to DrugY for reducing mortality."
//! section = "Results"
//! sentiment = "POS"
//! mentions = { drugx = "DrugX", drugy = "DrugY" }
//!
//! [sentence.expect]
//! narrative_subtype = "comparative_efficacy_advantage"
//! roles = { drugx = "favored", drugy = "disfavored" }
//! ```
//!
//! `direction` and `roles` apply to every product pair in the sentence. A
//! sentence naming three or more products can pin each pair separately:
//!
//! ```toml
//! [[sentence.expect.pair]]
//! products = ["drugy", "drugz"]
//! direction = "inferior_to"
//! roles = { drugy = "favored", drugz = "disfavored" }
//! ```
//!
//! Every expectation is optional; only the fields present are checked.

use std::collections::BTreeMap;

use layered_narratives::{canonical_product, Sentiment, SentenceRecord, SentimentInput};
use serde::{Deserialize, Serialize};

use crate::errors::{SpecError, SpecResult};

/// A parsed fixture document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NarrativeFixture {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "sentence")]
    pub sentences: Vec<FixtureSentence>,
}

/// One sentence with its mentions and expectations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureSentence {
    /// Identifier, unique within the fixture. Used in failure references.
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    /// Canonical product name to the alias as written in `text`. Every
    /// occurrence of the alias is recorded as a mention.
    #[serde(default)]
    pub mentions: BTreeMap<String, String>,
    #[serde(default)]
    pub expect: Expectation,
}

/// Expected labels for a sentence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    pub narrative_type: Option<String>,
    pub narrative_subtype: Option<String>,
    pub rule: Option<String>,
    pub risk_posture: Option<String>,
    pub claim_strength: Option<String>,
    /// Directional pattern name, or `"none"`.
    pub direction: Option<String>,
    /// Product to expected directional role.
    #[serde(default)]
    pub roles: BTreeMap<String, String>,
    /// Per-pair expectations; these replace `direction` and `roles` for the
    /// pairs they name.
    #[serde(default, rename = "pair")]
    pub pairs: Vec<PairExpectation>,
}

/// Expected direction and roles for one product pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PairExpectation {
    /// The two products, in either order.
    pub products: (String, String),
    pub direction: Option<String>,
    #[serde(default)]
    pub roles: BTreeMap<String, String>,
}

impl PairExpectation {
    /// The pair in canonical `(product_a, product_b)` order.
    pub fn canonical_pair(&self) -> (String, String) {
        let a = canonical_product(&self.products.0);
        let b = canonical_product(&self.products.1);
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

impl NarrativeFixture {
    pub fn sentence(&self, id: &str) -> Option<&FixtureSentence> {
        self.sentences.iter().find(|s| s.id == id)
    }
}

impl FixtureSentence {
    /// Build the sentence record the pipeline consumes.
    pub fn to_record(&self, fixture: &str) -> SentenceRecord {
        let doc_id = format!("fixture:{}", fixture);
        let sentence_id = format!("{}:sent:{}", doc_id, self.id);
        let mut record = SentenceRecord::new(&doc_id, &sentence_id, &self.text);
        if let Some(section) = &self.section {
            record = record.with_section(section);
        }
        for (product, alias) in &self.mentions {
            for _ in 0..self.text.matches(alias.as_str()).count() {
                record = record.mentioning(product, alias);
            }
        }
        record
    }

    pub fn sentiment_input(&self) -> SpecResult<Option<SentimentInput>> {
        let Some(raw) = &self.sentiment else {
            return Ok(None);
        };
        raw.parse::<Sentiment>()
            .map(|label| Some(SentimentInput::new(label)))
            .map_err(|e| SpecError::Sentence {
                sentence: self.id.clone(),
                message: format!("unknown sentiment label {:?}", e.0),
            })
    }
}

/// Parse a fixture document. `name` is used in error messages.
pub fn parse_fixture(name: &str, content: &str) -> SpecResult<NarrativeFixture> {
    let fixture: NarrativeFixture = toml::from_str(content).map_err(|e| SpecError::Parse {
        fixture: name.to_string(),
        message: e.to_string(),
    })?;
    let mut seen = std::collections::BTreeSet::new();
    for sentence in &fixture.sentences {
        if !seen.insert(sentence.id.as_str()) {
            return Err(SpecError::Parse {
                fixture: name.to_string(),
                message: format!("duplicate sentence id {:?}", sentence.id),
            });
        }
        for pair in &sentence.expect.pairs {
            let (a, b) = pair.canonical_pair();
            if a == b {
                return Err(SpecError::Parse {
                    fixture: name.to_string(),
                    message: format!("sentence {:?} pairs {:?} with itself", sentence.id, a),
                });
            }
        }
    }
    Ok(fixture)
}
