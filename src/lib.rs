#![doc(
    html_logo_url = "https://raw.githubusercontent.com/storyscript/layered-nlp/main/assets/layered-nlp.svg",
    issue_tracker_base_url = "https://github.com/storyscript/layered-nlp/issues/"
)]

//! Deterministic narrative classification for biomedical co-mentions.
//!
//! Each structured sentence with its product mentions is labeled without any
//! model inference: every output traces back to terms matched in the text and
//! to the configured rule that fired.
//!
//! ## Per-Sentence Pipeline
//!
//! - [`ContextLabelExtractor`] - Matches dictionary terms per category
//! - [`RuleSet`] - Prioritized narrative rules; the first match wins
//! - [`RiskClaimClassifier`] - Risk posture and claim strength
//! - [`DirectionalRoleAssigner`] - Favored/disfavored, add-on/backbone and
//!   switch roles for co-mentioned pairs
//! - [`SentenceLabeler`] - Runs the pipeline and emits [`SentenceEvent`]s
//!
//! ## Batch Analytics
//!
//! - [`aggregate_narratives`] - Weekly or monthly narrative buckets
//! - [`attribute_changes`] - New, disappearing, increase, decrease or steady
//!   per narrative series
//! - [`sentiment_buckets`] - Sentiment counts and shares per pair and period
//! - [`rank_evidence`] - Events ordered by recency and study-type weight
//!
//! ## Configuration
//!
//! Rules and dictionaries are data. [`NarrativeConfig`] loads and validates a
//! TOML document once; [`ConfigLoader`] reloads it without restarting.
//!
//! ## Example
//!
//! ```
//! use layered_narratives::{NarrativeConfig, SentenceLabeler, SentenceRecord};
//!
//! let config = NarrativeConfig::bundled().unwrap();
//! let record = SentenceRecord::new(
//!     "pmc:1",
//!     "pmc:1:sec:results:sent:4",
//!     "Semaglutide was preferred over insulin glargine in a randomized controlled trial.",
//! )
//! .with_section("Results")
//! .mentioning("semaglutide", "Semaglutide")
//! .mentioning("insulin glargine", "insulin glargine");
//!
//! let labeled = SentenceLabeler::new(&config).label(&record, None).unwrap();
//! let event = &labeled.events[0];
//! assert_eq!(event.product_a, "insulin glargine");
//! assert_eq!(event.product_b, "semaglutide");
//! assert!(event.direction.is_some());
//! ```

mod change;
mod config;
mod context;
mod dictionary;
mod direction;
mod errors;
mod event;
mod labeler;
mod mention;
mod posture;
mod rules;
mod scored;
mod sentiment;
mod text;
mod timeseries;
mod weight;

pub use change::{classify_change, relative_change, ChangeStatus, ChangeThresholds};
pub use config::{ConfigLoader, NarrativeConfig};
pub use context::{ContextLabelExtractor, ContextLabels};
pub use dictionary::{
    category, PatternCategory, Phrase, PhraseSet, TermCategory, TermDictionaries, TermMention,
};
pub use direction::{
    DirectionType, DirectionalAssignment, DirectionalPattern, DirectionalRole,
    DirectionalRoleAssigner, MatchMode,
};
pub use errors::{ConfigError, ConfigResult, RecordError, RecordResult};
pub use event::{write_jsonl, EventKey, EventStore, MemoryEventStore, SentenceEvent};
pub use labeler::{LabeledSentence, RunSummary, SentenceLabeler, SkippedSentence};
pub use mention::{
    build_sentence_id, canonical_product, canonical_section, co_mention_pairs,
    document_co_mentions, CoMentionPair, DocumentCoMention, PairProximity, ProductMention,
    SentenceRecord,
};
pub use posture::{
    ClaimStrength, ClaimStrengthConfig, PostureAssessment, PostureConfig, RiskClaimClassifier,
    RiskPosture,
};
pub use rules::{
    Narrative, NarrativeOutcome, NarrativeRule, Requirement, RuleContext, RuleSet, ANY_TERM,
    UNLABELED,
};
pub use scored::{ScoreSource, Scored};
pub use sentiment::{Sentiment, SentimentInput, UnknownSentiment};
pub use text::{CharSpan, SentenceText};
pub use timeseries::{
    aggregate_narratives, attribute_changes, sentiment_buckets, ChangeRow, Frequency,
    NarrativeTimeBucket, SentimentBucket,
};
pub use weight::{
    canonical_study_type, rank_evidence, recency_weight, DocumentMetadata, DocumentWeight,
    EvidenceBreakdown, StudyTypeWeights, WeightConfig, DEFAULT_HALF_LIFE_DAYS, OTHER_STUDY_TYPE,
};
