//! Error types for configuration loading and record validation.
//!
//! Configuration errors are fatal: a rule set that fails validation is never
//! handed to an engine. Record errors only ever affect one sentence and are
//! counted in the [`RunSummary`](crate::RunSummary).

use thiserror::Error;

/// Errors raised while loading or validating a narrative configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config: {path}: {message}")]
    Read { path: String, message: String },

    /// The configuration document is not valid TOML for the schema.
    #[error("failed to parse config: {message}")]
    Parse { message: String },

    /// The `version` field is missing or blank.
    #[error("config version must not be empty")]
    MissingVersion,

    /// No narrative rules were defined.
    #[error("config must define at least one narrative rule")]
    NoRules,

    /// Two rules share a name.
    #[error("duplicate rule name `{name}`")]
    DuplicateRuleName { name: String },

    /// Two rules share a priority, so evaluation order would be ambiguous.
    #[error("rules `{first}` and `{second}` share priority {priority}")]
    DuplicatePriority {
        priority: i64,
        first: String,
        second: String,
    },

    /// Two directional patterns share a priority.
    #[error("directional patterns `{first}` and `{second}` share priority {priority}")]
    DuplicateDirectionalPriority {
        priority: i64,
        first: String,
        second: String,
    },

    /// A rule requires a category that no dictionary or pattern defines.
    #[error("rule `{rule}` references unknown category `{category}`")]
    UnknownCategory { rule: String, category: String },

    /// A category name is declared both as a term list and as a pattern list.
    #[error("category `{category}` is defined in both [terms] and [patterns]")]
    CategoryCollision { category: String },

    /// A rule's confidence score is outside `[0, 1]`.
    #[error("rule `{rule}` has confidence {confidence} outside [0, 1]")]
    ConfidenceOutOfRange { rule: String, confidence: f64 },

    /// A phrase is empty after trimming.
    #[error("empty phrase in `{context}`")]
    EmptyPhrase { context: String },

    /// A rule or directional pattern is missing a required text field.
    #[error("`{context}` is missing `{field}`")]
    MissingField { context: String, field: String },

    /// A sentiment constraint is not one of the recognised labels.
    #[error("unknown sentiment label `{label}` in `{context}`")]
    UnknownSentiment { context: String, label: String },

    /// A `[risk_posture.subtypes]` key is not a risk posture.
    #[error("unknown risk posture `{label}` in `{context}`")]
    UnknownPosture { context: String, label: String },

    /// A directional pattern names a direction that does not exist.
    #[error("pattern `{pattern}`: unknown direction `{label}`")]
    UnknownDirection { pattern: String, label: String },

    /// A directional pattern names an unsupported match mode.
    #[error("pattern `{pattern}`: unknown match mode `{label}`")]
    UnknownMode { pattern: String, label: String },

    /// A rule requires a term its category's dictionary never produces.
    #[error("rule `{rule}` requires `{term}`, which category `{category}` does not define")]
    UnknownTerm {
        rule: String,
        category: String,
        term: String,
    },

    /// A directional subject role does not belong to the pattern's direction.
    #[error("pattern `{pattern}`: role `{role}` is not valid for direction `{direction}`")]
    RoleMismatch {
        pattern: String,
        direction: String,
        role: String,
    },

    /// A pattern category holds an invalid regular expression.
    #[error("invalid pattern in category `{category}`: {message}")]
    InvalidPattern { category: String, message: String },

    /// A study-type weight or the recency half-life is unusable.
    #[error("invalid evidence weight `{field}`: {value}")]
    InvalidWeight { field: String, value: f64 },

    /// A change-attribution threshold is negative or not a number.
    #[error("invalid change threshold `{field}`: {value}")]
    InvalidThreshold { field: String, value: f64 },
}

/// Errors raised while validating one sentence record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The record has no document identifier.
    #[error("sentence record is missing doc_id")]
    MissingDocId,

    /// The record has no sentence identifier.
    #[error("sentence record in {doc_id} is missing sentence_id")]
    MissingSentenceId { doc_id: String },

    /// The sentence text is blank.
    #[error("sentence {sentence_id} has empty text")]
    EmptyText { sentence_id: String },

    /// A mention's offsets do not describe a span of the sentence text.
    #[error("sentence {sentence_id}: mention of `{product}` has invalid span {start}..{end}")]
    InvalidMentionSpan {
        sentence_id: String,
        product: String,
        start: usize,
        end: usize,
    },

    /// A co-mention operation was requested for a sentence with fewer than
    /// two distinct products.
    #[error("sentence {sentence_id} mentions {found} distinct product(s); co-mention needs 2")]
    NotACoMention { sentence_id: String, found: usize },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for per-record operations.
pub type RecordResult<T> = Result<T, RecordError>;
