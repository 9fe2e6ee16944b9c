//! Narrative configuration: term dictionaries, rules, posture and claim
//! phrase lists, directional patterns and change thresholds.
//!
//! The configuration is a versioned TOML document. Loading validates
//! everything eagerly; a configuration that loads is safe to evaluate on any
//! sentence. The resulting [`NarrativeConfig`] is immutable and is passed
//! explicitly to every engine.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::change::ChangeThresholds;
use crate::dictionary::{PhraseSet, TermCategory, TermDictionaries};
use crate::direction::{
    DirectionType, DirectionalPattern, DirectionalRole, DirectionalRoleAssigner, MatchMode,
};
use crate::errors::{ConfigError, ConfigResult};
use crate::posture::{ClaimStrengthConfig, PostureConfig, RiskPosture};
use crate::rules::{NarrativeRule, RuleSet};
use crate::sentiment::Sentiment;
use crate::weight::{StudyTypeWeights, WeightConfig, DEFAULT_HALF_LIFE_DAYS};

/// The configuration shipped with the crate.
const BUNDLED: &str = include_str!("../config/narratives.toml");

/// A fully validated narrative configuration.
#[derive(Debug, Clone)]
pub struct NarrativeConfig {
    pub version: String,
    pub dictionaries: TermDictionaries,
    pub rules: RuleSet,
    pub posture: PostureConfig,
    pub claim_strength: ClaimStrengthConfig,
    pub directional: DirectionalRoleAssigner,
    pub change: ChangeThresholds,
    pub weights: WeightConfig,
}

impl NarrativeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let raw: RawConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        raw.build()
    }

    /// Read, parse and validate a configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(
            path = %path.display(),
            version = %config.version,
            rules = config.rules.len(),
            "loaded narrative config"
        );
        Ok(config)
    }

    /// The configuration bundled with this crate (`config/narratives.toml`).
    pub fn bundled() -> ConfigResult<Self> {
        Self::from_toml_str(BUNDLED)
    }
}

/// Loads a configuration file and reloads it on demand.
///
/// A reload replaces the shared configuration only after the new document
/// has fully validated; on failure the current configuration stays in place.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> ConfigResult<Arc<NarrativeConfig>> {
        NarrativeConfig::load(&self.path).map(Arc::new)
    }

    /// Re-read the file and swap it into `current` if it validates.
    pub fn reload(&self, current: &mut Arc<NarrativeConfig>) -> ConfigResult<()> {
        match NarrativeConfig::load(&self.path) {
            Ok(config) => {
                tracing::info!(
                    previous = %current.version,
                    version = %config.version,
                    "narrative config reloaded"
                );
                *current = Arc::new(config);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    version = %current.version,
                    error = %err,
                    "rejected narrative config reload; keeping current config"
                );
                Err(err)
            }
        }
    }
}

// ============================================================================
// Raw document schema
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    terms: BTreeMap<String, RawTerms>,
    #[serde(default)]
    patterns: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    rules: Vec<RawRule>,
    #[serde(default)]
    risk_posture: RawPosture,
    #[serde(default)]
    claim_strength: RawClaimStrength,
    #[serde(default)]
    directional: Vec<RawDirectional>,
    #[serde(default)]
    change: RawChange,
    #[serde(default)]
    weights: RawWeights,
}

/// A term category: a flat phrase list, or label -> phrases.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTerms {
    Flat(Vec<String>),
    Labeled(BTreeMap<String, Vec<String>>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    #[serde(default)]
    name: String,
    #[serde(default)]
    narrative_type: String,
    #[serde(default)]
    narrative_subtype: String,
    priority: i64,
    confidence: f64,
    #[serde(default)]
    requires: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    sentiment: Option<OneOrMany>,
    #[serde(default)]
    include_sections: Vec<String>,
    #[serde(default)]
    exclude_sections: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPosture {
    #[serde(default = "default_safety_types")]
    safety_types: Vec<String>,
    #[serde(default)]
    minimization: Vec<String>,
    #[serde(default)]
    reassurance: Vec<String>,
    #[serde(default)]
    subtypes: BTreeMap<String, String>,
}

impl Default for RawPosture {
    fn default() -> Self {
        Self {
            safety_types: default_safety_types(),
            minimization: Vec::new(),
            reassurance: Vec::new(),
            subtypes: BTreeMap::new(),
        }
    }
}

fn default_safety_types() -> Vec<String> {
    vec!["safety".to_string()]
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawClaimStrength {
    #[serde(default)]
    confirmatory: Vec<String>,
    #[serde(default)]
    exploratory: Vec<String>,
    #[serde(default)]
    suggestive: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDirectional {
    #[serde(default)]
    name: String,
    direction: String,
    subject_role: String,
    priority: i64,
    #[serde(default)]
    phrases: Vec<String>,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    sentiment: Option<OneOrMany>,
    #[serde(default)]
    exclude_prefixes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawChange {
    #[serde(default = "default_lookback")]
    lookback: usize,
    #[serde(default = "default_min_count")]
    min_count: u64,
    #[serde(default = "default_min_ratio")]
    min_ratio: f64,
}

impl Default for RawChange {
    fn default() -> Self {
        let defaults = ChangeThresholds::default();
        Self {
            lookback: defaults.lookback,
            min_count: defaults.min_count,
            min_ratio: defaults.min_ratio,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWeights {
    #[serde(default = "default_half_life_days")]
    half_life_days: u32,
    #[serde(default)]
    study_types: BTreeMap<String, f64>,
}

impl Default for RawWeights {
    fn default() -> Self {
        Self {
            half_life_days: DEFAULT_HALF_LIFE_DAYS,
            study_types: BTreeMap::new(),
        }
    }
}

fn default_half_life_days() -> u32 {
    DEFAULT_HALF_LIFE_DAYS
}

fn default_lookback() -> usize {
    ChangeThresholds::default().lookback
}

fn default_min_count() -> u64 {
    ChangeThresholds::default().min_count
}

fn default_min_ratio() -> f64 {
    ChangeThresholds::default().min_ratio
}

// ============================================================================
// Validation
// ============================================================================

impl RawConfig {
    fn build(self) -> ConfigResult<NarrativeConfig> {
        let version = self
            .version
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVersion)?;

        let mut dictionaries = TermDictionaries::new();
        for (name, terms) in self.terms {
            let category = match terms {
                RawTerms::Flat(phrases) => TermCategory::flat(phrases, &name)?,
                RawTerms::Labeled(labels) => TermCategory::labeled(labels, &name)?,
            };
            dictionaries.insert_terms(&name, category)?;
        }
        for (name, patterns) in self.patterns {
            dictionaries = dictionaries.with_patterns(&name, patterns)?;
        }

        let rules = self
            .rules
            .into_iter()
            .map(RawRule::build)
            .collect::<ConfigResult<Vec<_>>>()?;
        let rules = RuleSet::new(rules, &dictionaries)?;

        let posture = self.risk_posture.build()?;
        let claim = self.claim_strength;
        let claim_strength = ClaimStrengthConfig {
            confirmatory: PhraseSet::new(claim.confirmatory, "claim_strength.confirmatory")?,
            exploratory: PhraseSet::new(claim.exploratory, "claim_strength.exploratory")?,
            suggestive: PhraseSet::new(claim.suggestive, "claim_strength.suggestive")?,
        };

        let patterns = self
            .directional
            .into_iter()
            .map(RawDirectional::build)
            .collect::<ConfigResult<Vec<_>>>()?;
        let directional = DirectionalRoleAssigner::new(patterns)?;

        let change = ChangeThresholds::new(
            self.change.lookback,
            self.change.min_count,
            self.change.min_ratio,
        )?;

        let weights = WeightConfig::new(
            self.weights.half_life_days,
            StudyTypeWeights::new(self.weights.study_types)?,
        )?;

        Ok(NarrativeConfig {
            version,
            dictionaries,
            rules,
            posture,
            claim_strength,
            directional,
            change,
            weights,
        })
    }
}

impl RawRule {
    fn build(self) -> ConfigResult<NarrativeRule> {
        let context = if self.name.trim().is_empty() {
            format!("rule with priority {}", self.priority)
        } else {
            self.name.clone()
        };
        let mut rule = NarrativeRule::new(
            self.name.trim(),
            self.narrative_type.trim(),
            self.narrative_subtype.trim(),
            self.priority,
            self.confidence,
        );
        for (category, terms) in self.requires {
            rule = rule.requires_terms(category.trim(), terms);
        }
        for sentiment in parse_sentiments(self.sentiment, &context)? {
            rule = rule.with_sentiment(sentiment);
        }
        for section in &self.include_sections {
            rule = rule.include_section(section);
        }
        for section in &self.exclude_sections {
            rule = rule.exclude_section(section);
        }
        Ok(rule)
    }
}

impl RawPosture {
    fn build(self) -> ConfigResult<PostureConfig> {
        let mut subtypes = BTreeMap::new();
        for (posture, subtype) in self.subtypes {
            let posture: RiskPosture =
                posture.parse().map_err(|label| ConfigError::UnknownPosture {
                    context: "risk_posture.subtypes".to_string(),
                    label,
                })?;
            let subtype = subtype.trim().to_string();
            if subtype.is_empty() {
                return Err(ConfigError::MissingField {
                    context: format!("risk_posture.subtypes.{}", posture),
                    field: "subtype".to_string(),
                });
            }
            subtypes.insert(posture, subtype);
        }
        Ok(PostureConfig {
            safety_types: self
                .safety_types
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            minimization: PhraseSet::new(self.minimization, "risk_posture.minimization")?,
            reassurance: PhraseSet::new(self.reassurance, "risk_posture.reassurance")?,
            subtypes,
        })
    }
}

impl RawDirectional {
    fn build(self) -> ConfigResult<DirectionalPattern> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ConfigError::MissingField {
                context: format!("directional pattern with priority {}", self.priority),
                field: "name".to_string(),
            });
        }
        let direction: DirectionType =
            self.direction.parse().map_err(|label| ConfigError::UnknownDirection {
                pattern: name.clone(),
                label,
            })?;
        let role: DirectionalRole = self.subject_role.parse().map_err(|label: String| {
            ConfigError::RoleMismatch {
                pattern: name.clone(),
                direction: direction.to_string(),
                role: label,
            }
        })?;
        let mode = match self.mode {
            Some(mode) => mode.parse::<MatchMode>().map_err(|label| ConfigError::UnknownMode {
                pattern: name.clone(),
                label,
            })?,
            None => MatchMode::default(),
        };

        let mut pattern = DirectionalPattern::new(&name, role, self.priority, self.phrases)?
            .with_mode(mode)
            .with_exclude_prefixes(self.exclude_prefixes)?;
        pattern.direction = direction;
        for sentiment in parse_sentiments(self.sentiment, &name)? {
            pattern = pattern.with_sentiment(sentiment);
        }
        pattern.validate()?;
        Ok(pattern)
    }
}

fn parse_sentiments(raw: Option<OneOrMany>, context: &str) -> ConfigResult<Vec<Sentiment>> {
    raw.map(OneOrMany::into_vec)
        .unwrap_or_default()
        .iter()
        .map(|label| {
            label
                .parse::<Sentiment>()
                .map_err(|_| ConfigError::UnknownSentiment {
                    context: context.to_string(),
                    label: label.clone(),
                })
        })
        .collect()
}
