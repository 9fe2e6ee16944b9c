//! The expected-failure ledger.
//!
//! A failed check is looked up by fixture, sentence, and the label that
//! disagreed. Direction and role entries may narrow to one product pair and
//! one product; leaving those out covers every pair in the sentence.

use std::fmt;
use std::fs;
use std::path::Path;

use layered_narratives::canonical_product;
use serde::{Deserialize, Serialize};

use crate::errors::{SpecError, SpecResult};
use crate::loader::FixtureSet;

/// The label a check compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckField {
    NarrativeType,
    NarrativeSubtype,
    Rule,
    RiskPosture,
    ClaimStrength,
    /// Directional pattern of one product pair.
    Direction,
    /// Directional role of one product within a pair.
    Role,
}

impl CheckField {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckField::NarrativeType => "narrative_type",
            CheckField::NarrativeSubtype => "narrative_subtype",
            CheckField::Rule => "rule",
            CheckField::RiskPosture => "risk_posture",
            CheckField::ClaimStrength => "claim_strength",
            CheckField::Direction => "direction",
            CheckField::Role => "role",
        }
    }

    fn is_pair_scoped(self) -> bool {
        matches!(self, CheckField::Direction | CheckField::Role)
    }
}

impl fmt::Display for CheckField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one check within a fixture.
///
/// Renders as `superior.narrative_subtype`, `superior.direction[drugx/drugy]`
/// or `superior.role[drugx/drugy].drugx`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CheckKey {
    pub sentence: String,
    pub field: CheckField,
    /// Canonical `(product_a, product_b)` of the event checked. `None` when
    /// the sentence produced no event for the expectation.
    pub pair: Option<(String, String)>,
    pub product: Option<String>,
}

impl CheckKey {
    pub fn sentence(sentence: &str, field: CheckField) -> Self {
        Self {
            sentence: sentence.to_string(),
            field,
            pair: None,
            product: None,
        }
    }

    pub fn direction(sentence: &str, pair: Option<(&str, &str)>) -> Self {
        Self {
            pair: pair.map(|(a, b)| (a.to_string(), b.to_string())),
            ..Self::sentence(sentence, CheckField::Direction)
        }
    }

    pub fn role(sentence: &str, pair: Option<(&str, &str)>, product: &str) -> Self {
        Self {
            field: CheckField::Role,
            product: Some(product.to_string()),
            ..Self::direction(sentence, pair)
        }
    }
}

impl fmt::Display for CheckKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.sentence, self.field)?;
        if let Some((a, b)) = &self.pair {
            write!(f, "[{}/{}]", a, b)?;
        }
        if let Some(product) = &self.product {
            write!(f, ".{}", product)?;
        }
        Ok(())
    }
}

/// Checks that are known to fail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpectedFailures {
    /// Limitations with no fix planned.
    #[serde(default)]
    pub known: Vec<FailureEntry>,
    /// Failures a pending change is expected to fix.
    #[serde(default)]
    pub pending: Vec<FailureEntry>,
}

/// One ledger entry.
///
/// ```toml
/// [[known]]
/// fixture = "comparative.toml"
/// sentence = "three_way"
/// field = "role"
/// pair = ["drugy", "drugz"]
/// product = "drugy"
/// reason = "..."
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureEntry {
    pub fixture: String,
    pub sentence: String,
    pub field: CheckField,
    /// Restricts a direction or role entry to one canonical product pair.
    #[serde(default)]
    pub pair: Option<(String, String)>,
    /// Restricts a role entry to one product.
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Date added (YYYY-MM-DD).
    #[serde(default)]
    pub added: Option<String>,
    #[serde(default)]
    pub issue: Option<String>,
}

/// How a failed check is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureState {
    Known,
    Pending,
    /// Not in the ledger.
    Regression,
}

impl ExpectedFailures {
    /// Load the ledger. A missing file is an empty ledger.
    pub fn load(path: &Path) -> SpecResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| SpecError::Load {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| SpecError::Parse {
            fixture: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn classify(&self, fixture: &str, key: &CheckKey) -> FailureState {
        if self.known.iter().any(|e| e.covers(fixture, key)) {
            FailureState::Known
        } else if self.pending.iter().any(|e| e.covers(fixture, key)) {
            FailureState::Pending
        } else {
            FailureState::Regression
        }
    }

    pub fn count(&self) -> usize {
        self.known.len() + self.pending.len()
    }

    /// Reject entries that point at fixtures, sentences or products that do
    /// not exist, so a renamed fixture cannot leave a stale entry behind.
    pub fn validate(&self, fixtures: &FixtureSet) -> SpecResult<()> {
        for entry in self.known.iter().chain(&self.pending) {
            entry.validate(fixtures)?;
        }
        Ok(())
    }
}

impl FailureEntry {
    fn covers(&self, fixture: &str, key: &CheckKey) -> bool {
        self.fixture == fixture
            && self.sentence == key.sentence
            && self.field == key.field
            && self.pair.as_ref().map_or(true, |pair| key.pair.as_ref() == Some(pair))
            && self.product.as_ref().map_or(true, |p| key.product.as_ref() == Some(p))
    }

    fn validate(&self, fixtures: &FixtureSet) -> SpecResult<()> {
        let invalid = |message: String| SpecError::Ledger {
            fixture: self.fixture.clone(),
            sentence: self.sentence.clone(),
            message,
        };
        let sentence = fixtures
            .get(&self.fixture)
            .ok_or_else(|| invalid("no such fixture".to_string()))?
            .sentence(&self.sentence)
            .ok_or_else(|| invalid("no such sentence".to_string()))?;

        if !self.field.is_pair_scoped() && (self.pair.is_some() || self.product.is_some()) {
            return Err(invalid(format!(
                "`{}` entries cannot name a pair or product",
                self.field
            )));
        }
        if self.product.is_some() && self.field != CheckField::Role {
            return Err(invalid("only role entries name a product".to_string()));
        }

        let mentioned = |product: &str| {
            sentence
                .mentions
                .keys()
                .any(|m| canonical_product(m) == product)
        };
        if let Some((a, b)) = &self.pair {
            if a >= b {
                return Err(invalid(format!("pair [{}, {}] is not in canonical order", a, b)));
            }
            if let Some(missing) = [a, b].into_iter().find(|p| !mentioned(p.as_str())) {
                return Err(invalid(format!("`{}` is not mentioned", missing)));
            }
        }
        if let Some(product) = &self.product {
            if !mentioned(product) {
                return Err(invalid(format!("`{}` is not mentioned", product)));
            }
        }
        Ok(())
    }
}

/// Check counts for one or more fixtures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarnessResult {
    pub total: usize,
    pub passed: usize,
    /// Failures listed in the ledger.
    pub expected_failures: usize,
    pub regressions: usize,
}

impl HarnessResult {
    pub fn failed(&self) -> usize {
        self.expected_failures + self.regressions
    }

    pub fn success(&self) -> bool {
        self.regressions == 0
    }

    pub fn record_pass(&mut self) {
        self.total += 1;
        self.passed += 1;
    }

    pub fn record_failure(&mut self, state: FailureState) {
        self.total += 1;
        match state {
            FailureState::Known | FailureState::Pending => self.expected_failures += 1,
            FailureState::Regression => self.regressions += 1,
        }
    }

    pub fn merge(&mut self, other: &HarnessResult) {
        self.total += other.total;
        self.passed += other.passed;
        self.expected_failures += other.expected_failures;
        self.regressions += other.regressions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn entry(fixture: &str, sentence: &str, field: CheckField) -> FailureEntry {
        FailureEntry {
            fixture: fixture.to_string(),
            sentence: sentence.to_string(),
            field,
            pair: None,
            product: None,
            reason: None,
            added: None,
            issue: None,
        }
    }

    #[test]
    fn keys_render_with_pair_and_product() {
        let keys = [
            CheckKey::sentence("superior", CheckField::NarrativeSubtype),
            CheckKey::direction("three_way", Some(("drugx", "drugy"))),
            CheckKey::role("three_way", Some(("drugy", "drugz")), "drugy"),
            CheckKey::role("single_product", None, "drugx"),
        ];
        let rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "superior.narrative_subtype",
                "three_way.direction[drugx/drugy]",
                "three_way.role[drugy/drugz].drugy",
                "single_product.role.drugx",
            ]
        );
    }

    #[test]
    fn unlisted_failures_are_regressions() {
        let failures = ExpectedFailures::default();
        let key = CheckKey::sentence("reassurance", CheckField::RiskPosture);
        assert_eq!(failures.classify("safety.toml", &key), FailureState::Regression);
    }

    #[test]
    fn known_and_pending_entries_match_on_sentence_and_field() {
        let failures = ExpectedFailures {
            known: vec![entry("a.toml", "s1", CheckField::Rule)],
            pending: vec![entry("a.toml", "s2", CheckField::Rule)],
        };
        let s1 = CheckKey::sentence("s1", CheckField::Rule);
        assert_eq!(failures.classify("a.toml", &s1), FailureState::Known);
        assert_eq!(
            failures.classify("a.toml", &CheckKey::sentence("s2", CheckField::Rule)),
            FailureState::Pending
        );
        assert_eq!(failures.classify("b.toml", &s1), FailureState::Regression);
        assert_eq!(
            failures.classify("a.toml", &CheckKey::sentence("s1", CheckField::NarrativeType)),
            FailureState::Regression
        );
    }

    #[test]
    fn role_entries_narrow_by_pair_and_product() {
        let mut narrow = entry("c.toml", "three_way", CheckField::Role);
        narrow.pair = Some(("drugy".to_string(), "drugz".to_string()));
        narrow.product = Some("drugy".to_string());
        let failures = ExpectedFailures {
            known: vec![narrow, entry("c.toml", "other", CheckField::Role)],
            pending: Vec::new(),
        };

        let listed = CheckKey::role("three_way", Some(("drugy", "drugz")), "drugy");
        let other_pair = CheckKey::role("three_way", Some(("drugx", "drugy")), "drugy");
        let other_product = CheckKey::role("three_way", Some(("drugy", "drugz")), "drugz");
        assert_eq!(failures.classify("c.toml", &listed), FailureState::Known);
        assert_eq!(failures.classify("c.toml", &other_pair), FailureState::Regression);
        assert_eq!(failures.classify("c.toml", &other_product), FailureState::Regression);

        let any_pair = CheckKey::role("other", Some(("drugx", "drugy")), "drugx");
        assert_eq!(failures.classify("c.toml", &any_pair), FailureState::Known);
    }

    #[test]
    fn harness_counts_merge() {
        let mut result = HarnessResult::default();
        result.record_pass();
        result.record_failure(FailureState::Known);
        result.record_failure(FailureState::Regression);
        assert_eq!(result.total, 3);
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed(), 2);
        assert!(!result.success());

        let mut total = HarnessResult::default();
        total.merge(&result);
        total.merge(&result);
        assert_eq!(total.total, 6);
        assert_eq!(total.regressions, 2);
    }

    #[test]
    fn ledger_loads_from_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[[pending]]
fixture = "safety.toml"
sentence = "acknowledgment"
field = "rule"
reason = "Awaiting rule split"
added = "2024-06-03"

[[known]]
fixture = "comparative.toml"
sentence = "three_way"
field = "role"
pair = ["drugy", "drugz"]
product = "drugz"
"#
        )
        .unwrap();

        let failures = ExpectedFailures::load(file.path()).unwrap();
        assert_eq!(failures.count(), 2);
        let key = CheckKey::sentence("acknowledgment", CheckField::Rule);
        assert_eq!(failures.classify("safety.toml", &key), FailureState::Pending);
        assert_eq!(
            failures.known[0].pair,
            Some(("drugy".to_string(), "drugz".to_string()))
        );
    }

    #[test]
    fn unknown_ledger_fields_are_rejected() {
        let result: Result<ExpectedFailures, _> = toml::from_str(
            r#"
[[known]]
fixture = "safety.toml"
check = "acknowledgment.rule"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_ledger_is_empty() {
        let failures = ExpectedFailures::load(Path::new("/nonexistent/path.toml")).unwrap();
        assert_eq!(failures.count(), 0);
    }
}
