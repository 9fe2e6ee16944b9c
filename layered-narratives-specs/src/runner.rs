//! Runs fixtures through the labeling pipeline and checks expectations.

use std::collections::BTreeMap;

use layered_narratives::{canonical_product, NarrativeConfig, SentenceEvent, SentenceLabeler};

use crate::errors::{SpecError, SpecResult};
use crate::failures::{CheckField, CheckKey, ExpectedFailures, FailureState, HarnessResult};
use crate::fixture::{FixtureSentence, NarrativeFixture};
use crate::formatter::format_failure;

/// Value used when the pipeline produced nothing for a field.
pub const NONE: &str = "none";

/// One expected-vs-actual comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCheck {
    pub key: CheckKey,
    pub expected: String,
    pub actual: String,
}

impl FieldCheck {
    pub fn passed(&self) -> bool {
        self.expected == self.actual
    }
}

/// The checks run for one fixture sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceOutcome {
    pub sentence: String,
    pub checks: Vec<FieldCheck>,
}

/// Label every sentence of a fixture and compare against its expectations.
pub fn run_fixture(
    name: &str,
    fixture: &NarrativeFixture,
    config: &NarrativeConfig,
) -> SpecResult<Vec<SentenceOutcome>> {
    fixture
        .sentences
        .iter()
        .map(|sentence| run_sentence(name, sentence, config))
        .collect()
}

fn run_sentence(
    name: &str,
    sentence: &FixtureSentence,
    config: &NarrativeConfig,
) -> SpecResult<SentenceOutcome> {
    let record = sentence.to_record(name);
    let sentiment = sentence.sentiment_input()?;
    let labeled = SentenceLabeler::new(config)
        .classify(&record, sentiment.as_ref())
        .map_err(|e| SpecError::Sentence {
            sentence: sentence.id.clone(),
            message: e.to_string(),
        })?;

    let id = sentence.id.as_str();
    let expect = &sentence.expect;
    let mut checks = Vec::new();
    let mut check = |field: CheckField, expected: &Option<String>, actual: String| {
        if let Some(expected) = expected {
            checks.push(FieldCheck {
                key: CheckKey::sentence(id, field),
                expected: expected.clone(),
                actual,
            });
        }
    };

    check(
        CheckField::NarrativeType,
        &expect.narrative_type,
        labeled.narrative.narrative_type().to_string(),
    );
    check(
        CheckField::NarrativeSubtype,
        &expect.narrative_subtype,
        labeled.narrative.narrative_subtype().to_string(),
    );
    check(
        CheckField::Rule,
        &expect.rule,
        labeled.narrative.rule_name().unwrap_or(NONE).to_string(),
    );
    check(
        CheckField::RiskPosture,
        &expect.risk_posture,
        labeled.assessment.risk_posture.to_string(),
    );
    check(
        CheckField::ClaimStrength,
        &expect.claim_strength,
        labeled.assessment.claim_strength.to_string(),
    );

    let events = &labeled.events;
    let pinned: Vec<(String, String)> = expect.pairs.iter().map(|p| p.canonical_pair()).collect();
    for (pair, pair_expect) in pinned.iter().zip(&expect.pairs) {
        let event = events
            .iter()
            .find(|e| e.product_a == pair.0 && e.product_b == pair.1);
        let key_pair = Some((pair.0.as_str(), pair.1.as_str()));
        check_event(
            &mut checks,
            id,
            key_pair,
            event,
            &pair_expect.direction,
            &pair_expect.roles,
        );
    }

    // Sentence-wide direction and roles cover every pair not pinned above.
    let unpinned: Vec<&SentenceEvent> = events
        .iter()
        .filter(|e| {
            !pinned
                .iter()
                .any(|(a, b)| e.product_a == *a && e.product_b == *b)
        })
        .collect();
    let roles: BTreeMap<String, String> = expect
        .roles
        .iter()
        .map(|(product, role)| (canonical_product(product), role.clone()))
        .collect();
    if events.is_empty() {
        check_event(&mut checks, id, None, None, &expect.direction, &roles);
    }
    for event in unpinned.iter().copied() {
        let pair = Some((event.product_a.as_str(), event.product_b.as_str()));
        let event_roles: BTreeMap<String, String> = roles
            .iter()
            .filter(|(product, _)| involves(event, product))
            .map(|(product, role)| (product.clone(), role.clone()))
            .collect();
        check_event(&mut checks, id, pair, Some(event), &expect.direction, &event_roles);
    }
    if !events.is_empty() {
        // A product with an expected role but no unpinned event.
        for (product, role) in &roles {
            let covered = unpinned.iter().any(|e| involves(e, product))
                || pinned_involves(&pinned, product);
            if !covered {
                checks.push(FieldCheck {
                    key: CheckKey::role(id, None, product),
                    expected: role.clone(),
                    actual: NONE.to_string(),
                });
            }
        }
    }

    Ok(SentenceOutcome {
        sentence: sentence.id.clone(),
        checks,
    })
}

fn involves(event: &SentenceEvent, product: &str) -> bool {
    event.product_a == product || event.product_b == product
}

fn pinned_involves(pinned: &[(String, String)], product: &str) -> bool {
    pinned.iter().any(|(a, b)| a == product || b == product)
}

/// Direction and role checks for one event, or for a sentence that
/// produced no event when `event` is `None`.
fn check_event(
    checks: &mut Vec<FieldCheck>,
    sentence: &str,
    pair: Option<(&str, &str)>,
    event: Option<&SentenceEvent>,
    direction: &Option<String>,
    roles: &BTreeMap<String, String>,
) {
    let assignment = event.and_then(|e| e.direction.as_ref());
    if let Some(expected) = direction {
        checks.push(FieldCheck {
            key: CheckKey::direction(sentence, pair),
            expected: expected.clone(),
            actual: assignment.map_or_else(|| NONE.to_string(), |d| d.pattern.clone()),
        });
    }
    for (product, role) in roles {
        let product = canonical_product(product);
        let actual = match (event, assignment) {
            (Some(event), Some(d)) if event.product_a == product => d.product_a_role.to_string(),
            (Some(event), Some(d)) if event.product_b == product => d.product_b_role.to_string(),
            _ => NONE.to_string(),
        };
        checks.push(FieldCheck {
            key: CheckKey::role(sentence, pair, &product),
            expected: role.clone(),
            actual,
        });
    }
}

/// Counts and rendered regressions for one fixture.
#[derive(Debug, Clone, Default)]
pub struct FixtureReport {
    pub result: HarnessResult,
    /// Formatted messages for failures not listed as expected.
    pub regressions: Vec<String>,
}

/// Run a fixture and classify every failed check against the ledger.
pub fn check_fixture(
    name: &str,
    fixture: &NarrativeFixture,
    config: &NarrativeConfig,
    failures: &ExpectedFailures,
) -> SpecResult<FixtureReport> {
    let mut report = FixtureReport::default();
    for outcome in run_fixture(name, fixture, config)? {
        for check in &outcome.checks {
            if check.passed() {
                report.result.record_pass();
                continue;
            }
            let state = failures.classify(name, &check.key);
            report.result.record_failure(state);
            if state == FailureState::Regression {
                let text = fixture
                    .sentence(&outcome.sentence)
                    .map(|s| s.text.as_str());
                report.regressions.push(format_failure(name, check, text));
            }
        }
    }
    Ok(report)
}
