use crate::{
    check_fixture, parse_fixture, run_fixture, CheckField, CheckKey, ExpectedFailures,
    FailureState, FixtureSet, HarnessResult, SpecError,
};
use layered_narratives::NarrativeConfig;
use std::path::Path;

fn manifest_dir() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
}

fn expected_failures() -> ExpectedFailures {
    ExpectedFailures::load(&manifest_dir().join("expected-failures.toml")).unwrap()
}

// ============================================================================
// Fixture parsing
// ============================================================================

#[test]
fn test_parse_minimal_fixture() {
    let fixture = parse_fixture(
        "inline",
        r#"
[[sentence]]
id = "one"
text = "DrugX versus DrugY."
mentions = { drugx = "DrugX", drugy = "DrugY" }
"#,
    )
    .unwrap();
    assert!(fixture.title.is_none());
    assert_eq!(fixture.sentences.len(), 1);
    let record = fixture.sentences[0].to_record("inline");
    assert_eq!(record.sentence_id, "fixture:inline:sent:one");
    assert_eq!(record.distinct_products().len(), 2);
    assert!(fixture.sentences[0].sentiment_input().unwrap().is_none());
}

#[test]
fn test_duplicate_sentence_ids_are_rejected() {
    let err = parse_fixture(
        "dup",
        r#"
[[sentence]]
id = "same"
text = "A."

[[sentence]]
id = "same"
text = "B."
"#,
    )
    .unwrap_err();
    assert!(matches!(err, SpecError::Parse { .. }));
}

#[test]
fn test_unknown_expectation_field_is_rejected() {
    let err = parse_fixture(
        "typo",
        r#"
[[sentence]]
id = "one"
text = "A."

[sentence.expect]
narative_type = "safety"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, SpecError::Parse { .. }));
}

#[test]
fn test_unknown_sentiment_is_a_sentence_error() {
    let fixture = parse_fixture(
        "bad_sentiment",
        r#"
[[sentence]]
id = "one"
text = "DrugX versus DrugY."
sentiment = "ecstatic"
"#,
    )
    .unwrap();
    let err = fixture.sentences[0].sentiment_input().unwrap_err();
    assert!(matches!(err, SpecError::Sentence { ref sentence, .. } if sentence == "one"));
}

// ============================================================================
// Running fixtures
// ============================================================================

#[test]
fn test_failed_checks_are_regressions_unless_listed() {
    let config = NarrativeConfig::bundled().unwrap();
    let fixture = parse_fixture(
        "wrong",
        r#"
[[sentence]]
id = "superior"
text = "DrugX was superior to DrugY."
mentions = { drugx = "DrugX", drugy = "DrugY" }

[sentence.expect]
narrative_subtype = "head_to_head"
roles = { drugx = "disfavored" }
"#,
    )
    .unwrap();

    let outcomes = run_fixture("wrong.toml", &fixture, &config).unwrap();
    assert_eq!(outcomes[0].checks.len(), 2);
    assert!(outcomes[0].checks[0].passed());
    assert!(!outcomes[0].checks[1].passed());
    assert_eq!(outcomes[0].checks[1].actual, "favored");

    let report =
        check_fixture("wrong.toml", &fixture, &config, &ExpectedFailures::default()).unwrap();
    assert_eq!(report.result.passed, 1);
    assert_eq!(report.result.regressions, 1);
    insta::assert_snapshot!(report.regressions[0].trim(), @r###"
    FAIL: wrong.toml:superior.role[drugx/drugy].drugx
      DrugX was superior to DrugY.
      ✗ role: expected "disfavored", got "favored"
    "###);

    let failures: ExpectedFailures = toml::from_str(
        r#"
[[pending]]
fixture = "wrong.toml"
sentence = "superior"
field = "role"
product = "drugx"
"#,
    )
    .unwrap();
    assert_eq!(
        failures.classify("wrong.toml", &outcomes[0].checks[1].key),
        FailureState::Pending
    );
    let report = check_fixture("wrong.toml", &fixture, &config, &failures).unwrap();
    assert!(report.result.success());
    assert_eq!(report.result.expected_failures, 1);
}

#[test]
fn test_every_pair_of_a_sentence_is_checked() {
    let config = NarrativeConfig::bundled().unwrap();
    let fixture = parse_fixture(
        "three",
        r#"
[[sentence]]
id = "three_way"
text = "DrugX was superior to DrugY, while DrugZ was inferior to DrugY."
mentions = { drugx = "DrugX", drugy = "DrugY", drugz = "DrugZ" }

[sentence.expect]
roles = { drugy = "disfavored" }

[[sentence.expect.pair]]
products = ["drugx", "drugz"]
direction = "preferred_over"
"#,
    )
    .unwrap();

    let outcomes = run_fixture("three.toml", &fixture, &config).unwrap();
    let rendered: Vec<String> = outcomes[0]
        .checks
        .iter()
        .map(|c| format!("{} expected={} actual={}", c.key, c.expected, c.actual))
        .collect();
    insta::assert_snapshot!(rendered.join("\n"), @r###"
    three_way.direction[drugx/drugz] expected=preferred_over actual=preferred_over
    three_way.role[drugx/drugy].drugy expected=disfavored actual=disfavored
    three_way.role[drugy/drugz].drugy expected=disfavored actual=favored
    "###);
}

#[test]
fn test_missing_event_is_checked_as_none() {
    let config = NarrativeConfig::bundled().unwrap();
    let fixture = parse_fixture(
        "single",
        r#"
[[sentence]]
id = "single"
text = "DrugX was well tolerated."
mentions = { drugx = "DrugX" }

[sentence.expect]
direction = "preferred_over"
roles = { drugx = "favored" }
"#,
    )
    .unwrap();

    let outcomes = run_fixture("single.toml", &fixture, &config).unwrap();
    let keys: Vec<String> = outcomes[0].checks.iter().map(|c| c.key.to_string()).collect();
    assert_eq!(keys, vec!["single.direction", "single.role.drugx"]);
    assert!(outcomes[0].checks.iter().all(|c| c.actual == "none"));
}

#[test]
fn test_pair_with_itself_is_rejected() {
    let err = parse_fixture(
        "self_pair",
        r#"
[[sentence]]
id = "one"
text = "DrugX versus DrugX."

[[sentence.expect.pair]]
products = ["DrugX", "drugx"]
direction = "none"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, SpecError::Parse { ref fixture, .. } if fixture == "self_pair"));
}

#[test]
fn test_all_fixtures_pass_against_bundled_config() {
    let config = NarrativeConfig::bundled().unwrap();
    let failures = expected_failures();
    let fixtures = FixtureSet::load(&manifest_dir().join("fixtures")).unwrap();
    failures.validate(&fixtures).unwrap();

    let mut total = HarnessResult::default();
    let mut regressions = Vec::new();
    for (name, fixture) in fixtures.iter() {
        let report = check_fixture(name, fixture, &config, &failures).unwrap();
        total.merge(&report.result);
        regressions.extend(report.regressions);
    }

    assert!(regressions.is_empty(), "{}", regressions.join("\n"));
    assert_eq!(total.expected_failures, failures.count());
    assert!(total.passed > 30);
    assert!(total.success());
}

#[test]
fn test_stale_ledger_entries_are_rejected() {
    let fixtures = FixtureSet::load(&manifest_dir().join("fixtures")).unwrap();
    let stale = |entry: &str| {
        let failures: ExpectedFailures = toml::from_str(entry).unwrap();
        failures.validate(&fixtures).unwrap_err().to_string()
    };

    insta::assert_snapshot!(stale(r#"
[[known]]
fixture = "positioning.toml"
sentence = "renamed"
field = "rule"
"#), @r###"
    stale expected failure positioning.toml:renamed: no such sentence
    "###);
    insta::assert_snapshot!(stale(r#"
[[known]]
fixture = "comparative.toml"
sentence = "three_way"
field = "role"
pair = ["drugy", "drugx"]
"#), @r###"
    stale expected failure comparative.toml:three_way: pair [drugy, drugx] is not in canonical order
    "###);
    insta::assert_snapshot!(stale(r#"
[[known]]
fixture = "comparative.toml"
sentence = "superior"
field = "role"
product = "drugz"
"#), @r###"
    stale expected failure comparative.toml:superior: `drugz` is not mentioned
    "###);
    insta::assert_snapshot!(stale(r#"
[[known]]
fixture = "safety.toml"
sentence = "acknowledgment"
field = "rule"
product = "drugx"
"#), @r###"
    stale expected failure safety.toml:acknowledgment: `rule` entries cannot name a pair or product
    "###);
}

#[test]
fn test_summary_format() {
    let mut result = HarnessResult::default();
    for _ in 0..12 {
        result.record_pass();
    }
    result.record_failure(FailureState::Known);
    insta::assert_snapshot!(crate::format_summary("safety.toml", &result).trim(), @r###"
    PASS: safety.toml
      12 passed, 1 failed (1 expected, 0 regressions)
    "###);

    let key = CheckKey::sentence("acknowledgment", CheckField::RiskPosture);
    result.record_failure(ExpectedFailures::default().classify("safety.toml", &key));
    assert!(crate::format_summary("safety.toml", &result).contains("FAIL: safety.toml"));
}
