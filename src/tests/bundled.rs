//! The shipped configuration, end to end.

use crate::{
    ClaimStrength, DirectionalRole, NarrativeConfig, RiskPosture, Sentiment, SentenceEvent,
    SentenceLabeler, SentenceRecord, SentimentInput, UNLABELED,
};

fn config() -> NarrativeConfig {
    NarrativeConfig::bundled().unwrap()
}

fn pair_record(text: &str, first: &str, second: &str) -> SentenceRecord {
    SentenceRecord::new("pmc:100", "pmc:100:sec:results:sent:0", text)
        .mentioning(&first.to_lowercase(), first)
        .mentioning(&second.to_lowercase(), second)
}

fn label(record: &SentenceRecord, sentiment: Option<Sentiment>) -> SentenceEvent {
    let config = config();
    let input = sentiment.map(SentimentInput::new);
    let labeled = SentenceLabeler::new(&config)
        .label(record, input.as_ref())
        .unwrap();
    assert_eq!(labeled.events.len(), 1);
    labeled.events.into_iter().next().unwrap()
}

fn render(event: &SentenceEvent) -> String {
    let direction = match &event.direction {
        Some(d) => format!(
            "{} {}={} {}={} via '{}'",
            d.pattern,
            event.product_a,
            d.product_a_role,
            event.product_b,
            d.product_b_role,
            d.trigger
        ),
        None => "no direction".to_string(),
    };
    format!(
        "{} | {}\n{}/{} ({:.2}, {})\nposture={} claim={}\n{}",
        event.product_a,
        event.product_b,
        event.narrative_type,
        event.narrative_subtype,
        event.narrative_confidence,
        event.narrative_rule.as_deref().unwrap_or("-"),
        event.risk_posture,
        event.claim_strength,
        direction
    )
}

#[test]
fn comparative_advantage_with_positive_sentiment() {
    let record = pair_record(
        "DrugX was superior to DrugY for reducing mortality.",
        "DrugX",
        "DrugY",
    );
    let event = label(&record, Some(Sentiment::Positive));
    insta::assert_snapshot!(render(&event), @r###"
    drugx | drugy
    comparative/comparative_efficacy_advantage (0.70, comparative_advantage)
    posture=neutral claim=suggestive
    preferred_over drugx=favored drugy=disfavored via 'superior to'
    "###);
}

#[test]
fn risk_terms_map_to_safety_acknowledgment() {
    let record = pair_record(
        "Adverse events with DrugX were comparable to DrugY.",
        "DrugX",
        "DrugY",
    );
    let event = label(&record, None);
    insta::assert_snapshot!(render(&event), @r###"
    drugx | drugy
    safety/safety_acknowledgment (0.90, safety_acknowledgment)
    posture=acknowledgment claim=suggestive
    no direction
    "###);
    assert_eq!(
        event.context.risk_terms().iter().collect::<Vec<_>>(),
        vec!["adverse", "adverse events"]
    );
}

#[test]
fn reassurance_overrides_the_safety_subtype() {
    let record = pair_record(
        "No increase in adverse events was observed with DrugX or DrugY.",
        "DrugX",
        "DrugY",
    );
    let event = label(&record, None);
    assert_eq!(event.narrative_type, "safety");
    assert_eq!(event.narrative_subtype, "safety_reassurance");
    assert_eq!(event.risk_posture, RiskPosture::Reassurance);
    assert_eq!(event.narrative_rule.as_deref(), Some("safety_acknowledgment"));
}

#[test]
fn minimization_wins_over_reassurance() {
    let record = pair_record(
        "Adverse events with DrugX were only mild, and DrugY was well tolerated.",
        "DrugX",
        "DrugY",
    );
    let event = label(&record, None);
    assert_eq!(event.risk_posture, RiskPosture::Minimization);
    assert_eq!(event.narrative_subtype, "safety_minimization");
    assert_eq!(
        event.posture_terms.iter().collect::<Vec<_>>(),
        vec!["only mild"]
    );
}

#[test]
fn methods_section_blocks_safety_classification() {
    let record = pair_record(
        "Adverse events with DrugX were comparable to DrugY.",
        "DrugX",
        "DrugY",
    )
    .with_section("Methods");
    let event = label(&record, None);
    assert_eq!(event.narrative_type, UNLABELED);
    assert_eq!(event.narrative_subtype, UNLABELED);
    assert_eq!(event.narrative_confidence, 0.0);
    assert_eq!(event.narrative_rule, None);
    assert_eq!(event.risk_posture, RiskPosture::Neutral);
    assert_eq!(event.section.as_deref(), Some("methods"));
}

#[test]
fn switching_assigns_source_and_destination() {
    let record = pair_record(
        "Participants switched to semaglutide from insulin after 12 weeks.",
        "semaglutide",
        "insulin",
    );
    let event = label(&record, None);
    insta::assert_snapshot!(render(&event), @r###"
    insulin | semaglutide
    positioning/switching (0.80, positioning_switching)
    posture=neutral claim=suggestive
    switched_to_from insulin=switch_source semaglutide=switch_destination via 'switched to'
    "###);
}

#[test]
fn switching_with_the_source_named_first() {
    let record = pair_record(
        "Patients on insulin switched to semaglutide after 12 weeks.",
        "insulin",
        "semaglutide",
    );
    let direction = label(&record, None).direction.unwrap();
    assert_eq!(direction.pattern, "switched_to");
    assert_eq!(direction.product_a_role, DirectionalRole::SwitchSource);
    assert_eq!(direction.product_b_role, DirectionalRole::SwitchDestination);
}

#[test]
fn non_inferiority_claims_assign_no_loser() {
    for text in [
        "DrugX was non-inferior to DrugY for HbA1c.",
        "DrugX was not inferior to DrugY for HbA1c.",
    ] {
        let event = label(&pair_record(text, "DrugX", "DrugY"), None);
        assert_eq!(event.direction, None, "{}", text);
        assert_eq!(event.narrative_type, "comparative");
    }
}

#[test]
fn three_products_give_every_pair_its_own_roles() {
    let config = config();
    let record = SentenceRecord::new(
        "pmc:100",
        "pmc:100:sec:results:sent:1",
        "DrugX was superior to DrugY, while DrugZ was inferior to DrugY.",
    )
    .mentioning("drugx", "DrugX")
    .mentioning("drugy", "DrugY")
    .mentioning("drugz", "DrugZ")
    .mentioning("drugy", "DrugY");
    let labeled = SentenceLabeler::new(&config).label(&record, None).unwrap();
    let rendered: Vec<String> = labeled
        .events
        .iter()
        .map(|event| match &event.direction {
            Some(d) => format!(
                "{}: {}={} {}={}",
                d.pattern, event.product_a, d.product_a_role, event.product_b, d.product_b_role
            ),
            None => format!("none: {} {}", event.product_a, event.product_b),
        })
        .collect();
    insta::assert_snapshot!(rendered.join("\n"), @r###"
    preferred_over: drugx=favored drugy=disfavored
    preferred_over: drugx=favored drugz=disfavored
    inferior_to: drugy=favored drugz=disfavored
    "###);
}

#[test]
fn indications_are_reported_by_canonical_name() {
    let record = pair_record(
        "In adults with T2DM and CKD, DrugX was compared with DrugY.",
        "DrugX",
        "DrugY",
    );
    let event = label(&record, None);
    assert_eq!(
        event.indications.iter().collect::<Vec<_>>(),
        vec!["chronic kidney disease", "type 2 diabetes"]
    );

    let config = config();
    let labeled = SentenceLabeler::new(&config).classify(&record, None).unwrap();
    let mentions: Vec<(&str, &str)> = labeled
        .indications
        .iter()
        .map(|m| (m.label.as_str(), m.surface.as_str()))
        .collect();
    assert_eq!(
        mentions,
        vec![("type 2 diabetes", "T2DM"), ("chronic kidney disease", "CKD")]
    );
}

#[test]
fn combination_in_a_randomized_trial_is_confirmatory() {
    let record = pair_record(
        "In a randomized controlled trial, DrugX plus DrugY improved HbA1c.",
        "DrugX",
        "DrugY",
    );
    let event = label(&record, None);
    assert_eq!(event.narrative_subtype, "combination");
    assert_eq!(event.narrative_confidence, 0.85);
    assert_eq!(event.claim_strength, ClaimStrength::Confirmatory);
    assert_eq!(
        event.claim_terms.iter().collect::<Vec<_>>(),
        vec!["randomized controlled trial"]
    );
    assert!(event.direction.is_none());
}

#[test]
fn add_on_marks_the_backbone() {
    let record = pair_record("DrugX added to DrugY lowered HbA1c.", "DrugX", "DrugY");
    let event = label(&record, None);
    assert_eq!(event.narrative_subtype, "combination");
    let direction = event.direction.unwrap();
    assert_eq!(direction.product_a_role, DirectionalRole::AddOn);
    assert_eq!(direction.product_b_role, DirectionalRole::Backbone);
}

#[test]
fn trial_phase_pattern_labels_clinical_trial_evidence() {
    let record = pair_record("A phase 3 study compared DrugX and DrugY.", "DrugX", "DrugY");
    let event = label(&record, None);
    assert_eq!(event.narrative_type, "evidence");
    assert_eq!(event.narrative_subtype, "clinical_trial");
    assert_eq!(
        event.context.get("trial_phase").iter().collect::<Vec<_>>(),
        vec!["phase 3"]
    );
    assert_eq!(event.claim_strength, ClaimStrength::Confirmatory);
}

#[test]
fn endpoint_rule_only_fires_in_listed_sections() {
    let text = "DrugX and DrugY lowered HbA1c.";
    let discussion = pair_record(text, "DrugX", "DrugY").with_section("Discussion");
    assert_eq!(label(&discussion, None).narrative_type, UNLABELED);

    let results = pair_record(text, "DrugX", "DrugY").with_section("Results");
    let event = label(&results, None);
    assert_eq!(event.narrative_type, "efficacy");
    assert_eq!(event.narrative_subtype, "clinical_endpoint");

    let positive = label(&discussion, Some(Sentiment::Positive));
    assert_eq!(positive.narrative_subtype, "positive_signal");
}
