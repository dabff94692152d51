//! Requirement recovery from damaged model output.

use std::sync::Arc;

use pagewright::adapters::completion::{ScriptedCompletionService, ScriptedReply};
use pagewright::services::json_repair::{parse_requirements, RepairStage};
use pagewright::services::RequirementsSynthesizer;

struct Fixture {
    name: &'static str,
    response: &'static str,
    stage: RepairStage,
    field: (&'static str, &'static str),
}

fn fixtures() -> Vec<Fixture> {
    vec![
        Fixture {
            name: "trailing commas",
            response: r#"{"requirements": [{"layout": {"contentPosition": "left",},},], "confidence": 0.7,}"#,
            stage: RepairStage::Repaired,
            field: ("contentPosition", "left"),
        },
        Fixture {
            name: "bare keys and words",
            response: r#"{requirements: [{layout: {contentPosition: "right", layoutType: split}}], confidence: 0.8}"#,
            stage: RepairStage::Repaired,
            field: ("layoutType", "split"),
        },
        Fixture {
            name: "single quotes",
            response: "{'requirements': [{'layout': {'imagePosition': 'top'}}]}",
            stage: RepairStage::Repaired,
            field: ("imagePosition", "top"),
        },
        Fixture {
            name: "missing commas",
            response: r#"{"requirements": [{"layout": {"contentPosition": "center" "layoutType": "grid"}}] "confidence": 0.6}"#,
            stage: RepairStage::Repaired,
            field: ("layoutType", "grid"),
        },
        Fixture {
            name: "truncated mid-string",
            response: r#"{"requirements": [{"layout": {"contentPosition": "right", "imagePosition": "le"#,
            stage: RepairStage::Repaired,
            field: ("contentPosition", "right"),
        },
        Fixture {
            name: "prose and fences",
            response: "Sure!\n```json\n{\"requirements\": [{\"layout\": {\"direction\": \"column\"}}]}\n```\nAnything else?",
            stage: RepairStage::Extracted,
            field: ("direction", "column"),
        },
    ]
}

#[test]
fn test_damaged_responses_recover_one_requirement() {
    for fixture in fixtures() {
        let outcome = parse_requirements(fixture.response);
        assert_eq!(outcome.stage, fixture.stage, "{}", fixture.name);
        assert_eq!(outcome.entries.len(), 1, "{}", fixture.name);

        let (key, expected) = fixture.field;
        assert_eq!(outcome.entries[0]["layout"][key], expected, "{}", fixture.name);
    }
}

#[test]
fn test_confidence_survives_repair() {
    let outcome = parse_requirements(fixtures()[0].response);
    assert_eq!(outcome.confidence, Some(0.7));

    let outcome = parse_requirements(fixtures()[2].response);
    assert_eq!(outcome.confidence, None);
}

#[test]
fn test_hopeless_response_reaches_default() {
    for response in ["", "No JSON today.", "```\n```", "null"] {
        let outcome = parse_requirements(response);
        assert_eq!(outcome.stage, RepairStage::Default, "{response:?}");
        assert!(outcome.entries.is_empty());
    }
}

#[test]
fn test_object_wins_over_bracketed_prose() {
    let outcome = parse_requirements(
        "Note [draft]: {\"requirements\": [{\"layout\": {\"contentPosition\": \"right\"}}], \"confidence\": 0.9}",
    );
    assert_eq!(outcome.stage, RepairStage::Extracted);
    assert_eq!(outcome.entries.len(), 1);
    assert_eq!(outcome.entries[0]["layout"]["contentPosition"], "right");
    assert_eq!(outcome.confidence, Some(0.9));
}

#[test]
fn test_object_wins_over_trailing_array() {
    let outcome = parse_requirements(
        "{\"requirements\": [{\"layout\": {\"layoutType\": \"grid\"}}]}\nAlternatives: [\"carousel\", \"list\"]",
    );
    assert_eq!(outcome.stage, RepairStage::Extracted);
    assert_eq!(outcome.entries.len(), 1);
    assert_eq!(outcome.entries[0]["layout"]["layoutType"], "grid");
}

#[test]
fn test_array_is_lifted_only_without_requirements_object() {
    let outcome = parse_requirements("Sections I would build: [\"navbar\", \"hero\",]");
    assert_eq!(outcome.stage, RepairStage::LiftedArray);
    assert_eq!(outcome.entries, vec!["navbar", "hero"]);

    let outcome = parse_requirements("{\"summary\": \"none\"} then [\"navbar\"]");
    assert_eq!(outcome.stage, RepairStage::LiftedArray);

    let outcome = parse_requirements("{\"requirements\": []} then [\"navbar\"]");
    assert_eq!(outcome.stage, RepairStage::Default);
}

#[tokio::test]
async fn test_synthesizer_keeps_object_after_bracketed_prose() {
    let completion = Arc::new(ScriptedCompletionService::new().on(
        "requirements analyst",
        ScriptedReply::text(
            "Note [draft]: {\"requirements\": [{\"layout\": {\"contentPosition\": \"right\"}}], \"confidence\": 0.9}",
        ),
    ));
    let synthesizer = RequirementsSynthesizer::new(completion);

    let parsed = synthesizer.parse("a hero banner", None).await;
    assert!((parsed.confidence - 0.9).abs() < 1e-6);
    assert_eq!(parsed.primary().layout.content_position, "right");
    assert!(!parsed.primary().content.elements.iter().any(|e| e == "draft"));
}

#[tokio::test]
async fn test_synthesizer_normalizes_repaired_reply() {
    let completion = Arc::new(ScriptedCompletionService::new().on(
        "requirements analyst",
        ScriptedReply::text(
            "{requirements: [{layout: {contentPosition: 'right', imagePosition: 'left'}, \
             content: {elements: ['headline' 'button'], counts: {button: '2'}}, \
             styling: {responsive: 'yes'}}], confidence: 0.75",
        ),
    ));
    let synthesizer = RequirementsSynthesizer::new(completion.clone());

    let parsed = synthesizer.parse("a hero banner", None).await;
    assert_eq!(parsed.requirements.len(), 1);
    assert!((parsed.confidence - 0.75).abs() < 1e-6);

    let requirement = parsed.primary();
    assert_eq!(requirement.layout.content_position, "right");
    assert_eq!(requirement.layout.image_position, "left");
    assert!(requirement.content.elements.iter().any(|e| e == "headline"));
    assert!(requirement.content.elements.iter().any(|e| e == "button"));
    assert_eq!(requirement.content.counts.get("button"), Some(&2));
    assert!(requirement.styling.responsive);
    assert_eq!(completion.call_count(), 1);
}

#[tokio::test]
async fn test_synthesizer_falls_back_to_prompt_hints() {
    let completion = Arc::new(
        ScriptedCompletionService::new()
            .on("requirements analyst", ScriptedReply::text("I am not able to answer in JSON.")),
    );
    let synthesizer = RequirementsSynthesizer::new(completion);

    let parsed = synthesizer
        .parse("a hero with text on the right and an image on the left", None)
        .await;
    assert_eq!(parsed.requirements.len(), 1);

    let requirement = parsed.primary();
    assert_eq!(requirement.layout.content_position, "right");
    assert_eq!(requirement.layout.image_position, "left");
}
