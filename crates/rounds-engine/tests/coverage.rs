mod common;

use serde_json::json;

use common::{ScriptedJudge, small_case};
use rounds_core::models::phase::{ClinicalElement, Phase, PhaseConfig, PhaseType};
use rounds_engine::coverage::{CoverageCache, assess_coverage};

#[tokio::test]
async fn covered_elements_are_marked_with_details() {
    let mut case = small_case();
    let phase = case.phase_mut(PhaseType::History);
    let mut cache = CoverageCache::new();
    let judge = ScriptedJudge::new().json(json!({
        "Onset of cough": {"covered": true, "details": "Started three days ago"},
        "Sputum character": {"covered": false, "details": ""},
        "Travel history": {"covered": false}
    }));

    let assessment = assess_coverage(
        &judge,
        phase,
        &mut cache,
        "When did the cough start?",
        "Three days ago.",
        0.7,
    )
    .await;

    assert_eq!(assessment.newly_covered_elements.len(), 1);
    assert_eq!(assessment.newly_covered_elements[0].id, "E1");
    assert_eq!(assessment.newly_covered_points.len(), 1);
    assert_eq!(assessment.newly_covered_points[0].id, "TP1");
    assert_eq!(
        assessment
            .missing_critical_elements
            .iter()
            .map(|e| e.id.as_str())
            .collect::<Vec<_>>(),
        vec!["E2"]
    );
    assert!(assessment.judge_failure.is_none());

    let e1 = &phase.required_elements[0];
    assert!(e1.elicited);
    assert_eq!(e1.elicited_content.as_deref(), Some("Started three days ago"));
    assert!(e1.teaching_points[0].covered);
    assert!(cache.contains("E1"));
    assert!(!phase.required_elements[1].elicited);
}

#[tokio::test]
async fn covered_elements_are_not_judged_again() {
    let mut case = small_case();
    let phase = case.phase_mut(PhaseType::History);
    let mut cache = CoverageCache::new();
    let judge = ScriptedJudge::new()
        .json(json!({"Onset of cough": {"covered": true, "details": "3 days"}}))
        .json(json!({
            "Onset of cough": {"covered": true, "details": "again"},
            "Sputum character": {"covered": true, "details": "rusty"}
        }));

    assess_coverage(&judge, phase, &mut cache, "onset?", "3 days", 0.7).await;
    let second = assess_coverage(&judge, phase, &mut cache, "sputum?", "rusty", 0.7).await;

    let newly: Vec<&str> = second
        .newly_covered_elements
        .iter()
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(newly, vec!["E2"]);
    assert!(second.newly_covered_points.is_empty());
    assert!(second.missing_critical_elements.is_empty());
    assert_eq!(
        phase.required_elements[0].elicited_content.as_deref(),
        Some("3 days")
    );

    let request = &judge.requests()[1];
    assert!(!request.contains("Onset of cough"));
    assert!(request.contains("Sputum character"));
}

#[tokio::test]
async fn nothing_pending_skips_the_judge() {
    let mut case = small_case();
    let phase = case.phase_mut(PhaseType::History);
    let mut cache = CoverageCache::new();
    for id in ["E1", "E2", "O1"] {
        cache.insert(id);
    }
    let judge = ScriptedJudge::new();

    let assessment = assess_coverage(&judge, phase, &mut cache, "anything", "reply", 0.7).await;

    assert_eq!(judge.json_calls(), 0);
    assert!(assessment.newly_covered_elements.is_empty());
    assert!(assessment.missing_critical_elements.is_empty());
    assert!(phase.elements().all(|e| e.elicited));
}

#[tokio::test]
async fn judge_failure_marks_nothing() {
    let mut case = small_case();
    let phase = case.phase_mut(PhaseType::History);
    let mut cache = CoverageCache::new();
    let judge = ScriptedJudge::new().json_failure("throttled");

    let assessment = assess_coverage(&judge, phase, &mut cache, "onset?", "3 days", 0.7).await;

    assert!(assessment.judge_failure.unwrap().contains("throttled"));
    assert!(assessment.newly_covered_elements.is_empty());
    assert_eq!(assessment.missing_critical_elements.len(), 2);
    assert!(cache.is_empty());
    assert!(phase.elements().all(|e| !e.elicited));
}

#[tokio::test]
async fn non_object_response_is_a_failure() {
    let mut case = small_case();
    let phase = case.phase_mut(PhaseType::History);
    let mut cache = CoverageCache::new();
    let judge = ScriptedJudge::new().json(json!(["Onset of cough"]));

    let assessment = assess_coverage(&judge, phase, &mut cache, "onset?", "3 days", 0.7).await;

    assert!(assessment.judge_failure.is_some());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn verdicts_keyed_by_id_or_bare_bool_are_accepted() {
    let mut case = small_case();
    let phase = case.phase_mut(PhaseType::History);
    let mut cache = CoverageCache::new();
    let judge = ScriptedJudge::new().json(json!({
        "E2": {"covered": true, "details": "green"},
        "Travel history": true
    }));

    let assessment = assess_coverage(&judge, phase, &mut cache, "q", "a", 0.7).await;

    let newly: Vec<&str> = assessment
        .newly_covered_elements
        .iter()
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(newly, vec!["E2", "O1"]);
    assert_eq!(phase.optional_elements[0].elicited_content, None);
}

fn phase_with_shared_point() -> Phase {
    let mut phase = Phase::new(PhaseType::History, PhaseConfig::default());
    phase.required_elements = vec![
        ClinicalElement::new("E1", "Onset of cough", true)
            .with_teaching_point("TP1", "Acute onset favors infection"),
        ClinicalElement::new("E2", "Fever pattern", true)
            .with_teaching_point("TP1", "Acute onset favors infection"),
    ];
    phase
}

#[tokio::test]
async fn shared_teaching_point_is_reported_once_across_turns() {
    let mut phase = phase_with_shared_point();
    let mut cache = CoverageCache::new();
    let judge = ScriptedJudge::new()
        .json(json!({"Onset of cough": {"covered": true, "details": "3 days"}}))
        .json(json!({"Fever pattern": {"covered": true, "details": "evening spikes"}}));

    let first = assess_coverage(&judge, &mut phase, &mut cache, "onset?", "3 days", 0.7).await;
    let second = assess_coverage(&judge, &mut phase, &mut cache, "fever?", "spikes", 0.7).await;

    let first_points: Vec<&str> = first
        .newly_covered_points
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(first_points, vec!["TP1"]);
    assert!(second.newly_covered_points.is_empty());
    assert_eq!(second.newly_covered_elements.len(), 1);

    assert!(phase.elements().all(|e| e.teaching_points[0].covered));
    assert_eq!(
        phase.required_elements[1].teaching_points[0]
            .coverage_notes
            .as_deref(),
        Some("3 days")
    );
    assert_eq!(cache.point_ids().collect::<Vec<_>>(), vec!["TP1"]);
}

#[tokio::test]
async fn shared_teaching_point_covered_twice_in_one_turn_is_reported_once() {
    let mut phase = phase_with_shared_point();
    let mut cache = CoverageCache::new();
    let judge = ScriptedJudge::new().json(json!({
        "Onset of cough": {"covered": true, "details": "3 days"},
        "Fever pattern": {"covered": true, "details": "evening spikes"}
    }));

    let assessment = assess_coverage(&judge, &mut phase, &mut cache, "q", "a", 0.7).await;

    assert_eq!(assessment.newly_covered_elements.len(), 2);
    assert_eq!(assessment.newly_covered_points.len(), 1);
    assert!(
        assessment
            .newly_covered_elements
            .iter()
            .all(|e| e.teaching_points[0].covered)
    );
    assert_eq!(phase.teaching_points().count(), 1);

    cache.clear();
    assert_eq!(cache.point_ids().count(), 0);
}
