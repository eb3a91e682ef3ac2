use std::path::Path;

use rounds_core::error::CoreError;
use rounds_core::loader::{list_cases, load_case, parse_case, PromptLibrary};
use rounds_core::models::case::DiagnosisCategory;
use rounds_core::models::phase::{PhaseType, DEFAULT_COMPLETION_MESSAGE, DEFAULT_OPENING_PROMPT};

const MINIMAL_CASE: &str = r#"{
  "metadata": {"id": "mini", "title": "A short case."},
  "clinical_elements": {
    "history": {
      "required": [
        {"id": "e1", "content": "Onset", "teaching_points": [{"id": "tp1", "content": "Timing matters"}]},
        {"id": "e2", "content": "Severity", "elicited": true}
      ],
      "optional": [{"id": "e3", "content": "Travel", "required": false}]
    }
  },
  "differential_diagnosis": [{"name": "Asthma", "category": "possible", "key_features": []}],
  "final_diagnosis": {"name": "Asthma", "category": "likely"}
}"#;

fn repo_root() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../.."))
}

#[test]
fn parse_case_builds_every_phase() {
    let case = parse_case("mini", MINIMAL_CASE, &PromptLibrary::builtin()).unwrap();

    assert_eq!(case.phases().len(), PhaseType::ALL.len());
    let history = case.phase(PhaseType::History);
    assert_eq!(history.required_elements.len(), 2);
    assert_eq!(history.optional_elements.len(), 1);
    assert!(case.phase(PhaseType::Discussion).required_elements.is_empty());
    assert_eq!(case.final_diagnosis.category, DiagnosisCategory::Likely);
}

#[test]
fn parse_case_ignores_elicited_flags_in_document() {
    let case = parse_case("mini", MINIMAL_CASE, &PromptLibrary::builtin()).unwrap();

    let history = case.phase(PhaseType::History);
    assert!(history.elements().all(|e| !e.elicited));
    assert!(history.teaching_points().all(|p| !p.covered));
}

#[test]
fn parse_case_rejects_duplicate_element_ids() {
    let doc = r#"{
      "metadata": {"id": "dup", "title": "Dup"},
      "clinical_elements": {
        "physical": {"required": [{"id": "x", "content": "A"}], "optional": [{"id": "x", "content": "B"}]}
      },
      "final_diagnosis": {"name": "X", "category": "likely"}
    }"#;

    let err = parse_case("dup", doc, &PromptLibrary::builtin()).unwrap_err();
    assert!(matches!(err, CoreError::MalformedCase { .. }), "got {err:?}");
}

#[test]
fn parse_case_rejects_duplicate_element_content() {
    let doc = r#"{
      "metadata": {"id": "dup", "title": "Dup"},
      "clinical_elements": {
        "history": {
          "required": [{"id": "a", "content": "Smoking history"}],
          "optional": [{"id": "b", "content": "Smoking history"}]
        }
      },
      "final_diagnosis": {"name": "X", "category": "likely"}
    }"#;

    let err = parse_case("dup", doc, &PromptLibrary::builtin()).unwrap_err();
    assert!(
        matches!(&err, CoreError::MalformedCase { reason, .. } if reason.contains("content")),
        "got {err:?}"
    );
}

#[test]
fn same_content_in_different_phases_is_allowed() {
    let doc = r#"{
      "metadata": {"id": "ok", "title": "Ok"},
      "clinical_elements": {
        "history": {"required": [{"id": "a", "content": "Chest pain"}]},
        "physical": {"required": [{"id": "b", "content": "Chest pain"}]}
      },
      "final_diagnosis": {"name": "X", "category": "likely"}
    }"#;

    assert!(parse_case("ok", doc, &PromptLibrary::builtin()).is_ok());
}

#[test]
fn parse_case_rejects_missing_final_diagnosis() {
    let doc = r#"{"metadata": {"id": "bad", "title": "Bad"}}"#;
    let err = parse_case("bad", doc, &PromptLibrary::builtin()).unwrap_err();
    assert!(matches!(err, CoreError::MalformedCase { .. }));
}

#[test]
fn load_case_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_case(dir.path(), "nope", &PromptLibrary::builtin()).unwrap_err();
    assert!(matches!(err, CoreError::CaseNotFound(id) if id == "nope"));
}

#[test]
fn prompt_library_falls_back_for_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let library = PromptLibrary::load(dir.path()).unwrap();

    let config = library.config(PhaseType::Testing);
    assert_eq!(config.opening_prompt, DEFAULT_OPENING_PROMPT);
    assert_eq!(config.completion_message, DEFAULT_COMPLETION_MESSAGE);
    assert!(config.prohibited_topics.is_empty());
    assert!(config.advancement_criteria.is_empty());
}

#[test]
fn prompt_library_fills_missing_fields() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("phases")).unwrap();
    std::fs::write(
        dir.path().join("phases/history.json"),
        r#"{"opening_prompt": "Ask away.", "focus_area": "the history"}"#,
    )
    .unwrap();

    let library = PromptLibrary::load(dir.path()).unwrap();
    let doc = library.document(PhaseType::History);
    assert_eq!(doc.config.opening_prompt, "Ask away.");
    assert_eq!(doc.config.completion_message, DEFAULT_COMPLETION_MESSAGE);
    assert_eq!(doc.focus_area, "the history");
}

#[test]
fn prompt_library_rejects_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("phases")).unwrap();
    std::fs::write(dir.path().join("phases/physical.json"), "{ not json").unwrap();

    let err = PromptLibrary::load(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::MalformedPrompt { .. }));
}

#[test]
fn list_cases_returns_sorted_stems() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("zeta.json"), "{}").unwrap();
    std::fs::write(dir.path().join("alpha.json"), "{}").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "").unwrap();

    assert_eq!(list_cases(dir.path()).unwrap(), vec!["alpha", "zeta"]);
}

#[test]
fn bundled_case_loads_with_bundled_prompts() {
    let root = repo_root();
    let library = PromptLibrary::load(&root.join("prompts")).unwrap();
    let case = load_case(&root.join("cases"), "community-acquired-pneumonia", &library).unwrap();

    let history = case.phase(PhaseType::History);
    assert_eq!(history.required_elements.len(), 3);
    assert!(!history.config.prohibited_topics.is_empty());
    // No discussion prompt file ships, so the defaults apply.
    assert_eq!(
        case.phase(PhaseType::Discussion).config.opening_prompt,
        DEFAULT_OPENING_PROMPT
    );
}
