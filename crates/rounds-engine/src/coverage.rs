//! Coverage assessment: which clinical elements the latest exchange covered.
//!
//! An element is judged at most once per phase. Once the judge reports it
//! covered, its id goes into the [`CoverageCache`] and later passes skip
//! it. Teaching points are tracked by id, so a point shared by several
//! elements is reported once. A failed judgment marks nothing.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, info, warn};

use rounds_bedrock::Judge;
use rounds_core::models::assessment::CoverageAssessment;
use rounds_core::models::phase::{ClinicalElement, Phase};

const COVERAGE_SYSTEM_PROMPT: &str = "\
You are assessing a medical learner's conversation with a simulated patient \
case. For each clinical element listed, decide whether the exchange below \
elicited or discussed it. Only count an element as covered if the \
information was actually asked about or revealed. Respond with a JSON \
object whose keys are the element descriptions exactly as given, each \
mapping to {\"covered\": true|false, \"details\": \"what was elicited\"}.";

/// Element and teaching point ids judged covered in the current phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageCache {
    covered: BTreeSet<String>,
    points: BTreeSet<String>,
}

impl CoverageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, element_id: &str) -> bool {
        self.covered.contains(element_id)
    }

    pub fn insert(&mut self, element_id: impl Into<String>) -> bool {
        self.covered.insert(element_id.into())
    }

    pub fn len(&self) -> usize {
        self.covered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.covered.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.covered.iter().map(String::as_str)
    }

    pub fn contains_point(&self, point_id: &str) -> bool {
        self.points.contains(point_id)
    }

    /// Record a covered teaching point. Returns `false` if it already was.
    pub fn insert_point(&mut self, point_id: impl Into<String>) -> bool {
        self.points.insert(point_id.into())
    }

    pub fn point_ids(&self) -> impl Iterator<Item = &str> {
        self.points.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.covered.clear();
        self.points.clear();
    }

    /// Set `elicited` on every element whose id is cached, and `covered` on
    /// every copy of a cached teaching point.
    pub fn refresh(&self, phase: &mut Phase) {
        for element in phase.elements_mut() {
            if self.contains(&element.id) {
                element.elicited = true;
            }
            for point in &mut element.teaching_points {
                if !point.covered && self.contains_point(&point.id) {
                    point.covered = true;
                }
            }
        }
    }
}

/// Judge the latest exchange against the phase's uncovered elements and
/// record what it covered.
pub async fn assess_coverage(
    judge: &dyn Judge,
    phase: &mut Phase,
    cache: &mut CoverageCache,
    user_message: &str,
    assistant_response: &str,
    temperature: f32,
) -> CoverageAssessment {
    cache.refresh(phase);

    let pending: Vec<(String, String)> = phase
        .elements()
        .filter(|e| !cache.contains(&e.id))
        .map(|e| (e.id.clone(), e.content.clone()))
        .collect();

    if pending.is_empty() {
        debug!(phase = %phase.phase_type, "all elements already covered, skipping judgment");
        return CoverageAssessment {
            missing_critical_elements: missing_required(phase, cache),
            ..CoverageAssessment::default()
        };
    }

    let user_content = coverage_request(&pending, user_message, assistant_response);
    let verdicts = match judge
        .judge_json(COVERAGE_SYSTEM_PROMPT, &user_content, temperature)
        .await
    {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return failed(phase, cache, format!("expected a JSON object, got: {other}"));
        }
        Err(e) => return failed(phase, cache, e.to_string()),
    };

    let mut newly_covered_ids: Vec<String> = Vec::new();
    let mut newly_covered_points: Vec<(String, Option<String>)> = Vec::new();

    for element in phase.elements_mut() {
        if cache.contains(&element.id) {
            continue;
        }
        let verdict = verdicts
            .get(&element.content)
            .or_else(|| verdicts.get(&element.id));
        let Some((true, details)) = verdict.map(parse_verdict) else {
            continue;
        };

        element.elicited = true;
        element.elicited_content = details.clone();
        cache.insert(element.id.clone());
        newly_covered_ids.push(element.id.clone());

        for point in &element.teaching_points {
            if cache.insert_point(point.id.clone()) {
                newly_covered_points.push((point.id.clone(), details.clone()));
            }
        }
    }

    let mut assessment = CoverageAssessment::default();

    // A point may be owned by several elements. Every copy is marked; the
    // first one is reported.
    for (point_id, details) in &newly_covered_points {
        let mut reported = false;
        for element in phase.elements_mut() {
            for point in element.teaching_points.iter_mut().filter(|p| p.id == *point_id) {
                if point.mark_covered(details.as_deref()) && !reported {
                    assessment.newly_covered_points.push(point.clone());
                    reported = true;
                }
            }
        }
    }

    assessment.newly_covered_elements = phase
        .elements()
        .filter(|e| newly_covered_ids.contains(&e.id))
        .cloned()
        .collect();
    assessment.missing_critical_elements = missing_required(phase, cache);

    info!(
        phase = %phase.phase_type,
        newly_covered = assessment.newly_covered_elements.len(),
        points = assessment.newly_covered_points.len(),
        missing = assessment.missing_critical_elements.len(),
        "coverage assessed"
    );

    assessment
}

/// Accepts `{"covered": bool, "details": str}` or a bare boolean.
fn parse_verdict(value: &Value) -> (bool, Option<String>) {
    match value {
        Value::Bool(covered) => (*covered, None),
        Value::Object(fields) => {
            let covered = fields
                .get("covered")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let details = fields
                .get("details")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string);
            (covered, details)
        }
        _ => (false, None),
    }
}

fn coverage_request(pending: &[(String, String)], user_message: &str, assistant_response: &str) -> String {
    let mut request = String::from("Clinical elements to check:\n");
    for (_, content) in pending {
        request.push_str("- ");
        request.push_str(content);
        request.push('\n');
    }
    request.push_str("\nLearner: ");
    request.push_str(user_message);
    request.push_str("\nTutor: ");
    request.push_str(assistant_response);
    request
}

fn missing_required(phase: &Phase, cache: &CoverageCache) -> Vec<ClinicalElement> {
    phase
        .required_elements
        .iter()
        .filter(|e| !cache.contains(&e.id))
        .cloned()
        .collect()
}

fn failed(phase: &Phase, cache: &CoverageCache, reason: String) -> CoverageAssessment {
    warn!(phase = %phase.phase_type, error = %reason, "coverage judgment failed, nothing marked");
    CoverageAssessment {
        missing_critical_elements: missing_required(phase, cache),
        judge_failure: Some(reason),
        ..CoverageAssessment::default()
    }
}
