//! Model response parsing
//!
//! The model is asked for bare JSON but often wraps it in a markdown fence.
//! Parsing is field-by-field: unknown keys are ignored, missing or `null`
//! fields take their defaults, and anything that is not an array of objects
//! where one is expected is rejected.

use serde_json::{Map, Value};

use super::{
    ExtractedDecision, ExtractedRisk, ExtractedTask, ExtractionError, ExtractionResult,
};

/// Return the text inside the first markdown code fence, if any
///
/// A ```` ```json ```` opener wins over a bare ```` ``` ````. An unclosed
/// fence runs to the end of the text.
pub fn strip_code_fence(text: &str) -> &str {
    let inner = if let Some((_, rest)) = text.split_once("```json") {
        rest
    } else if let Some((_, rest)) = text.split_once("```") {
        rest
    } else {
        return text.trim();
    };

    match inner.split_once("```") {
        Some((body, _)) => body.trim(),
        None => inner.trim(),
    }
}

/// Parse a completion into an [`ExtractionResult`]
pub fn parse_model_response(text: &str) -> Result<ExtractionResult, ExtractionError> {
    let body = strip_code_fence(text);

    let value: Value = serde_json::from_str(body)
        .map_err(|e| ExtractionError::parse(e.to_string(), text))?;

    let object = value
        .as_object()
        .ok_or_else(|| ExtractionError::parse("expected a JSON object at top level", text))?;

    let risks = records(object, "risks", text)?
        .into_iter()
        .map(risk_from)
        .collect();
    let tasks = records(object, "tasks", text)?
        .into_iter()
        .map(task_from)
        .collect();
    let decisions = records(object, "decisions", text)?
        .into_iter()
        .map(decision_from)
        .collect();

    Ok(ExtractionResult {
        risks,
        tasks,
        decisions,
        raw: value,
    })
}

/// Objects under `key`; absent or `null` means none
fn records<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    raw: &str,
) -> Result<Vec<&'a Map<String, Value>>, ExtractionError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_object().ok_or_else(|| {
                    ExtractionError::parse(format!("'{}' entry {} is not an object", key, i), raw)
                })
            })
            .collect(),
        Some(_) => Err(ExtractionError::parse(format!("'{}' is not an array", key), raw)),
    }
}

/// Scalar field as text; `null`, absent and structured values are `None`
fn field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Like [`field`] but blank text also counts as missing
fn non_blank(object: &Map<String, Value>, key: &str) -> Option<String> {
    field(object, key).filter(|s| !s.trim().is_empty())
}

fn risk_from(object: &Map<String, Value>) -> ExtractedRisk {
    let defaults = ExtractedRisk::default();
    ExtractedRisk {
        title: field(object, "title").unwrap_or(defaults.title),
        description: field(object, "description").unwrap_or(defaults.description),
        category: field(object, "category").unwrap_or(defaults.category),
        probability: field(object, "probability").unwrap_or(defaults.probability),
        impact: field(object, "impact").unwrap_or(defaults.impact),
        owner: field(object, "owner").unwrap_or(defaults.owner),
        mitigation_plan: field(object, "mitigation_plan").unwrap_or(defaults.mitigation_plan),
    }
}

fn task_from(object: &Map<String, Value>) -> ExtractedTask {
    let defaults = ExtractedTask::default();
    ExtractedTask {
        task: field(object, "task").unwrap_or(defaults.task),
        owner: field(object, "owner").unwrap_or(defaults.owner),
        due_date: non_blank(object, "due_date"),
        linked_risk: non_blank(object, "linked_risk"),
    }
}

fn decision_from(object: &Map<String, Value>) -> ExtractedDecision {
    ExtractedDecision {
        decision: field(object, "decision").unwrap_or_default(),
        context: field(object, "context").unwrap_or_default(),
    }
}
