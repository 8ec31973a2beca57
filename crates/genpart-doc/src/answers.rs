//! Answer map helpers
//!
//! Answers are a JSON object keyed by question id. Values are free-form:
//! strings, numbers, booleans, arrays, or nested objects for tables
//! (`answers[questionId][rowId][columnId]`).

use serde_json::{Map, Value};

/// Answers keyed by question id
pub type Answers = Map<String, Value>;

/// Resolve a dotted/indexed path such as `t1.row2.score` or `items[0].label`
///
/// Numeric segments index arrays as well (`items.0.label`).
#[must_use]
pub fn resolve_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    let mut current = root;
    for segment in path.split('.') {
        let (key, indices) = split_indices(segment)?;
        if !key.is_empty() {
            current = step(current, key)?;
        }
        for index in indices {
            current = current.as_array()?.get(index)?;
        }
    }
    Some(current)
}

/// [`resolve_path`] rooted at an answer map
#[must_use]
pub fn resolve_answer<'a>(answers: &'a Answers, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let (key, indices) = split_indices(head)?;
    let mut current = answers.get(key)?;
    for index in indices {
        current = current.as_array()?.get(index)?;
    }
    match rest {
        Some(rest) => resolve_path(current, rest),
        None => Some(current),
    }
}

fn step<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Split `name[1][2]` into `("name", [1, 2])`
fn split_indices(segment: &str) -> Option<(&str, Vec<usize>)> {
    let Some(open) = segment.find('[') else {
        return Some((segment, Vec::new()));
    };
    let (key, mut rest) = segment.split_at(open);
    let mut indices = Vec::new();
    while let Some(stripped) = rest.strip_prefix('[') {
        let close = stripped.find(']')?;
        indices.push(stripped[..close].trim().parse().ok()?);
        rest = &stripped[close + 1..];
    }
    rest.is_empty().then_some((key, indices))
}

/// Whether a value carries user input
///
/// Non-blank strings, any number, `true`, and containers holding any
/// meaningful value count; everything else is empty.
#[must_use]
pub fn has_meaningful_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Number(_) => true,
        Value::Bool(b) => *b,
        Value::Array(items) => items.iter().any(has_meaningful_value),
        Value::Object(map) => map.values().any(has_meaningful_value),
    }
}

/// Whether any of `question_ids` has a meaningful answer
#[must_use]
pub fn has_meaningful_answers(question_ids: &[String], answers: &Answers) -> bool {
    question_ids
        .iter()
        .any(|id| answers.get(id).is_some_and(has_meaningful_value))
}

/// Answers restricted to `question_ids`, in that order
#[must_use]
pub fn answers_subset(question_ids: &[String], answers: &Answers) -> Answers {
    question_ids
        .iter()
        .filter_map(|id| answers.get(id).map(|v| (id.clone(), v.clone())))
        .collect()
}

/// Display text of a scalar or list answer
///
/// Arrays join with `, `; null becomes empty.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
