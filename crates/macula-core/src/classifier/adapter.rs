//! Upstream response adapters.
//!
//! The endpoint's reply format has changed over time. Each adapter recognises
//! one shape of a single prediction entry and converts it into a `Prediction`.
//! An adapter returns `None` when the shape is not its own, and `Some(Err)`
//! when the shape matches but the content is unusable.

use serde_json::{Map, Value};

use super::Prediction;
use crate::error::{MaculaError, MaculaResult};

type Adapter = fn(&Value) -> Option<MaculaResult<Prediction>>;

const ADAPTERS: &[(&str, Adapter)] = &[
    ("label-lists", from_label_lists),
    ("scalar", from_scalar),
    ("struct-value", from_struct_value),
];

/// Convert a full `:predict` response body.
pub fn adapt_response(body: &Value) -> MaculaResult<Prediction> {
    let predictions = body
        .get("predictions")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("response has no 'predictions' array"))?;

    let first = predictions
        .first()
        .ok_or_else(|| MaculaError::classification("endpoint returned no predictions"))?;

    adapt_prediction(first)
}

/// Convert a single prediction entry, trying each known shape in turn.
pub fn adapt_prediction(entry: &Value) -> MaculaResult<Prediction> {
    for (name, adapter) in ADAPTERS {
        if let Some(result) = adapter(entry) {
            tracing::debug!(shape = *name, "Matched prediction shape");
            return result;
        }
    }
    Err(malformed("unrecognized prediction shape"))
}

/// `{"displayNames": [..], "confidences": [..]}`. Picks the top entry.
fn from_label_lists(entry: &Value) -> Option<MaculaResult<Prediction>> {
    let names = entry.get("displayNames")?.as_array()?;
    let scores = entry.get("confidences")?.as_array()?;
    Some(top_of_lists(names, scores))
}

fn top_of_lists(names: &[Value], scores: &[Value]) -> MaculaResult<Prediction> {
    if names.is_empty() {
        return Err(MaculaError::classification("endpoint returned no predictions"));
    }
    if names.len() != scores.len() {
        return Err(malformed(&format!(
            "{} labels but {} confidences",
            names.len(),
            scores.len()
        )));
    }

    let mut best: Option<Prediction> = None;
    for (name, score) in names.iter().zip(scores) {
        let label = label_from(name)?;
        let confidence = normalize_confidence(score.as_f64())?;
        if best.as_ref().is_none_or(|b| confidence > b.confidence) {
            best = Some(Prediction { label, confidence });
        }
    }
    best.ok_or_else(|| MaculaError::classification("endpoint returned no predictions"))
}

/// `{"label"|"displayName": s, "confidence"|"score": n}`.
fn from_scalar(entry: &Value) -> Option<MaculaResult<Prediction>> {
    let obj = entry.as_object()?;
    let name = first_field(obj, &["label", "displayName", "display_name"])?;
    if name.is_array() {
        return None;
    }
    let score = first_field(obj, &["confidence", "score"]).and_then(Value::as_f64);
    Some(scalar_prediction(name, score))
}

fn scalar_prediction(name: &Value, score: Option<f64>) -> MaculaResult<Prediction> {
    let label = label_from(name)?;
    let confidence = normalize_confidence(score)?;
    Ok(Prediction { label, confidence })
}

/// Protobuf `Value` wrapping (`structValue.fields`, `listValue.values`, ...).
fn from_struct_value(entry: &Value) -> Option<MaculaResult<Prediction>> {
    entry.get("structValue")?;
    let plain = unwrap_proto_value(entry);
    Some(
        from_label_lists(&plain)
            .or_else(|| from_scalar(&plain))
            .unwrap_or_else(|| Err(malformed("unrecognized struct-wrapped prediction"))),
    )
}

/// Strip protobuf `Value` wrappers, recursively.
fn unwrap_proto_value(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return value.clone();
    };

    if let Some(fields) = obj.get("structValue").and_then(|s| s.get("fields")).and_then(Value::as_object) {
        let unwrapped: Map<String, Value> = fields
            .iter()
            .map(|(k, v)| (k.clone(), unwrap_proto_value(v)))
            .collect();
        return Value::Object(unwrapped);
    }
    if let Some(values) = obj.get("listValue").and_then(|l| l.get("values")).and_then(Value::as_array) {
        return Value::Array(values.iter().map(unwrap_proto_value).collect());
    }
    for key in ["stringValue", "numberValue", "boolValue"] {
        if let Some(inner) = obj.get(key) {
            return inner.clone();
        }
    }
    if obj.contains_key("nullValue") {
        return Value::Null;
    }
    value.clone()
}

fn first_field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

fn label_from(value: &Value) -> MaculaResult<String> {
    match value.as_str().map(str::trim) {
        Some(label) if !label.is_empty() => Ok(label.to_string()),
        _ => Err(malformed("prediction label is missing or empty")),
    }
}

/// Fractions pass through, percentages in `(1, 100]` are scaled down.
fn normalize_confidence(raw: Option<f64>) -> MaculaResult<f64> {
    let raw = raw.ok_or_else(|| malformed("prediction confidence is missing or not a number"))?;
    if !raw.is_finite() || !(0.0..=100.0).contains(&raw) {
        return Err(malformed(&format!("prediction confidence {} is out of range", raw)));
    }
    Ok(if raw > 1.0 { raw / 100.0 } else { raw })
}

fn malformed(detail: &str) -> MaculaError {
    MaculaError::classification(format!("malformed prediction: {}", detail))
}
