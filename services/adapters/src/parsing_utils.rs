//! JSON helpers shared by provider adapters
//!
//! Provider payloads are loosely typed: ids may arrive as numbers or strings,
//! metrics may sit under a `metrics` sub-object or inline. These helpers
//! normalise that without ever coercing non-numeric values into metrics.

use serde_json::{Map, Value};
use tracing::debug;
use types::{AttributeValue, Attributes, CanonicalEntity, MetricDataPoint};

/// Static `provider field -> canonical metric name` table
pub type MetricTable = &'static [(&'static str, &'static str)];

/// Array under `key`, if present and an array
pub fn array_field<'a>(value: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    value.get(key).and_then(Value::as_array)
}

/// Object under `key`, if present and an object
pub fn object_field<'a>(value: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    value.get(key).and_then(Value::as_object)
}

/// Render a scalar as text; numbers keep their JSON form
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First of `keys` present as a non-empty scalar, rendered as text
pub fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find_map(scalar_to_string)
}

/// Integer under `key`; numeric strings are accepted
pub fn i64_field(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Boolean under `key`
pub fn bool_field(value: &Value, key: &str) -> Option<bool> {
    value.get(key).and_then(Value::as_bool)
}

/// Finite JSON number; anything else is rejected
pub fn finite_number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

/// Numeric metric field, read from the `metrics` sub-object first, then the
/// item itself. Present but non-numeric values are dropped and logged.
pub fn metric_value(item: &Value, field: &str) -> Option<f64> {
    let raw = item
        .get("metrics")
        .and_then(|metrics| metrics.get(field))
        .or_else(|| item.get(field))?;

    match finite_number(raw) {
        Some(value) => Some(value),
        None => {
            if !raw.is_null() {
                debug!(field, value = %raw, "Dropping non-numeric metric field");
            }
            None
        }
    }
}

/// Metrics for every field of `table` present on `item`. Absent fields are
/// skipped, never defaulted.
pub fn map_metrics(
    entity: &CanonicalEntity,
    item: &Value,
    table: MetricTable,
    timestamp: i64,
) -> Vec<MetricDataPoint> {
    table
        .iter()
        .filter_map(|(field, metric_name)| {
            metric_value(item, field)
                .map(|value| MetricDataPoint::for_entity(entity, *metric_name, value, Some(timestamp)))
        })
        .collect()
}

/// Scalar attributes copied from `item` for each listed field present
pub fn scalar_attributes(item: &Value, fields: &[&str]) -> Attributes {
    fields
        .iter()
        .filter_map(|field| {
            item.get(*field)
                .and_then(AttributeValue::from_json)
                .map(|value| (field.to_string(), value))
        })
        .collect()
}

/// Observation time carried by the payload (`timestamp` or `observedAt`, in ms)
pub fn payload_timestamp(payload: &Value) -> Option<i64> {
    ["timestamp", "observedAt"]
        .iter()
        .filter_map(|key| payload.get(*key))
        .find_map(Value::as_i64)
}
