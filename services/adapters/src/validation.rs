//! # Adapter Validation Framework
//!
//! Pure structural checks for adapter input and output. Nothing here performs
//! I/O or mutates state.
//!
//! ## Entry Points
//!
//! | Function | Checks |
//! |----------|--------|
//! | [`validate_input`] | payload is an object, carries a known data source, collections have the right shape and required fields |
//! | [`validate_result`] | identifier format, kinds, type-specific fields, numeric metrics, well-formed edges; strict mode adds referential checks |
//! | [`format_report`] | human-readable rendering, presentation only |
//!
//! `valid` is false exactly when `errors` is non-empty; warnings never flip it.
//!
//! ## Strict Mode
//!
//! - unknown but well-formed entity kinds become errors instead of warnings
//! - every relationship endpoint must reference an entity in the same result
//! - non-CLUSTER entities taking part in no relationship produce warnings
//!
//! Building with the `strict-validation` feature makes strict the default mode.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use types::{
    EntityId, EntityKind, RelationshipType, TransformationResult, ValidationReport,
    ValidationStats,
};

// ============================================================================
// MODES AND SCHEMAS
// ============================================================================

/// How strictly results are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Skip result validation entirely
    Off,
    /// Structural checks only
    Lenient,
    /// Structural plus referential checks
    Strict,
}

impl Default for ValidationMode {
    fn default() -> Self {
        if cfg!(feature = "strict-validation") {
            ValidationMode::Strict
        } else {
            ValidationMode::Lenient
        }
    }
}

impl ValidationMode {
    /// Whether results are validated at all
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ValidationMode::Off)
    }

    /// Whether strict rules apply
    pub fn is_strict(&self) -> bool {
        matches!(self, ValidationMode::Strict)
    }
}

/// Expected JSON shape of a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionShape {
    /// Array of objects
    Array,
    /// Single object
    Object,
}

/// Rules for one top-level data source key
#[derive(Debug, Clone, Copy)]
pub struct CollectionRule {
    /// Top-level key, e.g. `brokers`
    pub key: &'static str,
    /// Expected shape
    pub shape: CollectionShape,
    /// Fields whose absence is an error; alternatives are separated by `|`
    pub required_fields: &'static [&'static str],
    /// Fields whose absence is a warning
    pub optional_fields: &'static [&'static str],
}

/// Input contract of one provider
#[derive(Debug, Clone, Copy)]
pub struct InputSchema {
    /// Provider name
    pub provider: &'static str,
    /// Recognised data sources; at least one must be present
    pub collections: &'static [CollectionRule],
}

impl InputSchema {
    /// Names of the recognised data-source keys
    pub fn data_source_keys(&self) -> Vec<&'static str> {
        self.collections.iter().map(|rule| rule.key).collect()
    }
}

// ============================================================================
// INPUT VALIDATION
// ============================================================================

/// Validate `payload` against the built-in schema of `provider`.
///
/// Providers without a built-in schema produce a report with a single error.
pub fn validate_input(payload: &Value, provider: &str) -> ValidationReport {
    match crate::providers::schema_for(provider) {
        Some(schema) => validate_input_with(schema, payload),
        None => {
            let mut report = ValidationReport::new();
            report.error("", format!("no input schema registered for provider '{provider}'"));
            report
        }
    }
}

/// Validate `payload` against an explicit schema
pub fn validate_input_with(schema: &InputSchema, payload: &Value) -> ValidationReport {
    let mut report = ValidationReport::new();

    let Some(object) = payload.as_object() else {
        report.error("", "payload must be an object");
        return report;
    };

    let present: Vec<&CollectionRule> = schema
        .collections
        .iter()
        .filter(|rule| object.get(rule.key).is_some_and(|v| !v.is_null()))
        .collect();

    if present.is_empty() {
        report.error(
            "",
            format!(
                "payload has none of the data sources for '{}': expected one of [{}]",
                schema.provider,
                schema.data_source_keys().join(", ")
            ),
        );
        return report;
    }

    for rule in present {
        let value = &object[rule.key];
        match rule.shape {
            CollectionShape::Object => {
                if value.is_object() {
                    check_item_fields(&mut report, rule, rule.key, value);
                } else {
                    report.error(rule.key, "must be an object");
                }
            }
            CollectionShape::Array => {
                let Some(items) = value.as_array() else {
                    report.error(rule.key, "must be an array");
                    continue;
                };
                if items.is_empty() {
                    report.warn(rule.key, "is empty");
                }
                for (index, item) in items.iter().enumerate() {
                    let path = format!("{}[{index}]", rule.key);
                    if item.is_object() {
                        check_item_fields(&mut report, rule, &path, item);
                    } else {
                        report.error(path, "must be an object");
                    }
                }
            }
        }
    }

    report
}

fn field_present(item: &Value, alternatives: &str) -> bool {
    alternatives
        .split('|')
        .any(|field| item.get(field).is_some_and(|v| !v.is_null()))
}

fn check_item_fields(report: &mut ValidationReport, rule: &CollectionRule, path: &str, item: &Value) {
    for field in rule.required_fields {
        if !field_present(item, field) {
            report.error(format!("{path}.{field}"), "required field is missing");
        }
    }
    for field in rule.optional_fields {
        if !field_present(item, field) {
            report.warn(format!("{path}.{field}"), "optional field is missing");
        }
    }
}

// ============================================================================
// RESULT VALIDATION
// ============================================================================

/// Validate a typed result.
///
/// The result is checked in its serialized form so the same rules apply to
/// results received from outside the process.
pub fn validate_result(result: &TransformationResult, mode: ValidationMode) -> ValidationReport {
    match serde_json::to_value(result) {
        Ok(value) => validate_result_value(&value, mode),
        Err(e) => {
            let mut report = ValidationReport::new();
            report.error("", format!("result could not be serialized: {e}"));
            report
        }
    }
}

/// Validate a serialized result tree
pub fn validate_result_value(result: &Value, mode: ValidationMode) -> ValidationReport {
    let mut report = ValidationReport::new();

    let Some(object) = result.as_object() else {
        report.error("", "result must be an object");
        return report;
    };

    let empty = Vec::new();
    let mut sections = [("entities", &empty), ("metrics", &empty), ("relationships", &empty)];
    for (name, items) in sections.iter_mut() {
        match object.get(*name) {
            Some(Value::Array(array)) => *items = array,
            Some(_) => report.error(*name, "must be an array"),
            None => report.error(*name, "is missing"),
        }
    }
    let [(_, entities), (_, metrics), (_, relationships)] = sections;

    report.stats = ValidationStats {
        entities: entities.len(),
        metrics: metrics.len(),
        relationships: relationships.len(),
    };

    let entity_kinds = check_entities(&mut report, entities, mode);
    check_metrics(&mut report, metrics);
    let linked = check_relationships(&mut report, relationships, &entity_kinds, mode);

    if mode.is_strict() {
        for (index, entity) in entities.iter().enumerate() {
            let Some(id) = entity.get("id").and_then(Value::as_str) else {
                continue;
            };
            let is_cluster = entity.get("kind").and_then(Value::as_str) == Some("CLUSTER");
            if !is_cluster && !linked.contains(id) {
                report.warn(
                    format!("entities[{index}]"),
                    format!("entity '{id}' takes part in no relationship"),
                );
            }
        }
    }

    report
}

/// Checks each entity; returns id -> kind for the well-formed ones
fn check_entities<'a>(
    report: &mut ValidationReport,
    entities: &'a [Value],
    mode: ValidationMode,
) -> HashMap<&'a str, &'a str> {
    let mut seen: HashMap<&str, &str> = HashMap::new();

    for (index, entity) in entities.iter().enumerate() {
        let path = format!("entities[{index}]");
        if !entity.is_object() {
            report.error(path, "must be an object");
            continue;
        }

        let id = match entity.get("id") {
            None | Some(Value::Null) => {
                report.error(format!("{path}.id"), "is missing");
                None
            }
            Some(Value::String(id)) if EntityId::is_well_formed(id) => Some(id.as_str()),
            Some(Value::String(id)) => {
                report.error(format!("{path}.id"), format!("malformed entity id '{id}'"));
                None
            }
            Some(_) => {
                report.error(format!("{path}.id"), "must be a string");
                None
            }
        };

        let kind = match entity.get("kind").and_then(Value::as_str) {
            Some(kind) if !kind.is_empty() => kind,
            _ => {
                report.error(format!("{path}.kind"), "is missing");
                continue;
            }
        };

        if !EntityKind::from_name(kind).is_built_in() {
            let message = format!("unknown entity kind '{kind}'");
            if mode.is_strict() {
                report.error(format!("{path}.kind"), message);
            } else {
                report.warn(format!("{path}.kind"), message);
            }
        }

        if kind == "BROKER" {
            let attributes = entity.get("attributes");
            let host = attributes
                .and_then(|a| a.get("host"))
                .and_then(Value::as_str)
                .filter(|h| !h.is_empty());
            if host.is_none() {
                report.error(format!("{path}.attributes.host"), "BROKER requires a host");
            }
            let port = attributes.and_then(|a| a.get("port"));
            if !port.is_some_and(Value::is_number) {
                report.error(format!("{path}.attributes.port"), "BROKER requires a numeric port");
            }
        }

        if let Some(id) = id {
            let segment = id.split('|').nth(2).unwrap_or_default();
            if segment != kind {
                report.warn(
                    format!("{path}.id"),
                    format!("id kind segment '{segment}' does not match kind '{kind}'"),
                );
            }
            if seen.insert(id, kind).is_some() {
                report.warn(format!("{path}.id"), format!("duplicate entity id '{id}'"));
            }
        }
    }

    seen
}

fn check_metrics(report: &mut ValidationReport, metrics: &[Value]) {
    for (index, metric) in metrics.iter().enumerate() {
        let path = format!("metrics[{index}]");
        if !metric.is_object() {
            report.error(path, "must be an object");
            continue;
        }

        if !metric
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|name| !name.is_empty())
        {
            report.error(format!("{path}.name"), "is missing");
        }

        if !metric.get("value").is_some_and(Value::is_number) {
            report.error(format!("{path}.value"), "must be numeric");
        }

        match metric.get("timestamp") {
            None | Some(Value::Null) => {
                report.warn(format!("{path}.timestamp"), "is missing, consumer will use now")
            }
            Some(Value::Number(_)) => {}
            Some(_) => report.error(format!("{path}.timestamp"), "must be numeric"),
        }
    }
}

/// Checks each edge; returns every id that appears as an endpoint
fn check_relationships<'a>(
    report: &mut ValidationReport,
    relationships: &'a [Value],
    entities: &HashMap<&str, &str>,
    mode: ValidationMode,
) -> HashSet<&'a str> {
    let mut linked = HashSet::new();

    for (index, edge) in relationships.iter().enumerate() {
        let path = format!("relationships[{index}]");
        if !edge.is_object() {
            report.error(path, "must be an object");
            continue;
        }

        for endpoint in ["sourceId", "targetId"] {
            match edge.get(endpoint).and_then(Value::as_str) {
                None => report.error(format!("{path}.{endpoint}"), "is missing"),
                Some(id) if !EntityId::is_well_formed(id) => {
                    report.error(format!("{path}.{endpoint}"), format!("malformed entity id '{id}'"))
                }
                Some(id) => {
                    linked.insert(id);
                    if mode.is_strict() && !entities.contains_key(id) {
                        report.error(
                            format!("{path}.{endpoint}"),
                            format!("references unknown entity '{id}'"),
                        );
                    }
                }
            }
        }

        match edge.get("type").and_then(Value::as_str) {
            None => report.error(format!("{path}.type"), "is missing"),
            Some(kind) if RelationshipType::from_name(kind).is_none() => {
                report.error(format!("{path}.type"), format!("unknown relationship type '{kind}'"))
            }
            Some(_) => {}
        }
    }

    linked
}

// ============================================================================
// REPORTING
// ============================================================================

/// Render a report as human-readable text
pub fn format_report(report: &ValidationReport) -> String {
    let mut out = String::new();
    let status = if report.valid { "PASSED" } else { "FAILED" };
    let _ = writeln!(out, "Validation {status}");
    let _ = writeln!(
        out,
        "Stats: {} entities, {} metrics, {} relationships",
        report.stats.entities, report.stats.metrics, report.stats.relationships
    );

    if !report.errors.is_empty() {
        let _ = writeln!(out, "Errors ({}):", report.errors.len());
        for (i, issue) in report.errors.iter().enumerate() {
            let _ = writeln!(out, "  {}. {issue}", i + 1);
        }
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out, "Warnings ({}):", report.warnings.len());
        for (i, issue) in report.warnings.iter().enumerate() {
            let _ = writeln!(out, "  {}. {issue}", i + 1);
        }
    }

    out
}
