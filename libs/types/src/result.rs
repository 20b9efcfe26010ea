//! Input records, transformation results and validation reports

use serde::{Deserialize, Serialize};

use crate::entities::CanonicalEntity;
use crate::metrics::MetricDataPoint;
use crate::relationships::RelationshipEdge;

/// Provider-tagged discovery payload.
///
/// The `data` tree is opaque outside the adapter registered for `provider`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureRecord {
    /// Provider tag used to pick the adapter
    pub provider: String,
    /// Free-form payload
    pub data: serde_json::Value,
}

impl InfrastructureRecord {
    /// Tag `data` with `provider`
    pub fn new(provider: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            provider: provider.into(),
            data,
        }
    }
}

/// One problem found by the validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Location in the checked tree, e.g. `entities[2].id`
    pub path: String,
    /// Description
    pub message: String,
}

impl ValidationIssue {
    /// Issue at `path`
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Element counts seen by the validator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStats {
    /// Number of entities checked
    pub entities: usize,
    /// Number of metrics checked
    pub metrics: usize,
    /// Number of relationships checked
    pub relationships: usize,
}

/// Outcome of validating an input payload or a result.
///
/// `valid` is false exactly when `errors` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether no errors were found
    pub valid: bool,
    /// Hard failures
    pub errors: Vec<ValidationIssue>,
    /// Soft issues that never affect `valid`
    pub warnings: Vec<ValidationIssue>,
    /// Element counts
    pub stats: ValidationStats,
}

impl ValidationReport {
    /// Empty, valid report
    pub fn new() -> Self {
        Self {
            valid: true,
            ..Default::default()
        }
    }

    /// Record an error and mark the report invalid
    pub fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue::new(path, message));
        self.valid = false;
    }

    /// Record a warning
    pub fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::new(path, message));
    }

    /// Whether any error was recorded
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Output of one adapter call.
///
/// All-or-nothing: either every step of the transformation succeeded and
/// this is populated, or the call returned an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationResult {
    /// Canonical entities
    pub entities: Vec<CanonicalEntity>,
    /// Metrics about those entities
    pub metrics: Vec<MetricDataPoint>,
    /// Edges between those entities
    pub relationships: Vec<RelationshipEdge>,
    /// Unix milliseconds when the result was produced
    pub transformed_at: i64,
    /// Provider that produced the result
    pub provider: String,
    /// Validation annotation added by the orchestrator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
}

impl TransformationResult {
    /// Result stamped with the current time
    pub fn new(
        provider: impl Into<String>,
        entities: Vec<CanonicalEntity>,
        metrics: Vec<MetricDataPoint>,
        relationships: Vec<RelationshipEdge>,
    ) -> Self {
        Self {
            entities,
            metrics,
            relationships,
            transformed_at: crate::now_millis(),
            provider: provider.into(),
            validation: None,
        }
    }

    /// Look up an entity by id
    pub fn entity(&self, id: &str) -> Option<&CanonicalEntity> {
        self.entities.iter().find(|e| e.id.as_str() == id)
    }
}
