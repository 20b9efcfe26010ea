//! # Canonical Infrastructure Types
//!
//! Shared data model for the transformation pipeline: provider-tagged input
//! records, the canonical entities, metrics and relationships adapters emit,
//! and the validation report attached to every result.
//!
//! ## Design Philosophy
//!
//! - **Stable Identity**: `EntityId` is derived deterministically from
//!   namespace, domain, kind and natural key so downstream consumers can
//!   deduplicate across transformation cycles
//! - **Numeric Metrics Only**: `MetricDataPoint::value` is an `f64`; adapters drop
//!   non-numeric provider fields instead of coercing them
//! - **Immutable Results**: a `TransformationResult` is built once per adapter
//!   call and never patched afterwards
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{CanonicalEntity, EntityId, EntityKind};
//!
//! let cluster_id = EntityId::derive("123456", "INFRA", &EntityKind::Cluster, "prod:123456")?;
//! let cluster = CanonicalEntity::new(cluster_id, EntityKind::Cluster, "prod", "kafka");
//! assert_eq!(cluster.id.kind_segment(), "CLUSTER");
//! # Ok::<(), types::IdentifierError>(())
//! ```
//!
//! ## Integration Points
//!
//! - **adapter-service**: builds entities, metrics and relationships, and fills
//!   in `ValidationReport`
//! - **transform-orchestrator**: aggregates `TransformationResult`s across
//!   batch and stream runs
//! - **discovery-cache**: stores serialized `InfrastructureRecord`s

pub mod entities;
pub mod identifiers;
pub mod metrics;
pub mod relationships;
pub mod result;

pub use entities::{AttributeValue, Attributes, CanonicalEntity, EntityKind};
pub use identifiers::{EntityId, IdentifierError, ENTITY_ID_PATTERN};
pub use metrics::MetricDataPoint;
pub use relationships::{RelationshipEdge, RelationshipType};
pub use result::{
    InfrastructureRecord, TransformationResult, ValidationIssue, ValidationReport,
    ValidationStats,
};

/// Current wall-clock time in Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
