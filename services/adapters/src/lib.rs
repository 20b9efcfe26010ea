//! # Adapter Service - Infrastructure Discovery Transformation Layer
//!
//! ## Purpose
//!
//! Provider adapters that turn raw discovery payloads into the canonical
//! entity/metric/relationship model. Each provider implements the four-step
//! [`Adapter`] contract; [`ManagedAdapter`] wraps it with lifecycle state,
//! health counters and input validation so the orchestrator only ever sees
//! the object-safe [`TransformAdapter`].
//!
//! ## Integration Points
//!
//! - **Input**: provider JSON payloads (`InfrastructureRecord::data`)
//! - **Output**: [`types::TransformationResult`] handed back to the orchestrator
//! - **Validation**: [`validate_input`] before transformation, [`validate_result`] after
//! - **Configuration**: [`ProviderSettings`] per provider (namespace, domain, default cluster)
//! - **Error Handling**: typed [`AdapterError`] with retry classification
//!
//! ## Transformation Steps
//!
//! 1. `validate_input` - reject payloads with no recognised data source
//! 2. `extract_components` - parse into a provider-specific intermediate form
//! 3. `map_to_entities` - derive deterministic identifiers, synthesize the default cluster
//! 4. `extract_metrics` / `build_relationships` - map metric fields, emit `CONTAINS` and placement edges
//!
//! ### Adapters ARE:
//! - **Pure transformers**: the same payload always yields the same entities and edges
//! - **Validators**: malformed input fails before any entity is produced
//!
//! ### Adapters are NOT:
//! - **Discovery clients** (no API calls; payloads are handed in)
//! - **Caches** (see the `discovery-cache` crate)
//! - **Retry loops** (the orchestrator owns retries)
//!
//! ## Providers
//!
//! | Provider | Entities | Placement edges |
//! |----------|----------|-----------------|
//! | [`KafkaAdapter`] | CLUSTER, BROKER, TOPIC | `HOSTED_ON`, `REPLICATED_TO` |
//! | [`RabbitMqAdapter`] | CLUSTER, BROKER, QUEUE | `HOSTED_ON` |
//!
//! ## Example
//!
//! ```rust,ignore
//! use adapter_service::{builtin_adapter, ProviderSettings};
//! use serde_json::json;
//!
//! let adapter = builtin_adapter("kafka", ProviderSettings::for_namespace("123456")).unwrap();
//! adapter.initialize().await?;
//!
//! let result = adapter
//!     .transform(&json!({"brokers": [{"id": 0}], "topics": [{"name": "orders"}]}))
//!     .await?;
//! assert_eq!(result.entities.len(), 3);
//! ```

#![warn(clippy::all)]

pub mod common;
pub mod config;
pub mod error;
pub mod parsing_utils;
pub mod providers;
pub mod validation;

pub use common::{
    containment_edges, Adapter, AdapterHealth, HealthStatus, LifecycleState, ManagedAdapter,
    TransformAdapter,
};
pub use config::ProviderSettings;
pub use error::{AdapterError, Result};
pub use providers::{builtin_adapter, schema_for, KafkaAdapter, RabbitMqAdapter, BUILTIN_PROVIDERS};
pub use validation::{
    format_report, validate_input, validate_input_with, validate_result, validate_result_value,
    CollectionRule, CollectionShape, InputSchema, ValidationMode,
};

// Re-export the data model for convenience
pub use types::{
    CanonicalEntity, EntityId, EntityKind, MetricDataPoint, RelationshipEdge, RelationshipType,
    TransformationResult, ValidationReport,
};
