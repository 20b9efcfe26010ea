//! # Common Adapter Infrastructure
//!
//! Shared trait definitions for all provider adapters plus the lifecycle
//! wrapper that turns a provider implementation into something the
//! orchestrator can drive.
//!
//! ## Lifecycle
//!
//! `Uninitialized -> Initialized -> (transform)* -> ShutDown`
//!
//! - `transform` before `initialize` fails with [`AdapterError::NotInitialized`]
//! - `initialize` on an initialized adapter is a no-op
//! - an inner step reporting `NotInitialized` drops the wrapper back to
//!   `Uninitialized` so the caller can re-initialize and retry

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use types::{
    CanonicalEntity, MetricDataPoint, RelationshipEdge, TransformationResult, ValidationReport,
};

use crate::config::ProviderSettings;
use crate::validation::{validate_input_with, InputSchema};
use crate::{AdapterError, Result};

// ============================================================================
// CORE TRAITS
// ============================================================================

/// Contract every provider implements.
///
/// The four transformation steps are pure functions of their inputs; all
/// lifecycle state lives in [`ManagedAdapter`].
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Provider-specific intermediate form produced by `extract_components`
    type Components: Send + Sync;

    /// Provider name, e.g. `kafka`
    fn provider(&self) -> &str;

    /// Settings used for identifiers and cluster synthesis
    fn settings(&self) -> &ProviderSettings;

    /// Recognised data sources and their required fields
    fn input_schema(&self) -> &'static InputSchema;

    /// Provider-specific setup. Called once by the lifecycle wrapper.
    async fn initialize(&self) -> Result<()> {
        self.settings()
            .validate()
            .map_err(|reason| AdapterError::Initialization {
                provider: self.provider().to_string(),
                reason,
            })
    }

    /// Fail fast when the payload lacks every recognised data source or has
    /// malformed collections. Soft issues come back as warnings.
    fn validate_input(&self, payload: &Value) -> Result<ValidationReport> {
        let report = validate_input_with(self.input_schema(), payload);
        if report.has_errors() {
            return Err(AdapterError::InvalidInput {
                provider: self.provider().to_string(),
                errors: report.errors,
            });
        }
        Ok(report)
    }

    /// Parse the payload into the intermediate form
    fn extract_components(&self, payload: &Value) -> Result<Self::Components>;

    /// Deterministic mapping to canonical entities
    fn map_to_entities(&self, components: &Self::Components) -> Result<Vec<CanonicalEntity>>;

    /// Metrics for fields in the provider's metric table; absent fields are skipped
    fn extract_metrics(
        &self,
        components: &Self::Components,
        entities: &[CanonicalEntity],
    ) -> Result<Vec<MetricDataPoint>>;

    /// Containment edges plus [`Adapter::additional_relationships`]
    fn build_relationships(
        &self,
        components: &Self::Components,
        entities: &[CanonicalEntity],
    ) -> Result<Vec<RelationshipEdge>> {
        let mut edges = containment_edges(entities);
        edges.extend(self.additional_relationships(components, entities)?);
        Ok(edges)
    }

    /// Provider-specific edges such as replica placement
    fn additional_relationships(
        &self,
        _components: &Self::Components,
        _entities: &[CanonicalEntity],
    ) -> Result<Vec<RelationshipEdge>> {
        Ok(Vec::new())
    }

    /// Rank of a discovery source when the same observation arrives from
    /// several; higher wins, ties keep the first observation
    fn source_priority(&self, _source: &str) -> u8 {
        0
    }
}

/// Object-safe view of an adapter, as held by the orchestrator registry
#[async_trait]
pub trait TransformAdapter: Send + Sync {
    /// Provider name
    fn provider(&self) -> &str;

    /// Move to `Initialized`; no-op when already initialized
    async fn initialize(&self) -> Result<()>;

    /// Run validate, extract, map, metrics and relationships in order
    async fn transform(&self, payload: &Value) -> Result<TransformationResult>;

    /// Structural input check without transforming
    fn validate_input(&self, payload: &Value) -> Result<ValidationReport>;

    /// Whether `transform` may currently be called
    fn is_initialized(&self) -> bool;

    /// Lifecycle state and counters
    fn health(&self) -> AdapterHealth;

    /// Move to `ShutDown`; later calls fail
    async fn shutdown(&self);
}

/// CONTAINS edge from each entity's parent to the entity, when the parent is
/// present in `entities`
pub fn containment_edges(entities: &[CanonicalEntity]) -> Vec<RelationshipEdge> {
    let ids: HashSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();
    entities
        .iter()
        .filter_map(|entity| {
            let parent = entity.parent_id.as_ref()?;
            ids.contains(parent.as_str())
                .then(|| RelationshipEdge::contains(parent.clone(), entity.id.clone()))
        })
        .collect()
}

// ============================================================================
// HEALTH
// ============================================================================

/// Lifecycle state of a managed adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Created, `initialize` not yet successful
    Uninitialized,
    /// Ready to transform
    Initialized,
    /// Shut down, no further work accepted
    ShutDown,
}

impl LifecycleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => LifecycleState::Initialized,
            2 => LifecycleState::ShutDown,
            _ => LifecycleState::Uninitialized,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            LifecycleState::Uninitialized => 0,
            LifecycleState::Initialized => 1,
            LifecycleState::ShutDown => 2,
        }
    }
}

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Initialized and the last transform succeeded
    Healthy,
    /// Initialized but the last transform failed
    Degraded,
    /// Not initialized or shut down
    Unhealthy,
}

/// Health snapshot of one adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterHealth {
    /// Provider name
    pub provider: String,
    /// Lifecycle state
    pub state: LifecycleState,
    /// Derived status
    pub status: HealthStatus,
    /// Whether `transform` may be called
    pub initialized: bool,
    /// Transform calls attempted
    pub transforms: u64,
    /// Transform calls that returned a result
    pub successes: u64,
    /// Transform calls that returned an error
    pub failures: u64,
    /// Entities produced so far
    pub entities_emitted: u64,
    /// Metrics produced so far
    pub metrics_emitted: u64,
    /// Relationships produced so far
    pub relationships_emitted: u64,
    /// Most recent error message
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct AdapterCounters {
    transforms: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    entities: AtomicU64,
    metrics: AtomicU64,
    relationships: AtomicU64,
}

// ============================================================================
// LIFECYCLE WRAPPER
// ============================================================================

/// Lifecycle state and counters around a provider [`Adapter`]
pub struct ManagedAdapter<A: Adapter> {
    adapter: A,
    state: AtomicU8,
    init_lock: tokio::sync::Mutex<()>,
    counters: AdapterCounters,
    last_error: Mutex<Option<String>>,
    last_ok: AtomicBool,
}

impl<A: Adapter> ManagedAdapter<A> {
    /// Wrap `adapter` in the `Uninitialized` state
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            state: AtomicU8::new(LifecycleState::Uninitialized.as_u8()),
            init_lock: tokio::sync::Mutex::new(()),
            counters: AdapterCounters::default(),
            last_error: Mutex::new(None),
            last_ok: AtomicBool::new(true),
        }
    }

    /// Wrap and share as a registry entry
    pub fn shared(adapter: A) -> Arc<dyn TransformAdapter> {
        Arc::new(Self::new(adapter))
    }

    /// The wrapped provider implementation
    pub fn inner(&self) -> &A {
        &self.adapter
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: LifecycleState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    fn run_steps(&self, payload: &Value) -> Result<TransformationResult> {
        let report = self.adapter.validate_input(payload)?;
        for warning in &report.warnings {
            debug!(provider = %self.adapter.provider(), %warning, "Input validation warning");
        }

        let components = self.adapter.extract_components(payload)?;
        let entities = self.adapter.map_to_entities(&components)?;
        let metrics = self.adapter.extract_metrics(&components, &entities)?;
        let relationships = self.adapter.build_relationships(&components, &entities)?;

        Ok(TransformationResult::new(
            self.adapter.provider(),
            entities,
            metrics,
            relationships,
        ))
    }
}

#[async_trait]
impl<A: Adapter> TransformAdapter for ManagedAdapter<A> {
    fn provider(&self) -> &str {
        self.adapter.provider()
    }

    async fn initialize(&self) -> Result<()> {
        let _guard = self.init_lock.lock().await;
        match self.state() {
            LifecycleState::Initialized => return Ok(()),
            LifecycleState::ShutDown => {
                return Err(AdapterError::ShutDown {
                    provider: self.provider().to_string(),
                })
            }
            LifecycleState::Uninitialized => {}
        }

        self.adapter.initialize().await?;
        self.set_state(LifecycleState::Initialized);
        info!(provider = %self.provider(), "Adapter initialized");
        Ok(())
    }

    async fn transform(&self, payload: &Value) -> Result<TransformationResult> {
        match self.state() {
            LifecycleState::Initialized => {}
            LifecycleState::Uninitialized => {
                return Err(AdapterError::NotInitialized {
                    provider: self.provider().to_string(),
                })
            }
            LifecycleState::ShutDown => {
                return Err(AdapterError::ShutDown {
                    provider: self.provider().to_string(),
                })
            }
        }

        self.counters.transforms.fetch_add(1, Ordering::Relaxed);

        match self.run_steps(payload) {
            Ok(result) => {
                self.counters.successes.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .entities
                    .fetch_add(result.entities.len() as u64, Ordering::Relaxed);
                self.counters
                    .metrics
                    .fetch_add(result.metrics.len() as u64, Ordering::Relaxed);
                self.counters
                    .relationships
                    .fetch_add(result.relationships.len() as u64, Ordering::Relaxed);
                self.last_ok.store(true, Ordering::Relaxed);
                debug!(
                    provider = %self.provider(),
                    entities = result.entities.len(),
                    metrics = result.metrics.len(),
                    relationships = result.relationships.len(),
                    "Transform completed"
                );
                Ok(result)
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                self.last_ok.store(false, Ordering::Relaxed);
                *self.last_error.lock() = Some(e.to_string());
                if e.is_not_initialized() {
                    warn!(provider = %self.provider(), "Adapter lost initialization");
                    self.set_state(LifecycleState::Uninitialized);
                }
                Err(e)
            }
        }
    }

    fn validate_input(&self, payload: &Value) -> Result<ValidationReport> {
        self.adapter.validate_input(payload)
    }

    fn is_initialized(&self) -> bool {
        self.state() == LifecycleState::Initialized
    }

    fn health(&self) -> AdapterHealth {
        let state = self.state();
        let status = match state {
            LifecycleState::Initialized if self.last_ok.load(Ordering::Relaxed) => {
                HealthStatus::Healthy
            }
            LifecycleState::Initialized => HealthStatus::Degraded,
            _ => HealthStatus::Unhealthy,
        };

        AdapterHealth {
            provider: self.provider().to_string(),
            state,
            status,
            initialized: state == LifecycleState::Initialized,
            transforms: self.counters.transforms.load(Ordering::Relaxed),
            successes: self.counters.successes.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            entities_emitted: self.counters.entities.load(Ordering::Relaxed),
            metrics_emitted: self.counters.metrics.load(Ordering::Relaxed),
            relationships_emitted: self.counters.relationships.load(Ordering::Relaxed),
            last_error: self.last_error.lock().clone(),
        }
    }

    async fn shutdown(&self) {
        let _guard = self.init_lock.lock().await;
        self.set_state(LifecycleState::ShutDown);
        info!(provider = %self.provider(), "Adapter shut down");
    }
}
