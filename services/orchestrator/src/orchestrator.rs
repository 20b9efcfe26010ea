//! # Transformation Orchestrator
//!
//! Owns the adapter registry and runs transformations with retry, validation
//! and result forwarding.
//!
//! ## Shared State
//!
//! | State | Guard |
//! |-------|-------|
//! | adapter registry | `parking_lot::RwLock`, never held across an await |
//! | per-provider counters | atomics only |
//! | in-flight transforms | `DashMap` keyed by transformation id |
//! | in-flight bound | `AtomicUsize` slot counter, reserved before insert |
//!
//! ## Retry Policy
//!
//! Only retryable adapter errors (not initialized, provider I/O, timeouts)
//! are retried, up to `max_retries` attempts in total, waiting
//! `retry_delay * backoff_multiplier^(attempt - 1)` between attempts. A
//! not-initialized error triggers one best-effort re-initialization before
//! the next attempt. Input errors fail on the first attempt.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use adapter_service::{
    builtin_adapter, validate_result, AdapterError, AdapterHealth, ProviderSettings,
    TransformAdapter, BUILTIN_PROVIDERS,
};
use dashmap::DashMap;
use futures::future::{join_all, try_join_all};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, Notify};
use tracing::{debug, error, info, warn};
use types::TransformationResult;
use uuid::Uuid;

use crate::config::{OrchestratorConfig, PipelineConfig};
use crate::discovery::DiscoverySource;
use crate::events::{EventBus, OrchestratorEvent};
use crate::sink::ResultSink;
use crate::{OrchestratorError, Result};

// ============================================================================
// REGISTRY AND COUNTERS
// ============================================================================

struct RegisteredAdapter {
    adapter: Arc<dyn TransformAdapter>,
    enabled: bool,
}

#[derive(Debug, Default)]
struct TransformCounters {
    total: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    retries: AtomicU64,
}

impl TransformCounters {
    fn snapshot(&self) -> TransformStats {
        TransformStats {
            total: self.total.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

/// Transform counters for one provider or for all of them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransformStats {
    /// `transform` calls accepted
    pub total: u64,
    /// Calls that returned a result
    pub successes: u64,
    /// Calls that returned an error
    pub failures: u64,
    /// Extra attempts scheduled after failures
    pub retries: u64,
}

/// Health of one registered provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub enabled: bool,
    /// Orchestrator-side counters
    pub stats: TransformStats,
    /// The adapter's own report
    pub adapter: AdapterHealth,
}

/// Aggregate health
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorHealth {
    /// Whether the last `initialize` succeeded for every enabled adapter
    pub initialized: bool,
    /// Whether new work is accepted
    pub accepting: bool,
    /// Transforms currently running
    pub in_flight: usize,
    /// Counters across all providers
    pub totals: TransformStats,
    /// Per-provider health, sorted by name
    pub providers: BTreeMap<String, ProviderHealth>,
}

/// Outcome of [`TransformationOrchestrator::shutdown`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// Transforms still running when the timeout elapsed
    pub remaining_transformations: usize,
    /// Whether the timeout elapsed before in-flight work finished
    pub timed_out: bool,
    pub elapsed: Duration,
}

// ============================================================================
// IN-FLIGHT TRACKING
// ============================================================================

#[derive(Debug)]
struct InFlightTransform {
    provider: String,
    started_at: Instant,
}

/// Removes its transform from the in-flight set on drop, waking shutdown
/// when the set becomes empty
struct InFlightGuard {
    id: Uuid,
    in_flight: Arc<DashMap<Uuid, InFlightTransform>>,
    slots: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some((_, transform)) = self.in_flight.remove(&self.id) {
            debug!(
                transformation_id = %self.id,
                provider = %transform.provider,
                elapsed_ms = transform.started_at.elapsed().as_millis() as u64,
                "Transformation left in-flight set"
            );
        }
        self.slots.fetch_sub(1, Ordering::SeqCst);
        if self.in_flight.is_empty() {
            self.drained.notify_waiters();
        }
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

/// Registry of provider adapters plus the transform pipeline around them
pub struct TransformationOrchestrator {
    pub(crate) config: OrchestratorConfig,
    provider_settings: HashMap<String, ProviderSettings>,
    registry: RwLock<HashMap<String, RegisteredAdapter>>,
    counters: DashMap<String, Arc<TransformCounters>>,
    totals: TransformCounters,
    in_flight: Arc<DashMap<Uuid, InFlightTransform>>,
    in_flight_slots: Arc<AtomicUsize>,
    drained: Arc<Notify>,
    accepting: AtomicBool,
    initialized: AtomicBool,
    sink: RwLock<Option<Arc<dyn ResultSink>>>,
    events: EventBus,
}

impl TransformationOrchestrator {
    /// Orchestrator with default settings for every provider
    pub fn new(config: OrchestratorConfig) -> Result<Self> {
        Self::with_provider_settings(config, HashMap::new())
    }

    /// Orchestrator configured from a full pipeline config
    pub fn from_pipeline(config: &PipelineConfig) -> Result<Self> {
        config.validate().map_err(OrchestratorError::Config)?;
        Self::with_provider_settings(config.orchestrator.clone(), config.providers.clone())
    }

    /// Orchestrator with explicit per-provider settings
    pub fn with_provider_settings(
        config: OrchestratorConfig,
        provider_settings: HashMap<String, ProviderSettings>,
    ) -> Result<Self> {
        config.validate().map_err(OrchestratorError::Config)?;
        let events = EventBus::new(config.event_buffer);

        Ok(Self {
            config,
            provider_settings,
            registry: RwLock::new(HashMap::new()),
            counters: DashMap::new(),
            totals: TransformCounters::default(),
            in_flight: Arc::new(DashMap::new()),
            in_flight_slots: Arc::new(AtomicUsize::new(0)),
            drained: Arc::new(Notify::new()),
            accepting: AtomicBool::new(true),
            initialized: AtomicBool::new(false),
            sink: RwLock::new(None),
            events,
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Settings handed to the factory of `provider`
    pub fn settings_for(&self, provider: &str) -> ProviderSettings {
        self.provider_settings
            .get(provider)
            .cloned()
            .unwrap_or_default()
    }

    // ===== REGISTRATION =====

    /// Register an adapter built by `factory` under `name`.
    ///
    /// Fails with [`OrchestratorError::DuplicateProvider`] if the name is
    /// taken; the factory is not called in that case.
    pub fn register_adapter<F>(&self, name: &str, factory: F) -> Result<()>
    where
        F: FnOnce(&ProviderSettings) -> Arc<dyn TransformAdapter>,
    {
        let settings = self.settings_for(name);
        let enabled = settings.enabled;

        {
            let mut registry = self.registry.write();
            if registry.contains_key(name) {
                return Err(OrchestratorError::DuplicateProvider(name.to_string()));
            }
            let adapter = factory(&settings);
            registry.insert(name.to_string(), RegisteredAdapter { adapter, enabled });
        }

        self.counters
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(TransformCounters::default()));
        info!(provider = %name, enabled, "📦 Adapter registered");
        self.events.publish(OrchestratorEvent::AdapterRegistered {
            provider: name.to_string(),
            enabled,
        });
        Ok(())
    }

    /// Register one of the adapters shipped with `adapter-service`
    pub fn register_builtin(&self, provider: &str) -> Result<()> {
        let adapter = builtin_adapter(provider, self.settings_for(provider))
            .ok_or_else(|| OrchestratorError::UnknownProvider(provider.to_string()))?;
        self.register_adapter(provider, move |_| adapter)
    }

    /// Register every built-in provider
    pub fn register_builtins(&self) -> Result<()> {
        for provider in BUILTIN_PROVIDERS {
            self.register_builtin(provider)?;
        }
        Ok(())
    }

    /// Names of registered providers, sorted
    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_registered(&self, provider: &str) -> bool {
        self.registry.read().contains_key(provider)
    }

    /// Forward every successful result to `sink`
    pub fn set_sink(&self, sink: Arc<dyn ResultSink>) {
        *self.sink.write() = Some(sink);
    }

    pub fn clear_sink(&self) {
        *self.sink.write() = None;
    }

    /// Receiver for orchestrator events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.events.subscribe()
    }

    // ===== INITIALIZATION =====

    /// Initialize every enabled adapter concurrently.
    ///
    /// Fails fast on the first adapter error; the orchestrator then reports
    /// itself as not initialized.
    pub async fn initialize(&self) -> Result<()> {
        let adapters: Vec<(String, Arc<dyn TransformAdapter>)> = self
            .registry
            .read()
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(name, entry)| (name.clone(), entry.adapter.clone()))
            .collect();

        info!(adapters = adapters.len(), "🚀 Initializing adapters");
        self.initialized.store(false, Ordering::SeqCst);

        let outcome = try_join_all(adapters.iter().map(|(name, adapter)| async move {
            adapter
                .initialize()
                .await
                .map_err(|source| OrchestratorError::Initialization {
                    provider: name.clone(),
                    source,
                })
        }))
        .await;

        if let Err(e) = outcome {
            error!(error = %e, "Adapter initialization failed");
            return Err(e);
        }

        let mut providers: Vec<String> = adapters.into_iter().map(|(name, _)| name).collect();
        providers.sort();
        self.initialized.store(true, Ordering::SeqCst);
        info!(providers = ?providers, "✅ Adapters initialized");
        self.events
            .publish(OrchestratorEvent::AdaptersInitialized { providers });
        Ok(())
    }

    // ===== TRANSFORM =====

    /// Transform `payload` with the adapter registered as `provider`.
    ///
    /// Retries per the configured policy, annotates the result with a
    /// validation report unless validation is off, and forwards it to the
    /// sink. Results are never discarded because of validation.
    pub async fn transform(&self, provider: &str, payload: &Value) -> Result<TransformationResult> {
        let adapter = self.lookup(provider)?;
        let id = Uuid::new_v4();
        let _guard = self.track(id, provider)?;
        let counters = self.counters_for(provider);

        counters.total.fetch_add(1, Ordering::Relaxed);
        self.totals.total.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        match self.transform_with_retry(id, provider, adapter.as_ref(), payload).await {
            Ok((mut result, attempts)) => {
                counters.successes.fetch_add(1, Ordering::Relaxed);
                self.totals.successes.fetch_add(1, Ordering::Relaxed);

                let mode = self.config.validation_mode;
                if mode.is_enabled() {
                    let report = validate_result(&result, mode);
                    if report.valid {
                        debug!(transformation_id = %id, provider = %provider, warnings = report.warnings.len(), "Result validated");
                    } else {
                        warn!(
                            transformation_id = %id,
                            provider = %provider,
                            errors = report.errors.len(),
                            first_error = ?report.errors.first().map(ToString::to_string),
                            "Result failed validation"
                        );
                    }
                    result.validation = Some(report);
                }

                self.forward(id, provider, &result).await;

                self.events.publish(OrchestratorEvent::TransformCompleted {
                    transformation_id: id,
                    provider: provider.to_string(),
                    attempts,
                    entities: result.entities.len(),
                    metrics: result.metrics.len(),
                    relationships: result.relationships.len(),
                    valid: result.validation.as_ref().map(|r| r.valid),
                    duration_ms: started.elapsed().as_millis() as u64,
                });
                Ok(result)
            }
            Err((e, attempts)) => {
                counters.failures.fetch_add(1, Ordering::Relaxed);
                self.totals.failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    transformation_id = %id,
                    provider = %provider,
                    attempts,
                    category = e.category(),
                    error = %e,
                    "Transformation failed"
                );
                self.events.publish(OrchestratorEvent::TransformFailed {
                    transformation_id: id,
                    provider: provider.to_string(),
                    attempts,
                    error: e.to_string(),
                });
                Err(OrchestratorError::Adapter(e))
            }
        }
    }

    /// Discover `provider` through `discovery`, then transform the record
    pub async fn discover_and_transform<D>(&self, discovery: &D, provider: &str) -> Result<TransformationResult>
    where
        D: DiscoverySource + ?Sized,
    {
        // Reject unknown providers before paying for discovery
        self.lookup(provider)?;
        let record = discovery.discover(provider).await?;
        if record.provider != provider {
            warn!(
                provider = %provider,
                record_provider = %record.provider,
                "Discovery returned a record tagged for another provider"
            );
        }
        self.transform(provider, &record.data).await
    }

    fn lookup(&self, provider: &str) -> Result<Arc<dyn TransformAdapter>> {
        let registry = self.registry.read();
        match registry.get(provider) {
            None => Err(OrchestratorError::UnknownProvider(provider.to_string())),
            Some(entry) if !entry.enabled => {
                Err(OrchestratorError::ProviderDisabled(provider.to_string()))
            }
            Some(entry) => Ok(entry.adapter.clone()),
        }
    }

    fn counters_for(&self, provider: &str) -> Arc<TransformCounters> {
        self.counters
            .entry(provider.to_string())
            .or_insert_with(|| Arc::new(TransformCounters::default()))
            .clone()
    }

    /// Enter the in-flight set. A slot is reserved atomically so concurrent
    /// callers can never overshoot `max_in_flight`. The entry is inserted
    /// before the accepting flag is read so a concurrent shutdown either sees
    /// the entry or this call sees the flag.
    fn track(&self, id: Uuid, provider: &str) -> Result<InFlightGuard> {
        let reserved = self.in_flight_slots.fetch_add(1, Ordering::SeqCst);
        if reserved >= self.config.max_in_flight {
            self.in_flight_slots.fetch_sub(1, Ordering::SeqCst);
            return Err(OrchestratorError::TooManyInFlight {
                limit: self.config.max_in_flight,
            });
        }
        self.in_flight.insert(
            id,
            InFlightTransform {
                provider: provider.to_string(),
                started_at: Instant::now(),
            },
        );
        let guard = InFlightGuard {
            id,
            in_flight: self.in_flight.clone(),
            slots: self.in_flight_slots.clone(),
            drained: self.drained.clone(),
        };
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(OrchestratorError::ShuttingDown);
        }
        Ok(guard)
    }

    async fn transform_with_retry(
        &self,
        id: Uuid,
        provider: &str,
        adapter: &dyn TransformAdapter,
        payload: &Value,
    ) -> std::result::Result<(TransformationResult, u32), (AdapterError, u32)> {
        let max_attempts = self.config.max_retries.max(1);
        let counters = self.counters_for(provider);
        let mut attempt = 1;

        loop {
            let error = match adapter.transform(payload).await {
                Ok(result) => {
                    if attempt > 1 {
                        info!(transformation_id = %id, provider = %provider, attempt, "Transformation succeeded after retry");
                    }
                    return Ok((result, attempt));
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                debug!(transformation_id = %id, provider = %provider, error = %error, "Error is not retryable");
                return Err((error, attempt));
            }
            if attempt >= max_attempts {
                return Err((error, attempt));
            }

            let delay = self.config.backoff_delay(attempt);
            warn!(
                transformation_id = %id,
                provider = %provider,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transformation attempt failed, retrying"
            );
            counters.retries.fetch_add(1, Ordering::Relaxed);
            self.totals.retries.fetch_add(1, Ordering::Relaxed);
            self.events.publish(OrchestratorEvent::RetryScheduled {
                transformation_id: id,
                provider: provider.to_string(),
                attempt,
                delay_ms: delay.as_millis() as u64,
                error: error.to_string(),
            });

            if error.is_not_initialized() {
                info!(transformation_id = %id, provider = %provider, "🔄 Re-initializing adapter before retry");
                if let Err(init_error) = adapter.initialize().await {
                    warn!(
                        transformation_id = %id,
                        provider = %provider,
                        error = %init_error,
                        "Re-initialization failed, retrying anyway"
                    );
                }
            }

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn forward(&self, id: Uuid, provider: &str, result: &TransformationResult) {
        let sink = self.sink.read().clone();
        let Some(sink) = sink else {
            return;
        };
        if let Err(e) = sink.accept(result).await {
            warn!(
                event = "sink_error",
                transformation_id = %id,
                provider = %provider,
                error = %e,
                "Result sink rejected transformation result"
            );
            self.events.publish(OrchestratorEvent::SinkFailed {
                transformation_id: id,
                provider: provider.to_string(),
                error: e.to_string(),
            });
        }
    }

    /// Whether `shutdown` has not started yet
    pub(crate) fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    // ===== HEALTH =====

    /// Aggregate counters plus every adapter's own health
    pub fn get_health(&self) -> OrchestratorHealth {
        let providers = self
            .registry
            .read()
            .iter()
            .map(|(name, entry)| {
                let stats = self
                    .counters
                    .get(name)
                    .map(|c| c.snapshot())
                    .unwrap_or_default();
                (
                    name.clone(),
                    ProviderHealth {
                        enabled: entry.enabled,
                        stats,
                        adapter: entry.adapter.health(),
                    },
                )
            })
            .collect();

        OrchestratorHealth {
            initialized: self.initialized.load(Ordering::SeqCst),
            accepting: self.is_accepting(),
            in_flight: self.in_flight.len(),
            totals: self.totals.snapshot(),
            providers,
        }
    }

    /// Counters of one provider
    pub fn provider_stats(&self, provider: &str) -> Option<TransformStats> {
        self.counters.get(provider).map(|c| c.snapshot())
    }

    // ===== SHUTDOWN =====

    /// Stop accepting work, wait up to `shutdown_timeout` for in-flight
    /// transforms, then shut every adapter down and clear the registry.
    ///
    /// A timeout is reported, not raised: `remaining_transformations` tells
    /// the caller how much work was abandoned.
    pub async fn shutdown(&self) -> ShutdownReport {
        let started = Instant::now();
        self.accepting.store(false, Ordering::SeqCst);
        info!(in_flight = self.in_flight.len(), "🛑 Shutting down orchestrator");

        let timeout = self.config.shutdown_timeout();
        let timed_out = tokio::time::timeout(timeout, self.wait_for_drain())
            .await
            .is_err();
        let remaining = self.in_flight.len();
        if timed_out {
            warn!(
                remaining_transformations = remaining,
                timeout_ms = self.config.shutdown_timeout_ms,
                "Shutdown timeout elapsed with transformations in flight"
            );
        }

        let adapters: Vec<Arc<dyn TransformAdapter>> = self
            .registry
            .write()
            .drain()
            .map(|(_, entry)| entry.adapter)
            .collect();
        join_all(adapters.iter().map(|adapter| adapter.shutdown())).await;
        self.initialized.store(false, Ordering::SeqCst);
        *self.sink.write() = None;

        self.events.publish(OrchestratorEvent::ShutdownCompleted {
            remaining_transformations: remaining,
        });
        info!(remaining_transformations = remaining, "✅ Orchestrator shut down");

        ShutdownReport {
            remaining_transformations: remaining,
            timed_out,
            elapsed: started.elapsed(),
        }
    }

    async fn wait_for_drain(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            // Register before checking so a drop between check and await is not missed
            notified.as_mut().enable();
            if self.in_flight.is_empty() {
                return;
            }
            notified.await;
        }
    }
}
