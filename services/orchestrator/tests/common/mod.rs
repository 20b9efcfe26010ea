//! Test doubles shared by the orchestrator integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use adapter_service::{
    AdapterError, AdapterHealth, HealthStatus, LifecycleState, Result, TransformAdapter,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use transform_orchestrator::{OrchestratorConfig, ResultSink};
use types::{TransformationResult, ValidationReport};

/// Orchestrator config with millisecond backoff so retry tests stay fast
pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        retry_delay_ms: 20,
        backoff_multiplier: 2.0,
        shutdown_timeout_ms: 2_000,
        ..Default::default()
    }
}

/// Payload accepted by the built-in Kafka adapter
pub fn kafka_payload() -> Value {
    json!({
        "brokers": [{"id": 0, "host": "10.0.0.1", "port": 9092}],
        "topics": [{"name": "t1", "partitionCount": 3}]
    })
}

fn stub_health(provider: &str, initialized: bool) -> AdapterHealth {
    AdapterHealth {
        provider: provider.to_string(),
        state: if initialized {
            LifecycleState::Initialized
        } else {
            LifecycleState::Uninitialized
        },
        status: if initialized {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        initialized,
        transforms: 0,
        successes: 0,
        failures: 0,
        entities_emitted: 0,
        metrics_emitted: 0,
        relationships_emitted: 0,
        last_error: None,
    }
}

fn empty_result(provider: &str) -> TransformationResult {
    TransformationResult::new(provider, vec![], vec![], vec![])
}

/// Fails every transform with a retryable provider error
#[derive(Default)]
pub struct AlwaysFailingAdapter {
    pub attempts: AtomicU32,
}

#[async_trait]
impl TransformAdapter for AlwaysFailingAdapter {
    fn provider(&self) -> &str {
        "always-failing"
    }

    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn transform(&self, _payload: &Value) -> Result<TransformationResult> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AdapterError::provider("always-failing", "connection refused"))
    }

    fn validate_input(&self, _payload: &Value) -> Result<ValidationReport> {
        Ok(ValidationReport::new())
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn health(&self) -> AdapterHealth {
        stub_health("always-failing", true)
    }

    async fn shutdown(&self) {}
}

/// Fails the first `failures` transforms, then succeeds
pub struct FlakyAdapter {
    pub failures: u32,
    pub attempts: AtomicU32,
}

impl FlakyAdapter {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            attempts: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl TransformAdapter for FlakyAdapter {
    fn provider(&self) -> &str {
        "flaky"
    }

    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn transform(&self, _payload: &Value) -> Result<TransformationResult> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            Err(AdapterError::Timeout {
                provider: "flaky".to_string(),
                timeout_ms: 10,
            })
        } else {
            Ok(empty_result("flaky"))
        }
    }

    fn validate_input(&self, _payload: &Value) -> Result<ValidationReport> {
        Ok(ValidationReport::new())
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn health(&self) -> AdapterHealth {
        stub_health("flaky", true)
    }

    async fn shutdown(&self) {}
}

/// Reports lost initialization until `initialize` is called again
pub struct ForgetfulAdapter {
    pub ready: AtomicBool,
    pub initializations: AtomicU32,
}

impl ForgetfulAdapter {
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            initializations: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl TransformAdapter for ForgetfulAdapter {
    fn provider(&self) -> &str {
        "forgetful"
    }

    async fn initialize(&self) -> Result<()> {
        self.initializations.fetch_add(1, Ordering::SeqCst);
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn transform(&self, _payload: &Value) -> Result<TransformationResult> {
        if self.ready.load(Ordering::SeqCst) {
            Ok(empty_result("forgetful"))
        } else {
            Err(AdapterError::NotInitialized {
                provider: "forgetful".to_string(),
            })
        }
    }

    fn validate_input(&self, _payload: &Value) -> Result<ValidationReport> {
        Ok(ValidationReport::new())
    }

    fn is_initialized(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn health(&self) -> AdapterHealth {
        stub_health("forgetful", self.is_initialized())
    }

    async fn shutdown(&self) {}
}

/// Sleeps for `delay` in every transform
pub struct SlowAdapter {
    pub delay: Duration,
    pub completed: AtomicU32,
}

impl SlowAdapter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            completed: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl TransformAdapter for SlowAdapter {
    fn provider(&self) -> &str {
        "slow"
    }

    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn transform(&self, _payload: &Value) -> Result<TransformationResult> {
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(empty_result("slow"))
    }

    fn validate_input(&self, _payload: &Value) -> Result<ValidationReport> {
        Ok(ValidationReport::new())
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn health(&self) -> AdapterHealth {
        stub_health("slow", true)
    }

    async fn shutdown(&self) {}
}

/// Records the highest number of transforms running at once.
/// Payloads with `"fail": true` are rejected as input errors.
#[derive(Default)]
pub struct ConcurrencyProbe {
    pub current: AtomicUsize,
    pub peak: AtomicUsize,
    pub started: AtomicUsize,
}

#[async_trait]
impl TransformAdapter for ConcurrencyProbe {
    fn provider(&self) -> &str {
        "probe"
    }

    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn transform(&self, payload: &Value) -> Result<TransformationResult> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);

        if payload.get("fail").and_then(Value::as_bool) == Some(true) {
            return Err(AdapterError::MissingField {
                field: "fail".to_string(),
            });
        }
        Ok(empty_result("probe"))
    }

    fn validate_input(&self, _payload: &Value) -> Result<ValidationReport> {
        Ok(ValidationReport::new())
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn health(&self) -> AdapterHealth {
        stub_health("probe", true)
    }

    async fn shutdown(&self) {}
}

/// Fails `initialize`
pub struct BrokenInitAdapter;

#[async_trait]
impl TransformAdapter for BrokenInitAdapter {
    fn provider(&self) -> &str {
        "broken"
    }

    async fn initialize(&self) -> Result<()> {
        Err(AdapterError::Initialization {
            provider: "broken".to_string(),
            reason: "credentials missing".to_string(),
        })
    }

    async fn transform(&self, _payload: &Value) -> Result<TransformationResult> {
        Err(AdapterError::NotInitialized {
            provider: "broken".to_string(),
        })
    }

    fn validate_input(&self, _payload: &Value) -> Result<ValidationReport> {
        Ok(ValidationReport::new())
    }

    fn is_initialized(&self) -> bool {
        false
    }

    fn health(&self) -> AdapterHealth {
        stub_health("broken", false)
    }

    async fn shutdown(&self) {}
}

/// Keeps every result it accepts
#[derive(Default)]
pub struct CollectingSink {
    pub results: Mutex<Vec<TransformationResult>>,
}

#[async_trait]
impl ResultSink for CollectingSink {
    async fn accept(&self, result: &TransformationResult) -> anyhow::Result<()> {
        self.results.lock().push(result.clone());
        Ok(())
    }
}

/// Rejects every result
pub struct FailingSink;

#[async_trait]
impl ResultSink for FailingSink {
    async fn accept(&self, _result: &TransformationResult) -> anyhow::Result<()> {
        anyhow::bail!("ingest endpoint unavailable")
    }
}

/// Share a concrete double and keep a typed handle for assertions
pub fn shared<T: TransformAdapter + 'static>(adapter: T) -> (Arc<T>, Arc<dyn TransformAdapter>) {
    let typed = Arc::new(adapter);
    let dynamic: Arc<dyn TransformAdapter> = typed.clone();
    (typed, dynamic)
}
