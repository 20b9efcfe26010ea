//! Lifecycle state machine of the managed adapter wrapper

use adapter_service::{
    AdapterError, HealthStatus, KafkaAdapter, LifecycleState, ManagedAdapter, ProviderSettings,
    TransformAdapter,
};
use serde_json::json;

fn payload() -> serde_json::Value {
    json!({"brokers": [{"id": 0, "host": "10.0.0.1", "port": 9092}]})
}

#[tokio::test]
async fn test_transform_before_initialize_fails() {
    let adapter = ManagedAdapter::new(KafkaAdapter::new(ProviderSettings::default()));
    assert_eq!(adapter.state(), LifecycleState::Uninitialized);

    let err = adapter.transform(&payload()).await.unwrap_err();
    assert!(matches!(err, AdapterError::NotInitialized { .. }));
    assert!(err.is_not_initialized());
    assert!(err.is_retryable());

    let health = adapter.health();
    assert!(!health.initialized);
    assert_eq!(health.status, HealthStatus::Unhealthy);
    // Rejected before any step ran
    assert_eq!(health.transforms, 0);
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    println!("🧪 Testing idempotent initialization");
    let adapter = ManagedAdapter::new(KafkaAdapter::new(ProviderSettings::default()));
    adapter.initialize().await.unwrap();
    adapter.initialize().await.unwrap();
    assert!(adapter.is_initialized());

    let result = adapter.transform(&payload()).await.unwrap();
    assert_eq!(result.provider, "kafka");

    let health = adapter.health();
    assert_eq!(health.state, LifecycleState::Initialized);
    assert_eq!(health.status, HealthStatus::Healthy);
    assert_eq!(health.transforms, 1);
    assert_eq!(health.successes, 1);
    assert_eq!(health.entities_emitted, 2);
    assert_eq!(health.relationships_emitted, 1);
    println!("✅ Second initialize was a no-op");
}

#[tokio::test]
async fn test_invalid_settings_fail_initialization() {
    let settings = ProviderSettings {
        namespace: "not-alphanumeric".to_string(),
        ..Default::default()
    };
    let adapter = ManagedAdapter::new(KafkaAdapter::new(settings));

    let err = adapter.initialize().await.unwrap_err();
    assert!(matches!(err, AdapterError::Initialization { .. }));
    assert_eq!(adapter.state(), LifecycleState::Uninitialized);
}

#[tokio::test]
async fn test_failed_transform_degrades_health() {
    let adapter = ManagedAdapter::new(KafkaAdapter::new(ProviderSettings::default()));
    adapter.initialize().await.unwrap();

    adapter.transform(&json!({})).await.unwrap_err();
    let health = adapter.health();
    assert_eq!(health.status, HealthStatus::Degraded);
    assert_eq!(health.failures, 1);
    assert!(health.last_error.is_some());

    adapter.transform(&payload()).await.unwrap();
    assert_eq!(adapter.health().status, HealthStatus::Healthy);
}

#[tokio::test]
async fn test_shutdown_is_terminal() {
    let adapter = ManagedAdapter::new(KafkaAdapter::new(ProviderSettings::default()));
    adapter.initialize().await.unwrap();
    adapter.shutdown().await;

    assert_eq!(adapter.state(), LifecycleState::ShutDown);
    assert!(matches!(
        adapter.transform(&payload()).await.unwrap_err(),
        AdapterError::ShutDown { .. }
    ));
    assert!(matches!(
        adapter.initialize().await.unwrap_err(),
        AdapterError::ShutDown { .. }
    ));
}
