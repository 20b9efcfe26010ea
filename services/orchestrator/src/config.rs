//! Pipeline configuration
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables prefixed `PIPELINE`, with `__` between path segments:
//!
//! ```text
//! PIPELINE__ORCHESTRATOR__MAX_RETRIES=5
//! PIPELINE__CACHE__MAX_SIZE=5000
//! PIPELINE__PROVIDERS__KAFKA__NAMESPACE=123456
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use adapter_service::{ProviderSettings, ValidationMode};
use anyhow::{anyhow, Context};
use config::{Config, Environment, File, FileFormat};
use discovery_cache::CacheConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "PIPELINE";

/// Separator between prefix and path segments in override variables
pub const ENV_SEPARATOR: &str = "__";

/// Complete configuration of one pipeline process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Retry, concurrency and shutdown behaviour
    pub orchestrator: OrchestratorConfig,
    /// Discovery cache
    pub cache: CacheConfig,
    /// Log output
    pub logging: LoggingConfig,
    /// Per-provider settings, keyed by provider name
    pub providers: HashMap<String, ProviderSettings>,
}

/// Orchestrator tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Attempts per transform, the first one included
    pub max_retries: u32,
    /// Delay before the second attempt
    pub retry_delay_ms: u64,
    /// Growth factor of the delay between consecutive attempts
    pub backoff_multiplier: f64,
    /// Transforms running at once inside one batch chunk
    pub max_concurrency: usize,
    /// Items per batch chunk; chunks run one after another
    pub batch_chunk_size: usize,
    /// Upper bound on waiting for in-flight work during shutdown
    pub shutdown_timeout_ms: u64,
    /// Result validation applied after every successful transform
    pub validation_mode: ValidationMode,
    /// Transforms tracked at once before new ones are refused
    pub max_in_flight: usize,
    /// Capacity of the event broadcast channel
    pub event_buffer: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_concurrency: 5,
            batch_chunk_size: 10,
            shutdown_timeout_ms: 30_000,
            validation_mode: ValidationMode::default(),
            max_in_flight: 1000,
            event_buffer: 256,
        }
    }
}

impl OrchestratorConfig {
    /// Wait after failed attempt `attempt` (1-based):
    /// `retry_delay * backoff_multiplier^(attempt - 1)`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.retry_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(millis.round() as u64)
    }

    /// Sum of every delay an always-failing transform waits through
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_retries).map(|attempt| self.backoff_delay(attempt)).sum()
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_retries == 0 {
            return Err("max_retries must be at least 1".to_string());
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(format!(
                "backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be greater than 0".to_string());
        }
        if self.batch_chunk_size == 0 {
            return Err("batch_chunk_size must be greater than 0".to_string());
        }
        if self.max_in_flight == 0 {
            return Err("max_in_flight must be greater than 0".to_string());
        }
        if self.event_buffer == 0 {
            return Err("event_buffer must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or `transform_orchestrator=debug`
    pub level: String,
    pub format: LogFormat,
    /// Include the event target (module path)
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            with_target: true,
        }
    }
}

impl PipelineConfig {
    /// Load from `path` (if given) with `PIPELINE__*` environment overrides
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Parse a TOML document; no environment overrides are applied
    pub fn from_toml_str(document: &str) -> anyhow::Result<Self> {
        let config: Self = Config::builder()
            .add_source(File::from_str(document, FileFormat::Toml))
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate().map_err(|e| anyhow!(e))?;
        Ok(config)
    }

    /// Render as TOML, e.g. to dump the effective configuration
    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// `env` replaces the process environment when given
    fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> anyhow::Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading pipeline config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(env),
        );

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate().map_err(|e| anyhow!(e))?;
        debug!(providers = config.providers.len(), "Pipeline config loaded");
        Ok(config)
    }

    /// Settings for `provider`, defaults when it has no section
    pub fn provider_settings(&self, provider: &str) -> ProviderSettings {
        self.providers.get(provider).cloned().unwrap_or_default()
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), String> {
        self.orchestrator
            .validate()
            .map_err(|e| format!("orchestrator: {e}"))?;
        self.cache.validate().map_err(|e| format!("cache: {e}"))?;
        for (name, settings) in &self.providers {
            settings
                .validate()
                .map_err(|e| format!("providers.{name}: {e}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.orchestrator.max_retries, 3);
        assert_eq!(config.orchestrator.retry_delay_ms, 1000);
        assert_eq!(config.orchestrator.backoff_multiplier, 2.0);
        assert_eq!(config.orchestrator.max_concurrency, 5);
        assert_eq!(config.orchestrator.shutdown_timeout_ms, 30_000);
        assert_eq!(config.cache.max_size, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backoff_schedule() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(4000));
        // Delays after attempts 1 and 2; the third attempt is the last
        assert_eq!(config.total_backoff(), Duration::from_millis(3000));
    }

    #[test]
    fn test_rejects_nonsense() {
        let mut config = OrchestratorConfig::default();
        config.max_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = OrchestratorConfig::default();
        config.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = OrchestratorConfig::default();
        config.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_document() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [orchestrator]
            max_retries = 5
            validation_mode = "strict"

            [cache]
            max_size = 50

            [logging]
            format = "json"

            [providers.kafka]
            namespace = "123456"
            default_cluster_name = "msk"
            "#,
        )
        .unwrap();

        assert_eq!(config.orchestrator.max_retries, 5);
        assert_eq!(config.orchestrator.validation_mode, ValidationMode::Strict);
        assert_eq!(config.orchestrator.retry_delay_ms, 1000);
        assert_eq!(config.cache.max_size, 50);
        assert_eq!(config.logging.format, LogFormat::Json);

        let kafka = config.provider_settings("kafka");
        assert_eq!(kafka.namespace, "123456");
        assert_eq!(kafka.default_cluster_name, "msk");
        assert_eq!(kafka.domain, "INFRA");
        assert_eq!(config.provider_settings("rabbitmq"), ProviderSettings::default());
    }

    #[test]
    fn test_invalid_provider_settings_rejected() {
        let err = PipelineConfig::from_toml_str(
            r#"
            [providers.kafka]
            namespace = "not valid"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("providers.kafka"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[orchestrator]\nmax_retries = 4\nmax_concurrency = 2").unwrap();

        let env = HashMap::from([
            ("PIPELINE__ORCHESTRATOR__MAX_RETRIES".to_string(), "7".to_string()),
            ("UNRELATED__ORCHESTRATOR__MAX_RETRIES".to_string(), "9".to_string()),
        ]);
        let config = PipelineConfig::load_with_env(Some(file.path()), Some(env)).unwrap();

        assert_eq!(config.orchestrator.max_retries, 7);
        assert_eq!(config.orchestrator.max_concurrency, 2);
    }

    #[test]
    fn test_round_trips_through_toml() {
        let mut config = PipelineConfig::default();
        config
            .providers
            .insert("kafka".to_string(), ProviderSettings::for_namespace("42"));
        let rendered = config.to_toml_string().unwrap();
        assert_eq!(PipelineConfig::from_toml_str(&rendered).unwrap(), config);
    }
}
