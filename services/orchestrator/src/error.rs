//! Orchestrator error types

use adapter_service::AdapterError;
use discovery_cache::CacheError;
use thiserror::Error;

/// Result type for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Errors surfaced by [`crate::TransformationOrchestrator`]
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No adapter registered under this name
    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),

    /// Registration under a name that is already taken
    #[error("Provider '{0}' is already registered")]
    DuplicateProvider(String),

    /// Provider registered but disabled in configuration
    #[error("Provider '{0}' is disabled")]
    ProviderDisabled(String),

    /// Terminal adapter error, after retries where they apply
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// New work refused after `shutdown` began
    #[error("Orchestrator is shutting down")]
    ShuttingDown,

    /// In-flight limit reached
    #[error("Too many transformations in flight (limit {limit})")]
    TooManyInFlight {
        /// Configured `max_in_flight`
        limit: usize,
    },

    /// An adapter failed to initialize; no provider is reported ready
    #[error("Initialization failed for provider '{provider}': {source}")]
    Initialization {
        /// Provider whose adapter failed
        provider: String,
        /// Underlying adapter error
        #[source]
        source: AdapterError,
    },

    /// Discovery producer failed
    #[error("Discovery failed for provider '{provider}': {message}")]
    Discovery {
        /// Provider being discovered
        provider: String,
        /// Producer error message
        message: String,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl OrchestratorError {
    /// Adapter error behind this one, if any
    pub fn adapter_error(&self) -> Option<&AdapterError> {
        match self {
            OrchestratorError::Adapter(e) => Some(e),
            OrchestratorError::Initialization { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether the caller's payload was at fault
    pub fn is_input_error(&self) -> bool {
        self.adapter_error().is_some_and(AdapterError::is_input_error)
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            OrchestratorError::UnknownProvider(_)
            | OrchestratorError::DuplicateProvider(_)
            | OrchestratorError::ProviderDisabled(_) => "registry",
            OrchestratorError::Adapter(e) => e.category(),
            OrchestratorError::ShuttingDown | OrchestratorError::TooManyInFlight { .. } => {
                "capacity"
            }
            OrchestratorError::Initialization { .. } => "initialization",
            OrchestratorError::Discovery { .. } => "discovery",
            OrchestratorError::Cache(_) => "cache",
            OrchestratorError::Config(_) => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_errors_pass_through() {
        let err: OrchestratorError = AdapterError::MissingField {
            field: "brokers[].id".to_string(),
        }
        .into();
        assert!(err.is_input_error());
        assert_eq!(err.category(), "input");
        assert_eq!(err.to_string(), "Missing required field: brokers[].id");
    }

    #[test]
    fn test_registry_errors() {
        let err = OrchestratorError::DuplicateProvider("kafka".to_string());
        assert!(!err.is_input_error());
        assert_eq!(err.category(), "registry");
        assert!(err.to_string().contains("already registered"));
    }
}
