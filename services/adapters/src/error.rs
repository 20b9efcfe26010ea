//! Error types for the adapters module

use thiserror::Error;
use types::{IdentifierError, ValidationIssue};

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Main error type for adapter operations
#[derive(Debug, Error)]
pub enum AdapterError {
    /// `transform` called before `initialize`, or the adapter lost its
    /// initialization and must be re-initialized
    #[error("Adapter '{provider}' is not initialized")]
    NotInitialized {
        /// Provider whose adapter is not ready
        provider: String,
    },

    /// Adapter has been shut down and accepts no more work
    #[error("Adapter '{provider}' has been shut down")]
    ShutDown {
        /// Provider whose adapter is shut down
        provider: String,
    },

    /// Payload failed structural validation
    #[error("Invalid input for provider '{provider}': {}", join_issues(.errors))]
    InvalidInput {
        /// Provider the payload was meant for
        provider: String,
        /// Every structural error found
        errors: Vec<ValidationIssue>,
    },

    /// Required field missing while extracting components
    #[error("Missing required field: {field}")]
    MissingField {
        /// Path of the missing field
        field: String,
    },

    /// Payload shape could not be turned into components
    #[error("Extraction failed for provider '{provider}': {message}")]
    Extraction {
        /// Provider being transformed
        provider: String,
        /// What went wrong
        message: String,
    },

    /// Identifier derivation failed
    #[error("Identifier error: {0}")]
    Identifier(#[from] IdentifierError),

    /// JSON handling error
    #[error("Failed to process JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Provider-specific setup failed
    #[error("Initialization failed for provider '{provider}': {reason}")]
    Initialization {
        /// Provider being initialized
        provider: String,
        /// Reason for the failure
        reason: String,
    },

    /// Intermittent provider I/O failure
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        /// Provider that failed
        provider: String,
        /// Underlying error message
        message: String,
    },

    /// Provider call exceeded its deadline
    #[error("Provider '{provider}' timed out after {timeout_ms}ms")]
    Timeout {
        /// Provider that timed out
        provider: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// I/O error during provider calls
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error in adapter settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdapterError {
    /// Shorthand for [`AdapterError::Extraction`]
    pub fn extraction(provider: &str, message: impl Into<String>) -> Self {
        AdapterError::Extraction {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for [`AdapterError::Provider`]
    pub fn provider(provider: &str, message: impl Into<String>) -> Self {
        AdapterError::Provider {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Check if this error is transient and worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AdapterError::NotInitialized { .. }
                | AdapterError::Initialization { .. }
                | AdapterError::Provider { .. }
                | AdapterError::Timeout { .. }
                | AdapterError::Io(_)
        )
    }

    /// Check if the adapter lost (or never had) its initialization
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, AdapterError::NotInitialized { .. })
    }

    /// Check if the payload itself is at fault; retrying cannot succeed
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AdapterError::InvalidInput { .. }
                | AdapterError::MissingField { .. }
                | AdapterError::Extraction { .. }
                | AdapterError::Identifier(_)
                | AdapterError::JsonParse(_)
        )
    }

    /// Check if this error indicates a permanent failure
    pub fn is_permanent(&self) -> bool {
        !self.is_retryable()
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            AdapterError::NotInitialized { .. } | AdapterError::ShutDown { .. } => "lifecycle",
            AdapterError::InvalidInput { .. }
            | AdapterError::MissingField { .. }
            | AdapterError::Extraction { .. }
            | AdapterError::Identifier(_)
            | AdapterError::JsonParse(_) => "input",
            AdapterError::Initialization { .. } => "initialization",
            AdapterError::Provider { .. } | AdapterError::Timeout { .. } | AdapterError::Io(_) => {
                "provider"
            }
            AdapterError::Configuration(_) => "configuration",
            AdapterError::Internal(_) => "internal",
        }
    }
}
