//! Configuration module for adapters
//!
//! Per-provider settings shared by every adapter implementation

use serde::{Deserialize, Serialize};

/// Settings applied to one registered provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Whether the provider takes part in initialization and transforms
    pub enabled: bool,

    /// First identifier segment (account or tenant), alphanumeric
    pub namespace: String,

    /// Second identifier segment, upper-case letters and underscores
    pub domain: String,

    /// Name of the cluster synthesized when the payload carries none
    pub default_cluster_name: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: "local".to_string(),
            domain: "INFRA".to_string(),
            default_cluster_name: "default".to_string(),
        }
    }
}

impl ProviderSettings {
    /// Settings for `namespace`, everything else default
    pub fn for_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.namespace.is_empty() || !self.namespace.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(format!(
                "namespace '{}' must be non-empty and alphanumeric",
                self.namespace
            ));
        }

        if self.domain.is_empty() || !self.domain.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
            return Err(format!(
                "domain '{}' must contain only upper-case letters and underscores",
                self.domain
            ));
        }

        if self.default_cluster_name.trim().is_empty() {
            return Err("default_cluster_name cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ProviderSettings::default().validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut settings = ProviderSettings::for_namespace("acct-1");
        assert!(settings.validate().is_err());

        settings.namespace = "123456".to_string();
        settings.domain = "infra".to_string();
        assert!(settings.validate().is_err());

        settings.domain = "INFRA".to_string();
        settings.default_cluster_name = " ".to_string();
        assert!(settings.validate().is_err());
    }
}
