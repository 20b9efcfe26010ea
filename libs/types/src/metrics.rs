//! Metric data points

use serde::{Deserialize, Serialize};

use crate::entities::{AttributeValue, Attributes, CanonicalEntity};

/// Attribute key carrying the owning entity's identifier
pub const ENTITY_ID_ATTRIBUTE: &str = "entityId";
/// Attribute key carrying the provider name
pub const PROVIDER_ATTRIBUTE: &str = "provider";

/// One numeric observation about an entity.
///
/// `attributes` always carries the owning entity's id and provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDataPoint {
    /// Canonical metric name, e.g. `kafka.broker.bytesIn`
    pub name: String,
    /// Observed value
    pub value: f64,
    /// Unix milliseconds; `None` means "now" to the consumer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Dimensions, including the entity id and provider
    #[serde(default)]
    pub attributes: Attributes,
}

impl MetricDataPoint {
    /// Data point for `entity`, pre-tagged with its id and provider
    pub fn for_entity(
        entity: &CanonicalEntity,
        name: impl Into<String>,
        value: f64,
        timestamp: Option<i64>,
    ) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert(
            ENTITY_ID_ATTRIBUTE.to_string(),
            AttributeValue::Text(entity.id.to_string()),
        );
        attributes.insert(
            PROVIDER_ATTRIBUTE.to_string(),
            AttributeValue::Text(entity.provider.clone()),
        );
        attributes.insert(
            "entityName".to_string(),
            AttributeValue::Text(entity.name.clone()),
        );
        Self {
            name: name.into(),
            value,
            timestamp,
            attributes,
        }
    }

    /// Add one dimension
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Owning entity id, if tagged
    pub fn entity_id(&self) -> Option<&str> {
        self.attributes
            .get(ENTITY_ID_ATTRIBUTE)
            .and_then(AttributeValue::as_str)
    }
}
