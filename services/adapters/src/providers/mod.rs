//! Built-in provider adapters

pub mod kafka;
pub mod rabbitmq;

use std::sync::Arc;

use types::{CanonicalEntity, EntityId, EntityKind};

use crate::common::{ManagedAdapter, TransformAdapter};
use crate::config::ProviderSettings;
use crate::validation::InputSchema;
use crate::Result;

pub use kafka::KafkaAdapter;
pub use rabbitmq::RabbitMqAdapter;

/// Names of the providers shipped with this crate
pub const BUILTIN_PROVIDERS: &[&str] = &[kafka::PROVIDER, rabbitmq::PROVIDER];

/// Input schema of a built-in provider
pub fn schema_for(provider: &str) -> Option<&'static InputSchema> {
    match provider {
        kafka::PROVIDER => Some(&kafka::INPUT_SCHEMA),
        rabbitmq::PROVIDER => Some(&rabbitmq::INPUT_SCHEMA),
        _ => None,
    }
}

/// Managed instance of a built-in provider
pub fn builtin_adapter(provider: &str, settings: ProviderSettings) -> Option<Arc<dyn TransformAdapter>> {
    match provider {
        kafka::PROVIDER => Some(ManagedAdapter::shared(KafkaAdapter::new(settings))),
        rabbitmq::PROVIDER => Some(ManagedAdapter::shared(RabbitMqAdapter::new(settings))),
        _ => None,
    }
}

/// Derive an identifier in the provider's namespace and domain.
///
/// Natural keys start with the provider name so equal names from different
/// providers never share an identifier.
pub(crate) fn derive_id(settings: &ProviderSettings, kind: &EntityKind, natural_key: &str) -> Result<EntityId> {
    Ok(EntityId::derive(
        &settings.namespace,
        &settings.domain,
        kind,
        natural_key,
    )?)
}

/// Cluster entities of a result, in emission order
pub(crate) struct ClusterIndex {
    clusters: Vec<(String, EntityId)>,
}

impl ClusterIndex {
    pub fn from_entities(entities: &[CanonicalEntity]) -> Self {
        Self {
            clusters: entities
                .iter()
                .filter(|e| e.kind == EntityKind::Cluster)
                .map(|e| (e.name.clone(), e.id.clone()))
                .collect(),
        }
    }

    /// Cluster called `name`
    pub fn get(&self, name: &str) -> Option<&(String, EntityId)> {
        self.clusters.iter().find(|(n, _)| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, EntityId)> {
        self.clusters.iter()
    }
}
