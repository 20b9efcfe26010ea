//! # RabbitMQ Adapter
//!
//! Maps RabbitMQ management API snapshots (`/api/overview`, `/api/nodes`,
//! `/api/queues`) onto the canonical model. Nodes become BROKER entities,
//! queues become QUEUE entities, and each queue is `HOSTED_ON` the node that
//! owns it.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use types::{CanonicalEntity, EntityKind, MetricDataPoint, RelationshipEdge, RelationshipType};

use super::{derive_id, ClusterIndex};
use crate::common::Adapter;
use crate::config::ProviderSettings;
use crate::parsing_utils::{
    array_field, i64_field, map_metrics, payload_timestamp, scalar_attributes, string_field,
    MetricTable,
};
use crate::validation::{CollectionRule, CollectionShape, InputSchema};
use crate::{AdapterError, Result};

/// Provider name
pub const PROVIDER: &str = "rabbitmq";

/// AMQP port assumed when a node does not report one
pub const DEFAULT_AMQP_PORT: i64 = 5672;

const DEFAULT_VHOST: &str = "/";

/// Recognised data sources
pub static INPUT_SCHEMA: InputSchema = InputSchema {
    provider: PROVIDER,
    collections: &[
        CollectionRule {
            key: "nodes",
            shape: CollectionShape::Array,
            required_fields: &["name"],
            optional_fields: &["host", "port"],
        },
        CollectionRule {
            key: "queues",
            shape: CollectionShape::Array,
            required_fields: &["name"],
            optional_fields: &["vhost", "node"],
        },
        CollectionRule {
            key: "overview",
            shape: CollectionShape::Object,
            required_fields: &[],
            optional_fields: &["cluster_name"],
        },
    ],
};

/// Queue field -> canonical metric
pub const QUEUE_METRICS: MetricTable = &[
    ("messages", "rabbitmq.queue.messages"),
    ("messages_ready", "rabbitmq.queue.messagesReady"),
    ("messages_unacknowledged", "rabbitmq.queue.messagesUnacknowledged"),
    ("consumers", "rabbitmq.queue.consumers"),
];

/// Node field -> canonical metric
pub const NODE_METRICS: MetricTable = &[
    ("mem_used", "rabbitmq.node.memUsed"),
    ("fd_used", "rabbitmq.node.fdUsed"),
    ("sockets_used", "rabbitmq.node.socketsUsed"),
    ("proc_used", "rabbitmq.node.procUsed"),
    ("disk_free", "rabbitmq.node.diskFree"),
];

const OVERVIEW_ATTRIBUTES: &[&str] = &["rabbitmq_version", "erlang_version", "management_version"];
const NODE_ATTRIBUTES: &[&str] = &["type", "running", "uptime"];
const QUEUE_ATTRIBUTES: &[&str] = &["durable", "auto_delete", "exclusive", "state", "type"];

/// Intermediate form of a RabbitMQ snapshot
#[derive(Debug, Clone, Default)]
pub struct RabbitMqComponents {
    /// `overview.cluster_name`, if reported
    pub cluster_name: Option<String>,
    /// Overview object
    pub overview: Value,
    /// Nodes, deduplicated by name
    pub nodes: Vec<NodeRecord>,
    /// Queues, deduplicated by (vhost, name)
    pub queues: Vec<QueueRecord>,
    /// Observation time applied to every metric
    pub observed_at: i64,
}

/// One RabbitMQ node
#[derive(Debug, Clone)]
pub struct NodeRecord {
    /// Erlang node name, e.g. `rabbit@mq-1`
    pub name: String,
    /// Host name
    pub host: String,
    /// AMQP port
    pub port: i64,
    /// Source object
    pub raw: Value,
}

/// One queue
#[derive(Debug, Clone)]
pub struct QueueRecord {
    /// Queue name
    pub name: String,
    pub vhost: String,
    /// Owning node name
    pub node: Option<String>,
    /// Source object
    pub raw: Value,
}

/// RabbitMQ provider adapter
pub struct RabbitMqAdapter {
    settings: ProviderSettings,
}

impl RabbitMqAdapter {
    pub fn new(settings: ProviderSettings) -> Self {
        Self { settings }
    }

    fn cluster_name<'a>(&'a self, components: &'a RabbitMqComponents) -> &'a str {
        components
            .cluster_name
            .as_deref()
            .unwrap_or(&self.settings.default_cluster_name)
    }

    fn cluster_key(&self, cluster: &str) -> String {
        format!("{PROVIDER}:{cluster}:{}", self.settings.namespace)
    }

    fn member_key(&self, cluster: &str, member: &str) -> String {
        format!("{PROVIDER}:{cluster}:{}:{member}", self.settings.namespace)
    }

    fn queue_key(&self, cluster: &str, queue: &QueueRecord) -> String {
        self.member_key(cluster, &format!("{}/{}", queue.vhost, queue.name))
    }

    /// Host part of an Erlang node name
    fn host_of(node_name: &str) -> &str {
        node_name
            .split_once('@')
            .map(|(_, host)| host)
            .unwrap_or(node_name)
    }
}

#[async_trait]
impl Adapter for RabbitMqAdapter {
    type Components = RabbitMqComponents;

    fn provider(&self) -> &str {
        PROVIDER
    }

    fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    fn input_schema(&self) -> &'static InputSchema {
        &INPUT_SCHEMA
    }

    fn extract_components(&self, payload: &Value) -> Result<RabbitMqComponents> {
        let overview = payload.get("overview").cloned().unwrap_or(Value::Null);
        let mut components = RabbitMqComponents {
            cluster_name: string_field(&overview, &["cluster_name"]),
            overview,
            observed_at: payload_timestamp(payload).unwrap_or_else(types::now_millis),
            ..Default::default()
        };

        for item in array_field(payload, "nodes").into_iter().flatten() {
            let name = string_field(item, &["name"]).ok_or_else(|| AdapterError::MissingField {
                field: "nodes[].name".to_string(),
            })?;
            if components.nodes.iter().any(|n| n.name == name) {
                continue;
            }
            components.nodes.push(NodeRecord {
                host: string_field(item, &["host"]).unwrap_or_else(|| Self::host_of(&name).to_string()),
                port: i64_field(item, "port").unwrap_or(DEFAULT_AMQP_PORT),
                name,
                raw: item.clone(),
            });
        }

        for item in array_field(payload, "queues").into_iter().flatten() {
            let name = string_field(item, &["name"]).ok_or_else(|| AdapterError::MissingField {
                field: "queues[].name".to_string(),
            })?;
            let vhost = string_field(item, &["vhost"]).unwrap_or_else(|| DEFAULT_VHOST.to_string());
            if components
                .queues
                .iter()
                .any(|q| q.name == name && q.vhost == vhost)
            {
                continue;
            }
            components.queues.push(QueueRecord {
                name,
                vhost,
                node: string_field(item, &["node"]),
                raw: item.clone(),
            });
        }

        Ok(components)
    }

    fn map_to_entities(&self, components: &RabbitMqComponents) -> Result<Vec<CanonicalEntity>> {
        if components.nodes.is_empty()
            && components.queues.is_empty()
            && components.cluster_name.is_none()
        {
            return Ok(Vec::new());
        }

        let cluster_name = self.cluster_name(components);
        let cluster_id = derive_id(&self.settings, &EntityKind::Cluster, &self.cluster_key(cluster_name))?;
        let mut cluster = CanonicalEntity::new(cluster_id.clone(), EntityKind::Cluster, cluster_name, PROVIDER);
        cluster.attributes = scalar_attributes(&components.overview, OVERVIEW_ATTRIBUTES);
        if components.cluster_name.is_none() {
            cluster.attributes.insert("synthesized".to_string(), true.into());
        }

        let mut entities = vec![cluster];

        for node in &components.nodes {
            let id = derive_id(
                &self.settings,
                &EntityKind::Broker,
                &self.member_key(cluster_name, &node.name),
            )?;
            let mut entity = CanonicalEntity::new(id, EntityKind::Broker, &node.name, PROVIDER)
                .with_parent(cluster_id.clone());
            entity.attributes = scalar_attributes(&node.raw, NODE_ATTRIBUTES);
            entity.attributes.insert("host".to_string(), node.host.as_str().into());
            entity.attributes.insert("port".to_string(), node.port.into());
            entities.push(entity);
        }

        for queue in &components.queues {
            let id = derive_id(&self.settings, &EntityKind::Queue, &self.queue_key(cluster_name, queue))?;
            let mut entity = CanonicalEntity::new(id, EntityKind::Queue, &queue.name, PROVIDER)
                .with_parent(cluster_id.clone());
            entity.attributes = scalar_attributes(&queue.raw, QUEUE_ATTRIBUTES);
            entity.attributes.insert("vhost".to_string(), queue.vhost.as_str().into());
            if let Some(node) = &queue.node {
                entity.attributes.insert("node".to_string(), node.as_str().into());
            }
            entities.push(entity);
        }

        Ok(entities)
    }

    fn extract_metrics(
        &self,
        components: &RabbitMqComponents,
        entities: &[CanonicalEntity],
    ) -> Result<Vec<MetricDataPoint>> {
        let by_id: HashMap<&str, &CanonicalEntity> =
            entities.iter().map(|e| (e.id.as_str(), e)).collect();
        let cluster_name = self.cluster_name(components);
        let at = components.observed_at;
        let mut metrics = Vec::new();

        let index = ClusterIndex::from_entities(entities);
        if let Some((_, cluster_id)) = index.get(cluster_name) {
            if let Some(cluster) = by_id.get(cluster_id.as_str()) {
                metrics.push(MetricDataPoint::for_entity(
                    cluster,
                    "rabbitmq.cluster.nodeCount",
                    components.nodes.len() as f64,
                    Some(at),
                ));
                metrics.push(MetricDataPoint::for_entity(
                    cluster,
                    "rabbitmq.cluster.queueCount",
                    components.queues.len() as f64,
                    Some(at),
                ));
            }
        }

        for node in &components.nodes {
            let id = derive_id(
                &self.settings,
                &EntityKind::Broker,
                &self.member_key(cluster_name, &node.name),
            )?;
            if let Some(entity) = by_id.get(id.as_str()) {
                metrics.extend(map_metrics(entity, &node.raw, NODE_METRICS, at));
            }
        }

        for queue in &components.queues {
            let id = derive_id(&self.settings, &EntityKind::Queue, &self.queue_key(cluster_name, queue))?;
            if let Some(entity) = by_id.get(id.as_str()) {
                metrics.extend(map_metrics(entity, &queue.raw, QUEUE_METRICS, at));
            }
        }

        Ok(metrics)
    }

    fn additional_relationships(
        &self,
        components: &RabbitMqComponents,
        entities: &[CanonicalEntity],
    ) -> Result<Vec<RelationshipEdge>> {
        let known: HashSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();
        let cluster_name = self.cluster_name(components);
        let mut edges = Vec::new();

        for queue in &components.queues {
            let Some(node) = &queue.node else {
                continue;
            };
            let queue_id = derive_id(&self.settings, &EntityKind::Queue, &self.queue_key(cluster_name, queue))?;
            let node_id = derive_id(
                &self.settings,
                &EntityKind::Broker,
                &self.member_key(cluster_name, node),
            )?;
            if known.contains(queue_id.as_str()) && known.contains(node_id.as_str()) {
                edges.push(RelationshipEdge::new(queue_id, node_id, RelationshipType::HostedOn));
            } else {
                debug!(queue = %queue.name, node = %node, "Queue on unknown node, edge dropped");
            }
        }

        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_host_from_node_name() {
        assert_eq!(RabbitMqAdapter::host_of("rabbit@mq-1"), "mq-1");
        assert_eq!(RabbitMqAdapter::host_of("standalone"), "standalone");
    }

    #[test]
    fn test_node_defaults() {
        let adapter = RabbitMqAdapter::new(ProviderSettings::default());
        let components = adapter
            .extract_components(&json!({"nodes": [{"name": "rabbit@mq-1"}, {"name": "rabbit@mq-1"}]}))
            .unwrap();
        assert_eq!(components.nodes.len(), 1);
        assert_eq!(components.nodes[0].host, "mq-1");
        assert_eq!(components.nodes[0].port, DEFAULT_AMQP_PORT);
    }

    #[test]
    fn test_queues_keyed_by_vhost() {
        let adapter = RabbitMqAdapter::new(ProviderSettings::default());
        let components = adapter
            .extract_components(&json!({"queues": [
                {"name": "jobs"},
                {"name": "jobs", "vhost": "staging"},
                {"name": "jobs", "vhost": "/"}
            ]}))
            .unwrap();
        assert_eq!(components.queues.len(), 2);
        assert_eq!(components.queues[0].vhost, "/");
    }
}
