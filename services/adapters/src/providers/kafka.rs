//! # Kafka Adapter
//!
//! Normalizes Kafka cluster discovery payloads (admin API, metric API or JMX
//! scrapes) into CLUSTER, BROKER and TOPIC entities.
//!
//! ## Payload Shape
//!
//! ```json
//! {
//!   "clusters": [{"name": "prod"}],
//!   "brokers": [{"id": 0, "host": "10.0.0.1", "port": 9092, "metrics": {"bytesInPerSecond": 12.5}}],
//!   "topics": [{"name": "orders", "partitionCount": 3,
//!               "partitions": [{"id": 0, "leader": 0, "replicas": [0, 1], "source": "admin-api"}]}],
//!   "consumerGroups": [{"groupId": "billing", "topic": "orders", "lag": 42}]
//! }
//! ```
//!
//! ## Output
//!
//! - one default cluster is synthesized when brokers or topics arrive without one;
//!   a cluster a member names but the payload never declares is synthesized too
//! - broker, topic and cluster metrics from static mapping tables
//! - cluster aggregates: broker and topic counts, throughput and
//!   under-replication sums, active controller count
//! - `kafka.topic.consumerLag` per consumer group
//! - `HOSTED_ON` (topic to leader) and `REPLICATED_TO` (topic to followers)
//!   edges from partition placement, deduplicated by source priority

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};
use types::{
    AttributeValue, CanonicalEntity, EntityKind, MetricDataPoint, RelationshipEdge,
    RelationshipType,
};

use super::{derive_id, ClusterIndex};
use crate::common::Adapter;
use crate::config::ProviderSettings;
use crate::parsing_utils::{
    array_field, bool_field, i64_field, map_metrics, metric_value,
    payload_timestamp, scalar_attributes, scalar_to_string, string_field, MetricTable,
};
use crate::validation::{CollectionRule, CollectionShape, InputSchema};
use crate::{AdapterError, Result};

/// Provider name
pub const PROVIDER: &str = "kafka";

/// Recognised data sources
pub static INPUT_SCHEMA: InputSchema = InputSchema {
    provider: PROVIDER,
    collections: &[
        CollectionRule {
            key: "clusters",
            shape: CollectionShape::Array,
            required_fields: &["name|clusterName"],
            optional_fields: &[],
        },
        CollectionRule {
            key: "cluster",
            shape: CollectionShape::Object,
            required_fields: &["name|clusterName"],
            optional_fields: &[],
        },
        CollectionRule {
            key: "brokers",
            shape: CollectionShape::Array,
            required_fields: &["id|brokerId"],
            optional_fields: &["host", "port"],
        },
        CollectionRule {
            key: "topics",
            shape: CollectionShape::Array,
            required_fields: &["name|topicName"],
            optional_fields: &["partitionCount"],
        },
        CollectionRule {
            key: "consumerGroups",
            shape: CollectionShape::Array,
            required_fields: &["groupId"],
            optional_fields: &["lag"],
        },
    ],
};

/// Broker field -> canonical metric
pub const BROKER_METRICS: MetricTable = &[
    ("bytesInPerSecond", "kafka.broker.bytesIn"),
    ("bytesOutPerSecond", "kafka.broker.bytesOut"),
    ("messagesInPerSecond", "kafka.broker.messagesIn"),
    ("bytesRejectedPerSecond", "kafka.broker.bytesRejected"),
    ("underReplicatedPartitions", "kafka.broker.underReplicatedPartitions"),
    ("partitionCount", "kafka.broker.partitionCount"),
    ("leaderCount", "kafka.broker.leaderCount"),
    ("isrShrinksPerSecond", "kafka.broker.isrShrinks"),
    ("isrExpandsPerSecond", "kafka.broker.isrExpands"),
    ("requestHandlerAvgIdlePercent", "kafka.broker.requestHandlerIdlePercent"),
    ("networkProcessorAvgIdlePercent", "kafka.broker.networkProcessorIdlePercent"),
    ("produceThrottleTimeMs", "kafka.broker.produceThrottleTime"),
    ("fetchThrottleTimeMs", "kafka.broker.fetchThrottleTime"),
];

/// Topic field -> canonical metric
pub const TOPIC_METRICS: MetricTable = &[
    ("bytesInPerSecond", "kafka.topic.bytesIn"),
    ("bytesOutPerSecond", "kafka.topic.bytesOut"),
    ("messagesInPerSecond", "kafka.topic.messagesIn"),
    ("bytesRejectedPerSecond", "kafka.topic.bytesRejected"),
    ("partitionCount", "kafka.topic.partitionCount"),
    ("replicationFactor", "kafka.topic.replicationFactor"),
    ("minInSyncReplicas", "kafka.topic.minInSyncReplicas"),
    ("underReplicatedPartitions", "kafka.topic.underReplicatedPartitions"),
    ("sizeInBytes", "kafka.topic.sizeInBytes"),
];

/// Cluster field -> canonical metric
pub const CLUSTER_METRICS: MetricTable = &[
    ("offlinePartitionsCount", "kafka.cluster.offlinePartitionsCount"),
    ("partitionCount", "kafka.cluster.partitionCount"),
    ("underMinIsrPartitionCount", "kafka.cluster.underMinIsrPartitionCount"),
];

/// Broker fields summed into cluster aggregates when at least one broker reports them
const CLUSTER_SUMS: MetricTable = &[
    ("bytesInPerSecond", "kafka.cluster.bytesIn"),
    ("bytesOutPerSecond", "kafka.cluster.bytesOut"),
    ("underReplicatedPartitions", "kafka.cluster.underReplicatedPartitions"),
];

const CLUSTER_ATTRIBUTES: &[&str] = &["clusterArn", "kafkaVersion", "region", "state"];
const BROKER_ATTRIBUTES: &[&str] = &["rack"];
const TOPIC_ATTRIBUTES: &[&str] = &["partitionCount", "replicationFactor", "retentionMs", "cleanupPolicy"];

// ============================================================================
// COMPONENTS
// ============================================================================

/// Intermediate form of a Kafka payload
#[derive(Debug, Clone, Default)]
pub struct KafkaComponents {
    /// Explicit clusters, deduplicated by name
    pub clusters: Vec<ClusterRecord>,
    /// Brokers, deduplicated by (resolved cluster, id)
    pub brokers: Vec<BrokerRecord>,
    /// Topics, deduplicated by (resolved cluster, name) with partitions merged
    pub topics: Vec<TopicRecord>,
    /// Consumer-group lag observations
    pub consumer_groups: Vec<ConsumerGroupRecord>,
    /// Observation time applied to every metric
    pub observed_at: i64,
}

/// Declared, referenced or default cluster
#[derive(Debug, Clone)]
pub struct ClusterRecord {
    /// Cluster name
    pub name: String,
    /// Source object, `Null` when the cluster was not declared
    pub raw: Value,
    /// Created because a member needed it rather than declared by the payload
    pub synthesized: bool,
}

/// Broker observation
#[derive(Debug, Clone)]
pub struct BrokerRecord {
    /// Broker id as text
    pub id: String,
    /// Advertised host
    pub host: Option<String>,
    /// Advertised port
    pub port: Option<i64>,
    /// Owning cluster name after resolution
    pub cluster: String,
    /// Whether the broker reported itself as controller
    pub is_controller: Option<bool>,
    /// Source object
    pub raw: Value,
}

/// Topic observation
#[derive(Debug, Clone)]
pub struct TopicRecord {
    /// Topic name
    pub name: String,
    /// Owning cluster name after resolution
    pub cluster: String,
    /// Partition placement, one entry per partition id
    pub partitions: Vec<PartitionObservation>,
    /// Source object
    pub raw: Value,
}

/// Placement of one partition as seen by one discovery source
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionObservation {
    /// Partition number
    pub id: i64,
    /// Leader broker id
    pub leader: Option<String>,
    /// Replica broker ids, leader included
    pub replicas: Vec<String>,
    /// Discovery source, e.g. `admin-api`
    pub source: String,
}

/// Lag of one consumer group
#[derive(Debug, Clone)]
pub struct ConsumerGroupRecord {
    /// Group id
    pub group_id: String,
    /// Cluster the group reads from after resolution
    pub cluster: String,
    /// `(topic, lag)` pairs
    pub lags: Vec<(String, f64)>,
}

// ============================================================================
// ADAPTER
// ============================================================================

/// Kafka provider adapter
pub struct KafkaAdapter {
    settings: ProviderSettings,
}

impl KafkaAdapter {
    /// Adapter using `settings` for identifiers
    pub fn new(settings: ProviderSettings) -> Self {
        Self { settings }
    }

    fn cluster_key(&self, cluster: &str) -> String {
        format!("{PROVIDER}:{cluster}:{}", self.settings.namespace)
    }

    fn member_key(&self, cluster: &str, member: &str) -> String {
        format!("{PROVIDER}:{cluster}:{}:{member}", self.settings.namespace)
    }

    /// Cluster a broker or topic belongs to.
    ///
    /// A named cluster the payload never declared is synthesized under that
    /// name. An unnamed member joins the first declared cluster, or the
    /// default cluster when none was declared.
    fn assign_cluster(
        &self,
        clusters: &mut Vec<ClusterRecord>,
        declared: usize,
        requested: Option<String>,
    ) -> String {
        let name = match requested {
            Some(name) => {
                if declared > 0 && !clusters.iter().any(|c| c.name == name) {
                    warn!(cluster = %name, "Member references an undeclared cluster, synthesizing it");
                }
                name
            }
            None => match clusters[..declared].first() {
                Some(first) => first.name.clone(),
                None => self.settings.default_cluster_name.clone(),
            },
        };
        if !clusters.iter().any(|c| c.name == name) {
            debug!(cluster = %name, "Synthesizing cluster");
            clusters.push(ClusterRecord {
                name: name.clone(),
                raw: Value::Null,
                synthesized: true,
            });
        }
        name
    }

    /// Same rules as [`Self::assign_cluster`] without creating clusters
    fn lookup_cluster(&self, clusters: &[ClusterRecord], declared: usize, requested: Option<String>) -> String {
        requested
            .or_else(|| clusters[..declared].first().map(|c| c.name.clone()))
            .unwrap_or_else(|| self.settings.default_cluster_name.clone())
    }

    fn parse_partition(item: &Value) -> Option<PartitionObservation> {
        let id = i64_field(item, "id").or_else(|| i64_field(item, "partition"))?;
        let replicas = array_field(item, "replicas")
            .map(|values| values.iter().filter_map(scalar_to_string).collect())
            .unwrap_or_default();
        Some(PartitionObservation {
            id,
            leader: string_field(item, &["leader"]),
            replicas,
            source: string_field(item, &["source"]).unwrap_or_else(|| "unknown".to_string()),
        })
    }

    /// Keep one observation per partition id: highest source priority wins,
    /// ties keep the earlier observation
    fn merge_partitions(&self, target: &mut Vec<PartitionObservation>, incoming: Vec<PartitionObservation>) {
        for observation in incoming {
            match target.iter_mut().find(|p| p.id == observation.id) {
                Some(existing) => {
                    if self.source_priority(&observation.source) > self.source_priority(&existing.source) {
                        debug!(
                            partition = observation.id,
                            kept = %observation.source,
                            replaced = %existing.source,
                            "Preferring more reliable partition source"
                        );
                        *existing = observation;
                    }
                }
                None => target.push(observation),
            }
        }
    }

    fn consumer_lags(item: &Value) -> Vec<(String, f64)> {
        let group_lag = metric_value(item, "lag");
        let mut lags = Vec::new();

        if let Some(topic) = string_field(item, &["topic"]) {
            if let Some(lag) = group_lag {
                lags.push((topic, lag));
            }
        }

        for entry in array_field(item, "topics").into_iter().flatten() {
            match entry {
                Value::String(topic) => {
                    if let Some(lag) = group_lag {
                        lags.push((topic.clone(), lag));
                    }
                }
                Value::Object(_) => {
                    let topic = string_field(entry, &["name", "topic"]);
                    let lag = metric_value(entry, "lag").or(group_lag);
                    if let (Some(topic), Some(lag)) = (topic, lag) {
                        lags.push((topic, lag));
                    }
                }
                _ => {}
            }
        }

        lags
    }
}

#[async_trait]
impl Adapter for KafkaAdapter {
    type Components = KafkaComponents;

    fn provider(&self) -> &str {
        PROVIDER
    }

    fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    fn input_schema(&self) -> &'static InputSchema {
        &INPUT_SCHEMA
    }

    async fn initialize(&self) -> Result<()> {
        self.settings
            .validate()
            .map_err(|reason| AdapterError::Initialization {
                provider: PROVIDER.to_string(),
                reason,
            })?;
        // Probe identifier derivation so bad settings fail here, not mid-transform
        derive_id(
            &self.settings,
            &EntityKind::Cluster,
            &self.cluster_key(&self.settings.default_cluster_name),
        )?;
        info!(
            provider = PROVIDER,
            namespace = %self.settings.namespace,
            "Kafka adapter ready"
        );
        Ok(())
    }

    fn extract_components(&self, payload: &Value) -> Result<KafkaComponents> {
        let mut components = KafkaComponents {
            observed_at: payload_timestamp(payload).unwrap_or_else(types::now_millis),
            ..Default::default()
        };

        let mut cluster_items: Vec<&Value> = array_field(payload, "clusters")
            .map(|items| items.iter().collect())
            .unwrap_or_default();
        if let Some(cluster) = payload.get("cluster").filter(|v| v.is_object()) {
            cluster_items.push(cluster);
        }
        for item in cluster_items {
            let name = string_field(item, &["name", "clusterName"])
                .ok_or_else(|| AdapterError::MissingField {
                    field: "clusters[].name".to_string(),
                })?;
            if !components.clusters.iter().any(|c| c.name == name) {
                components.clusters.push(ClusterRecord {
                    name,
                    raw: item.clone(),
                    synthesized: false,
                });
            }
        }
        if components.clusters.is_empty() {
            if let Some(name) = string_field(payload, &["clusterName"]) {
                components.clusters.push(ClusterRecord {
                    name,
                    raw: Value::Null,
                    synthesized: false,
                });
            }
        }
        let declared = components.clusters.len();

        for item in array_field(payload, "brokers").into_iter().flatten() {
            let id = string_field(item, &["id", "brokerId"]).ok_or_else(|| AdapterError::MissingField {
                field: "brokers[].id".to_string(),
            })?;
            let cluster = self.assign_cluster(
                &mut components.clusters,
                declared,
                string_field(item, &["clusterName", "cluster"]),
            );
            if components
                .brokers
                .iter()
                .any(|b| b.id == id && b.cluster == cluster)
            {
                debug!(broker = %id, "Skipping duplicate broker observation");
                continue;
            }
            components.brokers.push(BrokerRecord {
                id,
                host: string_field(item, &["host"]),
                port: i64_field(item, "port"),
                cluster,
                is_controller: bool_field(item, "isController"),
                raw: item.clone(),
            });
        }

        for item in array_field(payload, "topics").into_iter().flatten() {
            let name = string_field(item, &["name", "topicName"]).ok_or_else(|| AdapterError::MissingField {
                field: "topics[].name".to_string(),
            })?;
            let cluster = self.assign_cluster(
                &mut components.clusters,
                declared,
                string_field(item, &["clusterName", "cluster"]),
            );
            let partitions: Vec<PartitionObservation> = array_field(item, "partitions")
                .map(|items| items.iter().filter_map(Self::parse_partition).collect())
                .unwrap_or_default();

            match components
                .topics
                .iter_mut()
                .find(|t| t.name == name && t.cluster == cluster)
            {
                Some(existing) => self.merge_partitions(&mut existing.partitions, partitions),
                None => {
                    let mut merged = Vec::new();
                    self.merge_partitions(&mut merged, partitions);
                    components.topics.push(TopicRecord {
                        name,
                        cluster,
                        partitions: merged,
                        raw: item.clone(),
                    });
                }
            }
        }

        for item in array_field(payload, "consumerGroups").into_iter().flatten() {
            let Some(group_id) = string_field(item, &["groupId"]) else {
                continue;
            };
            components.consumer_groups.push(ConsumerGroupRecord {
                group_id,
                cluster: self.lookup_cluster(
                    &components.clusters,
                    declared,
                    string_field(item, &["clusterName", "cluster"]),
                ),
                lags: Self::consumer_lags(item),
            });
        }

        Ok(components)
    }

    fn map_to_entities(&self, components: &KafkaComponents) -> Result<Vec<CanonicalEntity>> {
        let mut entities = Vec::new();

        for cluster in &components.clusters {
            let id = derive_id(&self.settings, &EntityKind::Cluster, &self.cluster_key(&cluster.name))?;
            let mut entity = CanonicalEntity::new(id, EntityKind::Cluster, &cluster.name, PROVIDER);
            entity.attributes = scalar_attributes(&cluster.raw, CLUSTER_ATTRIBUTES);
            if cluster.synthesized {
                entity.attributes.insert("synthesized".to_string(), true.into());
            }
            entities.push(entity);
        }

        let index = ClusterIndex::from_entities(&entities);
        let mut members = Vec::new();

        for broker in &components.brokers {
            let Some((cluster_name, cluster_id)) = index.get(broker.cluster.as_str()) else {
                continue;
            };
            let id = derive_id(
                &self.settings,
                &EntityKind::Broker,
                &self.member_key(cluster_name, &broker.id),
            )?;
            let mut entity = CanonicalEntity::new(id, EntityKind::Broker, format!("broker-{}", broker.id), PROVIDER)
                .with_parent(cluster_id.clone());
            entity.attributes = scalar_attributes(&broker.raw, BROKER_ATTRIBUTES);
            entity.attributes.insert(
                "brokerId".to_string(),
                broker
                    .id
                    .parse::<i64>()
                    .map(AttributeValue::Int)
                    .unwrap_or_else(|_| AttributeValue::Text(broker.id.clone())),
            );
            entity
                .attributes
                .insert("clusterName".to_string(), cluster_name.as_str().into());
            if let Some(host) = &broker.host {
                entity.attributes.insert("host".to_string(), host.as_str().into());
            }
            if let Some(port) = broker.port {
                entity.attributes.insert("port".to_string(), port.into());
            }
            if let Some(is_controller) = broker.is_controller {
                entity
                    .attributes
                    .insert("isController".to_string(), is_controller.into());
            }
            members.push(entity);
        }

        for topic in &components.topics {
            let Some((cluster_name, cluster_id)) = index.get(topic.cluster.as_str()) else {
                continue;
            };
            let id = derive_id(
                &self.settings,
                &EntityKind::Topic,
                &self.member_key(cluster_name, &topic.name),
            )?;
            let mut entity = CanonicalEntity::new(id, EntityKind::Topic, &topic.name, PROVIDER)
                .with_parent(cluster_id.clone());
            entity.attributes = scalar_attributes(&topic.raw, TOPIC_ATTRIBUTES);
            entity
                .attributes
                .insert("clusterName".to_string(), cluster_name.as_str().into());
            members.push(entity);
        }

        entities.extend(members);
        Ok(entities)
    }

    fn extract_metrics(
        &self,
        components: &KafkaComponents,
        entities: &[CanonicalEntity],
    ) -> Result<Vec<MetricDataPoint>> {
        let by_id: HashMap<&str, &CanonicalEntity> =
            entities.iter().map(|e| (e.id.as_str(), e)).collect();
        let index = ClusterIndex::from_entities(entities);
        let at = components.observed_at;
        let mut metrics = Vec::new();

        for cluster in &components.clusters {
            let id = derive_id(&self.settings, &EntityKind::Cluster, &self.cluster_key(&cluster.name))?;
            if let Some(entity) = by_id.get(id.as_str()) {
                metrics.extend(map_metrics(entity, &cluster.raw, CLUSTER_METRICS, at));
            }
        }

        // Per-cluster aggregates
        for (cluster_name, cluster_id) in index.iter() {
            let Some(cluster_entity) = by_id.get(cluster_id.as_str()) else {
                continue;
            };
            let brokers: Vec<&BrokerRecord> = components
                .brokers
                .iter()
                .filter(|b| b.cluster == *cluster_name)
                .collect();
            let topic_count = components
                .topics
                .iter()
                .filter(|t| t.cluster == *cluster_name)
                .count();

            metrics.push(MetricDataPoint::for_entity(
                cluster_entity,
                "kafka.cluster.brokerCount",
                brokers.len() as f64,
                Some(at),
            ));
            metrics.push(MetricDataPoint::for_entity(
                cluster_entity,
                "kafka.cluster.topicCount",
                topic_count as f64,
                Some(at),
            ));

            for (field, metric_name) in CLUSTER_SUMS {
                let reported: Vec<f64> = brokers
                    .iter()
                    .filter_map(|b| metric_value(&b.raw, field))
                    .collect();
                if !reported.is_empty() {
                    metrics.push(MetricDataPoint::for_entity(
                        cluster_entity,
                        *metric_name,
                        reported.iter().sum(),
                        Some(at),
                    ));
                }
            }

            let controllers: Vec<bool> = brokers.iter().filter_map(|b| b.is_controller).collect();
            if !controllers.is_empty() {
                let active = controllers.iter().filter(|c| **c).count();
                metrics.push(MetricDataPoint::for_entity(
                    cluster_entity,
                    "kafka.cluster.activeControllerCount",
                    active as f64,
                    Some(at),
                ));
            }

            debug!(cluster = %cluster_name, brokers = brokers.len(), topics = topic_count, "Aggregated cluster metrics");
        }

        for broker in &components.brokers {
            let Some((cluster_name, _)) = index.get(broker.cluster.as_str()) else {
                continue;
            };
            let id = derive_id(
                &self.settings,
                &EntityKind::Broker,
                &self.member_key(cluster_name, &broker.id),
            )?;
            if let Some(entity) = by_id.get(id.as_str()) {
                metrics.extend(map_metrics(entity, &broker.raw, BROKER_METRICS, at));
            }
        }

        for topic in &components.topics {
            let Some((cluster_name, _)) = index.get(topic.cluster.as_str()) else {
                continue;
            };
            let id = derive_id(
                &self.settings,
                &EntityKind::Topic,
                &self.member_key(cluster_name, &topic.name),
            )?;
            if let Some(entity) = by_id.get(id.as_str()) {
                metrics.extend(map_metrics(entity, &topic.raw, TOPIC_METRICS, at));
            }
        }

        for group in &components.consumer_groups {
            let Some((cluster_name, _)) = index.get(group.cluster.as_str()) else {
                continue;
            };
            for (topic, lag) in &group.lags {
                let id = derive_id(
                    &self.settings,
                    &EntityKind::Topic,
                    &self.member_key(cluster_name, topic),
                )?;
                match by_id.get(id.as_str()) {
                    Some(entity) => metrics.push(
                        MetricDataPoint::for_entity(entity, "kafka.topic.consumerLag", *lag, Some(at))
                            .with_attribute("consumerGroup", group.group_id.as_str()),
                    ),
                    None => debug!(group = %group.group_id, topic = %topic, "Consumer lag for unknown topic dropped"),
                }
            }
        }

        Ok(metrics)
    }

    fn additional_relationships(
        &self,
        components: &KafkaComponents,
        entities: &[CanonicalEntity],
    ) -> Result<Vec<RelationshipEdge>> {
        let known: HashSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();
        let index = ClusterIndex::from_entities(entities);
        let mut edges = Vec::new();

        for topic in &components.topics {
            let Some((cluster_name, _)) = index.get(topic.cluster.as_str()) else {
                continue;
            };
            let topic_id = derive_id(
                &self.settings,
                &EntityKind::Topic,
                &self.member_key(cluster_name, &topic.name),
            )?;
            if !known.contains(topic_id.as_str()) {
                continue;
            }

            let mut emitted: HashSet<(String, RelationshipType)> = HashSet::new();
            for partition in &topic.partitions {
                let placements = partition
                    .leader
                    .iter()
                    .map(|leader| (leader, RelationshipType::HostedOn))
                    .chain(
                        partition
                            .replicas
                            .iter()
                            .filter(|replica| partition.leader.as_ref() != Some(*replica))
                            .map(|replica| (replica, RelationshipType::ReplicatedTo)),
                    );

                for (broker, relationship_type) in placements {
                    let broker_id = derive_id(
                        &self.settings,
                        &EntityKind::Broker,
                        &self.member_key(cluster_name, broker),
                    )?;
                    if !known.contains(broker_id.as_str()) {
                        debug!(topic = %topic.name, broker = %broker, "Placement on unknown broker dropped");
                        continue;
                    }
                    if emitted.insert((broker_id.to_string(), relationship_type)) {
                        edges.push(
                            RelationshipEdge::new(topic_id.clone(), broker_id, relationship_type)
                                .with_metadata("source", partition.source.as_str()),
                        );
                    }
                }
            }
        }

        Ok(edges)
    }

    fn source_priority(&self, source: &str) -> u8 {
        match source {
            "admin-api" => 3,
            "metric-api" => 2,
            "jmx" => 1,
            _ => 0,
        }
    }
}
