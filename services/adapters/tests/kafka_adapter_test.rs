//! End-to-end behaviour of the Kafka adapter through the lifecycle wrapper

use adapter_service::{
    validate_result, KafkaAdapter, ManagedAdapter, ProviderSettings, TransformAdapter,
    ValidationMode,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use types::{AttributeValue, EntityKind, RelationshipType, TransformationResult};

async fn kafka() -> Arc<dyn TransformAdapter> {
    let adapter = ManagedAdapter::shared(KafkaAdapter::new(ProviderSettings::for_namespace("123456")));
    adapter.initialize().await.unwrap();
    adapter
}

fn metric(result: &TransformationResult, name: &str) -> Option<f64> {
    result.metrics.iter().find(|m| m.name == name).map(|m| m.value)
}

fn ids(result: &TransformationResult) -> BTreeSet<String> {
    result.entities.iter().map(|e| e.id.to_string()).collect()
}

#[tokio::test]
async fn test_single_broker_single_topic_scenario() {
    println!("🧪 Testing default cluster scenario");
    let adapter = kafka().await;
    let payload = json!({
        "brokers": [{"id": 0, "host": "10.0.0.1", "port": 9092}],
        "topics": [{"name": "t1", "partitionCount": 3}]
    });

    let result = adapter.transform(&payload).await.unwrap();

    let kinds: Vec<&EntityKind> = result.entities.iter().map(|e| &e.kind).collect();
    assert_eq!(kinds, vec![&EntityKind::Cluster, &EntityKind::Broker, &EntityKind::Topic]);
    assert_eq!(result.entities[0].name, "default");
    assert_eq!(result.entities[1].name, "broker-0");
    assert_eq!(result.entities[2].name, "t1");

    let cluster_id = &result.entities[0].id;
    assert_eq!(result.relationships.len(), 2);
    for (edge, child) in result.relationships.iter().zip(&result.entities[1..]) {
        assert_eq!(edge.relationship_type, RelationshipType::Contains);
        assert_eq!(&edge.source_id, cluster_id);
        assert_eq!(edge.target_id, child.id);
    }

    assert_eq!(metric(&result, "kafka.topic.partitionCount"), Some(3.0));
    assert_eq!(metric(&result, "kafka.cluster.brokerCount"), Some(1.0));
    assert_eq!(metric(&result, "kafka.cluster.topicCount"), Some(1.0));

    let report = validate_result(&result, ValidationMode::Strict);
    assert!(report.valid, "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    println!("✅ Scenario produced cluster, broker, topic and two CONTAINS edges");
}

#[tokio::test]
async fn test_default_cluster_is_synthesized_once() {
    let adapter = kafka().await;
    let payload = json!({
        "brokers": [{"id": 0}, {"id": 1}, {"id": 2}],
    });

    let result = adapter.transform(&payload).await.unwrap();
    let clusters: Vec<_> = result
        .entities
        .iter()
        .filter(|e| e.kind == EntityKind::Cluster)
        .collect();
    assert_eq!(clusters.len(), 1);
    assert!(result
        .entities
        .iter()
        .filter(|e| e.kind == EntityKind::Broker)
        .all(|b| b.parent_id.as_ref() == Some(&clusters[0].id)));
}

#[tokio::test]
async fn test_explicit_clusters_own_their_members() {
    let adapter = kafka().await;
    let payload = json!({
        "clusters": [{"name": "east"}, {"name": "west"}],
        "brokers": [
            {"id": 1, "clusterName": "east"},
            {"id": 1, "clusterName": "west"},
            {"id": 2}
        ],
    });

    let result = adapter.transform(&payload).await.unwrap();
    let east = result.entities.iter().find(|e| e.name == "east").unwrap();
    let west = result.entities.iter().find(|e| e.name == "west").unwrap();

    let brokers: Vec<_> = result
        .entities
        .iter()
        .filter(|e| e.kind == EntityKind::Broker)
        .collect();
    assert_eq!(brokers.len(), 3);
    // Same broker id in two clusters yields two distinct entities
    assert_ne!(brokers[0].id, brokers[1].id);
    assert_eq!(brokers[0].parent_id.as_ref(), Some(&east.id));
    assert_eq!(brokers[1].parent_id.as_ref(), Some(&west.id));
    // Unattributed members fall back to the first cluster
    assert_eq!(brokers[2].parent_id.as_ref(), Some(&east.id));
    assert!(result.entities.iter().all(|e| e.attribute("synthesized").is_none()));
}

#[tokio::test]
async fn test_members_deduplicated_after_cluster_resolution() {
    println!("🧪 Testing dedupe of members that name their cluster and members that do not");
    let adapter = kafka().await;
    let payload = json!({
        "clusters": [{"name": "prod"}],
        "brokers": [{"id": 0}, {"id": 0, "clusterName": "prod"}],
        "topics": [{"name": "t1", "clusterName": "prod"}, {"name": "t1"}],
    });

    let result = adapter.transform(&payload).await.unwrap();
    assert_eq!(result.entities.len(), 3);
    assert_eq!(ids(&result).len(), 3);
    assert_eq!(result.relationships.len(), 2);
    assert_eq!(metric(&result, "kafka.cluster.brokerCount"), Some(1.0));
    assert_eq!(metric(&result, "kafka.cluster.topicCount"), Some(1.0));

    let report = validate_result(&result, ValidationMode::Strict);
    assert!(
        report.warnings.iter().all(|w| !w.message.contains("duplicate")),
        "{:?}",
        report.warnings
    );
    println!("✅ One broker and one topic under prod");
}

#[tokio::test]
async fn test_undeclared_cluster_name_is_not_reassigned() {
    let adapter = kafka().await;
    let payload = json!({
        "clusters": [{"name": "prod"}],
        "brokers": [{"id": 7, "clusterName": "staging"}, {"id": 1}],
    });

    let result = adapter.transform(&payload).await.unwrap();
    let prod = result.entities.iter().find(|e| e.name == "prod").unwrap();
    let staging = result.entities.iter().find(|e| e.name == "staging").unwrap();
    assert_eq!(staging.kind, EntityKind::Cluster);
    assert_eq!(staging.attribute("synthesized"), Some(&AttributeValue::Bool(true)));
    assert!(prod.attribute("synthesized").is_none());

    let broker = |name: &str| result.entities.iter().find(|e| e.name == name).unwrap();
    assert_eq!(broker("broker-7").parent_id.as_ref(), Some(&staging.id));
    assert_eq!(
        broker("broker-7").attribute("clusterName").and_then(|v| v.as_str()),
        Some("staging")
    );
    assert_eq!(broker("broker-1").parent_id.as_ref(), Some(&prod.id));

    let report = validate_result(&result, ValidationMode::Strict);
    assert!(report.valid, "{:?}", report.errors);
}

#[tokio::test]
async fn test_missing_metric_fields_are_skipped_not_zeroed() {
    let adapter = kafka().await;
    let payload = json!({
        "brokers": [
            {"id": 0, "metrics": {"bytesInPerSecond": 0, "bytesOutPerSecond": "n/a"}},
            {"id": 1}
        ],
    });

    let result = adapter.transform(&payload).await.unwrap();
    let bytes_in: Vec<_> = result
        .metrics
        .iter()
        .filter(|m| m.name == "kafka.broker.bytesIn")
        .collect();
    assert_eq!(bytes_in.len(), 1);
    assert_eq!(bytes_in[0].value, 0.0);
    assert!(metric(&result, "kafka.broker.bytesOut").is_none());
    assert!(metric(&result, "kafka.broker.leaderCount").is_none());

    // Cluster sums only exist for fields some broker reported
    assert_eq!(metric(&result, "kafka.cluster.bytesIn"), Some(0.0));
    assert!(metric(&result, "kafka.cluster.bytesOut").is_none());
    assert!(metric(&result, "kafka.cluster.activeControllerCount").is_none());
}

#[tokio::test]
async fn test_cluster_aggregates() {
    let adapter = kafka().await;
    let payload = json!({
        "clusters": [{"name": "prod", "offlinePartitionsCount": 0}],
        "brokers": [
            {"id": 0, "isController": true, "bytesInPerSecond": 10.5, "underReplicatedPartitions": 1},
            {"id": 1, "isController": false, "bytesInPerSecond": 4.5, "underReplicatedPartitions": 2}
        ],
        "topics": [{"name": "a"}, {"name": "b"}, {"name": "a"}],
    });

    let result = adapter.transform(&payload).await.unwrap();
    assert_eq!(metric(&result, "kafka.cluster.brokerCount"), Some(2.0));
    assert_eq!(metric(&result, "kafka.cluster.topicCount"), Some(2.0));
    assert_eq!(metric(&result, "kafka.cluster.bytesIn"), Some(15.0));
    assert_eq!(metric(&result, "kafka.cluster.underReplicatedPartitions"), Some(3.0));
    assert_eq!(metric(&result, "kafka.cluster.activeControllerCount"), Some(1.0));
    assert_eq!(metric(&result, "kafka.cluster.offlinePartitionsCount"), Some(0.0));
}

#[tokio::test]
async fn test_consumer_lag_attaches_to_topic() {
    let adapter = kafka().await;
    let payload = json!({
        "topics": [{"name": "orders"}],
        "consumerGroups": [
            {"groupId": "billing", "topic": "orders", "lag": 42},
            {"groupId": "ghost", "topic": "missing", "lag": 7}
        ],
    });

    let result = adapter.transform(&payload).await.unwrap();
    let lags: Vec<_> = result
        .metrics
        .iter()
        .filter(|m| m.name == "kafka.topic.consumerLag")
        .collect();
    assert_eq!(lags.len(), 1);
    assert_eq!(lags[0].value, 42.0);
    assert_eq!(
        lags[0].attributes.get("consumerGroup").and_then(|v| v.as_str()),
        Some("billing")
    );
    let topic = result.entities.iter().find(|e| e.name == "orders").unwrap();
    assert_eq!(lags[0].entity_id(), Some(topic.id.as_str()));
    // Consumer groups never become entities
    assert_eq!(result.entities.len(), 2);
}

#[tokio::test]
async fn test_replica_placement_edges() {
    println!("🧪 Testing replica placement with mixed discovery sources");
    let adapter = kafka().await;
    let payload = json!({
        "brokers": [{"id": 0}, {"id": 1}, {"id": 2}],
        "topics": [{
            "name": "orders",
            "partitions": [
                {"id": 0, "leader": 0, "replicas": [0, 1], "source": "admin-api"},
                {"id": 0, "leader": 2, "replicas": [2, 1], "source": "jmx"},
                {"id": 1, "leader": 1, "replicas": [1, 0, 9], "source": "metric-api"}
            ]
        }],
    });

    let result = adapter.transform(&payload).await.unwrap();
    let broker_id = |n: &str| {
        result
            .entities
            .iter()
            .find(|e| e.name == format!("broker-{n}"))
            .map(|e| e.id.clone())
            .unwrap()
    };

    let placements: BTreeSet<(String, RelationshipType)> = result
        .relationships
        .iter()
        .filter(|e| e.relationship_type != RelationshipType::Contains)
        .map(|e| (e.target_id.to_string(), e.relationship_type))
        .collect();

    let expected: BTreeSet<(String, RelationshipType)> = [
        (broker_id("0").to_string(), RelationshipType::HostedOn),
        (broker_id("1").to_string(), RelationshipType::ReplicatedTo),
        (broker_id("1").to_string(), RelationshipType::HostedOn),
        (broker_id("0").to_string(), RelationshipType::ReplicatedTo),
    ]
    .into_iter()
    .collect();
    assert_eq!(placements, expected);

    // The jmx observation of partition 0 lost to admin-api, so broker 2 hosts nothing
    assert!(!placements.iter().any(|(id, _)| *id == broker_id("2").to_string()));

    let report = validate_result(&result, ValidationMode::Strict);
    assert!(
        report.errors.iter().all(|e| !e.message.contains("unknown entity")),
        "{:?}",
        report.errors
    );
    println!("✅ Placement edges deduplicated and referentially intact");
}

#[tokio::test]
async fn test_malformed_input_fails_without_partial_result() {
    let adapter = kafka().await;

    let no_sources = adapter.transform(&json!({"unrelated": []})).await.unwrap_err();
    assert!(no_sources.is_input_error());

    let bad_shape = adapter.transform(&json!({"brokers": {"id": 0}})).await.unwrap_err();
    assert!(bad_shape.is_input_error());

    let missing_id = adapter
        .transform(&json!({"brokers": [{"host": "h"}]}))
        .await
        .unwrap_err();
    assert!(missing_id.is_input_error());
    assert!(!missing_id.is_retryable());

    let health = adapter.health();
    assert_eq!(health.failures, 3);
    assert_eq!(health.entities_emitted, 0);
}

fn arb_payload() -> impl Strategy<Value = Value> {
    (
        prop::collection::vec(0u16..50, 0..6),
        prop::collection::vec("[a-z]{1,8}", 0..6),
    )
        .prop_filter("needs a broker or topic", |(b, t)| !b.is_empty() || !t.is_empty())
        .prop_map(|(brokers, topics)| {
            json!({
                "brokers": brokers.iter().map(|id| json!({"id": id, "host": "h", "port": 9092})).collect::<Vec<_>>(),
                "topics": topics.iter().map(|name| json!({"name": name})).collect::<Vec<_>>(),
            })
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_transform_is_deterministic(payload in arb_payload()) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (first, second) = runtime.block_on(async {
            let adapter = kafka().await;
            let first = adapter.transform(&payload).await.unwrap();
            let second = adapter.transform(&payload).await.unwrap();
            (first, second)
        });

        prop_assert_eq!(ids(&first), ids(&second));

        let known = ids(&first);
        for edge in &first.relationships {
            prop_assert!(known.contains(edge.source_id.as_str()));
            prop_assert!(known.contains(edge.target_id.as_str()));
        }
    }
}
