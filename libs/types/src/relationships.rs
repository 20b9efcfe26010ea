//! Relationship edges between canonical entities

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entities::{AttributeValue, Attributes};
use crate::identifiers::EntityId;

/// Edge type between two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    /// Cluster owns a broker, topic or queue
    Contains,
    /// Topic or queue is served by a broker
    HostedOn,
    /// Topic has a follower replica on a broker
    ReplicatedTo,
    /// Generic network connection
    ConnectedTo,
    /// Producer writes to a topic or queue
    ProducesTo,
    /// Consumer reads from a topic or queue
    ConsumesFrom,
}

impl RelationshipType {
    /// Every edge type
    pub const ALL: [RelationshipType; 6] = [
        RelationshipType::Contains,
        RelationshipType::HostedOn,
        RelationshipType::ReplicatedTo,
        RelationshipType::ConnectedTo,
        RelationshipType::ProducesTo,
        RelationshipType::ConsumesFrom,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Contains => "CONTAINS",
            RelationshipType::HostedOn => "HOSTED_ON",
            RelationshipType::ReplicatedTo => "REPLICATED_TO",
            RelationshipType::ConnectedTo => "CONNECTED_TO",
            RelationshipType::ProducesTo => "PRODUCES_TO",
            RelationshipType::ConsumesFrom => "CONSUMES_FROM",
        }
    }

    /// Parse a wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed edge `source -> target`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipEdge {
    /// Edge origin
    pub source_id: EntityId,
    /// Edge destination
    pub target_id: EntityId,
    /// Edge type
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    /// Optional edge metadata
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub metadata: Attributes,
}

impl RelationshipEdge {
    /// Edge without metadata
    pub fn new(source_id: EntityId, target_id: EntityId, relationship_type: RelationshipType) -> Self {
        Self {
            source_id,
            target_id,
            relationship_type,
            metadata: Attributes::new(),
        }
    }

    /// `CONTAINS` edge from parent to child
    pub fn contains(parent: EntityId, child: EntityId) -> Self {
        Self::new(parent, child, RelationshipType::Contains)
    }

    /// Add one metadata field
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_wire_format() {
        let edge = RelationshipEdge::new(
            EntityId::parse("1|INFRA|TOPIC|dA").unwrap(),
            EntityId::parse("1|INFRA|BROKER|MA").unwrap(),
            RelationshipType::ReplicatedTo,
        );
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["type"], "REPLICATED_TO");
        assert_eq!(json["sourceId"], "1|INFRA|TOPIC|dA");
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn test_type_names() {
        for t in RelationshipType::ALL {
            assert_eq!(RelationshipType::from_name(t.as_str()), Some(t));
        }
        assert_eq!(RelationshipType::from_name("OWNS"), None);
    }
}
