//! Canonical entities and their scalar attributes

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::identifiers::EntityId;

/// Kind of infrastructure resource an entity describes.
///
/// The built-in set is closed; deployments may add well-formed kinds through
/// `Custom`, which the validator reports as a warning (or an error in strict mode).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// Broker cluster, the root of the containment tree
    Cluster,
    /// Broker or node process
    Broker,
    /// Kafka-style topic
    Topic,
    /// AMQP-style queue
    Queue,
    /// Deployment-specific kind, stored upper-case
    Custom(String),
}

impl EntityKind {
    /// Kinds every deployment understands
    pub const BUILT_IN: [EntityKind; 4] = [
        EntityKind::Cluster,
        EntityKind::Broker,
        EntityKind::Topic,
        EntityKind::Queue,
    ];

    /// Upper-case wire name
    pub fn as_str(&self) -> &str {
        match self {
            EntityKind::Cluster => "CLUSTER",
            EntityKind::Broker => "BROKER",
            EntityKind::Topic => "TOPIC",
            EntityKind::Queue => "QUEUE",
            EntityKind::Custom(name) => name,
        }
    }

    /// Parse a wire name; unknown names become `Custom`
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "CLUSTER" => EntityKind::Cluster,
            "BROKER" => EntityKind::Broker,
            "TOPIC" => EntityKind::Topic,
            "QUEUE" => EntityKind::Queue,
            other => EntityKind::Custom(other.to_string()),
        }
    }

    /// Whether this is one of the closed built-in kinds
    pub fn is_built_in(&self) -> bool {
        !matches!(self, EntityKind::Custom(_))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EntityKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntityKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(EntityKind::from_name(&name))
    }
}

/// Scalar attribute value attached to entities, metrics and edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
}

impl AttributeValue {
    /// Convert a JSON scalar; arrays, objects and null have no scalar form
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(AttributeValue::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(AttributeValue::Int)
                .or_else(|| n.as_f64().map(AttributeValue::Float)),
            serde_json::Value::String(s) => Some(AttributeValue::Text(s.clone())),
            _ => None,
        }
    }

    /// Numeric view of the value, if any
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text view of the value, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Ordered attribute map so serialized output is stable
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Normalized, backend-agnostic description of one discovered resource.
///
/// Entities are created fresh on every transformation and never mutated once
/// a result has been returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalEntity {
    /// Stable identifier
    pub id: EntityId,
    /// Resource kind
    pub kind: EntityKind,
    /// Human readable name
    pub name: String,
    /// Provider that produced the entity
    pub provider: String,
    /// Owning entity, e.g. a broker's cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,
    /// Scalar metadata
    #[serde(default)]
    pub attributes: Attributes,
}

impl CanonicalEntity {
    /// Entity without parent or attributes
    pub fn new(
        id: EntityId,
        kind: EntityKind,
        name: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            provider: provider.into(),
            parent_id: None,
            attributes: Attributes::new(),
        }
    }

    /// Set the owning entity
    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    /// Add one attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}
