//! # Entity Identifiers
//!
//! Resource identifiers have the bit-exact shape
//! `<namespace>|<domain>|<entity-kind>|<local-name>`. All four segments are
//! mandatory and the whole string must match [`ENTITY_ID_PATTERN`].
//!
//! Adapters never format identifiers by hand. [`EntityId::derive`] encodes the
//! natural key (for example `prod-cluster:123456:broker-1`) as URL-safe,
//! unpadded base64 so the local-name segment always stays inside the allowed
//! character set, and the same natural key always yields the same identifier.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::EntityKind;

/// Regex every well-formed entity identifier matches
pub const ENTITY_ID_PATTERN: &str = r"^[A-Za-z0-9]+\|[A-Z_]+\|[A-Z_]+\|[A-Za-z0-9\-._]+$";

static ENTITY_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    // The pattern is a compile-time constant
    Regex::new(ENTITY_ID_PATTERN).unwrap_or_else(|_| unreachable!("invalid ENTITY_ID_PATTERN"))
});

static DOMAIN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z_]+$").unwrap_or_else(|_| unreachable!("invalid domain regex")));

/// Errors raised while deriving or parsing identifiers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Namespace segment is empty or not alphanumeric
    #[error("invalid namespace '{0}': must be non-empty and alphanumeric")]
    InvalidNamespace(String),

    /// Domain segment is not upper-case letters and underscores
    #[error("invalid domain '{0}': must match [A-Z_]+")]
    InvalidDomain(String),

    /// Natural key used to derive the local name was empty
    #[error("natural key must not be empty")]
    EmptyNaturalKey,

    /// String does not match the identifier pattern
    #[error("malformed entity id '{0}'")]
    Malformed(String),
}

/// Validated `<namespace>|<domain>|<entity-kind>|<local-name>` identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Derive a stable identifier from its parts.
    ///
    /// The local name is the URL-safe unpadded base64 of `natural_key`, so the
    /// result is a pure function of its inputs.
    pub fn derive(
        namespace: &str,
        domain: &str,
        kind: &EntityKind,
        natural_key: &str,
    ) -> Result<Self, IdentifierError> {
        if namespace.is_empty() || !namespace.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(IdentifierError::InvalidNamespace(namespace.to_string()));
        }
        if !DOMAIN_REGEX.is_match(domain) {
            return Err(IdentifierError::InvalidDomain(domain.to_string()));
        }
        if natural_key.is_empty() {
            return Err(IdentifierError::EmptyNaturalKey);
        }

        let local_name = URL_SAFE_NO_PAD.encode(natural_key.as_bytes());
        Self::parse(&format!(
            "{namespace}|{domain}|{}|{local_name}",
            kind.as_str()
        ))
    }

    /// Validate an arbitrary string against [`ENTITY_ID_PATTERN`]
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        if Self::is_well_formed(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(IdentifierError::Malformed(raw.to_string()))
        }
    }

    /// Whether `raw` matches the identifier pattern
    pub fn is_well_formed(raw: &str) -> bool {
        ENTITY_ID_REGEX.is_match(raw)
    }

    /// Full identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segment(&self, index: usize) -> &str {
        self.0.split('|').nth(index).unwrap_or_default()
    }

    /// First segment (account or tenant)
    pub fn namespace(&self) -> &str {
        self.segment(0)
    }

    /// Second segment (e.g. `INFRA`)
    pub fn domain(&self) -> &str {
        self.segment(1)
    }

    /// Third segment, the entity kind as written in the id
    pub fn kind_segment(&self) -> &str {
        self.segment(2)
    }

    /// Fourth segment
    pub fn local_name(&self) -> &str {
        self.segment(3)
    }

    /// Decode the natural key back out of the local name, if it was derived
    pub fn natural_key(&self) -> Option<String> {
        URL_SAFE_NO_PAD
            .decode(self.local_name())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for EntityId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
