//! Shared types for Kiln CRDs

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// Conditions
// =============================================================================

/// Condition status following Kubernetes conventions
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kubernetes-style condition for status reporting
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Condition {
    /// Type of condition (e.g., ServiceAvailable)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    pub reason: String,

    /// Human-readable message
    pub message: String,

    /// Last time the condition transitioned
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a new condition with the current timestamp
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }
}

/// Insert or replace the condition of the same type.
///
/// The transition time of an existing condition is kept when its status
/// does not change.
pub fn upsert_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time;
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration category for environment variables
pub const CONFIGURATION_TYPE_ENV: &str = "env";

/// Configuration category for application properties
pub const CONFIGURATION_TYPE_PROPERTY: &str = "property";

/// A single configuration entry attached to a platform, kit, or integration.
///
/// For the `env` and `property` categories the value has the form
/// `NAME=VALUE`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ConfigurationSpec {
    /// Configuration category (e.g., "env", "property")
    #[serde(rename = "type")]
    pub type_: String,

    /// Raw configuration value
    pub value: String,
}

impl ConfigurationSpec {
    /// Create an `env` entry from a name and value
    pub fn env(name: &str, value: &str) -> Self {
        Self {
            type_: CONFIGURATION_TYPE_ENV.to_string(),
            value: format!("{name}={value}"),
        }
    }

    /// Create a `property` entry from a key and value
    pub fn property(key: &str, value: &str) -> Self {
        Self {
            type_: CONFIGURATION_TYPE_PROPERTY.to_string(),
            value: format!("{key}={value}"),
        }
    }
}

/// Anything that carries configuration entries
pub trait Configurable {
    /// The configuration entries, in declaration order
    fn configurations(&self) -> &[ConfigurationSpec];
}

// =============================================================================
// References
// =============================================================================

/// Reference to an IntegrationKit
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct KitReference {
    /// Kit name
    pub name: String,

    /// Kit namespace (defaults to the referencing object's namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl std::fmt::Display for KitReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}
