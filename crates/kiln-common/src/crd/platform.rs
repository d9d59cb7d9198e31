//! IntegrationPlatform CRD types
//!
//! The platform carries operator-wide defaults. Only its configuration
//! entries are consumed by the trait engine, as the lowest-precedence layer.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{Configurable, ConfigurationSpec};

/// Desired state of an IntegrationPlatform
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "kiln.dev",
    version = "v1",
    kind = "IntegrationPlatform",
    plural = "integrationplatforms",
    shortname = "ip",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationPlatformSpec {
    /// Platform-level configuration entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configuration: Vec<ConfigurationSpec>,
}

impl Configurable for IntegrationPlatform {
    fn configurations(&self) -> &[ConfigurationSpec] {
        &self.spec.configuration
    }
}
