//! IntegrationKit CRD types
//!
//! An `IntegrationKit` describes the build artifact (container image) an
//! Integration runs from. Kits are either built by the operator or wrap an
//! image supplied by the user.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{Configurable, ConfigurationSpec};

/// Desired state of an IntegrationKit
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "kiln.dev",
    version = "v1",
    kind = "IntegrationKit",
    plural = "integrationkits",
    shortname = "ik",
    namespaced,
    derive = "PartialEq",
    status = "IntegrationKitStatus",
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".status.image"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationKitSpec {
    /// Pre-built image; when set the kit is not built by the operator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Kit-level configuration entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configuration: Vec<ConfigurationSpec>,
}

/// Observed state of an IntegrationKit
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationKitStatus {
    /// Image produced by the build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Digest of the produced image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl IntegrationKit {
    /// Create a kit wrapping an externally built image
    pub fn external(
        namespace: impl Into<String>,
        name: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some(namespace.into()),
                ..Default::default()
            },
            spec: IntegrationKitSpec {
                image: Some(image.into()),
                ..Default::default()
            },
            status: None,
        }
    }

    /// The built image if known, otherwise the image requested in the spec
    pub fn image(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.image.as_deref())
            .or(self.spec.image.as_deref())
    }
}

impl Configurable for IntegrationKit {
    fn configurations(&self) -> &[ConfigurationSpec] {
        &self.spec.configuration
    }
}
