//! Integration CRD types
//!
//! Defines `Integration`, the user's logical workload description. The spec
//! carries per-trait option maps, configuration entries, and sources; the
//! status carries what the operator resolved (image, digest, capabilities,
//! kit binding) and its conditions.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::kit::IntegrationKit;
use super::types::{
    upsert_condition, Condition, ConditionStatus, Configurable, ConfigurationSpec, KitReference,
};

/// Raw options of a single trait, keyed by option name (e.g., "port")
pub type TraitOptions = BTreeMap<String, serde_json::Value>;

/// Capability declared by integrations exposing REST endpoints
pub const CAPABILITY_REST: &str = "rest";

/// Condition type recording the Service -> container port binding
pub const CONDITION_SERVICE_AVAILABLE: &str = "ServiceAvailable";

/// Reason used with [`CONDITION_SERVICE_AVAILABLE`]
pub const REASON_SERVICE_AVAILABLE: &str = "ServiceAvailable";

/// Condition type recording whether a kit could be bound
pub const CONDITION_KIT_AVAILABLE: &str = "IntegrationKitAvailable";

// =============================================================================
// Phase
// =============================================================================

/// Lifecycle phase of an Integration
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum IntegrationPhase {
    /// Not yet picked up by the operator
    #[default]
    #[serde(rename = "")]
    None,
    /// Being initialized
    Initialization,
    /// Waiting for an IntegrationPlatform to become ready
    #[serde(rename = "Waiting For Platform")]
    WaitingForPlatform,
    /// Its kit is being built
    #[serde(rename = "Building Kit")]
    BuildingKit,
    /// Workload resources are being deployed
    Deploying,
    /// Workload is running
    Running,
    /// Integration has encountered an error
    Error,
}

impl IntegrationPhase {
    /// Phases in which the workload has been (or is being) deployed
    pub const RUNNING_PHASES: [IntegrationPhase; 3] =
        [Self::Deploying, Self::Running, Self::Error];

    /// Returns true for [`Self::RUNNING_PHASES`]
    pub fn is_running(&self) -> bool {
        Self::RUNNING_PHASES.contains(self)
    }
}

impl std::fmt::Display for IntegrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, ""),
            Self::Initialization => write!(f, "Initialization"),
            Self::WaitingForPlatform => write!(f, "Waiting For Platform"),
            Self::BuildingKit => write!(f, "Building Kit"),
            Self::Deploying => write!(f, "Deploying"),
            Self::Running => write!(f, "Running"),
            Self::Error => write!(f, "Error"),
        }
    }
}

// =============================================================================
// Sources
// =============================================================================

/// A source file making up the integration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpec {
    /// File name, possibly with a relative directory (e.g., "routes/Main.java")
    pub name: String,

    /// Source language; inferred from the file extension when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Source type (e.g., "template", "errorHandler")
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// Whether the content is stored compressed
    #[serde(default)]
    pub compression: bool,
}

impl SourceSpec {
    /// The declared language, or one inferred from the file extension
    pub fn infer_language(&self) -> Option<String> {
        if let Some(language) = self.language.as_deref().filter(|l| !l.is_empty()) {
            return Some(language.to_string());
        }
        let name = self.name.to_ascii_lowercase();
        let language = if name.ends_with(".java") {
            "java"
        } else if name.ends_with(".groovy") {
            "groovy"
        } else if name.ends_with(".kts") {
            "kts"
        } else if name.ends_with(".js") {
            "js"
        } else if name.ends_with(".xml") {
            "xml"
        } else if name.ends_with(".yaml") || name.ends_with(".yml") {
            "yaml"
        } else {
            return None;
        };
        Some(language.to_string())
    }
}

// =============================================================================
// CRD
// =============================================================================

/// Desired state of an Integration
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "kiln.dev",
    version = "v1",
    kind = "Integration",
    plural = "integrations",
    shortname = "it",
    namespaced,
    derive = "PartialEq",
    status = "IntegrationStatus",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Kit","type":"string","jsonPath":".status.integrationKit.name"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationSpec {
    /// Trait options keyed by trait id (e.g., "container")
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub traits: BTreeMap<String, TraitOptions>,

    /// Kit this integration must run from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_kit: Option<KitReference>,

    /// Integration-level configuration entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configuration: Vec<ConfigurationSpec>,

    /// Source files
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceSpec>,
}

/// Observed state of an Integration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationStatus {
    /// Current lifecycle phase
    #[serde(default)]
    pub phase: IntegrationPhase,

    /// Container image the integration runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Digest of the integration spec, used to detect changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Runtime capabilities required by the integration (e.g., "rest")
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,

    /// Kit the integration is bound to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_kit: Option<KitReference>,

    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl IntegrationStatus {
    /// Set a condition, replacing any existing one of the same type
    pub fn set_condition(
        &mut self,
        type_: &str,
        status: ConditionStatus,
        reason: &str,
        message: impl Into<String>,
    ) {
        upsert_condition(
            &mut self.conditions,
            Condition::new(type_, status, reason, message),
        );
    }

    /// Look up a condition by type
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    /// Returns true if the integration declares the given capability
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

impl Integration {
    /// Current phase (`None` when no status has been recorded)
    pub fn phase(&self) -> IntegrationPhase {
        self.status.as_ref().map(|s| s.phase).unwrap_or_default()
    }

    /// Mutable status, created on first access
    pub fn status_mut(&mut self) -> &mut IntegrationStatus {
        self.status.get_or_insert_with(IntegrationStatus::default)
    }

    /// Bind the integration to a kit, adopting the kit's image.
    pub fn set_integration_kit(&mut self, kit: &IntegrationKit) {
        let reference = KitReference {
            name: kit.metadata.name.clone().unwrap_or_default(),
            namespace: kit.metadata.namespace.clone(),
        };
        let image = kit.image().map(str::to_string);
        let status = self.status_mut();
        status.integration_kit = Some(reference);
        if image.is_some() {
            status.image = image;
        }
    }
}

impl Configurable for Integration {
    fn configurations(&self) -> &[ConfigurationSpec] {
        &self.spec.configuration
    }
}

// =============================================================================
// Tests
// =============================================================================
