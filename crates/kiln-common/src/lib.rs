//! Common types for Kiln: CRDs, errors, and operator configuration

#![deny(missing_docs)]

pub mod config;
pub mod crd;
pub mod error;
pub mod telemetry;

pub use config::OperatorConfig;
pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Labels
// =============================================================================

/// Label linking a generated resource to the Integration that owns it
pub const LABEL_INTEGRATION: &str = "kiln.dev/integration";

/// Label classifying a Service (see [`SERVICE_TYPE_USER`])
pub const LABEL_SERVICE_TYPE: &str = "kiln.dev/service.type";

/// Service type value for Services exposed to end users
pub const SERVICE_TYPE_USER: &str = "user";

/// Label classifying how an IntegrationKit was produced
pub const LABEL_KIT_TYPE: &str = "kiln.dev/kit.type";

/// Kit type value for kits wrapping an externally built image
pub const KIT_TYPE_EXTERNAL: &str = "external";

/// Label classifying a properties ConfigMap
pub const LABEL_PROPERTIES_TYPE: &str = "kiln.dev/properties.type";

/// Properties type value for the rendered application properties
pub const PROPERTIES_TYPE_APPLICATION: &str = "application";

/// Kind of the object that created a derived resource
pub const LABEL_CREATOR_KIND: &str = "kiln.dev/created.by.kind";

/// Name of the object that created a derived resource
pub const LABEL_CREATOR_NAME: &str = "kiln.dev/created.by.name";

/// Namespace of the object that created a derived resource
pub const LABEL_CREATOR_NAMESPACE: &str = "kiln.dev/created.by.namespace";

/// Resource version of the object that created a derived resource
pub const LABEL_CREATOR_VERSION: &str = "kiln.dev/created.by.version";

// =============================================================================
// Annotations
// =============================================================================

/// Annotation selecting the IntegrationPlatform that should handle a resource
pub const ANNOTATION_PLATFORM_SELECTOR: &str = "kiln.dev/platform.id";

/// Annotation naming the operator instance responsible for a resource
pub const ANNOTATION_OPERATOR_ID: &str = "kiln.dev/operator.id";
