//! Error types for the Kiln trait engine
//!
//! Errors carry the integration or trait they concern so that the
//! reconciler can surface them on the Integration status without
//! re-deriving context.

use thiserror::Error;

/// Main error type for Kiln operations
#[derive(Debug, Error)]
pub enum Error {
    /// A trait's own options are invalid
    #[error("validation error for trait {trait_id}: {message}")]
    Validation {
        /// Trait whose options failed validation
        trait_id: String,
        /// Description of what's invalid
        message: String,
        /// The offending option key (e.g., "image-pull-policy")
        field: Option<String>,
    },

    /// Mutually exclusive settings are active at the same time
    #[error("unsupported configuration for {integration}: {message}")]
    Conflict {
        /// Integration carrying the conflicting settings
        integration: String,
        /// Description of the conflict
        message: String,
    },

    /// Application properties could not be computed
    #[error("could not compute application properties for {integration}: {message}")]
    Properties {
        /// Integration whose properties failed to render
        integration: String,
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Create a validation error for a trait
    pub fn validation(trait_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            trait_id: trait_id.into(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error pointing at a specific option key
    pub fn validation_for_field(
        trait_id: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            trait_id: trait_id.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a conflict error for an integration
    pub fn conflict(integration: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Conflict {
            integration: integration.into(),
            message: msg.into(),
        }
    }

    /// Create a properties error for an integration
    pub fn properties(integration: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Properties {
            integration: integration.into(),
            message: msg.into(),
        }
    }

    /// Machine-readable reason used when the error is recorded as a condition
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "InvalidTraitConfiguration",
            Self::Conflict { .. } => "UnsupportedConfiguration",
            Self::Properties { .. } => "PropertiesError",
        }
    }
}
