//! Custom Resource Definitions for Kiln
//!
//! `Integration` is the user-facing resource; `IntegrationKit` and
//! `IntegrationPlatform` are consumed as additional configuration layers.

mod integration;
mod kit;
mod platform;
mod types;

pub use integration::{
    Integration, IntegrationPhase, IntegrationSpec, IntegrationStatus, SourceSpec, TraitOptions,
    CAPABILITY_REST, CONDITION_KIT_AVAILABLE, CONDITION_SERVICE_AVAILABLE,
    REASON_SERVICE_AVAILABLE,
};
pub use kit::{IntegrationKit, IntegrationKitSpec, IntegrationKitStatus};
pub use platform::{IntegrationPlatform, IntegrationPlatformSpec};
pub use types::{
    upsert_condition, Condition, ConditionStatus, Configurable, ConfigurationSpec, KitReference,
    CONFIGURATION_TYPE_ENV, CONFIGURATION_TYPE_PROPERTY,
};
