//! Deprecated probe options still accepted on the container trait
//!
//! They are decoded so existing integrations keep parsing, but they never
//! affect the produced container. The health trait replaces them.

use serde::Deserialize;
use tracing::warn;

/// Probe settings formerly configured through the container trait
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct LegacyProbeConfig {
    /// Enable liveness and readiness probes
    pub probes_enabled: Option<bool>,

    /// Liveness probe scheme
    pub liveness_scheme: Option<String>,
    /// Liveness probe initial delay in seconds
    pub liveness_initial_delay: Option<i32>,
    /// Liveness probe timeout in seconds
    pub liveness_timeout: Option<i32>,
    /// Liveness probe period in seconds
    pub liveness_period: Option<i32>,
    /// Liveness probe success threshold
    pub liveness_success_threshold: Option<i32>,
    /// Liveness probe failure threshold
    pub liveness_failure_threshold: Option<i32>,

    /// Readiness probe scheme
    pub readiness_scheme: Option<String>,
    /// Readiness probe initial delay in seconds
    pub readiness_initial_delay: Option<i32>,
    /// Readiness probe timeout in seconds
    pub readiness_timeout: Option<i32>,
    /// Readiness probe period in seconds
    pub readiness_period: Option<i32>,
    /// Readiness probe success threshold
    pub readiness_success_threshold: Option<i32>,
    /// Readiness probe failure threshold
    pub readiness_failure_threshold: Option<i32>,
}

impl LegacyProbeConfig {
    /// Whether any deprecated option was supplied
    pub fn is_set(&self) -> bool {
        *self != Self::default()
    }

    /// Log a deprecation warning if any option was supplied
    pub fn warn_if_set(&self, trait_id: &str, integration: &str) {
        if self.is_set() {
            warn!(
                integration = %integration,
                trait_id = %trait_id,
                "probe options on the {trait_id} trait are deprecated and ignored, use the health trait instead"
            );
        }
    }
}
