//! Build context shared by all traits of a pass
//!
//! An `Environment` is created fresh for every build pass. Traits read the
//! integration and its configuration layers from it and accumulate their
//! output (resources, env vars, application properties) on it.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{ConfigMap, EnvVar, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kiln_common::crd::{
    Configurable, Integration, IntegrationKit, IntegrationPhase, IntegrationPlatform,
};
use kiln_common::{
    Error, OperatorConfig, Result, LABEL_INTEGRATION, LABEL_PROPERTIES_TYPE,
    PROPERTIES_TYPE_APPLICATION,
};
use kube::ResourceExt;
use tracing::debug;

use crate::properties::encode_properties;
use crate::resources::Resources;
use crate::{APPLICATION_PROPERTIES_FILE, SOURCES_MOUNT_PATH};

/// A `NAME=VALUE` configuration entry after layering
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigurationPair {
    /// Entry name
    pub name: String,
    /// Entry value
    pub value: String,
}

/// Mutable state of a single build pass
#[derive(Clone, Debug)]
pub struct Environment {
    /// Integration being built; traits may update its status
    pub integration: Integration,
    /// Platform configuration layer
    pub platform: Option<IntegrationPlatform>,
    /// Kit configuration layer
    pub integration_kit: Option<IntegrationKit>,
    /// Application properties rendered into the properties ConfigMap
    pub application_properties: BTreeMap<String, String>,
    /// Env vars contributed by traits, merged into the container per shape
    pub env_vars: Vec<EnvVar>,
    /// Output resources
    pub resources: Resources,
    /// Operator process configuration
    pub operator: OperatorConfig,
}

impl Environment {
    /// Create a context for the given integration with no other layers
    pub fn new(integration: Integration) -> Self {
        Self {
            integration,
            platform: None,
            integration_kit: None,
            application_properties: BTreeMap::new(),
            env_vars: Vec::new(),
            resources: Resources::new(),
            operator: OperatorConfig::default(),
        }
    }

    /// Builder: set the platform layer
    pub fn with_platform(mut self, platform: IntegrationPlatform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Builder: set the kit layer
    pub fn with_integration_kit(mut self, kit: IntegrationKit) -> Self {
        self.integration_kit = Some(kit);
        self
    }

    /// Builder: seed the output resources
    pub fn with_resources(mut self, resources: Resources) -> Self {
        self.resources = resources;
        self
    }

    /// Builder: set the operator configuration
    pub fn with_operator(mut self, operator: OperatorConfig) -> Self {
        self.operator = operator;
        self
    }

    /// Name of the integration
    pub fn integration_name(&self) -> String {
        self.integration.name_any()
    }

    /// Namespace of the integration (empty when unset)
    pub fn integration_namespace(&self) -> String {
        self.integration.namespace().unwrap_or_default()
    }

    /// Whether the integration is in one of `phases`
    pub fn integration_in_phase(&self, phases: &[IntegrationPhase]) -> bool {
        phases.contains(&self.integration.phase())
    }

    /// Whether the integration is deploying, running, or in error
    pub fn integration_in_running_phases(&self) -> bool {
        self.integration.phase().is_running()
    }

    /// Collect `NAME=VALUE` entries of one category across all layers.
    ///
    /// Layers are read platform, kit, then integration. A later layer
    /// overrides the value of a name already seen without moving it.
    pub fn collect_configuration_pairs(&self, category: &str) -> Vec<ConfigurationPair> {
        let layers = [
            self.platform.as_ref().map(|p| p.configurations()),
            self.integration_kit.as_ref().map(|k| k.configurations()),
            Some(self.integration.configurations()),
        ];

        let mut pairs: Vec<ConfigurationPair> = Vec::new();
        for entry in layers
            .into_iter()
            .flatten()
            .flatten()
            .filter(|c| c.type_ == category)
        {
            let (name, value) = entry
                .value
                .split_once('=')
                .unwrap_or((entry.value.as_str(), ""));
            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() {
                continue;
            }
            match pairs.iter_mut().find(|p| p.name == name) {
                Some(pair) => pair.value = value.to_string(),
                None => pairs.push(ConfigurationPair {
                    name: name.to_string(),
                    value: value.to_string(),
                }),
            }
        }
        pairs
    }

    /// Set a single application property
    pub fn set_application_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.application_properties.insert(key.into(), value.into());
    }

    /// Describe every integration source as `kiln.sources[i].*` properties
    pub fn add_sources_properties(&mut self) {
        let mut properties = Vec::new();
        for (i, source) in self.integration.spec.sources.iter().enumerate() {
            let prefix = format!("kiln.sources[{i}]");
            properties.push((
                format!("{prefix}.location"),
                format!("file:{SOURCES_MOUNT_PATH}/{}", source.name),
            ));
            let short_name = source.name.split('.').next().unwrap_or_default();
            properties.push((format!("{prefix}.name"), short_name.to_string()));
            if let Some(language) = source.infer_language() {
                properties.push((format!("{prefix}.language"), language));
            }
            if let Some(type_) = source.type_.as_deref().filter(|t| !t.is_empty()) {
                properties.push((format!("{prefix}.type"), type_.to_string()));
            }
            if source.compression {
                properties.push((format!("{prefix}.compressed"), "true".to_string()));
            }
        }
        debug!(
            integration = %self.integration_name(),
            count = self.integration.spec.sources.len(),
            "added source properties"
        );
        self.application_properties.extend(properties);
    }

    /// Render the application properties into a ConfigMap.
    ///
    /// Returns `None` when there are no properties.
    pub fn compute_application_properties(&self) -> Result<Option<ConfigMap>> {
        if self.application_properties.is_empty() {
            return Ok(None);
        }

        let name = self.integration_name();
        let rendered = encode_properties(&self.application_properties)
            .map_err(|msg| Error::properties(&name, msg))?;

        let labels = BTreeMap::from([
            (LABEL_INTEGRATION.to_string(), name.clone()),
            (
                LABEL_PROPERTIES_TYPE.to_string(),
                PROPERTIES_TYPE_APPLICATION.to_string(),
            ),
        ]);

        Ok(Some(ConfigMap {
            metadata: ObjectMeta {
                name: Some(format!("{name}-application-properties")),
                namespace: self.integration.namespace(),
                labels: Some(labels),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                APPLICATION_PROPERTIES_FILE.to_string(),
                rendered,
            )])),
            ..Default::default()
        }))
    }

    /// The Service belonging to this integration, if one was produced
    pub fn service_for_integration(&self) -> Option<&Service> {
        self.resources
            .service_for_integration(&self.integration.name_any())
    }

    /// Mutable variant of [`Environment::service_for_integration`]
    pub fn service_for_integration_mut(&mut self) -> Option<&mut Service> {
        let name = self.integration.name_any();
        self.resources.service_for_integration_mut(&name)
    }
}
