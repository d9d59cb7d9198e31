//! The container trait
//!
//! Builds the main integration container and wires it into whichever
//! workload shape the pass produced. It also binds user-supplied images to
//! an external IntegrationKit, exposes the container through the
//! integration's Service, and renders application properties.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, ResourceRequirements, ServicePort,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kiln_common::crd::{
    ConditionStatus, IntegrationKit, IntegrationPhase, CAPABILITY_REST, CONDITION_KIT_AVAILABLE,
    CONDITION_SERVICE_AVAILABLE, CONFIGURATION_TYPE_ENV, REASON_SERVICE_AVAILABLE,
};
use kiln_common::{
    Error, Result, ANNOTATION_OPERATOR_ID, ANNOTATION_PLATFORM_SELECTOR, KIT_TYPE_EXTERNAL,
    LABEL_CREATOR_KIND, LABEL_CREATOR_NAME, LABEL_CREATOR_NAMESPACE, LABEL_CREATOR_VERSION,
    LABEL_KIT_TYPE, LABEL_SERVICE_TYPE, SERVICE_TYPE_USER,
};
use kube::ResourceExt;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::environment::Environment;
use crate::envvar;
use crate::legacy::LegacyProbeConfig;
use crate::quantity::parse_quantity;
use crate::resources::Workload;
use crate::traits::{decode_trait_options, Trait};
use crate::{CONF_D_PATH, CONF_PATH};

/// Trait identifier
pub const CONTAINER_TRAIT_ID: &str = "container";

/// Position of the container trait in a pass
pub const CONTAINER_TRAIT_ORDER: i32 = 1600;

/// Default container name
pub const DEFAULT_CONTAINER_NAME: &str = "integration";

/// Default container port
pub const DEFAULT_CONTAINER_PORT: i32 = 8080;

/// Container port name used when `port-name` is not set
pub const DEFAULT_CONTAINER_PORT_NAME: &str = "http";

/// Default Service port
pub const DEFAULT_SERVICE_PORT: i32 = 80;

/// Default Service port name
pub const DEFAULT_SERVICE_PORT_NAME: &str = "http";

/// Env var carrying the integration digest
pub const ENV_DIGEST: &str = "KILN_DIGEST";

/// Env var pointing at the application properties file
pub const ENV_CONF: &str = "KILN_CONF";

/// Env var pointing at the extra configuration directory
pub const ENV_CONF_D: &str = "KILN_CONF_D";

/// Env var carrying the integration name
pub const ENV_INTEGRATION: &str = "KILN_INTEGRATION";

/// Application property selecting the REST transport
pub const PROPERTY_REST_COMPONENT: &str = "kiln.context.rest-configuration.component";

/// Component serving REST endpoints on the platform HTTP server
pub const REST_COMPONENT_PLATFORM_HTTP: &str = "platform-http";

const FIELD_PATH_NAMESPACE: &str = "metadata.namespace";

// =============================================================================
// Pull policy
// =============================================================================

/// Container image pull policy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PullPolicy {
    /// Always pull
    Always,
    /// Pull only if the image is not present on the node
    IfNotPresent,
    /// Never pull
    Never,
}

impl PullPolicy {
    /// Kubernetes spelling of the policy
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "Always",
            Self::IfNotPresent => "IfNotPresent",
            Self::Never => "Never",
        }
    }
}

impl fmt::Display for PullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PullPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Always" => Ok(Self::Always),
            "IfNotPresent" => Ok(Self::IfNotPresent),
            "Never" => Ok(Self::Never),
            other => Err(format!(
                "unsupported pull policy {other:?}, expected one of Always, IfNotPresent, Never"
            )),
        }
    }
}

// =============================================================================
// Trait
// =============================================================================

/// Options and behaviour of the container trait
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct ContainerTrait {
    /// Whether the trait takes part in the pass
    pub enabled: Option<bool>,
    /// Infer unset options (e.g., `expose`) from the environment
    pub auto: Option<bool>,

    /// Minimum CPU
    pub request_cpu: Option<String>,
    /// Minimum memory
    pub request_memory: Option<String>,
    /// Maximum CPU
    pub limit_cpu: Option<String>,
    /// Maximum memory
    pub limit_memory: Option<String>,

    /// Expose the container through the integration's Service
    pub expose: Option<bool>,
    /// Container port
    pub port: i32,
    /// Container port name
    pub port_name: Option<String>,
    /// Service port
    pub service_port: i32,
    /// Service port name
    pub service_port_name: String,

    /// Container name
    pub name: String,
    /// Externally built image to run instead of an operator-built kit
    pub image: Option<String>,
    /// Image pull policy
    pub image_pull_policy: Option<String>,

    /// Deprecated probe options
    #[serde(flatten)]
    pub legacy: LegacyProbeConfig,

    #[serde(skip)]
    pull_policy: Option<PullPolicy>,
}

impl Default for ContainerTrait {
    fn default() -> Self {
        Self {
            enabled: None,
            auto: None,
            request_cpu: None,
            request_memory: None,
            limit_cpu: None,
            limit_memory: None,
            expose: None,
            port: DEFAULT_CONTAINER_PORT,
            port_name: None,
            service_port: DEFAULT_SERVICE_PORT,
            service_port_name: DEFAULT_SERVICE_PORT_NAME.to_string(),
            name: DEFAULT_CONTAINER_NAME.to_string(),
            image: None,
            image_pull_policy: None,
            legacy: LegacyProbeConfig::default(),
            pull_policy: None,
        }
    }
}

impl ContainerTrait {
    /// Decode the trait options from `spec.traits.container`
    pub fn from_integration(integration: &kiln_common::crd::Integration) -> Result<Self> {
        decode_trait_options(integration, CONTAINER_TRAIT_ID)
    }

    /// Pull policy resolved by `configure`
    pub fn pull_policy(&self) -> Option<PullPolicy> {
        self.pull_policy
    }

    fn explicit_image(&self) -> Option<&str> {
        self.image.as_deref().filter(|i| !i.is_empty())
    }

    fn container_port_name(&self) -> &str {
        self.port_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_CONTAINER_PORT_NAME)
    }

    /// Bind an explicit image to an external kit
    fn configure_image_integration_kit(&self, env: &mut Environment) -> Result<()> {
        let Some(image) = self.explicit_image() else {
            return Ok(());
        };
        let name = env.integration_name();
        let namespace = env.integration_namespace();

        if let Some(kit_ref) = &env.integration.spec.integration_kit {
            let err = Error::conflict(
                &name,
                format!(
                    "an explicit container image cannot be used together with IntegrationKit {kit_ref}"
                ),
            );
            env.integration.status_mut().set_condition(
                CONDITION_KIT_AVAILABLE,
                ConditionStatus::False,
                err.reason(),
                err.to_string(),
            );
            return Err(err);
        }

        let kit_name = format!("kit-{name}");
        let mut kit = IntegrationKit::external(&namespace, &kit_name, image);
        kit.metadata.labels = Some(BTreeMap::from([
            (LABEL_KIT_TYPE.to_string(), KIT_TYPE_EXTERNAL.to_string()),
            (LABEL_CREATOR_KIND.to_string(), "Integration".to_string()),
            (LABEL_CREATOR_NAME.to_string(), name.clone()),
            (LABEL_CREATOR_NAMESPACE.to_string(), namespace.clone()),
            (
                LABEL_CREATOR_VERSION.to_string(),
                env.integration.resource_version().unwrap_or_default(),
            ),
        ]));

        let mut annotations = BTreeMap::new();
        if let Some(selector) = env.integration.annotations().get(ANNOTATION_PLATFORM_SELECTOR) {
            annotations.insert(ANNOTATION_PLATFORM_SELECTOR.to_string(), selector.clone());
        }
        if let Some(operator_id) = &env.operator.operator_id {
            annotations.insert(ANNOTATION_OPERATOR_ID.to_string(), operator_id.clone());
        }
        if !annotations.is_empty() {
            kit.metadata.annotations = Some(annotations);
        }

        info!(
            integration = %name,
            kit = %kit_name,
            image = %image,
            "binding integration to external image kit"
        );
        env.integration.set_integration_kit(&kit);
        env.resources.add(kit);
        Ok(())
    }

    fn configure_container(&self, env: &mut Environment) -> Result<()> {
        let name = env.integration_name();
        let status = env.integration.status.clone().unwrap_or_default();

        let mut container = Container {
            name: self.name.clone(),
            image: status.image.clone(),
            image_pull_policy: self.pull_policy.map(|p| p.as_str().to_string()),
            ..Default::default()
        };

        let mut vars: Vec<EnvVar> = Vec::new();
        for pair in env.collect_configuration_pairs(CONFIGURATION_TYPE_ENV) {
            envvar::set_val(&mut vars, &pair.name, pair.value);
        }
        envvar::set_val(&mut vars, ENV_DIGEST, status.digest.unwrap_or_default());
        envvar::set_val(&mut vars, ENV_CONF, CONF_PATH);
        envvar::set_val(&mut vars, ENV_CONF_D, CONF_D_PATH);
        envvar::set_val(&mut vars, ENV_INTEGRATION, name.as_str());

        env.add_sources_properties();
        if let Some(config_map) = env.compute_application_properties()? {
            env.resources.add(config_map);
        }

        self.configure_resources(&name, &mut container);
        if self.expose.unwrap_or(false) {
            self.configure_service(env, &mut container);
        }
        self.configure_capabilities(env);

        let namespace = env.integration_namespace();
        let Some(workload) = env.resources.workload_mut() else {
            debug!(integration = %name, "no workload shape produced, container discarded");
            return Ok(());
        };
        match workload {
            Workload::Deployment(_) | Workload::CronJob(_) => {
                for var in &env.env_vars {
                    envvar::set_var(&mut vars, var.clone());
                }
            }
            Workload::KnativeService(_) => {
                for var in &env.env_vars {
                    if let Some(var) = knative_env_var(var, &namespace) {
                        envvar::set_var(&mut vars, var);
                    }
                }
            }
        }
        container.env = Some(vars);

        debug!(
            integration = %name,
            shape = workload.kind(),
            container = %container.name,
            "adding integration container"
        );
        workload.containers_mut().push(container);
        Ok(())
    }

    fn configure_resources(&self, integration: &str, container: &mut Container) {
        let mut requests = BTreeMap::new();
        let mut limits = BTreeMap::new();
        insert_quantity(&mut requests, integration, "cpu", "request-cpu", &self.request_cpu);
        insert_quantity(&mut requests, integration, "memory", "request-memory", &self.request_memory);
        insert_quantity(&mut limits, integration, "cpu", "limit-cpu", &self.limit_cpu);
        insert_quantity(&mut limits, integration, "memory", "limit-memory", &self.limit_memory);

        if requests.is_empty() && limits.is_empty() {
            return;
        }
        container.resources = Some(ResourceRequirements {
            requests: (!requests.is_empty()).then_some(requests),
            limits: (!limits.is_empty()).then_some(limits),
            ..Default::default()
        });
    }

    fn configure_service(&self, env: &mut Environment, container: &mut Container) {
        let name = env.integration_name();
        let Some(service) = env.resources.service_for_integration_mut(&name) else {
            debug!(integration = %name, "no service to expose the container through");
            return;
        };

        let port_name = self.container_port_name().to_string();
        container
            .ports
            .get_or_insert_with(Vec::new)
            .push(ContainerPort {
                name: Some(port_name.clone()),
                container_port: self.port,
                protocol: Some("TCP".to_string()),
                ..Default::default()
            });
        service
            .spec
            .get_or_insert_with(Default::default)
            .ports
            .get_or_insert_with(Vec::new)
            .push(ServicePort {
                name: Some(self.service_port_name.clone()),
                port: self.service_port,
                protocol: Some("TCP".to_string()),
                target_port: Some(IntOrString::String(port_name.clone())),
                ..Default::default()
            });
        service
            .metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert(LABEL_SERVICE_TYPE.to_string(), SERVICE_TYPE_USER.to_string());

        let message = format!(
            "{}({}/{}) -> {}({}/{})",
            service.name_any(),
            self.service_port_name,
            self.service_port,
            container.name,
            port_name,
            self.port
        );
        info!(integration = %name, binding = %message, "exposing container");
        env.integration.status_mut().set_condition(
            CONDITION_SERVICE_AVAILABLE,
            ConditionStatus::True,
            REASON_SERVICE_AVAILABLE,
            message,
        );
    }

    /// Runs after the properties ConfigMap is rendered; a later properties
    /// computation in the same pass picks the REST component up.
    fn configure_capabilities(&self, env: &mut Environment) {
        let rest = env
            .integration
            .status
            .as_ref()
            .is_some_and(|s| s.has_capability(CAPABILITY_REST));
        if rest {
            env.set_application_property(PROPERTY_REST_COMPONENT, REST_COMPONENT_PLATFORM_HTTP);
        }
    }
}

impl Trait for ContainerTrait {
    fn id(&self) -> &'static str {
        CONTAINER_TRAIT_ID
    }

    fn order(&self) -> i32 {
        CONTAINER_TRAIT_ORDER
    }

    fn configure(&mut self, env: &Environment) -> Result<bool> {
        if !self.enabled.unwrap_or(true) {
            return Ok(false);
        }
        if !env.integration_in_phase(&[IntegrationPhase::Initialization])
            && !env.integration_in_running_phases()
        {
            return Ok(false);
        }

        self.legacy
            .warn_if_set(CONTAINER_TRAIT_ID, &env.integration_name());

        if self.auto.unwrap_or(true) && self.expose.is_none() {
            let expose = env.service_for_integration().is_some();
            debug!(integration = %env.integration_name(), expose, "inferred expose");
            self.expose = Some(expose);
        }

        self.pull_policy = match self.image_pull_policy.as_deref() {
            None | Some("") => None,
            Some(policy) => Some(policy.parse().map_err(|msg: String| {
                Error::validation_for_field(CONTAINER_TRAIT_ID, "image-pull-policy", msg)
            })?),
        };

        Ok(true)
    }

    fn apply(&mut self, env: &mut Environment) -> Result<()> {
        self.configure_image_integration_kit(env)?;
        self.configure_container(env)
    }

    fn is_platform_trait(&self) -> bool {
        true
    }
}

fn insert_quantity(
    list: &mut BTreeMap<String, Quantity>,
    integration: &str,
    resource: &str,
    option: &str,
    value: &Option<String>,
) {
    let Some(value) = value.as_deref().filter(|v| !v.is_empty()) else {
        return;
    };
    match parse_quantity(value) {
        Ok(quantity) => {
            debug!(
                integration = %integration,
                option = %option,
                milli_value = %quantity.milli_value(),
                "setting resource quantity"
            );
            list.insert(resource.to_string(), quantity.to_quantity());
        }
        Err(e) => warn!(
            integration = %integration,
            option = %option,
            value = %value,
            error = %e,
            "ignoring unparsable resource quantity"
        ),
    }
}

/// Rewrite a trait env var for Knative, which rejects most downward-API sources.
///
/// Returns `None` for variables that must be dropped.
fn knative_env_var(var: &EnvVar, namespace: &str) -> Option<EnvVar> {
    let Some(source) = &var.value_from else {
        return Some(var.clone());
    };
    if let Some(field_ref) = &source.field_ref {
        if field_ref.field_path == FIELD_PATH_NAMESPACE {
            return Some(EnvVar {
                name: var.name.clone(),
                value: Some(namespace.to_string()),
                value_from: None,
            });
        }
        info!(env = %var.name, field = %field_ref.field_path, "skipping fieldRef env var unsupported by Knative");
        return None;
    }
    if source.resource_field_ref.is_some() {
        info!(env = %var.name, "skipping resourceFieldRef env var unsupported by Knative");
        return None;
    }
    Some(var.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{EnvVarSource, ResourceFieldSelector, Service};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kiln_common::crd::{Integration, IntegrationSpec, IntegrationStatus};
    use kiln_common::LABEL_INTEGRATION;
    use serde_json::json;

    fn integration(phase: IntegrationPhase, options: serde_json::Value) -> Integration {
        let mut it = Integration::new(
            "orders",
            IntegrationSpec {
                traits: BTreeMap::from([(
                    CONTAINER_TRAIT_ID.to_string(),
                    serde_json::from_value(options).unwrap(),
                )]),
                ..Default::default()
            },
        );
        it.metadata.namespace = Some("prod".to_string());
        it.status = Some(IntegrationStatus {
            phase,
            ..Default::default()
        });
        it
    }

    fn service() -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some("orders".to_string()),
                labels: Some(BTreeMap::from([(
                    LABEL_INTEGRATION.to_string(),
                    "orders".to_string(),
                )])),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn configured(env: &Environment) -> Result<(ContainerTrait, bool)> {
        let mut t = ContainerTrait::from_integration(&env.integration)?;
        let enabled = t.configure(env)?;
        Ok((t, enabled))
    }

    #[test]
    fn test_defaults() {
        let t = ContainerTrait::default();
        assert_eq!(t.port, 8080);
        assert_eq!(t.service_port, 80);
        assert_eq!(t.service_port_name, "http");
        assert_eq!(t.name, "integration");
        assert_eq!(t.id(), "container");
        assert_eq!(t.order(), 1600);
        assert!(t.is_platform_trait());
    }

    #[test]
    fn test_decode_options() {
        let it = integration(
            IntegrationPhase::Initialization,
            json!({"port": 9090, "service-port-name": "web", "request-cpu": "250m"}),
        );
        let t = ContainerTrait::from_integration(&it).unwrap();
        assert_eq!(t.port, 9090);
        assert_eq!(t.service_port, 80);
        assert_eq!(t.service_port_name, "web");
        assert_eq!(t.request_cpu.as_deref(), Some("250m"));
    }

    #[test]
    fn test_disabled_is_not_configured() {
        let env = Environment::new(integration(
            IntegrationPhase::Running,
            json!({"enabled": false}),
        ));
        let (_, enabled) = configured(&env).unwrap();
        assert!(!enabled);
    }

    #[test]
    fn test_only_initialization_and_running_phases() {
        for (phase, expected) in [
            (IntegrationPhase::None, false),
            (IntegrationPhase::WaitingForPlatform, false),
            (IntegrationPhase::BuildingKit, false),
            (IntegrationPhase::Initialization, true),
            (IntegrationPhase::Deploying, true),
            (IntegrationPhase::Running, true),
            (IntegrationPhase::Error, true),
        ] {
            let env = Environment::new(integration(phase, json!({})));
            let (_, enabled) = configured(&env).unwrap();
            assert_eq!(enabled, expected, "phase {phase:?}");
        }
    }

    #[test]
    fn test_expose_inferred_from_service() {
        let it = integration(IntegrationPhase::Initialization, json!({}));
        let mut env = Environment::new(it.clone());
        let (t, _) = configured(&env).unwrap();
        assert_eq!(t.expose, Some(false));

        env.resources.add(service());
        let (t, _) = configured(&env).unwrap();
        assert_eq!(t.expose, Some(true));
    }

    #[test]
    fn test_expose_not_inferred_without_auto() {
        let mut env = Environment::new(integration(
            IntegrationPhase::Initialization,
            json!({"auto": false}),
        ));
        env.resources.add(service());
        let (t, _) = configured(&env).unwrap();
        assert_eq!(t.expose, None);
    }

    #[test]
    fn test_explicit_expose_kept() {
        let env = Environment::new(integration(
            IntegrationPhase::Initialization,
            json!({"expose": true}),
        ));
        let (t, _) = configured(&env).unwrap();
        assert_eq!(t.expose, Some(true));
    }

    #[test]
    fn test_pull_policy_validation() {
        for (policy, expected) in [
            ("", None),
            ("Always", Some(PullPolicy::Always)),
            ("IfNotPresent", Some(PullPolicy::IfNotPresent)),
            ("Never", Some(PullPolicy::Never)),
        ] {
            let env = Environment::new(integration(
                IntegrationPhase::Initialization,
                json!({ "image-pull-policy": policy }),
            ));
            let (t, enabled) = configured(&env).unwrap();
            assert!(enabled);
            assert_eq!(t.pull_policy(), expected);
        }

        let env = Environment::new(integration(
            IntegrationPhase::Initialization,
            json!({"image-pull-policy": "Sometimes"}),
        ));
        match configured(&env) {
            Err(Error::Validation { field, .. }) => {
                assert_eq!(field.as_deref(), Some("image-pull-policy"))
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_legacy_options_do_not_change_container() {
        let env = Environment::new(integration(
            IntegrationPhase::Initialization,
            json!({"probes-enabled": true, "liveness-timeout": 3}),
        ));
        let (t, enabled) = configured(&env).unwrap();
        assert!(enabled);
        assert!(t.legacy.is_set());
        assert_eq!(t.port, DEFAULT_CONTAINER_PORT);
    }

    #[test]
    fn test_invalid_quantity_skipped() {
        let t = ContainerTrait {
            request_cpu: Some("not-a-number".to_string()),
            request_memory: Some("256Mi".to_string()),
            limit_cpu: Some("1".to_string()),
            ..Default::default()
        };
        let mut container = Container::default();
        t.configure_resources("orders", &mut container);

        let resources = container.resources.unwrap();
        let requests = resources.requests.unwrap();
        assert!(!requests.contains_key("cpu"));
        assert_eq!(requests["memory"], Quantity("256Mi".to_string()));
        assert_eq!(resources.limits.unwrap()["cpu"], Quantity("1".to_string()));
    }

    #[test]
    fn test_no_quantities_no_resources() {
        let mut container = Container::default();
        ContainerTrait::default().configure_resources("orders", &mut container);
        assert!(container.resources.is_none());
    }

    #[test]
    fn test_knative_env_rewrite() {
        let literal = EnvVar {
            name: "A".to_string(),
            value: Some("1".to_string()),
            value_from: None,
        };
        assert_eq!(knative_env_var(&literal, "prod"), Some(literal.clone()));

        let ns = envvar::from_field("NS", "metadata.namespace");
        let rewritten = knative_env_var(&ns, "prod").unwrap();
        assert_eq!(rewritten.value.as_deref(), Some("prod"));
        assert!(rewritten.value_from.is_none());

        let pod = envvar::from_field("POD", "metadata.name");
        assert!(knative_env_var(&pod, "prod").is_none());

        let limit = EnvVar {
            name: "LIMIT".to_string(),
            value: None,
            value_from: Some(EnvVarSource {
                resource_field_ref: Some(ResourceFieldSelector {
                    resource: "limits.memory".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        };
        assert!(knative_env_var(&limit, "prod").is_none());
    }

    #[test]
    fn test_pull_policy_round_trip_names() {
        assert_eq!("Never".parse::<PullPolicy>(), Ok(PullPolicy::Never));
        assert_eq!(PullPolicy::IfNotPresent.to_string(), "IfNotPresent");
        assert!("always".parse::<PullPolicy>().is_err());
    }
}
