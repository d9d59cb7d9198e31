//! Render command - run the trait pipeline over an Integration offline
//!
//! Usage: kiln render -f integration.yaml [--platform p.yaml] [--kit k.yaml]
//!        [--shape deployment|knative-service|cron-job] [--service]
//!
//! The command seeds the workload shape (and optionally the integration's
//! Service) the way the deployment traits would, runs every trait in order,
//! and prints the produced resources followed by the updated Integration as
//! a multi-document YAML stream.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::batch::v1::{CronJob, CronJobSpec, JobSpec, JobTemplateSpec};
use k8s_openapi::api::core::v1::{PodSpec, PodTemplateSpec, Service, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kiln_common::crd::{Integration, IntegrationKit, IntegrationPhase, IntegrationPlatform};
use kiln_common::{OperatorConfig, LABEL_INTEGRATION};
use kiln_trait::{
    ContainerTrait, Environment, KnativeService, Resource, Resources, Trait, Workload,
};
use kube::ResourceExt;
use tracing::{debug, info};

use super::load_yaml;
use crate::Result;

/// Workload shape to seed before running the traits
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Shape {
    /// apps/v1 Deployment
    #[default]
    Deployment,
    /// Knative Serving Service
    KnativeService,
    /// batch/v1 CronJob
    CronJob,
}

/// Render an Integration into Kubernetes resources
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Path to the Integration manifest
    #[arg(short = 'f', long = "filename")]
    pub filename: PathBuf,

    /// Path to an IntegrationPlatform manifest providing base configuration
    #[arg(long)]
    pub platform: Option<PathBuf>,

    /// Path to the IntegrationKit manifest the integration runs from
    #[arg(long)]
    pub kit: Option<PathBuf>,

    /// Workload shape to deploy the integration as
    #[arg(long, value_enum, default_value_t = Shape::Deployment)]
    pub shape: Shape,

    /// Also produce a Service for the integration
    #[arg(long)]
    pub service: bool,

    /// Schedule used for the cron-job shape
    #[arg(long, default_value = "0 * * * *")]
    pub schedule: String,

    /// Operator identity stamped on created kits
    #[arg(long, env = "KILN_OPERATOR_ID")]
    pub operator_id: Option<String>,
}

pub fn run(args: RenderArgs) -> Result<()> {
    let output = render(&args)?;
    print!("{output}");
    Ok(())
}

/// Run a full pass and return the YAML stream
pub fn render(args: &RenderArgs) -> Result<String> {
    let mut integration: Integration = load_yaml("Integration", &args.filename)?;
    if integration.phase() == IntegrationPhase::None {
        debug!(
            integration = %integration.name_any(),
            "integration has no phase, rendering as Initialization"
        );
        integration.status_mut().phase = IntegrationPhase::Initialization;
    }

    let mut operator = OperatorConfig::from_env();
    if let Some(id) = args.operator_id.as_deref().filter(|id| !id.trim().is_empty()) {
        operator = operator.with_operator_id(id);
    }

    let resources = seed_resources(&integration, args);
    let mut env = Environment::new(integration)
        .with_resources(resources)
        .with_operator(operator);
    if let Some(path) = &args.platform {
        env = env.with_platform(load_yaml::<IntegrationPlatform>("IntegrationPlatform", path)?);
    }
    if let Some(path) = &args.kit {
        env = env.with_integration_kit(load_yaml::<IntegrationKit>("IntegrationKit", path)?);
    }

    let traits = default_traits(&env.integration)?;
    run_pass(&mut env, traits)?;
    to_yaml_stream(&env)
}

/// The traits taking part in every pass
pub fn default_traits(integration: &Integration) -> Result<Vec<Box<dyn Trait>>> {
    let container: Box<dyn Trait> = Box::new(ContainerTrait::from_integration(integration)?);
    Ok(vec![container])
}

/// Configure and apply traits in ascending order, ties broken by id.
///
/// The first error aborts the pass.
pub fn run_pass(env: &mut Environment, mut traits: Vec<Box<dyn Trait>>) -> Result<()> {
    traits.sort_by_key(|t| (t.order(), t.id()));

    for t in traits.iter_mut() {
        if !t.configure(env)? {
            debug!(trait_id = t.id(), "trait not enabled for this pass");
            continue;
        }
        info!(
            integration = %env.integration_name(),
            trait_id = t.id(),
            order = t.order(),
            "applying trait"
        );
        t.apply(env)?;
    }
    Ok(())
}

/// Seed the workload shape and optional Service for an integration
pub fn seed_resources(integration: &Integration, args: &RenderArgs) -> Resources {
    let name = integration.name_any();
    let namespace = integration.namespace();
    let labels = BTreeMap::from([(LABEL_INTEGRATION.to_string(), name.clone())]);
    let metadata = ObjectMeta {
        name: Some(name.clone()),
        namespace: namespace.clone(),
        labels: Some(labels.clone()),
        ..Default::default()
    };

    let mut resources = match args.shape {
        Shape::Deployment => Resources::new().with_workload(Deployment {
            metadata: metadata.clone(),
            spec: Some(DeploymentSpec {
                selector: LabelSelector {
                    match_labels: Some(labels.clone()),
                    ..Default::default()
                },
                template: pod_template(&labels, None),
                ..Default::default()
            }),
            ..Default::default()
        }),
        Shape::KnativeService => Resources::new().with_workload(KnativeService::new(
            &name,
            namespace.as_deref().unwrap_or_default(),
            labels.clone(),
        )),
        Shape::CronJob => Resources::new().with_workload(CronJob {
            metadata: metadata.clone(),
            spec: Some(CronJobSpec {
                schedule: args.schedule.clone(),
                job_template: JobTemplateSpec {
                    metadata: None,
                    spec: Some(JobSpec {
                        template: pod_template(&labels, Some("Never")),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }),
    };

    if args.service {
        resources.add(Service {
            metadata,
            spec: Some(ServiceSpec {
                selector: Some(labels),
                ..Default::default()
            }),
            ..Default::default()
        });
    }
    resources
}

fn pod_template(labels: &BTreeMap<String, String>, restart_policy: Option<&str>) -> PodTemplateSpec {
    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(labels.clone()),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            restart_policy: restart_policy.map(str::to_string),
            ..Default::default()
        }),
    }
}

/// Workload, auxiliary resources, then the Integration, as YAML documents
pub fn to_yaml_stream(env: &Environment) -> Result<String> {
    let mut docs = Vec::new();
    if let Some(workload) = env.resources.workload() {
        docs.push(match workload {
            Workload::Deployment(d) => serde_yaml::to_string(d)?,
            Workload::KnativeService(k) => serde_yaml::to_string(k)?,
            Workload::CronJob(c) => serde_yaml::to_string(c)?,
        });
    }
    for item in env.resources.items() {
        docs.push(match item {
            Resource::Service(s) => serde_yaml::to_string(s)?,
            Resource::IntegrationKit(k) => serde_yaml::to_string(k)?,
            Resource::ConfigMap(c) => serde_yaml::to_string(c)?,
        });
    }
    docs.push(serde_yaml::to_string(&env.integration)?);
    Ok(docs.join("---\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::EnvVar;
    use kiln_common::crd::IntegrationSpec;
    use kiln_trait::envvar;

    /// Records its id into the env vars when applied
    struct Marker {
        id: &'static str,
        order: i32,
        enabled: bool,
    }

    impl Trait for Marker {
        fn id(&self) -> &'static str {
            self.id
        }

        fn order(&self) -> i32 {
            self.order
        }

        fn configure(&mut self, _env: &Environment) -> kiln_common::Result<bool> {
            Ok(self.enabled)
        }

        fn apply(&mut self, env: &mut Environment) -> kiln_common::Result<()> {
            env.env_vars.push(EnvVar {
                name: self.id.to_string(),
                ..Default::default()
            });
            Ok(())
        }
    }

    fn marker(id: &'static str, order: i32) -> Box<dyn Trait> {
        Box::new(Marker {
            id,
            order,
            enabled: true,
        })
    }

    fn args(shape: Shape, service: bool) -> RenderArgs {
        RenderArgs {
            filename: PathBuf::from("integration.yaml"),
            platform: None,
            kit: None,
            shape,
            service,
            schedule: "*/5 * * * *".to_string(),
            operator_id: None,
        }
    }

    fn integration() -> Integration {
        let mut it = Integration::new("orders", IntegrationSpec::default());
        it.metadata.namespace = Some("prod".to_string());
        it
    }

    #[test]
    fn test_pass_runs_in_ascending_order_ties_by_id() {
        let mut env = Environment::new(integration());
        let traits = vec![
            marker("owner", 2500),
            marker("container", 1600),
            marker("b-trait", 100),
            marker("a-trait", 100),
        ];

        run_pass(&mut env, traits).unwrap();

        let applied: Vec<&str> = env.env_vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(applied, vec!["a-trait", "b-trait", "container", "owner"]);
    }

    #[test]
    fn test_pass_skips_disabled_traits() {
        let mut env = Environment::new(integration());
        let traits: Vec<Box<dyn Trait>> = vec![
            marker("on", 1),
            Box::new(Marker {
                id: "off",
                order: 2,
                enabled: false,
            }) as Box<dyn Trait>,
        ];

        run_pass(&mut env, traits).unwrap();
        assert!(envvar::get(&env.env_vars, "on").is_some());
        assert!(envvar::get(&env.env_vars, "off").is_none());
    }

    #[test]
    fn test_seed_deployment_with_service() {
        let resources = seed_resources(&integration(), &args(Shape::Deployment, true));

        let Some(Workload::Deployment(deployment)) = resources.workload() else {
            panic!("expected deployment");
        };
        assert_eq!(deployment.metadata.name.as_deref(), Some("orders"));
        let selector = deployment.spec.as_ref().unwrap().selector.match_labels.as_ref();
        assert_eq!(selector.unwrap()[LABEL_INTEGRATION], "orders");
        assert!(resources.service_for_integration("orders").is_some());
    }

    #[test]
    fn test_seed_cron_job() {
        let resources = seed_resources(&integration(), &args(Shape::CronJob, false));

        let Some(Workload::CronJob(cron)) = resources.workload() else {
            panic!("expected cron job");
        };
        let spec = cron.spec.as_ref().unwrap();
        assert_eq!(spec.schedule, "*/5 * * * *");
        let pod = spec
            .job_template
            .spec
            .as_ref()
            .and_then(|j| j.template.spec.as_ref())
            .unwrap();
        assert_eq!(pod.restart_policy.as_deref(), Some("Never"));
        assert_eq!(resources.services().count(), 0);
    }

    #[test]
    fn test_seed_knative_service() {
        let resources = seed_resources(&integration(), &args(Shape::KnativeService, false));
        assert_eq!(resources.workload().map(|w| w.kind()), Some("KnativeService"));
        assert_eq!(resources.workload().and_then(|w| w.name()), Some("orders"));
    }

    #[test]
    fn test_default_traits_contains_container() {
        let traits = default_traits(&integration()).unwrap();
        assert_eq!(traits.len(), 1);
        assert_eq!(traits[0].id(), "container");
        assert!(traits[0].is_platform_trait());
    }
}
