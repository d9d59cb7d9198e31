//! Resources produced during a build pass
//!
//! A pass carries at most one primary workload (the "shape" the integration
//! is deployed as) plus any number of auxiliary resources. The shape is an
//! enum so code that acts on it matches exhaustively.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{ConfigMap, Container, Service};
use kiln_common::crd::IntegrationKit;
use kiln_common::LABEL_INTEGRATION;
use kube::ResourceExt;

use crate::knative::KnativeService;

// =============================================================================
// Workload
// =============================================================================

/// Primary workload shape of an integration
#[derive(Clone, Debug)]
pub enum Workload {
    /// Long-running `apps/v1` Deployment
    Deployment(Deployment),
    /// Knative Serving Service
    KnativeService(KnativeService),
    /// Scheduled `batch/v1` CronJob
    CronJob(CronJob),
}

impl Workload {
    /// Kubernetes kind of the workload
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Deployment(_) => "Deployment",
            Self::KnativeService(_) => "KnativeService",
            Self::CronJob(_) => "CronJob",
        }
    }

    /// Object name of the workload
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Deployment(d) => d.metadata.name.as_deref(),
            Self::KnativeService(k) => k.metadata.name.as_deref(),
            Self::CronJob(c) => c.metadata.name.as_deref(),
        }
    }

    /// Containers of the workload's pod template
    pub fn containers(&self) -> &[Container] {
        match self {
            Self::Deployment(d) => d
                .spec
                .as_ref()
                .and_then(|s| s.template.spec.as_ref())
                .map(|p| p.containers.as_slice())
                .unwrap_or_default(),
            Self::KnativeService(k) => k.containers(),
            Self::CronJob(c) => c
                .spec
                .as_ref()
                .and_then(|s| s.job_template.spec.as_ref())
                .and_then(|j| j.template.spec.as_ref())
                .map(|p| p.containers.as_slice())
                .unwrap_or_default(),
        }
    }

    /// Mutable containers of the pod template, creating empty specs as needed
    pub fn containers_mut(&mut self) -> &mut Vec<Container> {
        match self {
            Self::Deployment(d) => {
                &mut d
                    .spec
                    .get_or_insert_with(Default::default)
                    .template
                    .spec
                    .get_or_insert_with(Default::default)
                    .containers
            }
            Self::KnativeService(k) => k.containers_mut(),
            Self::CronJob(c) => {
                &mut c
                    .spec
                    .get_or_insert_with(Default::default)
                    .job_template
                    .spec
                    .get_or_insert_with(Default::default)
                    .template
                    .spec
                    .get_or_insert_with(Default::default)
                    .containers
            }
        }
    }
}

impl From<Deployment> for Workload {
    fn from(d: Deployment) -> Self {
        Self::Deployment(d)
    }
}

impl From<KnativeService> for Workload {
    fn from(k: KnativeService) -> Self {
        Self::KnativeService(k)
    }
}

impl From<CronJob> for Workload {
    fn from(c: CronJob) -> Self {
        Self::CronJob(c)
    }
}

// =============================================================================
// Auxiliary resources
// =============================================================================

/// Auxiliary resource emitted alongside the workload
#[derive(Clone, Debug)]
pub enum Resource {
    /// Kubernetes Service exposing the integration
    Service(Service),
    /// IntegrationKit created for an externally built image
    IntegrationKit(IntegrationKit),
    /// ConfigMap carrying application properties
    ConfigMap(ConfigMap),
}

impl Resource {
    /// Kubernetes kind of the resource
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Service(_) => "Service",
            Self::IntegrationKit(_) => "IntegrationKit",
            Self::ConfigMap(_) => "ConfigMap",
        }
    }
}

impl From<Service> for Resource {
    fn from(s: Service) -> Self {
        Self::Service(s)
    }
}

impl From<IntegrationKit> for Resource {
    fn from(k: IntegrationKit) -> Self {
        Self::IntegrationKit(k)
    }
}

impl From<ConfigMap> for Resource {
    fn from(c: ConfigMap) -> Self {
        Self::ConfigMap(c)
    }
}

// =============================================================================
// Resource set
// =============================================================================

/// All resources of a build pass, in insertion order
#[derive(Clone, Debug, Default)]
pub struct Resources {
    workload: Option<Workload>,
    items: Vec<Resource>,
}

impl Resources {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: seed the primary workload
    pub fn with_workload(mut self, workload: impl Into<Workload>) -> Self {
        self.workload = Some(workload.into());
        self
    }

    /// Install the primary workload, returning the one it replaces
    pub fn set_workload(&mut self, workload: impl Into<Workload>) -> Option<Workload> {
        self.workload.replace(workload.into())
    }

    /// The primary workload, if any
    pub fn workload(&self) -> Option<&Workload> {
        self.workload.as_ref()
    }

    /// Mutable primary workload, if any
    pub fn workload_mut(&mut self) -> Option<&mut Workload> {
        self.workload.as_mut()
    }

    /// Append an auxiliary resource
    pub fn add(&mut self, resource: impl Into<Resource>) {
        self.items.push(resource.into());
    }

    /// Auxiliary resources in insertion order
    pub fn items(&self) -> &[Resource] {
        &self.items
    }

    /// Number of auxiliary resources
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there is neither a workload nor any auxiliary resource
    pub fn is_empty(&self) -> bool {
        self.workload.is_none() && self.items.is_empty()
    }

    /// Services in the set
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.items.iter().filter_map(|r| match r {
            Resource::Service(s) => Some(s),
            _ => None,
        })
    }

    /// IntegrationKits in the set
    pub fn integration_kits(&self) -> impl Iterator<Item = &IntegrationKit> {
        self.items.iter().filter_map(|r| match r {
            Resource::IntegrationKit(k) => Some(k),
            _ => None,
        })
    }

    /// ConfigMaps in the set
    pub fn config_maps(&self) -> impl Iterator<Item = &ConfigMap> {
        self.items.iter().filter_map(|r| match r {
            Resource::ConfigMap(c) => Some(c),
            _ => None,
        })
    }

    /// The Service labelled as belonging to the named integration
    pub fn service_for_integration(&self, integration: &str) -> Option<&Service> {
        self.services()
            .find(|s| belongs_to(s.labels().get(LABEL_INTEGRATION), integration))
    }

    /// Mutable variant of [`Resources::service_for_integration`]
    pub fn service_for_integration_mut(&mut self, integration: &str) -> Option<&mut Service> {
        self.items.iter_mut().find_map(|r| match r {
            Resource::Service(s) if belongs_to(s.labels().get(LABEL_INTEGRATION), integration) => {
                Some(s)
            }
            _ => None,
        })
    }

    /// Run `visit` on the workload if it is a Deployment.
    ///
    /// Returns whether the visitor ran.
    pub fn visit_deployment<E>(
        &mut self,
        visit: impl FnOnce(&mut Deployment) -> Result<(), E>,
    ) -> Result<bool, E> {
        match self.workload.as_mut() {
            Some(Workload::Deployment(d)) => visit(d).map(|()| true),
            _ => Ok(false),
        }
    }

    /// Run `visit` on the workload if it is a Knative Service
    pub fn visit_knative_service<E>(
        &mut self,
        visit: impl FnOnce(&mut KnativeService) -> Result<(), E>,
    ) -> Result<bool, E> {
        match self.workload.as_mut() {
            Some(Workload::KnativeService(k)) => visit(k).map(|()| true),
            _ => Ok(false),
        }
    }

    /// Run `visit` on the workload if it is a CronJob
    pub fn visit_cron_job<E>(
        &mut self,
        visit: impl FnOnce(&mut CronJob) -> Result<(), E>,
    ) -> Result<bool, E> {
        match self.workload.as_mut() {
            Some(Workload::CronJob(c)) => visit(c).map(|()| true),
            _ => Ok(false),
        }
    }
}

fn belongs_to(label: Option<&String>, integration: &str) -> bool {
    label.is_some_and(|value| value == integration)
}
