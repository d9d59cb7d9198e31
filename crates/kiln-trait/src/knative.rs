//! Knative Serving Service types
//!
//! Knative does not ship Rust bindings, so only the fields the trait engine
//! touches are modelled. The revision spec embeds a full `PodSpec`.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

/// API version for Knative Serving resources
pub const KNATIVE_SERVING_API_VERSION: &str = "serving.knative.dev/v1";

/// Knative Service kind
pub const KNATIVE_SERVICE_KIND: &str = "Service";

/// Knative Serving `Service`
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KnativeService {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Spec
    #[serde(default)]
    pub spec: KnativeServiceSpec,
}

/// Desired state of a Knative Service
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct KnativeServiceSpec {
    /// Template for revisions created by this service
    #[serde(default)]
    pub template: RevisionTemplateSpec,
}

/// Revision template
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RevisionTemplateSpec {
    /// Revision metadata (annotations drive autoscaling)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,
    /// Revision spec
    #[serde(default)]
    pub spec: RevisionSpec,
}

/// Revision spec: a pod spec plus serving knobs
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevisionSpec {
    /// Embedded pod spec
    #[serde(flatten)]
    pub pod_spec: PodSpec,
    /// Maximum concurrent requests per replica (0 = unlimited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_concurrency: Option<i64>,
    /// Request timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,
}

impl KnativeService {
    /// Create an empty Knative Service with the given name and labels
    pub fn new(name: &str, namespace: &str, labels: BTreeMap<String, String>) -> Self {
        Self {
            api_version: KNATIVE_SERVING_API_VERSION.to_string(),
            kind: KNATIVE_SERVICE_KIND.to_string(),
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: KnativeServiceSpec {
                template: RevisionTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: RevisionSpec::default(),
                },
            },
        }
    }

    /// Containers of the revision template
    pub fn containers(&self) -> &[Container] {
        &self.spec.template.spec.pod_spec.containers
    }

    /// Mutable containers of the revision template
    pub fn containers_mut(&mut self) -> &mut Vec<Container> {
        &mut self.spec.template.spec.pod_spec.containers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_type_meta() {
        let ksvc = KnativeService::new("orders", "prod", BTreeMap::new());
        assert_eq!(ksvc.api_version, KNATIVE_SERVING_API_VERSION);
        assert_eq!(ksvc.kind, "Service");
        assert_eq!(ksvc.metadata.name.as_deref(), Some("orders"));
        assert!(ksvc.containers().is_empty());
    }

    #[test]
    fn test_pod_spec_is_flattened() {
        let mut ksvc = KnativeService::new("orders", "prod", BTreeMap::new());
        ksvc.containers_mut().push(Container {
            name: "integration".to_string(),
            ..Default::default()
        });
        ksvc.spec.template.spec.container_concurrency = Some(10);

        let json = serde_json::to_value(&ksvc).unwrap();
        let spec = &json["spec"]["template"]["spec"];
        assert_eq!(spec["containers"][0]["name"], "integration");
        assert_eq!(spec["containerConcurrency"], 10);
    }

    #[test]
    fn test_parse_from_yaml() {
        let yaml = r#"
apiVersion: serving.knative.dev/v1
kind: Service
metadata:
  name: greeter
spec:
  template:
    spec:
      timeoutSeconds: 30
      containers:
        - name: integration
          image: registry.example.com/greeter:1
"#;
        let ksvc: KnativeService = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(ksvc.containers().len(), 1);
        assert_eq!(
            ksvc.containers()[0].image.as_deref(),
            Some("registry.example.com/greeter:1")
        );
        assert_eq!(ksvc.spec.template.spec.timeout_seconds, Some(30));
    }
}
