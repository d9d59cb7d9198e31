//! Trait engine for Kiln integrations
//!
//! A build pass starts from an [`Environment`] holding the Integration, its
//! configuration layers, and the workload shape selected for it. Each
//! [`Trait`] is configured against the environment and, if enabled, applied
//! to it in ascending order. The result is the set of Kubernetes resources in
//! [`Resources`].

#![deny(missing_docs)]

pub mod container;
pub mod environment;
pub mod envvar;
pub mod knative;
pub mod legacy;
pub mod properties;
pub mod quantity;
pub mod resources;
pub mod traits;

pub use container::ContainerTrait;
pub use environment::{ConfigurationPair, Environment};
pub use knative::KnativeService;
pub use resources::{Resource, Resources, Workload};
pub use traits::{decode_trait_options, Trait};

/// Application properties file read by the runtime
pub const CONF_PATH: &str = "/etc/kiln/conf/application.properties";

/// Directory of additional configuration files
pub const CONF_D_PATH: &str = "/etc/kiln/conf.d";

/// Directory the integration sources are mounted in
pub const SOURCES_MOUNT_PATH: &str = "/etc/kiln/sources";

/// Key of the rendered properties in the application properties ConfigMap
pub const APPLICATION_PROPERTIES_FILE: &str = "application.properties";
