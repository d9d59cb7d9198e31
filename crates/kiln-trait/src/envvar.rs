//! Helpers for ordered container environment variable lists
//!
//! Names are unique within a list. Setting an existing name replaces the
//! entry where it already sits, so the first-seen order is kept.

use k8s_openapi::api::core::v1::{EnvVar, EnvVarSource, ObjectFieldSelector};

/// Look up a variable by name
pub fn get<'a>(vars: &'a [EnvVar], name: &str) -> Option<&'a EnvVar> {
    vars.iter().find(|v| v.name == name)
}

/// Set a literal value, dropping any previous `valueFrom` source
pub fn set_val(vars: &mut Vec<EnvVar>, name: &str, value: impl Into<String>) {
    set_var(
        vars,
        EnvVar {
            name: name.to_string(),
            value: Some(value.into()),
            value_from: None,
        },
    );
}

/// Insert a variable, replacing an existing one with the same name in place
pub fn set_var(vars: &mut Vec<EnvVar>, var: EnvVar) {
    match vars.iter_mut().find(|v| v.name == var.name) {
        Some(existing) => *existing = var,
        None => vars.push(var),
    }
}

/// Build a variable sourced from a pod field (e.g., `metadata.namespace`)
pub fn from_field(name: &str, field_path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: None,
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: field_path.to_string(),
                api_version: None,
            }),
            ..Default::default()
        }),
    }
}
