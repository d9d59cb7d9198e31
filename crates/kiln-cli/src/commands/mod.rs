//! CLI commands

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{Error, Result};

pub mod render;

/// Read a single YAML document of type `T` from `path`.
///
/// `kind` names the expected resource in error messages.
pub fn load_yaml<T: DeserializeOwned>(kind: &'static str, path: &Path) -> Result<T> {
    debug!(kind, path = %path.display(), "loading manifest");
    let content = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&content)
        .map_err(|e| Error::invalid_input(kind, path, e.to_string()))
}
