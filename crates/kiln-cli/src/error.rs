//! Error types for the CLI

use std::path::PathBuf;

use kiln_common::telemetry::TelemetryError;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Kiln(#[from] kiln_common::Error),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("cannot read {kind} from {path}: {message}")]
    InvalidInput {
        kind: &'static str,
        path: PathBuf,
        message: String,
    },
}

impl Error {
    pub fn invalid_input(
        kind: &'static str,
        path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Error::InvalidInput {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}
