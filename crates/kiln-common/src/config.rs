//! Operator configuration
//!
//! Settings that identify the running operator instance. They are resolved
//! once at startup and handed to every build pass explicitly.

/// Environment variable holding the operator identity
pub const OPERATOR_ID_ENV: &str = "KILN_OPERATOR_ID";

/// Process-level configuration of the operator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Identity of this operator instance, stamped on resources it creates.
    /// `None` when the operator runs without an explicit identity.
    pub operator_id: Option<String>,
}

impl OperatorConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            operator_id: lookup(OPERATOR_ID_ENV).filter(|id| !id.trim().is_empty()),
        }
    }

    /// Override the operator identity
    pub fn with_operator_id(mut self, operator_id: impl Into<String>) -> Self {
        self.operator_id = Some(operator_id.into());
        self
    }
}
