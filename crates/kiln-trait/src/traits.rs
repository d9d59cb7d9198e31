//! The contract every trait implements
//!
//! A build pass configures each trait against the environment, then applies
//! the enabled ones in ascending [`Trait::order`].

use kiln_common::crd::Integration;
use kiln_common::{Error, Result};
use serde::de::DeserializeOwned;

use crate::environment::Environment;

/// A pluggable unit that shapes the resources of an integration
pub trait Trait: Send + Sync {
    /// Unique trait identifier, also its key under `spec.traits`
    fn id(&self) -> &'static str;

    /// Position in the pass; lower runs first
    fn order(&self) -> i32;

    /// Resolve options against the environment.
    ///
    /// Returns whether the trait should be applied in this pass.
    fn configure(&mut self, env: &Environment) -> Result<bool>;

    /// Mutate the environment. Any error aborts the pass.
    fn apply(&mut self, env: &mut Environment) -> Result<()>;

    /// Platform traits are always part of a pass, even if not listed
    fn is_platform_trait(&self) -> bool {
        false
    }
}

/// Decode `spec.traits[trait_id]` into the trait's option struct.
///
/// Missing options decode to `T::default()`. Keys the struct does not know
/// are ignored; a value of the wrong type is a validation error.
pub fn decode_trait_options<T>(integration: &Integration, trait_id: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(options) = integration.spec.traits.get(trait_id) else {
        return Ok(T::default());
    };
    let value = serde_json::Value::Object(
        options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    );
    serde_json::from_value(value)
        .map_err(|e| Error::validation(trait_id, format!("invalid options: {e}")))
}
