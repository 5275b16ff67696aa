//! Explicit execution context passed to every page operation.

use quire_store::Reference;

/// Organization and environment a call runs in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionContext {
    pub organization_id: String,
    pub environment_id: String,
}

impl ExecutionContext {
    #[must_use]
    pub fn new(organization_id: impl Into<String>, environment_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            environment_id: environment_id.into(),
        }
    }

    /// Reference scope of the environment's portal documentation.
    #[must_use]
    pub fn portal_reference(&self) -> Reference {
        Reference::environment(&self.environment_id)
    }
}
