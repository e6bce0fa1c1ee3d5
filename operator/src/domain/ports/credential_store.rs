//! Port abstraction for reading credential holders.

use crate::domain::{CredentialHolder, ResourceKey};

use super::define_port_error;

define_port_error! {
    /// Errors raised when reading credential holders.
    pub enum CredentialStoreError {
        /// The backing cache cannot be read.
        Unavailable { message: String } =>
            "credential store unavailable: {message}",
    }
}

/// Port for looking up the credential holder a tenant depends on.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialStore: Send + Sync {
    /// Fetch the holder named by `key`; `None` when it is not observable yet.
    fn credential(&self, key: &ResourceKey)
    -> Result<Option<CredentialHolder>, CredentialStoreError>;
}

/// Fixture implementation that never observes a holder.
#[derive(Debug, Clone, Default)]
pub struct FixtureCredentialStore;

impl CredentialStore for FixtureCredentialStore {
    fn credential(
        &self,
        _key: &ResourceKey,
    ) -> Result<Option<CredentialHolder>, CredentialStoreError> {
        Ok(None)
    }
}
