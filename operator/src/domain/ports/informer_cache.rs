//! Port abstraction for the informer cache fed by watch events.

use crate::domain::{CredentialHolder, ResourceKey, TenantDescriptor};

use super::{CredentialStore, TenantStore, define_port_error};

define_port_error! {
    /// Errors raised when the informer cache cannot be updated.
    pub enum InformerCacheError {
        /// The cache is unusable.
        Unavailable { message: String } =>
            "informer cache unavailable: {message}",
    }
}

/// Read-through cache of the watched descriptors and credential holders.
///
/// The inbound controller keeps it current from watch events; the
/// reconciler reads it through [`TenantStore`] and [`CredentialStore`].
pub trait InformerCache: TenantStore + CredentialStore {
    /// Insert or replace a descriptor snapshot.
    fn apply_tenant(&self, descriptor: TenantDescriptor) -> Result<(), InformerCacheError>;

    /// Forget a descriptor, returning the last snapshot.
    fn remove_tenant(
        &self,
        key: &ResourceKey,
    ) -> Result<Option<TenantDescriptor>, InformerCacheError>;

    /// Insert or replace a credential holder.
    fn apply_credential(&self, holder: CredentialHolder) -> Result<(), InformerCacheError>;

    /// Forget a credential holder, returning the last snapshot.
    fn remove_credential(
        &self,
        key: &ResourceKey,
    ) -> Result<Option<CredentialHolder>, InformerCacheError>;
}
