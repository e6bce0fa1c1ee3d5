//! Port abstraction for reading tenant descriptors.

use crate::domain::{ResourceKey, TenantDescriptor};

use super::define_port_error;

define_port_error! {
    /// Errors raised when reading tenant descriptors.
    pub enum TenantStoreError {
        /// The backing cache cannot be read.
        Unavailable { message: String } =>
            "tenant store unavailable: {message}",
    }
}

/// Port for reading the current descriptor set.
pub trait TenantStore: Send + Sync {
    /// Fetch the current snapshot of one descriptor.
    fn tenant(&self, key: &ResourceKey) -> Result<Option<TenantDescriptor>, TenantStoreError>;

    /// List every descriptor currently observed in `namespace`.
    fn tenants_in(&self, namespace: &str) -> Result<Vec<TenantDescriptor>, TenantStoreError>;
}
