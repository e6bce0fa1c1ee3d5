//! In-memory informer cache fed by the watch stream.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::domain::ports::{
    CredentialStore, CredentialStoreError, InformerCache, InformerCacheError, TenantStore,
    TenantStoreError,
};
use crate::domain::{CredentialHolder, ResourceKey, TenantDescriptor};

/// Latest observed snapshot of every descriptor and credential holder.
#[derive(Debug, Default)]
pub struct InMemoryInformerCache {
    tenants: RwLock<BTreeMap<ResourceKey, TenantDescriptor>>,
    credentials: RwLock<BTreeMap<ResourceKey, CredentialHolder>>,
}

impl InMemoryInformerCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TenantStore for InMemoryInformerCache {
    fn tenant(&self, key: &ResourceKey) -> Result<Option<TenantDescriptor>, TenantStoreError> {
        let tenants = self.tenants.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tenants.get(key).cloned())
    }

    fn tenants_in(&self, namespace: &str) -> Result<Vec<TenantDescriptor>, TenantStoreError> {
        let tenants = self.tenants.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tenants
            .values()
            .filter(|descriptor| descriptor.key.namespace == namespace)
            .cloned()
            .collect())
    }
}

impl CredentialStore for InMemoryInformerCache {
    fn credential(
        &self,
        key: &ResourceKey,
    ) -> Result<Option<CredentialHolder>, CredentialStoreError> {
        let credentials = self
            .credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(credentials.get(key).cloned())
    }
}

impl InformerCache for InMemoryInformerCache {
    fn apply_tenant(&self, descriptor: TenantDescriptor) -> Result<(), InformerCacheError> {
        let mut tenants = self.tenants.write().unwrap_or_else(PoisonError::into_inner);
        tenants.insert(descriptor.key.clone(), descriptor);
        Ok(())
    }

    fn remove_tenant(
        &self,
        key: &ResourceKey,
    ) -> Result<Option<TenantDescriptor>, InformerCacheError> {
        let mut tenants = self.tenants.write().unwrap_or_else(PoisonError::into_inner);
        Ok(tenants.remove(key))
    }

    fn apply_credential(&self, holder: CredentialHolder) -> Result<(), InformerCacheError> {
        let mut credentials = self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        credentials.insert(holder.key.clone(), holder);
        Ok(())
    }

    fn remove_credential(
        &self,
        key: &ResourceKey,
    ) -> Result<Option<CredentialHolder>, InformerCacheError> {
        let mut credentials = self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(credentials.remove(key))
    }
}
