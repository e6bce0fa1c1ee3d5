//! DTOs for decoding watch stream events.
//!
//! Events are decoded into these transport DTOs first, then mapped into
//! [`ResourceEvent`]s in one pass.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{CredentialHolder, ResourceKey, TenantDescriptor, TenantSpec};
use crate::inbound::ResourceEvent;

use super::WatchEventError;

const DEFAULT_NAMESPACE: &str = "default";

/// Resource kind carrying tenant descriptors.
pub(super) const TENANT_KIND: &str = "Database";
/// Resource kind carrying credential holders.
pub(super) const CREDENTIAL_KIND: &str = "Secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub(super) enum WatchEventType {
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Deserialize)]
pub(super) struct WatchEventDto {
    #[serde(rename = "type")]
    pub(super) event_type: WatchEventType,
    pub(super) object: Value,
}

#[derive(Debug, Deserialize)]
struct KindDto {
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectMetaDto {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    generation: Option<i64>,
}

impl ObjectMetaDto {
    fn key(&self) -> ResourceKey {
        let namespace = self
            .namespace
            .as_deref()
            .filter(|namespace| !namespace.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE);
        ResourceKey::new(namespace, self.name.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct DatabaseDto {
    metadata: ObjectMetaDto,
    #[serde(default)]
    spec: Option<TenantSpec>,
}

#[derive(Debug, Deserialize)]
struct SecretDto {
    metadata: ObjectMetaDto,
    #[serde(default)]
    data: BTreeMap<String, String>,
}

impl WatchEventDto {
    /// Map the event into a resource event; `Ok(None)` for unwatched kinds.
    pub(super) fn into_resource_event(self) -> Result<Option<ResourceEvent>, WatchEventError> {
        let kind = KindDto::deserialize(&self.object)
            .map_err(WatchEventError::Kind)?
            .kind
            .unwrap_or_default();
        let deleted = self.event_type == WatchEventType::Deleted;

        match kind.as_str() {
            TENANT_KIND => {
                let dto = DatabaseDto::deserialize(self.object)
                    .map_err(|source| WatchEventError::Object {
                        kind: TENANT_KIND,
                        source,
                    })?;
                let key = dto.metadata.key();
                if deleted {
                    return Ok(Some(ResourceEvent::TenantDeleted(key)));
                }
                Ok(Some(ResourceEvent::TenantApplied(TenantDescriptor {
                    key,
                    generation: dto.metadata.generation,
                    spec: dto.spec,
                })))
            }
            CREDENTIAL_KIND => {
                let dto = SecretDto::deserialize(self.object)
                    .map_err(|source| WatchEventError::Object {
                        kind: CREDENTIAL_KIND,
                        source,
                    })?;
                let key = dto.metadata.key();
                if deleted {
                    return Ok(Some(ResourceEvent::CredentialDeleted(key)));
                }
                Ok(Some(ResourceEvent::CredentialApplied(CredentialHolder::new(
                    key, dto.data,
                ))))
            }
            _ => Ok(None),
        }
    }
}
