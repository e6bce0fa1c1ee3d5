//! Resource events delivered by the watch stream.

use crate::domain::{CredentialHolder, ResourceKey, TenantDescriptor};

/// Change observed on a watched resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceEvent {
    /// A descriptor was added or modified.
    TenantApplied(TenantDescriptor),
    /// A descriptor was deleted.
    TenantDeleted(ResourceKey),
    /// A credential holder was added or modified.
    CredentialApplied(CredentialHolder),
    /// A credential holder was deleted.
    CredentialDeleted(ResourceKey),
}

impl ResourceEvent {
    /// Namespaced name of the resource the event is about.
    pub fn key(&self) -> &ResourceKey {
        match self {
            Self::TenantApplied(descriptor) => &descriptor.key,
            Self::CredentialApplied(holder) => &holder.key,
            Self::TenantDeleted(key) | Self::CredentialDeleted(key) => key,
        }
    }
}

/// Whether `event` may schedule a reconciliation.
///
/// Add and update events for descriptors without a body are dropped; every
/// other event is admitted.
///
/// # Examples
/// ```
/// use operator::domain::{ResourceKey, TenantDescriptor};
/// use operator::inbound::{ResourceEvent, admits};
///
/// let bodiless = TenantDescriptor::without_spec(ResourceKey::new("ns", "t"));
/// assert!(!admits(&ResourceEvent::TenantApplied(bodiless)));
/// assert!(admits(&ResourceEvent::TenantDeleted(ResourceKey::new("ns", "t"))));
/// ```
pub fn admits(event: &ResourceEvent) -> bool {
    match event {
        ResourceEvent::TenantApplied(descriptor) => descriptor.spec.is_some(),
        ResourceEvent::TenantDeleted(_)
        | ResourceEvent::CredentialApplied(_)
        | ResourceEvent::CredentialDeleted(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TenantSpec;
    use rstest::rstest;
    use std::collections::BTreeMap;

    #[rstest]
    fn descriptors_with_a_body_are_admitted() {
        let descriptor =
            TenantDescriptor::new(ResourceKey::new("ns", "t"), TenantSpec::default());
        assert!(admits(&ResourceEvent::TenantApplied(descriptor)));
    }

    #[rstest]
    fn credential_events_are_always_admitted() {
        let key = ResourceKey::new("ns", "secret");
        let holder = CredentialHolder::new(key.clone(), BTreeMap::new());

        assert!(admits(&ResourceEvent::CredentialApplied(holder)));
        assert!(admits(&ResourceEvent::CredentialDeleted(key.clone())));
        assert_eq!(ResourceEvent::CredentialDeleted(key.clone()).key(), &key);
    }
}
