//! Correlation between credential holders and tenant descriptors.
//!
//! The index is rebuilt from the live descriptor set on every holder event.
//! Descriptors can switch to another holder between reconciliations, so a
//! retained graph would route events to stale dependants.

use std::collections::{BTreeMap, BTreeSet};

use super::tenant::{ResourceKey, TenantDescriptor};

/// Reverse lookup from credential holder to dependent descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialIndex {
    dependants: BTreeMap<ResourceKey, BTreeSet<ResourceKey>>,
}

impl CredentialIndex {
    /// Scan `descriptors` and group them by the holder they reference.
    ///
    /// Descriptors without a body or without a holder name are ignored.
    pub fn from_descriptors<'a>(
        descriptors: impl IntoIterator<Item = &'a TenantDescriptor>,
    ) -> Self {
        let mut dependants: BTreeMap<ResourceKey, BTreeSet<ResourceKey>> = BTreeMap::new();
        for descriptor in descriptors {
            if let Some(holder) = descriptor.credential_dependency() {
                dependants
                    .entry(holder)
                    .or_default()
                    .insert(descriptor.key.clone());
            }
        }
        Self { dependants }
    }

    /// Descriptors referencing `holder`; empty when none do.
    pub fn dependants_of(&self, holder: &ResourceKey) -> BTreeSet<ResourceKey> {
        self.dependants.get(holder).cloned().unwrap_or_default()
    }

    /// Whether no descriptor references any holder.
    pub fn is_empty(&self) -> bool {
        self.dependants.is_empty()
    }
}

/// Tenant keys to reconcile after `holder` changed.
///
/// # Examples
/// ```
/// use operator::domain::{ResourceKey, TenantDescriptor, TenantSpec, tenants_depending_on};
///
/// let spec = TenantSpec {
///     password_secrets: Some("shared".to_owned()),
///     ..TenantSpec::default()
/// };
/// let descriptors = vec![TenantDescriptor::new(ResourceKey::new("ns", "a"), spec)];
///
/// let keys = tenants_depending_on(&ResourceKey::new("ns", "shared"), &descriptors);
/// assert!(keys.contains(&ResourceKey::new("ns", "a")));
/// ```
pub fn tenants_depending_on<'a>(
    holder: &ResourceKey,
    descriptors: impl IntoIterator<Item = &'a TenantDescriptor>,
) -> BTreeSet<ResourceKey> {
    CredentialIndex::from_descriptors(descriptors).dependants_of(holder)
}

#[cfg(test)]
mod tests {
    //! Holder-to-descriptor routing.

    use super::*;
    use crate::domain::TenantSpec;
    use rstest::rstest;

    fn descriptor(namespace: &str, name: &str, holder: Option<&str>) -> TenantDescriptor {
        let spec = TenantSpec {
            password_secrets: holder.map(str::to_owned),
            ..TenantSpec::default()
        };
        TenantDescriptor::new(ResourceKey::new(namespace, name), spec)
    }

    #[rstest]
    fn holder_fans_out_to_every_dependant() {
        let descriptors = vec![
            descriptor("ns", "a", Some("shared")),
            descriptor("ns", "b", Some("shared")),
            descriptor("ns", "c", Some("other")),
        ];

        let keys = tenants_depending_on(&ResourceKey::new("ns", "shared"), &descriptors);

        assert_eq!(
            keys,
            BTreeSet::from([ResourceKey::new("ns", "a"), ResourceKey::new("ns", "b")])
        );
    }

    #[rstest]
    fn holders_are_scoped_to_their_namespace() {
        let descriptors = vec![
            descriptor("ns-a", "tenant", Some("shared")),
            descriptor("ns-b", "tenant", Some("shared")),
        ];

        let keys = tenants_depending_on(&ResourceKey::new("ns-b", "shared"), &descriptors);

        assert_eq!(keys, BTreeSet::from([ResourceKey::new("ns-b", "tenant")]));
    }

    #[rstest]
    fn switched_reference_is_picked_up_on_rebuild() {
        let mut descriptors = vec![descriptor("ns", "a", Some("old"))];
        let old = ResourceKey::new("ns", "old");
        let new = ResourceKey::new("ns", "new");
        assert_eq!(tenants_depending_on(&old, &descriptors).len(), 1);

        descriptors = vec![descriptor("ns", "a", Some("new"))];

        assert!(tenants_depending_on(&old, &descriptors).is_empty());
        assert_eq!(tenants_depending_on(&new, &descriptors).len(), 1);
    }

    #[rstest]
    fn bodiless_and_unreferencing_descriptors_are_skipped() {
        let descriptors = vec![
            TenantDescriptor::without_spec(ResourceKey::new("ns", "fresh")),
            descriptor("ns", "loose", None),
        ];

        let index = CredentialIndex::from_descriptors(&descriptors);

        assert!(index.is_empty());
    }
}
