//! Tenant descriptor model.
//!
//! A tenant descriptor declares one database tenant: the login role, the
//! database it owns and the optional schema, search path and extensions
//! created inside that database. Descriptors are read-only snapshots taken
//! from the informer cache; the operator never mutates a spec.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespaced name identifying a watched resource.
///
/// # Examples
/// ```
/// use operator::domain::ResourceKey;
///
/// let key = ResourceKey::new("tenants", "billing");
/// assert_eq!(key.to_string(), "tenants/billing");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Namespace the resource lives in.
    pub namespace: String,
    /// Resource name, unique within its namespace.
    pub name: String,
}

impl ResourceKey {
    /// Build a key from a namespace and a name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Desired state of a database tenant.
///
/// Field names follow the flat resource schema (`password-secrets`,
/// `user-search-path`, ...). Unset optional fields are omitted when
/// serialised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TenantSpec {
    /// Server identifier; only the operator targeting this host acts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Login role name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Database name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Name of the credential holder carrying the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secrets: Option<String>,
    /// Key of the password entry inside the credential holder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_key: Option<String>,
    /// Schema created inside the database, owned by the role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Extensions created inside the database, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    /// Literal `SEARCH_PATH` value applied to the role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_search_path: Option<String>,
}

/// Snapshot of one tenant resource as observed by the informer.
///
/// `spec` is `None` for a freshly created resource whose body has not been
/// populated yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantDescriptor {
    /// Namespaced name of the descriptor.
    pub key: ResourceKey,
    /// Metadata generation the snapshot was taken at.
    pub generation: Option<i64>,
    /// Desired state, when present.
    pub spec: Option<TenantSpec>,
}

impl TenantDescriptor {
    /// Build a descriptor with a populated spec.
    pub fn new(key: ResourceKey, spec: TenantSpec) -> Self {
        Self {
            key,
            generation: None,
            spec: Some(spec),
        }
    }

    /// Build a descriptor that has no body yet.
    pub fn without_spec(key: ResourceKey) -> Self {
        Self {
            key,
            generation: None,
            spec: None,
        }
    }

    /// Attach the metadata generation.
    #[must_use]
    pub fn with_generation(mut self, generation: i64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Credential holder this descriptor depends on, in its own namespace.
    ///
    /// # Examples
    /// ```
    /// use operator::domain::{ResourceKey, TenantDescriptor, TenantSpec};
    ///
    /// let spec = TenantSpec {
    ///     password_secrets: Some("billing-db".to_owned()),
    ///     ..TenantSpec::default()
    /// };
    /// let descriptor = TenantDescriptor::new(ResourceKey::new("tenants", "billing"), spec);
    /// assert_eq!(
    ///     descriptor.credential_dependency(),
    ///     Some(ResourceKey::new("tenants", "billing-db"))
    /// );
    /// ```
    pub fn credential_dependency(&self) -> Option<ResourceKey> {
        let holder = self.spec.as_ref()?.password_secrets.as_deref()?;
        if holder.is_empty() {
            return None;
        }
        Some(ResourceKey::new(self.key.namespace.as_str(), holder))
    }
}
