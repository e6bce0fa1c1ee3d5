//! Process-wide operator configuration injected into the core.

/// Target host reconciled when none is configured.
pub const DEFAULT_TARGET_HOST: &str = "postgresql";

/// Immutable configuration consumed by the reconciler and provisioner.
///
/// # Examples
/// ```
/// use operator::domain::OperatorConfig;
///
/// let config = OperatorConfig::new("postgresql").with_admin_grant("postgres");
/// assert_eq!(config.admin_grantee(), Some("postgres"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    target_host: String,
    admin_grantee: Option<String>,
}

impl OperatorConfig {
    /// Configuration for `target_host` without the admin role grant.
    pub fn new(target_host: impl Into<String>) -> Self {
        Self {
            target_host: target_host.into(),
            admin_grantee: None,
        }
    }

    /// Grant each new tenant role to `admin_username` before creating its
    /// database.
    #[must_use]
    pub fn with_admin_grant(mut self, admin_username: impl Into<String>) -> Self {
        self.admin_grantee = Some(admin_username.into());
        self
    }

    /// Host identifier this process is responsible for.
    pub fn target_host(&self) -> &str {
        self.target_host.as_str()
    }

    /// Administrative role receiving tenant role membership, if enabled.
    pub fn admin_grantee(&self) -> Option<&str> {
        self.admin_grantee.as_deref()
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_HOST)
    }
}
