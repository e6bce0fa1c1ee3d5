//! Operator settings loaded via OrthoConfig.
//!
//! Values are layered from defaults, a configuration file, environment
//! variables prefixed with `PG_TENANT_OPERATOR_` and command-line flags, then
//! validated once into the immutable values the core and adapters consume.

use std::fmt;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::domain::{DEFAULT_TARGET_HOST, OperatorConfig, Password};
use crate::inbound::ControllerConfig;
use crate::outbound::postgres::PostgresConnectionConfig;

const JDBC_PREFIX: &str = "jdbc:";
const DEFAULT_MAX_CONCURRENT_RECONCILES: usize = 4;

/// Raw operator settings.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PG_TENANT_OPERATOR")]
pub struct OperatorSettings {
    /// Host identifier this process reconciles.
    pub host: Option<String>,
    /// Grant each new tenant role to the administrative user.
    #[ortho_config(default = true)]
    pub grant_user_role_to_admin: bool,
    /// Administrative connection URL, optionally prefixed with `jdbc:`.
    pub admin_url: Option<String>,
    /// Administrative user; defaults to the user embedded in the URL.
    pub admin_username: Option<String>,
    /// Administrative password; overrides the one embedded in the URL.
    pub admin_password: Option<String>,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Upper bound on concurrent reconciliations.
    pub max_concurrent_reconciles: Option<usize>,
}

impl fmt::Debug for OperatorSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorSettings")
            .field("host", &self.host)
            .field("grant_user_role_to_admin", &self.grant_user_role_to_admin)
            .field("admin_url", &self.admin_url)
            .field("admin_username", &self.admin_username)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "<redacted>"),
            )
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("max_concurrent_reconciles", &self.max_concurrent_reconciles)
            .finish()
    }
}

/// Settings rejected before the control loop starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No administrative URL was supplied.
    #[error("admin_url is required")]
    MissingAdminUrl,
    /// The administrative URL cannot be parsed.
    #[error("admin_url is not a valid connection URL: {message}")]
    InvalidAdminUrl { message: String },
    /// The admin grant is enabled but no administrative user is known.
    #[error("admin_username is required when grant_user_role_to_admin is enabled")]
    MissingAdminUsername,
    /// The target host is blank.
    #[error("host must not be blank")]
    BlankHost,
    /// The concurrency bound is zero.
    #[error("max_concurrent_reconciles must be at least 1")]
    ZeroConcurrency,
}

/// Validated settings split by consumer.
#[derive(Debug, Clone)]
pub struct ValidatedSettings {
    /// Configuration for the reconciler and provisioner.
    pub operator: OperatorConfig,
    /// Administrative connection for the SQL adapter.
    pub connection: PostgresConnectionConfig,
    /// Dispatch limits for the controller.
    pub controller: ControllerConfig,
}

impl OperatorSettings {
    /// Return the configured host, falling back to the default.
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_TARGET_HOST)
    }

    /// Return the concurrency bound, falling back to the default.
    pub fn max_concurrent_reconciles(&self) -> usize {
        self.max_concurrent_reconciles
            .unwrap_or(DEFAULT_MAX_CONCURRENT_RECONCILES)
    }

    /// Check the settings and derive the values the operator runs with.
    pub fn validate(&self) -> Result<ValidatedSettings, ConfigError> {
        if self.host().trim().is_empty() {
            return Err(ConfigError::BlankHost);
        }
        if self.max_concurrent_reconciles() == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        let admin_url = self
            .admin_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingAdminUrl)?;
        let admin_url = strip_jdbc_prefix(admin_url);
        let parsed = Url::parse(admin_url).map_err(|err| ConfigError::InvalidAdminUrl {
            message: err.to_string(),
        })?;

        let admin_username = self
            .admin_username
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| Some(parsed.username()).filter(|name| !name.is_empty()));

        let mut operator = OperatorConfig::new(self.host());
        if self.grant_user_role_to_admin {
            let grantee = admin_username.ok_or(ConfigError::MissingAdminUsername)?;
            operator = operator.with_admin_grant(grantee);
        }

        let mut connection = PostgresConnectionConfig::new(admin_url);
        if let Some(user) = admin_username {
            connection = connection.with_admin_user(user);
        }
        if let Some(password) = self.admin_password.as_deref() {
            connection = connection.with_admin_password(Password::new(password));
        }
        if let Some(secs) = self.connect_timeout_secs {
            connection = connection.with_connect_timeout(Duration::from_secs(secs));
        }

        Ok(ValidatedSettings {
            operator,
            connection,
            controller: ControllerConfig {
                max_concurrent_reconciles: self.max_concurrent_reconciles(),
            },
        })
    }
}

fn strip_jdbc_prefix(url: &str) -> &str {
    url.strip_prefix(JDBC_PREFIX).unwrap_or(url)
}
