//! Idempotent provisioning of a tenant's role, database and schema objects.
//!
//! Provisioning runs in two phases on two scoped sessions:
//!
//! 1. An administrative session creates or updates the role (the password is
//!    always rewritten, which is how rotation reaches the server) and creates
//!    the database or forces its owner back to the tenant role.
//! 2. A tenant session, opened on the tenant database with the tenant role
//!    and the new password, creates the schema, applies the search path and
//!    creates extensions.
//!
//! Statements are autocommitted. A failure aborts the remaining steps of its
//! phase without undoing earlier ones; the partial outcome is reported
//! through the tenant status.

pub mod statements;

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::ports::{SqlConnector, SqlSession, SqlSessionError};
use crate::domain::{OperatorConfig, Password, TenantSpec};

/// Failures raised while provisioning a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisioningError {
    /// A field required to provision is unset or blank.
    #[error("Tenant field '{field}' is mandatory. No value found!")]
    MissingField { field: &'static str },
    /// The server rejected a connection or statement.
    #[error(transparent)]
    Sql(#[from] SqlSessionError),
}

/// Whether a server object was created or brought back in line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// The object did not exist and was created.
    Created,
    /// The object existed and was updated.
    Updated,
}

/// What phase 1 did to the role and the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Outcome for the login role.
    pub role: Convergence,
    /// Outcome for the database.
    pub database: Convergence,
}

/// Converges live server state with a tenant spec.
#[cfg_attr(test, mockall::automock)]
pub trait TenantProvisioner: Send + Sync {
    /// Provision `spec` with `password` as the role's password.
    fn provision(
        &self,
        spec: &TenantSpec,
        password: &Password,
    ) -> Result<ProvisionReport, ProvisioningError>;
}

/// Validated view of the spec fields provisioning acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantPlan<'a> {
    /// Login role name.
    pub user: &'a str,
    /// Database name.
    pub database: &'a str,
    /// Schema to create, when set and non-blank.
    pub schema: Option<&'a str>,
    /// Search path to apply, when set and non-blank.
    pub search_path: Option<&'a str>,
    /// Extensions to create, in order.
    pub extensions: &'a [String],
}

impl<'a> TenantPlan<'a> {
    /// Extract the plan, rejecting specs without a user or database name.
    ///
    /// # Examples
    /// ```
    /// use operator::domain::{TenantPlan, TenantSpec};
    ///
    /// let spec = TenantSpec {
    ///     user: Some("billing".to_owned()),
    ///     name: Some("billing_db".to_owned()),
    ///     schema: Some("  ".to_owned()),
    ///     ..TenantSpec::default()
    /// };
    /// let plan = TenantPlan::from_spec(&spec).expect("plan is valid");
    /// assert_eq!(plan.database, "billing_db");
    /// assert!(plan.schema.is_none());
    /// ```
    pub fn from_spec(spec: &'a TenantSpec) -> Result<Self, ProvisioningError> {
        let user = non_blank(spec.user.as_deref())
            .ok_or(ProvisioningError::MissingField { field: "user" })?;
        let database = non_blank(spec.name.as_deref())
            .ok_or(ProvisioningError::MissingField { field: "name" })?;
        Ok(Self {
            user,
            database,
            schema: non_blank(spec.schema.as_deref()),
            search_path: non_blank(spec.user_search_path.as_deref()),
            extensions: spec.extensions.as_deref().unwrap_or_default(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

/// Session released, and its release logged, when it leaves scope.
struct ScopedSession {
    label: String,
    session: Box<dyn SqlSession>,
}

impl ScopedSession {
    fn open(label: String, session: Box<dyn SqlSession>) -> Self {
        info!(connection = %label, "Opened database connection");
        Self { label, session }
    }

    fn exists(&mut self, query: &str, name: &str) -> Result<bool, SqlSessionError> {
        self.session.exists(query, name)
    }

    fn execute(&mut self, statement: &str) -> Result<(), SqlSessionError> {
        self.session.execute(statement)
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        info!(connection = %self.label, "Closed database connection");
    }
}

/// [`TenantProvisioner`] issuing SQL through a [`SqlConnector`].
#[derive(Debug, Clone)]
pub struct SqlProvisioner<C> {
    connector: C,
    admin_grantee: Option<String>,
}

impl<C> SqlProvisioner<C> {
    /// Build a provisioner using the admin grant setting from `config`.
    pub fn new(connector: C, config: &OperatorConfig) -> Self {
        Self {
            connector,
            admin_grantee: config.admin_grantee().map(str::to_owned),
        }
    }
}

impl<C: SqlConnector> SqlProvisioner<C> {
    fn converge_role_and_database(
        &self,
        plan: &TenantPlan<'_>,
        password: &Password,
    ) -> Result<ProvisionReport, ProvisioningError> {
        let mut admin = ScopedSession::open("admin".to_owned(), self.connector.admin_session()?);

        let role_exists = admin.exists(statements::ROLE_EXISTS, plan.user)?;
        debug!(role = plan.user, exists = role_exists, "Checked role");
        let role = if role_exists {
            admin.execute(&statements::alter_role_password(plan.user, password))?;
            info!(role = plan.user, "Updated existing role");
            Convergence::Updated
        } else {
            admin.execute(&statements::create_role(plan.user, password))?;
            info!(role = plan.user, "Created role");
            Convergence::Created
        };

        let database_exists = admin.exists(statements::DATABASE_EXISTS, plan.database)?;
        debug!(
            database = plan.database,
            exists = database_exists,
            "Checked database"
        );
        let database = if database_exists {
            admin.execute(&statements::alter_database_owner(plan.database, plan.user))?;
            info!(database = plan.database, owner = plan.user, "Updated database owner");
            Convergence::Updated
        } else {
            if let Some(grantee) = self.admin_grantee.as_deref() {
                admin.execute(&statements::grant_role(plan.user, grantee))?;
                info!(role = plan.user, admin = grantee, "Granted role to admin");
            }
            admin.execute(&statements::create_database(plan.database, plan.user))?;
            info!(database = plan.database, owner = plan.user, "Created database");
            admin.execute(&statements::grant_database(plan.database, plan.user))?;
            info!(database = plan.database, role = plan.user, "Granted database to role");
            Convergence::Created
        };

        Ok(ProvisionReport { role, database })
    }

    fn converge_tenant_objects(
        &self,
        plan: &TenantPlan<'_>,
        password: &Password,
    ) -> Result<(), ProvisioningError> {
        let session = self
            .connector
            .tenant_session(plan.database, plan.user, password)?;
        let mut tenant = ScopedSession::open(format!("{}@{}", plan.user, plan.database), session);

        if let Some(schema) = plan.schema {
            tenant.execute(&statements::create_schema(schema, plan.user))?;
            info!(schema, owner = plan.user, "Created schema");
        }

        if let Some(search_path) = plan.search_path {
            tenant.execute(&statements::set_search_path(plan.user, search_path))?;
            info!(role = plan.user, search_path, "Updated role search path");
        }

        for extension in plan.extensions {
            tenant.execute(&statements::create_extension(extension))?;
        }
        if !plan.extensions.is_empty() {
            info!(extensions = ?plan.extensions, "Created extensions");
        }

        Ok(())
    }
}

impl<C: SqlConnector> TenantProvisioner for SqlProvisioner<C> {
    fn provision(
        &self,
        spec: &TenantSpec,
        password: &Password,
    ) -> Result<ProvisionReport, ProvisioningError> {
        let plan = TenantPlan::from_spec(spec)?;
        let report = self.converge_role_and_database(&plan, password)?;
        self.converge_tenant_objects(&plan, password)?;
        Ok(report)
    }
}
