//! PostgreSQL adapter for the SQL session ports.
//!
//! Uses the synchronous `postgres` client. Callers run provisioning on
//! blocking worker threads, so every session owns a private connection that
//! is closed when the session is dropped.

use std::time::Duration;

use postgres::{Client, Config, NoTls};
use tracing::debug;

use crate::domain::ports::{SqlConnector, SqlSession, SqlSessionError};
use crate::domain::{Password, retarget_database};

/// Connection settings for the administrative role.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use operator::outbound::postgres::PostgresConnectionConfig;
///
/// let config = PostgresConnectionConfig::new("postgresql://pg.internal:5432/postgres")
///     .with_admin_user("postgres")
///     .with_connect_timeout(Duration::from_secs(5));
/// assert_eq!(config.admin_url(), "postgresql://pg.internal:5432/postgres");
/// ```
#[derive(Debug, Clone)]
pub struct PostgresConnectionConfig {
    admin_url: String,
    admin_user: Option<String>,
    admin_password: Option<Password>,
    connect_timeout: Option<Duration>,
}

impl PostgresConnectionConfig {
    /// Settings for `admin_url`, using the credentials embedded in it.
    pub fn new(admin_url: impl Into<String>) -> Self {
        Self {
            admin_url: admin_url.into(),
            admin_user: None,
            admin_password: None,
            connect_timeout: None,
        }
    }

    /// Override the administrative user named in the URL.
    #[must_use]
    pub fn with_admin_user(mut self, user: impl Into<String>) -> Self {
        self.admin_user = Some(user.into());
        self
    }

    /// Override the administrative password carried by the URL.
    #[must_use]
    pub fn with_admin_password(mut self, password: Password) -> Self {
        self.admin_password = Some(password);
        self
    }

    /// Bound the time spent establishing each connection.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Administrative connection URL.
    pub fn admin_url(&self) -> &str {
        self.admin_url.as_str()
    }

    fn parse(&self, url: &str) -> Result<Config, SqlSessionError> {
        let mut config = url
            .parse::<Config>()
            .map_err(|error| SqlSessionError::connection(describe_error(&error)))?;
        if let Some(timeout) = self.connect_timeout {
            config.connect_timeout(timeout);
        }
        Ok(config)
    }
}

/// [`SqlConnector`] opening one `postgres` client per session.
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    config: PostgresConnectionConfig,
}

impl PostgresConnector {
    /// Build a connector from administrative connection settings.
    pub fn new(config: PostgresConnectionConfig) -> Self {
        Self { config }
    }

    fn connect(config: &Config) -> Result<Box<dyn SqlSession>, SqlSessionError> {
        let client = config
            .connect(NoTls)
            .map_err(|error| SqlSessionError::connection(describe_error(&error)))?;
        Ok(Box::new(PostgresSession { client }))
    }
}

impl SqlConnector for PostgresConnector {
    fn admin_session(&self) -> Result<Box<dyn SqlSession>, SqlSessionError> {
        let mut config = self.config.parse(self.config.admin_url())?;
        if let Some(user) = self.config.admin_user.as_deref() {
            config.user(user);
        }
        if let Some(password) = self.config.admin_password.as_ref() {
            config.password(password.as_bytes());
        }
        Self::connect(&config)
    }

    fn tenant_session(
        &self,
        database: &str,
        user: &str,
        password: &Password,
    ) -> Result<Box<dyn SqlSession>, SqlSessionError> {
        let url = retarget_database(self.config.admin_url(), database);
        debug!(database, role = user, "Connecting to tenant database");
        let mut config = self.config.parse(&url)?;
        config.user(user);
        config.password(password.as_bytes());
        Self::connect(&config)
    }
}

/// One open `postgres` connection.
pub struct PostgresSession {
    client: Client,
}

impl SqlSession for PostgresSession {
    fn exists(&mut self, query: &str, name: &str) -> Result<bool, SqlSessionError> {
        self.client
            .query_opt(query, &[&name])
            .map(|row| row.is_some())
            .map_err(|error| SqlSessionError::statement(describe_error(&error)))
    }

    fn execute(&mut self, statement: &str) -> Result<(), SqlSessionError> {
        self.client
            .batch_execute(statement)
            .map_err(|error| SqlSessionError::statement(describe_error(&error)))
    }
}

/// Render a driver error as the server reported it.
///
/// `postgres::Error`'s `Display` collapses server errors to `db error`, so
/// the severity and message are read from the database error when present.
pub fn describe_error(error: &postgres::Error) -> String {
    match error.as_db_error() {
        Some(db_error) => format!("{}: {}", db_error.severity(), db_error.message()),
        None => error.to_string(),
    }
}
