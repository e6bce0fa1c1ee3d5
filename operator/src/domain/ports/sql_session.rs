//! Port abstraction for SQL sessions against the tenant server.
//!
//! Sessions are scoped: each one is opened for a single provisioning phase
//! and released when dropped, on success and failure alike.

use crate::domain::Password;

use super::define_port_error;

define_port_error! {
    /// Errors raised by SQL sessions.
    ///
    /// Statement failures carry the driver message verbatim so it can be
    /// surfaced in the tenant status.
    pub enum SqlSessionError {
        /// A connection could not be established.
        Connection { message: String } =>
            "connection failed: {message}",
        /// A statement or query was rejected by the server.
        Statement { message: String } =>
            "{message}",
    }
}

/// One open connection; every statement is autocommitted.
#[cfg_attr(test, mockall::automock)]
pub trait SqlSession: Send {
    /// Run `query` with `name` bound as `$1`; `true` when it yields a row.
    fn exists(&mut self, query: &str, name: &str) -> Result<bool, SqlSessionError>;

    /// Execute a single statement.
    fn execute(&mut self, statement: &str) -> Result<(), SqlSessionError>;
}

/// Opens the two kinds of sessions used during provisioning.
#[cfg_attr(test, mockall::automock)]
pub trait SqlConnector: Send + Sync {
    /// Session authenticated as the administrative role.
    fn admin_session(&self) -> Result<Box<dyn SqlSession>, SqlSessionError>;

    /// Session inside `database`, authenticated as `user` with `password`.
    fn tenant_session(
        &self,
        database: &str,
        user: &str,
        password: &Password,
    ) -> Result<Box<dyn SqlSession>, SqlSessionError>;
}
