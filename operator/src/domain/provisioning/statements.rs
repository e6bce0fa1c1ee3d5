//! SQL statement templates issued during provisioning.
//!
//! Names are bound as parameters where the server allows it (existence
//! checks) and quoted as identifiers or literals everywhere else. The
//! search path is the one exception: it is a literal `SEARCH_PATH` value and
//! is applied as written.

use zeroize::Zeroizing;

use crate::domain::Password;

/// Yields a row when the role named `$1` exists.
pub const ROLE_EXISTS: &str = "SELECT true FROM pg_catalog.pg_roles WHERE rolname = $1";

/// Yields a row when the database named `$1` exists.
pub const DATABASE_EXISTS: &str = "SELECT true FROM pg_catalog.pg_database WHERE datname = $1";

/// Quote `name` as an SQL identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote `value` as an SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub(crate) fn create_role(user: &str, password: &Password) -> Zeroizing<String> {
    Zeroizing::new(format!(
        "CREATE USER {} WITH ENCRYPTED PASSWORD {}",
        quote_identifier(user),
        quote_literal(password.expose())
    ))
}

/// Also restores `LOGIN` on a pre-existing role created as `NOLOGIN`.
pub(crate) fn alter_role_password(user: &str, password: &Password) -> Zeroizing<String> {
    Zeroizing::new(format!(
        "ALTER USER {} WITH LOGIN PASSWORD {}",
        quote_identifier(user),
        quote_literal(password.expose())
    ))
}

pub(crate) fn create_database(database: &str, owner: &str) -> String {
    format!(
        "CREATE DATABASE {} OWNER {}",
        quote_identifier(database),
        quote_identifier(owner)
    )
}

pub(crate) fn alter_database_owner(database: &str, owner: &str) -> String {
    format!(
        "ALTER DATABASE {} OWNER TO {}",
        quote_identifier(database),
        quote_identifier(owner)
    )
}

pub(crate) fn grant_role(role: &str, grantee: &str) -> String {
    format!(
        "GRANT {} TO {}",
        quote_identifier(role),
        quote_identifier(grantee)
    )
}

pub(crate) fn grant_database(database: &str, user: &str) -> String {
    format!(
        "GRANT ALL ON DATABASE {} TO {}",
        quote_identifier(database),
        quote_identifier(user)
    )
}

pub(crate) fn create_schema(schema: &str, owner: &str) -> String {
    format!(
        "CREATE SCHEMA IF NOT EXISTS {} AUTHORIZATION {}",
        quote_identifier(schema),
        quote_identifier(owner)
    )
}

pub(crate) fn set_search_path(user: &str, search_path: &str) -> String {
    format!(
        "ALTER USER {} SET SEARCH_PATH TO {search_path}",
        quote_identifier(user)
    )
}

pub(crate) fn create_extension(extension: &str) -> String {
    format!(
        "CREATE EXTENSION IF NOT EXISTS {}",
        quote_identifier(extension)
    )
}
