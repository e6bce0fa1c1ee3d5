//! PostgreSQL tenant operator library.
//!
//! Converges declared database tenants into live PostgreSQL roles, databases,
//! schemas and extensions, and reports the outcome through a status record.

pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod settings;

pub use settings::{ConfigError, OperatorSettings, ValidatedSettings};
