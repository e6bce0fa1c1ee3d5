//! Domain ports defining the edges of the hexagon.
//!
//! Driven ports cover the informer cache, credential lookup, status
//! publication and SQL sessions. Each trait exposes a strongly typed error
//! so adapters map their failures into predictable variants.

mod macros;
pub(crate) use macros::define_port_error;

mod credential_store;
mod informer_cache;
mod sql_session;
mod status_writer;
mod tenant_store;

#[cfg(test)]
pub use credential_store::MockCredentialStore;
pub use credential_store::{CredentialStore, CredentialStoreError, FixtureCredentialStore};
pub use informer_cache::{InformerCache, InformerCacheError};
#[cfg(test)]
pub use sql_session::{MockSqlConnector, MockSqlSession};
pub use sql_session::{SqlConnector, SqlSession, SqlSessionError};
#[cfg(test)]
pub use status_writer::MockStatusWriter;
pub use status_writer::{StatusWriteError, StatusWriter};
pub use tenant_store::{TenantStore, TenantStoreError};
