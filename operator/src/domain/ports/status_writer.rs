//! Port abstraction for publishing tenant status records.

use crate::domain::{ResourceKey, TenantStatus};

use super::define_port_error;

define_port_error! {
    /// Errors raised when a status record cannot be published.
    pub enum StatusWriteError {
        /// The status sink rejected or failed to persist the record.
        Write { message: String } =>
            "status write failed: {message}",
        /// The record could not be encoded.
        Serialization { message: String } =>
            "status serialisation failed: {message}",
    }
}

/// Port for replacing the status record of a tenant descriptor.
#[cfg_attr(test, mockall::automock)]
pub trait StatusWriter: Send + Sync {
    /// Overwrite the status of `key` with `status`.
    fn write_status(&self, key: &ResourceKey, status: &TenantStatus)
    -> Result<(), StatusWriteError>;
}
