//! Shared helper utilities for operator integration tests.
//!
//! Integration tests compile as separate crates under `operator/tests/`, so
//! small helpers live here instead of being copied into each suite.

#![allow(dead_code, reason = "each test crate uses a different subset")]

pub mod cluster_skip;
pub mod pg_embed;

pub use cluster_skip::handle_cluster_setup_failure;

/// Render a `postgres` error with the server message and SQLSTATE.
///
/// `postgres::Error`'s `Display` collapses database errors to `db error`,
/// which hides the detail CI logs need.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    if let Some(hint) = db_error.hint() {
        summary.push_str("; hint: ");
        summary.push_str(hint);
    }
    summary
}
