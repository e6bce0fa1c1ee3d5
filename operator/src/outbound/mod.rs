//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **postgres**: SQL sessions against the tenant server via `postgres`
//! - **informer**: in-memory snapshot cache kept current from watch events
//! - **status**: status publication as JSON lines, plus an in-memory store
//!
//! Adapters are thin translators between domain types and infrastructure
//! representations. They contain no reconciliation logic.

pub mod informer;
pub mod postgres;
pub mod status;
