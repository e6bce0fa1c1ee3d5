//! Domain core of the tenant operator.
//!
//! Purpose: model tenant descriptors, credential holders and status records,
//! and hold the pure logic that reconciles them: password resolution, URL
//! retargeting, event correlation, SQL provisioning and the per-attempt
//! state machine. Side effects stay behind the traits in [`ports`].
//!
//! Public surface:
//! - `TenantDescriptor` / `TenantSpec` / `ResourceKey` — desired state.
//! - `TenantStatus` / `ProvisioningState` — observed state written back.
//! - `resolve_password` / `retarget_database` / `tenants_depending_on`.
//! - `SqlProvisioner` and `Reconciler` — services driven by the controller.

pub mod config;
pub mod connection_url;
pub mod correlation;
pub mod credentials;
pub mod ports;
pub mod provisioning;
pub mod reconciler;
pub mod status;
pub mod tenant;

pub use self::config::{DEFAULT_TARGET_HOST, OperatorConfig};
pub use self::connection_url::retarget_database;
pub use self::correlation::{CredentialIndex, tenants_depending_on};
pub use self::credentials::{CredentialError, CredentialHolder, Password, resolve_password};
pub use self::provisioning::{
    Convergence, ProvisionReport, ProvisioningError, SqlProvisioner, TenantPlan,
    TenantProvisioner,
};
pub use self::reconciler::{
    ReconcileError, ReconcileFailure, ReconcileOutcome, Reconciler, TenantReconciler,
};
pub use self::status::{ProvisioningState, TenantStatus};
pub use self::tenant::{ResourceKey, TenantDescriptor, TenantSpec};
