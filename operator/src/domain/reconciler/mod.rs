//! Tenant reconciliation state machine.
//!
//! Each attempt starts from scratch: entry check (descriptor body present),
//! host gate, credential lookup, then provisioning. Only attempts that reach
//! provisioning write a status, and the status is always computed in full.
//! Failures of a single tenant become an ERROR status; they never escape as
//! errors, so one tenant cannot stop the loop.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::ports::{CredentialStore, CredentialStoreError, StatusWriteError, StatusWriter};
use crate::domain::provisioning::{ProvisioningError, TenantProvisioner};
use crate::domain::{
    CredentialError, OperatorConfig, ResourceKey, TenantDescriptor, TenantStatus,
    resolve_password,
};

/// Terminal state of one reconciliation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The descriptor has no body yet; nothing was written.
    NoBody,
    /// The descriptor targets another host; nothing was written.
    Skipped,
    /// The credential holder is not observable yet; nothing was written.
    AwaitingCredential,
    /// Provisioning succeeded and this status was written.
    Succeeded(TenantStatus),
    /// Provisioning failed and this status was written.
    Failed(TenantStatus),
}

/// Why provisioning could not complete for a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileFailure {
    /// The credential holder could not be read.
    #[error(transparent)]
    CredentialLookup(#[from] CredentialStoreError),
    /// The password entry is missing, empty or undecodable.
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// Provisioning against the server failed.
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),
}

/// Errors returned to the event framework so it can retry the attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The computed status could not be published.
    #[error("failed to publish status for {key}: {source}")]
    StatusWrite {
        key: ResourceKey,
        #[source]
        source: StatusWriteError,
    },
}

/// Driving port for the inbound dispatcher.
#[cfg_attr(test, mockall::automock)]
pub trait TenantReconciler: Send + Sync {
    /// Run one reconciliation attempt for `descriptor`.
    fn reconcile(&self, descriptor: &TenantDescriptor) -> Result<ReconcileOutcome, ReconcileError>;

    /// Publish an ERROR status after an attempt aborted unexpectedly.
    fn report_failure(
        &self,
        descriptor: &TenantDescriptor,
        message: &str,
    ) -> Result<TenantStatus, ReconcileError>;
}

/// Reconciler wired to its collaborators.
pub struct Reconciler<P, C, W> {
    target_host: String,
    provisioner: Arc<P>,
    credentials: Arc<C>,
    status: Arc<W>,
}

impl<P, C, W> Reconciler<P, C, W> {
    /// Build a reconciler gated on the target host in `config`.
    pub fn new(
        config: &OperatorConfig,
        provisioner: Arc<P>,
        credentials: Arc<C>,
        status: Arc<W>,
    ) -> Self {
        Self {
            target_host: config.target_host().to_owned(),
            provisioner,
            credentials,
            status,
        }
    }
}

impl<P, C, W> Reconciler<P, C, W>
where
    P: TenantProvisioner,
    C: CredentialStore,
    W: StatusWriter,
{
    fn publish(&self, key: &ResourceKey, status: &TenantStatus) -> Result<(), ReconcileError> {
        self.status
            .write_status(key, status)
            .map_err(|source| ReconcileError::StatusWrite {
                key: key.clone(),
                source,
            })
    }
}

impl<P, C, W> TenantReconciler for Reconciler<P, C, W>
where
    P: TenantProvisioner,
    C: CredentialStore,
    W: StatusWriter,
{
    fn reconcile(&self, descriptor: &TenantDescriptor) -> Result<ReconcileOutcome, ReconcileError> {
        let key = &descriptor.key;
        let Some(spec) = descriptor.spec.as_ref() else {
            debug!(tenant = %key, "Descriptor has no body yet");
            return Ok(ReconcileOutcome::NoBody);
        };

        if spec.host.as_deref() != Some(self.target_host.as_str()) {
            debug!(
                tenant = %key,
                host = spec.host.as_deref().unwrap_or_default(),
                "Descriptor targets another host"
            );
            return Ok(ReconcileOutcome::Skipped);
        }

        let Some(holder_key) = descriptor.credential_dependency() else {
            warn!(tenant = %key, "Descriptor names no credential holder");
            return Ok(ReconcileOutcome::AwaitingCredential);
        };

        let holder = match self.credentials.credential(&holder_key) {
            Ok(Some(holder)) => holder,
            Ok(None) => {
                debug!(tenant = %key, holder = %holder_key, "Credential holder not observed yet");
                return Ok(ReconcileOutcome::AwaitingCredential);
            }
            Err(err) => {
                return self.report_failure(descriptor, &ReconcileFailure::from(err).to_string())
                    .map(ReconcileOutcome::Failed);
            }
        };

        info!(tenant = %key, database = spec.name.as_deref().unwrap_or_default(), "Reconciling tenant");
        let provisioned = resolve_password(spec.password_key.as_deref(), &holder.data)
            .map_err(ReconcileFailure::from)
            .and_then(|password| {
                self.provisioner
                    .provision(spec, &password)
                    .map_err(ReconcileFailure::from)
            });

        match provisioned {
            Ok(report) => {
                let status = TenantStatus::created(spec, descriptor.generation);
                self.publish(key, &status)?;
                info!(tenant = %key, role = ?report.role, database = ?report.database, "Tenant reconciled");
                Ok(ReconcileOutcome::Succeeded(status))
            }
            Err(failure) => self
                .report_failure(descriptor, &failure.to_string())
                .map(ReconcileOutcome::Failed),
        }
    }

    fn report_failure(
        &self,
        descriptor: &TenantDescriptor,
        message: &str,
    ) -> Result<TenantStatus, ReconcileError> {
        error!(tenant = %descriptor.key, error = message, "Tenant reconciliation failed");
        let status = TenantStatus::error(message, descriptor.generation);
        self.publish(&descriptor.key, &status)?;
        Ok(status)
    }
}
