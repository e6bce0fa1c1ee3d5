//! Tenant status record.
//!
//! The status is recomputed in full on every reconciliation that reaches the
//! provisioning step and written wholesale; it is never merged with the
//! previous record.

use serde::{Deserialize, Serialize};

use super::tenant::TenantSpec;

/// Outcome category published in the status record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProvisioningState {
    /// The last reconciliation failed; see the message.
    Error,
    /// Role and database converge with the descriptor.
    Created,
    /// Reserved for update-only outcomes.
    Updated,
    /// No outcome recorded.
    #[default]
    Undefined,
}

/// User-visible status of a tenant descriptor.
///
/// ## Invariants
/// - `message` is `None` whenever `status` is [`ProvisioningState::Created`].
/// - `url`, `user` and `password_secrets` are `None` on error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TenantStatus {
    /// Database name the tenant is reachable at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Outcome category.
    #[serde(default)]
    pub status: ProvisioningState,
    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Role the tenant connects as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Credential holder the password was read from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secrets: Option<String>,
    /// Descriptor generation this record was computed from.
    #[serde(
        default,
        rename = "observedGeneration",
        skip_serializing_if = "Option::is_none"
    )]
    pub observed_generation: Option<i64>,
}

impl TenantStatus {
    /// Status for a tenant whose role and database were converged.
    ///
    /// # Examples
    /// ```
    /// use operator::domain::{ProvisioningState, TenantSpec, TenantStatus};
    ///
    /// let spec = TenantSpec {
    ///     user: Some("billing".to_owned()),
    ///     name: Some("billing_db".to_owned()),
    ///     password_secrets: Some("billing-secret".to_owned()),
    ///     ..TenantSpec::default()
    /// };
    /// let status = TenantStatus::created(&spec, Some(3));
    /// assert_eq!(status.status, ProvisioningState::Created);
    /// assert_eq!(status.url.as_deref(), Some("billing_db"));
    /// assert!(status.message.is_none());
    /// ```
    pub fn created(spec: &TenantSpec, observed_generation: Option<i64>) -> Self {
        Self {
            url: spec.name.clone(),
            status: ProvisioningState::Created,
            message: None,
            user: spec.user.clone(),
            password_secrets: spec.password_secrets.clone(),
            observed_generation,
        }
    }

    /// Status for a failed reconciliation.
    pub fn error(message: impl Into<String>, observed_generation: Option<i64>) -> Self {
        Self {
            url: None,
            status: ProvisioningState::Error,
            message: Some(message.into()),
            user: None,
            password_secrets: None,
            observed_generation,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Wire shape of status records.

    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn created_status_omits_message() {
        let spec = TenantSpec {
            user: Some("billing".to_owned()),
            name: Some("billing_db".to_owned()),
            password_secrets: Some("billing-secret".to_owned()),
            ..TenantSpec::default()
        };

        let value = serde_json::to_value(TenantStatus::created(&spec, Some(2)))
            .expect("status should serialise");

        assert_eq!(
            value,
            json!({
                "url": "billing_db",
                "status": "CREATED",
                "user": "billing",
                "password-secrets": "billing-secret",
                "observedGeneration": 2
            })
        );
    }

    #[rstest]
    fn error_status_carries_only_message() {
        let value = serde_json::to_value(TenantStatus::error("boom", None))
            .expect("status should serialise");

        assert_eq!(value, json!({ "status": "ERROR", "message": "boom" }));
    }

    #[rstest]
    fn missing_state_reads_as_undefined() {
        let status: TenantStatus =
            serde_json::from_value(json!({ "url": "db" })).expect("status should deserialise");
        assert_eq!(status.status, ProvisioningState::Undefined);
    }
}
