//! Credential holders and password resolution.
//!
//! A credential holder is a namespaced key/value map whose values are
//! base64 encoded. The operator reads exactly one entry from it: the one
//! named by the descriptor's `password-key`.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;
use zeroize::Zeroizing;

use super::tenant::ResourceKey;

/// Externally owned key/value store carrying tenant passwords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialHolder {
    /// Namespaced name of the holder.
    pub key: ResourceKey,
    /// Entries keyed by name; values are base64 encoded.
    pub data: BTreeMap<String, String>,
}

impl CredentialHolder {
    /// Build a holder from its key and encoded entries.
    pub fn new(key: ResourceKey, data: BTreeMap<String, String>) -> Self {
        Self { key, data }
    }
}

/// Decoded tenant password.
///
/// The buffer is wiped on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(Zeroizing<String>);

impl Password {
    /// Wrap a plain-text password.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Borrow the password text.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Borrow the password bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// Reasons a password cannot be read from a credential holder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// The descriptor does not name a key.
    #[error("Secret key is mandatory. No key found!")]
    KeyUnset,
    /// The holder has no entry for the key.
    #[error("Secret key is mandatory. No key secret found!")]
    EntryMissing,
    /// The entry exists but is empty.
    #[error("Secret key '{key}' is mandatory. No value found!")]
    ValueEmpty { key: String },
    /// The entry is not base64-encoded UTF-8 text.
    #[error("Secret key '{key}' has an invalid value: {message}")]
    InvalidEncoding { key: String, message: String },
}

/// Resolve and decode the password entry named by `key`.
///
/// The checks run in order: key set, entry present, entry non-empty.
/// Decoding happens only once all three pass.
///
/// # Examples
/// ```
/// use std::collections::BTreeMap;
///
/// use operator::domain::{CredentialError, resolve_password};
///
/// let data = BTreeMap::from([("pk".to_owned(), "czNjcjN0".to_owned())]);
/// let password = resolve_password(Some("pk"), &data).expect("password resolves");
/// assert_eq!(password.expose(), "s3cr3t");
///
/// let err = resolve_password(Some("other"), &data).expect_err("entry is missing");
/// assert_eq!(err, CredentialError::EntryMissing);
/// ```
pub fn resolve_password(
    key: Option<&str>,
    data: &BTreeMap<String, String>,
) -> Result<Password, CredentialError> {
    let key = match key {
        Some(key) if !key.is_empty() => key,
        _ => return Err(CredentialError::KeyUnset),
    };
    let encoded = data.get(key).ok_or(CredentialError::EntryMissing)?;
    if encoded.is_empty() {
        return Err(CredentialError::ValueEmpty {
            key: key.to_owned(),
        });
    }

    let decoded = Zeroizing::new(STANDARD.decode(encoded).map_err(|err| {
        CredentialError::InvalidEncoding {
            key: key.to_owned(),
            message: err.to_string(),
        }
    })?);
    if decoded.is_empty() {
        return Err(CredentialError::InvalidEncoding {
            key: key.to_owned(),
            message: "decoded password is empty".to_owned(),
        });
    }
    let text = std::str::from_utf8(&decoded).map_err(|err| CredentialError::InvalidEncoding {
        key: key.to_owned(),
        message: err.to_string(),
    })?;
    Ok(Password::new(text))
}
