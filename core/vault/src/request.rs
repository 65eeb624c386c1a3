//! Typed, validated request structures.
//!
//! Bodies parse into these at the HTTP boundary; `secret_type` and
//! `source_type` are closed enums, so unknown values are rejected by
//! serde before they reach the service layer. Value/expiry validation
//! happens in `validate`, called by the service on every mutation.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use credvault_common::{Error, Result, SecretType, SourceType};

/// Body of `POST /secrets`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSecretRequest {
    pub key_name: String,
    pub secret_type: SecretType,
    pub source_type: SourceType,
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateSecretRequest {
    /// Validate the request against `now`.
    ///
    /// # Errors
    /// - `Validation` if the label or value is empty, or `expires_at`
    ///   is not strictly in the future
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        if self.key_name.trim().is_empty() {
            return Err(Error::Validation("key_name cannot be empty".to_string()));
        }
        if self.value.is_empty() {
            return Err(Error::Validation("value cannot be empty".to_string()));
        }
        validate_expiry(self.expires_at, now)
    }
}

/// Body of `PATCH /secrets/{type}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RotateSecretRequest {
    pub new_value: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl RotateSecretRequest {
    /// Validate the request against `now`.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        if self.new_value.is_empty() {
            return Err(Error::Validation("new_value cannot be empty".to_string()));
        }
        validate_expiry(self.expires_at, now)
    }
}

/// The vault never persists an already-expired record.
fn validate_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<()> {
    match expires_at {
        Some(at) if at <= now => Err(Error::Validation(
            "expires_at must be in the future".to_string(),
        )),
        _ => Ok(()),
    }
}
