//! Common error types for CredVault.
//!
//! Messages are sanitized by construction: no variant ever carries key
//! material, plaintext secret values, or nonces. The audit trail and the
//! HTTP layer both render errors through `Display`.

use thiserror::Error;

/// Top-level error type for CredVault operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed, missing, or out-of-range input.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Unresolved or invalid caller identity.
    #[error("Unauthorized: {0}")]
    Auth(String),

    /// No active secret for the given owner/type.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An active secret of this type already exists for the owner.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A concurrent rotation won the conditional update.
    #[error("Version conflict: stored key_version no longer equals {expected}")]
    VersionConflict { expected: u32 },

    /// AEAD authentication failure on decrypt.
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Master key missing or misconfigured.
    #[error("Master key unavailable: {0}")]
    KeyUnavailable(String),

    /// Underlying store failure.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Cryptographic operation failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether the caller may retry the operation unchanged.
    ///
    /// Only rotation races are retryable; everything else needs a
    /// different input or operator intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::VersionConflict { .. })
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
