//! Key types with secure memory handling.
//!
//! All key types automatically zeroize their memory on drop to prevent
//! sensitive data from persisting in memory.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use credvault_common::{Error, Result};

/// Length of encryption keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Process-wide master secret.
///
/// Loaded once at startup and held for the lifetime of the process.
/// It is never logged, serialized, or returned to a caller; per-secret
/// keys are derived from it in `kdf`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: [u8; KEY_LENGTH],
}

impl MasterKey {
    /// Create a master key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Decode a master key from its base64 configuration form.
    ///
    /// # Errors
    /// - Returns `KeyUnavailable` if the encoding is invalid or the
    ///   decoded length is not KEY_LENGTH
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| Error::KeyUnavailable("master key is not valid base64".to_string()))?;
        if bytes.len() != KEY_LENGTH {
            return Err(Error::KeyUnavailable(format!(
                "master key must decode to {} bytes, got {}",
                KEY_LENGTH,
                bytes.len()
            )));
        }
        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&bytes);
        Ok(Self { key })
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterKey([REDACTED])")
    }
}

/// One-time symmetric key protecting a single secret version.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    key: [u8; KEY_LENGTH],
}

impl SecretKey {
    /// Create a secret key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// Generate a random key.
    ///
    /// Test helper for exercising the cipher without a master key.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut key = [0u8; KEY_LENGTH];
        rand::thread_rng().fill_bytes(&mut key);
        Self { key }
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}
