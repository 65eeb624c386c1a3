//! Process configuration for the vault.
//!
//! The master secret arrives through the environment (injected by the
//! deployment's secret manager) and is decoded exactly once at startup.
//! A missing or malformed key is a hard startup failure, never a silent
//! degradation.

use credvault_common::{Error, Result};
use credvault_crypto::MasterKey;

/// Environment variable holding the base64-encoded 32-byte master key.
pub const MASTER_KEY_ENV: &str = "VAULT_MASTER_KEY";

/// Vault process configuration.
#[derive(Debug)]
pub struct VaultConfig {
    /// Process-wide master secret.
    pub master_key: MasterKey,
}

impl VaultConfig {
    /// Load configuration from the default environment variable.
    ///
    /// # Errors
    /// - `KeyUnavailable` if the variable is unset, not base64, or the
    ///   wrong length
    pub fn from_env() -> Result<Self> {
        Self::from_env_var(MASTER_KEY_ENV)
    }

    /// Load configuration from a specific environment variable.
    pub fn from_env_var(var: &str) -> Result<Self> {
        let encoded = std::env::var(var)
            .map_err(|_| Error::KeyUnavailable(format!("{} is not set", var)))?;
        Ok(Self {
            master_key: MasterKey::from_base64(&encoded)?,
        })
    }
}
