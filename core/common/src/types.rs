//! Common types used throughout CredVault.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

/// Identifier of a secret's owner, resolved by the upstream auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create a new OwnerId from a string.
    ///
    /// # Errors
    /// - Returns error if id is empty
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::Validation(
                "OwnerId cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of credential a secret holds.
///
/// Closed enumeration: unknown values are rejected at the boundary and
/// never reach the service layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecretType {
    AnonKey,
    ServiceRole,
    ThirdPartyApiKey,
    WebhookSecret,
    OauthClientSecret,
    DatabaseUrl,
}

impl SecretType {
    /// Stable wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretType::AnonKey => "ANON_KEY",
            SecretType::ServiceRole => "SERVICE_ROLE",
            SecretType::ThirdPartyApiKey => "THIRD_PARTY_API_KEY",
            SecretType::WebhookSecret => "WEBHOOK_SECRET",
            SecretType::OauthClientSecret => "OAUTH_CLIENT_SECRET",
            SecretType::DatabaseUrl => "DATABASE_URL",
        }
    }
}

impl FromStr for SecretType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "ANON_KEY" => Ok(SecretType::AnonKey),
            "SERVICE_ROLE" => Ok(SecretType::ServiceRole),
            "THIRD_PARTY_API_KEY" => Ok(SecretType::ThirdPartyApiKey),
            "WEBHOOK_SECRET" => Ok(SecretType::WebhookSecret),
            "OAUTH_CLIENT_SECRET" => Ok(SecretType::OauthClientSecret),
            "DATABASE_URL" => Ok(SecretType::DatabaseUrl),
            other => Err(crate::Error::Validation(format!(
                "Unknown secret type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the secret's value originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    UserProvided,
    SystemManaged,
    UserLocal,
    ExternalVault,
}

impl SourceType {
    /// Stable wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::UserProvided => "user-provided",
            SourceType::SystemManaged => "system-managed",
            SourceType::UserLocal => "user-local",
            SourceType::ExternalVault => "external-vault",
        }
    }
}

impl FromStr for SourceType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "user-provided" => Ok(SourceType::UserProvided),
            "system-managed" => Ok(SourceType::SystemManaged),
            "user-local" => Ok(SourceType::UserLocal),
            "external-vault" => Ok(SourceType::ExternalVault),
            other => Err(crate::Error::Validation(format!(
                "Unknown source type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Plaintext secret value that zeroizes on drop.
///
/// Exists only between request parsing and AEAD sealing. Never logged,
/// never serialized.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(Vec<u8>);

impl SecretValue {
    /// Create new secret bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue([REDACTED; {} bytes])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_id_creation() {
        let id = OwnerId::new("user-42").unwrap();
        assert_eq!(id.as_str(), "user-42");
    }

    #[test]
    fn test_owner_id_empty_fails() {
        assert!(OwnerId::new("").is_err());
    }

    #[test]
    fn test_secret_type_roundtrip() {
        for ty in [
            SecretType::AnonKey,
            SecretType::ServiceRole,
            SecretType::ThirdPartyApiKey,
            SecretType::WebhookSecret,
            SecretType::OauthClientSecret,
            SecretType::DatabaseUrl,
        ] {
            assert_eq!(ty.as_str().parse::<SecretType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_secret_type_unknown_rejected() {
        assert!("MYSTERY_KEY".parse::<SecretType>().is_err());
    }

    #[test]
    fn test_source_type_roundtrip() {
        for ty in [
            SourceType::UserProvided,
            SourceType::SystemManaged,
            SourceType::UserLocal,
            SourceType::ExternalVault,
        ] {
            assert_eq!(ty.as_str().parse::<SourceType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_secret_type_serde_wire_names() {
        let json = serde_json::to_string(&SecretType::WebhookSecret).unwrap();
        assert_eq!(json, "\"WEBHOOK_SECRET\"");
        let json = serde_json::to_string(&SourceType::UserProvided).unwrap();
        assert_eq!(json, "\"user-provided\"");
    }

    #[test]
    fn test_secret_value_debug_redacted() {
        let value = SecretValue::new(b"super-secret".to_vec());
        let debug = format!("{:?}", value);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
