//! Persistent record types for secrets and the audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use credvault_common::{Error, OwnerId, Result, SecretType, SourceType};

/// Opaque identifier of a stored secret. Assigned at creation, immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretId(Uuid);

impl SecretId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from its string form.
    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| Error::Validation(format!("Invalid secret id: {}", s)))
    }
}

impl fmt::Display for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Vault operation recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Read,
    Rotate,
    Delete,
    List,
}

impl AuditAction {
    /// Stable storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Read => "read",
            AuditAction::Rotate => "rotate",
            AuditAction::Delete => "delete",
            AuditAction::List => "list",
        }
    }
}

impl FromStr for AuditAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(AuditAction::Create),
            "read" => Ok(AuditAction::Read),
            "rotate" => Ok(AuditAction::Rotate),
            "delete" => Ok(AuditAction::Delete),
            "list" => Ok(AuditAction::List),
            other => Err(Error::Serialization(format!(
                "Unknown audit action: {}",
                other
            ))),
        }
    }
}

/// A stored secret, exactly as persisted.
///
/// `ciphertext` and `nonce` never leave the store/service layers; every
/// outward-facing read goes through [`SecretRecord::metadata`].
#[derive(Debug, Clone)]
pub struct SecretRecord {
    pub id: SecretId,
    pub owner_id: OwnerId,
    pub key_name: String,
    pub secret_type: SecretType,
    pub source_type: SourceType,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub encryption_method: String,
    pub key_version: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_rotated_at: Option<DateTime<Utc>>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: OwnerId,
    pub updated_by: OwnerId,
}

impl SecretRecord {
    /// Project the metadata view: everything a caller may see.
    pub fn metadata(&self) -> SecretMetadata {
        SecretMetadata {
            id: self.id.clone(),
            key_name: self.key_name.clone(),
            secret_type: self.secret_type,
            source_type: self.source_type,
            key_version: self.key_version,
            is_active: self.is_active,
            created_at: self.created_at,
            last_accessed_at: self.last_accessed_at,
            last_rotated_at: self.last_rotated_at,
            expires_at: self.expires_at,
        }
    }
}

/// Input for inserting a new secret. The store assigns id, version 1,
/// active flag, and timestamps.
#[derive(Debug, Clone)]
pub struct NewSecret {
    pub owner_id: OwnerId,
    pub key_name: String,
    pub secret_type: SecretType,
    pub source_type: SourceType,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub encryption_method: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: OwnerId,
}

/// Metadata view of a secret: no ciphertext, no nonce, no plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretMetadata {
    pub id: SecretId,
    pub key_name: String,
    pub secret_type: SecretType,
    pub source_type: SourceType,
    pub key_version: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub last_rotated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// An audit trail entry. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub owner_id: OwnerId,
    /// Absent when the operation failed before a secret was resolved.
    pub secret_id: Option<SecretId>,
    pub action: AuditAction,
    /// Free-text origin description, e.g. "secrets.create".
    pub context: String,
    /// Caller channel, e.g. "api".
    pub source: String,
    pub success: bool,
    /// Sanitized; never contains key material.
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Input for appending an audit record. The log assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub owner_id: OwnerId,
    pub secret_id: Option<SecretId>,
    pub action: AuditAction,
    pub context: String,
    pub source: String,
    pub success: bool,
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SecretRecord {
        let owner = OwnerId::new("user-1").unwrap();
        SecretRecord {
            id: SecretId::generate(),
            owner_id: owner.clone(),
            key_name: "stripe key".to_string(),
            secret_type: SecretType::ThirdPartyApiKey,
            source_type: SourceType::UserProvided,
            ciphertext: vec![1, 2, 3],
            nonce: vec![4, 5, 6],
            encryption_method: "xchacha20-poly1305".to_string(),
            key_version: 1,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_rotated_at: None,
            last_accessed_at: None,
            expires_at: None,
            created_by: owner.clone(),
            updated_by: owner,
        }
    }

    #[test]
    fn test_metadata_omits_ciphertext_and_nonce() {
        let json = serde_json::to_value(record().metadata()).unwrap();
        let body = json.to_string();

        assert!(json.get("ciphertext").is_none());
        assert!(json.get("nonce").is_none());
        assert!(json.get("keyVersion").is_some());
        assert!(body.contains("\"secretType\":\"THIRD_PARTY_API_KEY\""));
    }

    #[test]
    fn test_secret_id_parse_roundtrip() {
        let id = SecretId::generate();
        assert_eq!(SecretId::parse(&id.to_string()).unwrap(), id);
        assert!(SecretId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_audit_action_roundtrip() {
        for action in [
            AuditAction::Create,
            AuditAction::Read,
            AuditAction::Rotate,
            AuditAction::Delete,
            AuditAction::List,
        ] {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
    }
}
