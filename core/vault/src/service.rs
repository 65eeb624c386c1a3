//! Vault orchestration.
//!
//! Every public call validates input, drives the crypto layer to produce
//! ciphertext, persists through the `SecretStore` port, and emits exactly
//! one audit record before returning. The audit write is a best-effort
//! side channel: its failure is logged operationally and never propagates
//! to the caller.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use credvault_common::{Error, OwnerId, Result, SecretType, SecretValue};
use credvault_crypto::{
    derive_secret_key, seal, secret_context, MasterKey, NonceSource, SystemNonceSource,
    ENCRYPTION_METHOD,
};
use credvault_store::{
    AuditAction, AuditLog, NewAuditRecord, NewSecret, SecretId, SecretMetadata, SecretStore,
};

use crate::request::{CreateSecretRequest, RotateSecretRequest};

/// Origin description for the audit trail.
#[derive(Debug, Clone)]
pub struct AuditContext {
    /// Free-text origin, e.g. "secrets.create".
    pub context: String,
    /// Caller channel, e.g. "api".
    pub source: String,
}

impl AuditContext {
    /// Context for a call arriving through the HTTP surface.
    pub fn api(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            source: "api".to_string(),
        }
    }
}

/// The vault service.
///
/// Composes key derivation, nonce generation, the AEAD cipher, and the
/// two persistence ports. All collaborators are injected, so tests
/// substitute in-memory fakes.
pub struct VaultService {
    master: MasterKey,
    nonces: Arc<dyn NonceSource>,
    store: Arc<dyn SecretStore>,
    audit: Arc<dyn AuditLog>,
}

impl VaultService {
    /// Create a service with the system nonce source.
    pub fn new(master: MasterKey, store: Arc<dyn SecretStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            master,
            nonces: Arc::new(SystemNonceSource),
            store,
            audit,
        }
    }

    /// Replace the nonce source. For tests.
    pub fn with_nonce_source(mut self, nonces: Arc<dyn NonceSource>) -> Self {
        self.nonces = nonces;
        self
    }

    /// Create a new secret.
    ///
    /// # Postconditions
    /// - On success the record is persisted with `key_version = 1` and
    ///   `is_active = true`
    /// - Exactly one audit record is written, success or failure
    ///
    /// # Errors
    /// - `Validation` for empty value/label or past expiry
    /// - `Conflict` if an active secret of that type already exists
    ///   (no implicit overwrite)
    pub async fn create(
        &self,
        owner_id: &OwnerId,
        request: CreateSecretRequest,
        ctx: &AuditContext,
    ) -> Result<SecretMetadata> {
        let mut resolved = None;
        let outcome = self.create_inner(owner_id, request, &mut resolved).await;
        self.record_audit(owner_id, resolved, AuditAction::Create, ctx, &outcome)
            .await;
        outcome
    }

    async fn create_inner(
        &self,
        owner_id: &OwnerId,
        request: CreateSecretRequest,
        resolved: &mut Option<SecretId>,
    ) -> Result<SecretMetadata> {
        request.validate(Utc::now())?;
        let secret_type = request.secret_type;

        if self.store.find_active(owner_id, secret_type).await?.is_some() {
            return Err(Error::Conflict(format!(
                "An active {} secret already exists",
                secret_type
            )));
        }

        debug!(owner = %owner_id, secret_type = %secret_type, "Sealing new secret");

        let nonce = self.nonces.generate();
        let context = secret_context(owner_id, secret_type);
        let key = derive_secret_key(&self.master, &context, &nonce);
        let value = SecretValue::from(request.value);
        let ciphertext = seal(&key, &nonce, value.as_bytes())?;

        let stored = self
            .store
            .insert(NewSecret {
                owner_id: owner_id.clone(),
                key_name: request.key_name,
                secret_type,
                source_type: request.source_type,
                ciphertext,
                nonce: nonce.to_vec(),
                encryption_method: ENCRYPTION_METHOD.to_string(),
                expires_at: request.expires_at,
                created_by: owner_id.clone(),
            })
            .await?;

        *resolved = Some(stored.id.clone());
        info!(owner = %owner_id, secret_type = %secret_type, id = %stored.id, "Secret created");
        Ok(stored.metadata())
    }

    /// Read a secret's metadata. Never returns ciphertext or plaintext.
    ///
    /// # Errors
    /// - `NotFound` if no active secret of that type exists
    pub async fn get_metadata(
        &self,
        owner_id: &OwnerId,
        secret_type: SecretType,
        ctx: &AuditContext,
    ) -> Result<SecretMetadata> {
        let mut resolved = None;
        let outcome = self
            .get_metadata_inner(owner_id, secret_type, &mut resolved)
            .await;
        self.record_audit(owner_id, resolved, AuditAction::Read, ctx, &outcome)
            .await;
        outcome
    }

    async fn get_metadata_inner(
        &self,
        owner_id: &OwnerId,
        secret_type: SecretType,
        resolved: &mut Option<SecretId>,
    ) -> Result<SecretMetadata> {
        let record = self
            .store
            .find_active(owner_id, secret_type)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No active {} secret", secret_type)))?;

        *resolved = Some(record.id.clone());

        // Access-time bookkeeping is best-effort, like the audit channel.
        if let Err(e) = self.store.touch_accessed(&record.id).await {
            warn!(id = %record.id, error = %e, "Failed to record access time");
        }

        Ok(record.metadata())
    }

    /// Rotate a secret to a new value.
    ///
    /// Loads the current version, seals the new value under a fresh
    /// nonce, and applies a conditional update guarded by the version it
    /// read. A losing writer gets `VersionConflict` and must retry; the
    /// service never auto-retries.
    ///
    /// # Postconditions
    /// - On success `key_version` increments by exactly 1 and
    ///   `last_rotated_at` is set
    pub async fn rotate(
        &self,
        owner_id: &OwnerId,
        secret_type: SecretType,
        request: RotateSecretRequest,
        ctx: &AuditContext,
    ) -> Result<SecretMetadata> {
        let mut resolved = None;
        let outcome = self
            .rotate_inner(owner_id, secret_type, request, &mut resolved)
            .await;
        self.record_audit(owner_id, resolved, AuditAction::Rotate, ctx, &outcome)
            .await;
        outcome
    }

    async fn rotate_inner(
        &self,
        owner_id: &OwnerId,
        secret_type: SecretType,
        request: RotateSecretRequest,
        resolved: &mut Option<SecretId>,
    ) -> Result<SecretMetadata> {
        request.validate(Utc::now())?;

        let current = self
            .store
            .find_active(owner_id, secret_type)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No active {} secret", secret_type)))?;

        *resolved = Some(current.id.clone());

        let nonce = self.nonces.generate();
        let context = secret_context(owner_id, secret_type);
        let key = derive_secret_key(&self.master, &context, &nonce);
        let value = SecretValue::from(request.new_value);
        let ciphertext = seal(&key, &nonce, value.as_bytes())?;

        let updated = self
            .store
            .update_rotated(
                &current.id,
                current.key_version,
                ciphertext,
                nonce.to_vec(),
                request.expires_at,
                owner_id,
            )
            .await?;

        info!(
            owner = %owner_id,
            secret_type = %secret_type,
            id = %updated.id,
            key_version = updated.key_version,
            "Secret rotated"
        );
        Ok(updated.metadata())
    }

    /// Soft-delete a secret. Terminal: a deleted secret never reactivates;
    /// a later create starts a fresh id at version 1.
    ///
    /// # Errors
    /// - `NotFound` if no active secret of that type exists (deleting an
    ///   already-deleted secret is not a no-op success)
    pub async fn delete(
        &self,
        owner_id: &OwnerId,
        secret_type: SecretType,
        ctx: &AuditContext,
    ) -> Result<()> {
        let mut resolved = None;
        let outcome = self
            .delete_inner(owner_id, secret_type, &mut resolved)
            .await;
        self.record_audit(owner_id, resolved, AuditAction::Delete, ctx, &outcome)
            .await;
        outcome
    }

    async fn delete_inner(
        &self,
        owner_id: &OwnerId,
        secret_type: SecretType,
        resolved: &mut Option<SecretId>,
    ) -> Result<()> {
        let current = self
            .store
            .find_active(owner_id, secret_type)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No active {} secret", secret_type)))?;

        *resolved = Some(current.id.clone());
        self.store.soft_delete(&current.id, owner_id).await?;

        info!(owner = %owner_id, secret_type = %secret_type, id = %current.id, "Secret deleted");
        Ok(())
    }

    /// List metadata of all active secrets for an owner.
    pub async fn list(
        &self,
        owner_id: &OwnerId,
        ctx: &AuditContext,
    ) -> Result<Vec<SecretMetadata>> {
        let outcome = self.store.list_active(owner_id).await;
        self.record_audit(owner_id, None, AuditAction::List, ctx, &outcome)
            .await;
        outcome
    }

    /// Write the one audit record this operation attempt owes.
    ///
    /// Fire-and-forget relative to the primary operation: an append
    /// failure goes to the operational log only.
    async fn record_audit<T>(
        &self,
        owner_id: &OwnerId,
        secret_id: Option<SecretId>,
        action: AuditAction,
        ctx: &AuditContext,
        outcome: &Result<T>,
    ) {
        let record = NewAuditRecord {
            owner_id: owner_id.clone(),
            secret_id,
            action,
            context: ctx.context.clone(),
            source: ctx.source.clone(),
            success: outcome.is_ok(),
            error_message: outcome.as_ref().err().map(|e| e.to_string()),
        };

        if let Err(e) = self.audit.append(record).await {
            warn!(action = action.as_str(), error = %e, "Audit append failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use credvault_common::SourceType;
    use credvault_crypto::KEY_LENGTH;
    use credvault_store::{MemoryAuditLog, MemorySecretStore};

    fn owner() -> OwnerId {
        OwnerId::new("user-1").unwrap()
    }

    fn service_with_log() -> (VaultService, Arc<MemoryAuditLog>) {
        let audit = Arc::new(MemoryAuditLog::new());
        let service = VaultService::new(
            MasterKey::from_bytes([42u8; KEY_LENGTH]),
            Arc::new(MemorySecretStore::new()),
            audit.clone(),
        );
        (service, audit)
    }

    fn create_request(secret_type: SecretType, value: &str) -> CreateSecretRequest {
        CreateSecretRequest {
            key_name: "test key".to_string(),
            secret_type,
            source_type: SourceType::UserProvided,
            value: value.to_string(),
            expires_at: None,
        }
    }

    fn ctx() -> AuditContext {
        AuditContext::api("test")
    }

    #[tokio::test]
    async fn test_create_starts_at_version_one() {
        let (service, audit) = service_with_log();

        let meta = service
            .create(&owner(), create_request(SecretType::AnonKey, "v1"), &ctx())
            .await
            .unwrap();

        assert_eq!(meta.key_version, 1);
        assert!(meta.is_active);

        let records = audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, AuditAction::Create);
        assert!(records[0].success);
        assert_eq!(records[0].secret_id, Some(meta.id));
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts_and_audits() {
        let (service, audit) = service_with_log();

        service
            .create(
                &owner(),
                create_request(SecretType::WebhookSecret, "v1"),
                &ctx(),
            )
            .await
            .unwrap();
        let result = service
            .create(
                &owner(),
                create_request(SecretType::WebhookSecret, "v2"),
                &ctx(),
            )
            .await;

        assert!(matches!(result, Err(Error::Conflict(_))));

        let records = audit.records();
        assert_eq!(records.len(), 2);
        assert!(!records[1].success);
        assert!(records[1].error_message.is_some());
        // Failed before a new secret was resolved
        assert!(records[1].secret_id.is_none());
    }

    #[tokio::test]
    async fn test_validation_failure_still_audited() {
        let (service, audit) = service_with_log();

        let result = service
            .create(&owner(), create_request(SecretType::AnonKey, ""), &ctx())
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));

        let records = audit.records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].success);
    }

    #[tokio::test]
    async fn test_audit_messages_never_contain_the_value() {
        let (service, audit) = service_with_log();

        let mut request = create_request(SecretType::AnonKey, "sk_live_supersecret");
        request.expires_at = Some(Utc::now() - Duration::days(1));
        let _ = service.create(&owner(), request, &ctx()).await;

        for record in audit.records() {
            if let Some(message) = &record.error_message {
                assert!(!message.contains("sk_live_supersecret"));
            }
        }
    }

    #[tokio::test]
    async fn test_get_metadata_not_found_audited() {
        let (service, audit) = service_with_log();

        let result = service
            .get_metadata(&owner(), SecretType::ServiceRole, &ctx())
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));

        let records = audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, AuditAction::Read);
        assert!(!records[0].success);
        assert!(records[0].secret_id.is_none());
    }

    #[tokio::test]
    async fn test_rotate_increments_version() {
        let (service, _) = service_with_log();

        service
            .create(&owner(), create_request(SecretType::AnonKey, "v1"), &ctx())
            .await
            .unwrap();

        let rotate = |value: &str| RotateSecretRequest {
            new_value: value.to_string(),
            expires_at: None,
        };

        let meta = service
            .rotate(&owner(), SecretType::AnonKey, rotate("v2"), &ctx())
            .await
            .unwrap();
        assert_eq!(meta.key_version, 2);
        assert!(meta.last_rotated_at.is_some());

        let meta = service
            .rotate(&owner(), SecretType::AnonKey, rotate("v3"), &ctx())
            .await
            .unwrap();
        assert_eq!(meta.key_version, 3);
    }

    #[tokio::test]
    async fn test_rotation_changes_nonce() {
        let store = Arc::new(MemorySecretStore::new());
        let service = VaultService::new(
            MasterKey::from_bytes([42u8; KEY_LENGTH]),
            store.clone(),
            Arc::new(MemoryAuditLog::new()),
        );

        service
            .create(&owner(), create_request(SecretType::AnonKey, "v1"), &ctx())
            .await
            .unwrap();
        let before = store
            .find_active(&owner(), SecretType::AnonKey)
            .await
            .unwrap()
            .unwrap();

        service
            .rotate(
                &owner(),
                SecretType::AnonKey,
                RotateSecretRequest {
                    new_value: "v2".to_string(),
                    expires_at: None,
                },
                &ctx(),
            )
            .await
            .unwrap();
        let after = store
            .find_active(&owner(), SecretType::AnonKey)
            .await
            .unwrap()
            .unwrap();

        assert_ne!(before.nonce, after.nonce);
        assert_ne!(before.ciphertext, after.ciphertext);
    }

    #[tokio::test]
    async fn test_delete_then_read_not_found() {
        let (service, _) = service_with_log();

        service
            .create(&owner(), create_request(SecretType::AnonKey, "v1"), &ctx())
            .await
            .unwrap();
        service
            .delete(&owner(), SecretType::AnonKey, &ctx())
            .await
            .unwrap();

        let result = service
            .get_metadata(&owner(), SecretType::AnonKey, &ctx())
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));

        // Deleting again is NotFound, not a silent success
        let result = service.delete(&owner(), SecretType::AnonKey, &ctx()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fixed_nonce_source_is_honored() {
        struct FixedNonceSource;
        impl NonceSource for FixedNonceSource {
            fn generate(&self) -> [u8; credvault_crypto::NONCE_SIZE] {
                [7u8; credvault_crypto::NONCE_SIZE]
            }
        }

        let store = Arc::new(MemorySecretStore::new());
        let service = VaultService::new(
            MasterKey::from_bytes([42u8; KEY_LENGTH]),
            store.clone(),
            Arc::new(MemoryAuditLog::new()),
        )
        .with_nonce_source(Arc::new(FixedNonceSource));

        service
            .create(&owner(), create_request(SecretType::AnonKey, "v1"), &ctx())
            .await
            .unwrap();
        let record = store
            .find_active(&owner(), SecretType::AnonKey)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.nonce, vec![7u8; credvault_crypto::NONCE_SIZE]);
    }

    #[tokio::test]
    async fn test_list_scoped_to_owner() {
        let (service, _) = service_with_log();
        let other = OwnerId::new("user-2").unwrap();

        service
            .create(&owner(), create_request(SecretType::AnonKey, "v1"), &ctx())
            .await
            .unwrap();
        service
            .create(
                &other,
                create_request(SecretType::WebhookSecret, "v1"),
                &ctx(),
            )
            .await
            .unwrap();

        let listed = service.list(&owner(), &ctx()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].secret_type, SecretType::AnonKey);
    }
}
