//! In-memory store implementations for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use credvault_common::{Error, OwnerId, Result, SecretType};

use crate::port::{AuditLog, SecretStore};
use crate::record::{
    AuditRecord, NewAuditRecord, NewSecret, SecretId, SecretMetadata, SecretRecord,
};

/// In-memory secret store.
///
/// Useful for tests and development. All data is lost on drop. The
/// whole map sits behind one lock, so conditional updates are
/// all-or-nothing exactly like a transactional store.
#[derive(Default)]
pub struct MemorySecretStore {
    records: Arc<RwLock<HashMap<SecretId, SecretRecord>>>,
}

impl MemorySecretStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn find_active(
        &self,
        owner_id: &OwnerId,
        secret_type: SecretType,
    ) -> Result<Option<SecretRecord>> {
        let records = self.records.read().unwrap();
        Ok(records
            .values()
            .find(|r| r.is_active && &r.owner_id == owner_id && r.secret_type == secret_type)
            .cloned())
    }

    async fn insert(&self, record: NewSecret) -> Result<SecretRecord> {
        let mut records = self.records.write().unwrap();

        let duplicate = records.values().any(|r| {
            r.is_active && r.owner_id == record.owner_id && r.secret_type == record.secret_type
        });
        if duplicate {
            return Err(Error::Conflict(format!(
                "Active secret of type {} already exists",
                record.secret_type
            )));
        }

        let now = Utc::now();
        let stored = SecretRecord {
            id: SecretId::generate(),
            owner_id: record.owner_id,
            key_name: record.key_name,
            secret_type: record.secret_type,
            source_type: record.source_type,
            ciphertext: record.ciphertext,
            nonce: record.nonce,
            encryption_method: record.encryption_method,
            key_version: 1,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_rotated_at: None,
            last_accessed_at: None,
            expires_at: record.expires_at,
            created_by: record.created_by.clone(),
            updated_by: record.created_by,
        };

        records.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn update_rotated(
        &self,
        id: &SecretId,
        expected_version: u32,
        ciphertext: Vec<u8>,
        nonce: Vec<u8>,
        expires_at: Option<DateTime<Utc>>,
        updated_by: &OwnerId,
    ) -> Result<SecretRecord> {
        let mut records = self.records.write().unwrap();

        let record = records
            .get_mut(id)
            .filter(|r| r.is_active)
            .ok_or_else(|| Error::NotFound(format!("Secret {} not found", id)))?;

        if record.key_version != expected_version {
            return Err(Error::VersionConflict {
                expected: expected_version,
            });
        }

        let now = Utc::now();
        record.ciphertext = ciphertext;
        record.nonce = nonce;
        record.key_version += 1;
        record.expires_at = expires_at;
        record.last_rotated_at = Some(now);
        record.updated_at = now;
        record.updated_by = updated_by.clone();

        Ok(record.clone())
    }

    async fn soft_delete(&self, id: &SecretId, updated_by: &OwnerId) -> Result<()> {
        let mut records = self.records.write().unwrap();

        let record = records
            .get_mut(id)
            .filter(|r| r.is_active)
            .ok_or_else(|| Error::NotFound(format!("Secret {} not found", id)))?;

        record.is_active = false;
        record.updated_at = Utc::now();
        record.updated_by = updated_by.clone();
        Ok(())
    }

    async fn list_active(&self, owner_id: &OwnerId) -> Result<Vec<SecretMetadata>> {
        let records = self.records.read().unwrap();

        let mut out: Vec<SecretMetadata> = records
            .values()
            .filter(|r| r.is_active && &r.owner_id == owner_id)
            .map(SecretRecord::metadata)
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn touch_accessed(&self, id: &SecretId) -> Result<()> {
        let mut records = self.records.write().unwrap();

        let record = records
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("Secret {} not found", id)))?;

        record.last_accessed_at = Some(Utc::now());
        Ok(())
    }
}

/// In-memory audit log.
///
/// Appends into a growing vector; `records()` exposes the trail for
/// test assertions.
#[derive(Default)]
pub struct MemoryAuditLog {
    records: Arc<RwLock<Vec<AuditRecord>>>,
}

impl MemoryAuditLog {
    /// Create a new empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the full trail, in append order.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.read().unwrap().clone()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, record: NewAuditRecord) -> Result<()> {
        let mut records = self.records.write().unwrap();
        records.push(AuditRecord {
            id: Uuid::new_v4(),
            owner_id: record.owner_id,
            secret_id: record.secret_id,
            action: record.action,
            context: record.context,
            source: record.source,
            success: record.success,
            error_message: record.error_message,
            timestamp: Utc::now(),
        });
        Ok(())
    }
}
