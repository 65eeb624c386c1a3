//! Persistence port definitions.
//!
//! Two logically independent ports over the same external database:
//! [`SecretStore`] for secret records and [`AuditLog`] for the
//! append-only trail. The vault service depends only on these traits,
//! so tests substitute in-memory implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use credvault_common::{OwnerId, Result, SecretType};

use crate::record::{NewAuditRecord, NewSecret, SecretId, SecretMetadata, SecretRecord};

/// CRUD over secret records, keyed by (owner, secret type).
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Find the active secret of a given type for an owner.
    ///
    /// Soft-deleted records are invisible here. At most one record can
    /// match (single-active invariant).
    async fn find_active(
        &self,
        owner_id: &OwnerId,
        secret_type: SecretType,
    ) -> Result<Option<SecretRecord>>;

    /// Insert a new secret with `key_version = 1` and `is_active = true`.
    ///
    /// # Errors
    /// - `Conflict` if an active secret of that type already exists for
    ///   the owner
    async fn insert(&self, record: NewSecret) -> Result<SecretRecord>;

    /// Conditionally replace ciphertext/nonce for a rotation.
    ///
    /// Succeeds only if the stored `key_version` still equals
    /// `expected_version`; the update is all-or-nothing. On success the
    /// version increments by exactly 1 and `last_rotated_at` is set.
    ///
    /// # Errors
    /// - `NotFound` if the record is absent or inactive
    /// - `VersionConflict` if a concurrent rotation won
    async fn update_rotated(
        &self,
        id: &SecretId,
        expected_version: u32,
        ciphertext: Vec<u8>,
        nonce: Vec<u8>,
        expires_at: Option<DateTime<Utc>>,
        updated_by: &OwnerId,
    ) -> Result<SecretRecord>;

    /// Mark a record inactive. The record is retained for history.
    ///
    /// # Errors
    /// - `NotFound` if the record is absent or already inactive
    async fn soft_delete(&self, id: &SecretId, updated_by: &OwnerId) -> Result<()>;

    /// List metadata of all active secrets for an owner.
    ///
    /// Never includes ciphertext or nonce.
    async fn list_active(&self, owner_id: &OwnerId) -> Result<Vec<SecretMetadata>>;

    /// Record a metadata read by setting `last_accessed_at = now`.
    async fn touch_accessed(&self, id: &SecretId) -> Result<()>;
}

/// Append-only audit trail.
///
/// No update or delete is exposed, by contract. Callers treat append
/// failures as operational noise, never as a reason to fail the
/// triggering operation.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append one record for one operation attempt.
    async fn append(&self, record: NewAuditRecord) -> Result<()>;
}
