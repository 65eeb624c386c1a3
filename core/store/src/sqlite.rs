//! SQLite-backed persistence for secrets and the audit trail.
//!
//! One database file, two tables. Blocking rusqlite calls run on the
//! tokio blocking pool. The single-active invariant is enforced by a
//! partial unique index, and rotation uses a conditional update inside
//! a transaction so a losing writer never partially applies.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use credvault_common::{Error, OwnerId, Result, SecretType, SourceType};

use crate::port::{AuditLog, SecretStore};
use crate::record::{
    AuditAction, NewAuditRecord, NewSecret, SecretId, SecretMetadata, SecretRecord,
};

const SECRET_COLUMNS: &str = "id, owner_id, key_name, secret_type, source_type, ciphertext, \
     nonce, encryption_method, key_version, is_active, created_at, updated_at, \
     last_rotated_at, last_accessed_at, expires_at, created_by, updated_by";

/// SQLite store implementing both persistence ports.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(db_err)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open a fresh in-memory database. For tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS secrets (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                key_name TEXT NOT NULL,
                secret_type TEXT NOT NULL,
                source_type TEXT NOT NULL,
                ciphertext BLOB NOT NULL,
                nonce BLOB NOT NULL,
                encryption_method TEXT NOT NULL,
                key_version INTEGER NOT NULL,
                is_active INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_rotated_at TEXT,
                last_accessed_at TEXT,
                expires_at TEXT,
                created_by TEXT NOT NULL,
                updated_by TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS secrets_one_active
                ON secrets(owner_id, secret_type) WHERE is_active = 1;
            CREATE TABLE IF NOT EXISTS audit_log (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                secret_id TEXT,
                action TEXT NOT NULL,
                context TEXT NOT NULL,
                source TEXT NOT NULL,
                success INTEGER NOT NULL,
                error_message TEXT,
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS audit_log_owner_ts
                ON audit_log(owner_id, timestamp);",
        )
        .map_err(db_err)
    }
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::Persistence(e.to_string())
}

fn join_err(e: tokio::task::JoinError) -> Error {
    Error::Persistence(format!("blocking task failed: {}", e))
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn to_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Serialization(format!("Invalid timestamp in store: {}", e)))
}

fn parse_opt_ts(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_ts(&s)).transpose()
}

/// Row image before domain-type parsing.
struct RawSecret {
    id: String,
    owner_id: String,
    key_name: String,
    secret_type: String,
    source_type: String,
    ciphertext: Vec<u8>,
    nonce: Vec<u8>,
    encryption_method: String,
    key_version: i64,
    is_active: i64,
    created_at: String,
    updated_at: String,
    last_rotated_at: Option<String>,
    last_accessed_at: Option<String>,
    expires_at: Option<String>,
    created_by: String,
    updated_by: String,
}

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSecret> {
    Ok(RawSecret {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        key_name: row.get(2)?,
        secret_type: row.get(3)?,
        source_type: row.get(4)?,
        ciphertext: row.get(5)?,
        nonce: row.get(6)?,
        encryption_method: row.get(7)?,
        key_version: row.get(8)?,
        is_active: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        last_rotated_at: row.get(12)?,
        last_accessed_at: row.get(13)?,
        expires_at: row.get(14)?,
        created_by: row.get(15)?,
        updated_by: row.get(16)?,
    })
}

fn into_record(raw: RawSecret) -> Result<SecretRecord> {
    Ok(SecretRecord {
        id: SecretId::parse(&raw.id)?,
        owner_id: OwnerId::new(raw.owner_id)?,
        key_name: raw.key_name,
        secret_type: raw.secret_type.parse::<SecretType>()?,
        source_type: raw.source_type.parse::<SourceType>()?,
        ciphertext: raw.ciphertext,
        nonce: raw.nonce,
        encryption_method: raw.encryption_method,
        key_version: raw.key_version as u32,
        is_active: raw.is_active != 0,
        created_at: parse_ts(&raw.created_at)?,
        updated_at: parse_ts(&raw.updated_at)?,
        last_rotated_at: parse_opt_ts(raw.last_rotated_at)?,
        last_accessed_at: parse_opt_ts(raw.last_accessed_at)?,
        expires_at: parse_opt_ts(raw.expires_at)?,
        created_by: OwnerId::new(raw.created_by)?,
        updated_by: OwnerId::new(raw.updated_by)?,
    })
}

#[async_trait]
impl SecretStore for SqliteStore {
    async fn find_active(
        &self,
        owner_id: &OwnerId,
        secret_type: SecretType,
    ) -> Result<Option<SecretRecord>> {
        let conn = self.conn.clone();
        let owner = owner_id.as_str().to_string();
        let ty = secret_type.as_str();

        let raw = tokio::task::spawn_blocking(move || -> Result<Option<RawSecret>> {
            let conn = conn.lock().unwrap();
            conn.query_row(
                &format!(
                    "SELECT {SECRET_COLUMNS} FROM secrets
                     WHERE owner_id = ?1 AND secret_type = ?2 AND is_active = 1"
                ),
                params![owner, ty],
                read_raw,
            )
            .optional()
            .map_err(db_err)
        })
        .await
        .map_err(join_err)??;

        raw.map(into_record).transpose()
    }

    async fn insert(&self, record: NewSecret) -> Result<SecretRecord> {
        let conn = self.conn.clone();

        let raw = tokio::task::spawn_blocking(move || -> Result<RawSecret> {
            let conn = conn.lock().unwrap();
            let id = SecretId::generate().to_string();
            let now = to_ts(Utc::now());

            let inserted = conn.execute(
                "INSERT INTO secrets (id, owner_id, key_name, secret_type, source_type,
                     ciphertext, nonce, encryption_method, key_version, is_active,
                     created_at, updated_at, expires_at, created_by, updated_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, 1, ?9, ?9, ?10, ?11, ?11)",
                params![
                    id,
                    record.owner_id.as_str(),
                    record.key_name,
                    record.secret_type.as_str(),
                    record.source_type.as_str(),
                    record.ciphertext,
                    record.nonce,
                    record.encryption_method,
                    now,
                    record.expires_at.map(to_ts),
                    record.created_by.as_str(),
                ],
            );

            match inserted {
                Ok(_) => conn
                    .query_row(
                        &format!("SELECT {SECRET_COLUMNS} FROM secrets WHERE id = ?1"),
                        params![id],
                        read_raw,
                    )
                    .map_err(db_err),
                Err(e) if is_unique_violation(&e) => Err(Error::Conflict(format!(
                    "Active secret of type {} already exists",
                    record.secret_type
                ))),
                Err(e) => Err(db_err(e)),
            }
        })
        .await
        .map_err(join_err)??;

        into_record(raw)
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
        let conn = self.conn.clone();
        let id = id.to_string();
        let updated_by = updated_by.as_str().to_string();

        let raw = tokio::task::spawn_blocking(move || -> Result<RawSecret> {
            let mut conn = conn.lock().unwrap();
            let tx = conn.transaction().map_err(db_err)?;

            let current: Option<(i64, i64)> = tx
                .query_row(
                    "SELECT key_version, is_active FROM secrets WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(db_err)?;

            match current {
                None | Some((_, 0)) => {
                    return Err(Error::NotFound(format!("Secret {} not found", id)));
                }
                Some((version, _)) if version != i64::from(expected_version) => {
                    return Err(Error::VersionConflict {
                        expected: expected_version,
                    });
                }
                Some(_) => {}
            }

            let now = to_ts(Utc::now());
            tx.execute(
                "UPDATE secrets
                 SET ciphertext = ?2, nonce = ?3, key_version = key_version + 1,
                     expires_at = ?4, last_rotated_at = ?5, updated_at = ?5,
                     updated_by = ?6
                 WHERE id = ?1 AND key_version = ?7 AND is_active = 1",
                params![
                    id,
                    ciphertext,
                    nonce,
                    expires_at.map(to_ts),
                    now,
                    updated_by,
                    expected_version,
                ],
            )
            .map_err(db_err)?;

            let raw = tx
                .query_row(
                    &format!("SELECT {SECRET_COLUMNS} FROM secrets WHERE id = ?1"),
                    params![id],
                    read_raw,
                )
                .map_err(db_err)?;

            tx.commit().map_err(db_err)?;
            Ok(raw)
        })
        .await
        .map_err(join_err)??;

        into_record(raw)
    }

    async fn soft_delete(&self, id: &SecretId, updated_by: &OwnerId) -> Result<()> {
        let conn = self.conn.clone();
        let id = id.to_string();
        let updated_by = updated_by.as_str().to_string();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = conn.lock().unwrap();
            let changed = conn
                .execute(
                    "UPDATE secrets SET is_active = 0, updated_at = ?2, updated_by = ?3
                     WHERE id = ?1 AND is_active = 1",
                    params![id, to_ts(Utc::now()), updated_by],
                )
                .map_err(db_err)?;

            if changed == 0 {
                return Err(Error::NotFound(format!("Secret {} not found", id)));
            }
            Ok(())
        })
        .await
        .map_err(join_err)?
    }

    async fn list_active(&self, owner_id: &OwnerId) -> Result<Vec<SecretMetadata>> {
        let conn = self.conn.clone();
        let owner = owner_id.as_str().to_string();

        let raws = tokio::task::spawn_blocking(move || -> Result<Vec<RawSecret>> {
            let conn = conn.lock().unwrap();
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SECRET_COLUMNS} FROM secrets
                     WHERE owner_id = ?1 AND is_active = 1
                     ORDER BY created_at ASC"
                ))
                .map_err(db_err)?;

            let rows = stmt.query_map(params![owner], read_raw).map_err(db_err)?;

            let mut out = Vec::new();
            for row in rows {
                out.push(row.map_err(db_err)?);
            }
            Ok(out)
        })
        .await
        .map_err(join_err)??;

        raws.into_iter()
            .map(|raw| into_record(raw).map(|r| r.metadata()))
            .collect()
    }

    async fn touch_accessed(&self, id: &SecretId) -> Result<()> {
        let conn = self.conn.clone();
        let id = id.to_string();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = conn.lock().unwrap();
            let changed = conn
                .execute(
                    "UPDATE secrets SET last_accessed_at = ?2 WHERE id = ?1",
                    params![id, to_ts(Utc::now())],
                )
                .map_err(db_err)?;

            if changed == 0 {
                return Err(Error::NotFound(format!("Secret {} not found", id)));
            }
            Ok(())
        })
        .await
        .map_err(join_err)?
    }
}

#[async_trait]
impl AuditLog for SqliteStore {
    async fn append(&self, record: NewAuditRecord) -> Result<()> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO audit_log (id, owner_id, secret_id, action, context,
                     source, success, error_message, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    Uuid::new_v4().to_string(),
                    record.owner_id.as_str(),
                    record.secret_id.map(|id| id.to_string()),
                    record.action.as_str(),
                    record.context,
                    record.source,
                    record.success as i64,
                    record.error_message,
                    to_ts(Utc::now()),
                ],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await
        .map_err(join_err)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> OwnerId {
        OwnerId::new("user-1").unwrap()
    }

    fn new_secret(secret_type: SecretType) -> NewSecret {
        NewSecret {
            owner_id: owner(),
            key_name: "test key".to_string(),
            secret_type,
            source_type: SourceType::UserProvided,
            ciphertext: vec![1, 2, 3],
            nonce: vec![9; 24],
            encryption_method: "xchacha20-poly1305".to_string(),
            expires_at: None,
            created_by: owner(),
        }
    }

    #[tokio::test]
    async fn test_insert_roundtrips_through_sqlite() {
        let store = SqliteStore::open_in_memory().unwrap();

        let stored = store
            .insert(new_secret(SecretType::WebhookSecret))
            .await
            .unwrap();
        assert_eq!(stored.key_version, 1);

        let found = store
            .find_active(&owner(), SecretType::WebhookSecret)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, stored.id);
        assert_eq!(found.ciphertext, vec![1, 2, 3]);
        assert_eq!(found.nonce, vec![9; 24]);
        assert_eq!(found.secret_type, SecretType::WebhookSecret);
    }

    #[tokio::test]
    async fn test_unique_index_enforces_single_active() {
        let store = SqliteStore::open_in_memory().unwrap();

        store.insert(new_secret(SecretType::AnonKey)).await.unwrap();
        let result = store.insert(new_secret(SecretType::AnonKey)).await;

        assert!(matches!(result, Err(Error::Conflict(_))));

        // A different type is fine
        store
            .insert(new_secret(SecretType::ServiceRole))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rotate_conditional_update() {
        let store = SqliteStore::open_in_memory().unwrap();
        let stored = store.insert(new_secret(SecretType::AnonKey)).await.unwrap();

        let rotated = store
            .update_rotated(&stored.id, 1, vec![7], vec![8; 24], None, &owner())
            .await
            .unwrap();
        assert_eq!(rotated.key_version, 2);
        assert!(rotated.last_rotated_at.is_some());

        // Stale expected_version loses
        let result = store
            .update_rotated(&stored.id, 1, vec![9], vec![10; 24], None, &owner())
            .await;
        assert!(matches!(result, Err(Error::VersionConflict { expected: 1 })));

        // And the losing writer changed nothing
        let current = store
            .find_active(&owner(), SecretType::AnonKey)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.key_version, 2);
        assert_eq!(current.ciphertext, vec![7]);
    }

    #[tokio::test]
    async fn test_soft_delete_then_reinsert() {
        let store = SqliteStore::open_in_memory().unwrap();
        let stored = store.insert(new_secret(SecretType::AnonKey)).await.unwrap();

        store.soft_delete(&stored.id, &owner()).await.unwrap();
        assert!(store
            .find_active(&owner(), SecretType::AnonKey)
            .await
            .unwrap()
            .is_none());

        // Deleting again is NotFound
        let result = store.soft_delete(&stored.id, &owner()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));

        // The partial index frees the slot for a fresh secret
        store.insert(new_secret(SecretType::AnonKey)).await.unwrap();
    }

    #[tokio::test]
    async fn test_rotate_deleted_secret_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let stored = store.insert(new_secret(SecretType::AnonKey)).await.unwrap();
        store.soft_delete(&stored.id, &owner()).await.unwrap();

        let result = store
            .update_rotated(&stored.id, 1, vec![7], vec![8; 24], None, &owner())
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert(new_secret(SecretType::AnonKey)).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let found = store
            .find_active(&owner(), SecretType::AnonKey)
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_audit_append() {
        let store = SqliteStore::open_in_memory().unwrap();

        store
            .append(NewAuditRecord {
                owner_id: owner(),
                secret_id: None,
                action: AuditAction::List,
                context: "secrets.list".to_string(),
                source: "api".to_string(),
                success: true,
                error_message: None,
            })
            .await
            .unwrap();

        let conn = store.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
