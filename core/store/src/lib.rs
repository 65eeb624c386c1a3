//! Persistence layer for CredVault.
//!
//! This module provides a trait-based interface for the two stores the
//! vault owns (secret records and the append-only audit trail), an
//! in-memory implementation for tests, and an SQLite implementation
//! for deployment.
//!
//! # Design Principles
//! - Port isolation: no crypto or orchestration logic in this layer
//! - Async operations: blocking database work runs off the executor
//! - Metadata-only reads: listing never exposes ciphertext or nonces

pub mod memory;
pub mod port;
pub mod record;
pub mod sqlite;

pub use memory::{MemoryAuditLog, MemorySecretStore};
pub use port::{AuditLog, SecretStore};
pub use record::{
    AuditAction, AuditRecord, NewAuditRecord, NewSecret, SecretId, SecretMetadata, SecretRecord,
};
pub use sqlite::SqliteStore;
