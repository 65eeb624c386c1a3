//! Vault engine for CredVault.
//!
//! This module provides:
//! - The `VaultService` orchestrator behind the public secret operations
//! - Typed, validated request structures for the HTTP boundary
//! - Process configuration (master key loading)
//!
//! # Architecture
//! The vault module sits between the HTTP surface and the persistence
//! ports, driving all key derivation and sealing; plaintext exists only
//! transiently inside it and ciphertext never leaves it.

pub mod config;
pub mod request;
pub mod service;

pub use config::{VaultConfig, MASTER_KEY_ENV};
pub use request::{CreateSecretRequest, RotateSecretRequest};
pub use service::{AuditContext, VaultService};
