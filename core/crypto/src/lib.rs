//! Cryptographic primitives for CredVault.
//!
//! This module provides:
//! - Deterministic per-secret key derivation (keyed BLAKE2b-256)
//! - Authenticated encryption using XChaCha20-Poly1305
//! - Random nonce generation from the OS CSPRNG
//! - Secure key management with automatic zeroization
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Decryption authenticates before returning plaintext

pub mod aead;
pub mod kdf;
pub mod keys;
pub mod nonce;

pub use aead::{nonce_from_slice, open, seal, ENCRYPTION_METHOD, NONCE_SIZE, TAG_SIZE};
pub use kdf::{derive_secret_key, secret_context};
pub use keys::{MasterKey, SecretKey, KEY_LENGTH};
pub use nonce::{NonceSource, SystemNonceSource};
