//! Nonce generation for the AEAD layer.
//!
//! Nonces are random, fixed-length, and generated fresh for every seal.
//! No uniqueness is enforced beyond the birthday bound of the CSPRNG;
//! callers persist the nonce alongside the version it sealed so it can
//! be reproduced for decryption.

use crate::aead::NONCE_SIZE;

/// Source of AEAD nonces.
///
/// A trait so tests can pin nonces; production uses `SystemNonceSource`.
pub trait NonceSource: Send + Sync {
    /// Generate a fresh nonce.
    fn generate(&self) -> [u8; NONCE_SIZE];
}

/// Nonce source backed by the OS CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNonceSource;

impl NonceSource for SystemNonceSource {
    fn generate(&self) -> [u8; NONCE_SIZE] {
        use rand::rngs::OsRng;
        use rand::RngCore;

        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);
        nonce
    }
}
