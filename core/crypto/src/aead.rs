//! Authenticated encryption using XChaCha20-Poly1305.
//!
//! XChaCha20-Poly1305 provides both confidentiality and authenticity,
//! with a 24-byte nonce that is safe for random generation. The nonce is
//! supplied by the caller and persisted next to the ciphertext, so these
//! functions stay pure: no randomness, no side effects, no knowledge of
//! the data model.

use chacha20poly1305::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    XChaCha20Poly1305,
};

use crate::keys::SecretKey;
use credvault_common::{Error, Result};

/// Nonce size for XChaCha20-Poly1305 (24 bytes).
pub const NONCE_SIZE: usize = 24;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Identifier of the AEAD scheme, stored per record for migration.
pub const ENCRYPTION_METHOD: &str = "xchacha20-poly1305";

/// Encrypt plaintext under a one-time key and caller-supplied nonce.
///
/// # Preconditions
/// - `nonce` must be unique for each use of `key` (guaranteed upstream:
///   every seal uses a freshly derived key and a fresh nonce)
///
/// # Postconditions
/// - Returns ciphertext || tag; length is plaintext length + TAG_SIZE
///
/// # Errors
/// - Returns error if encryption fails
pub fn seal(key: &SecretKey, nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(key.as_bytes()));
    let nonce_array = GenericArray::from_slice(nonce);

    cipher
        .encrypt(nonce_array, plaintext)
        .map_err(|_| Error::Crypto("Encryption failed".to_string()))
}

/// Decrypt and authenticate ciphertext.
///
/// # Preconditions
/// - `ciphertext` must be at least TAG_SIZE bytes
///
/// # Postconditions
/// - Returns the original plaintext only if the tag verifies
///
/// # Errors
/// - Returns `Integrity` if the ciphertext, nonce, or key is wrong or
///   has been altered; never returns garbage plaintext on tamper
pub fn open(key: &SecretKey, nonce: &[u8; NONCE_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < TAG_SIZE {
        return Err(Error::Integrity("Ciphertext too short".to_string()));
    }

    let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(key.as_bytes()));
    let nonce_array = GenericArray::from_slice(nonce);

    cipher
        .decrypt(nonce_array, ciphertext)
        .map_err(|_| Error::Integrity("Authentication failed".to_string()))
}

/// Parse a persisted nonce back into its fixed-length form.
///
/// # Errors
/// - Returns `Integrity` if the stored nonce has the wrong length
pub fn nonce_from_slice(bytes: &[u8]) -> Result<[u8; NONCE_SIZE]> {
    if bytes.len() != NONCE_SIZE {
        return Err(Error::Integrity(format!(
            "Invalid nonce length: expected {}, got {}",
            NONCE_SIZE,
            bytes.len()
        )));
    }
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(bytes);
    Ok(nonce)
}
