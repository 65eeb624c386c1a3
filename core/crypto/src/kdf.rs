//! Per-secret key derivation.
//!
//! Each stored secret version is sealed under a one-time key derived from
//! the process-wide master secret, a stable context string, and the nonce
//! that seals that version. Derivation uses keyed BLAKE2b-256; identical
//! inputs always yield the identical key, so a persisted (context, nonce)
//! pair is sufficient to reproduce the key at decrypt time.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

use crate::keys::{MasterKey, SecretKey, KEY_LENGTH};
use credvault_common::{OwnerId, SecretType};

/// Domain separation tag mixed into every derivation.
const DERIVE_TAG: &[u8] = b"credvault-secret-key-v1";

/// Build the derivation context for a secret.
///
/// Stable identifiers only: the same secret keeps the same context across
/// rotations, while secrets of different types (or owners) get unrelated
/// keys.
pub fn secret_context(owner_id: &OwnerId, secret_type: SecretType) -> String {
    format!("{}:{}", owner_id.as_str(), secret_type.as_str())
}

/// Derive the one-time key for a (context, nonce) pair.
///
/// # Postconditions
/// - Deterministic: identical (master, context, nonce) yields the
///   identical key
/// - Keys for different contexts or nonces are unrelated
pub fn derive_secret_key(master: &MasterKey, context: &str, nonce: &[u8]) -> SecretKey {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(master.as_bytes());
    hasher.update(context.as_bytes());
    hasher.update(nonce);
    hasher.update(DERIVE_TAG);

    let result = hasher.finalize();
    let mut derived = [0u8; KEY_LENGTH];
    derived.copy_from_slice(&result);
    SecretKey::from_bytes(derived)
}
