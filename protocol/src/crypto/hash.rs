//! # Hashing Utilities
//!
//! SHA-256 is the only hash the identity subsystem uses. It feeds DID
//! derivation and ledger transaction IDs, both of which must be stable
//! across processes and implementations, so there is no room for a
//! "faster" alternative here.

use sha2::{Digest, Sha256};

use crate::config::HASH_OUTPUT_LENGTH;

/// Compute the SHA-256 digest of `data`.
///
/// # Example
///
/// ```
/// use retail_identity::crypto::sha256;
///
/// let digest = sha256(b"retailer");
/// assert_eq!(digest.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 digest as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}
