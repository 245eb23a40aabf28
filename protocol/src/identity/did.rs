//! # DID Derivation
//!
//! Maps a retailer's public key to a self-certifying Decentralized
//! Identifier. The identifier is a pure function of the SPKI DER bytes, so
//! anyone holding the public key can recompute and check it.
//!
//! ## DID Format
//!
//! ```text
//! did:<method>:z<base58btc(sha256(spki_der))>
//! ```
//!
//! Example: `did:retail:z8mWaJHqHbTfAkoL2nFYdV4oQ3Bn7X...`
//!
//! The `z` is the multibase tag for base58btc. The full 32-byte digest is
//! kept, so collision resistance is that of SHA-256.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{DEFAULT_DID_METHOD, HASH_OUTPUT_LENGTH, MULTIBASE_BASE58BTC};
use crate::crypto::hash::sha256;
use crate::crypto::keys::KeyCodec;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during DID operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DidError {
    /// The public key text is not base64 SPKI for an Ed25519 key.
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// The DID string does not match `did:<method>:<identifier>`.
    #[error("invalid DID format: {0}")]
    InvalidFormat(String),

    /// The DID method does not match the configured one.
    #[error("unsupported DID method: expected '{expected}', got '{actual}'")]
    UnsupportedMethod { expected: String, actual: String },
}

// ---------------------------------------------------------------------------
// RetailerDid
// ---------------------------------------------------------------------------

/// A parsed retailer DID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RetailerDid {
    method: String,
    fingerprint: [u8; HASH_OUTPUT_LENGTH],
}

impl RetailerDid {
    /// The DID method segment.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// SHA-256 of the SPKI DER this DID was derived from.
    pub fn fingerprint(&self) -> &[u8; HASH_OUTPUT_LENGTH] {
        &self.fingerprint
    }

    /// Full DID string.
    pub fn to_did_string(&self) -> String {
        format!(
            "did:{}:{}{}",
            self.method,
            MULTIBASE_BASE58BTC,
            bs58::encode(self.fingerprint).into_string()
        )
    }
}

impl fmt::Display for RetailerDid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_did_string())
    }
}

impl From<RetailerDid> for String {
    fn from(did: RetailerDid) -> Self {
        did.to_did_string()
    }
}

impl TryFrom<String> for RetailerDid {
    type Error = DidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_any_method(&value)
    }
}

/// Parse a DID without pinning the method.
fn parse_any_method(did: &str) -> Result<RetailerDid, DidError> {
    let parts: Vec<&str> = did.splitn(3, ':').collect();
    if parts.len() != 3 {
        return Err(DidError::InvalidFormat(
            "DID must have format 'did:<method>:<identifier>'".into(),
        ));
    }
    if parts[0] != "did" {
        return Err(DidError::InvalidFormat(format!(
            "expected 'did' prefix, got '{}'",
            parts[0]
        )));
    }
    if parts[1].is_empty() {
        return Err(DidError::InvalidFormat("empty DID method".into()));
    }

    let encoded = parts[2]
        .strip_prefix(MULTIBASE_BASE58BTC)
        .ok_or_else(|| DidError::InvalidFormat("identifier must be base58btc multibase".into()))?;
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| DidError::InvalidFormat(format!("identifier: {}", e)))?;
    let fingerprint: [u8; HASH_OUTPUT_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
        DidError::InvalidFormat(format!(
            "identifier must decode to {} bytes",
            HASH_OUTPUT_LENGTH
        ))
    })?;

    Ok(RetailerDid {
        method: parts[1].to_string(),
        fingerprint,
    })
}

// ---------------------------------------------------------------------------
// DidDeriver
// ---------------------------------------------------------------------------

/// Derives DIDs for a configured method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DidDeriver {
    method: String,
}

impl Default for DidDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_DID_METHOD)
    }
}

impl DidDeriver {
    /// Create a deriver for `did:<method>:` identifiers.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
        }
    }

    /// The configured DID method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The `did:<method>:` prefix every derived DID starts with.
    pub fn prefix(&self) -> String {
        format!("did:{}:", self.method)
    }

    /// Derive the DID for a base64 SPKI public key.
    ///
    /// Deterministic and pure: the same key text always yields the same DID,
    /// in this process or any other.
    ///
    /// # Example
    ///
    /// ```
    /// use retail_identity::crypto::{KeyCodec, KeyGenerator};
    /// use retail_identity::identity::DidDeriver;
    ///
    /// let kp = KeyCodec::new().generate().unwrap();
    /// let deriver = DidDeriver::default();
    /// let did = deriver.derive(kp.public_key()).unwrap();
    /// assert!(did.to_string().starts_with("did:retail:z"));
    /// assert_eq!(did, deriver.derive(kp.public_key()).unwrap());
    /// ```
    pub fn derive(&self, public_key_text: &str) -> Result<RetailerDid, DidError> {
        let der = KeyCodec::decode_public_key_der(public_key_text)
            .map_err(|e| DidError::InvalidKeyEncoding(e.to_string()))?;
        Ok(RetailerDid {
            method: self.method.clone(),
            fingerprint: sha256(&der),
        })
    }

    /// Parse a DID string and check that it uses this deriver's method.
    pub fn parse(&self, did: &str) -> Result<RetailerDid, DidError> {
        let parsed = parse_any_method(did)?;
        if parsed.method != self.method {
            return Err(DidError::UnsupportedMethod {
                expected: self.method.clone(),
                actual: parsed.method,
            });
        }
        Ok(parsed)
    }

    /// Check that `did` was derived from `public_key_text`.
    pub fn matches(&self, did: &str, public_key_text: &str) -> bool {
        match (self.parse(did), self.derive(public_key_text)) {
            (Ok(parsed), Ok(derived)) => parsed == derived,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{KeyGenerator, SeededKeyGenerator};
    use std::collections::HashSet;

    fn fresh_public_key() -> String {
        KeyCodec::new().generate().unwrap().public_key().to_string()
    }

    #[test]
    fn did_string_format() {
        let did = DidDeriver::default().derive(&fresh_public_key()).unwrap();
        let s = did.to_did_string();
        assert!(s.starts_with("did:retail:z"), "got: {}", s);
        assert_eq!(did.method(), "retail");
    }

    #[test]
    fn derive_is_deterministic() {
        let key = fresh_public_key();
        let deriver = DidDeriver::default();
        assert_eq!(deriver.derive(&key).unwrap(), deriver.derive(&key).unwrap());
    }

    #[test]
    fn derive_is_stable_across_deriver_instances() {
        let kp = SeededKeyGenerator::new([3u8; 32]).generate().unwrap();
        let a = DidDeriver::new("retail").derive(kp.public_key()).unwrap();
        let b = DidDeriver::new("retail").derive(kp.public_key()).unwrap();
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn fingerprint_is_sha256_of_spki() {
        let key = fresh_public_key();
        let der = KeyCodec::decode_public_key_der(&key).unwrap();
        let did = DidDeriver::default().derive(&key).unwrap();
        assert_eq!(did.fingerprint(), &sha256(&der));
    }

    #[test]
    fn thousand_keypairs_yield_distinct_dids() {
        let deriver = DidDeriver::default();
        let codec = KeyCodec::new();
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let kp = codec.generate().unwrap();
            let did = deriver.derive(kp.public_key()).unwrap().to_did_string();
            assert!(seen.insert(did), "DID collision");
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn configured_method_is_used() {
        let did = DidDeriver::new("sih").derive(&fresh_public_key()).unwrap();
        assert!(did.to_string().starts_with("did:sih:z"));
    }

    #[test]
    fn malformed_key_text_rejected() {
        let deriver = DidDeriver::default();
        assert!(matches!(
            deriver.derive("!!!"),
            Err(DidError::InvalidKeyEncoding(_))
        ));
        assert!(matches!(
            deriver.derive("test-public-key-123"),
            Err(DidError::InvalidKeyEncoding(_))
        ));
    }

    #[test]
    fn parse_roundtrip() {
        let deriver = DidDeriver::default();
        let did = deriver.derive(&fresh_public_key()).unwrap();
        assert_eq!(deriver.parse(&did.to_string()).unwrap(), did);
    }

    #[test]
    fn parse_rejects_bad_shapes() {
        let deriver = DidDeriver::default();
        assert!(matches!(
            deriver.parse("notadid:retail:zabc"),
            Err(DidError::InvalidFormat(_))
        ));
        assert!(matches!(
            deriver.parse("did:retail"),
            Err(DidError::InvalidFormat(_))
        ));
        assert!(matches!(
            deriver.parse("did:retail:abc"),
            Err(DidError::InvalidFormat(_))
        ));
        assert!(matches!(
            deriver.parse("did:retail:z111"),
            Err(DidError::InvalidFormat(_))
        ));
    }

    #[test]
    fn parse_rejects_foreign_method() {
        let other = DidDeriver::new("ethr").derive(&fresh_public_key()).unwrap();
        assert!(matches!(
            DidDeriver::default().parse(&other.to_string()),
            Err(DidError::UnsupportedMethod { .. })
        ));
    }

    #[test]
    fn matches_checks_binding() {
        let deriver = DidDeriver::default();
        let key = fresh_public_key();
        let did = deriver.derive(&key).unwrap().to_string();
        assert!(deriver.matches(&did, &key));
        assert!(!deriver.matches(&did, &fresh_public_key()));
    }

    #[test]
    fn serde_uses_did_string() {
        let did = DidDeriver::default().derive(&fresh_public_key()).unwrap();
        let json = serde_json::to_string(&did).unwrap();
        assert_eq!(json, format!("\"{}\"", did));
        let back: RetailerDid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, did);
    }
}
