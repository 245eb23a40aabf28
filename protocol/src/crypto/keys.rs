//! # Key Generation & Encoding
//!
//! Every retailer identity is anchored in an Ed25519 keypair generated at
//! registration time. This module creates those keypairs and moves them
//! between their binary and text forms:
//!
//! ```text
//! VerifyingKey --SPKI DER--> bytes --base64--> publicKeyText
//! SigningKey --PKCS#8 DER--> bytes --base64--> privateKeyText
//! ```
//!
//! Both encodings are standard key-info structures, so a retailer can load
//! the backup into OpenSSL or any PKCS#8-aware wallet.
//!
//! ## Security considerations
//!
//! - Keys come from `OsRng`.
//! - The private key text lives in a zeroize-on-drop buffer. It is handed
//!   back to the caller exactly once and the service keeps no copy.
//! - Key bytes are never logged, and `Debug` output is redacted.

use std::fmt;

use base64::Engine;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;
use zeroize::Zeroizing;

/// Errors that can occur during key operations.
///
/// Messages never include key material.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key generation failed: {0}")]
    Generation(String),

    #[error("invalid public key encoding: {0}")]
    InvalidPublicKey(String),

    #[error("invalid private key encoding")]
    InvalidPrivateKey,
}

/// A freshly generated keypair in its text encodings.
///
/// `public_key` is base64(SPKI DER). The private half is base64(PKCS#8 DER)
/// and is only reachable through [`private_key`](Self::private_key) or
/// [`into_private_key`](Self::into_private_key).
pub struct EncodedKeypair {
    public_key: String,
    private_key: Zeroizing<String>,
}

impl EncodedKeypair {
    /// Base64 SPKI DER public key.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Base64 PKCS#8 DER private key.
    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    /// Consume the pair, releasing the private key text to the caller.
    pub fn into_private_key(self) -> Zeroizing<String> {
        self.private_key
    }
}

impl fmt::Debug for EncodedKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedKeypair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Source of fresh identity keypairs.
///
/// The registration service depends on this trait rather than on
/// [`KeyCodec`] directly so alternative key sources can be plugged in.
pub trait KeyGenerator: Send + Sync {
    /// Produce a new keypair in text form.
    fn generate(&self) -> Result<EncodedKeypair, KeyError>;
}

/// Ed25519 keypair generator and SPKI/PKCS#8 codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCodec;

impl KeyCodec {
    pub fn new() -> Self {
        Self
    }

    /// Encode an existing signing key and its public half.
    pub fn encode(signing_key: &SigningKey) -> Result<EncodedKeypair, KeyError> {
        let engine = &base64::engine::general_purpose::STANDARD;

        let public_der = signing_key
            .verifying_key()
            .to_public_key_der()
            .map_err(|e| KeyError::Generation(format!("SPKI encoding: {}", e)))?;
        let private_der = signing_key
            .to_pkcs8_der()
            .map_err(|e| KeyError::Generation(format!("PKCS#8 encoding: {}", e)))?;

        Ok(EncodedKeypair {
            public_key: engine.encode(public_der.as_bytes()),
            private_key: Zeroizing::new(engine.encode(private_der.as_bytes())),
        })
    }

    /// Decode public key text to its SPKI DER bytes.
    ///
    /// The bytes are checked to be a well-formed Ed25519 SPKI structure, so
    /// anything returned here is safe to hash into a DID.
    pub fn decode_public_key_der(text: &str) -> Result<Vec<u8>, KeyError> {
        let der = base64::engine::general_purpose::STANDARD
            .decode(text.trim())
            .map_err(|e| KeyError::InvalidPublicKey(format!("base64: {}", e)))?;
        VerifyingKey::from_public_key_der(&der)
            .map_err(|e| KeyError::InvalidPublicKey(format!("SPKI: {}", e)))?;
        Ok(der)
    }

    /// Decode public key text into a usable verifying key.
    pub fn decode_public_key(text: &str) -> Result<VerifyingKey, KeyError> {
        let der = Self::decode_public_key_der(text)?;
        VerifyingKey::from_public_key_der(&der)
            .map_err(|e| KeyError::InvalidPublicKey(format!("SPKI: {}", e)))
    }

    /// Decode a private key backup into a signing key.
    pub fn decode_private_key(text: &str) -> Result<SigningKey, KeyError> {
        let der = Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .map_err(|_| KeyError::InvalidPrivateKey)?,
        );
        SigningKey::from_pkcs8_der(&der).map_err(|_| KeyError::InvalidPrivateKey)
    }
}

impl KeyGenerator for KeyCodec {
    fn generate(&self) -> Result<EncodedKeypair, KeyError> {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self::encode(&signing_key)
    }
}

/// Deterministic generator that always yields the keypair for one seed.
///
/// Only meant for reproducible tests and demos: every call returns the same
/// identity, so a second registration through it collides on the DID.
#[derive(Clone)]
pub struct SeededKeyGenerator {
    seed: Zeroizing<[u8; 32]>,
}

impl SeededKeyGenerator {
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            seed: Zeroizing::new(seed),
        }
    }
}

impl KeyGenerator for SeededKeyGenerator {
    fn generate(&self) -> Result<EncodedKeypair, KeyError> {
        KeyCodec::encode(&SigningKey::from_bytes(&self.seed))
    }
}

impl fmt::Debug for SeededKeyGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SeededKeyGenerator(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, Verifier};

    /// Every Ed25519 SPKI document starts with the same 12-byte header.
    const ED25519_SPKI_B64_PREFIX: &str = "MCowBQYDK2VwAyEA";

    #[test]
    fn generated_public_key_is_ed25519_spki() {
        let kp = KeyCodec::new().generate().unwrap();
        assert!(kp.public_key().starts_with(ED25519_SPKI_B64_PREFIX));
        let der = KeyCodec::decode_public_key_der(kp.public_key()).unwrap();
        assert_eq!(der.len(), 44);
    }

    #[test]
    fn private_key_backup_restores_the_same_identity() {
        let kp = KeyCodec::new().generate().unwrap();
        let signing = KeyCodec::decode_private_key(kp.private_key()).unwrap();
        let verifying = KeyCodec::decode_public_key(kp.public_key()).unwrap();
        assert_eq!(signing.verifying_key(), verifying);

        let sig = signing.sign(b"retailer challenge");
        assert!(verifying.verify(b"retailer challenge", &sig).is_ok());
    }

    #[test]
    fn encode_decode_is_exact() {
        let signing = SigningKey::from_bytes(&[42u8; 32]);
        let kp = KeyCodec::encode(&signing).unwrap();
        let again = KeyCodec::encode(&KeyCodec::decode_private_key(kp.private_key()).unwrap())
            .unwrap();
        assert_eq!(kp.public_key(), again.public_key());
        assert_eq!(kp.private_key(), again.private_key());
    }

    #[test]
    fn fresh_keypairs_differ() {
        let codec = KeyCodec::new();
        let a = codec.generate().unwrap();
        let b = codec.generate().unwrap();
        assert_ne!(a.public_key(), b.public_key());
        assert_ne!(a.private_key(), b.private_key());
    }

    #[test]
    fn seeded_generator_is_repeatable() {
        let gen = SeededKeyGenerator::new([9u8; 32]);
        assert_eq!(
            gen.generate().unwrap().public_key(),
            gen.generate().unwrap().public_key()
        );
    }

    #[test]
    fn garbage_public_key_rejected() {
        assert!(matches!(
            KeyCodec::decode_public_key_der("not base64!!"),
            Err(KeyError::InvalidPublicKey(_))
        ));
        // Valid base64, but not an SPKI structure.
        assert!(matches!(
            KeyCodec::decode_public_key_der("aGVsbG8gd29ybGQ="),
            Err(KeyError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn garbage_private_key_rejected() {
        assert!(matches!(
            KeyCodec::decode_private_key("aGVsbG8="),
            Err(KeyError::InvalidPrivateKey)
        ));
    }

    #[test]
    fn debug_hides_private_key() {
        let kp = KeyCodec::new().generate().unwrap();
        let shown = format!("{:?}", kp);
        assert!(!shown.contains(kp.private_key()));
        assert!(shown.contains(kp.public_key()));
    }
}
