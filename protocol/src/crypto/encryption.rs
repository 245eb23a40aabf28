//! # Field Encryption (AES-256-GCM)
//!
//! Sensitive retailer fields (mobile number, trade license, GSTIN) are
//! sealed one field at a time into self-contained envelopes before they
//! touch the store. This module is the confidentiality boundary: plaintext
//! goes in, only envelopes come out.
//!
//! ## Envelope format
//!
//! ```text
//! base64( iv[12] || tag[16] || ciphertext[n] )
//! ```
//!
//! AES-GCM natively emits `ciphertext || tag`; we seal detached and lay the
//! tag out in front so the envelope is byte-compatible with envelopes
//! produced by other `iv|tag|ciphertext` implementations.
//!
//! ## Nonce management
//!
//! Every `encrypt` call draws a fresh random 96-bit IV from `OsRng`. With a
//! single long-lived server key the birthday bound sits around 2^48
//! envelopes, far beyond the number of fields a registry ever seals.
//!
//! ## Failure behavior
//!
//! `decrypt` fails closed. A bad tag, a truncated envelope or a wrong key
//! yields [`EncryptionError`], never partial plaintext.

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Key, Nonce, Tag,
};
use base64::Engine;
use rand::RngCore;
use thiserror::Error;

use crate::config::{ServerKey, AES_NONCE_LENGTH, AES_TAG_LENGTH, MIN_ENVELOPE_LENGTH};

/// Errors that can occur while sealing or opening an envelope.
///
/// Authentication failures are deliberately not broken down further: the
/// difference between "wrong key" and "tampered ciphertext" is nobody's
/// business.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("encryption failed")]
    EncryptFailed,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(&'static str),
}

/// Authenticated field cipher bound to the process-wide server key.
///
/// Built once at startup from a [`ServerKey`] and shared behind an `Arc`.
/// Holds no mutable state, so concurrent calls need no locking.
#[derive(Clone)]
pub struct FieldCipher {
    cipher: Aes256Gcm,
}

impl FieldCipher {
    /// Bind a cipher to the given server key.
    pub fn new(key: &ServerKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes())),
        }
    }

    /// Seal `plaintext` into a base64 envelope under a fresh random IV.
    ///
    /// # Example
    ///
    /// ```
    /// use retail_identity::config::ServerKey;
    /// use retail_identity::crypto::FieldCipher;
    ///
    /// let cipher = FieldCipher::new(&ServerKey::from_bytes([0x42; 32]));
    /// let envelope = cipher.encrypt("+910000000000").unwrap();
    /// assert_eq!(cipher.decrypt(&envelope).unwrap(), "+910000000000");
    /// ```
    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let mut iv = [0u8; AES_NONCE_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buffer)
            .map_err(|_| EncryptionError::EncryptFailed)?;

        let mut sealed = Vec::with_capacity(MIN_ENVELOPE_LENGTH + buffer.len());
        sealed.extend_from_slice(&iv);
        sealed.extend_from_slice(tag.as_slice());
        sealed.extend_from_slice(&buffer);
        Ok(base64::engine::general_purpose::STANDARD.encode(sealed))
    }

    /// Open an envelope produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// - [`EncryptionError::MalformedEnvelope`] if the text is not base64,
    ///   is shorter than IV + tag, or the authenticated plaintext is not
    ///   UTF-8.
    /// - [`EncryptionError::AuthenticationFailed`] if the tag does not
    ///   verify under this key.
    pub fn decrypt(&self, envelope: &str) -> Result<String, EncryptionError> {
        let sealed = base64::engine::general_purpose::STANDARD
            .decode(envelope.trim())
            .map_err(|_| EncryptionError::MalformedEnvelope("not valid base64"))?;
        if sealed.len() < MIN_ENVELOPE_LENGTH {
            return Err(EncryptionError::MalformedEnvelope("envelope too short"));
        }

        let (iv, rest) = sealed.split_at(AES_NONCE_LENGTH);
        let (tag, ciphertext) = rest.split_at(AES_TAG_LENGTH);

        let mut buffer = ciphertext.to_vec();
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(iv),
                b"",
                &mut buffer,
                Tag::from_slice(tag),
            )
            .map_err(|_| EncryptionError::AuthenticationFailed)?;

        String::from_utf8(buffer)
            .map_err(|_| EncryptionError::MalformedEnvelope("plaintext is not UTF-8"))
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FieldCipher(AES-256-GCM, key=<redacted>)")
    }
}
