//! # Configuration & Constants
//!
//! Every magic number of the identity subsystem lives here, together with
//! the one piece of runtime configuration the core cannot live without:
//! the server key that seals retailer PII.
//!
//! The server key is loaded once at process start, handed to
//! [`FieldCipher`](crate::crypto::encryption::FieldCipher) by value, and
//! never read from the environment again.

use std::fmt;

use base64::Engine;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

// ---------------------------------------------------------------------------
// Identity Parameters
// ---------------------------------------------------------------------------

/// Default DID method. Produces identifiers of the form `did:retail:z...`.
pub const DEFAULT_DID_METHOD: &str = "retail";

/// Multibase prefix for base58btc.
pub const MULTIBASE_BASE58BTC: char = 'z';

/// Signing algorithm behind every retailer keypair.
pub const SIGNING_ALGORITHM: &str = "Ed25519";

/// Trust score assigned to a retailer at registration time.
pub const DEFAULT_TRUST_SCORE: f64 = 0.6;

/// Ledger channel that receives identity transactions.
pub const IDENTITY_LEDGER_CHANNEL: &str = "IdentityLedger";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// AES-256-GCM for field encryption.
pub const SYMMETRIC_ALGORITHM: &str = "AES-256-GCM";

/// AES-256-GCM key length in bytes.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-256-GCM nonce (IV) length in bytes.
pub const AES_NONCE_LENGTH: usize = 12;

/// AES-256-GCM authentication tag length in bytes.
pub const AES_TAG_LENGTH: usize = 16;

/// Smallest well-formed envelope: IV and tag around an empty ciphertext.
pub const MIN_ENVELOPE_LENGTH: usize = AES_NONCE_LENGTH + AES_TAG_LENGTH;

/// SHA-256 digest length. DIDs carry the full digest.
pub const HASH_OUTPUT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Network Defaults
// ---------------------------------------------------------------------------

/// Default port for the REST API.
pub const DEFAULT_API_PORT: u16 = 5000;

/// Default port for the Prometheus metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9742;

// ---------------------------------------------------------------------------
// Server Key
// ---------------------------------------------------------------------------

/// Errors raised while loading the server key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("server key is missing")]
    MissingServerKey,

    #[error("server key must decode to 32 bytes (64 hex chars or base64)")]
    InvalidServerKey,
}

/// The process-wide symmetric key used to seal sensitive retailer fields.
///
/// Deliberately not `Serialize`, not `Display`, and redacted in `Debug`.
/// The bytes are wiped from memory when the last copy is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ServerKey([u8; AES_KEY_LENGTH]);

impl ServerKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; AES_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh random key from the OS CSPRNG.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; AES_KEY_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parse a key from configuration text.
    ///
    /// Accepts 64 hex characters or standard base64 of exactly 32 bytes.
    /// Surrounding whitespace is ignored; an empty value counts as missing.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ConfigError::MissingServerKey);
        }

        let decoded = if text.len() == AES_KEY_LENGTH * 2 {
            hex::decode(text).ok()
        } else {
            None
        };
        let decoded = Zeroizing::new(match decoded {
            Some(bytes) => bytes,
            None => base64::engine::general_purpose::STANDARD
                .decode(text)
                .map_err(|_| ConfigError::InvalidServerKey)?,
        });

        let mut bytes: [u8; AES_KEY_LENGTH] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| ConfigError::InvalidServerKey)?;
        let key = Self(bytes);
        bytes.zeroize();
        Ok(key)
    }

    /// Hex encoding, for the `keygen` command only.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; AES_KEY_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for ServerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServerKey(<redacted>)")
    }
}
