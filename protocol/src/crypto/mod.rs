//! # Cryptographic Primitives
//!
//! Everything security-related in the identity subsystem flows through here:
//!
//! - **Ed25519** keypairs, encoded as SPKI / PKCS#8 DER and base64.
//! - **AES-256-GCM** field envelopes under the server key.
//! - **SHA-256** for DID derivation and ledger transaction IDs.
//!
//! These are thin, typed wrappers around audited implementations. Nothing
//! here is hand-rolled.

pub mod encryption;
pub mod hash;
pub mod keys;

pub use encryption::{EncryptionError, FieldCipher};
pub use hash::{sha256, sha256_hex};
pub use keys::{EncodedKeypair, KeyCodec, KeyError, KeyGenerator, SeededKeyGenerator};
