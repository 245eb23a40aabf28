//! # Identity Module
//!
//! Self-certifying identities for retailers. A retailer is identified by a
//! DID derived from an Ed25519 public key generated at registration time:
//!
//! 1. **Keypair**: Ed25519, produced by [`crate::crypto::KeyCodec`]. The
//!    private half is handed to the retailer once and never stored.
//! 2. **DID**: `did:<method>:z<base58btc(sha256(spki))>`, the primary
//!    identity handle and unique key of the retailer record.

pub mod did;

pub use did::{DidDeriver, DidError, RetailerDid};
