// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Retail Identity: Core Library
//!
//! Self-certifying identities for retailers, and the sealed envelopes that
//! keep their credentials out of plaintext storage.
//!
//! A retailer presents a business credential (trade license or GSTIN) and a
//! mobile number. Once an external gateway vouches for the credential, the
//! service mints an Ed25519 keypair, derives a DID from the public key,
//! seals the PII under the server key with AES-256-GCM, persists the record
//! and announces the public identity on a ledger channel.
//!
//! ## Architecture
//!
//! - **crypto**: Key encoding, field envelopes, hashing.
//! - **identity**: DID derivation and parsing.
//! - **retailer**: The persisted record and its public projections.
//! - **verification**: The credential gateway contract and bundled gateways.
//! - **ledger**: The identity ledger contract and bundled ledgers.
//! - **storage**: sled-backed retailer store with atomic DID uniqueness.
//! - **registration**: The service that ties it all together.
//! - **error**: The service error taxonomy.
//! - **config**: Constants and the server key.
//!
//! ## Ground rules
//!
//! 1. Private keys are returned once and never stored.
//! 2. PII is only ever persisted as an envelope.
//! 3. Nothing is created for a rejected credential.
//! 4. A ledger failure never rolls back a persisted record.

pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod registration;
pub mod retailer;
pub mod storage;
pub mod verification;

pub use config::ServerKey;
pub use error::{ErrorKind, IdentityError, IdentityResult};
pub use registration::{LedgerOutcome, RegistrationOutcome, RegistrationRequest, RegistrationService};
