//! # Storage Module
//!
//! Persistence for retailer records.
//!
//! ```text
//! mod.rs: RetailerStore contract
//! db.rs : sled implementation (RetailerDb)
//! ```
//!
//! The store is the only shared mutable resource in the system. Its one
//! invariant, DID uniqueness, must hold under concurrent writers, so it is
//! enforced inside `create` itself rather than by callers checking first.

pub mod db;

pub use db::{DbError, DbResult, RetailerDb};

use async_trait::async_trait;

use crate::retailer::Retailer;

/// Persistence contract for retailer records.
///
/// Implementations must make `create` atomic with respect to the DID: a
/// second create for an existing DID fails with
/// [`DbError::DuplicateIdentity`] and leaves the first record untouched.
///
/// Once `create` returns `Ok` the record is visible to readers. A failure
/// to make it durable afterwards is not reported as an error, because the
/// caller is about to hand out the only copy of the retailer's private key.
#[async_trait]
pub trait RetailerStore: Send + Sync {
    /// Persist a new record and return it as stored.
    async fn create(&self, record: Retailer) -> DbResult<Retailer>;

    /// Look a record up by DID.
    fn find_by_did(&self, did: &str) -> DbResult<Option<Retailer>>;

    /// Number of stored records.
    fn count(&self) -> DbResult<usize>;
}
