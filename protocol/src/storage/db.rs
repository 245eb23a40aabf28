//! # RetailerDb: Persistent Storage Engine
//!
//! The persistence layer for retailer records, built on sled's embedded
//! key-value store.
//!
//! ## Tree Layout
//!
//! | Tree        | Key                 | Value                         |
//! |-------------|---------------------|-------------------------------|
//! | `retailers` | DID (UTF-8)         | `json(Retailer)`              |
//! | other       | opened on demand    | e.g. the local ledger journal |
//!
//! Records are JSON rather than bincode: `metadata` is schemaless, and
//! bincode cannot round-trip `serde_json::Value`.
//!
//! ## Atomicity
//!
//! DID uniqueness is enforced with a single `compare_and_swap` from
//! "absent" to the new record. There is no read-then-write window: of two
//! concurrent creates for the same DID exactly one lands, and the other
//! sees [`DbError::DuplicateIdentity`].

use async_trait::async_trait;
use sled::{Db, Tree};
use std::path::Path;

use super::RetailerStore;
use crate::retailer::Retailer;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("retailer already registered: {0}")]
    DuplicateIdentity(String),
}

pub type DbResult<T> = Result<T, DbError>;

// ---------------------------------------------------------------------------
// RetailerDb
// ---------------------------------------------------------------------------

/// Persistent storage for retailer records.
///
/// # Thread Safety
///
/// sled trees support lock-free concurrent reads and serialized writes, so
/// `RetailerDb` can be shared via `Arc<RetailerDb>` without extra locking.
#[derive(Debug, Clone)]
pub struct RetailerDb {
    db: Db,
    /// Retailer records keyed by DID.
    retailers: Tree,
}

impl RetailerDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database, removed when the last handle drops.
    ///
    /// Ideal for unit tests.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let retailers = db.open_tree("retailers")?;
        Ok(Self { db, retailers })
    }

    /// A handle to the underlying sled database.
    pub fn handle(&self) -> Db {
        self.db.clone()
    }

    // -- Retailer operations ------------------------------------------------

    /// Insert a new retailer record, failing if the DID is already taken.
    ///
    /// Does not flush. Durability comes from sled's background flusher or
    /// an explicit [`flush`](Self::flush).
    pub fn insert_retailer(&self, record: &Retailer) -> DbResult<()> {
        let bytes =
            serde_json::to_vec(record).map_err(|e| DbError::Serialization(e.to_string()))?;

        self.retailers
            .compare_and_swap(
                record.retailer_did.as_bytes(),
                None as Option<&[u8]>,
                Some(bytes),
            )?
            .map_err(|_| DbError::DuplicateIdentity(record.retailer_did.clone()))?;
        Ok(())
    }

    /// Fetch a retailer by DID.
    pub fn get_retailer(&self, did: &str) -> DbResult<Option<Retailer>> {
        match self.retailers.get(did.as_bytes())? {
            Some(bytes) => {
                let record: Retailer = serde_json::from_slice(&bytes)
                    .map_err(|e| DbError::Serialization(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Whether a DID is registered.
    pub fn has_retailer(&self, did: &str) -> DbResult<bool> {
        Ok(self.retailers.contains_key(did.as_bytes())?)
    }

    /// Number of registered retailers.
    pub fn retailer_count(&self) -> usize {
        self.retailers.len()
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[async_trait]
impl RetailerStore for RetailerDb {
    async fn create(&self, record: Retailer) -> DbResult<Retailer> {
        self.insert_retailer(&record)?;
        if let Err(e) = self.db.flush_async().await {
            tracing::warn!(did = %record.retailer_did, error = %e, "retailer stored but flush failed");
        }
        Ok(record)
    }

    fn find_by_did(&self, did: &str) -> DbResult<Option<Retailer>> {
        self.get_retailer(did)
    }

    fn count(&self) -> DbResult<usize> {
        Ok(self.retailer_count())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retailer::{BusinessType, Metadata, RetailerStatus};
    use chrono::Utc;
    use std::sync::{Arc, Barrier};

    fn record(did: &str) -> Retailer {
        let mut metadata = Metadata::new();
        metadata.insert("verification".into(), serde_json::json!({"source": "test"}));
        Retailer {
            retailer_did: did.to_string(),
            public_key: "MCowBQYDK2VwAyEAtest".into(),
            enc_trade_license: None,
            enc_gstin: Some("gst-envelope".into()),
            enc_mobile: "mobile-envelope".into(),
            business_type: BusinessType::GstRegistered,
            trust_score: 0.6,
            status: RetailerStatus::Active,
            registration_timestamp: Utc::now(),
            metadata,
        }
    }

    #[tokio::test]
    async fn create_then_find() {
        let db = RetailerDb::open_temporary().unwrap();
        let stored = db.create(record("did:retail:zA")).await.unwrap();
        let found = db.find_by_did("did:retail:zA").unwrap().unwrap();
        assert_eq!(found, stored);
        assert_eq!(db.count().unwrap(), 1);
        assert!(db.has_retailer("did:retail:zA").unwrap());
    }

    #[test]
    fn missing_did_is_none() {
        let db = RetailerDb::open_temporary().unwrap();
        assert!(db.find_by_did("did:retail:zNope").unwrap().is_none());
        assert_eq!(db.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_did_rejected_and_original_kept() {
        let db = RetailerDb::open_temporary().unwrap();
        db.create(record("did:retail:zDup")).await.unwrap();

        let mut second = record("did:retail:zDup");
        second.enc_mobile = "other-envelope".into();
        let err = db.create(second).await.unwrap_err();
        assert!(matches!(err, DbError::DuplicateIdentity(ref did) if did == "did:retail:zDup"));

        let kept = db.find_by_did("did:retail:zDup").unwrap().unwrap();
        assert_eq!(kept.enc_mobile, "mobile-envelope");
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn concurrent_creates_of_same_did_have_one_winner() {
        let db = Arc::new(RetailerDb::open_temporary().unwrap());
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let db = Arc::clone(&db);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    let mut r = record("did:retail:zRace");
                    r.enc_mobile = format!("envelope-{}", i);
                    barrier.wait();
                    db.insert_retailer(&r)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(DbError::DuplicateIdentity(_))))
            .count();
        assert_eq!(winners, 1);
        assert_eq!(duplicates, threads - 1);
        assert_eq!(db.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn created_records_survive_reopen_without_explicit_flush() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = RetailerDb::open(dir.path()).unwrap();
            db.create(record("did:retail:zPersist")).await.unwrap();
        }
        let db = RetailerDb::open(dir.path()).unwrap();
        let found = db.find_by_did("did:retail:zPersist").unwrap().unwrap();
        assert_eq!(found.enc_gstin.as_deref(), Some("gst-envelope"));
        assert_eq!(found.metadata["verification"]["source"], "test");
    }

    #[test]
    fn inserted_record_is_visible_before_flush() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = RetailerDb::open(dir.path()).unwrap();
            db.insert_retailer(&record("did:retail:zLazy")).unwrap();
            assert!(db.has_retailer("did:retail:zLazy").unwrap());
            db.flush().unwrap();
        }
        let db = RetailerDb::open(dir.path()).unwrap();
        assert!(db.has_retailer("did:retail:zLazy").unwrap());
    }

    #[test]
    fn corrupt_record_reports_serialization_error() {
        let db = RetailerDb::open_temporary().unwrap();
        db.retailers.insert("did:retail:zBad", &b"not json"[..]).unwrap();
        assert!(matches!(
            db.find_by_did("did:retail:zBad"),
            Err(DbError::Serialization(_))
        ));
    }
}
