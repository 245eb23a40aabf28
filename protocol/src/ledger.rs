//! # Identity Ledger
//!
//! After a retailer record is persisted, its public identity (DID, public
//! key, trust score, registration time) is announced on the identity ledger
//! channel. The ledger is an external system; this module defines the
//! client contract and two bundled implementations:
//!
//! - [`SledLedger`]: an append-only journal in the node's own sled
//!   database. Good enough for single-node deployments and audits.
//! - [`InMemoryLedger`]: records submissions in memory and can be told to
//!   fail. Used by tests.
//!
//! A submission failure never undoes the persisted record. The registration
//! service reports it as a partial success and operators can resubmit.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::sha256_hex;
use crate::retailer::IdentityTransaction;

/// Errors returned by a ledger client.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("ledger rejected submission: {0}")]
    Rejected(String),

    #[error("ledger storage error: {0}")]
    Storage(String),
}

/// Acknowledgement of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReceipt {
    pub channel: String,
    pub tx_id: String,
    pub sequence: u64,
    pub submitted_at: DateTime<Utc>,
}

/// Client for an append-only identity ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn submit(
        &self,
        channel: &str,
        tx: &IdentityTransaction,
    ) -> Result<LedgerReceipt, LedgerError>;
}

// ---------------------------------------------------------------------------
// SledLedger
// ---------------------------------------------------------------------------

/// Journal entry stored per submission.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JournalEntry {
    receipt: LedgerReceipt,
    transaction: IdentityTransaction,
}

/// Local append-only ledger backed by a sled tree.
///
/// Entries are keyed by big-endian sequence number so iteration order is
/// submission order.
#[derive(Debug, Clone)]
pub struct SledLedger {
    db: sled::Db,
    journal: sled::Tree,
}

impl SledLedger {
    pub const TREE: &'static str = "ledger";

    /// Use the `ledger` tree of an already open database.
    pub fn new(db: sled::Db) -> Result<Self, LedgerError> {
        let journal = db
            .open_tree(Self::TREE)
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        Ok(Self { db, journal })
    }

    pub fn open_temporary() -> Result<Self, LedgerError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        Self::new(db)
    }

    /// Number of journal entries.
    pub fn len(&self) -> usize {
        self.journal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.journal.is_empty()
    }

    /// All transactions submitted for a DID, oldest first.
    pub fn history(&self, did: &str) -> Result<Vec<LedgerReceipt>, LedgerError> {
        let mut receipts = Vec::new();
        for item in self.journal.iter() {
            let (_, bytes) = item.map_err(|e| LedgerError::Storage(e.to_string()))?;
            let entry: JournalEntry = serde_json::from_slice(&bytes)
                .map_err(|e| LedgerError::Storage(e.to_string()))?;
            if entry.transaction.retailer_did == did {
                receipts.push(entry.receipt);
            }
        }
        Ok(receipts)
    }
}

#[async_trait]
impl LedgerClient for SledLedger {
    async fn submit(
        &self,
        channel: &str,
        tx: &IdentityTransaction,
    ) -> Result<LedgerReceipt, LedgerError> {
        let body = serde_json::to_vec(tx).map_err(|e| LedgerError::Rejected(e.to_string()))?;
        let sequence = self
            .db
            .generate_id()
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        let receipt = LedgerReceipt {
            channel: channel.to_string(),
            tx_id: sha256_hex(&body),
            sequence,
            submitted_at: Utc::now(),
        };

        let entry = JournalEntry {
            receipt: receipt.clone(),
            transaction: tx.clone(),
        };
        let bytes =
            serde_json::to_vec(&entry).map_err(|e| LedgerError::Storage(e.to_string()))?;
        self.journal
            .insert(sequence.to_be_bytes(), bytes)
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        self.journal
            .flush_async()
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        tracing::debug!(
            channel,
            sequence,
            tx_id = %receipt.tx_id,
            "identity transaction journaled"
        );
        Ok(receipt)
    }
}

// ---------------------------------------------------------------------------
// InMemoryLedger
// ---------------------------------------------------------------------------

/// In-memory ledger that records every submission.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    submissions: Mutex<Vec<(String, IdentityTransaction)>>,
    failing: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// `(channel, transaction)` pairs in submission order.
    pub fn submissions(&self) -> Vec<(String, IdentityTransaction)> {
        self.submissions.lock().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().len()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn submit(
        &self,
        channel: &str,
        tx: &IdentityTransaction,
    ) -> Result<LedgerReceipt, LedgerError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("in-memory ledger set to fail".into()));
        }
        let mut submissions = self.submissions.lock();
        submissions.push((channel.to_string(), tx.clone()));
        Ok(LedgerReceipt {
            channel: channel.to_string(),
            tx_id: uuid::Uuid::new_v4().simple().to_string(),
            sequence: submissions.len() as u64,
            submitted_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
