//! Retailer record, its public projection, and the ledger transaction built
//! from it.
//!
//! Field names serialize in camelCase so stored records, API responses and
//! ledger payloads share one vocabulary (`retailerDid`, `encMobile`, ...).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form metadata attached to a retailer record.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Kind of business credential presented at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdType {
    /// Municipal trade license.
    #[serde(rename = "TRADE")]
    Trade,
    /// GST registration (GSTIN).
    #[serde(rename = "GST")]
    Gst,
}

impl IdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdType::Trade => "TRADE",
            IdType::Gst => "GST",
        }
    }

    /// Business type recorded for a retailer verified with this credential.
    pub fn business_type(&self) -> BusinessType {
        match self {
            IdType::Trade => BusinessType::Licensed,
            IdType::Gst => BusinessType::GstRegistered,
        }
    }
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdType {
    type Err = String;

    /// Exact match on `TRADE` or `GST`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRADE" => Ok(IdType::Trade),
            "GST" => Ok(IdType::Gst),
            other => Err(format!("idType must be TRADE or GST, got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusinessType {
    Licensed,
    #[serde(rename = "GST_Registered")]
    GstRegistered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RetailerStatus {
    #[default]
    Active,
    Suspended,
}

// ---------------------------------------------------------------------------
// Retailer
// ---------------------------------------------------------------------------

/// The persisted retailer record.
///
/// Sensitive fields are only ever held as envelopes. Created once by the
/// registration service; nothing in this crate updates or deletes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Retailer {
    pub retailer_did: String,
    /// Base64 SPKI DER.
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enc_trade_license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enc_gstin: Option<String>,
    pub enc_mobile: String,
    pub business_type: BusinessType,
    pub trust_score: f64,
    #[serde(default)]
    pub status: RetailerStatus,
    pub registration_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Retailer {
    /// Non-sensitive projection of this record.
    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            retailer_did: self.retailer_did.clone(),
            public_key: self.public_key.clone(),
            business_type: self.business_type,
            trust_score: self.trust_score,
            status: self.status,
            registration_timestamp: self.registration_timestamp,
            metadata: self.metadata.clone(),
        }
    }

    /// The identity transaction announced to the ledger for this record.
    pub fn identity_transaction(&self) -> IdentityTransaction {
        IdentityTransaction {
            retailer_did: self.retailer_did.clone(),
            public_key: self.public_key.clone(),
            trust_score: self.trust_score,
            registration_timestamp: self.registration_timestamp,
        }
    }
}

/// Public view of a retailer. Carries no envelopes, by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub retailer_did: String,
    pub public_key: String,
    pub business_type: BusinessType,
    pub trust_score: f64,
    pub status: RetailerStatus,
    pub registration_timestamp: DateTime<Utc>,
    pub metadata: Metadata,
}

/// Record submitted to the identity ledger after persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityTransaction {
    pub retailer_did: String,
    pub public_key: String,
    pub trust_score: f64,
    pub registration_timestamp: DateTime<Utc>,
}
