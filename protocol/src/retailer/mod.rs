//! # Retailer Model
//!
//! The data that the registration protocol produces and the store owns.
//!
//! ```text
//! Retailer ──public_profile()──────▶ PublicProfile   (API)
//!     └─────identity_transaction()─▶ IdentityTransaction (ledger)
//! ```

pub mod types;

pub use types::{
    BusinessType, IdType, IdentityTransaction, Metadata, PublicProfile, Retailer, RetailerStatus,
};
