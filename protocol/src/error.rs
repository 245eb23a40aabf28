//! Error types for the retailer identity service.
//!
//! Every service operation returns an [`IdentityError`]. Each variant maps
//! to a stable [`ErrorKind`] code that outer layers use for status mapping
//! and that clients can match on. Messages never carry plaintext PII or key
//! material.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{EncryptionError, KeyError};
use crate::ledger::LedgerError;
use crate::storage::DbError;

/// Reason used when a gateway rejects without saying why.
pub const DEFAULT_REJECTION_REASON: &str = "verification failed";

/// Errors surfaced by the registration service.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The request is malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The verification gateway declined the credential.
    #[error("REJECTED: {0}")]
    Rejected(String),

    /// The verification gateway could not be reached. Retryable.
    #[error("verification unavailable: {0}")]
    VerificationUnavailable(String),

    #[error("key generation failed: {0}")]
    KeyGeneration(#[from] KeyError),

    /// Sealing a field failed. Nothing was persisted.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// A record with this DID already exists.
    #[error("duplicate identity: {0}")]
    DuplicateIdentity(String),

    #[error("decryption failed: {0}")]
    Decryption(EncryptionError),

    #[error("retailer not found: {0}")]
    NotFound(String),

    /// The ledger refused or could not take the identity transaction.
    #[error("ledger submission failed: {0}")]
    LedgerSubmission(#[from] LedgerError),

    #[error("storage error: {0}")]
    Storage(String),
}

impl IdentityError {
    /// Build a rejection, falling back to the default reason.
    pub fn rejected(reason: Option<String>) -> Self {
        let reason = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());
        IdentityError::Rejected(reason)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::Validation(_) => ErrorKind::Validation,
            IdentityError::Rejected(_) => ErrorKind::Rejected,
            IdentityError::VerificationUnavailable(_) => ErrorKind::VerificationUnavailable,
            IdentityError::KeyGeneration(_) => ErrorKind::KeyGeneration,
            IdentityError::Encryption(_) => ErrorKind::Encryption,
            IdentityError::DuplicateIdentity(_) => ErrorKind::DuplicateIdentity,
            IdentityError::Decryption(_) => ErrorKind::Decryption,
            IdentityError::NotFound(_) => ErrorKind::NotFound,
            IdentityError::LedgerSubmission(_) => ErrorKind::LedgerSubmission,
            IdentityError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether the failure is on our side rather than the caller's.
    pub fn is_internal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::VerificationUnavailable
                | ErrorKind::KeyGeneration
                | ErrorKind::Encryption
                | ErrorKind::LedgerSubmission
                | ErrorKind::Storage
        )
    }
}

impl From<DbError> for IdentityError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::DuplicateIdentity(did) => IdentityError::DuplicateIdentity(did),
            other => IdentityError::Storage(other.to_string()),
        }
    }
}

/// Stable, machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Rejected,
    VerificationUnavailable,
    KeyGeneration,
    Encryption,
    DuplicateIdentity,
    Decryption,
    NotFound,
    LedgerSubmission,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Rejected => "rejected",
            ErrorKind::VerificationUnavailable => "verification_unavailable",
            ErrorKind::KeyGeneration => "key_generation",
            ErrorKind::Encryption => "encryption",
            ErrorKind::DuplicateIdentity => "duplicate_identity",
            ErrorKind::Decryption => "decryption",
            ErrorKind::NotFound => "not_found",
            ErrorKind::LedgerSubmission => "ledger_submission",
            ErrorKind::Storage => "storage",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type IdentityResult<T> = Result<T, IdentityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message_format() {
        let err = IdentityError::rejected(Some("not found".into()));
        assert_eq!(err.to_string(), "REJECTED: not found");
        assert_eq!(err.kind(), ErrorKind::Rejected);
    }

    #[test]
    fn rejection_defaults_reason() {
        assert_eq!(
            IdentityError::rejected(None).to_string(),
            "REJECTED: verification failed"
        );
        assert_eq!(
            IdentityError::rejected(Some("  ".into())).to_string(),
            "REJECTED: verification failed"
        );
    }

    #[test]
    fn duplicate_db_error_maps_to_duplicate_identity() {
        let err: IdentityError = DbError::DuplicateIdentity("did:retail:zX".into()).into();
        assert_eq!(err.kind(), ErrorKind::DuplicateIdentity);

        let err: IdentityError = DbError::Serialization("bad".into()).into();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.is_internal());
    }

    #[test]
    fn kind_codes_match_serde_names() {
        for kind in [
            ErrorKind::Validation,
            ErrorKind::Rejected,
            ErrorKind::VerificationUnavailable,
            ErrorKind::KeyGeneration,
            ErrorKind::Encryption,
            ErrorKind::DuplicateIdentity,
            ErrorKind::Decryption,
            ErrorKind::NotFound,
            ErrorKind::LedgerSubmission,
            ErrorKind::Storage,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
    }
}
