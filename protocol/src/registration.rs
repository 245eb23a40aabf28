//! # Registration Service
//!
//! Orchestrates the retailer registration protocol:
//!
//! ```text
//! ReceivedRequest ─▶ Verifying ─▶ Verified ─▶ KeyGenerated ─▶ Encrypted
//!                        │                                        │
//!                        ▼                                        ▼
//!                    Rejected                                 Persisted ─▶ Submitted ─▶ Completed
//!
//! any stage ─▶ Failed(stage)
//! ```
//!
//! Stages run strictly in order within one call. Nothing is generated
//! before the credential is approved, and nothing is persisted unless every
//! field was sealed. Ledger submission happens after persistence and is not
//! rolled back on failure: the caller gets a partial success and the record
//! can be resubmitted with [`RegistrationService::resubmit_ledger`].
//!
//! The service holds only immutable configuration and `Arc` handles, so one
//! instance serves any number of concurrent requests.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use zeroize::Zeroizing;

use crate::config::{DEFAULT_TRUST_SCORE, IDENTITY_LEDGER_CHANNEL};
use crate::crypto::{FieldCipher, KeyCodec, KeyError, KeyGenerator};
use crate::error::{ErrorKind, IdentityError, IdentityResult};
use crate::identity::DidDeriver;
use crate::ledger::{LedgerClient, LedgerReceipt};
use crate::retailer::{IdType, Metadata, PublicProfile, Retailer, RetailerStatus};
use crate::storage::RetailerStore;
use crate::verification::VerificationGateway;

/// Metadata key holding the verification payload.
pub const VERIFICATION_METADATA_KEY: &str = "verification";

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

/// A registration request as received from a client.
///
/// Missing and `null` fields decode to empty strings, and `metadata` is raw
/// JSON, so absent or empty input is reported by [`RegistrationService::register`]
/// as a validation error. A field of the wrong JSON type (a number where a
/// string belongs) still fails to decode; transports must map that to a
/// validation error themselves.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationRequest {
    #[serde(deserialize_with = "null_as_empty")]
    pub id_type: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub id_value: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub mobile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl RegistrationRequest {
    pub fn new(
        id_type: impl Into<String>,
        id_value: impl Into<String>,
        mobile: impl Into<String>,
    ) -> Self {
        Self {
            id_type: id_type.into(),
            id_value: id_value.into(),
            mobile: mobile.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A request that passed input validation.
struct ValidatedRequest {
    id_type: IdType,
    id_value: String,
    mobile: String,
    metadata: Metadata,
}

/// Result of the ledger step, reported alongside a successful registration.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LedgerOutcome {
    Submitted { receipt: LedgerReceipt },
    Failed { kind: ErrorKind, error: String },
}

impl LedgerOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, LedgerOutcome::Submitted { .. })
    }
}

/// What a successful registration hands back to the caller.
///
/// `private_key_backup` is the only copy of the retailer's private key that
/// will ever exist outside the retailer's own custody.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOutcome {
    pub retailer_did: String,
    pub public_key: String,
    #[serde(serialize_with = "serialize_secret")]
    pub private_key_backup: Zeroizing<String>,
    pub ledger: LedgerOutcome,
}

fn serialize_secret<S: Serializer>(value: &Zeroizing<String>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(value)
}

impl fmt::Debug for RegistrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationOutcome")
            .field("retailer_did", &self.retailer_did)
            .field("public_key", &self.public_key)
            .field("private_key_backup", &"<redacted>")
            .field("ledger", &self.ledger)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Registration protocol stages, as they appear in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ReceivedRequest,
    Verifying,
    Verified,
    Rejected,
    KeyGenerated,
    Encrypted,
    Persisted,
    Submitted,
    Completed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ReceivedRequest => "received_request",
            Stage::Verifying => "verifying",
            Stage::Verified => "verified",
            Stage::Rejected => "rejected",
            Stage::KeyGenerated => "key_generated",
            Stage::Encrypted => "encrypted",
            Stage::Persisted => "persisted",
            Stage::Submitted => "submitted",
            Stage::Completed => "completed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RegistrationService
// ---------------------------------------------------------------------------

/// The retailer identity service.
pub struct RegistrationService {
    store: Arc<dyn RetailerStore>,
    gateway: Arc<dyn VerificationGateway>,
    ledger: Arc<dyn LedgerClient>,
    keys: Arc<dyn KeyGenerator>,
    cipher: FieldCipher,
    deriver: DidDeriver,
}

impl RegistrationService {
    /// Build a service with OS-random keys and the default DID method.
    pub fn new(
        store: Arc<dyn RetailerStore>,
        gateway: Arc<dyn VerificationGateway>,
        ledger: Arc<dyn LedgerClient>,
        cipher: FieldCipher,
    ) -> Self {
        Self {
            store,
            gateway,
            ledger,
            keys: Arc::new(KeyCodec::new()),
            cipher,
            deriver: DidDeriver::default(),
        }
    }

    pub fn with_key_generator(mut self, keys: Arc<dyn KeyGenerator>) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_did_deriver(mut self, deriver: DidDeriver) -> Self {
        self.deriver = deriver;
        self
    }

    pub fn did_deriver(&self) -> &DidDeriver {
        &self.deriver
    }

    /// Number of registered retailers.
    pub fn retailer_count(&self) -> IdentityResult<usize> {
        Ok(self.store.count()?)
    }

    // -- Registration --------------------------------------------------------

    /// Register a retailer.
    ///
    /// On success the record is persisted. The ledger step may still have
    /// failed; check [`RegistrationOutcome::ledger`].
    pub async fn register(&self, request: RegistrationRequest) -> IdentityResult<RegistrationOutcome> {
        let mut stage = Stage::ReceivedRequest;
        match self.run_registration(request, &mut stage).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if err.is_internal() {
                    tracing::error!(stage = %stage, kind = %err.kind(), error = %err, "registration failed");
                } else {
                    tracing::info!(stage = %stage, kind = %err.kind(), "registration refused");
                }
                Err(err)
            }
        }
    }

    async fn run_registration(
        &self,
        request: RegistrationRequest,
        stage: &mut Stage,
    ) -> IdentityResult<RegistrationOutcome> {
        tracing::debug!(stage = %stage, "registration request received");
        let req = validate(request)?;

        // 1. Verification
        *stage = Stage::Verifying;
        tracing::debug!(stage = %stage, id_type = %req.id_type, "verifying credential");
        let verdict = self
            .gateway
            .verify(req.id_type, &req.id_value, &req.metadata)
            .await
            .map_err(|e| IdentityError::VerificationUnavailable(e.to_string()))?;
        if !verdict.ok {
            *stage = Stage::Rejected;
            return Err(IdentityError::rejected(verdict.reason));
        }
        *stage = Stage::Verified;
        tracing::debug!(stage = %stage, "credential approved");

        // 2. Identity
        let keypair = self.keys.generate()?;
        let did = self
            .deriver
            .derive(keypair.public_key())
            .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?
            .to_did_string();
        *stage = Stage::KeyGenerated;
        tracing::debug!(stage = %stage, did = %did, "identity derived");

        // 3. Seal PII
        let enc_mobile = self.seal(&req.mobile)?;
        let enc_id = self.seal(&req.id_value)?;
        let (enc_trade_license, enc_gstin) = match req.id_type {
            IdType::Trade => (Some(enc_id), None),
            IdType::Gst => (None, Some(enc_id)),
        };
        *stage = Stage::Encrypted;
        tracing::debug!(stage = %stage, did = %did, "fields sealed");

        // 4. Persist
        // Caller keys are applied last and win.
        let mut metadata = Metadata::new();
        metadata.insert(
            VERIFICATION_METADATA_KEY.to_string(),
            verdict.payload.unwrap_or(Value::Null),
        );
        metadata.extend(req.metadata);
        let record = Retailer {
            retailer_did: did.clone(),
            public_key: keypair.public_key().to_string(),
            enc_trade_license,
            enc_gstin,
            enc_mobile,
            business_type: req.id_type.business_type(),
            trust_score: DEFAULT_TRUST_SCORE,
            status: RetailerStatus::Active,
            registration_timestamp: Utc::now(),
            metadata,
        };
        let record = self.store.create(record).await?;
        *stage = Stage::Persisted;
        tracing::debug!(stage = %stage, did = %did, "record persisted");

        // 5. Announce
        let ledger = match self.submit(&record).await {
            Ok(receipt) => {
                *stage = Stage::Submitted;
                tracing::debug!(stage = %stage, did = %did, tx_id = %receipt.tx_id, "ledger accepted");
                LedgerOutcome::Submitted { receipt }
            }
            Err(err) => {
                tracing::warn!(did = %did, error = %err, "ledger submission failed, record kept");
                LedgerOutcome::Failed {
                    kind: err.kind(),
                    error: err.to_string(),
                }
            }
        };

        *stage = Stage::Completed;
        tracing::info!(did = %did, business_type = ?record.business_type, ledger = ledger.is_submitted(), "retailer registered");

        Ok(RegistrationOutcome {
            retailer_did: record.retailer_did,
            public_key: record.public_key,
            private_key_backup: keypair.into_private_key(),
            ledger,
        })
    }

    fn seal(&self, plaintext: &str) -> IdentityResult<String> {
        self.cipher
            .encrypt(plaintext)
            .map_err(|e| IdentityError::Encryption(e.to_string()))
    }

    async fn submit(&self, record: &Retailer) -> IdentityResult<LedgerReceipt> {
        let receipt = self
            .ledger
            .submit(IDENTITY_LEDGER_CHANNEL, &record.identity_transaction())
            .await?;
        Ok(receipt)
    }

    // -- Lookup & administration ----------------------------------------------

    /// Public profile of a registered retailer. Never decrypts anything.
    pub fn get_profile(&self, did: &str) -> IdentityResult<PublicProfile> {
        Ok(self.find(did)?.public_profile())
    }

    /// Open an envelope under the server key.
    ///
    /// Privileged: callers must gate this behind authorization.
    pub fn decrypt_field(&self, envelope: &str) -> IdentityResult<String> {
        if envelope.trim().is_empty() {
            return Err(IdentityError::Validation("enc is required".into()));
        }
        self.cipher
            .decrypt(envelope)
            .map_err(IdentityError::Decryption)
    }

    /// Submit a stored record's identity transaction to the ledger again.
    pub async fn resubmit_ledger(&self, did: &str) -> IdentityResult<LedgerReceipt> {
        let record = self.find(did)?;
        let receipt = self.submit(&record).await?;
        tracing::info!(did = %did, tx_id = %receipt.tx_id, "identity transaction resubmitted");
        Ok(receipt)
    }

    fn find(&self, did: &str) -> IdentityResult<Retailer> {
        let did = did.trim();
        if did.is_empty() {
            return Err(IdentityError::Validation("did is required".into()));
        }
        self.store
            .find_by_did(did)?
            .ok_or_else(|| IdentityError::NotFound(did.to_string()))
    }
}

impl fmt::Debug for RegistrationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationService")
            .field("did_method", &self.deriver.method())
            .field("cipher", &self.cipher)
            .finish_non_exhaustive()
    }
}

fn validate(request: RegistrationRequest) -> IdentityResult<ValidatedRequest> {
    let id_type: IdType = request
        .id_type
        .trim()
        .parse()
        .map_err(IdentityError::Validation)?;

    let id_value = request.id_value.trim();
    if id_value.is_empty() {
        return Err(IdentityError::Validation("idValue is required".into()));
    }

    let mobile = request.mobile.trim();
    if mobile.is_empty() {
        return Err(IdentityError::Validation("mobile is required".into()));
    }

    let metadata = match request.metadata {
        None | Some(Value::Null) => Metadata::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(IdentityError::Validation(
                "metadata must be a JSON object".into(),
            ))
        }
    };

    Ok(ValidatedRequest {
        id_type,
        id_value: id_value.to_string(),
        mobile: mobile.to_string(),
        metadata,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerKey;
    use crate::crypto::SeededKeyGenerator;
    use crate::ledger::InMemoryLedger;
    use crate::storage::RetailerDb;
    use crate::crypto::EncodedKeypair;
    use crate::verification::{StaticGateway, Verdict, VerificationError};
    use async_trait::async_trait;
    use serde_json::json;

    struct UnreachableGateway;

    #[async_trait]
    impl VerificationGateway for UnreachableGateway {
        async fn verify(
            &self,
            _id_type: IdType,
            _id_value: &str,
            _metadata: &Metadata,
        ) -> Result<Verdict, VerificationError> {
            Err(VerificationError::Unavailable("connection refused".into()))
        }
    }

    struct BrokenKeys;

    impl KeyGenerator for BrokenKeys {
        fn generate(&self) -> Result<EncodedKeypair, KeyError> {
            Err(KeyError::Generation("entropy source exhausted".into()))
        }
    }

    struct Harness {
        service: RegistrationService,
        store: Arc<RetailerDb>,
        ledger: Arc<InMemoryLedger>,
    }

    fn harness(verdict: Verdict) -> Harness {
        let store = Arc::new(RetailerDb::open_temporary().unwrap());
        let ledger = Arc::new(InMemoryLedger::new());
        let service = RegistrationService::new(
            store.clone(),
            Arc::new(StaticGateway::new(verdict)),
            ledger.clone(),
            FieldCipher::new(&ServerKey::from_bytes([7u8; 32])),
        );
        Harness {
            service,
            store,
            ledger,
        }
    }

    fn trade_request() -> RegistrationRequest {
        RegistrationRequest::new("TRADE", "TL-001", "+910000000000")
    }

    #[tokio::test]
    async fn trade_registration_seals_license_and_mobile() {
        let h = harness(Verdict::approved(Some(json!({"source": "registry"}))));
        let outcome = h.service.register(trade_request()).await.unwrap();

        assert!(outcome.retailer_did.starts_with("did:retail:z"));
        assert!(outcome.ledger.is_submitted());

        let record = h.store.get_retailer(&outcome.retailer_did).unwrap().unwrap();
        assert_eq!(record.business_type, crate::retailer::BusinessType::Licensed);
        assert_eq!(record.trust_score, DEFAULT_TRUST_SCORE);
        assert_eq!(record.status, RetailerStatus::Active);
        assert!(record.enc_gstin.is_none());

        let license = record.enc_trade_license.as_deref().unwrap();
        assert_eq!(h.service.decrypt_field(license).unwrap(), "TL-001");
        assert_eq!(h.service.decrypt_field(&record.enc_mobile).unwrap(), "+910000000000");
        assert_eq!(record.metadata["verification"]["source"], "registry");
    }

    #[tokio::test]
    async fn gst_registration_sets_business_type() {
        let h = harness(Verdict::approved(None));
        let request = RegistrationRequest::new("GST", "27AAPFU0939F1ZV", "+919999999999");
        let outcome = h.service.register(request).await.unwrap();

        let record = h.store.get_retailer(&outcome.retailer_did).unwrap().unwrap();
        assert_eq!(record.business_type, crate::retailer::BusinessType::GstRegistered);
        assert!(record.enc_trade_license.is_none());
        let gstin = record.enc_gstin.as_deref().unwrap();
        assert_eq!(h.service.decrypt_field(gstin).unwrap(), "27AAPFU0939F1ZV");
        assert!(record.metadata["verification"].is_null());
    }

    #[tokio::test]
    async fn rejection_creates_nothing() {
        let h = harness(Verdict::rejected("not found"));
        let err = h.service.register(trade_request()).await.unwrap_err();

        assert_eq!(err.to_string(), "REJECTED: not found");
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_eq!(h.store.retailer_count(), 0);
        assert_eq!(h.ledger.submission_count(), 0);
    }

    #[tokio::test]
    async fn unreachable_gateway_creates_nothing() {
        let store = Arc::new(RetailerDb::open_temporary().unwrap());
        let ledger = Arc::new(InMemoryLedger::new());
        let service = RegistrationService::new(
            store.clone(),
            Arc::new(UnreachableGateway),
            ledger.clone(),
            FieldCipher::new(&ServerKey::from_bytes([7u8; 32])),
        );

        let err = service.register(trade_request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VerificationUnavailable);
        assert!(err.is_internal());
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(ledger.submission_count(), 0);
    }

    #[tokio::test]
    async fn key_generation_failure_creates_nothing() {
        let h = harness(Verdict::approved(None));
        let service = h.service.with_key_generator(Arc::new(BrokenKeys));

        let err = service.register(trade_request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyGeneration);
        assert_eq!(h.store.count().unwrap(), 0);
        assert_eq!(h.ledger.submission_count(), 0);
    }

    #[tokio::test]
    async fn rejection_without_reason_uses_default() {
        let h = harness(Verdict {
            ok: false,
            reason: None,
            payload: None,
        });
        let err = h.service.register(trade_request()).await.unwrap_err();
        assert_eq!(err.to_string(), "REJECTED: verification failed");
    }

    #[tokio::test]
    async fn validation_errors() {
        let h = harness(Verdict::approved(None));
        let cases = [
            RegistrationRequest::new("PAN", "X", "+91"),
            RegistrationRequest::new("", "TL-001", "+91"),
            RegistrationRequest::new("TRADE", "   ", "+91"),
            RegistrationRequest::new("TRADE", "TL-001", ""),
            trade_request().with_metadata(json!(["not", "an", "object"])),
            trade_request().with_metadata(json!("string")),
        ];
        for request in cases {
            let err = h.service.register(request).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{}", err);
        }
        assert_eq!(h.store.retailer_count(), 0);
    }

    #[tokio::test]
    async fn null_fields_are_validation_errors() {
        let h = harness(Verdict::approved(None));
        for body in [
            json!({"idType": "TRADE", "idValue": "TL-001", "mobile": null}),
            json!({"idType": null, "idValue": "TL-001", "mobile": "+91"}),
            json!({"idType": "TRADE", "mobile": "+91"}),
        ] {
            let request: RegistrationRequest = serde_json::from_value(body).unwrap();
            let err = h.service.register(request).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{}", err);
        }
        let request: RegistrationRequest =
            serde_json::from_value(json!({"idType": "TRADE", "idValue": "TL-001", "mobile": null}))
                .unwrap();
        assert_eq!(
            h.service.register(request).await.unwrap_err().to_string(),
            "validation error: mobile is required"
        );
        assert_eq!(h.store.retailer_count(), 0);
    }

    #[tokio::test]
    async fn caller_metadata_is_merged_over_verification_payload() {
        let h = harness(Verdict::approved(Some(json!({"src": "gw"}))));
        let request = trade_request().with_metadata(json!({
            "shopName": "Sharma Kirana",
            "verification": "caller",
        }));
        let outcome = h.service.register(request).await.unwrap();

        let profile = h.service.get_profile(&outcome.retailer_did).unwrap();
        assert_eq!(profile.metadata["shopName"], "Sharma Kirana");
        assert_eq!(profile.metadata["verification"], "caller");
    }

    #[tokio::test]
    async fn verification_payload_is_stored_when_caller_does_not_set_it() {
        let h = harness(Verdict::approved(Some(json!({"src": "gw"}))));
        let request = trade_request().with_metadata(json!({"shopName": "Sharma Kirana"}));
        let outcome = h.service.register(request).await.unwrap();

        let profile = h.service.get_profile(&outcome.retailer_did).unwrap();
        assert_eq!(profile.metadata["verification"]["src"], "gw");
        assert_eq!(profile.metadata.len(), 2);
    }

    #[tokio::test]
    async fn independent_registrations_get_distinct_identities() {
        let h = harness(Verdict::approved(None));
        let a = h.service.register(trade_request()).await.unwrap();
        let b = h.service.register(trade_request()).await.unwrap();
        assert_ne!(a.retailer_did, b.retailer_did);
        assert_eq!(h.store.retailer_count(), 2);
    }

    #[tokio::test]
    async fn coinciding_keys_are_duplicate_identity() {
        let h = harness(Verdict::approved(None));
        let service = h
            .service
            .with_key_generator(Arc::new(SeededKeyGenerator::new([3u8; 32])));

        service.register(trade_request()).await.unwrap();
        let err = service.register(trade_request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateIdentity);
        assert_eq!(h.store.retailer_count(), 1);
        assert_eq!(h.ledger.submission_count(), 1);
    }

    #[tokio::test]
    async fn ledger_failure_is_partial_success() {
        let h = harness(Verdict::approved(None));
        h.ledger.set_failing(true);

        let outcome = h.service.register(trade_request()).await.unwrap();
        match &outcome.ledger {
            LedgerOutcome::Failed { kind, .. } => assert_eq!(*kind, ErrorKind::LedgerSubmission),
            other => panic!("expected failed ledger outcome, got {:?}", other),
        }
        assert!(h.store.has_retailer(&outcome.retailer_did).unwrap());

        h.ledger.set_failing(false);
        let receipt = h.service.resubmit_ledger(&outcome.retailer_did).await.unwrap();
        assert_eq!(receipt.channel, IDENTITY_LEDGER_CHANNEL);
        assert_eq!(h.ledger.submission_count(), 1);
    }

    #[tokio::test]
    async fn ledger_receives_public_identity_only() {
        let h = harness(Verdict::approved(None));
        let outcome = h.service.register(trade_request()).await.unwrap();

        let submissions = h.ledger.submissions();
        assert_eq!(submissions.len(), 1);
        let (channel, tx) = &submissions[0];
        assert_eq!(channel, IDENTITY_LEDGER_CHANNEL);
        assert_eq!(tx.retailer_did, outcome.retailer_did);
        assert_eq!(tx.public_key, outcome.public_key);
        let json = serde_json::to_string(tx).unwrap();
        assert!(!json.contains("TL-001"));
        assert!(!json.contains("+910000000000"));
    }

    #[tokio::test]
    async fn profile_lookup_errors() {
        let h = harness(Verdict::approved(None));
        assert_eq!(
            h.service.get_profile("did:retail:zMissing").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(h.service.get_profile(" ").unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(
            h.service
                .resubmit_ledger("did:retail:zMissing")
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn private_key_is_not_discoverable_via_lookup() {
        let h = harness(Verdict::approved(None));
        let outcome = h.service.register(trade_request()).await.unwrap();
        let profile = h.service.get_profile(&outcome.retailer_did).unwrap();
        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains(outcome.private_key_backup.as_str()));
        assert!(!json.contains("encMobile"));
    }

    #[test]
    fn decrypt_rejects_garbage() {
        let h = harness(Verdict::approved(None));
        let err = h.service.decrypt_field("not an envelope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decryption);
    }

    #[test]
    fn decrypt_of_empty_envelope_is_validation_error() {
        let h = harness(Verdict::approved(None));
        for envelope in ["", "   "] {
            let err = h.service.decrypt_field(envelope).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert_eq!(err.to_string(), "validation error: enc is required");
        }
    }

    #[test]
    fn outcome_debug_redacts_private_key() {
        let outcome = RegistrationOutcome {
            retailer_did: "did:retail:zX".into(),
            public_key: "pk".into(),
            private_key_backup: Zeroizing::new("SECRET".into()),
            ledger: LedgerOutcome::Failed {
                kind: ErrorKind::LedgerSubmission,
                error: "down".into(),
            },
        };
        let debug = format!("{:?}", outcome);
        assert!(!debug.contains("SECRET"));

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["privateKeyBackup"], "SECRET");
        assert_eq!(json["ledger"]["status"], "failed");
        assert_eq!(json["ledger"]["kind"], "ledger_submission");
    }
}
