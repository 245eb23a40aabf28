//! # Credential Verification
//!
//! Before a retailer gets an identity, the business credential it presents
//! must be vouched for by a [`VerificationGateway`]. The gateway answers
//! with a [`Verdict`]; only an approving verdict lets registration proceed.
//!
//! Two gateways ship with the crate:
//!
//! - [`FormatGateway`]: an offline structural check (GSTIN layout and
//!   check digit, trade license shape). It is what the node runs when no
//!   registry integration is configured.
//! - [`StaticGateway`]: always returns the verdict it was built with.
//!
//! Production deployments plug their registry client in behind the same
//! trait.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::retailer::{IdType, Metadata};

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Outcome of a credential check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Evidence stored with the record under `metadata.verification`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Verdict {
    pub fn approved(payload: Option<Value>) -> Self {
        Self {
            ok: true,
            reason: None,
            payload,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
            payload: None,
        }
    }
}

/// The gateway could not produce a verdict at all.
///
/// Distinct from a rejection: the credential was never judged.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("verification gateway unreachable: {0}")]
    Unavailable(String),
}

/// A source of truth for business credentials.
#[async_trait]
pub trait VerificationGateway: Send + Sync {
    async fn verify(
        &self,
        id_type: IdType,
        id_value: &str,
        metadata: &Metadata,
    ) -> Result<Verdict, VerificationError>;
}

// ---------------------------------------------------------------------------
// StaticGateway
// ---------------------------------------------------------------------------

/// Returns the same verdict for every request.
#[derive(Debug, Clone)]
pub struct StaticGateway {
    verdict: Verdict,
}

impl StaticGateway {
    pub fn new(verdict: Verdict) -> Self {
        Self { verdict }
    }

    pub fn reject_all(reason: impl Into<String>) -> Self {
        Self::new(Verdict::rejected(reason))
    }
}

#[async_trait]
impl VerificationGateway for StaticGateway {
    async fn verify(
        &self,
        _id_type: IdType,
        _id_value: &str,
        _metadata: &Metadata,
    ) -> Result<Verdict, VerificationError> {
        Ok(self.verdict.clone())
    }
}

// ---------------------------------------------------------------------------
// FormatGateway
// ---------------------------------------------------------------------------

const GSTIN_LENGTH: usize = 15;
const GSTIN_CHARSET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// State and union-territory codes that can prefix a GSTIN.
const GSTIN_SPECIAL_STATE_CODES: [u8; 2] = [97, 99];
const GSTIN_MAX_STATE_CODE: u8 = 38;

const TRADE_LICENSE_MIN: usize = 4;
const TRADE_LICENSE_MAX: usize = 32;

/// Offline structural verification of credentials.
///
/// This proves a value is well-formed, not that it was ever issued.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatGateway;

impl FormatGateway {
    pub fn new() -> Self {
        Self
    }

    /// Check a value without going through the async trait.
    pub fn check(&self, id_type: IdType, id_value: &str) -> Verdict {
        let value = id_value.trim();
        let result = match id_type {
            IdType::Gst => check_gstin(value),
            IdType::Trade => check_trade_license(value),
        };
        match result {
            Ok(()) => Verdict::approved(Some(json!({
                "method": "format",
                "idType": id_type.as_str(),
                "checkedAt": Utc::now().to_rfc3339(),
            }))),
            Err(reason) => Verdict::rejected(reason),
        }
    }
}

#[async_trait]
impl VerificationGateway for FormatGateway {
    async fn verify(
        &self,
        id_type: IdType,
        id_value: &str,
        _metadata: &Metadata,
    ) -> Result<Verdict, VerificationError> {
        let verdict = self.check(id_type, id_value);
        tracing::debug!(id_type = %id_type, ok = verdict.ok, "format check complete");
        Ok(verdict)
    }
}

/// Validate a GSTIN: `SS PPPPPPPPPP E Z C`.
///
/// `SS` state code, `P` the holder's PAN, `E` entity number, literal `Z`,
/// and `C` a base-36 check character over the first 14.
fn check_gstin(value: &str) -> Result<(), String> {
    let bytes = value.as_bytes();
    if bytes.len() != GSTIN_LENGTH {
        return Err(format!("GSTIN must be {} characters", GSTIN_LENGTH));
    }
    if !bytes.iter().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()) {
        return Err("GSTIN must be uppercase alphanumeric".into());
    }

    let state = &value[0..2];
    let state_code: u8 = state
        .parse()
        .map_err(|_| "GSTIN state code must be numeric".to_string())?;
    let known_state = (1..=GSTIN_MAX_STATE_CODE).contains(&state_code)
        || GSTIN_SPECIAL_STATE_CODES.contains(&state_code);
    if !known_state {
        return Err(format!("unknown GSTIN state code {}", state));
    }

    // PAN: five letters, four digits, one letter.
    let pan = &bytes[2..12];
    let pan_ok = pan[..5].iter().all(u8::is_ascii_uppercase)
        && pan[5..9].iter().all(u8::is_ascii_digit)
        && pan[9].is_ascii_uppercase();
    if !pan_ok {
        return Err("GSTIN does not embed a valid PAN".into());
    }

    if bytes[12] == b'0' {
        return Err("GSTIN entity code cannot be 0".into());
    }
    if bytes[13] != b'Z' {
        return Err("GSTIN 14th character must be Z".into());
    }

    let expected = gstin_check_char(&bytes[..14]);
    if bytes[14] != expected {
        return Err("GSTIN check digit mismatch".into());
    }
    Ok(())
}

/// Base-36 Luhn-style check character used by GSTIN.
fn gstin_check_char(body: &[u8]) -> u8 {
    let sum: usize = body
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let idx = GSTIN_CHARSET.iter().position(|&x| x == c).unwrap_or(0);
            let factor = if i % 2 == 0 { 1 } else { 2 };
            let product = idx * factor;
            product / 36 + product % 36
        })
        .sum();
    GSTIN_CHARSET[(36 - sum % 36) % 36]
}

fn check_trade_license(value: &str) -> Result<(), String> {
    let len = value.chars().count();
    if !(TRADE_LICENSE_MIN..=TRADE_LICENSE_MAX).contains(&len) {
        return Err(format!(
            "trade license must be {}-{} characters",
            TRADE_LICENSE_MIN, TRADE_LICENSE_MAX
        ));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '/' || c == '-')
    {
        return Err("trade license may only contain letters, digits, '/' and '-'".into());
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return Err("trade license must contain a digit".into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
