//! # REST API
//!
//! Builds the axum router that exposes the identity service over HTTP.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                        | Auth  | Description                  |
//! |--------|-----------------------------|-------|------------------------------|
//! | GET    | `/`                         |       | Service banner               |
//! | GET    | `/health`                   |       | Liveness probe               |
//! | POST   | `/api/retailer/register`    |       | Register a retailer          |
//! | GET    | `/api/retailer/:did`        |       | Public profile               |
//! | POST   | `/api/retailer/decrypt`     | admin | Open a field envelope        |
//! | POST   | `/api/retailer/:did/ledger` | admin | Resubmit identity to ledger  |
//!
//! Admin endpoints take `Authorization: Bearer <token>`. When the node runs
//! without an admin token they answer 403 for everyone.
//!
//! Errors are returned as `{ "error": "...", "kind": "..." }` where `kind`
//! is the stable [`ErrorKind`] code. Bodies that fail to decode are
//! `validation` errors like any other bad input.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use retail_identity::ledger::LedgerReceipt;
use retail_identity::{
    ErrorKind, IdentityError, RegistrationOutcome, RegistrationRequest, RegistrationService,
};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone, everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The service's reported version string.
    pub version: String,
    pub service: Arc<RegistrationService>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
    /// SHA-256 of the admin bearer token. `None` disables admin endpoints.
    pub admin_token_digest: Option<[u8; 32]>,
}

impl AppState {
    pub fn new(
        version: impl Into<String>,
        service: Arc<RegistrationService>,
        metrics: SharedMetrics,
        admin_token: Option<&str>,
    ) -> Self {
        Self {
            version: version.into(),
            service,
            metrics,
            admin_token_digest: admin_token
                .filter(|t| !t.is_empty())
                .map(|t| Sha256::digest(t.as_bytes()).into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(banner_handler))
        .route("/health", get(health_handler))
        .route("/api/retailer/register", post(register_handler))
        .route("/api/retailer/decrypt", post(decrypt_handler))
        .route("/api/retailer/:did", get(profile_handler))
        .route("/api/retailer/:did/ledger", post(resubmit_ledger_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// Response payload for `POST /api/retailer/register`.
#[derive(Serialize)]
pub struct RegisterResponse<'a> {
    pub ok: bool,
    #[serde(flatten)]
    pub outcome: &'a RegistrationOutcome,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DecryptRequest {
    pub enc: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecryptResponse {
    pub plain: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerResponse {
    pub receipt: LedgerReceipt,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    Identity(IdentityError),
    /// Missing or wrong bearer token.
    Unauthorized,
    /// No admin token is configured on this node.
    AdminDisabled,
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        ApiError::Identity(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Identity(IdentityError::Validation(format!(
            "invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// HTTP status for a service error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::Rejected => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::DuplicateIdentity => StatusCode::CONFLICT,
        ErrorKind::Decryption => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::VerificationUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::KeyGeneration
        | ErrorKind::Encryption
        | ErrorKind::LedgerSubmission
        | ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Identity(err) => (
                status_for(err.kind()),
                ErrorResponse {
                    error: err.to_string(),
                    kind: err.kind().as_str().to_string(),
                },
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    error: "missing or invalid admin token".into(),
                    kind: "unauthorized".into(),
                },
            ),
            ApiError::AdminDisabled => (
                StatusCode::FORBIDDEN,
                ErrorResponse {
                    error: "admin endpoints are disabled on this node".into(),
                    kind: "forbidden".into(),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Check the bearer token against the configured admin token.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let expected = state.admin_token_digest.ok_or(ApiError::AdminDisabled)?;
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(ApiError::Unauthorized)?;

    let digest: [u8; 32] = Sha256::digest(presented.as_bytes()).into();
    if digest != expected {
        tracing::warn!("admin request with wrong token");
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /`: service banner.
async fn banner_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "retail-identity",
        "version": state.version,
        "didMethod": state.service.did_deriver().method(),
    }))
}

/// `GET /health`: returns 200 if the service is alive.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.retailer_count() {
        Ok(count) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ok", "retailers": count })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "health check could not read the store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "degraded" })),
            )
        }
    }
}

/// `POST /api/retailer/register`: verify, mint and persist a retailer.
///
/// A ledger failure still answers 200; the `ledger` field says so.
async fn register_handler(
    State(state): State<AppState>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let timer = state.metrics.registration_latency_seconds.start_timer();
    let result = match payload {
        Ok(Json(request)) => state.service.register(request).await,
        Err(rejection) => {
            timer.observe_duration();
            state.metrics.registration_failures_total.inc();
            return Err(rejection.into());
        }
    };
    timer.observe_duration();

    match result {
        Ok(outcome) => {
            state.metrics.registrations_total.inc();
            if !outcome.ledger.is_submitted() {
                state.metrics.ledger_failures_total.inc();
            }
            let body = RegisterResponse {
                ok: true,
                outcome: &outcome,
            };
            Ok((StatusCode::OK, Json(body)).into_response())
        }
        Err(err) => {
            if err.kind() == ErrorKind::Rejected {
                state.metrics.registrations_rejected_total.inc();
            } else {
                state.metrics.registration_failures_total.inc();
            }
            Err(err.into())
        }
    }
}

/// `GET /api/retailer/:did`: public profile. No envelopes, ever.
async fn profile_handler(
    Path(did): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    state.metrics.profile_lookups_total.inc();
    let profile = state.service.get_profile(&did)?;
    Ok(Json(profile))
}

/// `POST /api/retailer/decrypt`: open an envelope. Admin only.
async fn decrypt_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<DecryptRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers)?;
    state.metrics.decrypt_requests_total.inc();

    let Json(request) = payload?;
    let plain = state
        .service
        .decrypt_field(request.enc.as_deref().unwrap_or_default())?;
    tracing::info!("admin decrypt served");
    Ok(Json(DecryptResponse { plain }))
}

/// `POST /api/retailer/:did/ledger`: resubmit to the ledger. Admin only.
async fn resubmit_ledger_handler(
    Path(did): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers)?;
    let receipt = state.service.resubmit_ledger(&did).await.map_err(|e| {
        if e.kind() == ErrorKind::LedgerSubmission {
            state.metrics.ledger_failures_total.inc();
        }
        e
    })?;
    Ok(Json(LedgerResponse { receipt }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
