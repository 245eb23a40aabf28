//! # Prometheus Metrics
//!
//! Exposes operational metrics for the identity service. Scraped by
//! Prometheus at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the service.
///
/// Clone-friendly (prometheus handles are reference counted) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Successful registrations, including those whose ledger step failed.
    pub registrations_total: IntCounter,
    /// Registrations declined by the verification gateway.
    pub registrations_rejected_total: IntCounter,
    /// Registrations that failed for any other reason.
    pub registration_failures_total: IntCounter,
    /// Ledger submissions that failed after the record was persisted.
    pub ledger_failures_total: IntCounter,
    pub profile_lookups_total: IntCounter,
    /// Administrative decrypt requests that reached the cipher.
    pub decrypt_requests_total: IntCounter,
    /// End-to-end registration latency in seconds.
    pub registration_latency_seconds: Histogram,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, prometheus::Error> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("retail_identity".into()), None)?;

        let registrations_total = counter(
            &registry,
            "registrations_total",
            "Total number of retailers registered",
        )?;
        let registrations_rejected_total = counter(
            &registry,
            "registrations_rejected_total",
            "Registrations rejected by credential verification",
        )?;
        let registration_failures_total = counter(
            &registry,
            "registration_failures_total",
            "Registrations that failed for reasons other than rejection",
        )?;
        let ledger_failures_total = counter(
            &registry,
            "ledger_failures_total",
            "Identity ledger submissions that failed",
        )?;
        let profile_lookups_total = counter(
            &registry,
            "profile_lookups_total",
            "Public profile lookups served",
        )?;
        let decrypt_requests_total = counter(
            &registry,
            "decrypt_requests_total",
            "Authorized administrative decrypt requests",
        )?;

        let registration_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "registration_latency_seconds",
                "End-to-end registration latency in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )?;
        registry.register(Box::new(registration_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            registrations_total,
            registrations_rejected_total,
            registration_failures_total,
            ledger_failures_total,
            profile_lookups_total,
            decrypt_requests_total,
            registration_latency_seconds,
        })
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
