//! Health check endpoints for Kubernetes probes and monitoring.

use axum::{Json, response::IntoResponse};
use http::StatusCode;
use serde::Serialize;

/// Health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status: always "healthy" while the process is serving
    pub status: String,
    /// Service version
    pub version: String,
}

/// Health check.
///
/// The bridge has no local dependencies to probe: Sparka is deliberately not
/// checked here, since an IdP outage must not make the bridge restart-loop.
#[tracing::instrument(name = "health.check")]
pub async fn health_check() -> impl IntoResponse {
    Json(HealthStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Kubernetes liveness probe.
///
/// Returns 200 if the service is running.
#[tracing::instrument(name = "health.liveness")]
pub async fn liveness() -> impl IntoResponse {
    StatusCode::OK
}

/// Kubernetes readiness probe.
///
/// Returns 200 once the router is serving; the bridge holds no connections
/// that could make it not-ready.
#[tracing::instrument(name = "health.readiness")]
pub async fn readiness() -> impl IntoResponse {
    StatusCode::OK
}
