//! Health check handlers
//!
//! Provides health and readiness endpoints for monitoring and orchestration.

use axum::{extract::State, http::StatusCode, Json};
use pyoravahti_core::BikeQuery;
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status: "ok" or "error"
    pub status: &'static str,
    /// Server version from Cargo.toml
    pub version: &'static str,
    /// Service name
    pub service: &'static str,
    /// Store backend: "memory" or "postgres"
    pub database: &'static str,
    /// Whether the store answered
    pub database_connected: bool,
    /// Total number of stored bikes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bike_count: Option<u64>,
}

/// GET /health - Health check endpoint
///
/// Pings the store and counts bikes. Answers 503 when the store is unreachable.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let bike_count = match state.store.check_health().await {
        Ok(()) => state.store.count_bikes(&BikeQuery::default()).await,
        Err(e) => Err(e),
    };

    let (code, status, bike_count) = match bike_count {
        Ok(count) => (StatusCode::OK, "ok", Some(count)),
        Err(e) => {
            tracing::error!(error = %e, backend = state.store.backend(), "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "error", None)
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            service: "pyoravahti-server",
            database: state.store.backend(),
            database_connected: bike_count.is_some(),
            bike_count,
        }),
    )
}

/// Readiness response for Kubernetes
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
}

/// GET /ready - Kubernetes readiness probe
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse)
    )
)]
pub async fn ready() -> Json<ReadyResponse> {
    Json(ReadyResponse { ready: true })
}
