//! Marketplace listing handlers

use axum::{extract::State, Json};
use pyoravahti_core::{ExternalListing, SyncSummary};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AdminAccess;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ExternalListingsResponse {
    pub success: bool,
    /// Whether the listing adapter is switched on
    pub enabled: bool,
    pub listings: Vec<ExternalListing>,
}

/// Current marketplace listings
///
/// Empty when the listing adapter is disabled.
#[utoipa::path(
    get,
    path = "/api/external-listings",
    tag = "External listings",
    responses(
        (status = 200, description = "Listings from the adapter", body = ExternalListingsResponse),
        (status = 503, description = "Listing source unavailable")
    )
)]
pub async fn external_listings(
    State(state): State<AppState>,
) -> Result<Json<ExternalListingsResponse>, ApiError> {
    let listings = state.listings.fetch().await?;
    Ok(Json(ExternalListingsResponse {
        success: true,
        enabled: state.listings.is_enabled(),
        listings,
    }))
}

/// Import marketplace listings as for-sale bikes (admin)
#[utoipa::path(
    post,
    path = "/api/external-listings/sync",
    tag = "External listings",
    responses(
        (status = 200, description = "Import counts", body = SyncSummary),
        (status = 401, description = "Missing or invalid admin token"),
        (status = 503, description = "Listing source unavailable")
    ),
    security(("admin_token" = []))
)]
pub async fn sync_external_listings(
    State(state): State<AppState>,
    _admin: AdminAccess,
) -> Result<Json<SyncSummary>, ApiError> {
    Ok(Json(state.listings.sync().await?))
}
