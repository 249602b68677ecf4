//! Duplicate-aware search

use axum::{
    extract::{Query, State},
    Json,
};
use pyoravahti_core::{BikeWithDuplicates, SearchFilters};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::parse_status;

/// Query parameters for `GET /api/search`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateSearchQuery {
    /// Free text matched against brand, model, color, city and serial number
    pub q: Option<String>,
    /// Exact serial number
    pub serial_number: Option<String>,
    /// City contains (case-insensitive)
    pub city: Option<String>,
    pub status: Option<String>,
    /// Maximum number of results (default 50)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DuplicateSearchResponse {
    pub success: bool,
    pub bikes: Vec<BikeWithDuplicates>,
}

/// Search bikes and flag likely duplicates
///
/// Each result lists other stored bikes with the same serial number or a
/// visually similar primary photo.
#[utoipa::path(
    get,
    path = "/api/search",
    tag = "Search",
    params(DuplicateSearchQuery),
    responses(
        (status = 200, description = "Results with duplicate flags", body = DuplicateSearchResponse),
        (status = 400, description = "Invalid status parameter"),
        (status = 500, description = "Duplicate lookup failed")
    )
)]
pub async fn search_with_duplicates(
    State(state): State<AppState>,
    Query(query): Query<DuplicateSearchQuery>,
) -> Result<Json<DuplicateSearchResponse>, ApiError> {
    let filters = SearchFilters {
        status: parse_status(query.status.as_deref())?,
        query: query.q,
        serial_number: query.serial_number,
        city: query.city,
        limit: query.limit,
    };

    let bikes = state.detector.with_duplicates(&filters).await?;

    Ok(Json(DuplicateSearchResponse {
        success: true,
        bikes,
    }))
}
