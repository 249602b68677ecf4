//! Possible matches for a bike

use axum::{
    extract::{Path, State},
    Json,
};
use pyoravahti_core::Match;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchesResponse {
    pub bike_id: Uuid,
    pub count: usize,
    /// Ranked by confidence, highest first
    pub matches: Vec<Match>,
}

/// Candidate reunification matches for a bike
///
/// Lost and stolen bikes are compared against found and for-sale bikes and
/// the other way around, by serial number, photo fingerprint and keywords.
#[utoipa::path(
    get,
    path = "/api/bikes/{id}/matches",
    tag = "Matching",
    params(("id" = Uuid, Path, description = "Bike ID")),
    responses(
        (status = 200, description = "Ranked matches", body = MatchesResponse),
        (status = 404, description = "Bike not found")
    )
)]
pub async fn bike_matches(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchesResponse>, ApiError> {
    let matches = state.matcher.find_matches(id).await?;

    Ok(Json(MatchesResponse {
        bike_id: id,
        count: matches.len(),
        matches,
    }))
}
