//! Home page statistics

use axum::{extract::State, Json};
use pyoravahti_core::{get_statistics, Statistics};

use crate::state::AppState;

/// Bike counters for the landing page
///
/// Always answers 200; on a store failure the counters are zero and
/// `error` is set.
#[utoipa::path(
    get,
    path = "/api/statistics",
    tag = "Statistics",
    responses(
        (status = 200, description = "Counters", body = Statistics)
    )
)]
pub async fn statistics(State(state): State<AppState>) -> Json<Statistics> {
    Json(get_statistics(state.store.as_ref()).await)
}
