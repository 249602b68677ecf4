//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

use axum::{extract::rejection::JsonRejection, Json};

use crate::error::ApiError;

pub mod bikes;
pub mod external;
pub mod health;
pub mod images;
pub mod matches;
pub mod notify;
pub mod reports;
pub mod search;
pub mod statistics;

pub use crate::state::AppState;
pub use bikes::{
    archive_bike, create_bike, delete_bike, filter_bikes, get_bike, list_bikes, search_bikes,
    update_bike, FilterBikesQuery, ListBikesQuery, SearchBikesQuery,
};
pub use external::{external_listings, sync_external_listings, ExternalListingsResponse};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use images::{upload_images, ImageUploadResponse};
pub use matches::{bike_matches, MatchesResponse};
pub use notify::{claim_bike, report_abuse, NotifyResponse};
pub use reports::{
    create_find, create_report, report_found, report_lost, report_stolen, FoundBikeForm,
    FoundBikeResponse, MissingBikeForm, MissingBikeResponse,
};
pub use search::{search_with_duplicates, DuplicateSearchQuery, DuplicateSearchResponse};
pub use statistics::statistics;

/// Unwrap a JSON body, turning a rejection into a 400 with axum's message.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}
