//! Bike listing and CRUD handlers
//!
//! Public read routes plus admin-only create, update, archive and delete.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use pyoravahti_core::{
    Bike, BikeDetails, BikeFilter, BikeListing, BikeQuery, BikeUpdate, NewBike, SearchFilters,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::AdminAccess;
use crate::error::ApiError;
use crate::handlers::json_body;
use crate::state::AppState;
use crate::validation::parse_status;

/// Query parameters for `GET /api/bikes`
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListBikesQuery {
    /// Exact status: LOST, STOLEN, FOUND or FOR_SALE_EXTERNAL
    pub status: Option<String>,
    /// Free text matched against brand, model, color, city and serial number
    pub q: Option<String>,
    /// City contains (case-insensitive)
    pub city: Option<String>,
    /// Exact serial number
    pub serial: Option<String>,
    /// Geospatial filter `lat,lng,radiusKm` (not supported)
    pub near: Option<String>,
}

/// Query parameters for `GET /api/bikes/filter`
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct FilterBikesQuery {
    pub status: Option<String>,
    /// Brand contains (case-insensitive)
    pub brand: Option<String>,
    /// City contains (case-insensitive)
    pub city: Option<String>,
    /// Color contains (case-insensitive)
    pub color: Option<String>,
    /// Free text matched against brand, model, color, city and serial number
    pub search: Option<String>,
}

/// Query parameters for `GET /api/bikes/search`
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchBikesQuery {
    /// Free text search term
    pub q: Option<String>,
}

async fn listings(state: &AppState, filter: &BikeFilter) -> Result<Vec<BikeListing>, ApiError> {
    Ok(state.store.find_listings(&BikeQuery::from(filter)).await?)
}

/// List bikes, newest first
#[utoipa::path(
    get,
    path = "/api/bikes",
    tag = "Bikes",
    params(ListBikesQuery),
    responses(
        (status = 200, description = "Matching bikes with their images", body = Vec<BikeListing>),
        (status = 400, description = "Invalid status parameter"),
        (status = 501, description = "Geospatial filtering requested")
    )
)]
pub async fn list_bikes(
    State(state): State<AppState>,
    Query(query): Query<ListBikesQuery>,
) -> Result<Json<Vec<BikeListing>>, ApiError> {
    let status = parse_status(query.status.as_deref())?;

    if query.near.as_deref().is_some_and(|n| !n.is_empty()) {
        return Err(ApiError::not_implemented(
            "Geospatial filtering (near parameter) not yet implemented",
        ));
    }

    let filter = BikeFilter {
        status,
        city: query.city,
        serial_number: query.serial,
        search: query.q,
        ..Default::default()
    };

    Ok(Json(listings(&state, &filter).await?))
}

/// Filter bikes by status and contains-matches on brand, city and color
#[utoipa::path(
    get,
    path = "/api/bikes/filter",
    tag = "Bikes",
    params(FilterBikesQuery),
    responses(
        (status = 200, description = "Matching bikes with their images", body = Vec<BikeListing>),
        (status = 400, description = "Invalid status parameter")
    )
)]
pub async fn filter_bikes(
    State(state): State<AppState>,
    Query(query): Query<FilterBikesQuery>,
) -> Result<Json<Vec<BikeListing>>, ApiError> {
    let filter = BikeFilter {
        status: parse_status(query.status.as_deref())?,
        brand: query.brand,
        city: query.city,
        color: query.color,
        search: query.search,
        serial_number: None,
    };

    Ok(Json(listings(&state, &filter).await?))
}

/// Free-text search, at most 50 results
#[utoipa::path(
    get,
    path = "/api/bikes/search",
    tag = "Bikes",
    params(SearchBikesQuery),
    responses(
        (status = 200, description = "Matching bikes with their images", body = Vec<BikeListing>)
    )
)]
pub async fn search_bikes(
    State(state): State<AppState>,
    Query(query): Query<SearchBikesQuery>,
) -> Result<Json<Vec<BikeListing>>, ApiError> {
    let filters = SearchFilters {
        query: query.q,
        ..Default::default()
    };
    Ok(Json(state.detector.search_bikes(&filters).await?))
}

/// Get a bike with its images, reports and finds
#[utoipa::path(
    get,
    path = "/api/bikes/{id}",
    tag = "Bikes",
    params(("id" = Uuid, Path, description = "Bike ID")),
    responses(
        (status = 200, description = "Bike details", body = BikeDetails),
        (status = 404, description = "Bike not found")
    )
)]
pub async fn get_bike(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BikeDetails>, ApiError> {
    state
        .store
        .get_bike_details(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Bike not found"))
}

/// Create a bike (admin)
#[utoipa::path(
    post,
    path = "/api/bikes",
    tag = "Bikes",
    request_body = NewBike,
    responses(
        (status = 200, description = "Created bike", body = Bike),
        (status = 400, description = "Invalid body or status"),
        (status = 401, description = "Missing or invalid admin token"),
        (status = 409, description = "Serial number or listing URL already exists")
    ),
    security(("admin_token" = []))
)]
pub async fn create_bike(
    State(state): State<AppState>,
    _admin: AdminAccess,
    body: Result<Json<NewBike>, JsonRejection>,
) -> Result<Json<Bike>, ApiError> {
    let mut input = json_body(body)?;
    input.source.get_or_insert_with(|| "api".to_string());

    let bike = state.store.create_bike(input).await?;
    tracing::info!(bike_id = %bike.id, status = %bike.status, "Bike created");
    Ok(Json(bike))
}

/// Update a bike (admin)
#[utoipa::path(
    put,
    path = "/api/bikes/{id}",
    tag = "Bikes",
    params(("id" = Uuid, Path, description = "Bike ID")),
    request_body = BikeUpdate,
    responses(
        (status = 200, description = "Updated bike", body = Bike),
        (status = 400, description = "Invalid body or status"),
        (status = 401, description = "Missing or invalid admin token"),
        (status = 404, description = "Bike not found")
    ),
    security(("admin_token" = []))
)]
pub async fn update_bike(
    State(state): State<AppState>,
    _admin: AdminAccess,
    Path(id): Path<Uuid>,
    body: Result<Json<BikeUpdate>, JsonRejection>,
) -> Result<Json<Bike>, ApiError> {
    let update = json_body(body)?;
    state
        .store
        .update_bike(id, update)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Bike not found"))
}

/// Hard delete a bike together with its images, reports and finds (admin)
#[utoipa::path(
    delete,
    path = "/api/bikes/{id}",
    tag = "Bikes",
    params(("id" = Uuid, Path, description = "Bike ID")),
    responses(
        (status = 200, description = "Deleted bike", body = Bike),
        (status = 401, description = "Missing or invalid admin token"),
        (status = 404, description = "Bike not found")
    ),
    security(("admin_token" = []))
)]
pub async fn delete_bike(
    State(state): State<AppState>,
    _admin: AdminAccess,
    Path(id): Path<Uuid>,
) -> Result<Json<Bike>, ApiError> {
    // Collect image URLs before the cascade removes the rows
    let images = state.store.images_for(id, None).await?;

    let bike = state
        .store
        .delete_bike(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Bike not found"))?;

    for image in images {
        if let Err(e) = state.images.delete(&image.url).await {
            tracing::warn!(url = %image.url, error = %e, "Failed to remove image file");
        }
    }

    tracing::info!(bike_id = %bike.id, "Bike deleted");
    Ok(Json(bike))
}

/// Archive a bike (admin)
#[utoipa::path(
    post,
    path = "/api/bikes/{id}/archive",
    tag = "Bikes",
    params(("id" = Uuid, Path, description = "Bike ID")),
    responses(
        (status = 200, description = "Archived bike", body = Bike),
        (status = 401, description = "Missing or invalid admin token"),
        (status = 404, description = "Bike not found")
    ),
    security(("admin_token" = []))
)]
pub async fn archive_bike(
    State(state): State<AppState>,
    _admin: AdminAccess,
    Path(id): Path<Uuid>,
) -> Result<Json<Bike>, ApiError> {
    state
        .store
        .archive_bike(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Bike not found"))
}
