//! Report intake handlers
//!
//! `POST /api/report/{lost,stolen,found}` take the public report forms:
//! per-client rate limit, text moderation, field validation and a duplicate
//! serial number check, then create the bike and its report or find.
//! `POST /api/reports` and `POST /api/finds` attach raw records to an
//! existing bike.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use pyoravahti_core::{
    Bike, BikeQuery, BikeStatus, Find, NewBike, NewFind, NewReport, Report,
    StoreError,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::handlers::json_body;
use crate::rate_limit::{client_id, RATE_LIMITED_MESSAGE};
use crate::state::AppState;
use crate::validation::{moderate_fields, optional_text, Coordinate, FieldCheck};

/// Source recorded on bikes created through the report forms
const USER_SOURCE: &str = "user";

/// Reporter id used when the form carries none
const ANONYMOUS_USER: &str = "anonymous";

const DUPLICATE_SERIAL_MESSAGE: &str = "A bike with this serial number already exists";

/// Lost or stolen bike report form
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MissingBikeForm {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub serial_number: Option<String>,
    pub description: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339
    pub lost_date: Option<String>,
    pub place: Option<String>,
    pub contact: Option<String>,
    pub location_lat: Option<Coordinate>,
    pub location_lng: Option<Coordinate>,
    pub city: Option<String>,
    pub user_id: Option<String>,
}

/// Found bike report form
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FoundBikeForm {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub serial_number: Option<String>,
    pub description: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339
    pub found_date: Option<String>,
    pub note: Option<String>,
    pub location_lat: Option<Coordinate>,
    pub location_lng: Option<Coordinate>,
    pub city: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MissingBikeResponse {
    pub bike: Bike,
    pub report: Report,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FoundBikeResponse {
    pub bike: Bike,
    pub find: Find,
}

/// A missing bike form that passed validation
struct ValidMissingReport {
    bike: NewBike,
    lost_date: DateTime<Utc>,
    place: String,
    contact: String,
}

impl MissingBikeForm {
    fn text_fields(&self) -> impl Iterator<Item = &str> {
        [
            &self.brand,
            &self.model,
            &self.color,
            &self.description,
            &self.place,
            &self.contact,
            &self.city,
        ]
        .into_iter()
        .filter_map(|f| f.as_deref())
    }

    fn validate(&self, status: BikeStatus) -> Result<ValidMissingReport, ApiError> {
        let mut check = FieldCheck::new();

        let brand = check.require("brand", self.brand.as_deref(), "Merkki on pakollinen");
        let model = check.require("model", self.model.as_deref(), "Malli on pakollinen");
        let color = check.require("color", self.color.as_deref(), "Väri on pakollinen");
        let lost_date = check.require_date(
            "lostDate",
            self.lost_date.as_deref(),
            "Kadonnut/varastettu päivämäärä on pakollinen",
        );
        let place = check.require("place", self.place.as_deref(), "Paikka on pakollinen");
        let contact = check.require(
            "contact",
            self.contact.as_deref(),
            "Yhteystiedot ovat pakollisia",
        );
        let location_lat = check.coordinate(
            "locationLat",
            self.location_lat.as_ref(),
            "Leveyspiiri ei ole kelvollinen numero",
        );
        let location_lng = check.coordinate(
            "locationLng",
            self.location_lng.as_ref(),
            "Pituuspiiri ei ole kelvollinen numero",
        );
        let city = check.require("city", self.city.as_deref(), "Kaupunki on pakollinen");

        check.finish()?;

        match (lost_date, place, contact) {
            (Some(lost_date), Some(place), Some(contact)) => Ok(ValidMissingReport {
                bike: NewBike {
                    brand: brand.map(str::to_string),
                    model: model.map(str::to_string),
                    color: color.map(str::to_string),
                    serial_number: optional_text(self.serial_number.as_deref()),
                    description: optional_text(self.description.as_deref()),
                    status: Some(status),
                    location_lat,
                    location_lng,
                    city: city.map(str::to_string),
                    source: Some(USER_SOURCE.to_string()),
                    ..Default::default()
                },
                lost_date,
                place: place.to_string(),
                contact: contact.to_string(),
            }),
            _ => Err(ApiError::internal("Validated report is missing fields")),
        }
    }
}

/// A found bike form that passed validation
struct ValidFoundReport {
    bike: NewBike,
    found_date: DateTime<Utc>,
}

impl FoundBikeForm {
    fn text_fields(&self) -> impl Iterator<Item = &str> {
        [
            &self.brand,
            &self.model,
            &self.color,
            &self.description,
            &self.note,
            &self.city,
        ]
        .into_iter()
        .filter_map(|f| f.as_deref())
    }

    fn validate(&self) -> Result<ValidFoundReport, ApiError> {
        let mut check = FieldCheck::new();

        let description =
            check.require("description", self.description.as_deref(), "Kuvaus on pakollinen");
        let found_date = check.require_date(
            "foundDate",
            self.found_date.as_deref(),
            "Löydetty päivämäärä on pakollinen",
        );
        let location_lat = check.coordinate(
            "locationLat",
            self.location_lat.as_ref(),
            "Leveyspiiri ei ole kelvollinen numero",
        );
        let location_lng = check.coordinate(
            "locationLng",
            self.location_lng.as_ref(),
            "Pituuspiiri ei ole kelvollinen numero",
        );
        let city = check.require("city", self.city.as_deref(), "Kaupunki on pakollinen");

        check.finish()?;

        let found_date =
            found_date.ok_or_else(|| ApiError::internal("Validated report is missing fields"))?;

        Ok(ValidFoundReport {
            bike: NewBike {
                brand: optional_text(self.brand.as_deref()),
                model: optional_text(self.model.as_deref()),
                color: optional_text(self.color.as_deref()),
                serial_number: optional_text(self.serial_number.as_deref()),
                description: description.map(str::to_string),
                status: Some(BikeStatus::Found),
                location_lat,
                location_lng,
                city: city.map(str::to_string),
                source: Some(USER_SOURCE.to_string()),
                ..Default::default()
            },
            found_date,
        })
    }
}

fn check_rate_limit(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let client = client_id(headers);
    if state.report_limiter.check(&client) {
        Ok(())
    } else {
        Err(ApiError::too_many_requests(RATE_LIMITED_MESSAGE))
    }
}

/// Reject a serial number already used by another user-reported bike.
///
/// Marketplace listings are not considered: a listing carrying the serial
/// of a reported bike is exactly what the matcher should surface.
async fn ensure_serial_unused(state: &AppState, serial: Option<&str>) -> Result<(), ApiError> {
    let Some(serial) = serial else {
        return Ok(());
    };

    let query = BikeQuery {
        statuses: vec![BikeStatus::Lost, BikeStatus::Stolen, BikeStatus::Found],
        limit: Some(1),
        ..BikeQuery::default().with_serial_number(serial)
    };

    match state.store.find_bikes(&query).await?.into_iter().next() {
        Some(existing) => Err(ApiError::conflict(
            DUPLICATE_SERIAL_MESSAGE,
            Some(existing.id),
        )),
        None => Ok(()),
    }
}

/// Create a user-reported bike.
///
/// The store rejects a serial registered concurrently since
/// `ensure_serial_unused` ran; the winner is looked up so the client still
/// gets its id.
async fn create_reported_bike(state: &AppState, bike: NewBike) -> Result<Bike, ApiError> {
    let serial = bike.serial_number.clone();
    match state.store.create_bike(bike).await {
        Ok(bike) => Ok(bike),
        Err(StoreError::Conflict(message)) => {
            ensure_serial_unused(state, serial.as_deref()).await?;
            Err(StoreError::Conflict(message).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Remove a bike whose report could not be stored, so no bare bike is left behind.
async fn discard_bike(state: &AppState, bike: &Bike) {
    if let Err(e) = state.store.delete_bike(bike.id).await {
        tracing::error!(bike_id = %bike.id, error = %e, "Failed to discard unreported bike");
    }
}

async fn file_missing_report(
    state: AppState,
    headers: HeaderMap,
    form: MissingBikeForm,
    status: BikeStatus,
) -> Result<Json<MissingBikeResponse>, ApiError> {
    check_rate_limit(&state, &headers)?;
    moderate_fields(form.text_fields())?;
    let valid = form.validate(status)?;
    ensure_serial_unused(&state, valid.bike.serial_number.as_deref()).await?;

    let bike = create_reported_bike(&state, valid.bike).await?;

    let report = state
        .store
        .create_report(NewReport {
            user_id: form.user_id.unwrap_or_else(|| ANONYMOUS_USER.to_string()),
            bike_id: bike.id,
            lost_date: Some(valid.lost_date),
            place: Some(valid.place),
            contact: Some(valid.contact),
        })
        .await;

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            discard_bike(&state, &bike).await;
            return Err(e.into());
        }
    };

    // Filing a report marks the bike stolen
    let bike = state.store.get_bike(bike.id).await?.unwrap_or(bike);

    tracing::info!(bike_id = %bike.id, status = %bike.status, "Missing bike reported");
    Ok(Json(MissingBikeResponse { bike, report }))
}

/// Report a lost bike
#[utoipa::path(
    post,
    path = "/api/report/lost",
    tag = "Reports",
    request_body = MissingBikeForm,
    responses(
        (status = 200, description = "Bike and report created", body = MissingBikeResponse),
        (status = 400, description = "Validation failed or content rejected"),
        (status = 409, description = "Serial number already reported"),
        (status = 429, description = "Too many reports from this client")
    )
)]
pub async fn report_lost(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<MissingBikeForm>, JsonRejection>,
) -> Result<Json<MissingBikeResponse>, ApiError> {
    let form = json_body(body)?;
    file_missing_report(state, headers, form, BikeStatus::Lost).await
}

/// Report a stolen bike
#[utoipa::path(
    post,
    path = "/api/report/stolen",
    tag = "Reports",
    request_body = MissingBikeForm,
    responses(
        (status = 200, description = "Bike and report created", body = MissingBikeResponse),
        (status = 400, description = "Validation failed or content rejected"),
        (status = 409, description = "Serial number already reported"),
        (status = 429, description = "Too many reports from this client")
    )
)]
pub async fn report_stolen(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<MissingBikeForm>, JsonRejection>,
) -> Result<Json<MissingBikeResponse>, ApiError> {
    let form = json_body(body)?;
    file_missing_report(state, headers, form, BikeStatus::Stolen).await
}

/// Report a found bike
#[utoipa::path(
    post,
    path = "/api/report/found",
    tag = "Reports",
    request_body = FoundBikeForm,
    responses(
        (status = 200, description = "Bike and find created", body = FoundBikeResponse),
        (status = 400, description = "Validation failed or content rejected"),
        (status = 409, description = "Serial number already reported"),
        (status = 429, description = "Too many reports from this client")
    )
)]
pub async fn report_found(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<FoundBikeForm>, JsonRejection>,
) -> Result<Json<FoundBikeResponse>, ApiError> {
    let form = json_body(body)?;

    check_rate_limit(&state, &headers)?;
    moderate_fields(form.text_fields())?;
    let valid = form.validate()?;
    ensure_serial_unused(&state, valid.bike.serial_number.as_deref()).await?;

    let bike = create_reported_bike(&state, valid.bike).await?;

    let find = state
        .store
        .create_find(NewFind {
            user_id: form.user_id.unwrap_or_else(|| ANONYMOUS_USER.to_string()),
            bike_id: bike.id,
            note: optional_text(form.note.as_deref()),
            found_date: Some(valid.found_date),
        })
        .await;

    let find = match find {
        Ok(find) => find,
        Err(e) => {
            discard_bike(&state, &bike).await;
            return Err(e.into());
        }
    };

    tracing::info!(bike_id = %bike.id, "Found bike reported");
    Ok(Json(FoundBikeResponse { bike, find }))
}

/// Attach a lost/stolen report to an existing bike; the bike becomes STOLEN
#[utoipa::path(
    post,
    path = "/api/reports",
    tag = "Reports",
    request_body = NewReport,
    responses(
        (status = 200, description = "Report created", body = Report),
        (status = 400, description = "Invalid body"),
        (status = 404, description = "Bike not found")
    )
)]
pub async fn create_report(
    State(state): State<AppState>,
    body: Result<Json<NewReport>, JsonRejection>,
) -> Result<Json<Report>, ApiError> {
    let input = json_body(body)?;
    Ok(Json(state.store.create_report(input).await?))
}

/// Attach a find to an existing bike
#[utoipa::path(
    post,
    path = "/api/finds",
    tag = "Reports",
    request_body = NewFind,
    responses(
        (status = 200, description = "Find created", body = Find),
        (status = 400, description = "Invalid body"),
        (status = 404, description = "Bike not found")
    )
)]
pub async fn create_find(
    State(state): State<AppState>,
    body: Result<Json<NewFind>, JsonRejection>,
) -> Result<Json<Find>, ApiError> {
    let input = json_body(body)?;
    Ok(Json(state.store.create_find(input).await?))
}
