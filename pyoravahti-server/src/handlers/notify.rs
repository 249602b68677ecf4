//! Ownership claim and abuse report notifications

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::notify::{Notification, NotificationKind};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct NotifyResponse {
    pub success: bool,
}

async fn notify_admin(
    state: &AppState,
    bike_id: Uuid,
    kind: NotificationKind,
) -> Result<Json<NotifyResponse>, ApiError> {
    let bike = state
        .store
        .get_bike(bike_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Bike not found"))?;

    state
        .notifier
        .send(Notification::about_bike(kind, &bike))
        .await
        .map_err(|e| {
            tracing::error!(bike_id = %bike_id, error = %e, "Notification failed");
            ApiError::service_unavailable("Failed to send notification")
        })?;

    Ok(Json(NotifyResponse { success: true }))
}

/// Tell the administrators someone claims to own this bike
#[utoipa::path(
    post,
    path = "/api/bikes/{id}/claim",
    tag = "Notifications",
    params(("id" = Uuid, Path, description = "Bike ID")),
    responses(
        (status = 200, description = "Administrators notified", body = NotifyResponse),
        (status = 404, description = "Bike not found"),
        (status = 503, description = "Notification could not be delivered")
    )
)]
pub async fn claim_bike(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<NotifyResponse>, ApiError> {
    notify_admin(&state, id, NotificationKind::OwnershipClaim).await
}

/// Flag a listing as abusive
#[utoipa::path(
    post,
    path = "/api/bikes/{id}/abuse",
    tag = "Notifications",
    params(("id" = Uuid, Path, description = "Bike ID")),
    responses(
        (status = 200, description = "Administrators notified", body = NotifyResponse),
        (status = 404, description = "Bike not found"),
        (status = 503, description = "Notification could not be delivered")
    )
)]
pub async fn report_abuse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<NotifyResponse>, ApiError> {
    notify_admin(&state, id, NotificationKind::AbuseReport).await
}
