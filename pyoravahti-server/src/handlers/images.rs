//! Bike photo upload handler

use std::time::Duration;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use pyoravahti_core::{Bike, BikeImage, PerceptualHasher};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::multipart::{FileField, MultipartFields};
use crate::state::AppState;
use crate::storage::file_extension;
use crate::validation::MAX_IMAGES_PER_UPLOAD;

const FINGERPRINT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    pub success: bool,
    pub primary_image: BikeImage,
    pub additional_images: Vec<BikeImage>,
    /// The bike with its new fingerprint
    pub bike: Bike,
}

async fn store_image(state: &AppState, bike_id: Uuid, file: &FileField) -> Result<BikeImage, ApiError> {
    let extension = file_extension(file.file_name.as_deref(), file.content_type.as_deref());
    let url = state.images.save(&file.data, &extension).await.map_err(|e| {
        tracing::error!(bike_id = %bike_id, error = %e, "Failed to write image");
        ApiError::internal(format!("Failed to store image: {}", e))
    })?;

    match state.store.add_image(bike_id, url.clone()).await {
        Ok(image) => Ok(image),
        Err(e) => {
            if let Err(io) = state.images.delete(&url).await {
                tracing::warn!(url = %url, error = %io, "Failed to remove orphaned image");
            }
            Err(e.into())
        }
    }
}

/// Upload photos of a bike
///
/// Accepts multipart/form-data with up to 5 image files (JPEG, PNG, GIF or
/// WebP, 5 MB each); further files are ignored. The first image becomes the
/// primary photo and its fingerprint replaces the bike's `phash`.
#[utoipa::path(
    post,
    path = "/api/bikes/{id}/images",
    tag = "Bikes",
    params(("id" = Uuid, Path, description = "Bike ID")),
    request_body(content_type = "multipart/form-data", description = "Image files"),
    responses(
        (status = 200, description = "Images stored", body = ImageUploadResponse),
        (status = 400, description = "No files, unsupported type, too large or unreadable image"),
        (status = 404, description = "Bike not found"),
        (status = 408, description = "Fingerprinting timed out")
    )
)]
pub async fn upload_images(
    State(state): State<AppState>,
    Path(bike_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ImageUploadResponse>, ApiError> {
    if state.store.get_bike(bike_id).await?.is_none() {
        return Err(ApiError::not_found("Bike not found"));
    }

    let fields = MultipartFields::parse(
        &mut multipart,
        MAX_IMAGES_PER_UPLOAD,
        state.config.max_image_bytes(),
    )
    .await?;
    let files = fields.require_files()?;
    let (primary, rest) = files
        .split_first()
        .ok_or_else(|| ApiError::bad_request("No files provided"))?;

    // Fingerprint before anything is written, so an undecodable photo leaves no trace
    let data = primary.data.clone();
    let task = tokio::task::spawn_blocking(move || PerceptualHasher::new().hash_bytes(&data));
    let phash = tokio::time::timeout(FINGERPRINT_TIMEOUT, task)
        .await
        .map_err(|_| ApiError::timeout("Fingerprinting the image took too long"))?
        .map_err(|e| ApiError::internal(format!("Fingerprint task failed: {}", e)))??;

    let primary_image = store_image(&state, bike_id, primary).await?;

    let bike = state
        .store
        .set_phash(bike_id, phash)
        .await?
        .ok_or_else(|| ApiError::not_found("Bike not found"))?;

    let mut additional_images = Vec::with_capacity(rest.len());
    for file in rest {
        additional_images.push(store_image(&state, bike_id, file).await?);
    }

    tracing::info!(
        bike_id = %bike_id,
        images = 1 + additional_images.len(),
        phash = bike.phash.as_deref().unwrap_or(""),
        "Images uploaded"
    );

    Ok(Json(ImageUploadResponse {
        success: true,
        primary_image,
        additional_images,
        bike,
    }))
}
