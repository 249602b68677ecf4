//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pyoravahti_core::{BikeStatus, Error as CoreError, StoreError};
use thiserror::Error;
use uuid::Uuid;

/// Per-field validation messages, keyed by the camelCase field name
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unauthorized - missing or invalid admin token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict - a bike with the same identity already exists
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        bike_id: Option<Uuid>,
    },

    /// Validation failed on one or more form fields
    #[error("Validation failed on {} field(s)", field_errors.len())]
    Validation { field_errors: FieldErrors },

    /// Too many requests from one client
    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    /// Request timeout - operation took too long
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable - store or upstream source unreachable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Not implemented - recognised but unsupported request
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Error from the matching engine or bike store
    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Core(CoreError::Store(err))
    }
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a conflict error pointing at the existing bike
    pub fn conflict(message: impl Into<String>, bike_id: Option<Uuid>) -> Self {
        Self::Conflict {
            message: message.into(),
            bike_id,
        }
    }

    /// Create a too many requests error
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::TooManyRequests(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a service unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Create a not implemented error
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Core(ref e) => match e {
                CoreError::BikeNotFound(_) | CoreError::Store(StoreError::NotFound(_)) => {
                    StatusCode::NOT_FOUND
                }
                CoreError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
                CoreError::InvalidStatus(_) | CoreError::PerceptualHash(_) => {
                    StatusCode::BAD_REQUEST
                }

                // Unreachable store or marketplace → 503
                CoreError::Store(StoreError::Connection(_)) | CoreError::ListingSource(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }

                CoreError::Store(StoreError::Migration(_))
                | CoreError::Store(StoreError::Query(_))
                | CoreError::DuplicateLookup(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict { .. } => "DUPLICATE_BIKE",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::TooManyRequests(_) => "RATE_LIMITED",
            Self::Timeout(_) => "TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
            Self::Core(ref e) => match e {
                CoreError::BikeNotFound(_) => "BIKE_NOT_FOUND",
                CoreError::InvalidStatus(_) => "INVALID_STATUS",
                CoreError::PerceptualHash(_) => "INVALID_IMAGE",
                CoreError::DuplicateLookup(_) => "DUPLICATE_LOOKUP_FAILED",
                CoreError::ListingSource(_) => "UPSTREAM_ERROR",
                CoreError::Store(StoreError::NotFound(_)) => "NOT_FOUND",
                CoreError::Store(StoreError::Conflict(_)) => "DUPLICATE_BIKE",
                CoreError::Store(StoreError::Connection(_)) => "STORE_UNAVAILABLE",
                CoreError::Store(StoreError::Migration(_))
                | CoreError::Store(StoreError::Query(_)) => "STORE_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            Self::BadRequest(message)
            | Self::Unauthorized(message)
            | Self::NotFound(message)
            | Self::TooManyRequests(message)
            | Self::Timeout(message)
            | Self::ServiceUnavailable(message)
            | Self::NotImplemented(message) => message.clone(),
            Self::Conflict { message, .. } => message.clone(),
            Self::Validation { .. } => "Tarkista lomakkeen kentät".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            // For core errors, never leak store internals
            Self::Core(ref e) => match e {
                CoreError::BikeNotFound(_) => "Bike not found".to_string(),
                CoreError::InvalidStatus(_) => format!(
                    "Invalid status parameter. Valid values: {}",
                    BikeStatus::valid_values()
                ),
                CoreError::PerceptualHash(_) => "Could not read image".to_string(),
                CoreError::DuplicateLookup(_) => "Failed to search bikes".to_string(),
                CoreError::ListingSource(_) => "Listing source unavailable".to_string(),
                CoreError::Store(StoreError::NotFound(_)) => "Bike not found".to_string(),
                CoreError::Store(StoreError::Conflict(_)) => {
                    "A bike with this serial number or listing already exists".to_string()
                }
                CoreError::Store(StoreError::Connection(_)) => {
                    "Database unavailable".to_string()
                }
                CoreError::Store(_) => "Database error".to_string(),
            },
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Validation { .. } => "validation",
            Self::TooManyRequests(_) => "rate_limited",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::NotImplemented(_) => "not_implemented",
            Self::Core(_) => "core",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Server error"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        }

        // All error responses include a `code` field for programmatic error handling
        let mut body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        match self {
            Self::Conflict {
                bike_id: Some(bike_id),
                ..
            } => {
                body["bikeId"] = serde_json::json!(bike_id);
            }
            Self::Validation { field_errors } => {
                body["fieldErrors"] = serde_json::json!(field_errors);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}
