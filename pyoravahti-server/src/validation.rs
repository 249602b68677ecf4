//! Request validation module
//!
//! Query parameter parsing, report form field checks and upload screening.

use chrono::{DateTime, NaiveDate, Utc};
use pyoravahti_core::moderation::{moderate_image, moderate_text};
use pyoravahti_core::BikeStatus;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{ApiError, FieldErrors};

/// Maximum number of images stored from one upload request
pub const MAX_IMAGES_PER_UPLOAD: usize = 5;

/// Parse an optional `status` query parameter.
///
/// Matching is case-sensitive on the wire names (`LOST`, `FOR_SALE_EXTERNAL`, ...).
pub fn parse_status(value: Option<&str>) -> Result<Option<BikeStatus>, ApiError> {
    match value.filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw.parse::<BikeStatus>().map(Some).map_err(|_| {
            ApiError::bad_request(format!(
                "Invalid status parameter. Valid values: {}",
                BikeStatus::valid_values()
            ))
        }),
    }
}

/// Screen every present text field against the banned word list.
pub fn moderate_fields<'a>(fields: impl IntoIterator<Item = &'a str>) -> Result<(), ApiError> {
    for field in fields {
        moderate_text(field)
            .map_err(|reason| ApiError::bad_request(format!("Ilmoitus hylätty: {}", reason)))?;
    }
    Ok(())
}

/// Screen an uploaded image by MIME type and size.
///
/// A missing Content-Type is rejected: only the listed image types are stored.
pub fn validate_image(
    content_type: Option<&str>,
    size: usize,
    max_bytes: usize,
) -> Result<(), ApiError> {
    moderate_image(content_type.unwrap_or(""), size, max_bytes)
        .map_err(|reason| ApiError::bad_request(reason.to_string()))
}

/// Latitude or longitude as sent by a form (text) or a JSON client (number).
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    /// `Ok(None)` for blank text, `Err(())` for text that is not a number.
    fn value(&self) -> Result<Option<f64>, ()> {
        match self {
            Coordinate::Number(n) if n.is_finite() => Ok(Some(*n)),
            Coordinate::Number(_) => Err(()),
            Coordinate::Text(s) if s.trim().is_empty() => Ok(None),
            Coordinate::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or(()),
        }
    }
}

/// Parse a form date: a plain `YYYY-MM-DD` (midnight UTC) or RFC 3339.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Collects field errors for one form, keyed by the camelCase field name.
#[derive(Debug, Default)]
pub struct FieldCheck {
    errors: FieldErrors,
}

impl FieldCheck {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    /// Require a non-blank text value.
    pub fn require<'a>(&mut self, field: &str, value: Option<&'a str>, message: &str) -> Option<&'a str> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => Some(v),
            None => {
                self.add(field, message);
                None
            }
        }
    }

    /// Require a date in a supported format.
    pub fn require_date(
        &mut self,
        field: &str,
        value: Option<&str>,
        message: &str,
    ) -> Option<DateTime<Utc>> {
        let raw = self.require(field, value, message)?;
        let parsed = parse_date(raw);
        if parsed.is_none() {
            self.add(field, "Päivämäärä ei ole kelvollinen");
        }
        parsed
    }

    /// Optional coordinate that must be numeric when present.
    pub fn coordinate(
        &mut self,
        field: &str,
        value: Option<&Coordinate>,
        message: &str,
    ) -> Option<f64> {
        match value.map(Coordinate::value) {
            None | Some(Ok(None)) => None,
            Some(Ok(Some(n))) => Some(n),
            Some(Err(())) => {
                self.add(field, message);
                None
            }
        }
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation {
                field_errors: self.errors,
            })
        }
    }
}

/// Trim a free-text value, treating blank as missing.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
