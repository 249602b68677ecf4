//! Bicycle records and the filters used to query them.
//!
//! A [`Bike`] is the central entity: a single physical bicycle as reported by
//! a user (lost, stolen or found) or imported from an external marketplace.
//! Images, reports and finds hang off a bike and are bundled together in
//! [`BikeDetails`] for the detail view.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Current report state of a bike. The variants are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BikeStatus {
    Lost,
    Stolen,
    Found,
    ForSaleExternal,
}

impl BikeStatus {
    pub const ALL: [BikeStatus; 4] = [
        BikeStatus::Lost,
        BikeStatus::Stolen,
        BikeStatus::Found,
        BikeStatus::ForSaleExternal,
    ];

    /// Wire name, e.g. `FOR_SALE_EXTERNAL`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BikeStatus::Lost => "LOST",
            BikeStatus::Stolen => "STOLEN",
            BikeStatus::Found => "FOUND",
            BikeStatus::ForSaleExternal => "FOR_SALE_EXTERNAL",
        }
    }

    /// Statuses a bike in this status can be matched against.
    ///
    /// A missing bike (lost or stolen) can only be reunited with a bike that
    /// turned up somewhere (found or listed for sale), and the other way
    /// around. Two lost bikes never match each other.
    pub fn opposite(&self) -> &'static [BikeStatus] {
        match self {
            BikeStatus::Lost | BikeStatus::Stolen => {
                &[BikeStatus::Found, BikeStatus::ForSaleExternal]
            }
            BikeStatus::Found | BikeStatus::ForSaleExternal => {
                &[BikeStatus::Lost, BikeStatus::Stolen]
            }
        }
    }

    /// Comma separated list of the wire names, for error messages.
    pub fn valid_values() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for BikeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BikeStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::InvalidStatus(s.to_string()))
    }
}

/// A stored bicycle record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Bike {
    pub id: Uuid,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub serial_number: Option<String>,
    pub description: Option<String>,
    pub status: BikeStatus,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub city: Option<String>,
    /// "user", "api" or the name of an external adapter
    pub source: Option<String>,
    pub source_url: Option<String>,
    /// Fingerprint of the primary photo
    pub phash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Bike {
    /// Serial number, if present and not blank.
    pub fn serial(&self) -> Option<&str> {
        non_blank(self.serial_number.as_deref())
    }

    /// Perceptual hash, if present and not blank.
    pub fn fingerprint(&self) -> Option<&str> {
        non_blank(self.phash.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Image attached to a bike. The oldest image is the primary photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct BikeImage {
    pub id: Uuid,
    pub bike_id: Uuid,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// A lost or stolen claim on a bike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub user_id: String,
    pub bike_id: Uuid,
    pub lost_date: Option<DateTime<Utc>>,
    pub place: Option<String>,
    pub contact: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A found claim on a bike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Find {
    pub id: Uuid,
    pub user_id: String,
    pub bike_id: Uuid,
    pub note: Option<String>,
    pub found_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A bike together with all of its related records.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct BikeDetails {
    #[serde(flatten)]
    pub bike: Bike,
    pub images: Vec<BikeImage>,
    pub reports: Vec<Report>,
    pub finds: Vec<Find>,
}

/// A bike with its images, as returned by listing queries.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct BikeListing {
    #[serde(flatten)]
    pub bike: Bike,
    pub images: Vec<BikeImage>,
}

/// Input for creating a bike.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NewBike {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub serial_number: Option<String>,
    pub description: Option<String>,
    pub status: Option<BikeStatus>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub city: Option<String>,
    pub source: Option<String>,
    pub source_url: Option<String>,
    pub phash: Option<String>,
    /// Overrides the creation time, used when importing listings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewBike {
    /// Status of the new bike. Bikes created without one are treated as lost.
    pub fn status_or_default(&self) -> BikeStatus {
        self.status.unwrap_or(BikeStatus::Lost)
    }
}

/// Partial update of a bike. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct BikeUpdate {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub serial_number: Option<String>,
    pub description: Option<String>,
    pub status: Option<BikeStatus>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub city: Option<String>,
    pub phash: Option<String>,
}

impl BikeUpdate {
    /// Apply the update to a bike in place, bumping `updated_at`.
    pub fn apply(self, bike: &mut Bike) {
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(value) = self.$field {
                    bike.$field = Some(value);
                })*
            };
        }
        set!(
            brand,
            model,
            color,
            serial_number,
            description,
            location_lat,
            location_lng,
            city,
            phash
        );
        if let Some(status) = self.status {
            bike.status = status;
        }
        bike.updated_at = Utc::now();
    }
}

/// Input for a lost/stolen report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub user_id: String,
    pub bike_id: Uuid,
    pub lost_date: Option<DateTime<Utc>>,
    pub place: Option<String>,
    pub contact: Option<String>,
}

/// Input for a found claim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NewFind {
    pub user_id: String,
    pub bike_id: Uuid,
    pub note: Option<String>,
    pub found_date: Option<DateTime<Utc>>,
}

/// Listing filters for the bike list and filter pages.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeFilter {
    pub status: Option<BikeStatus>,
    pub brand: Option<String>,
    pub city: Option<String>,
    pub color: Option<String>,
    pub search: Option<String>,
    pub serial_number: Option<String>,
}

/// Filters accepted by the duplicate-aware search.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub query: Option<String>,
    pub serial_number: Option<String>,
    pub city: Option<String>,
    pub status: Option<BikeStatus>,
    pub limit: Option<usize>,
}

/// Default number of results returned by a search.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;
