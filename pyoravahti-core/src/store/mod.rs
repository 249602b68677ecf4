//! Bike store abstraction.
//!
//! The matcher and the duplicate detector never talk to a database directly:
//! they are handed an `Arc<dyn BikeStore>` at construction time. Two
//! implementations ship with the crate:
//! - [`InMemoryBikeStore`]: concurrent maps, used for development and tests
//! - `PostgresBikeStore` (feature `postgres`): persistent storage via sqlx

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::InMemoryBikeStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresBikeStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::bike::{
    Bike, BikeDetails, BikeFilter, BikeImage, BikeListing, BikeStatus, BikeUpdate, Find, NewBike,
    NewFind, NewReport, Report, SearchFilters, DEFAULT_SEARCH_LIMIT,
};

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),

    /// A unique constraint (serial number, source URL) was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Query against the bike table.
///
/// All populated criteria must hold. Results are always ordered by creation
/// time, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BikeQuery {
    /// Allowed statuses (empty = any)
    pub statuses: Vec<BikeStatus>,
    /// Bike to leave out of the result
    pub exclude_id: Option<Uuid>,
    /// Exact, case-sensitive serial number
    pub serial_number: Option<String>,
    /// Only bikes that carry a fingerprint
    pub has_phash: bool,
    /// Case-insensitive substring filters
    pub brand: Option<String>,
    pub city: Option<String>,
    pub color: Option<String>,
    /// Case-insensitive substring over brand, model, color, city and serial number
    pub search: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl BikeQuery {
    /// Bikes in any of the given statuses, except `exclude`.
    pub fn candidates(statuses: &[BikeStatus], exclude: Uuid) -> Self {
        Self {
            statuses: statuses.to_vec(),
            exclude_id: Some(exclude),
            ..Default::default()
        }
    }

    pub fn with_serial_number(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    pub fn with_phash(mut self) -> Self {
        self.has_phash = true;
        self
    }

    /// Whether a bike satisfies every criterion except `limit`.
    pub fn matches(&self, bike: &Bike) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&bike.status) {
            return false;
        }
        if self.exclude_id == Some(bike.id) {
            return false;
        }
        if let Some(serial) = &self.serial_number {
            if bike.serial_number.as_deref() != Some(serial.as_str()) {
                return false;
            }
        }
        if self.has_phash && bike.phash.is_none() {
            return false;
        }
        if !contains_filter(bike.brand.as_deref(), self.brand.as_deref())
            || !contains_filter(bike.city.as_deref(), self.city.as_deref())
            || !contains_filter(bike.color.as_deref(), self.color.as_deref())
        {
            return false;
        }
        if let Some(term) = self.search.as_deref() {
            let fields = [
                bike.brand.as_deref(),
                bike.model.as_deref(),
                bike.color.as_deref(),
                bike.city.as_deref(),
                bike.serial_number.as_deref(),
            ];
            if !fields.iter().any(|f| contains_ignore_case(*f, term)) {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if bike.created_at < after {
                return false;
            }
        }
        true
    }
}

fn contains_filter(value: Option<&str>, filter: Option<&str>) -> bool {
    match filter {
        Some(term) => contains_ignore_case(value, term),
        None => true,
    }
}

/// Case-insensitive substring test. A missing value never matches.
pub fn contains_ignore_case(value: Option<&str>, term: &str) -> bool {
    value
        .map(|v| v.to_lowercase().contains(&term.to_lowercase()))
        .unwrap_or(false)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

impl From<&BikeFilter> for BikeQuery {
    fn from(filter: &BikeFilter) -> Self {
        Self {
            statuses: filter.status.into_iter().collect(),
            serial_number: non_empty(&filter.serial_number),
            brand: non_empty(&filter.brand),
            city: non_empty(&filter.city),
            color: non_empty(&filter.color),
            search: non_empty(&filter.search),
            ..Default::default()
        }
    }
}

impl From<&SearchFilters> for BikeQuery {
    fn from(filters: &SearchFilters) -> Self {
        Self {
            statuses: filters.status.into_iter().collect(),
            serial_number: non_empty(&filters.serial_number),
            city: non_empty(&filters.city),
            search: non_empty(&filters.query),
            limit: Some(filters.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)),
            ..Default::default()
        }
    }
}

/// Persistence capability consumed by the matching engine and the API.
#[async_trait]
pub trait BikeStore: Send + Sync {
    /// Human-readable backend name for health reporting.
    fn backend(&self) -> &'static str;

    /// Check that the backend is reachable.
    async fn check_health(&self) -> Result<(), StoreError>;

    async fn get_bike(&self, id: Uuid) -> Result<Option<Bike>, StoreError>;

    /// Bike with images, reports and finds.
    async fn get_bike_details(&self, id: Uuid) -> Result<Option<BikeDetails>, StoreError>;

    /// Bikes satisfying `query`, newest first.
    async fn find_bikes(&self, query: &BikeQuery) -> Result<Vec<Bike>, StoreError>;

    /// Number of bikes satisfying `query` (ignores `limit`).
    async fn count_bikes(&self, query: &BikeQuery) -> Result<u64, StoreError>;

    /// Images of a bike in upload order, optionally capped.
    async fn images_for(
        &self,
        bike_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<BikeImage>, StoreError>;

    async fn find_by_serial_number(&self, serial: &str) -> Result<Option<Bike>, StoreError>;

    async fn find_by_source_url(
        &self,
        source_url: &str,
        status: BikeStatus,
    ) -> Result<Option<Bike>, StoreError>;

    async fn create_bike(&self, input: NewBike) -> Result<Bike, StoreError>;

    /// Returns `None` if the bike does not exist.
    async fn update_bike(&self, id: Uuid, update: BikeUpdate)
        -> Result<Option<Bike>, StoreError>;

    /// Soft delete. Returns `None` if the bike does not exist.
    async fn archive_bike(&self, id: Uuid) -> Result<Option<Bike>, StoreError>;

    /// Hard delete including images, reports and finds.
    async fn delete_bike(&self, id: Uuid) -> Result<Option<Bike>, StoreError>;

    async fn add_image(&self, bike_id: Uuid, url: String) -> Result<BikeImage, StoreError>;

    /// Create a report and mark the bike as stolen.
    async fn create_report(&self, input: NewReport) -> Result<Report, StoreError>;

    async fn create_find(&self, input: NewFind) -> Result<Find, StoreError>;

    /// Bikes satisfying `query` together with their images.
    async fn find_listings(&self, query: &BikeQuery) -> Result<Vec<BikeListing>, StoreError> {
        let bikes = self.find_bikes(query).await?;
        let mut listings = Vec::with_capacity(bikes.len());
        for bike in bikes {
            let images = self.images_for(bike.id, None).await?;
            listings.push(BikeListing { bike, images });
        }
        Ok(listings)
    }

    /// Store a fingerprint for a bike.
    async fn set_phash(&self, id: Uuid, phash: String) -> Result<Option<Bike>, StoreError> {
        self.update_bike(
            id,
            BikeUpdate {
                phash: Some(phash),
                ..Default::default()
            },
        )
        .await
    }
}
