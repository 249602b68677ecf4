//! Fixtures shared by the unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::bike::{
    Bike, BikeDetails, BikeImage, BikeStatus, BikeUpdate, Find, NewBike, NewFind, NewReport,
    Report,
};
use crate::store::{BikeQuery, BikeStore, StoreError};

/// A bare bike in the given status, created now.
pub fn bike(status: BikeStatus) -> Bike {
    bike_at(status, Utc::now())
}

pub fn bike_at(status: BikeStatus, created_at: DateTime<Utc>) -> Bike {
    Bike {
        id: Uuid::new_v4(),
        brand: None,
        model: None,
        color: None,
        serial_number: None,
        description: None,
        status,
        location_lat: None,
        location_lng: None,
        city: None,
        source: Some("user".into()),
        source_url: None,
        phash: None,
        created_at,
        updated_at: created_at,
        archived: false,
        archived_at: None,
    }
}

fn down<T>() -> Result<T, StoreError> {
    Err(StoreError::Connection("connection refused".into()))
}

/// Store whose every operation fails.
pub struct FailingStore;

#[async_trait]
impl BikeStore for FailingStore {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        down()
    }

    async fn get_bike(&self, _: Uuid) -> Result<Option<Bike>, StoreError> {
        down()
    }

    async fn get_bike_details(&self, _: Uuid) -> Result<Option<BikeDetails>, StoreError> {
        down()
    }

    async fn find_bikes(&self, _: &BikeQuery) -> Result<Vec<Bike>, StoreError> {
        down()
    }

    async fn count_bikes(&self, _: &BikeQuery) -> Result<u64, StoreError> {
        down()
    }

    async fn images_for(&self, _: Uuid, _: Option<usize>) -> Result<Vec<BikeImage>, StoreError> {
        down()
    }

    async fn find_by_serial_number(&self, _: &str) -> Result<Option<Bike>, StoreError> {
        down()
    }

    async fn find_by_source_url(
        &self,
        _: &str,
        _: BikeStatus,
    ) -> Result<Option<Bike>, StoreError> {
        down()
    }

    async fn create_bike(&self, _: NewBike) -> Result<Bike, StoreError> {
        down()
    }

    async fn update_bike(&self, _: Uuid, _: BikeUpdate) -> Result<Option<Bike>, StoreError> {
        down()
    }

    async fn archive_bike(&self, _: Uuid) -> Result<Option<Bike>, StoreError> {
        down()
    }

    async fn delete_bike(&self, _: Uuid) -> Result<Option<Bike>, StoreError> {
        down()
    }

    async fn add_image(&self, _: Uuid, _: String) -> Result<BikeImage, StoreError> {
        down()
    }

    async fn create_report(&self, _: NewReport) -> Result<Report, StoreError> {
        down()
    }

    async fn create_find(&self, _: NewFind) -> Result<Find, StoreError> {
        down()
    }
}
