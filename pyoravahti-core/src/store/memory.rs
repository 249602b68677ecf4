//! In-memory bike store
//!
//! Used when no database is configured and throughout the test suites.
//! Nothing is persisted across restarts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{BikeQuery, BikeStore, StoreError};
use crate::bike::{
    Bike, BikeDetails, BikeImage, BikeStatus, BikeUpdate, Find, NewBike, NewFind, NewReport,
    Report,
};

struct BikeEntry {
    /// Insertion sequence, breaks ties between equal creation times
    seq: u64,
    bike: Bike,
}

/// Concurrent in-memory implementation of [`BikeStore`].
#[derive(Default)]
pub struct InMemoryBikeStore {
    bikes: DashMap<Uuid, BikeEntry>,
    /// bike id -> images in upload order
    images: DashMap<Uuid, Vec<BikeImage>>,
    reports: DashMap<Uuid, Vec<Report>>,
    finds: DashMap<Uuid, Vec<Find>>,
    next_seq: AtomicU64,
    /// Held across the uniqueness check and the insert in `create_bike`
    create_lock: Mutex<()>,
}

impl InMemoryBikeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed bike as is, skipping uniqueness checks.
    ///
    /// Intended for seeding data imported from elsewhere, which may already
    /// violate the serial number constraint.
    pub fn insert(&self, bike: Bike) -> Bike {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.bikes.insert(
            bike.id,
            BikeEntry {
                seq,
                bike: bike.clone(),
            },
        );
        bike
    }

    /// Number of stored bikes.
    pub fn len(&self) -> usize {
        self.bikes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bikes.is_empty()
    }

    fn check_unique(&self, input: &NewBike) -> Result<(), StoreError> {
        let status = input.status_or_default();

        if status != BikeStatus::ForSaleExternal {
            if let Some(serial) = input.serial_number.as_deref().filter(|s| !s.is_empty()) {
                let taken = self.bikes.iter().any(|e| {
                    e.bike.status != BikeStatus::ForSaleExternal
                        && e.bike.serial_number.as_deref() == Some(serial)
                });
                if taken {
                    return Err(StoreError::Conflict(format!(
                        "serial number {} already registered",
                        serial
                    )));
                }
            }
        }

        if let Some(url) = input.source_url.as_deref() {
            let taken = self
                .bikes
                .iter()
                .any(|e| e.bike.source_url.as_deref() == Some(url));
            if taken {
                return Err(StoreError::Conflict(format!(
                    "source url {} already imported",
                    url
                )));
            }
        }

        Ok(())
    }

    fn require_bike(&self, id: Uuid) -> Result<(), StoreError> {
        if self.bikes.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("bike {}", id)))
        }
    }
}

impl std::fmt::Debug for InMemoryBikeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBikeStore")
            .field("bikes", &self.bikes.len())
            .field("images", &self.images.len())
            .finish()
    }
}

#[async_trait]
impl BikeStore for InMemoryBikeStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get_bike(&self, id: Uuid) -> Result<Option<Bike>, StoreError> {
        Ok(self.bikes.get(&id).map(|e| e.bike.clone()))
    }

    async fn get_bike_details(&self, id: Uuid) -> Result<Option<BikeDetails>, StoreError> {
        let Some(bike) = self.get_bike(id).await? else {
            return Ok(None);
        };
        let images = self.images.get(&id).map(|v| v.value().clone()).unwrap_or_default();
        let mut reports = self.reports.get(&id).map(|v| v.value().clone()).unwrap_or_default();
        let mut finds = self.finds.get(&id).map(|v| v.value().clone()).unwrap_or_default();
        reports.reverse();
        finds.reverse();

        Ok(Some(BikeDetails {
            bike,
            images,
            reports,
            finds,
        }))
    }

    async fn find_bikes(&self, query: &BikeQuery) -> Result<Vec<Bike>, StoreError> {
        let mut hits: Vec<(u64, Bike)> = self
            .bikes
            .iter()
            .filter(|e| query.matches(&e.bike))
            .map(|e| (e.seq, e.bike.clone()))
            .collect();

        hits.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| seq_b.cmp(seq_a))
        });

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(hits.into_iter().take(limit).map(|(_, bike)| bike).collect())
    }

    async fn count_bikes(&self, query: &BikeQuery) -> Result<u64, StoreError> {
        Ok(self.bikes.iter().filter(|e| query.matches(&e.bike)).count() as u64)
    }

    async fn images_for(
        &self,
        bike_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<BikeImage>, StoreError> {
        let images = self
            .images
            .get(&bike_id)
            .map(|v| v.iter().take(limit.unwrap_or(usize::MAX)).cloned().collect())
            .unwrap_or_default();
        Ok(images)
    }

    async fn find_by_serial_number(&self, serial: &str) -> Result<Option<Bike>, StoreError> {
        let query = BikeQuery::default().with_serial_number(serial);
        Ok(self.find_bikes(&query).await?.into_iter().next())
    }

    async fn find_by_source_url(
        &self,
        source_url: &str,
        status: BikeStatus,
    ) -> Result<Option<Bike>, StoreError> {
        Ok(self
            .bikes
            .iter()
            .find(|e| e.bike.status == status && e.bike.source_url.as_deref() == Some(source_url))
            .map(|e| e.bike.clone()))
    }

    async fn create_bike(&self, input: NewBike) -> Result<Bike, StoreError> {
        // No await below, so a std mutex is fine across check and insert
        let _guard = self.create_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.check_unique(&input)?;

        let now = Utc::now();
        let status = input.status_or_default();
        let bike = Bike {
            id: Uuid::new_v4(),
            brand: input.brand,
            model: input.model,
            color: input.color,
            serial_number: input.serial_number,
            description: input.description,
            status,
            location_lat: input.location_lat,
            location_lng: input.location_lng,
            city: input.city,
            source: input.source,
            source_url: input.source_url,
            phash: input.phash,
            created_at: input.created_at.unwrap_or(now),
            updated_at: now,
            archived: false,
            archived_at: None,
        };

        Ok(self.insert(bike))
    }

    async fn update_bike(
        &self,
        id: Uuid,
        update: BikeUpdate,
    ) -> Result<Option<Bike>, StoreError> {
        Ok(self.bikes.get_mut(&id).map(|mut entry| {
            update.apply(&mut entry.bike);
            entry.bike.clone()
        }))
    }

    async fn archive_bike(&self, id: Uuid) -> Result<Option<Bike>, StoreError> {
        Ok(self.bikes.get_mut(&id).map(|mut entry| {
            let now = Utc::now();
            entry.bike.archived = true;
            entry.bike.archived_at = Some(now);
            entry.bike.updated_at = now;
            entry.bike.clone()
        }))
    }

    async fn delete_bike(&self, id: Uuid) -> Result<Option<Bike>, StoreError> {
        let Some((_, entry)) = self.bikes.remove(&id) else {
            return Ok(None);
        };
        self.images.remove(&id);
        self.reports.remove(&id);
        self.finds.remove(&id);
        Ok(Some(entry.bike))
    }

    async fn add_image(&self, bike_id: Uuid, url: String) -> Result<BikeImage, StoreError> {
        self.require_bike(bike_id)?;

        let image = BikeImage {
            id: Uuid::new_v4(),
            bike_id,
            url,
            created_at: Utc::now(),
        };
        self.images.entry(bike_id).or_default().push(image.clone());
        Ok(image)
    }

    async fn create_report(&self, input: NewReport) -> Result<Report, StoreError> {
        self.require_bike(input.bike_id)?;

        let report = Report {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            bike_id: input.bike_id,
            lost_date: input.lost_date,
            place: input.place,
            contact: input.contact,
            created_at: Utc::now(),
        };
        self.reports
            .entry(input.bike_id)
            .or_default()
            .push(report.clone());

        if let Some(mut entry) = self.bikes.get_mut(&input.bike_id) {
            entry.bike.status = BikeStatus::Stolen;
            entry.bike.updated_at = Utc::now();
        }

        Ok(report)
    }

    async fn create_find(&self, input: NewFind) -> Result<Find, StoreError> {
        self.require_bike(input.bike_id)?;

        let find = Find {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            bike_id: input.bike_id,
            note: input.note,
            found_date: input.found_date,
            created_at: Utc::now(),
        };
        self.finds
            .entry(input.bike_id)
            .or_default()
            .push(find.clone());
        Ok(find)
    }
}
