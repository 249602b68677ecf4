//! Duplicate detection for search results.
//!
//! Where the matcher looks for the *other half* of a lost/found pair, this
//! module looks for the *same record entered twice*: two marketplace listings
//! of one bike, or a user submitting the same stolen bike again. Status is
//! therefore ignored here.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;
use uuid::Uuid;

use crate::bike::{Bike, BikeImage, BikeListing, SearchFilters};
use crate::error::{Error, Result};
use crate::similarity::{confidence_from_distance, similar_distance};
use crate::store::{BikeQuery, BikeStore, StoreError};

/// Another record that appears to describe the same bike.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DuplicateBike {
    #[serde(flatten)]
    pub bike: Bike,
    /// First image of the duplicate, if any
    pub image: Option<BikeImage>,
    /// Fingerprint distance, set for visual duplicates only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
    /// `100 - 10 * distance`, set for visual duplicates only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<u8>,
}

/// A search result annotated with its duplicates.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct BikeWithDuplicates {
    #[serde(flatten)]
    pub bike: Bike,
    pub images: Vec<BikeImage>,
    pub is_duplicate: bool,
    /// Always present, empty when the bike is unique
    pub duplicates: Vec<DuplicateBike>,
}

/// Search front end that flags probable duplicates.
#[derive(Clone)]
pub struct DuplicateDetector {
    store: Arc<dyn BikeStore>,
}

impl DuplicateDetector {
    pub fn new(store: Arc<dyn BikeStore>) -> Self {
        Self { store }
    }

    /// Filtered search, newest first, capped at the filter limit (default 50).
    pub async fn search_bikes(&self, filters: &SearchFilters) -> Result<Vec<BikeListing>> {
        Ok(self.store.find_listings(&BikeQuery::from(filters)).await?)
    }

    /// Duplicates of a stored bike. An unknown id has no duplicates.
    pub async fn find_duplicates(&self, bike_id: Uuid) -> Result<Vec<DuplicateBike>> {
        match self.store.get_bike(bike_id).await? {
            Some(bike) => Ok(self.duplicates_of(&bike).await?),
            None => Ok(Vec::new()),
        }
    }

    /// Run the search and annotate every result with its duplicates.
    ///
    /// Lookups run concurrently but results keep the search order. Any store
    /// failure fails the whole batch.
    pub async fn with_duplicates(&self, filters: &SearchFilters) -> Result<Vec<BikeWithDuplicates>> {
        let listings = self
            .store
            .find_listings(&BikeQuery::from(filters))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Search failed");
                Error::DuplicateLookup(e)
            })?;

        let annotated = try_join_all(listings.into_iter().map(|listing| async move {
            let duplicates = self.duplicates_of(&listing.bike).await?;
            Ok::<_, StoreError>(BikeWithDuplicates {
                is_duplicate: !duplicates.is_empty(),
                bike: listing.bike,
                images: listing.images,
                duplicates,
            })
        }))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Duplicate lookup failed");
            Error::DuplicateLookup(e)
        })?;

        tracing::debug!(
            results = annotated.len(),
            flagged = annotated.iter().filter(|b| b.is_duplicate).count(),
            "Annotated search results with duplicates"
        );

        Ok(annotated)
    }

    async fn duplicates_of(&self, bike: &Bike) -> std::result::Result<Vec<DuplicateBike>, StoreError> {
        let mut duplicates = Vec::new();

        if let Some(serial) = bike.serial() {
            let query = BikeQuery {
                exclude_id: Some(bike.id),
                ..BikeQuery::default().with_serial_number(serial)
            };
            for other in self.store.find_bikes(&query).await? {
                duplicates.push(self.entry(other, None).await?);
            }
        }

        if let Some(fingerprint) = bike.fingerprint() {
            let query = BikeQuery {
                exclude_id: Some(bike.id),
                ..BikeQuery::default().with_phash()
            };
            let mut similar: Vec<(u32, Bike)> = self
                .store
                .find_bikes(&query)
                .await?
                .into_iter()
                .filter_map(|other| {
                    let distance = similar_distance(fingerprint, other.fingerprint()?)?;
                    Some((distance, other))
                })
                .collect();
            similar.sort_by_key(|(distance, _)| *distance);

            for (distance, other) in similar {
                duplicates.push(self.entry(other, Some(distance)).await?);
            }
        }

        let mut seen = HashSet::new();
        duplicates.retain(|d| seen.insert(d.bike.id));
        Ok(duplicates)
    }

    async fn entry(
        &self,
        bike: Bike,
        distance: Option<u32>,
    ) -> std::result::Result<DuplicateBike, StoreError> {
        let image = self.store.images_for(bike.id, Some(1)).await?.into_iter().next();
        Ok(DuplicateBike {
            bike,
            image,
            distance,
            similarity: distance.map(confidence_from_distance),
        })
    }
}

impl std::fmt::Debug for DuplicateDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateDetector")
            .field("store", &self.store.backend())
            .finish()
    }
}
