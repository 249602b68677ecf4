//! External marketplace listings.
//!
//! Bikes listed for sale elsewhere are imported as `FOR_SALE_EXTERNAL` bikes
//! so the matcher can compare them against lost and stolen reports. A
//! [`ListingSource`] fetches raw listings; [`ExternalListingSync`] turns them
//! into bikes and upserts them by listing URL.
//!
//! Only a mock Tori.fi adapter ships today. It returns a fixed set of
//! listings and never touches the network.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::bike::{BikeStatus, BikeUpdate, NewBike};
use crate::error::{Error, Result};
use crate::store::BikeStore;

/// Source name recorded on bikes imported from Tori.fi.
pub const TORI_SOURCE: &str = "tori.fi";

const KNOWN_BRANDS: &[&str] = &["trek", "giant", "specialized", "cannondale", "scott"];
const KNOWN_COLORS: &[&str] = &[
    "sininen",
    "punainen",
    "vihreä",
    "musta",
    "valkoinen",
    "harmaa",
    "keltainen",
];
const KNOWN_MODELS: &[&str] = &[
    "hybridipyörä",
    "kaupunkipyörä",
    "polkupyörä",
    "maastopyörä",
    "lastenpyörä",
];

/// A raw listing as scraped from a marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ExternalListing {
    pub title: String,
    /// Asking price in euros
    pub price: u32,
    pub city: Option<String>,
    pub url: String,
    pub image: Option<String>,
    pub extracted_at: DateTime<Utc>,
}

/// Bike attributes recognised in a listing title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedBikeInfo {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn find_keyword<'a>(title: &str, keywords: &[&'a str]) -> Option<&'a str> {
    keywords.iter().copied().find(|k| title.contains(k))
}

/// Pick brand, model keyword and colour out of a free-form title.
///
/// Brand and colour are capitalised; the model keyword is returned as found.
pub fn extract_bike_info(title: &str) -> ExtractedBikeInfo {
    let lower = title.to_lowercase();
    ExtractedBikeInfo {
        brand: find_keyword(&lower, KNOWN_BRANDS).map(capitalize),
        model: find_keyword(&lower, KNOWN_MODELS).map(String::from),
        color: find_keyword(&lower, KNOWN_COLORS).map(capitalize),
    }
}

/// Build the bike record for a listing.
pub fn listing_to_new_bike(listing: &ExternalListing, source: &str) -> NewBike {
    let info = extract_bike_info(&listing.title);
    NewBike {
        brand: info.brand,
        model: info.model,
        color: info.color,
        status: Some(BikeStatus::ForSaleExternal),
        city: listing.city.clone(),
        source: Some(source.to_string()),
        source_url: Some(listing.url.clone()),
        created_at: Some(listing.extracted_at),
        ..Default::default()
    }
}

/// A marketplace that can be polled for bike listings.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Name recorded as the `source` of imported bikes.
    fn name(&self) -> &'static str;

    async fn fetch_listings(&self) -> Result<Vec<ExternalListing>>;
}

/// Tori.fi adapter backed by fixed sample listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockToriAdapter;

impl MockToriAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn listing_date(year: i32, month: u32, day: u32) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .ok_or_else(|| Error::ListingSource(format!("invalid date {}-{}-{}", year, month, day)))
}

#[async_trait]
impl ListingSource for MockToriAdapter {
    fn name(&self) -> &'static str {
        TORI_SOURCE
    }

    async fn fetch_listings(&self) -> Result<Vec<ExternalListing>> {
        Ok(vec![
            ExternalListing {
                title: "Miesten hybridipyörä, sininen, hyvä kunto".into(),
                price: 350,
                city: Some("Helsinki".into()),
                url: "https://example.com/listing/1".into(),
                image: Some("/images/bike1.jpg".into()),
                extracted_at: listing_date(2023, 6, 15)?,
            },
            ExternalListing {
                title: "Naisten kaupunkipyörä, Punainen, Kolmen vaihteinen".into(),
                price: 200,
                city: Some("Espoo".into()),
                url: "https://example.com/listing/2".into(),
                image: Some("/images/bike2.jpg".into()),
                extracted_at: listing_date(2023, 6, 14)?,
            },
            ExternalListing {
                title: "Lasten polkupyörä, 16 tuumaa, sininen ja valkoinen".into(),
                price: 120,
                city: Some("Vantaa".into()),
                url: "https://example.com/listing/3".into(),
                image: Some("/images/bike3.jpg".into()),
                extracted_at: listing_date(2023, 6, 13)?,
            },
        ])
    }
}

/// Counts from one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub enabled: bool,
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Imports listings from a source into the bike store.
#[derive(Clone)]
pub struct ExternalListingSync {
    source: Arc<dyn ListingSource>,
    store: Arc<dyn BikeStore>,
    enabled: bool,
}

impl ExternalListingSync {
    pub fn new(source: Arc<dyn ListingSource>, store: Arc<dyn BikeStore>, enabled: bool) -> Self {
        Self {
            source,
            store,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current listings, or nothing when the adapter is disabled.
    pub async fn fetch(&self) -> Result<Vec<ExternalListing>> {
        if !self.enabled {
            tracing::info!(source = self.source.name(), "Listing adapter is disabled");
            return Ok(Vec::new());
        }
        self.source.fetch_listings().await
    }

    /// Fetch listings and upsert them as for-sale bikes.
    ///
    /// Existing bikes (same listing URL) get brand, model, colour and city
    /// refreshed. A failing listing is logged and counted, the rest still
    /// go through.
    pub async fn sync(&self) -> Result<SyncSummary> {
        if !self.enabled {
            tracing::info!(source = self.source.name(), "Listing adapter is disabled, skipping sync");
            return Ok(SyncSummary::default());
        }

        let listings = self.source.fetch_listings().await?;
        let mut summary = SyncSummary {
            enabled: true,
            fetched: listings.len(),
            ..Default::default()
        };
        tracing::info!(source = self.source.name(), count = listings.len(), "Fetched listings");

        for listing in &listings {
            match self.upsert(listing).await {
                Ok(true) => summary.created += 1,
                Ok(false) => summary.updated += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(url = %listing.url, error = %e, "Failed to import listing");
                }
            }
        }

        tracing::info!(
            created = summary.created,
            updated = summary.updated,
            failed = summary.failed,
            "Listing sync finished"
        );

        Ok(summary)
    }

    /// Returns `true` when a new bike was created.
    async fn upsert(&self, listing: &ExternalListing) -> Result<bool> {
        let new_bike = listing_to_new_bike(listing, self.source.name());

        let existing = self
            .store
            .find_by_source_url(&listing.url, BikeStatus::ForSaleExternal)
            .await?;

        match existing {
            Some(bike) => {
                let update = BikeUpdate {
                    brand: new_bike.brand,
                    model: new_bike.model,
                    color: new_bike.color,
                    city: new_bike.city,
                    ..Default::default()
                };
                self.store.update_bike(bike.id, update).await?;
                Ok(false)
            }
            None => {
                let bike = self.store.create_bike(new_bike).await?;
                if let Some(image) = &listing.image {
                    self.store.add_image(bike.id, image.clone()).await?;
                }
                Ok(true)
            }
        }
    }
}

impl std::fmt::Debug for ExternalListingSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalListingSync")
            .field("source", &self.source.name())
            .field("enabled", &self.enabled)
            .finish()
    }
}
