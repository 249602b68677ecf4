//! Pyörävahti Core - bicycle matching and duplicate detection
//!
//! This crate holds the domain model and the matching engine behind the
//! Pyörävahti lost-and-found service for bicycles.
//!
//! # Features
//!
//! - Cross-status matching of lost/stolen bikes against found and for-sale
//!   bikes by serial number, photo fingerprint and keywords
//! - Duplicate detection for search results
//! - Pluggable storage behind the [`BikeStore`] trait, with in-memory and
//!   PostgreSQL (`postgres` feature) implementations
//! - Blockhash photo fingerprints (`perceptual-hash` feature)
//! - Import of external marketplace listings
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pyoravahti_core::{BikeMatcher, BikeStatus, BikeStore, InMemoryBikeStore, NewBike};
//!
//! # async fn example() -> pyoravahti_core::Result<()> {
//! let store = Arc::new(InMemoryBikeStore::new());
//!
//! let lost = store
//!     .create_bike(NewBike {
//!         serial_number: Some("WTU123".into()),
//!         status: Some(BikeStatus::Lost),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! let matcher = BikeMatcher::new(store.clone());
//! let matches = matcher.find_matches(lost.id).await?;
//! # Ok(())
//! # }
//! ```

pub mod bike;
pub mod duplicates;
pub mod error;
pub mod external;
pub mod matcher;
pub mod moderation;
#[cfg(feature = "perceptual-hash")]
pub mod phash;
pub mod similarity;
pub mod statistics;
pub mod store;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use bike::{
    Bike, BikeDetails, BikeFilter, BikeImage, BikeListing, BikeStatus, BikeUpdate, Find, NewBike,
    NewFind, NewReport, Report, SearchFilters, DEFAULT_SEARCH_LIMIT,
};
pub use duplicates::{BikeWithDuplicates, DuplicateBike, DuplicateDetector};
pub use error::{Error, Result};
pub use external::{
    extract_bike_info, ExternalListing, ExternalListingSync, ListingSource, MockToriAdapter,
    SyncSummary,
};
pub use matcher::{BikeMatcher, Match, MatchType, RecomputeSummary};
pub use moderation::Rejection;
pub use similarity::{confidence_from_distance, hamming_distance, MAX_PHASH_DISTANCE};
pub use statistics::{get_statistics, Statistics};
pub use store::{BikeQuery, BikeStore, InMemoryBikeStore, StoreError};

#[cfg(feature = "postgres")]
pub use store::PostgresBikeStore;

#[cfg(feature = "perceptual-hash")]
pub use phash::{compute_phash, PerceptualHasher};
