use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Bike not found: {0}")]
    BikeNotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to get bikes with duplicates: {0}")]
    DuplicateLookup(#[source] StoreError),

    #[error("Perceptual hash error: {0}")]
    PerceptualHash(String),

    #[error("Invalid bike status: {0}")]
    InvalidStatus(String),

    #[error("Listing source error: {0}")]
    ListingSource(String),
}

pub type Result<T> = std::result::Result<T, Error>;
