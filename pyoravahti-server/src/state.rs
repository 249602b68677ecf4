//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use pyoravahti_core::{
    BikeMatcher, BikeStore, DuplicateDetector, ExternalListingSync, InMemoryBikeStore,
    MockToriAdapter, PostgresBikeStore, StoreError,
};

use crate::config::Config;
use crate::notify::{LogNotifier, Notifier};
use crate::rate_limit::ReportRateLimiter;
use crate::storage::ImageStorage;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Bike store shared by every component below
    pub store: Arc<dyn BikeStore>,
    /// Match finder for the bike detail view
    pub matcher: Arc<BikeMatcher>,
    /// Duplicate-aware search
    pub detector: Arc<DuplicateDetector>,
    /// External marketplace import
    pub listings: Arc<ExternalListingSync>,
    /// Per-client limit on report submissions
    pub report_limiter: Arc<ReportRateLimiter>,
    /// Uploaded photo storage
    pub images: Arc<ImageStorage>,
    /// Admin notification channel
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire all components around an existing store.
    pub fn new(store: Arc<dyn BikeStore>, config: Config) -> Self {
        let listings = ExternalListingSync::new(
            Arc::new(MockToriAdapter::new()),
            store.clone(),
            config.enable_tori_adapter,
        );

        Self {
            matcher: Arc::new(BikeMatcher::new(store.clone())),
            detector: Arc::new(DuplicateDetector::new(store.clone())),
            listings: Arc::new(listings),
            report_limiter: Arc::new(ReportRateLimiter::new(
                config.report_rate_limit,
                config.report_rate_window(),
            )),
            images: Arc::new(ImageStorage::new(config.upload_dir.clone())),
            notifier: Arc::new(LogNotifier),
            store,
            config: Arc::new(config),
        }
    }

    /// State backed by a fresh in-memory store
    pub fn in_memory(config: Config) -> Self {
        Self::new(Arc::new(InMemoryBikeStore::new()), config)
    }

    /// Connect to PostgreSQL when `DATABASE_URL` is configured, otherwise
    /// fall back to the in-memory store.
    pub async fn connect(config: Config) -> Result<Self, StoreError> {
        match config.database_url.as_deref() {
            Some(url) => {
                let store = PostgresBikeStore::connect(
                    url,
                    config.database_max_connections,
                    config.database_min_connections,
                )
                .await?;
                Ok(Self::new(Arc::new(store), config))
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory bike store");
                Ok(Self::in_memory(config))
            }
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}
