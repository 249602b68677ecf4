//! Store selection shared by the commands that touch bike data.

use std::sync::Arc;

use anyhow::{Context, Result};
use pyoravahti_core::{BikeStore, InMemoryBikeStore, PostgresBikeStore};
use tracing::{info, warn};

const MAX_CONNECTIONS: u32 = 5;
const MIN_CONNECTIONS: u32 = 1;

/// PostgreSQL when `DATABASE_URL` is set, otherwise an empty in-memory store.
pub async fn open_store() -> Result<Arc<dyn BikeStore>> {
    match std::env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()) {
        Some(url) => {
            let store = PostgresBikeStore::connect(&url, MAX_CONNECTIONS, MIN_CONNECTIONS)
                .await
                .context("Failed to connect to the database")?;
            info!("Connected to PostgreSQL");
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, working on an empty in-memory store");
            Ok(Arc::new(InMemoryBikeStore::new()))
        }
    }
}
