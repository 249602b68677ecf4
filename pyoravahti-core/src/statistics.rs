//! Home page counters.

use chrono::{Duration, Utc};
use serde::Serialize;

use crate::bike::BikeStatus;
use crate::store::{BikeQuery, BikeStore, StoreError};

/// Window for the "new this week" counters.
const RECENT_DAYS: i64 = 7;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub lost_stolen_count: u64,
    pub found_count: u64,
    /// No match history is kept, so this is always 0
    pub matches_this_week: u64,
    /// For-sale listings imported during the last week
    pub for_sale_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn count_all(store: &dyn BikeStore) -> Result<Statistics, StoreError> {
    let lost_stolen_count = store
        .count_bikes(&BikeQuery {
            statuses: vec![BikeStatus::Lost, BikeStatus::Stolen],
            ..Default::default()
        })
        .await?;

    let found_count = store
        .count_bikes(&BikeQuery {
            statuses: vec![BikeStatus::Found],
            ..Default::default()
        })
        .await?;

    let for_sale_count = store
        .count_bikes(&BikeQuery {
            statuses: vec![BikeStatus::ForSaleExternal],
            created_after: Some(Utc::now() - Duration::days(RECENT_DAYS)),
            ..Default::default()
        })
        .await?;

    Ok(Statistics {
        lost_stolen_count,
        found_count,
        matches_this_week: 0,
        for_sale_count,
        error: None,
    })
}

/// Gather the counters. Never fails: a store error yields zeroed counters
/// with `error` set.
pub async fn get_statistics(store: &dyn BikeStore) -> Statistics {
    match count_all(store).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch statistics");
            Statistics {
                error: Some("Failed to fetch statistics".into()),
                ..Default::default()
            }
        }
    }
}
