//! Import marketplace listings as for-sale bikes.

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use pyoravahti_core::{ExternalListingSync, MockToriAdapter};
use tracing::info;

use crate::store::open_store;

/// Whether the adapter is switched on in the environment.
fn adapter_enabled_in_env() -> bool {
    std::env::var("ENABLE_TORI_ADAPTER")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}

/// Execute the fetch-for-sale command.
pub async fn execute(disabled: bool, json: bool, quiet: bool) -> Result<()> {
    let enabled = !disabled && adapter_enabled_in_env();
    let store = open_store().await?;

    let sync = ExternalListingSync::new(Arc::new(MockToriAdapter::new()), store, enabled);
    let summary = sync.sync().await.context("Listing import failed")?;

    info!(
        enabled = summary.enabled,
        fetched = summary.fetched,
        created = summary.created,
        updated = summary.updated,
        failed = summary.failed,
        "Import finished"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if !quiet {
        if !summary.enabled {
            println!("{} Listing adapter is disabled, nothing imported", "-".yellow());
            return Ok(());
        }
        println!();
        println!("{}", "Listing import".green().bold());
        println!("   {} {}", "Fetched:".dimmed(), summary.fetched);
        println!("   {} {}", "Created:".dimmed(), summary.created.to_string().green());
        println!("   {} {}", "Updated:".dimmed(), summary.updated);
        if summary.failed > 0 {
            println!("   {} {}", "Failed:".dimmed(), summary.failed.to_string().red());
        }
    }

    Ok(())
}
