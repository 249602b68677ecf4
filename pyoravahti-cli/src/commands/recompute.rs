//! Batch match recompute for recently added bikes.

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use colored::Colorize;
use pyoravahti_core::BikeMatcher;

use crate::store::open_store;

/// Execute the recompute-matches command.
pub async fn execute(hours: i64, json: bool, quiet: bool) -> Result<()> {
    if hours <= 0 {
        bail!("--hours must be positive, got {}", hours);
    }

    let since = Utc::now() - Duration::hours(hours);
    let matcher = BikeMatcher::new(open_store().await?);
    let summary = matcher
        .recompute_since(since)
        .await
        .context("Match recompute failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if !quiet {
        println!();
        println!("{}", "Match recompute".green().bold());
        println!(
            "   {} {}",
            "Since:".dimmed(),
            since.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!("   {} {}", "Bikes:".dimmed(), summary.bikes_processed);
        println!("   {} {}", "Matches:".dimmed(), summary.matches_found.to_string().green());
        if summary.failures > 0 {
            println!("   {} {}", "Failures:".dimmed(), summary.failures.to_string().red());
        }
    }

    Ok(())
}
