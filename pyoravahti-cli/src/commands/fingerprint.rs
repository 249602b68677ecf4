//! Photo fingerprint commands: `phash` and `compare`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use pyoravahti_core::{confidence_from_distance, hamming_distance, PerceptualHasher, MAX_PHASH_DISTANCE};
use serde_json::json;
use tracing::debug;

fn fingerprint_file(path: &Path) -> Result<String> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    debug!(path = %path.display(), bytes = data.len(), "Read image");

    PerceptualHasher::new()
        .hash_bytes(&data)
        .with_context(|| format!("Failed to fingerprint {}", path.display()))
}

/// Execute the phash command.
pub fn execute_phash(file: PathBuf, json: bool) -> Result<()> {
    let phash = fingerprint_file(&file)?;

    if json {
        let out = json!({ "file": file.display().to_string(), "phash": phash });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", phash);
    }
    Ok(())
}

/// Execute the compare command.
pub fn execute_compare(first: PathBuf, second: PathBuf, json: bool, quiet: bool) -> Result<()> {
    let a = fingerprint_file(&first)?;
    let b = fingerprint_file(&second)?;

    // Both come from the same hasher, so the lengths always agree
    let distance = hamming_distance(&a, &b)
        .with_context(|| format!("Fingerprints have different lengths: {} vs {}", a, b))?;
    let similar = distance <= MAX_PHASH_DISTANCE;
    let similarity = confidence_from_distance(distance);

    if json {
        let out = json!({
            "first": { "file": first.display().to_string(), "phash": a },
            "second": { "file": second.display().to_string(), "phash": b },
            "distance": distance,
            "similarity": similarity,
            "similar": similar,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if quiet {
        println!("{}", distance);
        return Ok(());
    }

    println!();
    println!("   {} {}  {}", "A:".dimmed(), a, first.display());
    println!("   {} {}  {}", "B:".dimmed(), b, second.display());
    println!("   {} {}", "Distance:".dimmed(), distance);
    println!("   {} {}%", "Similarity:".dimmed(), similarity);
    if similar {
        println!("   {}", "Likely the same bike photo".green().bold());
    } else {
        println!("   {}", "Different photos".yellow());
    }
    Ok(())
}
