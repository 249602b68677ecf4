//! Subcommand implementations.

pub mod fetch_for_sale;
pub mod fingerprint;
pub mod recompute;
