//! Exit codes following sysexits.h conventions.
//!
//! Scripts and cron jobs can tell a bad input file from an unreachable
//! database without parsing the error text.

use std::io;

use pyoravahti_core::{Error as CoreError, StoreError};

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Input data is not a usable image.
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Database or listing source unavailable.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const UNAVAILABLE: i32 = 69;

/// Represents an exit code with its error message.
pub struct ExitCode {
    pub code: i32,
    pub message: String,
}

fn classify(cause: &(dyn std::error::Error + 'static)) -> Option<i32> {
    if cause.downcast_ref::<io::Error>().is_some() {
        return Some(INPUT_ERROR);
    }
    if let Some(store) = cause.downcast_ref::<StoreError>() {
        return matches!(store, StoreError::Connection(_) | StoreError::Migration(_))
            .then_some(UNAVAILABLE);
    }
    match cause.downcast_ref::<CoreError>()? {
        CoreError::PerceptualHash(_) => Some(DATA_ERROR),
        CoreError::ListingSource(_) => Some(UNAVAILABLE),
        CoreError::Store(StoreError::Connection(_)) => Some(UNAVAILABLE),
        _ => None,
    }
}

impl ExitCode {
    /// Classify an error by the first recognised cause in its chain.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let code = err.chain().find_map(classify).unwrap_or(GENERAL_ERROR);

        Self {
            code,
            message: format!("{err:#}"),
        }
    }
}
