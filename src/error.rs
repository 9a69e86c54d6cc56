//! Error types for the fipscan scanning engine.
//!
//! Scan-level failures (`ScanError`) abort the whole invocation. Per-candidate
//! failures (`CheckError`) are recorded on that candidate's report and never
//! surface as an `Err` from a scan.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scan root is missing or unreadable
    #[error("Cannot scan root {path:?}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cancellation signal fired; all results were discarded
    #[error("Scan cancelled")]
    Cancelled,

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The directory walk could not run to completion
    #[error("Walk error: {0}")]
    Walk(String),
}

/// Result type alias for scan operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Failure isolated to a single candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum CheckError {
    /// Embedded provenance is unreadable or malformed
    #[error("Failed to read build info: {0}")]
    Extraction(String),

    /// The candidate could not be started as a subprocess
    #[error("Runtime probe could not start: {0}")]
    Probe(String),

    /// The check task ended without producing a report
    #[error("Check task failed: {0}")]
    TaskFailed(String),
}
