//! Typed errors for the orchestrator.
//!
//! `OrchestratorError` covers every failure that aborts a run. Skips decided
//! by the eligibility filter and interrupted drains are not errors; they are
//! reported through `Verdict` and `CategoryReport` instead.

use mgf_common::Category;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Lock file exists: {path}")]
    LockHeld { path: PathBuf },

    #[error("Failed to create lock file at {path}: {source}")]
    LockCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete lock file at {path}: {source}")]
    LockReleaseFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No root folder configured for category {category}")]
    CategoryRootMissing { category: Category },

    #[error("Failed to scan {path}: {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Metadata lookup failed for {basename}: {source}")]
    Metadata {
        basename: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to open log file at {path}: {source}")]
    LogFileFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
