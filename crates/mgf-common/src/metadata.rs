use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// `run_id` value meaning the database does not know the file yet.
pub const UNKNOWN_RUN_ID: i64 = -1;

/// Database-side view of a measurement file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: i64,
    pub ms2_count: i64,
}

/// Readiness of a file according to its metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataStatus {
    Ready,
    UnknownRun,
    NoSpectra,
}

impl RunMetadata {
    pub fn status(&self) -> MetadataStatus {
        if self.run_id == UNKNOWN_RUN_ID {
            MetadataStatus::UnknownRun
        } else if self.ms2_count <= 0 {
            MetadataStatus::NoSpectra
        } else {
            MetadataStatus::Ready
        }
    }
}

/// Lookups keyed by file basename.
///
/// Implementations return [`UNKNOWN_RUN_ID`] / `0` for files they have no
/// record of; `Err` is reserved for the store itself failing.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn run_id(&self, basename: &str) -> Result<i64>;

    async fn ms2_count(&self, basename: &str) -> Result<i64>;
}
