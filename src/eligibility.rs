//! Per-file gating before dispatch.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. upload flag `uploaded/<basename>.uploaded` exists (logged when absent)
//! 2. no `.done` / `.error` / `.process` marker exists (silent)
//! 3. metadata reports a known run id and at least one MS2 spectrum (silent)

use mgf_common::{MarkerKind, MetadataLookup, MetadataStatus, RunMetadata, UNKNOWN_RUN_ID};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::OrchestratorError;
use crate::scanner::ScannedFile;

/// Why a file was or was not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Eligible,
    NotUploaded,
    AlreadyHandled(MarkerKind),
    MetadataUnready(MetadataStatus),
}

impl Verdict {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Verdict::Eligible)
    }
}

pub struct EligibilityFilter {
    work_dir: PathBuf,
    upload_dir: PathBuf,
    lookup: Arc<dyn MetadataLookup>,
}

impl EligibilityFilter {
    pub fn new(work_dir: &Path, upload_dir: &Path, lookup: Arc<dyn MetadataLookup>) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            upload_dir: upload_dir.to_path_buf(),
            lookup,
        }
    }

    pub fn upload_flag(&self, basename: &str) -> PathBuf {
        self.upload_dir.join(format!("{}.uploaded", basename))
    }

    /// First marker found for `basename`, if any.
    pub fn existing_marker(&self, basename: &str) -> Option<MarkerKind> {
        MarkerKind::ALL
            .into_iter()
            .find(|kind| kind.path_in(&self.work_dir, basename).is_file())
    }

    /// Run-id first; the spectrum count is only queried for known runs.
    async fn metadata(&self, basename: &str) -> Result<RunMetadata, OrchestratorError> {
        let to_err = |source| OrchestratorError::Metadata {
            basename: basename.to_string(),
            source,
        };
        let run_id = self.lookup.run_id(basename).await.map_err(to_err)?;
        if run_id == UNKNOWN_RUN_ID {
            return Ok(RunMetadata {
                run_id,
                ms2_count: 0,
            });
        }
        let ms2_count = self.lookup.ms2_count(basename).await.map_err(to_err)?;
        Ok(RunMetadata { run_id, ms2_count })
    }

    pub async fn check(&self, file: &ScannedFile) -> Result<Verdict, OrchestratorError> {
        if !self.upload_flag(&file.basename).is_file() {
            tracing::info!("Upload flag file not found for: {}, skipping.", file.basename);
            return Ok(Verdict::NotUploaded);
        }

        if let Some(kind) = self.existing_marker(&file.basename) {
            return Ok(Verdict::AlreadyHandled(kind));
        }

        match self.metadata(&file.basename).await?.status() {
            MetadataStatus::Ready => Ok(Verdict::Eligible),
            status => Ok(Verdict::MetadataUnready(status)),
        }
    }
}
