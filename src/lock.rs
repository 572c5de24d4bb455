//! Single-instance guard for a working directory.
//!
//! The lock is a plain marker file. It is created with an exclusive create so
//! two launches racing on the same directory cannot both succeed, and it is
//! only removed by [`RunLock::release`]. Dropping a `RunLock` leaves the file
//! in place: a run that fails keeps its directory locked until an operator
//! removes the marker.

use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::LOCK_FILE_NAME;
use crate::errors::OrchestratorError;

/// True iff the lock marker exists in `work_dir`.
pub fn is_locked(work_dir: &Path) -> bool {
    work_dir.join(LOCK_FILE_NAME).is_file()
}

/// A held run lock.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Create the lock marker in `work_dir`.
    pub fn acquire(work_dir: &Path) -> Result<Self, OrchestratorError> {
        let path = work_dir.join(LOCK_FILE_NAME);
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(mut file) => {
                // Informational only; existence is what counts.
                let payload = format!(
                    "{{\"pid\":{},\"acquired_at\":\"{}\"}}\n",
                    std::process::id(),
                    Utc::now().to_rfc3339()
                );
                if let Err(e) = file.write_all(payload.as_bytes()) {
                    tracing::warn!("Failed to write lock details to {}: {}", path.display(), e);
                }
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(OrchestratorError::LockHeld { path })
            }
            Err(source) => Err(OrchestratorError::LockCreateFailed { path, source }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the marker, consuming the lock.
    pub fn release(self) -> Result<(), OrchestratorError> {
        fs::remove_file(&self.path).map_err(|source| OrchestratorError::LockReleaseFailed {
            path: self.path.clone(),
            source,
        })
    }
}
