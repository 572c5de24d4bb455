//! Enumerates measurement files under a category root.
//!
//! Layout is fixed at two levels: `<root>/<run folder>/<file>`. Entries that
//! are not directories at the first level, or not files at the second, are
//! ignored. Dangling or looping symlinks below the root count as neither and
//! are ignored too. Nothing deeper is visited.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::OrchestratorError;

/// A file found inside a run folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub run_folder: PathBuf,
    pub path: PathBuf,
    /// File name, the key for sentinels and metadata lookups.
    pub basename: String,
}

/// Lazily walk `root`. Order follows the filesystem; callers must not rely on it.
///
/// An unreadable root or run folder is yielded as an error item.
pub fn scan(root: &Path) -> impl Iterator<Item = Result<ScannedFile, OrchestratorError>> {
    let root_path = root.to_path_buf();
    WalkDir::new(root)
        .min_depth(2)
        .max_depth(2)
        .follow_links(true)
        .into_iter()
        .filter_map(move |entry| match entry {
            Ok(entry) if entry.file_type().is_file() => {
                let path = entry.into_path();
                let run_folder = path.parent()?.to_path_buf();
                let basename = path.file_name()?.to_string_lossy().into_owned();
                Some(Ok(ScannedFile {
                    run_folder,
                    path,
                    basename,
                }))
            }
            Ok(_) => None,
            Err(source) if is_broken_link(&source) => {
                tracing::debug!("Ignoring broken link: {}", source);
                None
            }
            Err(source) => Some(Err(OrchestratorError::ScanFailed {
                path: source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root_path.clone()),
                source,
            })),
        })
}

/// A symlink below the root whose target is gone or loops back.
fn is_broken_link(err: &walkdir::Error) -> bool {
    if err.depth() == 0 {
        return false;
    }
    err.loop_ancestor().is_some()
        || err
            .io_error()
            .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound)
}
