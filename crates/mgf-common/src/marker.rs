use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sentinel written next to the working directory root once a file has been
/// picked up. Any of the three excludes the file from further dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Done,
    Error,
    /// Unit is in flight.
    Process,
}

impl MarkerKind {
    pub const ALL: [MarkerKind; 3] = [MarkerKind::Done, MarkerKind::Error, MarkerKind::Process];

    pub fn extension(self) -> &'static str {
        match self {
            MarkerKind::Done => "done",
            MarkerKind::Error => "error",
            MarkerKind::Process => "process",
        }
    }

    /// `<work_dir>/<basename>.<ext>`
    pub fn path_in(self, work_dir: &Path, basename: &str) -> PathBuf {
        work_dir.join(format!("{}.{}", basename, self.extension()))
    }

    /// Whether this marker ends a unit's lifecycle.
    pub fn is_terminal(self) -> bool {
        !matches!(self, MarkerKind::Process)
    }
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
