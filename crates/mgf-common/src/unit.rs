use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::marker::MarkerKind;

/// One eligible measurement file bound to everything a unit needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitJob {
    pub file: PathBuf,
    pub basename: String,
    pub tagged: bool,
    pub work_dir: PathBuf,
}

/// What a finished unit reports back to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOutcome {
    pub basename: String,
    /// Terminal marker the unit left behind.
    pub marker: MarkerKind,
    pub duration: Duration,
}

impl UnitOutcome {
    pub fn succeeded(&self) -> bool {
        self.marker == MarkerKind::Done
    }
}

/// The external transformation applied to each eligible file.
///
/// A unit is expected to leave exactly one terminal marker for the job's
/// basename and report which one it wrote.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, job: UnitJob) -> Result<UnitOutcome>;
}
