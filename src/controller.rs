//! Run controller: one invocation over the four categories.
//!
//! Sequence:
//!
//! 1. stop if the working directory is locked (no log file, no scans)
//! 2. open the run log and take the lock
//! 3. scan → filter → dispatch each category in [`Category::ALL`] order
//! 4. release the lock; drop the run log if nothing was dispatched
//!
//! Any error in step 3 or 4 ends the run early and keeps both the lock and
//! the log for an operator to inspect.

use anyhow::{Context, Result};
use futures::{StreamExt, TryStreamExt, stream};
use mgf_common::{Category, MetadataLookup, Processor, UnitJob};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument::WithSubscriber;

use crate::config::{Config, POOL_CAPACITY};
use crate::dispatcher::{self, InterruptSignal, WorkerPool};
use crate::eligibility::EligibilityFilter;
use crate::errors::OrchestratorError;
use crate::lock::{self, RunLock};
use crate::logging::{RunLog, date_time_tag};
use crate::report::{CategoryReport, RunSummary};
use crate::scanner;

/// How an invocation ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Another run holds the lock; nothing was touched.
    Blocked,
    Completed(RunSummary),
    /// Lock and log file were left in place.
    Failed(anyhow::Error),
}

impl RunOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, RunOutcome::Failed(_))
    }
}

pub struct RunController {
    config: Config,
    filter: EligibilityFilter,
    processor: Arc<dyn Processor>,
    interrupt: InterruptSignal,
    log_tag: String,
}

impl RunController {
    pub fn new(
        config: Config,
        lookup: Arc<dyn MetadataLookup>,
        processor: Arc<dyn Processor>,
    ) -> Self {
        let filter = EligibilityFilter::new(&config.work_dir, &config.upload_dir, lookup);
        Self {
            config,
            filter,
            processor,
            interrupt: dispatcher::never(),
            log_tag: date_time_tag(),
        }
    }

    /// Signal that abandons a category's drain. Defaults to one that never fires.
    pub fn with_interrupt(mut self, interrupt: InterruptSignal) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn with_log_tag(mut self, tag: impl Into<String>) -> Self {
        self.log_tag = tag.into();
        self
    }

    pub fn log_file(&self) -> PathBuf {
        self.config.log_file(&self.log_tag)
    }

    pub async fn run(&self) -> RunOutcome {
        if lock::is_locked(&self.config.work_dir) {
            tracing::info!(
                "Lock file exists: {}. Program stopped.",
                self.config.lock_file.display()
            );
            return RunOutcome::Blocked;
        }

        let log = match RunLog::open(self.log_file(), &self.config.toml.logging) {
            Ok(log) => log,
            Err(e) => {
                tracing::error!("MGF Offset failed! Error: {}", e);
                return RunOutcome::Failed(e.into());
            }
        };

        let dispatch = log.dispatch().clone();
        let result = self.run_logged().with_subscriber(dispatch).await;
        let log_path = log.close();

        match result {
            Ok(Some(summary)) => {
                if summary.no_work {
                    discard_log(&log_path);
                }
                RunOutcome::Completed(summary)
            }
            Ok(None) => {
                // Lost the lock race after opening our log; nothing of ours to keep.
                discard_log(&log_path);
                RunOutcome::Blocked
            }
            Err(e) => RunOutcome::Failed(e),
        }
    }

    /// Everything after the lock check, with the run log attached.
    /// `Ok(None)` means another run took the lock first.
    async fn run_logged(&self) -> Result<Option<RunSummary>> {
        tracing::info!("Creating lock file: {}", self.config.lock_file.display());
        let lock = match RunLock::acquire(&self.config.work_dir) {
            Ok(lock) => lock,
            Err(OrchestratorError::LockHeld { path }) => {
                tracing::info!("Lock file exists: {}. Program stopped.", path.display());
                return Ok(None);
            }
            Err(e) => {
                tracing::error!("MGF Offset failed! Error: {}", e);
                return Err(e.into());
            }
        };

        match self.process_all(lock).await {
            Ok(summary) => Ok(Some(summary)),
            Err(e) => {
                tracing::error!("MGF Offset failed! Error: {:#}", e);
                Err(e)
            }
        }
    }

    async fn process_all(&self, lock: RunLock) -> Result<RunSummary> {
        let summary = stream::iter(Category::ALL)
            .then(|category| self.process_category(category))
            .try_fold(RunSummary::default(), |acc, report| async move {
                Ok(acc.combine(RunSummary::from(report)))
            })
            .await?;

        tracing::info!(
            "Dispatched {} unit(s), {} failed",
            summary.dispatched(),
            summary.failed()
        );
        if let Ok(json) = serde_json::to_string(&summary) {
            tracing::debug!("Run summary: {}", json);
        }

        tracing::info!("Deleting lock file: {}", lock.path().display());
        lock.release()?;

        if summary.no_work {
            tracing::info!("Deleting log file: {}", self.log_file().display());
        }
        Ok(summary)
    }

    async fn process_category(&self, category: Category) -> Result<CategoryReport> {
        let root = self.config.category_root(category)?;
        tracing::info!("Processing {} folder: {}", category, root.display());

        let mut pool = WorkerPool::new(self.processor.clone(), POOL_CAPACITY);
        let mut report = CategoryReport::new(category);

        for file in scanner::scan(&root) {
            let file = file?;
            let verdict = self.filter.check(&file).await?;
            report.record(&verdict);
            if !verdict.is_eligible() {
                continue;
            }

            pool.submit(UnitJob {
                file: file.path,
                basename: file.basename,
                tagged: category.tagged(),
                work_dir: self.config.work_dir.clone(),
            })
            .await
            .with_context(|| format!("Failed to submit unit in {}", category))?;
        }

        report.drain = pool.drain(&self.interrupt).await;
        tracing::info!(
            "{}: scanned {}, dispatched {} ({} done, {} failed){}",
            category,
            report.scanned,
            report.drain.submitted,
            report.drain.succeeded,
            report.drain.failed,
            if report.drain.interrupted {
                ", drain interrupted"
            } else {
                ""
            }
        );
        Ok(report)
    }
}

fn discard_log(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Failed to delete log file {}: {}", path.display(), e);
            false
        }
    }
}
