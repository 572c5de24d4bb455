//! Bounded worker pool for processing units.
//!
//! One [`WorkerPool`] is created per category. `submit` waits for a free slot
//! when all slots are busy, so scanning is throttled to the pool's pace.
//! `drain` consumes the pool, which closes it to further submissions, and
//! waits without a timeout for every unit to report back. If the interrupt
//! signal fires first, the wait is abandoned and running units are detached
//! rather than cancelled.

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use mgf_common::{Processor, UnitJob, UnitOutcome};
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::instrument::WithSubscriber;

use crate::report::DrainReport;

/// Produces a future that resolves when the current wait should be abandoned.
/// Called once per drain.
pub type InterruptSignal = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Ctrl-C, listened for from the moment this is called.
///
/// One SIGINT listener backs every future the signal produces, so a Ctrl-C
/// that arrives between drains is held and ends the next drain at once. If
/// the listener cannot be installed, never fires.
pub fn ctrl_c() -> InterruptSignal {
    match signal(SignalKind::interrupt()) {
        Ok(listener) => {
            let listener = Arc::new(Mutex::new(listener));
            Arc::new(move || -> BoxFuture<'static, ()> {
                let listener = listener.clone();
                Box::pin(async move {
                    if listener.lock().await.recv().await.is_none() {
                        std::future::pending::<()>().await;
                    }
                })
            })
        }
        Err(e) => {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            never()
        }
    }
}

pub fn never() -> InterruptSignal {
    Arc::new(|| -> BoxFuture<'static, ()> { Box::pin(std::future::pending::<()>()) })
}

pub struct WorkerPool {
    processor: Arc<dyn Processor>,
    slots: Arc<Semaphore>,
    tasks: JoinSet<(String, Result<UnitOutcome>)>,
    submitted: usize,
}

impl WorkerPool {
    pub fn new(processor: Arc<dyn Processor>, capacity: usize) -> Self {
        Self {
            processor,
            slots: Arc::new(Semaphore::new(capacity)),
            tasks: JoinSet::new(),
            submitted: 0,
        }
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Spawn one unit for `job`, waiting for a slot if the pool is saturated.
    pub async fn submit(&mut self, job: UnitJob) -> Result<()> {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .context("Worker pool closed")?;
        let processor = self.processor.clone();
        let basename = job.basename.clone();

        tracing::debug!("Submitting unit for {}", basename);
        self.tasks.spawn(
            async move {
                let _permit = permit; // Hold until complete
                let result = processor.process(job).await;
                (basename, result)
            }
            .with_current_subscriber(),
        );
        self.submitted += 1;
        Ok(())
    }

    /// Wait for all submitted units, or until `interrupt` fires.
    pub async fn drain(mut self, interrupt: &InterruptSignal) -> DrainReport {
        let mut report = DrainReport {
            submitted: self.submitted,
            ..Default::default()
        };
        let mut interrupted = interrupt();

        loop {
            tokio::select! {
                next = self.tasks.join_next() => match next {
                    None => break,
                    Some(Ok((_, Ok(outcome)))) => {
                        tracing::debug!(
                            "Unit for {} finished with {} in {:?}",
                            outcome.basename, outcome.marker, outcome.duration
                        );
                        report.record(&outcome);
                    }
                    Some(Ok((basename, Err(e)))) => {
                        tracing::error!("Unit for {} failed: {:#}", basename, e);
                        report.failed += 1;
                    }
                    Some(Err(e)) => {
                        tracing::error!("Unit task aborted: {}", e);
                        report.failed += 1;
                    }
                },
                _ = &mut interrupted => {
                    tracing::info!("interrupted..");
                    report.interrupted = true;
                    break;
                }
            }
        }

        report
    }
}

impl Drop for WorkerPool {
    // Units still running are detached, not aborted.
    fn drop(&mut self) {
        self.tasks.detach_all();
    }
}
