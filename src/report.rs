//! Per-category and per-run accounting.
//!
//! A run is the fold of its category reports under [`RunSummary::combine`],
//! starting from [`RunSummary::default`]. `combine` concatenates reports and
//! ANDs the "no work" flags, so the fold is associative and the identity
//! leaves any summary unchanged.

use mgf_common::{Category, UnitOutcome};
use serde::Serialize;

use crate::eligibility::Verdict;

/// Result of draining one category's worker pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Drain abandoned; units still running are not counted above.
    pub interrupted: bool,
}

impl DrainReport {
    pub fn record(&mut self, outcome: &UnitOutcome) {
        if outcome.succeeded() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    pub scanned: usize,
    pub not_uploaded: usize,
    pub already_handled: usize,
    pub metadata_unready: usize,
    pub drain: DrainReport,
}

impl CategoryReport {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            scanned: 0,
            not_uploaded: 0,
            already_handled: 0,
            metadata_unready: 0,
            drain: DrainReport::default(),
        }
    }

    pub fn record(&mut self, verdict: &Verdict) {
        self.scanned += 1;
        match verdict {
            Verdict::Eligible => {}
            Verdict::NotUploaded => self.not_uploaded += 1,
            Verdict::AlreadyHandled(_) => self.already_handled += 1,
            Verdict::MetadataUnready(_) => self.metadata_unready += 1,
        }
    }

    /// True iff nothing was submitted for this category.
    pub fn no_work(&self) -> bool {
        self.drain.submitted == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub categories: Vec<CategoryReport>,
    pub no_work: bool,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            no_work: true,
        }
    }
}

impl From<CategoryReport> for RunSummary {
    fn from(report: CategoryReport) -> Self {
        Self {
            no_work: report.no_work(),
            categories: vec![report],
        }
    }
}

impl RunSummary {
    pub fn combine(mut self, other: RunSummary) -> RunSummary {
        self.categories.extend(other.categories);
        self.no_work = self.no_work && other.no_work;
        self
    }

    pub fn dispatched(&self) -> usize {
        self.categories.iter().map(|c| c.drain.submitted).sum()
    }

    pub fn failed(&self) -> usize {
        self.categories.iter().map(|c| c.drain.failed).sum()
    }
}
