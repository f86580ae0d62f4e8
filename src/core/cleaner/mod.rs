//! Plan-then-execute removal of transient files.
//!
//! `plan` walks a target's roots and snapshots every candidate's size and
//! modification time. `execute` consumes the plan and deletes only those
//! entries, re-checking each one right before deletion: the filesystem is
//! assumed to change underneath us at any time. Every entry that cannot be
//! removed ends up in the report with a reason; nothing aborts the run.

mod file_ops;
mod plan;
mod target;

pub use file_ops::{FileOps, OsFileOps};
pub use plan::{CleanupPlan, EnumerationFailure, PlanEntry};
pub use target::{CleanupCategory, CleanupTarget, DeleteMode, ExclusionRules, DEFAULT_MIN_AGE};

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::activity::{ActivityEvent, EventSink, LogSink, Severity};
use crate::core::cancel::CancelFlag;
use plan::Planner;

const COMPONENT: &str = "cleanup";

/// Why a planned entry was not deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    InUse,
    NotFound,
    PermissionDenied,
    /// Size or modification time differs from the plan
    ChangedSincePlan,
    Other(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InUse => f.write_str("in use"),
            SkipReason::NotFound => f.write_str("not found"),
            SkipReason::PermissionDenied => f.write_str("permission denied"),
            SkipReason::ChangedSincePlan => f.write_str("changed since plan"),
            SkipReason::Other(msg) => f.write_str(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct CleanupReport {
    pub category: CleanupCategory,
    pub deleted_count: usize,
    pub reclaimed_bytes: u64,
    pub skipped: Vec<SkippedEntry>,
    pub cancelled: bool,
    /// Planned entries never attempted because of cancellation
    pub not_attempted: usize,
    pub enumeration_failures: Vec<EnumerationFailure>,
}

impl CleanupReport {
    fn new(category: CleanupCategory, enumeration_failures: Vec<EnumerationFailure>) -> Self {
        Self {
            category,
            deleted_count: 0,
            reclaimed_bytes: 0,
            skipped: Vec::new(),
            cancelled: false,
            not_attempted: 0,
            enumeration_failures,
        }
    }

    /// Some entries or roots could not be cleaned
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty() || !self.enumeration_failures.is_empty()
    }
}

/// Size of what a cleanup would remove, per category
#[derive(Debug, Clone)]
pub struct PreviewItem {
    pub category: CleanupCategory,
    pub file_count: usize,
    pub total_bytes: u64,
    pub roots: Vec<PathBuf>,
    pub enumeration_failures: Vec<EnumerationFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct CleanupPreview {
    pub items: Vec<PreviewItem>,
}

impl CleanupPreview {
    pub fn total_files(&self) -> usize {
        self.items.iter().map(|i| i.file_count).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.items.iter().map(|i| i.total_bytes).sum()
    }
}

pub struct CleanupEngine {
    file_ops: Arc<dyn FileOps>,
    events: Arc<dyn EventSink>,
}

impl Default for CleanupEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CleanupEngine {
    pub fn new() -> Self {
        Self {
            file_ops: Arc::new(OsFileOps),
            events: Arc::new(LogSink),
        }
    }

    pub fn with_file_ops(mut self, file_ops: Arc<dyn FileOps>) -> Self {
        self.file_ops = file_ops;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Enumerate deletion candidates for `target`
    pub fn plan(&self, target: &CleanupTarget) -> CleanupPlan {
        let plan = Planner::new(target, self.file_ops.as_ref()).run();
        log::debug!(
            "Planned {} file(s), {} bytes for {} ({} excluded)",
            plan.len(),
            plan.estimated_reclaim_bytes(),
            target.category,
            plan.excluded_count()
        );
        plan
    }

    /// Plan every target without deleting anything
    pub fn preview(&self, targets: &[CleanupTarget]) -> CleanupPreview {
        let items = targets
            .iter()
            .map(|target| {
                let plan = self.plan(target);
                PreviewItem {
                    category: target.category,
                    file_count: plan.len(),
                    total_bytes: plan.estimated_reclaim_bytes(),
                    roots: target.root_paths.clone(),
                    enumeration_failures: plan.enumeration_failures().to_vec(),
                }
            })
            .collect();
        CleanupPreview { items }
    }

    pub fn execute(&self, plan: CleanupPlan, cancel: &CancelFlag) -> CleanupReport {
        self.execute_with_progress(plan, cancel, |_, _| {})
    }

    /// Delete the planned entries, calling `on_progress(processed, total)`
    /// after each one
    pub fn execute_with_progress<F>(
        &self,
        plan: CleanupPlan,
        cancel: &CancelFlag,
        on_progress: F,
    ) -> CleanupReport
    where
        F: Fn(usize, usize),
    {
        let (target, entries, failures) = plan.into_parts();
        let total = entries.len();
        let mut report = CleanupReport::new(target.category, failures);

        for (index, entry) in entries.into_iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                report.not_attempted = total - index;
                break;
            }

            match self.delete_entry(&entry, target.delete_mode) {
                Ok(()) => {
                    report.deleted_count += 1;
                    report.reclaimed_bytes += entry.size_bytes;
                }
                Err(reason) => {
                    self.events.emit(
                        &ActivityEvent::new(COMPONENT, Severity::Warning, "File skipped")
                            .with("path", entry.path.display())
                            .with("reason", &reason),
                    );
                    report.skipped.push(SkippedEntry {
                        path: entry.path,
                        reason,
                    });
                }
            }

            on_progress(index + 1, total);
        }

        let severity = if report.is_partial() {
            Severity::Warning
        } else {
            Severity::Info
        };
        self.events.emit(
            &ActivityEvent::new(COMPONENT, severity, "Cleanup finished")
                .with("category", target.category)
                .with("deleted", report.deleted_count)
                .with("reclaimed_bytes", report.reclaimed_bytes)
                .with("skipped", report.skipped.len())
                .with("cancelled", report.cancelled),
        );

        report
    }

    /// Re-validate one entry against its planned identity, then remove it
    fn delete_entry(&self, entry: &PlanEntry, mode: DeleteMode) -> Result<(), SkipReason> {
        let meta = fs::symlink_metadata(&entry.path).map_err(|e| self.skip_reason(&e))?;

        if !meta.is_file()
            || meta.len() != entry.size_bytes
            || meta.modified().ok() != entry.modified_time
        {
            return Err(SkipReason::ChangedSincePlan);
        }

        if self.file_ops.is_in_use(&entry.path) {
            return Err(SkipReason::InUse);
        }

        self.file_ops
            .remove(&entry.path, mode)
            .map_err(|e| self.skip_reason(&e))
    }

    fn skip_reason(&self, err: &io::Error) -> SkipReason {
        if self.file_ops.is_in_use_error(err) {
            return SkipReason::InUse;
        }
        match err.kind() {
            io::ErrorKind::NotFound => SkipReason::NotFound,
            io::ErrorKind::PermissionDenied => SkipReason::PermissionDenied,
            _ => SkipReason::Other(err.to_string()),
        }
    }
}
